//! Error types for crossclaim.
//!
//! All errors are strongly typed using thiserror. Most of them never end a
//! run: degraded similarity falls back, per-pair failures are skipped and
//! counted, per-candidate write failures are logged. Only the variants of
//! [`ExecutionError`] are run-level.

use thiserror::Error;

use crate::claim::{CaseId, ClaimId};
use crate::contradiction::ContradictionId;
use crate::storage::StorageError;

/// Validation errors that occur while checking configuration or inputs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A threshold lies outside the unit interval.
    #[error("Threshold '{field}' = {value} is out of range [0.0, 1.0]")]
    ThresholdOutOfRange {
        /// Configuration key.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// A size limit is zero.
    #[error("Field '{field}' must be greater than zero")]
    ZeroLimit {
        /// Configuration key.
        field: &'static str,
    },

    /// A required builder field was never set.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// Claim text is empty after trimming.
    #[error("Claim text cannot be empty")]
    EmptyClaimText,

    /// Configuration could not be parsed or rendered.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Parser or serializer message.
        reason: String,
    },
}

/// Errors raised while classifying a single candidate pair.
///
/// These never escape a run; the offending pair is skipped and counted.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// A `time_start` value is not a recognized date or timestamp.
    #[error("Claim {claim_id} has an unparseable temporal anchor '{value}'")]
    InvalidTemporalAnchor {
        /// Claim carrying the value.
        claim_id: ClaimId,
        /// The raw value.
        value: String,
    },
}

/// Execution errors that end (or refuse to start) a run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Another run holds the case.
    #[error("A detection run is already in progress for case {case_id}")]
    RunInProgress {
        /// The busy case.
        case_id: CaseId,
    },

    /// The progress sink asked the run to stop.
    #[error("Run aborted before {phase}")]
    Aborted {
        /// Phase that was about to start.
        phase: &'static str,
    },

    /// The contradiction store cannot be reached.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// Backend error text, verbatim.
        message: String,
    },

    /// The claim source failed.
    #[error("Failed to load claims for case {case_id}: {message}")]
    ClaimLoad {
        /// Case being loaded.
        case_id: CaseId,
        /// Backend error text, verbatim.
        message: String,
    },

    /// No record with this ID.
    #[error("Contradiction not found: {id}")]
    ContradictionNotFound {
        /// The requested ID.
        id: ContradictionId,
    },
}

/// Top-level error type for crossclaim.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad configuration or input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Run-level failure.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Pair-level failure surfaced directly.
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Broken internal invariant.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

impl EngineError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if the run was stopped by an external abort request.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Aborted { .. }))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Execution(e) => matches!(
                e,
                ExecutionError::RunInProgress { .. } | ExecutionError::StorageUnavailable { .. }
            ),
            Self::Storage(e) => e.is_unavailable(),
            Self::Validation(_) | Self::Classification(_) | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_threshold() {
        let err = ValidationError::ThresholdOutOfRange {
            field: "similarity_threshold",
            value: 1.5,
        };
        let msg = format!("{err}");
        assert!(msg.contains("1.5"));
        assert!(msg.contains("similarity_threshold"));
    }

    #[test]
    fn test_classification_error_mentions_value() {
        let err = ClassificationError::InvalidTemporalAnchor {
            claim_id: ClaimId::new(),
            value: "last tuesday".to_string(),
        };
        assert!(err.to_string().contains("last tuesday"));
    }

    #[test]
    fn test_execution_error_run_in_progress() {
        let case_id = CaseId::new();
        let err = ExecutionError::RunInProgress { case_id };
        assert!(err.to_string().contains(&case_id.to_string()));
    }

    #[test]
    fn test_engine_error_from_validation() {
        let err: EngineError = ValidationError::ZeroLimit { field: "max_embed_batch" }.into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_engine_error_retryable() {
        let err: EngineError = ExecutionError::StorageUnavailable {
            message: "connection refused".to_string(),
        }
        .into();
        assert!(err.is_execution());
        assert!(err.is_retryable());

        let err: EngineError = StorageError::ConnectionError("down".to_string()).into();
        assert!(err.is_retryable());

        let err: EngineError = StorageError::BackendError("constraint".to_string()).into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_engine_error_aborted() {
        let err: EngineError = ExecutionError::Aborted { phase: "persistence" }.into();
        assert!(err.is_aborted());
        assert!(err.to_string().contains("persistence"));
    }

    #[test]
    fn test_engine_error_internal() {
        let err = EngineError::internal("unexpected state");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("unexpected state"));
    }
}
