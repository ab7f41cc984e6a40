//! Abstract storage traits.
//!
//! These traits define the contract storage backends must implement. The
//! in-memory backend serves tests and embedded use; a relational backend
//! lives with the surrounding application.

use thiserror::Error;

use crate::claim::{CaseId, Claim, ClaimId};
use crate::contradiction::{Contradiction, ContradictionId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Contradiction not found.
    #[error("Contradiction not found: {0}")]
    ContradictionNotFound(ContradictionId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error affecting a single operation.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Backend is unreachable.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl StorageError {
    /// Returns true if the backend as a whole is unreachable, as opposed to
    /// a failure scoped to one row.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

/// Outcome of an atomic insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// The unordered pair was already recorded for the case.
    Duplicate(ContradictionId),
}

/// Read-only supplier of a case's claims.
pub trait ClaimSource: Send + Sync {
    /// Loads every claim of a case.
    fn load_claims(&self, case_id: CaseId) -> Result<Vec<Claim>, StorageError>;
}

/// Storage trait for contradiction records.
///
/// # Invariants
/// - For one case, an unordered claim pair is stored at most once.
/// - Records are never deleted.
pub trait ContradictionStore: Send + Sync {
    /// Checks that the backend is reachable.
    fn ping(&self) -> Result<(), StorageError>;

    /// Inserts the record unless its unordered pair already exists for the
    /// case. The check and the write are one atomic unit.
    fn insert_if_absent(&self, contradiction: Contradiction) -> Result<InsertOutcome, StorageError>;

    /// Finds the record for a pair, in either order.
    fn find_pair(
        &self,
        case_id: CaseId,
        a: ClaimId,
        b: ClaimId,
    ) -> Result<Option<Contradiction>, StorageError>;

    /// Get a record by ID.
    fn get(&self, id: ContradictionId) -> Result<Option<Contradiction>, StorageError>;

    /// Replaces a record's resolution state. Case and pair must not change.
    fn update(&self, contradiction: Contradiction) -> Result<(), StorageError>;

    /// All records of a case.
    fn find_by_case(&self, case_id: CaseId) -> Result<Vec<Contradiction>, StorageError>;

    /// Records involving a specific claim.
    fn find_by_claim(&self, claim_id: ClaimId) -> Result<Vec<Contradiction>, StorageError>;

    /// Unresolved records of a case.
    fn find_unresolved(&self, case_id: CaseId) -> Result<Vec<Contradiction>, StorageError> {
        Ok(self
            .find_by_case(case_id)?
            .into_iter()
            .filter(|c| !c.resolved)
            .collect())
    }
}
