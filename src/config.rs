//! Engine configuration.
//!
//! Plain serde struct with defaults; every field may be omitted from a
//! TOML file.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How two normalized author keys are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorMatching {
    /// Keys must be identical.
    #[default]
    Exact,
    /// Either key contains the other ("smith" matches "officer smith").
    Containment,
}

impl AuthorMatching {
    /// Compares two already-normalized, non-empty author keys.
    #[must_use]
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            Self::Exact => a == b,
            Self::Containment => a.contains(b) || b.contains(a),
        }
    }
}

/// Detection engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cosine gate for the matrix path.
    pub similarity_threshold: f32,
    /// Jaccard gate for the lexical (blocking) path.
    pub lexical_threshold: f32,
    /// Largest corpus embedded in one batch; larger corpora use metadata blocking.
    pub max_embed_batch: usize,
    /// How author keys are compared for the same-author flag.
    pub author_matching: AuthorMatching,
    /// Number of most-severe unresolved contradictions in a case summary.
    pub summary_top_n: usize,
    /// Classify candidate pairs on the rayon pool.
    pub parallel_classification: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.65,
            lexical_threshold: 0.35,
            max_embed_batch: 5_000,
            author_matching: AuthorMatching::Exact,
            summary_top_n: 10,
            parallel_classification: true,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` on malformed TOML and the
    /// field-specific variants from [`EngineConfig::validate`].
    pub fn from_toml_str(s: &str) -> Result<Self, ValidationError> {
        let config: Self = toml::from_str(s).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ValidationError> {
        toml::to_string(self).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    /// Checks thresholds and limits.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("lexical_threshold", self.lexical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::ThresholdOutOfRange { field, value });
            }
        }
        if self.max_embed_batch == 0 {
            return Err(ValidationError::ZeroLimit {
                field: "max_embed_batch",
            });
        }
        Ok(())
    }
}
