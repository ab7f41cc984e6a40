//! Severity tiers for triage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete triage tier derived from a confidence score.
///
/// Ordered from least to most severe, so `max()` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Below 0.60.
    Low,
    /// 0.60 up to 0.80.
    Medium,
    /// 0.80 up to 0.90.
    High,
    /// 0.90 and above.
    Critical,
}

impl Severity {
    /// Lower bound (inclusive) of the critical tier.
    pub const CRITICAL_MIN: f32 = 0.90;
    /// Lower bound (inclusive) of the high tier.
    pub const HIGH_MIN: f32 = 0.80;
    /// Lower bound (inclusive) of the medium tier.
    pub const MEDIUM_MIN: f32 = 0.60;

    /// All tiers, most severe first.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Maps a confidence to its tier. Total: NaN and negatives map to `Low`.
    #[must_use]
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= Self::CRITICAL_MIN {
            Self::Critical
        } else if confidence >= Self::HIGH_MIN {
            Self::High
        } else if confidence >= Self::MEDIUM_MIN {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Lower-case name, as serialized.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
