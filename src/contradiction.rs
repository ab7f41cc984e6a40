//! Persisted contradiction records.
//!
//! Contradictions are explicit audit records, not hidden errors. A detection
//! run creates them; afterwards only a human resolve action mutates them, and
//! they are never deleted, even if the source claims are later edited.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blocking::PairKey;
use crate::claim::{CaseId, ClaimId};
use crate::conflict::{ContradictionCandidate, ContradictionType};
use crate::severity::Severity;

/// Unique identifier for a contradiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContradictionId(Uuid);

impl ContradictionId {
    /// Creates a new random contradiction ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContradictionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContradictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted contradiction between two claims of one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    /// Unique record ID.
    pub id: ContradictionId,
    /// Case both claims belong to.
    pub case_id: CaseId,
    /// First claim, as classified.
    pub claim_a: ClaimId,
    /// Second claim, as classified.
    pub claim_b: ClaimId,
    /// Type of the rule that fired.
    pub contradiction_type: ContradictionType,
    /// Tier derived from `confidence` at creation.
    pub severity: Severity,
    /// Base confidence of the rule.
    pub confidence: f32,
    /// Pair similarity at detection time. Lexical runs store the Jaccard score.
    pub semantic_similarity: f32,
    /// Both claims come from the same author.
    pub same_author: bool,
    /// Set for temporal contradictions.
    pub temporal_conflict: bool,
    /// Reviewer-facing summary.
    pub description: String,

    /// Advisory text, absent on records created outside the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_significance: Option<String>,

    /// Suggested next step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,

    /// When the detection run created this record.
    pub detected_at: DateTime<Utc>,

    /// Set once a reviewer has dealt with the record.
    pub resolved: bool,

    /// Reviewer's explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,

    /// When the record was resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Who resolved it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl Contradiction {
    /// Builds the record for a classified candidate; severity is derived
    /// from the candidate's confidence.
    #[must_use]
    pub fn from_candidate(case_id: CaseId, candidate: &ContradictionCandidate) -> Self {
        Self {
            id: ContradictionId::new(),
            case_id,
            claim_a: candidate.claim_a,
            claim_b: candidate.claim_b,
            contradiction_type: candidate.contradiction_type,
            severity: candidate.severity(),
            confidence: candidate.confidence,
            semantic_similarity: candidate.similarity,
            same_author: candidate.same_author,
            temporal_conflict: candidate.temporal_conflict,
            description: candidate.description.clone(),
            legal_significance: Some(candidate.legal_significance.to_string()),
            recommended_action: Some(candidate.recommended_action.to_string()),
            detected_at: Utc::now(),
            resolved: false,
            resolution_note: None,
            resolved_at: None,
            resolved_by: None,
        }
    }

    /// The unordered claim pair this record covers.
    #[must_use]
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.claim_a, self.claim_b)
    }

    /// Marks the contradiction as resolved by a reviewer.
    pub fn resolve(&mut self, resolved_by: impl Into<String>, note: Option<String>) {
        self.resolved = true;
        self.resolved_by = Some(resolved_by.into());
        self.resolution_note = note;
        self.resolved_at = Some(Utc::now());
    }
}

impl PartialEq for Contradiction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Contradiction {}

impl std::hash::Hash for Contradiction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(confidence: f32) -> ContradictionCandidate {
        ContradictionCandidate {
            claim_a: ClaimId::new(),
            claim_b: ClaimId::new(),
            similarity: 0.8,
            contradiction_type: ContradictionType::Direct,
            confidence,
            same_author: false,
            temporal_conflict: false,
            description: "d".to_string(),
            legal_significance: "l",
            recommended_action: "r",
        }
    }

    #[test]
    fn test_contradiction_id() {
        assert_ne!(ContradictionId::new(), ContradictionId::new());
    }

    #[test]
    fn test_from_candidate_derives_severity() {
        let c = Contradiction::from_candidate(CaseId::new(), &candidate(0.85));
        assert_eq!(c.severity, Severity::High);
        assert!(!c.resolved);
        assert_eq!(c.legal_significance.as_deref(), Some("l"));
        assert!((c.semantic_similarity - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let mut c = Contradiction::from_candidate(CaseId::new(), &candidate(0.9));
        let key = c.pair_key();
        std::mem::swap(&mut c.claim_a, &mut c.claim_b);
        assert_eq!(c.pair_key(), key);
    }

    #[test]
    fn test_resolve() {
        let mut c = Contradiction::from_candidate(CaseId::new(), &candidate(0.9));
        c.resolve("reviewer-1", Some("explained by second visit".to_string()));
        assert!(c.resolved);
        assert!(c.resolved_at.is_some());
        assert_eq!(c.resolved_by.as_deref(), Some("reviewer-1"));
    }

    #[test]
    fn test_serialization() {
        let c = Contradiction::from_candidate(CaseId::new(), &candidate(0.7));
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"severity\":\"medium\""));
        assert!(!json.contains("resolved_at"));
        let back: Contradiction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, c.id);
        assert_eq!(back.contradiction_type, ContradictionType::Direct);
    }
}
