//! Conflict classification.
//!
//! Surviving the similarity gate is necessary but not sufficient: every
//! candidate pair is run through the ordered rules in [`rules`] and only a
//! pair that fires one of them becomes a [`ContradictionCandidate`].

pub mod advisory;
pub mod rules;

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::blocking::CandidatePair;
use crate::claim::{Claim, ClaimId};
use crate::config::AuthorMatching;
use crate::error::ClassificationError;
use crate::severity::Severity;

use self::rules::{PairContext, RULES};

/// Why two claims conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionType {
    /// Same author, same subject, opposite stance.
    #[serde(rename = "self")]
    SelfContradiction,
    /// One account negates the other.
    Direct,
    /// An allegation is treated elsewhere as established fact.
    Modality,
    /// The same event is dated differently.
    Temporal,
    /// Same subject and predicate, different value.
    Value,
    /// Diverging attribution. No rule emits it; kept for records created by reviewers.
    Attribution,
}

impl ContradictionType {
    /// Every type, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::SelfContradiction,
        Self::Direct,
        Self::Modality,
        Self::Temporal,
        Self::Value,
        Self::Attribution,
    ];

    /// Wire name, as stored and serialized.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SelfContradiction => "self",
            Self::Direct => "direct",
            Self::Modality => "modality",
            Self::Temporal => "temporal",
            Self::Value => "value",
            Self::Attribution => "attribution",
        }
    }
}

impl fmt::Display for ContradictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified pair, produced per run and never persisted directly.
#[derive(Debug, Clone, Serialize)]
pub struct ContradictionCandidate {
    /// First claim of the pair.
    pub claim_a: ClaimId,
    /// Second claim of the pair.
    pub claim_b: ClaimId,
    /// Score that let the pair through the similarity gate.
    pub similarity: f32,
    /// Type of the first rule that fired.
    pub contradiction_type: ContradictionType,
    /// Base confidence of that rule.
    pub confidence: f32,
    /// Both claims come from the same author.
    pub same_author: bool,
    /// Set for temporal contradictions only.
    pub temporal_conflict: bool,
    /// Reviewer-facing summary.
    pub description: String,
    /// Advisory text for the type.
    pub legal_significance: &'static str,
    /// Suggested next step for the type.
    pub recommended_action: &'static str,
}

impl ContradictionCandidate {
    /// Severity tier derived from the confidence.
    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::from_confidence(self.confidence)
    }
}

/// Result of classifying a batch of candidate pairs.
#[derive(Debug, Default)]
pub struct Classification {
    /// Pairs that fired a rule, in input order.
    pub candidates: Vec<ContradictionCandidate>,
    /// Pairs dropped because a rule could not evaluate them.
    pub skipped_pairs: usize,
}

/// Applies the ordered rules to claim pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictClassifier {
    author_matching: AuthorMatching,
}

impl ConflictClassifier {
    /// Creates a classifier using the given author comparison.
    #[must_use]
    pub const fn new(author_matching: AuthorMatching) -> Self {
        Self { author_matching }
    }

    /// Returns true if both claims are attributed to the same author.
    #[must_use]
    pub fn same_author(&self, a: &Claim, b: &Claim) -> bool {
        match (a.author_key(), b.author_key()) {
            (Some(x), Some(y)) => self.author_matching.matches(&x, &y),
            _ => false,
        }
    }

    /// Classifies one pair. First matching rule wins.
    ///
    /// # Errors
    ///
    /// Returns `ClassificationError` if a rule cannot evaluate the pair
    /// (for example an unparseable temporal anchor).
    pub fn classify(
        &self,
        a: &Claim,
        b: &Claim,
        similarity: f32,
    ) -> Result<Option<ContradictionCandidate>, ClassificationError> {
        let ctx = PairContext {
            a,
            b,
            same_author: self.same_author(a, b),
            shared_subject: a.shares_subject(b),
        };

        for (_, rule) in RULES {
            if let Some(m) = rule(&ctx)? {
                return Ok(Some(ContradictionCandidate {
                    claim_a: a.id,
                    claim_b: b.id,
                    similarity: similarity.clamp(0.0, 1.0),
                    contradiction_type: m.kind,
                    confidence: m.confidence,
                    same_author: ctx.same_author,
                    temporal_conflict: m.kind == ContradictionType::Temporal,
                    description: advisory::describe(m.kind, a, b),
                    legal_significance: advisory::legal_significance(m.kind),
                    recommended_action: advisory::recommended_action(m.kind),
                }));
            }
        }
        Ok(None)
    }

    /// Classifies every candidate pair, optionally in parallel.
    ///
    /// Output order follows input order in both modes.
    #[must_use]
    pub fn classify_pairs(&self, claims: &[Claim], pairs: &[CandidatePair], parallel: bool) -> Classification {
        let classify_one = |p: &CandidatePair| {
            let (a, b) = (&claims[p.a], &claims[p.b]);
            self.classify(a, b, p.similarity).map_err(|e| {
                warn!(claim_a = %a.id, claim_b = %b.id, error = %e, "skipping unclassifiable pair");
            })
        };

        let results: Vec<Result<Option<ContradictionCandidate>, ()>> = if parallel {
            pairs.par_iter().map(classify_one).collect()
        } else {
            pairs.iter().map(classify_one).collect()
        };

        let mut out = Classification::default();
        for r in results {
            match r {
                Ok(Some(c)) => out.candidates.push(c),
                Ok(None) => {}
                Err(()) => out.skipped_pairs += 1,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{CaseId, Modality, Polarity};

    fn claim(case_id: CaseId) -> crate::claim::ClaimBuilder {
        Claim::builder().case_id(case_id)
    }

    #[test]
    fn self_contradiction_scores_090() {
        let case_id = CaseId::new();
        let a = claim(case_id)
            .text("Officer Smith: the father attended the visit")
            .asserted_by("Officer Smith")
            .subject("father")
            .polarity(Polarity::Affirm)
            .build()
            .unwrap();
        let b = claim(case_id)
            .text("Officer Smith: the father did not attend the visit")
            .asserted_by(" officer smith")
            .subject("Father")
            .polarity(Polarity::Negate)
            .build()
            .unwrap();

        let c = ConflictClassifier::default().classify(&a, &b, 0.8).unwrap().unwrap();
        assert_eq!(c.contradiction_type, ContradictionType::SelfContradiction);
        assert!((c.confidence - 0.90).abs() < f32::EPSILON);
        assert!(c.same_author);
        assert!(!c.temporal_conflict);
        assert_eq!(c.severity(), Severity::Critical);
    }

    #[test]
    fn different_subjects_never_self_or_direct() {
        let case_id = CaseId::new();
        let a = claim(case_id)
            .text("the father attended")
            .asserted_by("Officer Smith")
            .subject("father")
            .polarity(Polarity::Affirm)
            .build()
            .unwrap();
        let b = claim(case_id)
            .text("the grandmother did not attend")
            .asserted_by("Officer Smith")
            .subject("grandmother")
            .polarity(Polarity::Negate)
            .build()
            .unwrap();

        let c = ConflictClassifier::default().classify(&a, &b, 0.9).unwrap();
        assert!(c.map_or(true, |c| !matches!(
            c.contradiction_type,
            ContradictionType::SelfContradiction | ContradictionType::Direct
        )));
    }

    #[test]
    fn modality_confusion_scores_080() {
        let case_id = CaseId::new();
        let a = claim(case_id)
            .text("The father hit the child")
            .subject("father")
            .modality(Modality::Asserted)
            .certainty(0.9)
            .build()
            .unwrap();
        let b = claim(case_id)
            .text("It is alleged the father hit the child")
            .subject("father")
            .modality(Modality::Alleged)
            .build()
            .unwrap();

        let c = ConflictClassifier::default().classify(&a, &b, 0.9).unwrap().unwrap();
        assert_eq!(c.contradiction_type, ContradictionType::Modality);
        assert!((c.confidence - 0.80).abs() < f32::EPSILON);
    }

    #[test]
    fn temporal_conflict_scores_075() {
        let case_id = CaseId::new();
        let a = claim(case_id)
            .text("The visit took place")
            .subject("visit")
            .time_start("2023-03-29")
            .build()
            .unwrap();
        let b = claim(case_id)
            .text("The visit took place")
            .subject("visit")
            .time_start("2023-04-02")
            .build()
            .unwrap();

        let c = ConflictClassifier::default().classify(&a, &b, 1.0).unwrap().unwrap();
        assert_eq!(c.contradiction_type, ContradictionType::Temporal);
        assert!((c.confidence - 0.75).abs() < f32::EPSILON);
        assert!(c.temporal_conflict);
    }

    #[test]
    fn value_mismatch_scores_070() {
        let case_id = CaseId::new();
        let a = claim(case_id)
            .text("The father lives in Springfield")
            .subject("father")
            .predicate("lives in")
            .object_value("Springfield")
            .build()
            .unwrap();
        let b = claim(case_id)
            .text("The father lives in Shelbyville")
            .subject("Father")
            .predicate("Lives in")
            .object_value("Shelbyville")
            .build()
            .unwrap();

        let c = ConflictClassifier::default().classify(&a, &b, 0.9).unwrap().unwrap();
        assert_eq!(c.contradiction_type, ContradictionType::Value);
        assert_eq!(c.severity(), Severity::Medium);
    }

    #[test]
    fn unrelated_pair_is_dropped() {
        let case_id = CaseId::new();
        let a = claim(case_id).text("the mother attended").subject("mother").build().unwrap();
        let b = claim(case_id).text("the father attended").subject("father").build().unwrap();
        assert!(ConflictClassifier::default().classify(&a, &b, 0.9).unwrap().is_none());
    }

    #[test]
    fn containment_matching_is_opt_in() {
        let case_id = CaseId::new();
        let a = claim(case_id).text("x").asserted_by("Officer Smith").build().unwrap();
        let b = claim(case_id).text("y").asserted_by("Smith").build().unwrap();
        assert!(!ConflictClassifier::default().same_author(&a, &b));
        assert!(ConflictClassifier::new(AuthorMatching::Containment).same_author(&a, &b));
    }

    #[test]
    fn bad_pairs_are_skipped_and_counted() {
        let case_id = CaseId::new();
        let claims = vec![
            claim(case_id).text("a").subject("visit").time_start("2023-03-29").build().unwrap(),
            claim(case_id).text("b").subject("visit").time_start("spring").build().unwrap(),
            claim(case_id).text("c").subject("visit").time_start("2023-04-02").build().unwrap(),
        ];
        let pairs = [
            CandidatePair { a: 0, b: 1, similarity: 0.9 },
            CandidatePair { a: 0, b: 2, similarity: 0.9 },
        ];
        for parallel in [false, true] {
            let out = ConflictClassifier::default().classify_pairs(&claims, &pairs, parallel);
            assert_eq!(out.skipped_pairs, 1);
            assert_eq!(out.candidates.len(), 1);
            assert_eq!(out.candidates[0].contradiction_type, ContradictionType::Temporal);
        }
    }

    #[test]
    fn type_serializes_snake_case_with_self() {
        let json = serde_json::to_string(&ContradictionType::SelfContradiction).unwrap();
        assert_eq!(json, "\"self\"");
        let back: ContradictionType = serde_json::from_str("\"modality\"").unwrap();
        assert_eq!(back, ContradictionType::Modality);
    }
}
