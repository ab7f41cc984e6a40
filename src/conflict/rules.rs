//! The ordered conflict rules.
//!
//! Each rule looks at one claim pair and either fires with a base
//! confidence or passes. The classifier evaluates them in [`RULES`] order and
//! keeps the first match.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::claim::{Claim, Modality};
use crate::error::ClassificationError;

use super::ContradictionType;

/// Base confidence of a self-contradiction.
pub const SELF_CONFIDENCE: f32 = 0.90;
/// Base confidence of a direct negation.
pub const DIRECT_CONFIDENCE: f32 = 0.85;
/// Base confidence of an allegation stated as fact.
pub const MODALITY_CONFIDENCE: f32 = 0.80;
/// Base confidence of a date mismatch.
pub const TEMPORAL_CONFIDENCE: f32 = 0.75;
/// Base confidence of a value mismatch.
pub const VALUE_CONFIDENCE: f32 = 0.70;

/// Minimum certainty for an asserted claim to count as "established fact".
pub const ESTABLISHED_FACT_CERTAINTY: f32 = 0.7;

static NEGATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(did not|didn[’']t|does not|doesn[’']t|do not|don[’']t|has not|hasn[’']t|had not|hadn[’']t|was not|wasn[’']t|were not|weren[’']t|is not|isn[’']t|will not|won[’']t|could not|couldn[’']t|cannot|can[’']t|never|no longer|denies|denied|deny|refused|refuses|refuse|failed to)\b",
    )
    .unwrap()
});

/// Returns true if the text contains a whole-word negation marker.
#[must_use]
pub fn has_negation(text: &str) -> bool {
    NEGATION_RE.is_match(text)
}

/// A parsed temporal anchor at the precision it was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalAnchor {
    /// Day precision.
    Date(NaiveDate),
    /// Second precision, normalized to UTC.
    Instant(DateTime<Utc>),
}

impl TemporalAnchor {
    /// Parses RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM-DD`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::Instant(dt.with_timezone(&Utc)));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self::Instant(naive.and_utc()));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Self::Date)
    }

    /// Calendar day of the anchor.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(d) => *d,
            Self::Instant(t) => t.date_naive(),
        }
    }

    /// Compares at the coarser of the two precisions.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Instant(a), Self::Instant(b)) => a != b,
            _ => self.date() != other.date(),
        }
    }
}

fn parse_anchor(claim: &Claim, raw: &str) -> Result<TemporalAnchor, ClassificationError> {
    TemporalAnchor::parse(raw).ok_or_else(|| ClassificationError::InvalidTemporalAnchor {
        claim_id: claim.id,
        value: raw.to_string(),
    })
}

/// Pair facts computed once and shared by every rule.
#[derive(Debug)]
pub struct PairContext<'a> {
    /// First claim.
    pub a: &'a Claim,
    /// Second claim.
    pub b: &'a Claim,
    /// Authors match under the configured comparison.
    pub same_author: bool,
    /// Both claims name the same normalized subject.
    pub shared_subject: bool,
}

/// A fired rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch {
    /// Contradiction type the rule reports.
    pub kind: ContradictionType,
    /// Base confidence of the rule.
    pub confidence: f32,
}

impl RuleMatch {
    const fn new(kind: ContradictionType, confidence: f32) -> Self {
        Self { kind, confidence }
    }
}

/// A rule: fires, passes, or reports a claim it cannot evaluate.
pub type Rule = fn(&PairContext<'_>) -> Result<Option<RuleMatch>, ClassificationError>;

/// Rules in priority order.
pub const RULES: [(&str, Rule); 5] = [
    ("self_contradiction", self_contradiction),
    ("direct_negation", direct_negation),
    ("modality_confusion", modality_confusion),
    ("temporal_conflict", temporal_conflict),
    ("value_mismatch", value_mismatch),
];

/// Same author, same subject, opposite polarity.
pub fn self_contradiction(ctx: &PairContext<'_>) -> Result<Option<RuleMatch>, ClassificationError> {
    let fired = ctx.same_author && ctx.shared_subject && ctx.a.polarity.is_opposite(ctx.b.polarity);
    Ok(fired.then(|| RuleMatch::new(ContradictionType::SelfContradiction, SELF_CONFIDENCE)))
}

/// Exactly one side contains a negation marker, same subject.
///
/// Reclassified as a self-contradiction when the authors match.
pub fn direct_negation(ctx: &PairContext<'_>) -> Result<Option<RuleMatch>, ClassificationError> {
    if !ctx.shared_subject || has_negation(&ctx.a.claim_text) == has_negation(&ctx.b.claim_text) {
        return Ok(None);
    }
    let kind = if ctx.same_author {
        ContradictionType::SelfContradiction
    } else {
        ContradictionType::Direct
    };
    Ok(Some(RuleMatch::new(kind, DIRECT_CONFIDENCE)))
}

fn is_established_fact(claim: &Claim) -> bool {
    claim.modality == Modality::Asserted && claim.certainty() >= ESTABLISHED_FACT_CERTAINTY
}

/// An allegation on one side, a confident assertion on the other.
pub fn modality_confusion(ctx: &PairContext<'_>) -> Result<Option<RuleMatch>, ClassificationError> {
    let (a, b) = (ctx.a, ctx.b);
    let fired = (a.modality == Modality::Alleged && is_established_fact(b))
        || (b.modality == Modality::Alleged && is_established_fact(a));
    Ok(fired.then(|| RuleMatch::new(ContradictionType::Modality, MODALITY_CONFIDENCE)))
}

/// Same subject, both dated, dates differ.
///
/// # Errors
///
/// Returns `ClassificationError::InvalidTemporalAnchor` if a `time_start`
/// that would be compared cannot be parsed.
pub fn temporal_conflict(ctx: &PairContext<'_>) -> Result<Option<RuleMatch>, ClassificationError> {
    let (Some(raw_a), Some(raw_b)) = (ctx.a.time_start.as_deref(), ctx.b.time_start.as_deref()) else {
        return Ok(None);
    };
    if !ctx.shared_subject {
        return Ok(None);
    }
    let anchor_a = parse_anchor(ctx.a, raw_a)?;
    let anchor_b = parse_anchor(ctx.b, raw_b)?;
    Ok(anchor_a
        .differs_from(&anchor_b)
        .then(|| RuleMatch::new(ContradictionType::Temporal, TEMPORAL_CONFIDENCE)))
}

/// Same subject and predicate, different object value.
pub fn value_mismatch(ctx: &PairContext<'_>) -> Result<Option<RuleMatch>, ClassificationError> {
    let (a, b) = (ctx.a, ctx.b);
    let (Some(sa), Some(pa), Some(oa)) = (a.subject_key(), a.predicate_key(), a.object_key()) else {
        return Ok(None);
    };
    let (Some(sb), Some(pb), Some(ob)) = (b.subject_key(), b.predicate_key(), b.object_key()) else {
        return Ok(None);
    };
    let fired = sa == sb && pa == pb && oa != ob;
    Ok(fired.then(|| RuleMatch::new(ContradictionType::Value, VALUE_CONFIDENCE)))
}
