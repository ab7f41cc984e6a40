//! Reviewer-facing text: descriptions and the static advisory table.

use crate::claim::{Claim, Modality};

use super::ContradictionType;

fn display_or<'a>(value: Option<&'a String>, fallback: &'a str) -> &'a str {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).unwrap_or(fallback)
}

/// Templated description from the contradiction type and the two claims.
#[must_use]
pub fn describe(kind: ContradictionType, a: &Claim, b: &Claim) -> String {
    let subject = display_or(a.subject.as_ref().or(b.subject.as_ref()), "the same matter");
    let author_a = display_or(a.asserted_by.as_ref(), "One source");
    let author_b = display_or(b.asserted_by.as_ref(), "another source");

    match kind {
        ContradictionType::SelfContradiction => {
            format!("{author_a} made contradictory statements about {subject}")
        }
        ContradictionType::Direct => {
            format!("{author_a} and {author_b} directly contradict each other about {subject}")
        }
        ContradictionType::Modality => {
            let (alleged, asserted) = if a.modality == Modality::Alleged {
                (author_a, author_b)
            } else {
                (author_b, author_a)
            };
            format!("An allegation by {alleged} is stated as established fact by {asserted}")
        }
        ContradictionType::Temporal => format!(
            "{subject} is dated {} by {author_a} but {} by {author_b}",
            display_or(a.time_start.as_ref(), "?"),
            display_or(b.time_start.as_ref(), "?"),
        ),
        ContradictionType::Value => format!(
            "Conflicting values for {subject} {}: '{}' vs '{}'",
            display_or(a.predicate.as_ref(), ""),
            display_or(a.object_value.as_ref(), ""),
            display_or(b.object_value.as_ref(), ""),
        ),
        ContradictionType::Attribution => {
            format!("{author_a} and {author_b} attribute the statement about {subject} differently")
        }
    }
}

/// Why a contradiction of this type matters.
#[must_use]
pub const fn legal_significance(kind: ContradictionType) -> &'static str {
    match kind {
        ContradictionType::SelfContradiction => {
            "A witness contradicting their own account goes directly to credibility and may support impeachment."
        }
        ContradictionType::Direct => {
            "Opposing accounts of the same fact create a genuine dispute that the record must resolve."
        }
        ContradictionType::Modality => {
            "An unproven allegation relied on as established fact may taint findings built on it."
        }
        ContradictionType::Temporal => {
            "Inconsistent dating of one event undermines the reliability of the timeline."
        }
        ContradictionType::Value => {
            "Conflicting factual details weaken the reliability of whichever record is relied on."
        }
        ContradictionType::Attribution => {
            "Misattributed statements can mislead the tribunal about who said what."
        }
    }
}

/// What a reviewer should do next for this type.
#[must_use]
pub const fn recommended_action(kind: ContradictionType) -> &'static str {
    match kind {
        ContradictionType::SelfContradiction => {
            "Compare both statements in context and prepare to put the inconsistency to the witness."
        }
        ContradictionType::Direct => {
            "Identify corroborating evidence for each account and flag the dispute for review."
        }
        ContradictionType::Modality => {
            "Trace the assertion back to its source and confirm whether the allegation was ever substantiated."
        }
        ContradictionType::Temporal => {
            "Check contemporaneous records to establish the correct date."
        }
        ContradictionType::Value => {
            "Verify the detail against primary documents."
        }
        ContradictionType::Attribution => {
            "Confirm the original speaker from source documents or transcripts."
        }
    }
}
