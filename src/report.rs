//! Run aggregation and case summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::CaseId;
use crate::conflict::{ContradictionCandidate, ContradictionType};
use crate::contradiction::Contradiction;
use crate::progress::{RunId, RunStatus};
use crate::severity::Severity;
use crate::similarity::SimilarityKind;

/// Counts by contradiction type and severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Count per contradiction type.
    pub by_type: BTreeMap<ContradictionType, usize>,
    /// Count per severity tier.
    pub by_severity: BTreeMap<Severity, usize>,
}

impl Tally {
    /// Counts one contradiction.
    pub fn add(&mut self, kind: ContradictionType, severity: Severity) {
        *self.by_type.entry(kind).or_default() += 1;
        *self.by_severity.entry(severity).or_default() += 1;
    }

    /// Number of contradictions counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_type.values().sum()
    }

    /// Tally of classifier output, using derived severities.
    #[must_use]
    pub fn of_candidates<'a>(candidates: impl IntoIterator<Item = &'a ContradictionCandidate>) -> Self {
        let mut tally = Self::default();
        for c in candidates {
            tally.add(c.contradiction_type, c.severity());
        }
        tally
    }

    /// Tally of stored records.
    #[must_use]
    pub fn of_records<'a>(records: impl IntoIterator<Item = &'a Contradiction>) -> Self {
        let mut tally = Self::default();
        for c in records {
            tally.add(c.contradiction_type, c.severity);
        }
        tally
    }
}

/// Aggregate report of one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run this summary belongs to.
    pub run_id: RunId,
    /// Case that was analyzed.
    pub case_id: CaseId,
    /// Final (or current) run state.
    pub status: RunStatus,
    /// Claims loaded for the case.
    pub claims_analyzed: usize,
    /// Metric that produced the similarity scores, if the run got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<SimilarityKind>,
    /// Distinct pairs whose similarity was evaluated.
    pub pairs_examined: usize,
    /// Pairs that passed the similarity gate.
    pub pairs_gated: usize,
    /// Pairs dropped because a rule could not evaluate them.
    pub skipped_pairs: usize,
    /// Classifier output before persistence.
    pub candidates: Tally,
    /// Records newly written by this run.
    pub created: Tally,
    /// Candidates whose pair was already recorded.
    pub duplicates: usize,
    /// Candidates that failed to persist.
    pub persist_failures: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    /// Fresh summary for a run that has just started.
    #[must_use]
    pub fn new(run_id: RunId, case_id: CaseId) -> Self {
        Self {
            run_id,
            case_id,
            status: RunStatus::Running,
            claims_analyzed: 0,
            similarity: None,
            pairs_examined: 0,
            pairs_gated: 0,
            skipped_pairs: 0,
            candidates: Tally::default(),
            created: Tally::default(),
            duplicates: 0,
            persist_failures: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Number of newly created contradictions.
    #[must_use]
    pub fn new_contradictions(&self) -> usize {
        self.created.total()
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Human-readable status line for the job record.
    #[must_use]
    pub fn message(&self) -> String {
        if self.claims_analyzed < 2 {
            return "completed, nothing to analyze".to_string();
        }
        let mut msg = format!(
            "found {} new contradiction(s) among {} candidate(s) from {} claims",
            self.new_contradictions(),
            self.candidates.total(),
            self.claims_analyzed
        );
        if self.skipped_pairs > 0 {
            msg.push_str(&format!(", {} pair(s) skipped", self.skipped_pairs));
        }
        if self.persist_failures > 0 {
            msg.push_str(&format!(", {} write(s) failed", self.persist_failures));
        }
        msg
    }
}

/// Reporting view of a case's contradictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSummary {
    /// The summarized case.
    pub case_id: CaseId,
    /// Records for the case, resolved or not.
    pub total: usize,
    /// Records still awaiting review.
    pub unresolved: usize,
    /// Counts over all records, resolved or not.
    pub all: Tally,
    /// Counts over unresolved records.
    pub open: Tally,
    /// Most severe unresolved records: severity, then confidence, then oldest first.
    pub most_severe: Vec<Contradiction>,
}

impl CaseSummary {
    /// Builds the summary from every record of the case and its unresolved
    /// subset. Resolved entries slipped into `open` are ignored.
    #[must_use]
    pub fn from_records(
        case_id: CaseId,
        records: &[Contradiction],
        open: Vec<Contradiction>,
        top_n: usize,
    ) -> Self {
        let all = Tally::of_records(records);
        let total = records.len();

        let mut open: Vec<Contradiction> = open.into_iter().filter(|c| !c.resolved).collect();
        let open_tally = Tally::of_records(&open);
        let unresolved = open.len();

        open.sort_by(|x, y| {
            y.severity
                .cmp(&x.severity)
                .then_with(|| y.confidence.total_cmp(&x.confidence))
                .then_with(|| x.detected_at.cmp(&y.detected_at))
        });
        open.truncate(top_n);

        Self {
            case_id,
            total,
            unresolved,
            all,
            open: open_tally,
            most_severe: open,
        }
    }
}
