//! Deduplicating persister.
//!
//! Writes new contradiction records for a case and skips pairs that are
//! already recorded in either order. Candidates are independent: a failed
//! write is logged and the batch continues. Only a backend that is
//! unreachable for the whole batch fails the call.

use serde::Serialize;
use tracing::{debug, warn};

use crate::claim::CaseId;
use crate::conflict::ContradictionCandidate;
use crate::contradiction::Contradiction;
use crate::error::{EngineResult, ExecutionError};
use crate::report::Tally;
use crate::storage::{ContradictionStore, InsertOutcome};

/// What a save call did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveReport {
    /// Newly created rows. This, not the candidate count, is what gets reported upward.
    pub created: usize,
    /// Candidates whose pair was already recorded.
    pub duplicates: usize,
    /// Candidates whose write failed.
    pub failed: usize,
    /// Type/severity tally of the newly created rows.
    pub tally: Tally,
}

/// Persists candidates for a case, skipping already-recorded pairs.
///
/// # Errors
///
/// Returns `ExecutionError::StorageUnavailable` if the store is unreachable
/// before the batch starts or for every write in it.
pub fn save_contradictions(
    store: &dyn ContradictionStore,
    case_id: CaseId,
    candidates: &[ContradictionCandidate],
) -> EngineResult<SaveReport> {
    store.ping().map_err(|e| ExecutionError::StorageUnavailable {
        message: e.to_string(),
    })?;

    let mut report = SaveReport::default();
    let mut unavailable = 0usize;
    let mut last_unavailable = None;

    for candidate in candidates {
        let record = Contradiction::from_candidate(case_id, candidate);
        let (kind, severity) = (record.contradiction_type, record.severity);

        match store.insert_if_absent(record) {
            Ok(InsertOutcome::Inserted) => {
                report.created += 1;
                report.tally.add(kind, severity);
            }
            Ok(InsertOutcome::Duplicate(existing)) => {
                debug!(
                    case_id = %case_id,
                    claim_a = %candidate.claim_a,
                    claim_b = %candidate.claim_b,
                    existing = %existing,
                    "pair already recorded"
                );
                report.duplicates += 1;
            }
            Err(e) => {
                warn!(
                    case_id = %case_id,
                    claim_a = %candidate.claim_a,
                    claim_b = %candidate.claim_b,
                    error = %e,
                    "failed to persist contradiction"
                );
                report.failed += 1;
                if e.is_unavailable() {
                    unavailable += 1;
                    last_unavailable = Some(e);
                }
            }
        }
    }

    if !candidates.is_empty() && unavailable == candidates.len() {
        if let Some(e) = last_unavailable {
            return Err(ExecutionError::StorageUnavailable {
                message: e.to_string(),
            }
            .into());
        }
    }

    Ok(report)
}
