//! Contradiction detection engine.
//!
//! [`ContradictionEngine`] ties the pipeline together: similarity scoring,
//! candidate generation, rule classification and deduplicating persistence.
//! Its collaborators are injected at construction so tests can substitute a
//! deterministic encoder and in-memory stores.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::blocking::{CandidateGenerator, CandidateSet};
use crate::claim::{CaseId, Claim};
use crate::config::EngineConfig;
use crate::conflict::{Classification, ConflictClassifier, ContradictionCandidate};
use crate::contradiction::{Contradiction, ContradictionId};
use crate::embedding::Embedder;
use crate::error::{EngineError, EngineResult, ExecutionError};
use crate::persist::{self, SaveReport};
use crate::progress::{ProgressSink, RunId, RunStatus};
use crate::report::{CaseSummary, RunSummary, Tally};
use crate::similarity::{SimilarityBackend, SimilarityIndex, SimilarityKind};
use crate::storage::{ClaimSource, ContradictionStore};

const PROGRESS_LOADING: u8 = 5;
const PROGRESS_SIMILARITY: u8 = 30;
const PROGRESS_CLASSIFICATION: u8 = 60;
const PROGRESS_PERSISTENCE: u8 = 90;

/// Candidates of one detection pass plus the counters behind them.
#[derive(Debug, Default)]
pub struct Detection {
    /// Classified pairs, in candidate order.
    pub candidates: Vec<ContradictionCandidate>,
    /// Claims of the case that took part.
    pub claims_analyzed: usize,
    /// `None` when fewer than two claims were given.
    pub similarity: Option<SimilarityKind>,
    /// Distinct pairs whose similarity was evaluated.
    pub pairs_examined: usize,
    /// Pairs that passed the similarity gate.
    pub pairs_gated: usize,
    /// Pairs dropped because a rule could not evaluate them.
    pub skipped_pairs: usize,
}

/// Cross-claim contradiction detection engine.
pub struct ContradictionEngine {
    config: EngineConfig,
    similarity: SimilarityIndex,
    generator: CandidateGenerator,
    classifier: ConflictClassifier,
    claims: Arc<dyn ClaimSource>,
    store: Arc<dyn ContradictionStore>,
    active_runs: Mutex<HashSet<CaseId>>,
}

impl fmt::Debug for ContradictionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContradictionEngine")
            .field("config", &self.config)
            .field("backend", &self.similarity.backend().name())
            .finish_non_exhaustive()
    }
}

impl ContradictionEngine {
    /// Creates an engine. Without an embedder, similarity is lexical.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the configuration is invalid.
    pub fn new(
        config: EngineConfig,
        embedder: Option<Arc<dyn Embedder>>,
        claims: Arc<dyn ClaimSource>,
        store: Arc<dyn ContradictionStore>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let backend = SimilarityBackend::resolve(embedder);
        debug!(backend = backend.name(), "similarity backend resolved");

        Ok(Self {
            similarity: SimilarityIndex::new(backend, config.max_embed_batch),
            generator: CandidateGenerator::new(config.similarity_threshold, config.lexical_threshold),
            classifier: ConflictClassifier::new(config.author_matching),
            config,
            claims,
            store,
            active_runs: Mutex::new(HashSet::new()),
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The similarity backend chosen at construction.
    #[must_use]
    pub const fn similarity_backend(&self) -> &SimilarityBackend {
        self.similarity.backend()
    }

    /// Finds contradiction candidates among the claims of a case.
    ///
    /// Pure: nothing is persisted. Claims belonging to other cases are
    /// ignored, and fewer than two claims yield an empty result.
    #[must_use]
    pub fn detect_contradictions(&self, claims: &[Claim], case_id: CaseId) -> Vec<ContradictionCandidate> {
        self.detect_with_stats(claims, case_id).candidates
    }

    /// Like [`detect_contradictions`](Self::detect_contradictions), with counters.
    #[must_use]
    pub fn detect_with_stats(&self, claims: &[Claim], case_id: CaseId) -> Detection {
        let claims = claims_of_case(claims, case_id);
        if claims.len() < 2 {
            return Detection {
                claims_analyzed: claims.len(),
                ..Detection::default()
            };
        }

        let (kind, gated) = self.score(&claims);
        let classified = self.classify(&claims, &gated);

        Detection {
            claims_analyzed: claims.len(),
            similarity: Some(kind),
            pairs_examined: gated.examined,
            pairs_gated: gated.pairs.len(),
            skipped_pairs: classified.skipped_pairs,
            candidates: classified.candidates,
        }
    }

    /// Persists candidates for a case and returns the number of new rows.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::StorageUnavailable` if the store cannot be reached.
    pub fn save_contradictions(&self, candidates: &[ContradictionCandidate], case_id: CaseId) -> EngineResult<usize> {
        self.save_with_report(candidates, case_id).map(|r| r.created)
    }

    /// Persists candidates and returns the full save report.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::StorageUnavailable` if the store cannot be reached.
    pub fn save_with_report(&self, candidates: &[ContradictionCandidate], case_id: CaseId) -> EngineResult<SaveReport> {
        persist::save_contradictions(self.store.as_ref(), case_id, candidates)
    }

    /// Runs detection for a stored case, reporting progress to `sink`.
    ///
    /// Only one run per case may be active at a time. Contradictions saved
    /// before a failure stay saved.
    ///
    /// # Errors
    ///
    /// - `ExecutionError::RunInProgress` if the case already has an active run.
    /// - `ExecutionError::ClaimLoad` if claims cannot be loaded.
    /// - `ExecutionError::Aborted` if the sink requested an abort.
    /// - `ExecutionError::StorageUnavailable` if the store is unreachable.
    pub fn run_case(&self, run_id: RunId, case_id: CaseId, sink: &dyn ProgressSink) -> EngineResult<RunSummary> {
        let _guard = match RunGuard::acquire(&self.active_runs, case_id) {
            Ok(guard) => guard,
            Err(e) => {
                sink.mark_failed(run_id, &e.to_string());
                return Err(e);
            }
        };

        info!(run_id = %run_id, case_id = %case_id, "detection run started");
        let mut summary = RunSummary::new(run_id, case_id);

        match self.run_phases(run_id, case_id, sink, &mut summary) {
            Ok(()) => {
                summary.finish(RunStatus::Completed);
                let message = summary.message();
                info!(
                    run_id = %run_id,
                    case_id = %case_id,
                    claims = summary.claims_analyzed,
                    candidates = summary.candidates.total(),
                    created = summary.new_contradictions(),
                    "detection run completed"
                );
                sink.mark_completed(run_id, &message);
                Ok(summary)
            }
            Err(e) if e.is_aborted() => {
                info!(run_id = %run_id, case_id = %case_id, reason = %e, "detection run aborted");
                sink.mark_aborted(run_id, &e.to_string());
                Err(e)
            }
            Err(e) => {
                info!(run_id = %run_id, case_id = %case_id, error = %e, "detection run failed");
                sink.mark_failed(run_id, &e.to_string());
                Err(e)
            }
        }
    }

    fn run_phases(
        &self,
        run_id: RunId,
        case_id: CaseId,
        sink: &dyn ProgressSink,
        summary: &mut RunSummary,
    ) -> EngineResult<()> {
        sink.report_progress(run_id, PROGRESS_LOADING, "loading claims");
        let loaded = self
            .claims
            .load_claims(case_id)
            .map_err(|e| ExecutionError::ClaimLoad {
                case_id,
                message: e.to_string(),
            })?;
        let claims = claims_of_case(&loaded, case_id);
        summary.claims_analyzed = claims.len();
        debug!(run_id = %run_id, claims = claims.len(), "claims loaded");

        if claims.len() < 2 {
            return Ok(());
        }

        check_abort(sink, run_id, "similarity")?;
        sink.report_progress(
            run_id,
            PROGRESS_SIMILARITY,
            &format!("computing similarity for {} claims", claims.len()),
        );
        let (kind, gated) = self.score(&claims);
        summary.similarity = Some(kind);
        summary.pairs_examined = gated.examined;
        summary.pairs_gated = gated.pairs.len();
        debug!(
            run_id = %run_id,
            similarity = ?kind,
            examined = gated.examined,
            gated = gated.pairs.len(),
            "candidate pairs generated"
        );

        check_abort(sink, run_id, "classification")?;
        sink.report_progress(
            run_id,
            PROGRESS_CLASSIFICATION,
            &format!("classifying {} candidate pairs", gated.pairs.len()),
        );
        let classified = self.classify(&claims, &gated);
        summary.skipped_pairs = classified.skipped_pairs;
        summary.candidates = Tally::of_candidates(&classified.candidates);

        check_abort(sink, run_id, "persistence")?;
        sink.report_progress(
            run_id,
            PROGRESS_PERSISTENCE,
            &format!("saving {} contradictions", classified.candidates.len()),
        );
        let saved = self.save_with_report(&classified.candidates, case_id)?;
        summary.created = saved.tally;
        summary.duplicates = saved.duplicates;
        summary.persist_failures = saved.failed;
        Ok(())
    }

    /// Marks a contradiction resolved by a reviewer.
    ///
    /// Resolving an already resolved record leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::ContradictionNotFound` for an unknown id and
    /// `StorageError` if the store fails.
    pub fn resolve_contradiction(
        &self,
        id: ContradictionId,
        resolver: &str,
        note: Option<String>,
    ) -> EngineResult<Contradiction> {
        let mut record = self
            .store
            .get(id)?
            .ok_or(ExecutionError::ContradictionNotFound { id })?;

        if record.resolved {
            debug!(contradiction_id = %id, "contradiction already resolved");
            return Ok(record);
        }

        record.resolve(resolver, note);
        self.store.update(record.clone())?;
        info!(contradiction_id = %id, resolved_by = resolver, "contradiction resolved");
        Ok(record)
    }

    /// Counts and most severe open items for a case.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub fn case_summary(&self, case_id: CaseId) -> EngineResult<CaseSummary> {
        let records = self.store.find_by_case(case_id)?;
        let open = self.store.find_unresolved(case_id)?;
        Ok(CaseSummary::from_records(
            case_id,
            &records,
            open,
            self.config.summary_top_n,
        ))
    }

    fn score(&self, claims: &[Claim]) -> (SimilarityKind, CandidateSet) {
        let view = self.similarity.build(claims);
        (view.kind(), self.generator.generate(claims, &view))
    }

    fn classify(&self, claims: &[Claim], gated: &CandidateSet) -> Classification {
        self.classifier
            .classify_pairs(claims, &gated.pairs, self.config.parallel_classification)
    }
}

fn claims_of_case(claims: &[Claim], case_id: CaseId) -> Cow<'_, [Claim]> {
    if claims.iter().all(|c| c.case_id == case_id) {
        Cow::Borrowed(claims)
    } else {
        Cow::Owned(claims.iter().filter(|c| c.case_id == case_id).cloned().collect())
    }
}

fn check_abort(sink: &dyn ProgressSink, run_id: RunId, phase: &'static str) -> EngineResult<()> {
    if sink.is_aborted(run_id) {
        return Err(ExecutionError::Aborted { phase }.into());
    }
    Ok(())
}

/// Holds a case's slot in the active-run set until dropped.
struct RunGuard<'a> {
    active: &'a Mutex<HashSet<CaseId>>,
    case_id: CaseId,
}

impl<'a> RunGuard<'a> {
    fn acquire(active: &'a Mutex<HashSet<CaseId>>, case_id: CaseId) -> EngineResult<Self> {
        let mut runs = active
            .lock()
            .map_err(|_| EngineError::internal("active run set lock poisoned"))?;
        if !runs.insert(case_id) {
            return Err(ExecutionError::RunInProgress { case_id }.into());
        }
        Ok(Self { active, case_id })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut runs) = self.active.lock() {
            runs.remove(&self.case_id);
        }
    }
}
