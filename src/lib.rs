//! # crossclaim - Cross-Claim Contradiction Detection
//!
//! crossclaim finds pairs of claims within a legal case that conflict with
//! each other, classifies how they conflict, scores severity, and records
//! each unordered pair once for human review.
//!
//! ## Pipeline
//!
//! - **Similarity**: cosine over a batched embedding matrix, or token Jaccard
//!   when no encoder is configured or embedding fails
//! - **Blocking**: thresholded matrix pairs, or subject/author blocks for the
//!   lexical path
//! - **Classification**: five ordered rules, first match wins
//! - **Persistence**: atomic insert-if-absent keyed on the unordered pair
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use crossclaim::{
//!     CaseId, Claim, ContradictionEngine, EngineConfig, InMemoryClaimSource,
//!     InMemoryContradictionStore, Polarity,
//! };
//!
//! let case_id = CaseId::new();
//! let claims = vec![
//!     Claim::builder()
//!         .case_id(case_id)
//!         .text("The father attended the visit")
//!         .subject("father")
//!         .asserted_by("Officer Smith")
//!         .build()?,
//!     Claim::builder()
//!         .case_id(case_id)
//!         .text("The father did not attend the visit")
//!         .subject("father")
//!         .asserted_by("Officer Smith")
//!         .polarity(Polarity::Negate)
//!         .build()?,
//! ];
//!
//! let engine = ContradictionEngine::new(
//!     EngineConfig::default(),
//!     None,
//!     Arc::new(InMemoryClaimSource::new()),
//!     Arc::new(InMemoryContradictionStore::new()),
//! )?;
//!
//! let candidates = engine.detect_contradictions(&claims, case_id);
//! assert_eq!(candidates.len(), 1);
//! assert_eq!(engine.save_contradictions(&candidates, case_id)?, 1);
//! assert_eq!(engine.save_contradictions(&candidates, case_id)?, 0);
//! # Ok::<(), crossclaim::EngineError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod claim;
pub mod config;
pub mod contradiction;
pub mod error;
pub mod severity;

// Detection pipeline
pub mod blocking;
pub mod conflict;
pub mod embedding;
pub mod similarity;

// Persistence and runs
pub mod engine;
pub mod persist;
pub mod progress;
pub mod report;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use claim::{CaseId, Claim, ClaimBuilder, ClaimId, DocumentId, Modality, Polarity};
pub use config::{AuthorMatching, EngineConfig};
pub use conflict::{ConflictClassifier, ContradictionCandidate, ContradictionType};
pub use contradiction::{Contradiction, ContradictionId};
pub use embedding::{Embedder, EmbeddingError, HashingEmbedder};
pub use engine::{ContradictionEngine, Detection};
pub use error::{ClassificationError, EngineError, EngineResult, ExecutionError, ValidationError};
pub use persist::SaveReport;
pub use progress::{ChannelProgressSink, JobTracker, ProgressEvent, ProgressSink, ProgressStream, RunId, RunStatus};
pub use report::{CaseSummary, RunSummary, Tally};
pub use severity::Severity;
pub use similarity::{SimilarityBackend, SimilarityKind};
pub use storage::{
    ClaimSource, ContradictionStore, InMemoryClaimSource, InMemoryContradictionStore, InsertOutcome, StorageError,
};
