//! Storage contracts and the in-memory backend.
//!
//! The engine is storage-agnostic: claims come from a [`ClaimSource`] and
//! contradictions go to a [`ContradictionStore`].

mod memory;
mod traits;

pub use memory::{InMemoryClaimSource, InMemoryContradictionStore};
pub use traits::{ClaimSource, ContradictionStore, InsertOutcome, StorageError};
