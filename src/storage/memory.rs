//! In-memory storage backend.
//!
//! Thread-safe implementations of the storage traits, intended for embedded
//! usage, tests, and as a reference implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::blocking::PairKey;
use crate::claim::{CaseId, Claim, ClaimId};
use crate::contradiction::{Contradiction, ContradictionId};
use crate::storage::traits::{ClaimSource, ContradictionStore, InsertOutcome, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory claim source.
#[derive(Debug, Default)]
pub struct InMemoryClaimSource {
    by_case: RwLock<HashMap<CaseId, Vec<Claim>>>,
}

impl InMemoryClaimSource {
    /// Create a new empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds claims, filed under each claim's own case.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::BackendError` if the lock is poisoned.
    pub fn extend(&self, claims: impl IntoIterator<Item = Claim>) -> Result<(), StorageError> {
        let mut state = self.by_case.write().map_err(|_| lock_err("claims.extend"))?;
        for claim in claims {
            state.entry(claim.case_id).or_default().push(claim);
        }
        Ok(())
    }
}

impl ClaimSource for InMemoryClaimSource {
    fn load_claims(&self, case_id: CaseId) -> Result<Vec<Claim>, StorageError> {
        let state = self.by_case.read().map_err(|_| lock_err("claims.load"))?;
        Ok(state.get(&case_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
struct ContradictionState {
    by_id: HashMap<ContradictionId, Contradiction>,
    by_pair: HashMap<(CaseId, PairKey), ContradictionId>,
    by_case: HashMap<CaseId, Vec<ContradictionId>>,
    by_claim: HashMap<ClaimId, Vec<ContradictionId>>,
}

/// Thread-safe in-memory contradiction store.
#[derive(Debug, Default)]
pub struct InMemoryContradictionStore {
    state: RwLock<ContradictionState>,
}

impl InMemoryContradictionStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::BackendError` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("contradiction.len"))?;
        Ok(state.by_id.len())
    }

    /// Returns true if nothing has been stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::BackendError` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl ContradictionStore for InMemoryContradictionStore {
    fn ping(&self) -> Result<(), StorageError> {
        self.state.read().map(|_| ()).map_err(|_| lock_err("contradiction.ping"))
    }

    fn insert_if_absent(&self, contradiction: Contradiction) -> Result<InsertOutcome, StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("contradiction.insert"))?;

        if state.by_id.contains_key(&contradiction.id) {
            return Err(StorageError::DuplicateKey(contradiction.id.to_string()));
        }

        let pair = (contradiction.case_id, contradiction.pair_key());
        if let Some(existing) = state.by_pair.get(&pair) {
            return Ok(InsertOutcome::Duplicate(*existing));
        }

        let id = contradiction.id;
        state.by_pair.insert(pair, id);
        state.by_case.entry(contradiction.case_id).or_default().push(id);
        for claim_id in [contradiction.claim_a, contradiction.claim_b] {
            state.by_claim.entry(claim_id).or_default().push(id);
        }
        state.by_id.insert(id, contradiction);
        Ok(InsertOutcome::Inserted)
    }

    fn find_pair(
        &self,
        case_id: CaseId,
        a: ClaimId,
        b: ClaimId,
    ) -> Result<Option<Contradiction>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("contradiction.find_pair"))?;
        Ok(state
            .by_pair
            .get(&(case_id, PairKey::new(a, b)))
            .and_then(|id| state.by_id.get(id).cloned()))
    }

    fn get(&self, id: ContradictionId) -> Result<Option<Contradiction>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("contradiction.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn update(&self, contradiction: Contradiction) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("contradiction.update"))?;

        let old = state
            .by_id
            .get(&contradiction.id)
            .ok_or(StorageError::ContradictionNotFound(contradiction.id))?;

        if old.case_id != contradiction.case_id || old.pair_key() != contradiction.pair_key() {
            return Err(StorageError::BackendError(format!(
                "contradiction {} cannot change its case or claim pair",
                contradiction.id
            )));
        }

        state.by_id.insert(contradiction.id, contradiction);
        Ok(())
    }

    fn find_by_case(&self, case_id: CaseId) -> Result<Vec<Contradiction>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("contradiction.find_by_case"))?;

        let Some(ids) = state.by_case.get(&case_id) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect())
    }

    fn find_by_claim(&self, claim_id: ClaimId) -> Result<Vec<Contradiction>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("contradiction.find_by_claim"))?;

        let Some(ids) = state.by_claim.get(&claim_id) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect())
    }
}
