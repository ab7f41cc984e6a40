//! Candidate-pair generation.
//!
//! Two paths produce the same kind of output, a deduplicated list of
//! `(claim_a, claim_b, similarity)` triples:
//! - with a similarity matrix, every upper-triangle pair at or above the
//!   semantic threshold is a candidate;
//! - otherwise claims are partitioned into subject and author blocks and only
//!   pairs sharing a block are scored, lazily, with the lexical metric.
//!
//! A pair already examined under one block is never examined again under
//! another.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claim::{Claim, ClaimId};
use crate::similarity::{LexicalIndex, SimilarityMatrix, SimilarityView};

/// An unordered pair of claim IDs, stored smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    low: ClaimId,
    high: ClaimId,
}

impl PairKey {
    /// Builds the key from two IDs in any order.
    #[must_use]
    pub fn new(a: ClaimId, b: ClaimId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// The smaller ID.
    #[must_use]
    pub const fn low(&self) -> ClaimId {
        self.low
    }

    /// The larger ID.
    #[must_use]
    pub const fn high(&self) -> ClaimId {
        self.high
    }

    /// Returns true if the pair refers to a single claim twice.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.low == self.high
    }
}

/// Set of unordered pairs already examined in a run.
#[derive(Debug, Default)]
pub struct PairSet {
    seen: HashSet<PairKey>,
}

impl PairSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pair. Returns false if it was already present or names
    /// one claim twice.
    pub fn insert(&mut self, a: ClaimId, b: ClaimId) -> bool {
        self.visit(PairKey::new(a, b))
    }

    /// Records a pair of distinct claims. Returns false for a claim paired
    /// with itself or a pair already present.
    fn visit(&mut self, key: PairKey) -> bool {
        !key.is_degenerate() && self.seen.insert(key)
    }

    /// Returns true if the pair was recorded, in either order.
    #[must_use]
    pub fn contains(&self, a: ClaimId, b: ClaimId) -> bool {
        self.seen.contains(&PairKey::new(a, b))
    }

    /// Number of distinct pairs recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if no pair was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// A pair that passed the similarity gate, by index into the run's claim slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    /// Index of the first claim.
    pub a: usize,
    /// Index of the second claim, always greater than `a`.
    pub b: usize,
    /// Score under the run's active metric.
    pub similarity: f32,
}

/// Claims partitioned by normalized subject and by normalized author.
///
/// Claims without a key are left out of that partition.
#[derive(Debug, Default)]
pub struct Blocks {
    by_subject: BTreeMap<String, Vec<usize>>,
    by_author: BTreeMap<String, Vec<usize>>,
}

impl Blocks {
    /// Partitions claims by their normalized subject and author keys.
    #[must_use]
    pub fn build(claims: &[Claim]) -> Self {
        let mut blocks = Self::default();
        for (idx, claim) in claims.iter().enumerate() {
            if let Some(key) = claim.subject_key() {
                blocks.by_subject.entry(key).or_default().push(idx);
            }
            if let Some(key) = claim.author_key() {
                blocks.by_author.entry(key).or_default().push(idx);
            }
        }
        blocks
    }

    /// Number of distinct subjects.
    #[must_use]
    pub fn subject_block_count(&self) -> usize {
        self.by_subject.len()
    }

    /// Number of distinct authors.
    #[must_use]
    pub fn author_block_count(&self) -> usize {
        self.by_author.len()
    }

    /// Number of within-block comparisons before cross-block dedup.
    #[must_use]
    pub fn comparison_upper_bound(&self) -> usize {
        self.by_subject
            .values()
            .chain(self.by_author.values())
            .map(|b| b.len() * b.len().saturating_sub(1) / 2)
            .sum()
    }

    fn iter(&self) -> impl Iterator<Item = &Vec<usize>> {
        self.by_subject.values().chain(self.by_author.values())
    }
}

/// Output of candidate generation.
#[derive(Debug, Default)]
pub struct CandidateSet {
    /// Pairs at or above the similarity gate.
    pub pairs: Vec<CandidatePair>,
    /// Distinct pairs whose similarity was evaluated.
    pub examined: usize,
}

/// Turns a similarity view into gated, deduplicated candidate pairs.
#[derive(Debug, Clone, Copy)]
pub struct CandidateGenerator {
    semantic_threshold: f32,
    lexical_threshold: f32,
}

impl CandidateGenerator {
    /// Creates a generator with one threshold per metric.
    #[must_use]
    pub const fn new(semantic_threshold: f32, lexical_threshold: f32) -> Self {
        Self {
            semantic_threshold,
            lexical_threshold,
        }
    }

    /// Produces the gated pairs for `claims` under `view`.
    ///
    /// Claims with equal IDs are never paired with each other.
    #[must_use]
    pub fn generate(&self, claims: &[Claim], view: &SimilarityView) -> CandidateSet {
        match view {
            SimilarityView::Matrix(m) => self.from_matrix(claims, m),
            SimilarityView::Lexical(l) => self.from_blocks(claims, l),
        }
    }

    fn from_matrix(&self, claims: &[Claim], matrix: &SimilarityMatrix) -> CandidateSet {
        let mut seen = PairSet::new();
        let mut pairs = Vec::new();
        for (a, b, similarity) in matrix.pairs_at_or_above(self.semantic_threshold) {
            if !seen.visit(PairKey::new(claims[a].id, claims[b].id)) {
                continue;
            }
            pairs.push(CandidatePair { a, b, similarity });
        }
        let n = matrix.len();
        CandidateSet {
            pairs,
            examined: n * n.saturating_sub(1) / 2,
        }
    }

    fn from_blocks(&self, claims: &[Claim], lexical: &LexicalIndex) -> CandidateSet {
        let blocks = Blocks::build(claims);
        let mut seen = PairSet::new();
        let mut pairs = Vec::new();

        for block in blocks.iter() {
            for (pos, &a) in block.iter().enumerate() {
                for &b in &block[pos + 1..] {
                    if !seen.visit(PairKey::new(claims[a].id, claims[b].id)) {
                        continue;
                    }
                    let similarity = lexical.similarity(a, b);
                    if similarity >= self.lexical_threshold {
                        pairs.push(CandidatePair { a, b, similarity });
                    }
                }
            }
        }

        debug!(
            subject_blocks = blocks.subject_block_count(),
            author_blocks = blocks.author_block_count(),
            upper_bound = blocks.comparison_upper_bound(),
            examined = seen.len(),
            gated = pairs.len(),
            "blocked candidate generation"
        );

        CandidateSet {
            pairs,
            examined: seen.len(),
        }
    }
}
