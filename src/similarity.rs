//! Similarity index.
//!
//! For a batch of claims the index produces either a full cosine matrix
//! (one batched embed call plus one matrix product) or, when no encoder is
//! configured, the corpus is too large for one batch, or the encoder fails,
//! a lexical token-Jaccard index evaluated lazily per pair.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::claim::Claim;
use crate::embedding::{l2_normalize, tokenize, Embedder, EmbeddingError};

/// Similarity capability, resolved once when the engine is built.
#[derive(Clone)]
pub enum SimilarityBackend {
    /// A batched vector encoder is available.
    Encoder(Arc<dyn Embedder>),
    /// Token-overlap metric only.
    Lexical,
}

impl SimilarityBackend {
    /// Resolves the capability from an optional encoder.
    #[must_use]
    pub fn resolve(embedder: Option<Arc<dyn Embedder>>) -> Self {
        embedder.map_or(Self::Lexical, Self::Encoder)
    }

    /// Encoder name, or `"lexical"`.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Encoder(e) => e.name(),
            Self::Lexical => "lexical",
        }
    }

    /// Returns true if an encoder is configured.
    #[must_use]
    pub const fn is_semantic(&self) -> bool {
        matches!(self, Self::Encoder(_))
    }
}

impl fmt::Debug for SimilarityBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder(e) => write!(f, "Encoder({})", e.name()),
            Self::Lexical => write!(f, "Lexical"),
        }
    }
}

/// Which metric actually produced a run's similarity scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    /// Cosine over encoder vectors.
    Semantic,
    /// Token-set Jaccard.
    Lexical,
}

/// Token-set Jaccard similarity; 0.0 when either set is empty.
#[must_use]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    #[allow(clippy::cast_precision_loss)]
    let score = intersection as f32 / union as f32;
    score
}

/// Lower-cased alphanumeric token set of a text.
#[must_use]
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(&text.to_lowercase()).map(str::to_string).collect()
}

/// Dense N×N cosine similarity matrix, row-major.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Builds the matrix from one embedding per claim.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::DimensionMismatch` if vectors differ in length.
    pub fn from_embeddings(mut embeddings: Vec<Vec<f32>>) -> Result<Self, EmbeddingError> {
        let n = embeddings.len();
        if let Some(first) = embeddings.first() {
            let dim = first.len();
            if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
                return Err(EmbeddingError::DimensionMismatch(dim, bad.len()));
            }
        }

        for e in &mut embeddings {
            l2_normalize(e);
        }

        let mut values = vec![0.0f32; n * n];
        if n > 0 {
            values.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
                let a = &embeddings[i];
                for (j, cell) in row.iter_mut().enumerate() {
                    *cell = a.iter().zip(&embeddings[j]).map(|(x, y)| x * y).sum();
                }
            });
        }

        Ok(Self { n, values })
    }

    /// Number of rows (claims).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.n
    }

    /// Returns true for a matrix over no claims.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Similarity of claims `i` and `j`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.n + j]
    }

    /// Upper-triangle pairs (diagonal excluded) at or above `threshold`.
    pub fn pairs_at_or_above(&self, threshold: f32) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        (0..self.n).flat_map(move |i| {
            ((i + 1)..self.n).filter_map(move |j| {
                let s = self.get(i, j);
                (s >= threshold).then_some((i, j, s))
            })
        })
    }
}

/// Cached token sets for lazy per-pair Jaccard.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    tokens: Vec<HashSet<String>>,
}

impl LexicalIndex {
    /// Tokenizes every claim text once.
    #[must_use]
    pub fn new(claims: &[Claim]) -> Self {
        Self {
            tokens: claims.iter().map(|c| token_set(&c.claim_text)).collect(),
        }
    }

    /// Jaccard similarity of claims `i` and `j`.
    #[must_use]
    pub fn similarity(&self, i: usize, j: usize) -> f32 {
        jaccard(&self.tokens[i], &self.tokens[j])
    }
}

/// The similarity structure a run works with.
#[derive(Debug, Clone)]
pub enum SimilarityView {
    /// Precomputed cosine scores.
    Matrix(SimilarityMatrix),
    /// Lazily scored token overlap.
    Lexical(LexicalIndex),
}

impl SimilarityView {
    /// Metric behind this view.
    #[must_use]
    pub const fn kind(&self) -> SimilarityKind {
        match self {
            Self::Matrix(_) => SimilarityKind::Semantic,
            Self::Lexical(_) => SimilarityKind::Lexical,
        }
    }

    /// Similarity of claims `i` and `j` under whichever metric is active.
    #[must_use]
    pub fn similarity(&self, i: usize, j: usize) -> f32 {
        match self {
            Self::Matrix(m) => m.get(i, j),
            Self::Lexical(l) => l.similarity(i, j),
        }
    }
}

/// Builds the similarity view for a batch of claims.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    backend: SimilarityBackend,
    max_embed_batch: usize,
}

impl SimilarityIndex {
    /// Creates an index over the resolved backend.
    #[must_use]
    pub fn new(backend: SimilarityBackend, max_embed_batch: usize) -> Self {
        Self {
            backend,
            max_embed_batch,
        }
    }

    /// The configured backend.
    #[must_use]
    pub const fn backend(&self) -> &SimilarityBackend {
        &self.backend
    }

    /// Produces the similarity view. Never fails: encoder problems degrade
    /// to the lexical metric.
    #[must_use]
    pub fn build(&self, claims: &[Claim]) -> SimilarityView {
        let SimilarityBackend::Encoder(embedder) = &self.backend else {
            return SimilarityView::Lexical(LexicalIndex::new(claims));
        };

        if claims.len() > self.max_embed_batch {
            debug!(
                claims = claims.len(),
                max_embed_batch = self.max_embed_batch,
                "corpus exceeds embed batch, using metadata blocking"
            );
            return SimilarityView::Lexical(LexicalIndex::new(claims));
        }

        match Self::embed_matrix(embedder.as_ref(), claims) {
            Ok(matrix) => SimilarityView::Matrix(matrix),
            Err(e) => {
                warn!(
                    backend = embedder.name(),
                    error = %e,
                    "embedding failed, falling back to lexical similarity"
                );
                SimilarityView::Lexical(LexicalIndex::new(claims))
            }
        }
    }

    fn embed_matrix(embedder: &dyn Embedder, claims: &[Claim]) -> Result<SimilarityMatrix, EmbeddingError> {
        let texts: Vec<&str> = claims.iter().map(|c| c.claim_text.as_str()).collect();
        let embeddings = embedder.embed(&texts)?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::BatchSizeMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }
        SimilarityMatrix::from_embeddings(embeddings)
    }
}
