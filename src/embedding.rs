//! Embedding backends.
//!
//! The engine consumes an optional `embed(texts) -> matrix` capability. Any
//! learned encoder can be plugged in through [`Embedder`]; the crate ships
//! [`HashingEmbedder`], a deterministic offline encoder based on feature
//! hashing over tokens. It is *not* a neural model, but it gives the matrix
//! path a stable baseline and gives tests a reproducible encoder.

use blake3::Hasher;
use thiserror::Error;

/// Default embedding dimensionality for hashed embeddings.
pub const DEFAULT_EMBEDDING_DIM: usize = 256;

/// Errors reported by an embedding backend.
///
/// The similarity index treats every variant as recoverable and falls back
/// to the lexical metric.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Backend could not be reached or is not loaded.
    #[error("Embedding backend unavailable: {0}")]
    Unavailable(String),

    /// Backend returned a malformed batch.
    #[error("Embedding backend returned {actual} vectors for {expected} texts")]
    BatchSizeMismatch {
        /// Number of texts sent.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },

    /// Vectors in one batch had different dimensions.
    #[error("Embedding dimension mismatch: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    /// Any other backend failure.
    #[error("Embedding backend error: {0}")]
    Backend(String),
}

/// A batched text encoder.
///
/// Implementations must return exactly one vector per input text, all with
/// the same dimension.
pub trait Embedder: Send + Sync {
    /// Short name used in logs and run reports.
    fn name(&self) -> &str;

    /// Embeds a batch of texts in one call.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

pub(crate) fn tokenize(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// Deterministic feature-hashing encoder.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    /// Creates an encoder with the given dimension (minimum 1).
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Output vector length.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Embeds one text into an L2-normalized vector.
    #[must_use]
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        let mut count = 0u32;

        for token in tokenize(&text.to_lowercase()) {
            let mut h = Hasher::new();
            h.update(token.as_bytes());
            let hash = h.finalize();
            let bytes = hash.as_bytes();

            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            #[allow(clippy::cast_possible_truncation)]
            let idx = (u64::from_le_bytes(bucket) % self.dim as u64) as usize;
            let sign = if (bytes[8] & 1) == 0 { 1.0f32 } else { -1.0f32 };
            vec[idx] += sign;
            count = count.saturating_add(1);
        }

        if count > 0 {
            l2_normalize(&mut vec);
        }
        vec
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// L2-normalizes `vec` in place. Zero vectors are left untouched.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm2: f64 = vec.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    if norm2 > 0.0 {
        #[allow(clippy::cast_possible_truncation)]
        let inv = norm2.sqrt().recip() as f32;
        for x in vec.iter_mut() {
            *x *= inv;
        }
    }
}
