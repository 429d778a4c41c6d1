//! Embedding collaborator seam.
//!
//! The pipeline treats embedding as an opaque function from text to a
//! fixed-width float vector. Whatever sits behind the trait must be
//! deterministic for a given model version; the content-addressed cache
//! depends on it.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::types::Result;

/// Opaque `text → vector` collaborator.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text` into a vector of [`dimensions`](Self::dimensions) width.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Vector width; must match the storage schema's vector column.
    fn dimensions(&self) -> usize;

    /// Identifier of the model version producing the vectors.
    fn model_id(&self) -> &str;
}

/// Deterministic provider for tests and offline development.
///
/// Vectors are seeded from a content digest, so equal text always embeds
/// identically and different text diverges, the same contract a real
/// model version provides. An embed-call counter lets tests assert cache
/// behavior.
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times [`embed`](EmbeddingProvider::embed) ran (cache
    /// misses, from the cache's point of view).
    pub fn embed_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let digest = Sha256::digest(text.as_bytes());
        let vector = (0..self.dimensions)
            .map(|i| {
                let byte = digest[i % digest.len()] ^ (i as u8);
                f32::from(byte) / 255.0 - 0.5
            })
            .collect();
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "mock-embedding"
    }
}
