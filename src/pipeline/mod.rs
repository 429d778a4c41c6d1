//! Ingestion pipeline: chunk → embed → store → index-for-invalidation,
//! plus the reverse invalidate/delete path.
//!
//! The pipeline exclusively owns the lifecycle coupling between a
//! document, its chunk rows, and the two cache layers (embedding entries
//! and the invalidation index). Per call the sequence
//! invalidate-prior → chunk → upsert → store is strictly ordered; the
//! per-chunk storage fan-out inside one call is concurrent and bounded.
//!
//! Concurrent ingestion calls for the *same* document id are not
//! serialized here: callers must serialize re-ingestion per id (e.g. a
//! per-id lease in front of the pipeline), otherwise invalidation can
//! race a concurrent write.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStore, EmbeddingCache};
use crate::chunking::{Chunker, ChunkingStrategy, Metadata};
use crate::config::IngestConfig;
use crate::embeddings::EmbeddingProvider;
use crate::keys;
use crate::stores::{ChunkRow, DocumentRecord, DocumentStatus, VectorStore};
use crate::types::{IngestError, Result};

/// Keys deleted per cache round-trip during bulk invalidation.
const INVALIDATION_BATCH: usize = 128;

/// One ingestion call: extracted text plus routing information.
#[derive(Clone, Debug)]
pub struct IngestRequest {
    /// Already-extracted document text.
    pub text: String,
    /// Document metadata inherited by every chunk and by the document
    /// row (`filename`, `file_type`, `page_count` are recognized).
    pub metadata: Metadata,
    /// Strategy override; the configured default applies when absent.
    pub strategy: Option<ChunkingStrategy>,
    /// Logical document identity. `None` ingests anonymously: no
    /// document row, no invalidation index, chunks with a null owner.
    pub document_id: Option<String>,
}

impl IngestRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
            strategy: None,
            document_id: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ChunkingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }
}

/// Success summary of one ingestion call.
#[derive(Clone, Debug, Serialize)]
pub struct IngestReport {
    pub status: String,
    pub chunks_created: usize,
    pub total_tokens: usize,
    pub chunking_strategy: ChunkingStrategy,
    pub document_id: Option<String>,
    pub cache_entries_invalidated: u64,
}

/// Counts reported by [`IngestionPipeline::delete_document`].
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DeleteReport {
    pub document_deleted: u64,
    pub chunks_deleted: u64,
    pub cache_entries_invalidated: u64,
}

/// Orchestrates chunking, embedding resolution, storage, and cache
/// invalidation. Construct via [`IngestionPipeline::builder`].
pub struct IngestionPipeline {
    store: Arc<dyn VectorStore>,
    cache_store: Option<Arc<dyn CacheStore>>,
    embedding_cache: EmbeddingCache,
    chunker: Chunker,
    cache_ttl: Duration,
    max_concurrency: usize,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("chunker", &self.chunker)
            .field("cached", &self.cache_store.is_some())
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl IngestionPipeline {
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Ingest one document: invalidate prior state for its id, chunk the
    /// text, upsert the document row, then embed and store every chunk.
    ///
    /// All per-chunk work settles before this returns. A single chunk
    /// failure fails the call; rows committed before the failure stay in
    /// the store and are torn down by the next ingest under the same id,
    /// so retrying is always safe.
    #[instrument(
        skip(self, request),
        fields(document_id = ?request.document_id),
        err
    )]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport> {
        let IngestRequest {
            text,
            metadata,
            strategy,
            document_id,
        } = request;

        if let Some(id) = document_id.as_deref() {
            if id.is_empty() {
                return Err(IngestError::InvalidInput(
                    "document id must not be empty".to_string(),
                ));
            }
        }
        let strategy = strategy.unwrap_or_else(|| self.chunker.default_strategy());

        // Step 1: tear down prior state so re-ingestion never leaves
        // orphaned or duplicated chunks.
        let mut cache_entries_invalidated = 0u64;
        if let Some(id) = document_id.as_deref() {
            let prior = self.store.get_document(id).await?;
            if prior.is_some_and(|d| d.status == DocumentStatus::Active) {
                cache_entries_invalidated = self.invalidate_document_cache(id).await?;
                let removed = self.store.delete_chunks_by_document(id).await?;
                debug!(document_id = id, chunks = removed, "cleared prior chunk rows");
            }
        }

        // Step 2: chunk. An empty document is a valid no-op ingest.
        let chunks = self.chunker.chunk(&text, &metadata, strategy)?;
        if chunks.is_empty() {
            return Ok(IngestReport {
                status: "success".to_string(),
                chunks_created: 0,
                total_tokens: 0,
                chunking_strategy: strategy,
                document_id,
                cache_entries_invalidated,
            });
        }

        // Step 3: upsert the document row.
        if let Some(id) = document_id.as_deref() {
            let document = document_record(id, &metadata, chunks.len());
            self.store.upsert_document(&document).await?;
        }

        // Step 4: bounded fan-out. Chunk identity (index, span) was fixed
        // at chunking time, so storage completion order does not matter.
        // Every task settles before the first error propagates.
        let total_tokens: usize = chunks.iter().map(|c| c.token_count).sum();
        let chunks_created = chunks.len();
        let results: Vec<Result<()>> = stream::iter(chunks.into_iter().enumerate())
            .map(|(chunk_index, chunk)| {
                let document_id = document_id.clone();
                async move { self.process_chunk(document_id, chunk_index, chunk).await }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        results.into_iter().collect::<Result<Vec<()>>>()?;

        info!(
            chunks = chunks_created,
            total_tokens,
            strategy = %strategy,
            "document ingested"
        );
        Ok(IngestReport {
            status: "success".to_string(),
            chunks_created,
            total_tokens,
            chunking_strategy: strategy,
            document_id,
            cache_entries_invalidated,
        })
    }

    /// Remove a document: its chunk rows, its document row, and every
    /// cache entry reachable through the invalidation index.
    ///
    /// Idempotent: deleting an id that does not exist reports zeros.
    #[instrument(skip(self), err)]
    pub async fn delete_document(&self, document_id: &str) -> Result<DeleteReport> {
        if document_id.is_empty() {
            return Err(IngestError::InvalidInput(
                "document id must not be empty".to_string(),
            ));
        }

        let chunks_deleted = self.store.delete_chunks_by_document(document_id).await?;
        let document_deleted = self.store.delete_document(document_id).await?;
        let cache_entries_invalidated = self.invalidate_document_cache(document_id).await?;

        info!(
            document_deleted,
            chunks_deleted, cache_entries_invalidated, "document deleted"
        );
        Ok(DeleteReport {
            document_deleted,
            chunks_deleted,
            cache_entries_invalidated,
        })
    }

    async fn process_chunk(
        &self,
        document_id: Option<String>,
        chunk_index: usize,
        chunk: crate::chunking::Chunk,
    ) -> Result<()> {
        let embedding = self.embedding_cache.resolve(&chunk.content).await?;
        let embedding_key = keys::embedding_key(&chunk.content);
        let row = ChunkRow::from_chunk(document_id.clone(), chunk_index, chunk, embedding);
        self.store.insert_chunk(&row).await?;

        // Record (document, index) → embedding key so later invalidation
        // finds the cache entries without re-hashing content. Sharing the
        // embedding TTL keeps both layers aging out together.
        if let (Some(id), Some(cache)) = (document_id.as_deref(), &self.cache_store) {
            let index_key = keys::chunk_invalidation_key(id, chunk_index)?;
            if let Err(e) = cache.set_ex(&index_key, &embedding_key, self.cache_ttl).await {
                warn!(
                    key = %index_key,
                    error = %e,
                    "failed to write invalidation index entry"
                );
            }
        }
        Ok(())
    }

    /// Delete every embedding entry reachable through the document's
    /// invalidation index, then the index entries themselves, in batches
    /// over a cursor scan. Returns how many embedding entries existed.
    ///
    /// Cache unavailability degrades to a warning: entries left behind
    /// expire via TTL, and the store (not the cache) is the source of
    /// truth.
    async fn invalidate_document_cache(&self, document_id: &str) -> Result<u64> {
        let Some(cache) = &self.cache_store else {
            return Ok(0);
        };
        let prefix = keys::document_chunk_prefix(document_id)?;
        let index_keys = match cache.scan_prefix(&prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache unreachable during invalidation scan");
                return Ok(0);
            }
        };
        if index_keys.is_empty() {
            return Ok(0);
        }

        let mut embedding_keys = Vec::with_capacity(index_keys.len());
        for key in &index_keys {
            match cache.get(key).await {
                Ok(Some(embedding_key)) => embedding_keys.push(embedding_key),
                Ok(None) => {}
                Err(e) => warn!(%key, error = %e, "failed to read invalidation index entry"),
            }
        }

        let mut invalidated = 0u64;
        for batch in embedding_keys.chunks(INVALIDATION_BATCH) {
            match cache.delete(batch).await {
                Ok(removed) => invalidated += removed,
                Err(e) => warn!(error = %e, "failed to delete embedding cache batch"),
            }
        }
        for batch in index_keys.chunks(INVALIDATION_BATCH) {
            if let Err(e) = cache.delete(batch).await {
                warn!(error = %e, "failed to delete invalidation index batch");
            }
        }

        debug!(
            document_id,
            entries = invalidated,
            "invalidated embedding cache entries"
        );
        Ok(invalidated)
    }
}

fn document_record(id: &str, metadata: &Metadata, chunk_count: usize) -> DocumentRecord {
    let filename = metadata
        .get("filename")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let file_type = metadata
        .get("file_type")
        .and_then(|v| v.as_str())
        .unwrap_or("text")
        .to_string();
    let page_count = metadata
        .get("page_count")
        .and_then(|v| v.as_i64())
        .map_or(1, |n| n as i32);
    let now = Utc::now();
    DocumentRecord {
        id: id.to_string(),
        filename,
        file_type,
        page_count,
        chunk_count: chunk_count as i32,
        metadata: serde_json::Value::Object(metadata.clone()),
        status: DocumentStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

/// Builder wiring injected storage and cache handles into a pipeline.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    store: Option<Arc<dyn VectorStore>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    chunking: Option<crate::config::ChunkingOptions>,
    cache_ttl: Option<Duration>,
    max_concurrency: Option<usize>,
}

impl IngestionPipelineBuilder {
    /// Storage backend for document and chunk rows. Required.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Cache store for embedding entries and the invalidation index.
    /// Optional: without one, every embedding is computed per call and
    /// invalidation is a no-op.
    #[must_use]
    pub fn cache_store(mut self, cache_store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(cache_store);
        self
    }

    /// Embedding collaborator. Required.
    #[must_use]
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Chunking parameters (defaults apply when unset).
    #[must_use]
    pub fn chunking_options(mut self, options: crate::config::ChunkingOptions) -> Self {
        self.chunking = Some(options);
        self
    }

    /// Expiry for embedding and invalidation-index entries.
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Upper bound on concurrently processed chunks per call.
    #[must_use]
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Apply chunking, TTL, and concurrency settings from a loaded
    /// [`IngestConfig`].
    #[must_use]
    pub fn from_config(self, config: &IngestConfig) -> Self {
        self.chunking_options(config.chunking.clone())
            .cache_ttl(config.cache.ttl())
            .max_concurrency(config.pipeline.max_concurrency)
    }

    /// Validate the configuration and assemble the pipeline. Parameter
    /// problems surface here, once, at startup.
    pub fn build(self) -> Result<IngestionPipeline> {
        let store = self
            .store
            .ok_or_else(|| IngestError::Config("a vector store is required".to_string()))?;
        let provider = self.provider.ok_or_else(|| {
            IngestError::Config("an embedding provider is required".to_string())
        })?;
        let max_concurrency = self.max_concurrency.unwrap_or(4);
        if max_concurrency == 0 {
            return Err(IngestError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        let chunking = self.chunking.unwrap_or_default();
        let chunker = Chunker::new(&chunking)?;
        let cache_ttl = self.cache_ttl.unwrap_or(Duration::from_secs(86_400));
        let embedding_cache =
            EmbeddingCache::new(provider, self.cache_store.clone(), cache_ttl);

        Ok(IngestionPipeline {
            store,
            cache_store: self.cache_store,
            embedding_cache,
            chunker,
            cache_ttl,
            max_concurrency,
        })
    }
}
