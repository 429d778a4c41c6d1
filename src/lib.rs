//! # Ragmill: ingestion and embedding-cache pipeline
//!
//! Ragmill turns raw document text into retrievable chunks backed by a
//! hybrid (vector + keyword) store, with a content-addressed embedding
//! cache in front of the embedding model and an invalidation protocol
//! that keeps cache and store consistent across re-ingestion and
//! deletion.
//!
//! ```text
//! Extracted text ──► chunking::Chunker ──► ordered Chunks
//!                                  │
//!          cache::EmbeddingCache ◄─┤  (content-addressed, TTL expiry)
//!                    │             │
//!        embeddings::EmbeddingProvider (opaque text → vector)
//!                    │             │
//! Chunks + vectors ──► pipeline::IngestionPipeline ──► stores::VectorStore
//!                                  │
//!                                  └─► invalidation index in cache::CacheStore
//!                                      (doc, chunk index) → embedding key
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ragmill::embeddings::MockEmbeddingProvider;
//! use ragmill::pipeline::{IngestRequest, IngestionPipeline};
//! use ragmill::stores::MemoryVectorStore;
//!
//! # async fn example() -> ragmill::Result<()> {
//! let pipeline = IngestionPipeline::builder()
//!     .store(Arc::new(MemoryVectorStore::new()))
//!     .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
//!     .build()?;
//!
//! let report = pipeline
//!     .ingest(IngestRequest::new("First paragraph.\n\nSecond paragraph.")
//!         .with_document_id("notes-1"))
//!     .await?;
//! assert_eq!(report.status, "success");
//! # Ok(())
//! # }
//! ```
//!
//! Production deployments swap the in-memory doubles for
//! [`stores::PostgresVectorStore`] and [`cache::RedisCacheStore`] and
//! inject a real [`embeddings::EmbeddingProvider`]; the pipeline is
//! constructed explicitly and passed by reference to request handlers,
//! never held in a module-level instance.

pub mod cache;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod keys;
pub mod pipeline;
pub mod stores;
pub mod tokenizer;
pub mod types;

pub use chunking::{Chunk, ChunkType, Chunker, ChunkingStrategy};
pub use config::IngestConfig;
pub use pipeline::{DeleteReport, IngestReport, IngestRequest, IngestionPipeline};
pub use types::{IngestError, Result};
