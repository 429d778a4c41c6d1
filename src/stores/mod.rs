//! Storage backends for document and chunk rows.
//!
//! The [`VectorStore`] trait is the pipeline's exclusive write boundary:
//! no other component writes document rows, chunk rows, or drives the
//! cascade between them. Backends must provide a keyed document table, a
//! chunk table with a vector-similarity index, a keyword index derived
//! from chunk content, and cascade delete from a document to its chunks.
//!
//! Implementations:
//!
//! - [`memory::MemoryVectorStore`]: process-local store for tests.
//! - [`postgres::PostgresVectorStore`]: Postgres with pgvector +
//!   tsvector (feature `postgres`).

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunking::{Chunk, ChunkType, TokenSpan};
use crate::types::{IngestError, Result};

pub use memory::MemoryVectorStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresVectorStore;

/// Lifecycle state of a document row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Active,
    Deleted,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Active => "active",
            DocumentStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(DocumentStatus::Active),
            "deleted" => Ok(DocumentStatus::Deleted),
            other => Err(IngestError::Storage(format!(
                "unknown document status '{other}'"
            ))),
        }
    }
}

/// A logical document identified by a caller-supplied id.
///
/// At most one active row exists per id; re-ingestion upserts in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    pub file_type: String,
    pub page_count: i32,
    pub chunk_count: i32,
    pub metadata: serde_json::Value,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored chunk: content, vector, and the identity fixed at chunking
/// time (index and token span), which survives out-of-order storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRow {
    pub id: Uuid,
    /// Owning document, or `None` for anonymous ingestion.
    pub document_id: Option<String>,
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
    pub chunk_type: ChunkType,
    pub token_count: usize,
    pub span: Option<TokenSpan>,
}

impl ChunkRow {
    /// Turn a chunk and its resolved embedding into a storable row.
    pub fn from_chunk(
        document_id: Option<String>,
        chunk_index: usize,
        chunk: Chunk,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            chunk_index,
            content: chunk.content,
            embedding,
            metadata: serde_json::Value::Object(chunk.metadata),
            chunk_type: chunk.chunk_type,
            token_count: chunk.token_count,
            span: chunk.span,
        }
    }
}

/// Persistence capability for documents and their chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or update a document row, keeping at most one row per id.
    /// `created_at` of an existing row is preserved; `updated_at` is
    /// refreshed.
    async fn upsert_document(&self, document: &DocumentRecord) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>>;

    /// Delete the document row (chunks cascade). Returns the number of
    /// document rows removed (0 or 1).
    async fn delete_document(&self, id: &str) -> Result<u64>;

    /// Persist one chunk row with its vector and a derived keyword-search
    /// representation of the content.
    async fn insert_chunk(&self, chunk: &ChunkRow) -> Result<()>;

    /// Delete every chunk row belonging to `document_id`, returning the
    /// count removed.
    async fn delete_chunks_by_document(&self, document_id: &str) -> Result<u64>;

    /// Number of chunk rows belonging to `document_id`.
    async fn count_chunks(&self, document_id: &str) -> Result<u64>;
}
