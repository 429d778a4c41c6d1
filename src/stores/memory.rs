//! In-memory vector store for tests and development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::types::Result;

use super::{ChunkRow, DocumentRecord, VectorStore};

#[derive(Default)]
struct Inner {
    documents: HashMap<String, DocumentRecord>,
    chunks: HashMap<Uuid, ChunkRow>,
}

/// Process-local [`VectorStore`] with the same cascade semantics as the
/// Postgres backend. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryVectorStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the chunks for a document, ordered by chunk index.
    pub fn chunks_for(&self, document_id: &str) -> Vec<ChunkRow> {
        let inner = self.inner.read();
        let mut chunks: Vec<ChunkRow> = inner
            .chunks
            .values()
            .filter(|chunk| chunk.document_id.as_deref() == Some(document_id))
            .cloned()
            .collect();
        chunks.sort_by_key(|chunk| chunk.chunk_index);
        chunks
    }

    /// Total number of chunk rows, across all documents and anonymous
    /// ingestions.
    pub fn total_chunks(&self) -> usize {
        self.inner.read().chunks.len()
    }
}

impl std::fmt::Debug for MemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryVectorStore")
            .field("documents", &inner.documents.len())
            .field("chunks", &inner.chunks.len())
            .finish()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_document(&self, document: &DocumentRecord) -> Result<()> {
        let mut inner = self.inner.write();
        let mut row = document.clone();
        if let Some(existing) = inner.documents.get(&document.id) {
            row.created_at = existing.created_at;
        }
        inner.documents.insert(document.id.clone(), row);
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        Ok(self.inner.read().documents.get(id).cloned())
    }

    async fn delete_document(&self, id: &str) -> Result<u64> {
        let mut inner = self.inner.write();
        let removed = inner.documents.remove(id).is_some();
        if removed {
            // Cascade, as the foreign key would.
            inner
                .chunks
                .retain(|_, chunk| chunk.document_id.as_deref() != Some(id));
        }
        Ok(u64::from(removed))
    }

    async fn insert_chunk(&self, chunk: &ChunkRow) -> Result<()> {
        self.inner.write().chunks.insert(chunk.id, chunk.clone());
        Ok(())
    }

    async fn delete_chunks_by_document(&self, document_id: &str) -> Result<u64> {
        let mut inner = self.inner.write();
        let before = inner.chunks.len();
        inner
            .chunks
            .retain(|_, chunk| chunk.document_id.as_deref() != Some(document_id));
        Ok((before - inner.chunks.len()) as u64)
    }

    async fn count_chunks(&self, document_id: &str) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .chunks
            .values()
            .filter(|chunk| chunk.document_id.as_deref() == Some(document_id))
            .count() as u64)
    }
}
