//! Deterministic cache-key derivation for embedding entries and the
//! document invalidation index.
//!
//! Keys are pure functions of their inputs: no I/O, no clock, no state.
//! The embedding namespace is content-addressed (`hash(content)`), so the
//! same text maps to the same entry no matter which document it appears
//! in; the document namespace is identity-addressed and exists so bulk
//! invalidation can find a document's entries without re-hashing content.

use sha2::{Digest, Sha256};

use crate::types::{IngestError, Result};

/// Namespace prefix for content-addressed embedding entries.
pub const EMBEDDING_PREFIX: &str = "embed:";
/// Namespace prefix for document-scoped entries.
pub const DOCUMENT_PREFIX: &str = "doc:";

/// Content-addressed key for an embedding cache entry.
///
/// `embed:` + lowercase hex SHA-256 of the text. Identical text always
/// yields the identical key, which is what lets identical chunks across
/// documents share a single cached vector.
pub fn embedding_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{EMBEDDING_PREFIX}{:x}", hasher.finalize())
}

/// Key for versioned document metadata: `doc:{id}:v{version}`.
///
/// Reserved namespace for document-level cache versioning; not consulted
/// by the invalidation path, but part of the key contract.
pub fn document_key(document_id: &str, version: u32) -> Result<String> {
    require_id(document_id)?;
    Ok(format!("{DOCUMENT_PREFIX}{document_id}:v{version}"))
}

/// Key tying a document position to its embedding entry:
/// `doc:{id}:chunk:{index}`.
///
/// The value stored under this key is the [`embedding_key`] of the chunk's
/// content at ingestion time.
pub fn chunk_invalidation_key(document_id: &str, chunk_index: usize) -> Result<String> {
    require_id(document_id)?;
    Ok(format!(
        "{DOCUMENT_PREFIX}{document_id}:chunk:{chunk_index}"
    ))
}

/// Scan prefix matching every invalidation-index entry for a document.
pub fn document_chunk_prefix(document_id: &str) -> Result<String> {
    require_id(document_id)?;
    Ok(format!("{DOCUMENT_PREFIX}{document_id}:chunk:"))
}

fn require_id(document_id: &str) -> Result<()> {
    if document_id.is_empty() {
        return Err(IngestError::InvalidInput(
            "document id must not be empty".to_string(),
        ));
    }
    Ok(())
}
