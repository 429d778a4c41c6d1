//! Shared result and error types for the ingestion pipeline.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors surfaced by the ingestion pipeline and its collaborators.
///
/// Configuration problems are rejected when components are constructed,
/// never per request. Cache-store unavailability is deliberately *not*
/// represented here: the embedding cache degrades to uncached computation
/// and logs instead of failing the call.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Invalid configuration (bad chunk sizes, unknown tokenizer model,
    /// malformed connection settings). Fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Chunking failed in a way that is not recoverable for this call.
    #[error("chunking failed: {0}")]
    Chunking(String),

    /// The embedding collaborator returned an error.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The storage backend rejected or lost an operation. The call fails;
    /// re-ingesting under the same document id tears down partial state.
    #[error("storage error: {0}")]
    Storage(String),

    /// The request was rejected before chunking began.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
