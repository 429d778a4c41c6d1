//! Fixed-size chunking with token-based overlap.

use serde_json::json;

use crate::tokenizer::Tokenizer;
use crate::types::{IngestError, Result};

use super::{Chunk, ChunkStrategy, ChunkType, Metadata, TokenSpan};

/// Splits text into windows of `chunk_size` tokens, each consecutive pair
/// sharing `overlap` tokens. The final window may be shorter.
///
/// Window boundaries are token boundaries, so decoded chunks never cut a
/// word in half; surrounding whitespace is trimmed after decoding.
#[derive(Clone, Debug)]
pub struct FixedSizeChunker {
    tokenizer: Tokenizer,
    chunk_size: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    /// Create a fixed-size chunker.
    ///
    /// `chunk_size == 0` or `overlap >= chunk_size` would produce empty or
    /// non-advancing windows and is rejected here, at configuration time.
    pub fn new(tokenizer: Tokenizer, chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(IngestError::Config(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(IngestError::Config(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            tokenizer,
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl ChunkStrategy for FixedSizeChunker {
    fn split(&self, text: &str, metadata: &Metadata) -> Result<Vec<Chunk>> {
        let tokens = self.tokenizer.encode(text);
        let total = tokens.len();
        let step = self.chunk_size - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut chunk_id = 0u64;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            let window = tokens[start..end].to_vec();
            let token_count = window.len();
            let content = self.tokenizer.decode(window)?.trim().to_string();

            // A window of pure whitespace decodes to nothing; skip it
            // rather than store an empty row.
            if !content.is_empty() {
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunk_id".to_string(), json!(chunk_id));
                chunk_metadata.insert("method".to_string(), json!(self.name()));
                chunks.push(Chunk {
                    content,
                    chunk_type: ChunkType::Fixed,
                    span: Some(TokenSpan { start, end }),
                    token_count,
                    metadata: chunk_metadata,
                });
                chunk_id += 1;
            }

            start += step;
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "fixed_token"
    }
}
