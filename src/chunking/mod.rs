//! Chunking strategies for turning document text into retrievable units.
//!
//! Two interchangeable strategies sit behind the [`ChunkStrategy`] seam:
//!
//! * [`FixedSizeChunker`]: token windows of a configured size with a
//!   configured overlap between consecutive windows.
//! * [`SemanticParagraphChunker`]: blank-line paragraphs accumulated
//!   greedily up to a token budget, never splitting a paragraph.
//!
//! Both report token counts from the same [`Tokenizer`] instance that
//! sized the windows, so downstream token budgets stay consistent.

pub mod fixed;
pub mod semantic;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ChunkingOptions;
use crate::tokenizer::Tokenizer;
use crate::types::{IngestError, Result};

pub use fixed::FixedSizeChunker;
pub use semantic::SemanticParagraphChunker;

/// Document metadata carried through chunking and onto stored rows: a
/// string-keyed mapping of JSON scalars or nested values, serialized at
/// the storage boundary.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Which strategy produced a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Fixed,
    Semantic,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Fixed => "fixed",
            ChunkType::Semantic => "semantic",
        }
    }
}

/// Token-offset span of a chunk within its source text.
///
/// Only the fixed strategy knows real offsets; semantic chunks carry no
/// span rather than a placeholder zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

/// An immutable unit of retrievable text.
///
/// Created by a chunking strategy, consumed exactly once by the pipeline
/// to produce a stored row, never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    /// Word-boundary-preserving text segment.
    pub content: String,
    /// Strategy variant that produced this chunk.
    pub chunk_type: ChunkType,
    /// Token offsets within the source, when the strategy tracks them.
    pub span: Option<TokenSpan>,
    /// Token length under the configured tokenizer.
    pub token_count: usize,
    /// Caller metadata plus strategy fields (`chunk_id`, `method`).
    pub metadata: Metadata,
}

/// Caller-selectable chunking strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    Fixed,
    Semantic,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Fixed => "fixed",
            ChunkingStrategy::Semantic => "semantic",
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(ChunkingStrategy::Fixed),
            "semantic" => Ok(ChunkingStrategy::Semantic),
            other => Err(IngestError::InvalidInput(format!(
                "unsupported chunking strategy '{other}' (expected 'fixed' or 'semantic')"
            ))),
        }
    }
}

/// Capability shared by all chunking strategies.
pub trait ChunkStrategy: Send + Sync {
    /// Split `text` into an ordered sequence of chunks. Empty input
    /// yields an empty sequence, not an error.
    fn split(&self, text: &str, metadata: &Metadata) -> Result<Vec<Chunk>>;

    /// Strategy label recorded in chunk metadata.
    fn name(&self) -> &'static str;
}

/// Facade owning one tokenizer and both configured strategies.
#[derive(Clone, Debug)]
pub struct Chunker {
    fixed: FixedSizeChunker,
    semantic: SemanticParagraphChunker,
    default_strategy: ChunkingStrategy,
}

impl Chunker {
    /// Build both strategies from validated options. Parameter problems
    /// (zero chunk size, overlap >= size) surface here, at startup.
    pub fn new(options: &ChunkingOptions) -> Result<Self> {
        options.validate()?;
        let tokenizer = Tokenizer::for_model(&options.tokenizer_model)?;
        let fixed = FixedSizeChunker::new(
            tokenizer.clone(),
            options.fixed_chunk_size,
            options.fixed_chunk_overlap,
        )?;
        let semantic = SemanticParagraphChunker::new(tokenizer, options.max_chunk_size)?;
        let default_strategy = if options.use_semantic_chunking {
            ChunkingStrategy::Semantic
        } else {
            ChunkingStrategy::Fixed
        };
        Ok(Self {
            fixed,
            semantic,
            default_strategy,
        })
    }

    /// Strategy used when a request does not name one.
    pub fn default_strategy(&self) -> ChunkingStrategy {
        self.default_strategy
    }

    /// Run the selected strategy over `text`.
    pub fn chunk(
        &self,
        text: &str,
        metadata: &Metadata,
        strategy: ChunkingStrategy,
    ) -> Result<Vec<Chunk>> {
        match strategy {
            ChunkingStrategy::Fixed => self.fixed.split(text, metadata),
            ChunkingStrategy::Semantic => self.semantic.split(text, metadata),
        }
    }
}
