//! Paragraph-grouping chunking.
//!
//! Paragraphs are the semantic unit here: blank-line blocks are
//! accumulated greedily into a buffer and flushed whenever the next
//! paragraph would push the buffer past the token budget. A single
//! paragraph larger than the budget is kept whole: an oversized chunk is
//! preferred over a mid-paragraph split.

use serde_json::json;

use crate::tokenizer::Tokenizer;
use crate::types::{IngestError, Result};

use super::{Chunk, ChunkStrategy, ChunkType, Metadata};

/// Groups blank-line paragraphs into chunks of at most `max_chunk_size`
/// tokens (except for single oversized paragraphs).
#[derive(Clone, Debug)]
pub struct SemanticParagraphChunker {
    tokenizer: Tokenizer,
    max_chunk_size: usize,
}

impl SemanticParagraphChunker {
    pub fn new(tokenizer: Tokenizer, max_chunk_size: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(IngestError::Config(
                "max_chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            tokenizer,
            max_chunk_size,
        })
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    fn flush(&self, buffer: &str, chunk_id: u64, metadata: &Metadata) -> Chunk {
        let content = buffer.trim().to_string();
        let token_count = self.tokenizer.count(&content);
        let mut chunk_metadata = metadata.clone();
        chunk_metadata.insert("chunk_id".to_string(), json!(chunk_id));
        chunk_metadata.insert("method".to_string(), json!(self.name()));
        Chunk {
            content,
            chunk_type: ChunkType::Semantic,
            // Paragraph grouping does not track token offsets; an absent
            // span is honest where a zero would be misleading.
            span: None,
            token_count,
            metadata: chunk_metadata,
        }
    }
}

impl ChunkStrategy for SemanticParagraphChunker {
    fn split(&self, text: &str, metadata: &Metadata) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut chunk_id = 0u64;

        for block in text.split("\n\n") {
            let paragraph = block.trim();
            if paragraph.is_empty() {
                continue;
            }

            let candidate = if current.is_empty() {
                paragraph.to_string()
            } else {
                format!("{current}\n\n{paragraph}")
            };

            if self.tokenizer.count(&candidate) > self.max_chunk_size && !current.is_empty() {
                chunks.push(self.flush(&current, chunk_id, metadata));
                chunk_id += 1;
                current = paragraph.to_string();
            } else {
                current = candidate;
            }
        }

        if !current.is_empty() {
            chunks.push(self.flush(&current, chunk_id, metadata));
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "semantic_paragraph"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_chunk_size: usize) -> SemanticParagraphChunker {
        let tokenizer = Tokenizer::for_model("gpt-4").unwrap();
        SemanticParagraphChunker::new(tokenizer, max_chunk_size).unwrap()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunker(128).split("", &Metadata::new()).unwrap().is_empty());
        assert!(chunker(128)
            .split("\n\n\n\n", &Metadata::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn small_paragraphs_collapse_into_one_chunk() {
        let chunks = chunker(1024)
            .split("A.\n\nB.\n\nC.", &Metadata::new())
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "A.\n\nB.\n\nC.");
        assert_eq!(chunks[0].chunk_type, ChunkType::Semantic);
        assert!(chunks[0].span.is_none());
    }

    #[test]
    fn budget_overflow_flushes_between_paragraphs() {
        // Each paragraph is well under the budget but two together exceed
        // it, so every paragraph lands in its own chunk.
        let paragraph = "word ".repeat(30);
        let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let chunks = chunker(40).split(&text, &Metadata::new()).unwrap();
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(!chunk.content.contains("\n\n"));
        }
    }

    #[test]
    fn oversized_paragraph_stays_intact() {
        let huge = "word ".repeat(200);
        let text = format!("intro\n\n{huge}\n\noutro");
        let chunks = chunker(40).split(&text, &Metadata::new()).unwrap();

        // The huge paragraph exceeds the budget on its own and is still a
        // single chunk.
        let oversized: Vec<_> = chunks.iter().filter(|c| c.token_count > 40).collect();
        assert_eq!(oversized.len(), 1);
        assert_eq!(oversized[0].content, huge.trim());
    }

    #[test]
    fn chunk_ids_are_sequential_and_method_is_tagged() {
        let mut metadata = Metadata::new();
        metadata.insert("filename".to_string(), json!("notes.txt"));
        let paragraph = "word ".repeat(30);
        let text = format!("{paragraph}\n\n{paragraph}");
        let chunks = chunker(40).split(&text, &metadata).unwrap();
        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata["chunk_id"], json!(idx as u64));
            assert_eq!(chunk.metadata["method"], json!("semantic_paragraph"));
            assert_eq!(chunk.metadata["filename"], json!("notes.txt"));
        }
    }

    #[test]
    fn token_counts_match_the_tokenizer() {
        let tokenizer = Tokenizer::for_model("gpt-4").unwrap();
        let chunks = chunker(1024)
            .split("first paragraph\n\nsecond paragraph", &Metadata::new())
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].token_count,
            tokenizer.count(&chunks[0].content)
        );
    }
}
