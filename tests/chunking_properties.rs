//! Property tests for the chunking strategies.

use std::sync::LazyLock;

use proptest::prelude::*;

use ragmill::chunking::{ChunkStrategy, FixedSizeChunker, Metadata, SemanticParagraphChunker};
use ragmill::tokenizer::Tokenizer;

static TOKENIZER: LazyLock<Tokenizer> =
    LazyLock::new(|| Tokenizer::for_model("gpt-4").expect("tokenizer loads"));

/// Distinct single-token-per-word paragraphs so substring checks cannot
/// collide.
fn paragraph(index: usize, words: usize) -> String {
    let mut text = format!("p{index}");
    for w in 0..words {
        text.push_str(&format!(" w{w}"));
    }
    text
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fixed_chunk_token_counts_stay_within_budget(
        chunk_size in 2usize..64,
        overlap_fraction in 0usize..100,
        words in 0usize..240,
    ) {
        let overlap = overlap_fraction * (chunk_size - 1) / 100;
        let chunker =
            FixedSizeChunker::new(TOKENIZER.clone(), chunk_size, overlap).unwrap();
        let text = paragraph(0, words);
        let chunks = chunker.split(&text, &Metadata::new()).unwrap();

        for chunk in &chunks {
            prop_assert!(chunk.token_count >= 1);
            prop_assert!(chunk.token_count <= chunk_size);
            let span = chunk.span.unwrap();
            prop_assert_eq!(span.end - span.start, chunk.token_count);
        }
    }

    #[test]
    fn fixed_windows_advance_by_exactly_size_minus_overlap(
        chunk_size in 2usize..64,
        overlap_fraction in 0usize..100,
        words in 1usize..240,
    ) {
        let overlap = overlap_fraction * (chunk_size - 1) / 100;
        let chunker =
            FixedSizeChunker::new(TOKENIZER.clone(), chunk_size, overlap).unwrap();
        let text = paragraph(0, words);
        let chunks = chunker.split(&text, &Metadata::new()).unwrap();
        prop_assert!(!chunks.is_empty());

        let step = chunk_size - overlap;
        for pair in chunks.windows(2) {
            let prev = pair[0].span.unwrap();
            let next = pair[1].span.unwrap();
            prop_assert_eq!(next.start, prev.start + step);
            // Adjacent full windows share exactly `overlap` tokens.
            if prev.end - prev.start == chunk_size {
                prop_assert_eq!(prev.end - next.start, overlap);
            }
        }

        // Windows cover every token: the last chunk reaches the end.
        let total = TOKENIZER.count(&text);
        prop_assert_eq!(chunks.last().unwrap().span.unwrap().end, total);
    }

    #[test]
    fn semantic_chunking_never_splits_a_paragraph(
        paragraph_words in proptest::collection::vec(1usize..40, 1..12),
        max_chunk_size in 4usize..96,
    ) {
        let paragraphs: Vec<String> = paragraph_words
            .iter()
            .enumerate()
            .map(|(i, &words)| paragraph(i, words))
            .collect();
        let text = paragraphs.join("\n\n");

        let chunker =
            SemanticParagraphChunker::new(TOKENIZER.clone(), max_chunk_size).unwrap();
        let chunks = chunker.split(&text, &Metadata::new()).unwrap();

        // Reassembling the chunks' paragraphs yields the input sequence:
        // nothing was split, dropped, reordered, or duplicated.
        let reassembled: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| chunk.content.split("\n\n"))
            .collect();
        let expected: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
        prop_assert_eq!(reassembled, expected);
    }

    #[test]
    fn semantic_chunks_exceed_budget_only_for_lone_paragraphs(
        paragraph_words in proptest::collection::vec(1usize..40, 1..12),
        max_chunk_size in 4usize..96,
    ) {
        let paragraphs: Vec<String> = paragraph_words
            .iter()
            .enumerate()
            .map(|(i, &words)| paragraph(i, words))
            .collect();
        let text = paragraphs.join("\n\n");

        let chunker =
            SemanticParagraphChunker::new(TOKENIZER.clone(), max_chunk_size).unwrap();
        let chunks = chunker.split(&text, &Metadata::new()).unwrap();

        for chunk in &chunks {
            if chunk.token_count > max_chunk_size {
                // Oversized chunks only happen for a paragraph that is
                // too large on its own and was kept intact.
                prop_assert!(!chunk.content.contains("\n\n"));
            }
        }
    }
}
