//! Text segmentation backed by the `text-splitter` crate
//!
//! Chunks are measured in characters and cut on the coarsest semantic
//! boundary that fits: line breaks, then sentences, words and graphemes.

use delve_core::TextSegmenter;
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::warn;

/// Character-sized semantic chunker
#[derive(Debug, Clone, Copy, Default)]
pub struct TextChunker;

impl TextChunker {
    pub fn new() -> Self {
        Self
    }
}

impl TextSegmenter for TextChunker {
    fn split(&self, text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let chunk_size = chunk_size.max(1);
        let overlap = chunk_overlap.min(chunk_size - 1);
        let config = match ChunkConfig::new(chunk_size).with_overlap(overlap) {
            Ok(config) => config,
            Err(e) => {
                warn!(chunk_size, overlap, error = %e, "Rejected chunk overlap, splitting without it");
                ChunkConfig::new(chunk_size)
            }
        };

        TextSplitter::new(config)
            .chunks(text)
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = TextChunker::new().split("A short sentence.", 100, 0);
        assert_eq!(chunks, vec!["A short sentence.".to_string()]);
    }

    #[test]
    fn test_paragraphs_split_before_sentences() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = TextChunker::new().split(&text, 40, 0);
        assert_eq!(chunks, vec!["a".repeat(30), "b".repeat(30)]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let chunks = TextChunker::new().split(&text, 50, 0);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "chunk too long: {:?}", chunk);
        }
    }

    #[test]
    fn test_multibyte_text_is_measured_in_characters() {
        let text = "数据".repeat(30);
        let chunks = TextChunker::new().split(&text, 20, 0);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert!(text.starts_with(chunks[0].as_str()));
    }

    #[test]
    fn test_oversized_overlap_is_clamped() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = TextChunker::new().split(text, 10, 50);

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_empty_text() {
        assert!(TextChunker::new().split("", 10, 0).is_empty());
    }
}
