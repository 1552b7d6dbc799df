//! Content budgeting
//!
//! Trims text until the tokenizer says it fits a token budget, using the
//! segmenter to cut on natural boundaries where it can.

use delve_core::{TextSegmenter, Tokenizer, TokenizerConfig};
use std::sync::Arc;
use tracing::trace;

/// Fits text to a token budget
#[derive(Clone)]
pub struct ContextBudgeter {
    tokenizer: Arc<dyn Tokenizer>,
    segmenter: Arc<dyn TextSegmenter>,
    min_chunk_chars: usize,
    chars_per_token: usize,
}

impl ContextBudgeter {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        segmenter: Arc<dyn TextSegmenter>,
        config: &TokenizerConfig,
    ) -> Self {
        Self {
            tokenizer,
            segmenter,
            min_chunk_chars: config.min_chunk_chars.max(1),
            chars_per_token: config.chars_per_token.max(1),
        }
    }

    /// Trim `text` to at most `token_budget` tokens.
    ///
    /// Text that already fits is returned unchanged. Otherwise each pass
    /// estimates a character budget from the token overflow and keeps the
    /// first segment of that size; when the estimate drops below the
    /// configured floor, the first `min_chunk_chars` characters are returned
    /// even if they still exceed the budget. Every pass strictly shortens
    /// the text, so the loop always terminates.
    pub fn trim(&self, text: &str, token_budget: usize) -> String {
        let mut current = text.to_string();

        loop {
            if current.is_empty() {
                return current;
            }

            let tokens = self.tokenizer.count_tokens(&current);
            if tokens <= token_budget {
                return current;
            }

            let length = char_len(&current);
            let overflow = tokens - token_budget;
            let char_budget = length.saturating_sub(overflow.saturating_mul(self.chars_per_token));

            if char_budget < self.min_chunk_chars {
                trace!(length, floor = self.min_chunk_chars, "Trim hit the minimum fragment");
                return take_chars(&current, self.min_chunk_chars);
            }

            let first_chunk = self
                .segmenter
                .split(&current, char_budget, 0)
                .into_iter()
                .next()
                .unwrap_or_default();

            // a chunk that is not shorter would loop forever; cut by hand instead
            current = if first_chunk.is_empty() || char_len(&first_chunk) >= length {
                take_chars(&current, char_budget)
            } else {
                first_chunk
            };

            trace!(
                tokens,
                token_budget,
                remaining_chars = char_len(&current),
                "Trim pass"
            );
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn take_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One token per whitespace-separated word
    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    /// Cuts into fixed-size character windows
    struct WindowSegmenter;

    impl TextSegmenter for WindowSegmenter {
        fn split(&self, text: &str, chunk_size: usize, _chunk_overlap: usize) -> Vec<String> {
            let chars: Vec<char> = text.chars().collect();
            chars
                .chunks(chunk_size.max(1))
                .map(|c| c.iter().collect())
                .collect()
        }
    }

    /// Never makes progress
    struct StuckSegmenter {
        calls: AtomicUsize,
    }

    impl TextSegmenter for StuckSegmenter {
        fn split(&self, text: &str, _chunk_size: usize, _chunk_overlap: usize) -> Vec<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            vec![text.to_string()]
        }
    }

    fn budgeter(segmenter: Arc<dyn TextSegmenter>) -> ContextBudgeter {
        ContextBudgeter::new(Arc::new(WordTokenizer), segmenter, &TokenizerConfig::default())
    }

    #[test]
    fn test_fitting_text_is_returned_unchanged() {
        let budgeter = budgeter(Arc::new(WindowSegmenter));
        let text = "  leading space, trailing newline\n";
        assert_eq!(budgeter.trim(text, 100), text);
    }

    #[test]
    fn test_empty_text() {
        let budgeter = budgeter(Arc::new(WindowSegmenter));
        assert_eq!(budgeter.trim("", 0), "");
    }

    #[test]
    fn test_oversized_text_converges_under_budget() {
        let budgeter = budgeter(Arc::new(WindowSegmenter));
        let text = "alpha beta gamma delta ".repeat(200);

        let trimmed = budgeter.trim(&text, 300);

        assert!(WordTokenizer.count_tokens(&trimmed) <= 300);
        assert!(text.starts_with(&trimmed));
    }

    #[test]
    fn test_small_character_budget_returns_floor_fragment() {
        let budgeter = budgeter(Arc::new(WindowSegmenter));
        // 400 one-letter words: overflow * 3 wipes out the whole length
        let text = "a ".repeat(400);

        let trimmed = budgeter.trim(&text, 10);

        assert_eq!(trimmed.chars().count(), 140);
        assert!(text.starts_with(&trimmed));
    }

    #[test]
    fn test_stuck_segmenter_falls_back_to_hard_cut() {
        let stuck = Arc::new(StuckSegmenter {
            calls: AtomicUsize::new(0),
        });
        let budgeter = budgeter(stuck.clone());
        let text = "word ".repeat(1000);

        let trimmed = budgeter.trim(&text, 500);

        assert!(WordTokenizer.count_tokens(&trimmed) <= 500);
        assert!(text.starts_with(&trimmed));
        assert!(stuck.calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_multibyte_text_is_cut_on_char_boundaries() {
        let budgeter = budgeter(Arc::new(StuckSegmenter {
            calls: AtomicUsize::new(0),
        }));
        let text = "数据 ".repeat(300);

        let trimmed = budgeter.trim(&text, 50);

        assert!(WordTokenizer.count_tokens(&trimmed) <= 50 || trimmed.chars().count() == 140);
        assert!(text.starts_with(&trimmed));
    }
}
