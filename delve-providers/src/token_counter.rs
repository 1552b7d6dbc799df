//! Token counting utilities
//!
//! Accurate token measurement with tiktoken-rs, used only for content budgeting.

use delve_core::{config_error, DelveResult, Tokenizer};
use tiktoken_rs::{get_bpe_from_model, CoreBPE};
use tracing::{debug, warn};

const FALLBACK_MODEL: &str = "gpt-4o";

/// Token counter bound to one model's BPE
pub struct TokenCounter {
    encoder: CoreBPE,
    model_name: String,
}

impl TokenCounter {
    /// Create a new token counter for the specified model
    pub fn new(model_name: &str) -> DelveResult<Self> {
        let encoder = get_bpe_from_model(model_name).map_err(|e| {
            config_error!(
                format!("Failed to get encoder for model {}: {}", model_name, e),
                "token_counter"
            )
        })?;

        debug!(model = model_name, "Created token counter");
        Ok(Self {
            encoder,
            model_name: model_name.to_string(),
        })
    }

    /// Create a counter for `model_name`, falling back to the o200k encoding
    /// when tiktoken does not know the model
    pub fn for_model_or_default(model_name: &str) -> DelveResult<Self> {
        Self::new(model_name).or_else(|e| {
            warn!(
                model = model_name,
                error = %e,
                "Unknown tokenizer model, falling back to {}", FALLBACK_MODEL
            );
            Self::new(FALLBACK_MODEL)
        })
    }

    /// Count tokens in a text string
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encoder.encode_with_special_tokens(text).len()
    }

    /// Get model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl Tokenizer for TokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        TokenCounter::count_tokens(self, text)
    }
}
