//! Capability traits for the external collaborators
//!
//! The research engine never talks to a provider directly; it receives these
//! objects through [`Capabilities`] so tests can swap in deterministic fakes.

use crate::error::DelveResult;
use crate::types::*;
use async_trait::async_trait;
use std::sync::Arc;

/// Text generation capability
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-text generation
    async fn generate_text(&self, request: &GenerationRequest) -> DelveResult<String>;

    /// Structured generation without a schema.
    ///
    /// The returned value is only expected to be a JSON object; callers
    /// validate its shape.
    async fn generate_object(&self, request: &GenerationRequest)
        -> DelveResult<serde_json::Value>;
}

/// Web search capability
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// May return fewer than `request.result_limit` documents
    async fn search(&self, request: &SearchRequest) -> DelveResult<Vec<SearchDocument>>;
}

/// Deterministic token measurement
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Splits text into ordered chunks of at most `chunk_size` characters where possible
pub trait TextSegmenter: Send + Sync {
    fn split(&self, text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String>;
}

/// Bundle of every collaborator the research engine needs
#[derive(Clone)]
pub struct Capabilities {
    pub llm: Arc<dyn LanguageModel>,
    pub search: Arc<dyn SearchProvider>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub segmenter: Arc<dyn TextSegmenter>,
}

impl Capabilities {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        tokenizer: Arc<dyn Tokenizer>,
        segmenter: Arc<dyn TextSegmenter>,
    ) -> Self {
        Self {
            llm,
            search,
            tokenizer,
            segmenter,
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
