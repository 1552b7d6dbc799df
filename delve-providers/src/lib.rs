//! Delve Providers - concrete capabilities for the research engine
//!
//! Each type here implements one of the capability traits from `delve-core`:
//!
//! - [`SiumaiLanguageModel`]: text and JSON generation through siumai
//! - [`FirecrawlSearch`]: web search with scraped markdown content
//! - [`TokenCounter`]: tiktoken-based token measurement
//! - [`TextChunker`]: character-sized semantic text segmentation

pub mod firecrawl;
pub mod llm_client;
pub mod splitter;
pub mod token_counter;

pub use firecrawl::FirecrawlSearch;
pub use llm_client::{extract_json_object, SiumaiLanguageModel};
pub use splitter::TextChunker;
pub use token_counter::TokenCounter;
