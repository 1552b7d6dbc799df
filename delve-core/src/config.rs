//! Configuration management
//!
//! `DelveConfig` is read from TOML, then overridden from the environment.

use crate::error::{DelveError, DelveResult, ErrorContext};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DelveConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub research: ResearchConfig,
    pub tokenizer: TokenizerConfig,
    pub logging: LoggingConfig,
}

/// Language model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type (openai, anthropic, ollama, groq, deepseek)
    pub provider: String,
    pub model: String,
    /// Falls back to the provider's environment variable when unset
    pub api_key: Option<String>,
    /// Custom endpoint for OpenAI-compatible services
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

/// Web search provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_ms: u64,
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.firecrawl.dev".to_string(),
            timeout_ms: 15_000,
            result_limit: 5,
        }
    }
}

/// Budgets and limits for the research engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Maximum simultaneously in-flight search/distill steps across a whole run
    pub concurrency_limit: usize,
    pub default_breadth: usize,
    pub default_depth: usize,
    pub max_breadth: usize,
    pub max_depth: usize,
    /// Learnings requested per distillation
    pub learnings_per_query: usize,
    /// Token budget for each scraped document
    pub document_token_budget: usize,
    /// Token budget for the concatenated learnings given to the report writer
    pub report_token_budget: usize,
    /// Clarifying questions asked before a run
    pub feedback_questions: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 2,
            default_breadth: 4,
            default_depth: 2,
            max_breadth: 10,
            max_depth: 5,
            learnings_per_query: 3,
            document_token_budget: 25_000,
            report_token_budget: 150_000,
            feedback_questions: 3,
        }
    }
}

/// Content budgeting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Model whose BPE measures token counts
    pub model: String,
    /// Hard-cut length when the estimated character budget gets too small
    pub min_chunk_chars: usize,
    /// Characters assumed per overflowing token
    pub chars_per_token: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            min_chunk_chars: 140,
            chars_per_token: 3,
        }
    }
}

impl DelveConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DelveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DelveError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        toml::from_str(&content).map_err(|e| DelveError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DelveResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DelveError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content).map_err(|e| DelveError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })
    }

    /// Overlay values from environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY").or_else(|| non_empty("OPENAI_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(endpoint) = non_empty("OPENAI_ENDPOINT") {
            self.llm.base_url = Some(endpoint);
        }
        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = non_empty("FIRECRAWL_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(url) = non_empty("FIRECRAWL_BASE_URL") {
            self.search.base_url = url;
        }
        if let Some(limit) = non_empty("CONCURRENCY_LIMIT").and_then(|v| v.parse().ok()) {
            self.research.concurrency_limit = limit;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> DelveResult<()> {
        let research = &self.research;
        let checks: [(bool, &str, &str); 9] = [
            (
                research.concurrency_limit == 0,
                "research.concurrency_limit",
                "Concurrency limit must be greater than 0",
            ),
            (
                self.search.timeout_ms == 0,
                "search.timeout_ms",
                "Search timeout must be greater than 0",
            ),
            (
                self.search.result_limit == 0,
                "search.result_limit",
                "Search result limit must be greater than 0",
            ),
            (
                research.document_token_budget == 0,
                "research.document_token_budget",
                "Document token budget must be greater than 0",
            ),
            (
                research.report_token_budget == 0,
                "research.report_token_budget",
                "Report token budget must be greater than 0",
            ),
            (
                self.tokenizer.min_chunk_chars == 0,
                "tokenizer.min_chunk_chars",
                "Minimum chunk size must be greater than 0",
            ),
            (
                self.tokenizer.chars_per_token == 0,
                "tokenizer.chars_per_token",
                "Characters per token must be greater than 0",
            ),
            (
                research.default_breadth > research.max_breadth,
                "research.default_breadth",
                "Default breadth must not exceed max_breadth",
            ),
            (
                research.default_depth > research.max_depth,
                "research.default_depth",
                "Default depth must not exceed max_depth",
            ),
        ];

        match checks.iter().find(|(failed, _, _)| *failed) {
            Some((_, field, message)) => Err(DelveError::Config {
                message: message.to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_metadata("field", field)
                    .with_suggestion(&format!("Adjust {} in your config file", field)),
            }),
            None => Ok(()),
        }
    }
}
