//! Language model capability backed by siumai
//!
//! One client serves both generation modes. Structured mode asks for plain
//! text and recovers the JSON object from the reply, since the prompts ask
//! the model for bare JSON rather than using a provider-side schema.

use async_trait::async_trait;
use delve_core::{
    config_error, llm_error, DelveError, DelveResult, ErrorContext, GenerationRequest,
    LanguageModel, LlmConfig,
};
use serde_json::Value;
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Language model client for any provider siumai supports
pub struct SiumaiLanguageModel {
    client: Box<dyn LlmClient>,
    config: LlmConfig,
}

impl SiumaiLanguageModel {
    /// Create a new client from configuration
    pub async fn new(config: LlmConfig) -> DelveResult<Self> {
        let client = Self::build_client(&config).await?;

        info!(
            provider = %config.provider,
            model = %config.model,
            "Created language model client"
        );

        Ok(Self { client, config })
    }

    fn api_key(config: &LlmConfig, env_var: &str) -> DelveResult<String> {
        config
            .api_key
            .clone()
            .or_else(|| std::env::var(env_var).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                config_error!(
                    format!("{} API key not found (set {})", config.provider, env_var),
                    "llm_client"
                )
            })
    }

    /// Build the appropriate siumai client based on configuration
    async fn build_client(config: &LlmConfig) -> DelveResult<Box<dyn LlmClient>> {
        let build_failed = |e: LlmError| {
            llm_error!(
                format!("Failed to build client: {}", e),
                config.provider,
                config.model,
                "llm_client"
            )
        };

        match config.provider.as_str() {
            // OpenAI and any OpenAI-compatible endpoint (DeepSeek, Volcengine Ark)
            "openai" | "deepseek" | "ark" => {
                let env_var = if config.provider == "openai" {
                    "OPENAI_API_KEY"
                } else {
                    "DEEPSEEK_API_KEY"
                };
                let api_key = Self::api_key(config, env_var)?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                match &config.base_url {
                    Some(base_url) => builder = builder.base_url(base_url),
                    None if config.provider != "openai" => {
                        return Err(config_error!(
                            format!("Provider {} requires llm.base_url", config.provider),
                            "llm_client"
                        ));
                    }
                    None => {}
                }

                let client = builder.build().await.map_err(build_failed)?;
                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key = Self::api_key(config, "ANTHROPIC_API_KEY")?;

                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(build_failed)?;
                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(build_failed)?;
                Ok(Box::new(client))
            }
            "groq" => {
                let api_key = Self::api_key(config, "GROQ_API_KEY")?;

                let mut builder = LlmBuilder::new()
                    .groq()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(build_failed)?;
                Ok(Box::new(client))
            }
            provider => Err(config_error!(
                format!("Unsupported LLM provider: {}", provider),
                "llm_client"
            )),
        }
    }

    async fn complete(&self, request: &GenerationRequest) -> DelveResult<String> {
        let start_time = Instant::now();
        let messages = vec![
            system!(request.system_prompt.as_str()),
            user!(request.user_prompt.as_str()),
        ];

        debug!(
            prompt_chars = request.user_prompt.len(),
            "Sending generation request"
        );

        let response = self.client.chat(messages).await.map_err(|e| {
            llm_error!(
                format!("LLM generation failed: {}", e),
                self.config.provider,
                self.config.model,
                "llm_client"
            )
        })?;

        let content = response.content_text().ok_or_else(|| {
            llm_error!(
                "No text content in LLM response",
                self.config.provider,
                self.config.model,
                "llm_client"
            )
        })?;

        debug!(
            elapsed_ms = start_time.elapsed().as_millis(),
            response_chars = content.len(),
            "Generation completed"
        );
        Ok(content.to_string())
    }
}

#[async_trait]
impl LanguageModel for SiumaiLanguageModel {
    async fn generate_text(&self, request: &GenerationRequest) -> DelveResult<String> {
        self.complete(request).await
    }

    async fn generate_object(&self, request: &GenerationRequest) -> DelveResult<Value> {
        let text = self.complete(request).await?;
        extract_json_object(&text).ok_or_else(|| DelveError::MalformedOutput {
            message: "Response did not contain a JSON object".to_string(),
            context: ErrorContext::new("llm_client")
                .with_operation("generate_object")
                .with_metadata("response_chars", &text.len().to_string()),
        })
    }
}

/// Recover a JSON object from a model reply.
///
/// Accepts bare JSON, fenced code blocks, leading reasoning wrapped in
/// `<think>` tags, and prose around a single `{...}` span. Returns `None`
/// when nothing parses to an object.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let without_reasoning = match text.rfind("</think>") {
        Some(end) => &text[end + "</think>".len()..],
        None => text,
    };
    let trimmed = without_reasoning.trim();

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&unfenced[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}
