//! Clarifying questions asked before a research run

use crate::prompts;
use delve_core::{DelveError, DelveResult, GenerationRequest, LanguageModel};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct FeedbackGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl FeedbackGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Ask for up to `num_questions` questions that would sharpen `query`
    pub async fn generate_feedback(
        &self,
        query: &str,
        num_questions: usize,
    ) -> DelveResult<Vec<String>> {
        if num_questions == 0 {
            return Ok(Vec::new());
        }

        let request = GenerationRequest::new(
            prompts::system_prompt(),
            prompts::feedback_prompt(query, num_questions),
        );
        let reply = self.llm.generate_object(&request).await?;

        let Some(Value::Array(items)) = reply.get("questions") else {
            return Err(DelveError::malformed(
                "Feedback reply has no questions array",
                "feedback",
            ));
        };

        let questions: Vec<String> = items
            .iter()
            .filter_map(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .map(str::to_string)
            .take(num_questions)
            .collect();

        debug!(questions = questions.len(), "Generated clarifying questions");
        Ok(questions)
    }
}
