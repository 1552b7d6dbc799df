//! Content distillation
//!
//! Turns one batch of search documents into learnings and follow-up
//! questions with a single structured generation call.

use crate::budget::ContextBudgeter;
use crate::output::{parse_structured, ModelOutput};
use crate::prompts;
use delve_core::{
    with_cancellation, CancellationToken, Distillation, GenerationRequest, LanguageModel,
    SearchDocument,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DistilledReply {
    learnings: Vec<Value>,
    #[serde(default)]
    follow_up_questions: Vec<Value>,
}

/// Limits for one distillation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistillLimits {
    pub max_learnings: usize,
    pub max_follow_ups: usize,
}

pub struct ContentDistiller {
    llm: Arc<dyn LanguageModel>,
    budgeter: ContextBudgeter,
    document_token_budget: usize,
}

impl ContentDistiller {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        budgeter: ContextBudgeter,
        document_token_budget: usize,
    ) -> Self {
        Self {
            llm,
            budgeter,
            document_token_budget,
        }
    }

    /// Distill `documents` retrieved for `query`.
    ///
    /// Documents without content are skipped and the rest are trimmed to the
    /// per-document budget. Both lists in the reply are capped to `limits`.
    pub async fn distill(
        &self,
        query: &str,
        documents: &[SearchDocument],
        limits: DistillLimits,
        cancel: &CancellationToken,
    ) -> ModelOutput<Distillation> {
        let contents = self.trimmed_contents(documents).await;

        debug!(
            query,
            documents = documents.len(),
            with_content = contents.len(),
            "Distilling search results"
        );

        let request = GenerationRequest::new(
            prompts::system_prompt(),
            prompts::distillation_prompt(query, &contents, limits.max_learnings, limits.max_follow_ups),
        );
        let reply = with_cancellation(self.llm.generate_object(&request), cancel, "distill").await;

        parse_structured::<DistilledReply>(reply, "content_distiller").map(|reply| Distillation {
            learnings: strings_capped(reply.learnings, limits.max_learnings),
            follow_up_questions: strings_capped(reply.follow_up_questions, limits.max_follow_ups),
        })
    }

    /// Non-empty document contents, each trimmed to the per-document budget.
    /// Tokenizing is CPU-bound, so it runs on the blocking pool.
    async fn trimmed_contents(&self, documents: &[SearchDocument]) -> Vec<String> {
        let contents: Vec<String> = documents
            .iter()
            .filter_map(|doc| doc.content.as_deref())
            .filter(|content| !content.is_empty())
            .map(str::to_string)
            .collect();
        if contents.is_empty() {
            return contents;
        }

        let budgeter = self.budgeter.clone();
        let budget = self.document_token_budget;
        let trimming = tokio::task::spawn_blocking(move || {
            contents
                .iter()
                .map(|content| budgeter.trim(content, budget))
                .collect::<Vec<_>>()
        });

        match trimming.await {
            Ok(trimmed) => trimmed,
            Err(e) => {
                warn!(error = %e, "Document trimming task failed, distilling without content");
                Vec::new()
            }
        }
    }
}

fn strings_capped(values: Vec<Value>, cap: usize) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
        .take(cap)
        .collect()
}
