//! Final report composition

use crate::budget::ContextBudgeter;
use crate::prompts;
use delve_core::{with_cancellation, CancellationToken, DelveResult, GenerationRequest, LanguageModel};
use std::sync::Arc;
use tracing::info;

/// Writes the long-form report from accumulated learnings
pub struct ReportComposer {
    llm: Arc<dyn LanguageModel>,
    budgeter: ContextBudgeter,
    report_token_budget: usize,
}

impl ReportComposer {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        budgeter: ContextBudgeter,
        report_token_budget: usize,
    ) -> Self {
        Self {
            llm,
            budgeter,
            report_token_budget,
        }
    }

    /// Compose a Markdown report and append the sources in the order given.
    ///
    /// Generation failures are returned to the caller; there is no fallback.
    pub async fn compose(
        &self,
        topic: &str,
        learnings: &[String],
        visited_urls: &[String],
        cancel: &CancellationToken,
    ) -> DelveResult<String> {
        info!(
            learnings = learnings.len(),
            sources = visited_urls.len(),
            "Composing final report"
        );

        let learnings_text = self
            .budgeter
            .trim(&prompts::format_learnings(learnings), self.report_token_budget);
        let request = GenerationRequest::new(
            prompts::system_prompt(),
            prompts::report_prompt(topic, &learnings_text),
        );

        let narrative =
            with_cancellation(self.llm.generate_text(&request), cancel, "compose_report").await?;

        Ok(format!(
            "{}{}",
            narrative,
            prompts::sources_section(visited_urls)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use delve_core::{llm_error, TextSegmenter, Tokenizer, TokenizerConfig};
    use serde_json::Value;
    use std::sync::Mutex;

    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    struct NoSplit;

    impl TextSegmenter for NoSplit {
        fn split(&self, text: &str, _chunk_size: usize, _chunk_overlap: usize) -> Vec<String> {
            vec![text.to_string()]
        }
    }

    struct Writer {
        fail: bool,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for Writer {
        async fn generate_text(&self, request: &GenerationRequest) -> DelveResult<String> {
            self.prompts.lock().unwrap().push(request.user_prompt.clone());
            if self.fail {
                Err(llm_error!("provider down", "test"))
            } else {
                Ok("# Report\n\nBody".to_string())
            }
        }

        async fn generate_object(&self, _request: &GenerationRequest) -> DelveResult<Value> {
            Ok(Value::Null)
        }
    }

    fn composer(fail: bool, budget: usize) -> (ReportComposer, Arc<Writer>) {
        let writer = Arc::new(Writer {
            fail,
            prompts: Mutex::new(Vec::new()),
        });
        let budgeter = ContextBudgeter::new(
            Arc::new(WordTokenizer),
            Arc::new(NoSplit),
            &TokenizerConfig::default(),
        );
        (ReportComposer::new(writer.clone(), budgeter, budget), writer)
    }

    #[tokio::test]
    async fn test_sources_follow_the_narrative_in_order() {
        let (composer, writer) = composer(false, 1_000);
        let report = composer
            .compose(
                "topic",
                &["first fact".to_string(), "second fact".to_string()],
                &["https://b.example".to_string(), "https://a.example".to_string()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            "# Report\n\nBody\n\n## Sources\n\n- https://b.example\n- https://a.example"
        );
        let prompts = writer.prompts.lock().unwrap();
        assert!(prompts[0].contains("<learning>\nfirst fact\n</learning>"));
    }

    #[tokio::test]
    async fn test_learnings_are_trimmed_to_budget() {
        let (composer, writer) = composer(false, 300);
        let learnings: Vec<String> = (0..500).map(|i| format!("fact number {}", i)).collect();

        composer
            .compose("topic", &learnings, &[], &CancellationToken::new())
            .await
            .unwrap();

        let prompts = writer.prompts.lock().unwrap();
        assert!(prompts[0].contains("fact number 0"));
        assert!(!prompts[0].contains("fact number 499"));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let (composer, _) = composer(true, 1_000);
        let result = composer
            .compose("topic", &["fact".to_string()], &[], &CancellationToken::new())
            .await;
        assert!(result.is_err());
    }
}
