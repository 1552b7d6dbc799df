//! Research engine entry point
//!
//! Wires the capabilities into the orchestrator, the report composer and the
//! feedback generator, and applies the configured defaults.

use crate::budget::ContextBudgeter;
use crate::feedback::FeedbackGenerator;
use crate::orchestrator::ResearchOrchestrator;
use crate::synthesizer::ReportComposer;
use delve_core::{
    performance::measure_async, CancellationToken, Capabilities, DelveConfig, DelveResult,
    ResearchResult,
};
use tracing::info;

/// Breadth and depth for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchBudget {
    pub breadth: usize,
    pub depth: usize,
}

/// Deep research engine: clarify, research, report
pub struct ResearchEngine {
    orchestrator: ResearchOrchestrator,
    composer: ReportComposer,
    feedback: FeedbackGenerator,
    config: DelveConfig,
}

impl ResearchEngine {
    /// Create a new research engine, validating `config` first
    pub fn new(capabilities: Capabilities, config: DelveConfig) -> DelveResult<Self> {
        config.validate()?;

        let budgeter = ContextBudgeter::new(
            capabilities.tokenizer.clone(),
            capabilities.segmenter.clone(),
            &config.tokenizer,
        );

        Ok(Self {
            orchestrator: ResearchOrchestrator::new(&capabilities, &config),
            composer: ReportComposer::new(
                capabilities.llm.clone(),
                budgeter,
                config.research.report_token_budget,
            ),
            feedback: FeedbackGenerator::new(capabilities.llm.clone()),
            config,
        })
    }

    pub fn config(&self) -> &DelveConfig {
        &self.config
    }

    /// Breadth and depth from configuration
    pub fn default_budget(&self) -> ResearchBudget {
        ResearchBudget {
            breadth: self.config.research.default_breadth,
            depth: self.config.research.default_depth,
        }
    }

    /// Clarifying questions for `query`, as many as configured
    pub async fn clarifying_questions(&self, query: &str) -> DelveResult<Vec<String>> {
        self.feedback
            .generate_feedback(query, self.config.research.feedback_questions)
            .await
    }

    pub async fn research(
        &self,
        query: &str,
        budget: ResearchBudget,
        cancel: &CancellationToken,
    ) -> DelveResult<ResearchResult> {
        info!(
            breadth = budget.breadth,
            depth = budget.depth,
            "Starting deep research"
        );
        measure_async(
            "research",
            self.orchestrator.research(
                query,
                budget.breadth,
                budget.depth,
                ResearchResult::default(),
                cancel,
            ),
        )
        .await
    }

    pub async fn write_report(
        &self,
        topic: &str,
        result: &ResearchResult,
        cancel: &CancellationToken,
    ) -> DelveResult<String> {
        measure_async(
            "write_report",
            self.composer
                .compose(topic, &result.learnings, &result.visited_urls, cancel),
        )
        .await
    }
}
