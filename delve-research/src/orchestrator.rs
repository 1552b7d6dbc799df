//! Recursive research orchestration
//!
//! Each node plans up to `breadth` sub-queries and fans out one branch per
//! query. A branch searches, distills the results, and either returns what
//! it has accumulated (leaf) or recurses with half the breadth and one less
//! depth. Every branch failure is contained to an empty result; the parent
//! returns the exact-string union of its branches.
//!
//! One [`Semaphore`] is created per [`ResearchOrchestrator::research`] call
//! and shared by the whole tree. A branch holds its permit only for its own
//! search and distillation, never across recursion, so the number of
//! in-flight search/distill steps in a run never exceeds the configured
//! limit and descendants cannot starve waiting on their ancestors.

use crate::budget::ContextBudgeter;
use crate::distiller::{ContentDistiller, DistillLimits};
use crate::output::retry_once;
use crate::planner::QueryPlanner;
use crate::prompts;
use crate::search::SearchExecutor;
use delve_core::{
    validation_error, CancellationToken, Capabilities, DelveConfig, DelveResult, Distillation,
    ResearchQuery, ResearchResult,
};
use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn, Instrument};

/// Budget limits applied to every run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorLimits {
    pub concurrency_limit: usize,
    pub learnings_per_query: usize,
    pub max_breadth: usize,
    pub max_depth: usize,
}

impl OrchestratorLimits {
    pub fn from_config(config: &DelveConfig) -> Self {
        Self {
            concurrency_limit: config.research.concurrency_limit,
            learnings_per_query: config.research.learnings_per_query,
            max_breadth: config.research.max_breadth,
            max_depth: config.research.max_depth,
        }
    }
}

/// Breadth given to the children of a node with `breadth`
pub fn child_breadth(breadth: usize) -> usize {
    breadth.div_ceil(2)
}

pub struct ResearchOrchestrator {
    planner: QueryPlanner,
    executor: SearchExecutor,
    distiller: ContentDistiller,
    limits: OrchestratorLimits,
}

impl ResearchOrchestrator {
    pub fn new(capabilities: &Capabilities, config: &DelveConfig) -> Self {
        let budgeter = ContextBudgeter::new(
            capabilities.tokenizer.clone(),
            capabilities.segmenter.clone(),
            &config.tokenizer,
        );

        Self {
            planner: QueryPlanner::new(capabilities.llm.clone()),
            executor: SearchExecutor::new(capabilities.search.clone(), &config.search),
            distiller: ContentDistiller::new(
                capabilities.llm.clone(),
                budgeter,
                config.research.document_token_budget,
            ),
            limits: OrchestratorLimits::from_config(config),
        }
    }

    /// Research `query` to the given breadth and depth.
    ///
    /// `carried` seeds the learnings and URLs every branch starts from. Only
    /// out-of-range parameters produce an error; collaborator failures
    /// shrink the result instead. A `depth` of 0 behaves like 1: branches
    /// search and distill once and do not recurse.
    pub async fn research(
        &self,
        query: &str,
        breadth: usize,
        depth: usize,
        carried: ResearchResult,
        cancel: &CancellationToken,
    ) -> DelveResult<ResearchResult> {
        if breadth > self.limits.max_breadth {
            return Err(validation_error!(
                format!(
                    "Breadth {} exceeds the maximum of {}",
                    breadth, self.limits.max_breadth
                ),
                "breadth",
                "orchestrator"
            ));
        }
        if depth > self.limits.max_depth {
            return Err(validation_error!(
                format!(
                    "Depth {} exceeds the maximum of {}",
                    depth, self.limits.max_depth
                ),
                "depth",
                "orchestrator"
            ));
        }
        if self.limits.concurrency_limit == 0 {
            return Err(validation_error!(
                "Concurrency limit must be greater than 0",
                "concurrency_limit",
                "orchestrator"
            ));
        }

        info!(breadth, depth, "Starting research run");
        let limiter = Semaphore::new(self.limits.concurrency_limit);
        let result = self
            .research_node(query.to_string(), breadth, depth, carried, &limiter, cancel)
            .await;

        info!(
            learnings = result.learnings.len(),
            visited_urls = result.visited_urls.len(),
            "Research run finished"
        );
        Ok(result)
    }

    fn research_node<'a>(
        &'a self,
        query: String,
        breadth: usize,
        depth: usize,
        carried: ResearchResult,
        limiter: &'a Semaphore,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, ResearchResult> {
        let span = info_span!("research_node", breadth, depth);

        async move {
            if breadth == 0 || cancel.is_cancelled() {
                return ResearchResult::default();
            }

            let planned: Vec<ResearchQuery> = retry_once(
                "plan_queries",
                || {
                    self.planner
                        .generate_queries(&query, breadth, &carried.learnings, cancel)
                },
                |queries: &Vec<ResearchQuery>| !queries.is_empty(),
            )
            .await
            .into_parsed()
            .unwrap_or_default();

            if planned.is_empty() {
                warn!("Planning produced no queries, pruning this node");
                return ResearchResult::default();
            }

            let branches = planned.into_iter().map(|research_query| {
                self.research_branch(research_query, breadth, depth, &carried, limiter, cancel)
            });

            ResearchResult::union(join_all(branches).await)
        }
        .instrument(span)
        .boxed()
    }

    async fn research_branch(
        &self,
        research_query: ResearchQuery,
        breadth: usize,
        depth: usize,
        carried: &ResearchResult,
        limiter: &Semaphore,
        cancel: &CancellationToken,
    ) -> ResearchResult {
        let next_breadth = child_breadth(breadth);
        let next_depth = depth.saturating_sub(1);

        let (distillation, urls) = {
            let Ok(_permit) = limiter.acquire().await else {
                return ResearchResult::default();
            };

            let documents = match self.executor.search(&research_query.query, cancel).await {
                Ok(documents) => documents,
                Err(e) => {
                    warn!(query = %research_query.query, error = %e, "Search failed, dropping branch");
                    return ResearchResult::default();
                }
            };
            let urls: Vec<String> = documents.iter().filter_map(|doc| doc.url.clone()).collect();

            let limits = DistillLimits {
                max_learnings: self.limits.learnings_per_query,
                max_follow_ups: next_breadth,
            };
            let distillation: Distillation = retry_once(
                "distill",
                || {
                    self.distiller
                        .distill(&research_query.query, &documents, limits, cancel)
                },
                |distillation: &Distillation| !distillation.learnings.is_empty(),
            )
            .await
            .into_parsed()
            .unwrap_or_default();

            (distillation, urls)
        };

        if cancel.is_cancelled() {
            debug!(query = %research_query.query, "Branch cancelled");
            return ResearchResult::default();
        }

        debug!(
            query = %research_query.query,
            learnings = distillation.learnings.len(),
            follow_ups = distillation.follow_up_questions.len(),
            urls = urls.len(),
            "Branch distilled"
        );

        let mut accumulated = carried.clone();
        accumulated.extend(distillation.learnings, urls);

        if next_depth == 0 {
            return accumulated;
        }

        info!(
            breadth = next_breadth,
            depth = next_depth,
            "Researching deeper"
        );
        let next_query = prompts::next_level_query(
            &research_query.research_goal,
            &distillation.follow_up_questions,
        );
        self.research_node(next_query, next_breadth, next_depth, accumulated, limiter, cancel)
            .await
    }
}
