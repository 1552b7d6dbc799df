//! Query planning
//!
//! Turns a topic plus prior learnings into distinct search queries, each
//! paired with the goal it is meant to advance.

use crate::output::{parse_structured, ModelOutput};
use crate::prompts;
use delve_core::{
    with_cancellation, CancellationToken, GenerationRequest, LanguageModel, ResearchQuery,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct PlannedQueries {
    queries: Vec<Value>,
}

/// Plans the sub-queries of one research node
pub struct QueryPlanner {
    llm: Arc<dyn LanguageModel>,
}

impl QueryPlanner {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Generate `max_count` distinct queries for `topic`.
    ///
    /// Items missing a non-blank `query` are dropped individually and extra
    /// queries are truncated. A reply that still yields fewer than
    /// `max_count` usable queries is `Rejected`, so the caller's retry policy
    /// treats "too few planned" and "unparsable" alike.
    pub async fn generate_queries(
        &self,
        topic: &str,
        max_count: usize,
        prior_learnings: &[String],
        cancel: &CancellationToken,
    ) -> ModelOutput<Vec<ResearchQuery>> {
        if max_count == 0 {
            return ModelOutput::Parsed(Vec::new());
        }

        let request = GenerationRequest::new(
            prompts::system_prompt(),
            prompts::planning_prompt(topic, max_count, prior_learnings),
        );
        let reply = with_cancellation(self.llm.generate_object(&request), cancel, "plan_queries").await;

        let queries = match parse_structured::<PlannedQueries>(reply, "query_planner") {
            ModelOutput::Parsed(planned) => distinct_queries(planned.queries, max_count),
            ModelOutput::Rejected(reason) => return ModelOutput::Rejected(reason),
        };

        if queries.len() < max_count {
            return ModelOutput::Rejected(format!(
                "planner returned {} of {} usable queries",
                queries.len(),
                max_count
            ));
        }

        info!(
            planned = queries.len(),
            max_count,
            "Planned research queries"
        );
        for query in &queries {
            debug!(query = %query.query, "Planned query");
        }

        ModelOutput::Parsed(queries)
    }
}

/// Keep well-formed items, drop repeated query strings, then cap at `max_count`
fn distinct_queries(items: Vec<Value>, max_count: usize) -> Vec<ResearchQuery> {
    let mut seen = HashSet::new();

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ResearchQuery>(item).ok())
        .filter(|q| !q.query.trim().is_empty())
        .filter(|q| seen.insert(q.query.clone()))
        .take(max_count)
        .collect()
}
