//! Deterministic capability fakes shared by the research integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use delve_core::{
    llm_error, search_error, Capabilities, DelveConfig, DelveResult, GenerationRequest, LanguageModel,
    SearchDocument, SearchProvider, SearchRequest, Tokenizer,
};
use delve_providers::TextChunker;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type PlanReply = dyn Fn(usize, usize) -> Value + Send + Sync;
type DistillReply = dyn Fn(usize, &str) -> Value + Send + Sync;

/// Scripted language model.
///
/// Planning replies receive `(call index, requested max count)`; distillation
/// replies receive `(call index, branch query)`.
pub struct FakeModel {
    plan: Box<PlanReply>,
    distill: Box<DistillReply>,
    failing_plans_from: Option<usize>,
    failing_distills: bool,
    pub plan_calls: AtomicUsize,
    pub distill_calls: AtomicUsize,
    pub plan_prompts: Mutex<Vec<String>>,
    pub distill_prompts: Mutex<Vec<String>>,
    pub report_prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new<P, D>(plan: P, distill: D) -> Self
    where
        P: Fn(usize, usize) -> Value + Send + Sync + 'static,
        D: Fn(usize, &str) -> Value + Send + Sync + 'static,
    {
        Self {
            plan: Box::new(plan),
            distill: Box::new(distill),
            failing_plans_from: None,
            failing_distills: false,
            plan_calls: AtomicUsize::new(0),
            distill_calls: AtomicUsize::new(0),
            plan_prompts: Mutex::new(Vec::new()),
            distill_prompts: Mutex::new(Vec::new()),
            report_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Plans `max_count` fresh queries per call and distills one learning
    /// and one follow-up question per branch
    pub fn well_behaved() -> Self {
        Self::new(unique_queries, |_, query| {
            json!({
                "learnings": [format!("learning about {}", query)],
                "followUpQuestions": ["what next?"]
            })
        })
    }

    /// Planning calls with index `first` or later fail with a capability error
    pub fn failing_plans_from(mut self, first: usize) -> Self {
        self.failing_plans_from = Some(first);
        self
    }

    /// Every distillation call fails with a capability error
    pub fn failing_distills(mut self) -> Self {
        self.failing_distills = true;
        self
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    pub fn distill_calls(&self) -> usize {
        self.distill_calls.load(Ordering::SeqCst)
    }

    /// `max_count` of every planning call, in call order
    pub fn requested_query_counts(&self) -> Vec<usize> {
        self.plan_prompts
            .lock()
            .unwrap()
            .iter()
            .map(|p| number_after(p, "Return exactly "))
            .collect()
    }

    /// Follow-up cap of every distillation call, in call order
    pub fn requested_follow_up_counts(&self) -> Vec<usize> {
        self.distill_prompts
            .lock()
            .unwrap()
            .iter()
            .map(|p| number_after(p, "Also generate up to "))
            .collect()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate_text(&self, request: &GenerationRequest) -> DelveResult<String> {
        self.report_prompts
            .lock()
            .unwrap()
            .push(request.user_prompt.clone());
        Ok("# Report".to_string())
    }

    async fn generate_object(&self, request: &GenerationRequest) -> DelveResult<Value> {
        let prompt = &request.user_prompt;
        if prompt.contains("generate a list of SERP queries") {
            let index = self.plan_calls.fetch_add(1, Ordering::SeqCst);
            self.plan_prompts.lock().unwrap().push(prompt.clone());
            if self.failing_plans_from.is_some_and(|first| index >= first) {
                return Err(llm_error!("planner model unavailable", "fake_model"));
            }
            Ok((self.plan)(index, number_after(prompt, "Return exactly ")))
        } else if prompt.contains("clarify the research direction") {
            Ok(json!({"questions": ["Which aspect matters most?", "Any time frame?"]}))
        } else {
            let index = self.distill_calls.fetch_add(1, Ordering::SeqCst);
            self.distill_prompts.lock().unwrap().push(prompt.clone());
            if self.failing_distills {
                return Err(llm_error!("distiller model unavailable", "fake_model"));
            }
            let query = between(prompt, "<query>", "</query>");
            Ok((self.distill)(index, &query))
        }
    }
}

/// `max_count` queries named after the planning call that produced them
pub fn unique_queries(call: usize, max_count: usize) -> Value {
    let queries: Vec<Value> = (0..max_count)
        .map(|i| {
            json!({
                "query": format!("q{}-{}", call, i),
                "researchGoal": format!("goal {}-{}", call, i)
            })
        })
        .collect();
    json!({ "queries": queries })
}

/// Search fake that records concurrency and can fail chosen queries
pub struct FakeSearch {
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    delay: Duration,
    failing: Vec<String>,
    shared_url: Option<String>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            delay: Duration::from_millis(5),
            failing: Vec::new(),
            shared_url: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    /// Every search also returns a document at `url`
    pub fn with_shared_url(mut self, url: &str) -> Self {
        self.shared_url = Some(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> DelveResult<Vec<SearchDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&request.query) {
            return Err(search_error!("simulated outage", request.query, "fake_search"));
        }

        let mut documents = vec![SearchDocument::new(
            url_for(&request.query),
            format!("Body text about {}", request.query),
        )];
        if let Some(url) = &self.shared_url {
            documents.push(SearchDocument::new(url.as_str(), "shared body"));
        }
        Ok(documents)
    }
}

pub fn url_for(query: &str) -> String {
    format!("https://example.com/{}", query)
}

/// One token per whitespace-separated word
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

pub fn capabilities(model: Arc<FakeModel>, search: Arc<FakeSearch>) -> Capabilities {
    Capabilities::new(
        model,
        search,
        Arc::new(WordTokenizer),
        Arc::new(TextChunker::new()),
    )
}

pub fn config_with_concurrency(limit: usize) -> DelveConfig {
    let mut config = DelveConfig::default();
    config.research.concurrency_limit = limit;
    config
}

fn number_after(text: &str, marker: &str) -> usize {
    text.split(marker)
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn between(text: &str, open: &str, close: &str) -> String {
    text.split(open)
        .nth(1)
        .and_then(|rest| rest.split(close).next())
        .unwrap_or_default()
        .to_string()
}
