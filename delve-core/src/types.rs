//! Core data type definitions

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One planned sub-query and the goal it is meant to advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchQuery {
    pub query: String,
    pub research_goal: String,
}

/// A document returned by the search capability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub url: Option<String>,
    pub content: Option<String>,
}

impl SearchDocument {
    pub fn new<U: Into<String>, C: Into<String>>(url: U, content: C) -> Self {
        Self {
            url: Some(url.into()),
            content: Some(content.into()),
        }
    }
}

/// Content formats a search provider can be asked to scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Markdown,
}

/// Input to a single search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub timeout_ms: u64,
    pub result_limit: usize,
    pub formats: Vec<ContentFormat>,
}

/// Input to a single generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl GenerationRequest {
    pub fn new<S: Into<String>, U: Into<String>>(system_prompt: S, user_prompt: U) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

/// Learnings and follow-up questions extracted from one batch of documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distillation {
    pub learnings: Vec<String>,
    pub follow_up_questions: Vec<String>,
}

/// Accumulated output of a research subtree.
///
/// Both lists hold distinct values in first-seen order. Build one through
/// [`ResearchResult::new`], [`ResearchResult::merge`] or
/// [`ResearchResult::union`] to keep that property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
}

impl ResearchResult {
    pub fn new<L, U>(learnings: L, visited_urls: U) -> Self
    where
        L: IntoIterator<Item = String>,
        U: IntoIterator<Item = String>,
    {
        let mut result = Self::default();
        result.extend(learnings, visited_urls);
        result
    }

    pub fn is_empty(&self) -> bool {
        self.learnings.is_empty() && self.visited_urls.is_empty()
    }

    /// Append values not already present
    pub fn extend<L, U>(&mut self, learnings: L, visited_urls: U)
    where
        L: IntoIterator<Item = String>,
        U: IntoIterator<Item = String>,
    {
        push_distinct(&mut self.learnings, learnings);
        push_distinct(&mut self.visited_urls, visited_urls);
    }

    /// Set-union of `self` and `other`
    pub fn merge(mut self, other: ResearchResult) -> Self {
        self.extend(other.learnings, other.visited_urls);
        self
    }

    /// Set-union of any number of results
    pub fn union<I: IntoIterator<Item = ResearchResult>>(results: I) -> Self {
        results
            .into_iter()
            .fold(ResearchResult::default(), ResearchResult::merge)
    }
}

fn push_distinct<I: IntoIterator<Item = String>>(target: &mut Vec<String>, values: I) {
    let mut seen: HashSet<String> = target.iter().cloned().collect();
    for value in values {
        if seen.insert(value.clone()) {
            target.push(value);
        }
    }
}
