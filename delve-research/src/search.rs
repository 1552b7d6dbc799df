//! Bounded wrapper around the search capability

use delve_core::{
    with_cancellation, with_timeout, CancellationToken, ContentFormat, DelveResult,
    SearchConfig, SearchDocument, SearchProvider, SearchRequest,
};
use std::sync::Arc;
use tracing::debug;

/// Runs one search with a fixed timeout and result cap.
///
/// Failures are returned to the caller untouched; this layer never retries.
pub struct SearchExecutor {
    provider: Arc<dyn SearchProvider>,
    timeout_ms: u64,
    result_limit: usize,
}

impl SearchExecutor {
    pub fn new(provider: Arc<dyn SearchProvider>, config: &SearchConfig) -> Self {
        Self {
            provider,
            timeout_ms: config.timeout_ms,
            result_limit: config.result_limit,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> DelveResult<Vec<SearchDocument>> {
        let request = SearchRequest {
            query: query.to_string(),
            timeout_ms: self.timeout_ms,
            result_limit: self.result_limit,
            formats: vec![ContentFormat::Markdown],
        };

        let call = async {
            with_timeout(self.provider.search(&request), self.timeout_ms, "search").await?
        };
        let mut documents = with_cancellation(call, cancel, "search").await?;

        // providers may ignore the requested limit
        documents.truncate(self.result_limit);

        debug!(query, results = documents.len(), "Search returned documents");
        Ok(documents)
    }
}
