//! Web search capability backed by the Firecrawl search API

use async_trait::async_trait;
use delve_core::{
    search_error, ContentFormat, DelveError, DelveResult, ErrorContext, SearchConfig,
    SearchDocument, SearchProvider, SearchRequest,
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Slack added to the HTTP client timeout on top of the server-side scrape timeout
const CLIENT_TIMEOUT_GRACE_MS: u64 = 5_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FirecrawlSearchBody<'a> {
    query: &'a str,
    limit: usize,
    timeout: u64,
    scrape_options: ScrapeOptions,
}

#[derive(Serialize)]
struct ScrapeOptions {
    formats: Vec<ContentFormat>,
}

#[derive(Deserialize)]
struct FirecrawlSearchResponse {
    #[serde(default)]
    data: Vec<FirecrawlDocument>,
}

#[derive(Deserialize)]
struct FirecrawlDocument {
    url: Option<String>,
    markdown: Option<String>,
}

/// Firecrawl `/v1/search` client
pub struct FirecrawlSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl FirecrawlSearch {
    pub fn new(config: &SearchConfig) -> DelveResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(
                config.timeout_ms + CLIENT_TIMEOUT_GRACE_MS,
            ))
            .build()
            .map_err(|e| DelveError::Network {
                message: format!("Failed to build HTTP client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("firecrawl").with_operation("new"),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/search", self.base_url)
    }
}

#[async_trait]
impl SearchProvider for FirecrawlSearch {
    async fn search(&self, request: &SearchRequest) -> DelveResult<Vec<SearchDocument>> {
        let body = FirecrawlSearchBody {
            query: &request.query,
            limit: request.result_limit,
            timeout: request.timeout_ms,
            scrape_options: ScrapeOptions {
                formats: request.formats.clone(),
            },
        };

        let mut http_request = self.client.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                DelveError::Timeout {
                    operation: "firecrawl_search".to_string(),
                    duration_ms: request.timeout_ms,
                    context: ErrorContext::new("firecrawl").with_metadata("query", &request.query),
                }
            } else {
                DelveError::Network {
                    message: format!("Search request failed: {}", e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("firecrawl").with_metadata("query", &request.query),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DelveError::RateLimit {
                message: format!("Firecrawl rate limited query '{}'", request.query),
                retry_after_ms: retry_after_ms(response.headers()),
                context: ErrorContext::new("firecrawl")
                    .with_suggestion("Lower research.concurrency_limit"),
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(search_error!(
                format!("Firecrawl returned {}: {}", status, detail),
                request.query,
                "firecrawl"
            ));
        }

        let parsed: FirecrawlSearchResponse = response.json().await.map_err(|e| {
            search_error!(
                format!("Invalid search response: {}", e),
                request.query,
                "firecrawl"
            )
        })?;

        let documents: Vec<SearchDocument> = parsed
            .data
            .into_iter()
            .map(|doc| SearchDocument {
                url: doc.url,
                content: doc.markdown,
            })
            .collect();

        debug!(
            query = %request.query,
            results = documents.len(),
            "Search completed"
        );
        Ok(documents)
    }
}

/// `Retry-After` in milliseconds, when given as delay-seconds
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}
