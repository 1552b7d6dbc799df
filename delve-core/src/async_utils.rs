//! Async utilities and patterns
//!
//! Timeout and cancellation wrappers used around every external call.

use crate::error::{DelveError, DelveResult, ErrorContext};
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Timeout wrapper for async operations
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> DelveResult<T>
where
    F: std::future::Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(DelveError::Timeout {
            operation: operation_name.to_string(),
            duration_ms: timeout_ms,
            context: ErrorContext::new("async_utils")
                .with_operation("timeout")
                .with_metadata("timeout_ms", &timeout_ms.to_string())
                .with_suggestion("Increase timeout duration")
                .with_suggestion("Check network connectivity"),
        }),
    }
}

/// Race a fallible operation against a cancellation token.
///
/// Dropping the losing future interrupts whatever request it had in flight.
pub async fn with_cancellation<F, T>(
    future: F,
    token: &CancellationToken,
    operation_name: &str,
) -> DelveResult<T>
where
    F: std::future::Future<Output = DelveResult<T>>,
{
    if token.is_cancelled() {
        return Err(DelveError::cancelled(operation_name, "async_utils"));
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(operation = operation_name, "Operation cancelled");
            Err(DelveError::cancelled(operation_name, "async_utils"))
        }
        result = future => result,
    }
}
