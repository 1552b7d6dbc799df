//! Typed parse-or-fail step for structured model output
//!
//! Planner and distiller both receive a loosely-typed JSON value from the
//! language model. [`parse_structured`] turns that value (or the error that
//! replaced it) into a [`ModelOutput`], and [`retry_once`] implements the
//! single same-input retry both call sites share.

use delve_core::DelveResult;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, warn};

/// Outcome of one structured generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutput<T> {
    Parsed(T),
    /// The call failed or its reply did not have the expected shape
    Rejected(String),
}

impl<T> ModelOutput<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ModelOutput::Parsed(_))
    }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            ModelOutput::Parsed(value) => Some(value),
            ModelOutput::Rejected(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ModelOutput<U> {
        match self {
            ModelOutput::Parsed(value) => ModelOutput::Parsed(f(value)),
            ModelOutput::Rejected(reason) => ModelOutput::Rejected(reason),
        }
    }
}

/// Deserialize a structured reply into `T`.
///
/// Capability errors are folded into `Rejected` as well, so callers branch
/// on one tag regardless of where the failure happened.
pub fn parse_structured<T: DeserializeOwned>(
    reply: DelveResult<Value>,
    component: &str,
) -> ModelOutput<T> {
    let value = match reply {
        Ok(value) => value,
        Err(e) => {
            debug!(component, error = %e, "Structured generation failed");
            return ModelOutput::Rejected(e.to_string());
        }
    };

    match serde_json::from_value::<T>(value) {
        Ok(parsed) => ModelOutput::Parsed(parsed),
        Err(e) => {
            debug!(component, error = %e, "Structured reply had an unexpected shape");
            ModelOutput::Rejected(format!("{}: unexpected reply shape: {}", component, e))
        }
    }
}

/// Run `attempt` and, if it is rejected or `accept` refuses the parsed
/// value, run it exactly once more with the same input.
///
/// The second outcome is returned as-is; a value that still fails `accept`
/// comes back as `Parsed` so the caller decides how to degrade.
pub async fn retry_once<T, F, Fut, A>(operation: &str, mut attempt: F, accept: A) -> ModelOutput<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ModelOutput<T>>,
    A: Fn(&T) -> bool,
{
    let first = attempt().await;
    let reason = match &first {
        ModelOutput::Parsed(value) if accept(value) => return first,
        ModelOutput::Parsed(_) => "empty result".to_string(),
        ModelOutput::Rejected(reason) => reason.clone(),
    };

    warn!(operation, reason = %reason, "Retrying once");
    attempt().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::DelveError;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Numbers {
        numbers: Vec<u32>,
    }

    #[test]
    fn test_parse_matching_shape() {
        let output: ModelOutput<Numbers> =
            parse_structured(Ok(json!({"numbers": [1, 2]})), "test");
        assert_eq!(output, ModelOutput::Parsed(Numbers { numbers: vec![1, 2] }));
    }

    #[test]
    fn test_parse_wrong_shape_is_rejected() {
        let output: ModelOutput<Numbers> =
            parse_structured(Ok(json!({"numbers": "many"})), "test");
        assert!(!output.is_parsed());
    }

    #[test]
    fn test_capability_error_is_rejected() {
        let output: ModelOutput<Numbers> =
            parse_structured(Err(DelveError::malformed("no json", "test")), "test");
        match output {
            ModelOutput::Rejected(reason) => assert!(reason.contains("no json")),
            other => panic!("Expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_accepted_first_attempt_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let output = retry_once(
            "test",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                ModelOutput::Parsed(vec![1])
            },
            |v: &Vec<i32>| !v.is_empty(),
        )
        .await;

        assert_eq!(output, ModelOutput::Parsed(vec![1]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_exactly_once() {
        let calls = AtomicUsize::new(0);
        let output = retry_once(
            "test",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                ModelOutput::<Vec<i32>>::Rejected("bad".to_string())
            },
            |v: &Vec<i32>| !v.is_empty(),
        )
        .await;

        assert!(!output.is_parsed());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unaccepted_value_triggers_retry() {
        let calls = AtomicUsize::new(0);
        let output = retry_once(
            "test",
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                ModelOutput::Parsed(if n == 0 { vec![] } else { vec![7] })
            },
            |v: &Vec<i32>| !v.is_empty(),
        )
        .await;

        assert_eq!(output.into_parsed(), Some(vec![7]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
