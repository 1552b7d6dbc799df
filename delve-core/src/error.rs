//! Unified error handling system
//!
//! Every failure in the workspace is a [`DelveError`] carrying an [`ErrorContext`]
//! for tracking and recovery hints. The research engine converts most of these
//! into empty partial results; only misuse errors reach its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type DelveResult<T> = Result<T, DelveError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the research system
#[derive(Error, Debug)]
pub enum DelveError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
        model: Option<String>,
        context: ErrorContext,
    },

    #[error("Search error: {message}")]
    Search {
        message: String,
        query: Option<String>,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after_ms: Option<u64>,
        context: ErrorContext,
    },

    #[error("Operation cancelled: {operation}")]
    Cancelled {
        operation: String,
        context: ErrorContext,
    },

    #[error("Malformed model output: {message}")]
    MalformedOutput {
        message: String,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl DelveError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            DelveError::Config { context, .. }
            | DelveError::Validation { context, .. }
            | DelveError::Llm { context, .. }
            | DelveError::Search { context, .. }
            | DelveError::Network { context, .. }
            | DelveError::Timeout { context, .. }
            | DelveError::RateLimit { context, .. }
            | DelveError::Cancelled { context, .. }
            | DelveError::MalformedOutput { context, .. }
            | DelveError::Internal { context, .. } => Some(context),
            DelveError::Io(_) | DelveError::Serialization(_) => None,
        }
    }

    /// Check if error is recoverable
    ///
    /// Recoverable means the same call may succeed later. The research engine
    /// never retries searches itself; this is informational for callers.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DelveError::Network { .. }
                | DelveError::Timeout { .. }
                | DelveError::RateLimit { .. }
                | DelveError::MalformedOutput { .. }
        )
    }

    /// True for errors caused by the caller rather than a collaborator
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            DelveError::Config { .. } | DelveError::Validation { .. }
        )
    }

    /// Shorthand for a cancellation error raised by `component`
    pub fn cancelled(operation: &str, component: &str) -> Self {
        DelveError::Cancelled {
            operation: operation.to_string(),
            context: ErrorContext::new(component).with_operation(operation),
        }
    }

    /// Shorthand for a model reply that did not have the requested shape
    pub fn malformed<S: Into<String>>(message: S, component: &str) -> Self {
        DelveError::MalformedOutput {
            message: message.into(),
            context: ErrorContext::new(component)
                .with_suggestion("The model may succeed on a second attempt"),
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        match self {
            DelveError::Internal { .. } => {
                error!(error_id = ?error_id, error = %self, "Internal error occurred");
            }
            DelveError::Config { .. } | DelveError::Validation { .. } => {
                error!(error_id = ?error_id, error = %self, "Configuration or validation error");
            }
            DelveError::Network { .. }
            | DelveError::Timeout { .. }
            | DelveError::RateLimit { .. }
            | DelveError::Cancelled { .. }
            | DelveError::MalformedOutput { .. } => {
                warn!(error_id = ?error_id, error = %self, "Collaborator error (may be recoverable)");
            }
            _ => {
                error!(error_id = ?error_id, error = %self, "Error occurred");
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::DelveError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'delve config --init' to create default config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::DelveError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and range"),
        }
    };
}

#[macro_export]
macro_rules! search_error {
    ($msg:expr, $query:expr, $component:expr) => {
        $crate::DelveError::Search {
            message: $msg.to_string(),
            query: Some($query.to_string()),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! llm_error {
    ($msg:expr, $component:expr) => {
        $crate::DelveError::Llm {
            message: $msg.to_string(),
            provider: None,
            model: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $provider:expr, $model:expr, $component:expr) => {
        $crate::DelveError::Llm {
            message: $msg.to_string(),
            provider: Some($provider.to_string()),
            model: Some($model.to_string()),
            context: $crate::ErrorContext::new($component),
        }
    };
}
