use std::error::Error as _;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider configuration is invalid (e.g. unknown provider identifier)
    #[error("configuration error: {0}")]
    Config(String),

    /// Upstream provider returned an error
    #[error("upstream error: {message}")]
    Upstream {
        /// HTTP status or backend-embedded error code
        status: Option<u16>,
        /// Human-readable error message
        message: String,
    },

    /// Transport-level failure before a response was received
    #[error("network error: {0}")]
    Network(String),

    /// An attempt exceeded the configured timeout
    #[error("request timeout after {}ms", .after.as_millis())]
    Timeout {
        /// Configured per-attempt timeout
        after: Duration,
    },

    /// The caller aborted the request
    #[error("request cancelled: {reason}")]
    Cancelled {
        /// Reason supplied by the caller
        reason: String,
    },

    /// Response could not be decoded into the expected structure
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Build an upstream error with an optional status
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Numeric status attached to the error, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    /// Error detail without the variant prefix
    ///
    /// For upstream errors this is the raw message, which may itself be a
    /// JSON document when the body could not be normalized.
    pub fn detail(&self) -> String {
        match self {
            Self::Upstream { message, .. } => message.clone(),
            Self::Network(message) | Self::MalformedResponse(message) | Self::Config(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        crate::classify::is_transient(self)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::MalformedResponse(error_chain(&err));
        }
        if err.is_timeout() {
            return Self::Network(format!("timeout: {}", error_chain(&err)));
        }
        Self::Network(error_chain(&err))
    }
}

/// Render an error and all of its sources as one line
///
/// `reqwest` keeps the interesting part ("connection refused", "dns error")
/// in the source chain, which the transient-error classifier needs to see.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
