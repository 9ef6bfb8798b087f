//! Error type for model API calls.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl LlmError {
    /// Whether another attempt could succeed.
    ///
    /// Transport failures, timeouts, rate limits and 5xx responses are
    /// retried. Client errors and malformed bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::ApiError(_) | LlmError::Timeout | LlmError::RateLimitExceeded => true,
            LlmError::Status { status, .. } => *status >= 500,
            LlmError::ParseError(_)
            | LlmError::ConfigError(_)
            | LlmError::EmptyResponse
            | LlmError::DimensionMismatch { .. } => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::ApiError(e.to_string())
        }
    }
}
