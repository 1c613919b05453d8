//! Error types for comment location.

use thiserror::Error;

/// Result type alias for locator operations.
pub type Result<T> = std::result::Result<T, LocatorError>;

/// Errors that can occur while locating comments.
#[derive(Error, Debug)]
pub enum LocatorError {
    /// No API key or endpoint is available.
    #[error("comment locator not configured")]
    ProviderNotConfigured,

    /// The API answered with a non-success status.
    #[error("API request failed with status {status}: {message}")]
    ApiRequest { status: u16, message: String },

    /// The response did not follow the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded after all retries.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl LocatorError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::RateLimited { .. } => true,
            LocatorError::ApiRequest { status, .. } => *status >= 500,
            LocatorError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
