//! HTTP transport error types.

use mcpfusion_core::CoreError;

/// Error type for HTTP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("invalid header value for {name}: {value}")]
    InvalidHeaderValue { name: String, value: String },

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl HttpError {
    /// Whether the request pipeline should retry this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::Network(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

impl From<HttpError> for CoreError {
    fn from(err: HttpError) -> Self {
        match &err {
            HttpError::Network(e) if e.is_timeout() => CoreError::Timeout(err.to_string()),
            HttpError::Network(_) if err.is_retryable() => CoreError::UpstreamTransient(err.to_string()),
            _ => CoreError::UpstreamPermanent(err.to_string()),
        }
    }
}
