//! Client error types

use thiserror::Error;

/// Errors that can occur when calling the IoT Central query API
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP 429 from the remote API
    #[error("Rate limited")]
    RateLimited,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("IoT Central unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body did not have the expected `{ results: [...] }` shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ClientError {
    /// Whether the request was throttled and may be retried
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited)
    }

    /// Map a reqwest error into the matching client error
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::Unavailable
        } else {
            ClientError::Request(e)
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
