//! Errors from the inference endpoint.

use thiserror::Error;

/// A generation request can fail in a handful of ways. None of these are
/// retried here; the request pipeline owns the (bounded) retry policy.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("inference endpoint unreachable: {0}")]
    Unreachable(reqwest::Error),
    #[error("inference request timed out")]
    Timeout,
    #[error("inference endpoint rejected the credentials (HTTP {0})")]
    Unauthorized(reqwest::StatusCode),
    #[error("inference endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("inference endpoint returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("inference endpoint returned no generated text")]
    EmptyResponse,
}

impl GenerationError {
    /// Whether the pipeline may retry the request. Transport-level failures
    /// and server errors are worth one more attempt; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Unreachable(_) | GenerationError::Timeout => true,
            GenerationError::Status(status) => status.is_server_error(),
            GenerationError::Unauthorized(_)
            | GenerationError::MalformedResponse(_)
            | GenerationError::EmptyResponse => false,
        }
    }
}
