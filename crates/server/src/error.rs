//! Mapping pipeline failures onto the HTTP surface.

use axum::http::StatusCode;
use serde::Serialize;

use query_engine_generation::GenerationError;
use query_engine_validation::ValidationError;

/// A failure at some stage of handling a query request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("user_query must not be empty")]
    InvalidRequest,
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Execution(#[from] query_engine_execution::Error),
}

/// The error field of the response envelope: a stable machine-readable kind
/// plus a human-readable message. Internal diagnostics stay out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl ServerError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest => "invalid_request",
            ServerError::Generation(_) => "generation_error",
            ServerError::Validation(error) => error.kind(),
            ServerError::Execution(error) => error.kind(),
        }
    }

    /// Validation and malformed-input failures are the caller's to fix;
    /// generation failures are an upstream fault; everything else is ours.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest | ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Generation(_) => StatusCode::BAD_GATEWAY,
            ServerError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_body(self) -> ErrorBody {
        let message = match &self {
            ServerError::Execution(error) => error.public_message(),
            // transport errors render with the endpoint URL; keep that out
            // of the response
            ServerError::Generation(GenerationError::Unreachable(_)) => {
                "the inference endpoint could not be reached".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody {
            kind: self.kind().to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failures_are_client_errors() {
        let error = ServerError::Validation(ValidationError::MultiStatement);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.kind(), "multi_statement_error");
    }

    #[test]
    fn test_generation_failures_are_upstream_errors() {
        let error = ServerError::Generation(GenerationError::Timeout);
        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(error.kind(), "generation_error");
    }

    #[test]
    fn test_execution_failures_are_server_errors() {
        let error = ServerError::Execution(query_engine_execution::Error::Timeout(5000));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.kind(), "execution_error");
        assert!(error.into_body().message.contains("5000"));
    }
}
