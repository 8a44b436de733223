//! The fixed set of reasons a generated statement can be denied.

use thiserror::Error;

/// A denied verdict. Validation failures are terminal: the statement must be
/// re-derived from a new generation, never resubmitted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("could not extract a SQL statement: {0}")]
    Extraction(String),
    #[error("multiple SQL statements are not allowed")]
    MultiStatement,
    #[error("only SELECT statements are allowed, got {0:?}")]
    WriteStatement(String),
    #[error("statement contains a disallowed construct: {0}")]
    UnsafeConstruct(String),
    #[error("statement references {0:?}, which is not part of the schema")]
    UnknownIdentifier(String),
}

impl ValidationError {
    /// Stable machine-readable kind, surfaced in the response envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Extraction(_) => "extraction_error",
            ValidationError::MultiStatement => "multi_statement_error",
            ValidationError::WriteStatement(_) => "write_statement_error",
            ValidationError::UnsafeConstruct(_) => "unsafe_construct_error",
            ValidationError::UnknownIdentifier(_) => "unknown_identifier_error",
        }
    }
}
