//! Errors during query execution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(sqlx::Error),
    #[error("query execution exceeded the {0} ms time limit")]
    Timeout(u64),
    #[error("column {column:?} has unsupported type {type_name:?}")]
    UnsupportedColumnType { column: String, type_name: String },
}

impl Error {
    /// Stable machine-readable kind, surfaced in the response envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Db(_) | Error::Timeout(_) => "execution_error",
            Error::UnsupportedColumnType { .. } => "serialization_error",
        }
    }

    /// A message safe to hand to the caller: the database's own diagnostic
    /// where there is one, and nothing that could carry connection details
    /// or credentials otherwise.
    pub fn public_message(&self) -> String {
        match self {
            Error::Db(sqlx::Error::Database(db_error)) => {
                format!("database error: {}", db_error.message())
            }
            Error::Db(_) => "the database request failed".to_string(),
            Error::Timeout(ms) => format!("query execution exceeded the {ms} ms time limit"),
            Error::UnsupportedColumnType { column, type_name } => {
                format!("column {column:?} has unsupported type {type_name:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_do_not_leak_details() {
        let error = Error::Db(sqlx::Error::PoolTimedOut);
        assert_eq!(error.public_message(), "the database request failed");
        assert_eq!(error.kind(), "execution_error");
    }

    #[test]
    fn test_unsupported_type_is_a_serialization_error() {
        let error = Error::UnsupportedColumnType {
            column: "payload".to_string(),
            type_name: "JSONB".to_string(),
        };
        assert_eq!(error.kind(), "serialization_error");
        assert!(error.public_message().contains("JSONB"));
    }
}
