//! Errors that can arise when interpreting the configuration.

use std::path::PathBuf;

use thiserror::Error;

/// The errors that can occur when parsing a configuration directory.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error in {file_path} at line {line}, column {column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("the configuration declares version {0}, expected version 1")]
    UnsupportedVersion(u32),
    #[error("could not read {file_path}: {message}")]
    IoError { file_path: PathBuf, message: String },
}

/// The errors that can occur when turning a parsed configuration into a
/// runtime configuration.
#[derive(Debug, Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("missing environment variable when interpreting {item}: {error}")]
    MissingEnvironmentVariable {
        item: &'static str,
        error: crate::environment::Error,
    },
}

/// The errors that can occur when writing a parsed configuration to a
/// directory.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("could not serialize the configuration: {0}")]
    SerializationError(#[from] serde_json::Error),
}
