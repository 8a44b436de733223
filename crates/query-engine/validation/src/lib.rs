//! Validation and sanitization of model-generated SQL.
//!
//! Nothing produced by the inference endpoint reaches a database connection
//! without passing through [`validate`], whose success type,
//! [`ValidatedStatement`], cannot be constructed anywhere else.

pub mod error;
pub mod extract;
pub mod validate;

pub use error::ValidationError;
pub use validate::{validate, ValidatedStatement, ValidationOptions};
