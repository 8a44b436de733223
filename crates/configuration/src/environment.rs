//! Infrastructure for looking up environment variables when elaborating
//! secrets into a runtime configuration.

use std::collections::HashMap;

/// Reading an environment variable can fail.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("the environment variable {0:?} is not set")]
    NonExistingVariable(String),
    #[error("the environment variable {0:?} does not contain valid unicode")]
    NonUnicodeValue(String),
}

/// A source of environment variables.
pub trait Environment {
    fn read(&self, variable: &str) -> Result<String, Error>;
}

impl<T: Environment> Environment for &T {
    fn read(&self, variable: &str) -> Result<String, Error> {
        (*self).read(variable)
    }
}

/// The environment variables of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        std::env::var(variable).map_err(|error| match error {
            std::env::VarError::NotPresent => Error::NonExistingVariable(variable.to_string()),
            std::env::VarError::NotUnicode(_) => Error::NonUnicodeValue(variable.to_string()),
        })
    }
}

/// A fixed set of environment variables, for tests.
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment(pub HashMap<String, String>);

impl Environment for FixedEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        self.0
            .get(variable)
            .cloned()
            .ok_or_else(|| Error::NonExistingVariable(variable.to_string()))
    }
}

/// An environment with no variables at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyEnvironment;

impl Environment for EmptyEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        Err(Error::NonExistingVariable(variable.to_string()))
    }
}
