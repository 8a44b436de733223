use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A configuration value that is either given in plain text or read from an
/// environment variable at startup. Secrets never round-trip through logs or
/// error responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Secret {
    Plain(String),
    FromEnvironment { variable: String },
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Secret::Plain(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}
