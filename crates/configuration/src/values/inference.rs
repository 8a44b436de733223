use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Secret;

/// The API key used to authenticate against the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ApiKey(pub Secret);

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

/// Settings for the foundation-model inference endpoint that turns questions
/// into candidate SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InferenceSettings {
    /// Full URL of the text generation endpoint.
    pub url: String,
    pub api_key: ApiKey,
    /// Identifier of the model to generate with.
    pub model_id: String,
    /// Timeout for a single generation request (seconds).
    #[serde(default = "timeout_default")]
    pub timeout_seconds: u64,
    #[serde(default = "max_new_tokens_default")]
    pub max_new_tokens: u32,
    #[serde(default = "min_new_tokens_default")]
    pub min_new_tokens: u32,
    #[serde(default = "repetition_penalty_default")]
    pub repetition_penalty: f64,
    /// How many times a failed generation call may be retried. Only
    /// transport-level failures are retried; validation failures never are.
    #[serde(default = "max_retries_default")]
    pub max_retries: u32,
}

// for serde default //
fn timeout_default() -> u64 {
    30
}
fn max_new_tokens_default() -> u32 {
    250
}
fn min_new_tokens_default() -> u32 {
    10
}
fn repetition_penalty_default() -> f64 {
    1.1
}
fn max_retries_default() -> u32 {
    1
}
