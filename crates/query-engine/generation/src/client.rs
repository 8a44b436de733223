//! Client for the foundation-model inference endpoint.
//!
//! The endpoint is an untrusted oracle: this client sends a prompt, returns
//! whatever text came back, and does not attempt to interpret it. Extraction
//! and safety checks live in the validation crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Connection settings for the inference endpoint, with secrets resolved.
#[derive(Debug, Clone)]
pub struct InferenceEndpoint {
    pub url: String,
    pub api_key: String,
    pub model_id: String,
    pub timeout: Duration,
    pub max_new_tokens: u32,
    pub min_new_tokens: u32,
    pub repetition_penalty: f64,
}

/// A client for a text-generation endpoint.
pub struct InferenceClient {
    http: reqwest::Client,
    endpoint: InferenceEndpoint,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model_id: &'a str,
    input: &'a str,
    parameters: GenerationParameters<'a>,
}

#[derive(Debug, Serialize)]
struct GenerationParameters<'a> {
    decoding_method: &'a str,
    max_new_tokens: u32,
    min_new_tokens: u32,
    repetition_penalty: f64,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    #[serde(default)]
    generated_text: String,
}

impl InferenceClient {
    pub fn new(endpoint: InferenceEndpoint) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()?;
        Ok(InferenceClient { http, endpoint })
    }

    /// Send a prompt to the endpoint and return the raw generated text,
    /// including any surrounding prose or code fences the model produced.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerationRequest {
            model_id: &self.endpoint.model_id,
            input: prompt,
            parameters: GenerationParameters {
                decoding_method: "greedy",
                max_new_tokens: self.endpoint.max_new_tokens,
                min_new_tokens: self.endpoint.min_new_tokens,
                repetition_penalty: self.endpoint.repetition_penalty,
            },
        };

        let response = self
            .http
            .post(&self.endpoint.url)
            .bearer_auth(&self.endpoint.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Unreachable(error)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GenerationError::Unauthorized(status));
        }
        if !status.is_success() {
            return Err(GenerationError::Status(status));
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|error| GenerationError::MalformedResponse(error.to_string()))?;

        let generated = body
            .results
            .into_iter()
            .map(|result| result.generated_text)
            .find(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        tracing::debug!(generated_chars = generated.len(), "received generated text");

        Ok(generated)
    }
}
