//! Turning a natural-language question into candidate SQL: prompt
//! construction and the inference-endpoint client.

pub mod client;
pub mod error;
pub mod examples;
pub mod prompt;

pub use client::{InferenceClient, InferenceEndpoint};
pub use error::GenerationError;
pub use examples::{Example, EXAMPLES};
pub use prompt::build_prompt;
