//! Runtime configuration for the service.

use query_engine_metadata::metadata;

use crate::environment::Environment;
use crate::error::MakeRuntimeConfigurationError;
use crate::values::{PoolSettings, QueryLimits, Secret};
use crate::version1::ParsedConfiguration;

/// The 'Configuration' type collects all the information necessary to serve
/// queries at runtime: secrets resolved, immutable for the lifetime of the
/// process, and shared by reference into the pipeline.
///
/// 'ParsedConfiguration' deals with the serialized format; values of this
/// type are produced from it with 'make_runtime_configuration'.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub metadata: metadata::Metadata,
    pub pool_settings: PoolSettings,
    pub connection_uri: String,
    pub inference: InferenceConfiguration,
    pub schema_namespace: Option<String>,
    pub limits: QueryLimits,
}

/// Inference endpoint settings with the API key resolved.
#[derive(Debug, Clone)]
pub struct InferenceConfiguration {
    pub url: String,
    pub api_key: String,
    pub model_id: String,
    pub timeout_seconds: u64,
    pub max_new_tokens: u32,
    pub min_new_tokens: u32,
    pub repetition_penalty: f64,
    pub max_retries: u32,
}

/// Turn a parsed configuration into a runtime configuration by resolving
/// every secret against the given environment.
pub fn make_runtime_configuration(
    parsed: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let connection_uri = resolve_secret(
        &parsed.connection_uri.0,
        &environment,
        "connectionUri",
    )?;
    let api_key = resolve_secret(&parsed.inference.api_key.0, &environment, "inference.apiKey")?;

    Ok(Configuration {
        metadata: parsed.metadata,
        pool_settings: parsed.pool_settings,
        connection_uri,
        inference: InferenceConfiguration {
            url: parsed.inference.url,
            api_key,
            model_id: parsed.inference.model_id,
            timeout_seconds: parsed.inference.timeout_seconds,
            max_new_tokens: parsed.inference.max_new_tokens,
            min_new_tokens: parsed.inference.min_new_tokens,
            repetition_penalty: parsed.inference.repetition_penalty,
            max_retries: parsed.inference.max_retries,
        },
        schema_namespace: parsed.schema_namespace,
        limits: parsed.limits,
    })
}

fn resolve_secret(
    secret: &Secret,
    environment: &impl Environment,
    item: &'static str,
) -> Result<String, MakeRuntimeConfigurationError> {
    match secret {
        Secret::Plain(value) => Ok(value.clone()),
        Secret::FromEnvironment { variable } => environment.read(variable).map_err(|error| {
            MakeRuntimeConfigurationError::MissingEnvironmentVariable { item, error }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{EmptyEnvironment, FixedEnvironment};
    use crate::values::{ApiKey, ConnectionUri};

    fn parsed_with_plain_secrets() -> ParsedConfiguration {
        let mut parsed = ParsedConfiguration::initial();
        parsed.connection_uri = ConnectionUri(Secret::Plain("postgresql://localhost".into()));
        parsed.inference.api_key = ApiKey(Secret::Plain("key".into()));
        parsed
    }

    #[test]
    fn test_plain_secrets_resolve_without_environment() {
        let configuration =
            make_runtime_configuration(parsed_with_plain_secrets(), EmptyEnvironment).unwrap();
        assert_eq!(configuration.connection_uri, "postgresql://localhost");
        assert_eq!(configuration.inference.api_key, "key");
    }

    #[test]
    fn test_environment_secrets_resolve_through_environment() {
        let environment = FixedEnvironment(
            [
                ("CHATSQL_DATABASE_URL".to_string(), "postgresql://db".to_string()),
                ("CHATSQL_INFERENCE_API_KEY".to_string(), "secret".to_string()),
            ]
            .into_iter()
            .collect(),
        );

        let configuration =
            make_runtime_configuration(ParsedConfiguration::initial(), environment).unwrap();
        assert_eq!(configuration.connection_uri, "postgresql://db");
        assert_eq!(configuration.inference.api_key, "secret");
    }

    #[test]
    fn test_missing_environment_variable_is_reported_with_its_item() {
        let result = make_runtime_configuration(ParsedConfiguration::initial(), EmptyEnvironment);
        match result {
            Err(MakeRuntimeConfigurationError::MissingEnvironmentVariable { item, .. }) => {
                assert_eq!(item, "connectionUri");
            }
            other => panic!("expected a missing variable error, got {other:?}"),
        }
    }
}
