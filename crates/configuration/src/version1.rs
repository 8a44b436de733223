//! The on-disk configuration format, version 1.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

use query_engine_metadata::metadata;

use crate::default_schema;
use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::values::{ConnectionUri, InferenceSettings, PoolSettings, QueryLimits, Secret};

const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";

pub const DEFAULT_CONNECTION_URI_VARIABLE: &str = "CHATSQL_DATABASE_URL";
pub const DEFAULT_API_KEY_VARIABLE: &str = "CHATSQL_INFERENCE_API_KEY";

/// Initial configuration, just enough to connect to a database and an
/// inference endpoint, plus the hand-maintained schema descriptor.
///
/// 'ParsedConfiguration' mirrors the configuration file on disk; secrets are
/// still unresolved. 'make_runtime_configuration' elaborates it into the
/// runtime 'Configuration'.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    // Which version of the configuration format are we using
    pub version: u32,
    // Connection string for a Postgres-compatible database
    pub connection_uri: ConnectionUri,
    pub inference: InferenceSettings,
    /// Schema namespace bare table names are qualified with during
    /// normalization, if set.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_namespace: Option<String>,
    #[serde(default)]
    pub limits: QueryLimits,
    #[serde(default)]
    #[serde(skip_serializing_if = "PoolSettings::is_default")]
    pub pool_settings: PoolSettings,
    #[serde(default)]
    pub metadata: metadata::Metadata,
}

impl ParsedConfiguration {
    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            connection_uri: ConnectionUri(Secret::FromEnvironment {
                variable: DEFAULT_CONNECTION_URI_VARIABLE.into(),
            }),
            inference: InferenceSettings {
                url: String::new(),
                api_key: crate::values::ApiKey(Secret::FromEnvironment {
                    variable: DEFAULT_API_KEY_VARIABLE.into(),
                }),
                model_id: String::new(),
                timeout_seconds: 30,
                max_new_tokens: 250,
                min_new_tokens: 10,
                repetition_penalty: 1.1,
                max_retries: 1,
            },
            schema_namespace: None,
            limits: QueryLimits::default(),
            pool_settings: PoolSettings::default(),
            metadata: metadata::Metadata::empty(),
        }
    }

    /// The initial configuration: connection settings from the environment
    /// and the skills-profile schema descriptor.
    pub fn initial() -> Self {
        Self {
            metadata: default_schema::skills_profile_metadata(),
            ..Self::empty()
        }
    }
}

/// Parse the configuration format from a directory.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents =
        fs::read_to_string(&configuration_file)
            .await
            .map_err(|err| ParseConfigurationError::IoError {
                file_path: configuration_file.clone(),
                message: err.to_string(),
            })?;

    let parsed_config: ParsedConfiguration = serde_json::from_str(&configuration_file_contents)
        .map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;

    if parsed_config.version != CURRENT_VERSION {
        return Err(ParseConfigurationError::UnsupportedVersion(
            parsed_config.version,
        ));
    }

    Ok(parsed_config)
}

/// Write the parsed configuration into a directory on disk, alongside its
/// JSON schema.
pub async fn write_parsed_configuration(
    parsed_config: &ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().to_owned().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    // create the configuration file
    fs::write(
        configuration_file,
        serde_json::to_string_pretty(&parsed_config)? + "\n",
    )
    .await?;

    // create the jsonschema file
    let configuration_jsonschema_file_path = out_dir
        .as_ref()
        .to_owned()
        .join(CONFIGURATION_JSONSCHEMA_FILENAME);

    let output = schemars::schema_for!(ParsedConfiguration);
    fs::write(
        &configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&output)? + "\n",
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_configuration_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let initial = ParsedConfiguration::initial();

        write_parsed_configuration(&initial, dir.path())
            .await
            .unwrap();
        let parsed = parse_configuration(dir.path()).await.unwrap();

        assert_eq!(initial, parsed);
    }

    #[tokio::test]
    async fn test_missing_configuration_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = parse_configuration(dir.path()).await;

        assert!(matches!(
            result,
            Err(ParseConfigurationError::IoError { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut initial = ParsedConfiguration::initial();
        initial.version = 2;

        write_parsed_configuration(&initial, dir.path())
            .await
            .unwrap();
        let result = parse_configuration(dir.path()).await;

        assert!(matches!(
            result,
            Err(ParseConfigurationError::UnsupportedVersion(2))
        ));
    }
}
