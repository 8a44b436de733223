pub mod configuration;
pub mod default_schema;
pub mod environment;
pub mod error;
pub mod values;
pub mod version1;

pub use configuration::{Configuration, InferenceConfiguration, make_runtime_configuration};
pub use values::{ApiKey, ConnectionUri, InferenceSettings, PoolSettings, QueryLimits, Secret};
pub use version1::{
    parse_configuration, write_parsed_configuration, ParsedConfiguration, CONFIGURATION_FILENAME,
};
