//! Transient state used by the server.
//!
//! This is initialized on startup.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info_span, Instrument};

use chatsql_configuration::Configuration;
use query_engine_execution::metrics::{self, Metrics};
use query_engine_generation::{InferenceClient, InferenceEndpoint};

/// State for the server.
#[derive(Clone)]
pub struct ServerState {
    pub configuration: Arc<Configuration>,
    pub pool: PgPool,
    pub inference: Arc<InferenceClient>,
    pub metrics: Metrics,
    pub registry: Arc<prometheus::Registry>,
}

/// Create the connection pool, the inference client and the metrics
/// registry, and wrap them in the server state.
pub async fn create_state(
    configuration: Arc<Configuration>,
) -> Result<ServerState, InitializationError> {
    let mut registry = prometheus::Registry::new();
    let metrics =
        metrics::initialise_metrics(&mut registry).map_err(InitializationError::MetricsError)?;

    let pool_settings = &configuration.pool_settings;
    let pool = PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .acquire_timeout(Duration::from_secs(pool_settings.pool_timeout))
        .idle_timeout(pool_settings.idle_timeout.map(Duration::from_secs))
        .max_lifetime(pool_settings.connection_lifetime.map(Duration::from_secs))
        .connect(&configuration.connection_uri)
        .instrument(info_span!("Create connection pool"))
        .await
        .map_err(InitializationError::UnableToCreatePool)?;

    let inference = InferenceClient::new(InferenceEndpoint {
        url: configuration.inference.url.clone(),
        api_key: configuration.inference.api_key.clone(),
        model_id: configuration.inference.model_id.clone(),
        timeout: Duration::from_secs(configuration.inference.timeout_seconds),
        max_new_tokens: configuration.inference.max_new_tokens,
        min_new_tokens: configuration.inference.min_new_tokens,
        repetition_penalty: configuration.inference.repetition_penalty,
    })
    .map_err(InitializationError::UnableToCreateInferenceClient)?;

    metrics::update_pool_metrics(&pool, &metrics);

    Ok(ServerState {
        configuration,
        pool,
        inference: Arc::new(inference),
        metrics,
        registry: Arc::new(registry),
    })
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("unable to initialize connection pool: {0}")]
    UnableToCreatePool(sqlx::Error),
    #[error("unable to initialize the inference client: {0}")]
    UnableToCreateInferenceClient(reqwest::Error),
    #[error("error initializing metrics: {0}")]
    MetricsError(prometheus::Error),
}
