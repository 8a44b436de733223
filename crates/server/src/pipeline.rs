//! The request pipeline: prompt → generate → validate → execute.
//!
//! One output comes out per request; a failure at any stage short-circuits
//! past the remaining stages, so a denied statement can never reach the
//! executor. The generation and execution seams are traits so tests can
//! substitute counting doubles for the inference endpoint and the database.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info_span, Instrument};

use chatsql_configuration::Configuration;
use query_engine_execution::metrics::Metrics;
use query_engine_execution::rows::RowSet;
use query_engine_generation::{build_prompt, GenerationError, InferenceClient, EXAMPLES};
use query_engine_validation::{validate, ValidatedStatement, ValidationOptions};

use crate::error::ServerError;

/// Anything that can turn a prompt into raw generated text.
#[async_trait]
pub trait GenerateSql: Send + Sync {
    async fn generate_sql(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl GenerateSql for InferenceClient {
    async fn generate_sql(&self, prompt: &str) -> Result<String, GenerationError> {
        InferenceClient::generate(self, prompt).await
    }
}

/// Anything that can run an approved statement.
#[async_trait]
pub trait ExecuteSql: Send + Sync {
    async fn execute_sql(
        &self,
        statement: &ValidatedStatement,
    ) -> Result<RowSet, query_engine_execution::Error>;
}

/// Executes against the connection pool with the configured limits.
pub struct PoolExecutor {
    pool: sqlx::PgPool,
    max_rows: usize,
    statement_timeout: Duration,
}

impl PoolExecutor {
    pub fn new(pool: sqlx::PgPool, configuration: &Configuration) -> Self {
        PoolExecutor {
            pool,
            max_rows: usize::try_from(configuration.limits.max_rows).unwrap_or(usize::MAX),
            statement_timeout: Duration::from_millis(configuration.limits.statement_timeout_ms),
        }
    }
}

#[async_trait]
impl ExecuteSql for PoolExecutor {
    async fn execute_sql(
        &self,
        statement: &ValidatedStatement,
    ) -> Result<RowSet, query_engine_execution::Error> {
        query_engine_execution::execute(&self.pool, statement, self.max_rows, self.statement_timeout)
            .await
    }
}

/// What the pipeline hands back to the transport layer.
#[derive(Debug)]
pub struct PipelineOutput {
    /// The normalized statement, once one has passed validation.
    pub generated_sql: Option<String>,
    pub result: Result<RowSet, ServerError>,
}

/// Run one question through every stage.
pub async fn run(
    generator: &dyn GenerateSql,
    executor: &dyn ExecuteSql,
    configuration: &Configuration,
    metrics: &Metrics,
    question: &str,
) -> PipelineOutput {
    let prompt = build_prompt(&configuration.metadata, EXAMPLES, question);
    tracing::debug!(prompt_chars = prompt.len(), "built prompt");

    let raw_text = match generate_with_retry(generator, configuration, &prompt).await {
        Ok(raw_text) => raw_text,
        Err(error) => {
            metrics.generation_failures_total.inc();
            return PipelineOutput {
                generated_sql: None,
                result: Err(ServerError::Generation(error)),
            };
        }
    };

    let validation_options = ValidationOptions {
        schema_namespace: configuration.schema_namespace.clone(),
        max_rows: configuration.limits.max_rows,
    };
    let statement = match validate(&raw_text, &configuration.metadata, &validation_options) {
        Ok(statement) => statement,
        Err(error) => {
            metrics.validation_rejections_total.inc();
            tracing::warn!(reason = error.kind(), "generated statement denied");
            return PipelineOutput {
                generated_sql: None,
                result: Err(ServerError::Validation(error)),
            };
        }
    };
    tracing::info!(sql = %statement, "statement approved");

    match executor
        .execute_sql(&statement)
        .instrument(info_span!("Execute query"))
        .await
    {
        Ok(row_set) => {
            metrics.query_total.inc();
            PipelineOutput {
                generated_sql: Some(statement.sql().to_string()),
                result: Ok(row_set),
            }
        }
        Err(error) => {
            metrics.execution_failures_total.inc();
            PipelineOutput {
                generated_sql: Some(statement.sql().to_string()),
                result: Err(ServerError::Execution(error)),
            }
        }
    }
}

/// Generation transport failures get a bounded number of retries; validation
/// failures never re-enter this loop, by construction.
async fn generate_with_retry(
    generator: &dyn GenerateSql,
    configuration: &Configuration,
    prompt: &str,
) -> Result<String, GenerationError> {
    let mut attempt: u32 = 0;
    loop {
        match generator
            .generate_sql(prompt)
            .instrument(info_span!("Generate SQL", attempt))
            .await
        {
            Ok(raw_text) => return Ok(raw_text),
            Err(error) if error.is_retryable() && attempt < configuration.inference.max_retries => {
                attempt += 1;
                tracing::warn!(%error, attempt, "generation failed, retrying");
            }
            Err(error) => return Err(error),
        }
    }
}
