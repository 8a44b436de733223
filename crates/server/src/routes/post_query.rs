use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use query_engine_execution::rows::Value;

use crate::error::{ErrorBody, ServerError};
use crate::pipeline::{self, PoolExecutor};
use crate::state::ServerState;

/// Request body for a natural language query.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub user_query: String,
}

/// Response envelope with query results. The only shape that crosses the
/// system boundary; identical for successes and failures apart from the
/// `success`, `results` and `error` fields.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub natural_query: String,
    pub generated_sql: Option<String>,
    pub results: Vec<IndexMap<String, Value>>,
    pub timestamp: String,
    pub error: Option<ErrorBody>,
}

pub async fn post_query(
    State(state): State<ServerState>,
    Json(request): Json<QueryRequest>,
) -> (StatusCode, Json<QueryResponse>) {
    let question = request.user_query.trim().to_string();

    if question.is_empty() {
        let error = ServerError::InvalidRequest;
        let status = error.status();
        return (
            status,
            Json(envelope(question, None, vec![], Some(error.into_body()))),
        );
    }

    let executor = PoolExecutor::new(state.pool.clone(), &state.configuration);
    let output = pipeline::run(
        state.inference.as_ref(),
        &executor,
        &state.configuration,
        &state.metrics,
        &question,
    )
    .await;

    query_engine_execution::metrics::update_pool_metrics(&state.pool, &state.metrics);

    match output.result {
        Ok(row_set) => (
            StatusCode::OK,
            Json(envelope(question, output.generated_sql, row_set.rows, None)),
        ),
        Err(error) => {
            tracing::error!(kind = error.kind(), %error, "query request failed");
            let status = error.status();
            (
                status,
                Json(envelope(
                    question,
                    output.generated_sql,
                    vec![],
                    Some(error.into_body()),
                )),
            )
        }
    }
}

fn envelope(
    natural_query: String,
    generated_sql: Option<String>,
    results: Vec<IndexMap<String, Value>>,
    error: Option<ErrorBody>,
) -> QueryResponse {
    QueryResponse {
        success: error.is_none(),
        natural_query,
        generated_sql,
        results,
        timestamp: Utc::now().to_rfc3339(),
        error,
    }
}
