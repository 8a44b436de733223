use axum::extract::State;
use axum::http::StatusCode;
use prometheus::Encoder;

use crate::state::ServerState;

/// Prometheus text exposition of the service registry.
pub async fn get_metrics(State(state): State<ServerState>) -> Result<String, StatusCode> {
    query_engine_execution::metrics::update_pool_metrics(&state.pool, &state.metrics);

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
