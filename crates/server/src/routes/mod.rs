mod get_health;
mod get_metrics;
mod post_query;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::ServerState;

pub use get_health::get_health;
pub use get_metrics::get_metrics;
pub use post_query::{post_query, QueryRequest, QueryResponse};

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .route("/query", post(post_query))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
