//! Route definitions.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/n2sql/run", post(handlers::run))
        .route("/v1/intents", get(handlers::intents))
        .route("/health", get(handlers::health))
        .route("/diag/audit", get(handlers::audit_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
