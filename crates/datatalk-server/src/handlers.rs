//! Request handlers.

use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use datatalk_audit::AuditStats;
use datatalk_core::{ResolveRequest, ResolveResponse};
use datatalk_runtime::Pipeline;
use serde_json::{Value, json};

/// `POST /n2sql/run`
pub async fn run(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let response = state.orchestrator().resolve(&request).await?;
    Ok(Json(response))
}

/// `GET /v1/intents`
pub async fn intents(State(state): State<AppState>) -> Json<Value> {
    let pipeline: &Pipeline = state.orchestrator().pipeline();
    Json(json!({ "intents": pipeline.generator().registry().describe() }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// `GET /diag/audit`
pub async fn audit_stats(State(state): State<AppState>) -> Json<AuditStats> {
    Json(state.audit().stats())
}
