//! Router behaviour against an in-memory executor.

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use datatalk_audit::{AuditRecorder, MemoryStorage};
use datatalk_core::{CellValue, DatatalkConfig, LocaleConfig, QueryStats};
use datatalk_guard::ApprovedQuery;
use datatalk_runtime::{
    ExecutionError, ExecutionResult, Orchestrator, Pipeline, QueryExecutor, ResultFormatter,
};
use datatalk_server::{AppState, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct FixedExecutor(Result<usize, ExecutionError>);

#[async_trait]
impl QueryExecutor for FixedExecutor {
    async fn execute(&self, _query: &ApprovedQuery) -> Result<ExecutionResult, ExecutionError> {
        let n = self.0.clone()?;
        Ok(ExecutionResult {
            columns: ["customer", "currency", "invoices", "overdue_balance", "overdue_balance_num"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows: (0..n)
                .map(|i| {
                    vec![
                        CellValue::Text(format!("C{}", i)),
                        CellValue::Text("USD".into()),
                        CellValue::Int(3),
                        CellValue::Decimal("120.00".into()),
                        CellValue::Decimal("120.00".into()),
                    ]
                })
                .collect(),
            stats: QueryStats {
                duration_ms: 1,
                row_count: n as u64,
            },
        })
    }
}

fn app(executor: FixedExecutor) -> (axum::Router, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let orchestrator = Orchestrator::new(
        Pipeline::from_config(&DatatalkConfig::default()).unwrap(),
        Arc::new(executor),
        ResultFormatter::new(LocaleConfig::default()).unwrap(),
        AuditRecorder::sync(storage.clone()),
    );
    (create_router(AppState::new(Arc::new(orchestrator))), storage)
}

fn post_run(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/n2sql/run")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = app(FixedExecutor(Ok(0)));
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn run_returns_rows_and_sql() {
    let (app, storage) = app(FixedExecutor(Ok(2)));
    let response = app
        .oneshot(post_run(json!({
            "user": "u1",
            "intent": "top_clients_overdue",
            "utterance": "clientes con más deuda vencida"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["stats"]["rowCount"], json!(2));
    assert_eq!(body["rows"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        body["columns"],
        json!(["customer", "currency", "invoices", "overdue_balance"])
    );
    assert!(body["sql"].as_str().unwrap().contains("LIMIT"));
    assert_eq!(storage.records().len(), 1);
}

#[tokio::test]
async fn unknown_intent_is_unprocessable() {
    let (app, storage) = app(FixedExecutor(Ok(1)));
    let response = app
        .oneshot(post_run(json!({ "user": "u1", "intent": "foo", "utterance": "bar" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], json!("UnknownIntent"));
    assert!(body["error"]["message"].is_string());
    assert_eq!(storage.records().len(), 1);
}

#[tokio::test]
async fn timeout_is_service_unavailable() {
    let (app, _) = app(FixedExecutor(Err(ExecutionError::Timeout { timeout_ms: 10 })));
    let response = app
        .oneshot(post_run(json!({ "user": "u1", "intent": "overdue_today", "utterance": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"]["kind"], json!("ExecutionTimeout"));
}

#[tokio::test]
async fn database_error_is_bad_gateway_without_details() {
    let (app, _) = app(FixedExecutor(Err(ExecutionError::Database {
        cause: "permission denied for table account_move".into(),
    })));
    let response = app
        .oneshot(post_run(json!({ "user": "u1", "intent": "overdue_today", "utterance": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await.to_string();
    assert!(!body.contains("account_move"));
}

#[tokio::test]
async fn intents_lists_the_catalog() {
    let (app, _) = app(FixedExecutor(Ok(0)));
    let response = app.oneshot(get("/v1/intents")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let keys: Vec<&str> = body["intents"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i["key"].as_str())
        .collect();
    assert!(keys.contains(&"overdue_today"));
    assert!(keys.contains(&"customer_invoices"));
}

#[tokio::test]
async fn audit_stats_count_requests() {
    let (app, _) = app(FixedExecutor(Ok(1)));
    app.clone()
        .oneshot(post_run(json!({ "user": "u1", "intent": "overdue_today", "utterance": "" })))
        .await
        .unwrap();

    let response = app.oneshot(get("/diag/audit")).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["submitted"], json!(1));
    assert_eq!(body["written"], json!(1));
}
