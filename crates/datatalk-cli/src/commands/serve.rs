//! `datatalk serve` - run the HTTP server.

use anyhow::{Context, Result};
use datatalk_adapter_pg::PgQueryExecutor;
use datatalk_audit::AuditRecorder;
use datatalk_runtime::{Orchestrator, Pipeline, ResultFormatter};
use datatalk_server::{AppState, DatatalkServer};
use std::path::Path;
use std::sync::Arc;

pub async fn run(config_path: &Path, bind: Option<String>) -> Result<()> {
    let config = super::load_config(config_path)?;

    let pipeline = Pipeline::from_config(&config)?;
    tracing::info!(
        intents = pipeline.generator().registry().len(),
        view = %config.intents.view,
        ceiling = config.guardrails.max_rows_per_query,
        "intent catalog loaded"
    );
    let formatter = ResultFormatter::new(config.locale.clone())?;
    let executor = Arc::new(
        PgQueryExecutor::from_config(&config.database)
            .await
            .context("Failed to connect to the database")?,
    );
    let audit = AuditRecorder::from_config(&config.audit);

    let orchestrator = Orchestrator::new(pipeline, executor.clone(), formatter, audit.clone());
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let server = DatatalkServer::new(bind, AppState::new(Arc::new(orchestrator)));

    server.run(shutdown_signal()).await?;

    audit.shutdown().await;
    executor.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("shutdown requested");
}
