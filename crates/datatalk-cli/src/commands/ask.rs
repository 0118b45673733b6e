//! `datatalk ask` - resolve one question end-to-end.

use crate::render;
use anyhow::Result;
use datatalk_adapter_pg::PgQueryExecutor;
use datatalk_audit::AuditRecorder;
use datatalk_core::ResolveRequest;
use datatalk_runtime::{Orchestrator, Pipeline, ResultFormatter};
use std::path::Path;
use std::sync::Arc;

pub async fn run(
    config_path: &Path,
    user: &str,
    intent: &str,
    utterance: &str,
    params: Vec<(String, String)>,
    max_rows: usize,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;
    let formatter = ResultFormatter::new(config.locale.clone())?;
    let executor = Arc::new(PgQueryExecutor::from_config(&config.database).await?);
    let audit = AuditRecorder::from_config(&config.audit);

    let orchestrator = Orchestrator::new(pipeline, executor.clone(), formatter, audit.clone());

    let mut request = ResolveRequest::new(user, intent, utterance);
    request.params = super::params_map(params);
    let result = orchestrator.resolve(&request).await;

    audit.shutdown().await;
    executor.close().await;

    match result {
        Ok(response) => {
            println!("\n{}", render::markdown_table(&response.columns, &response.rows, max_rows));
            println!("\n{}", response.summary);
            println!(
                "\n   {} rows in {} ms",
                response.stats.row_count, response.stats.duration_ms
            );
            Ok(())
        }
        Err(e) => anyhow::bail!("{}: {}", e.kind(), e.public_message()),
    }
}
