//! `datatalk explain` - show the statement an intent produces.

use anyhow::Result;
use chrono::NaiveDate;
use datatalk_runtime::Pipeline;
use std::path::Path;

pub fn run(
    config_path: &Path,
    intent: &str,
    params: Vec<(String, String)>,
    today: Option<NaiveDate>,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;

    let (query, verdict) = pipeline.explain(intent, &super::params_map(params), today)?;

    println!("\n🧾 Intent: {}", query.source_intent);
    println!("\n{}\n", query.sql);
    if query.params.is_empty() {
        println!("   (no bound parameters)");
    }
    for (i, param) in query.params.iter().enumerate() {
        println!("   ${} {} = {}", i + 1, param.name, param.value);
    }
    println!("\n   row cap: {}", query.row_cap);

    match verdict.reason() {
        None => println!("\n✅ Accepted by guardrails"),
        Some(reason) => println!("\n❌ Rejected: {} ({})", reason.kind(), reason.detail()),
    }
    Ok(())
}
