//! `datatalk intents` - list the catalog.

use anyhow::Result;
use datatalk_intents::descriptor::{ParamDefault, ParamKind};
use datatalk_runtime::Pipeline;
use std::path::Path;

pub fn run(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;
    let intents = pipeline.generator().registry().describe();

    println!("\n📋 Intents ({}):", intents.len());
    for info in &intents {
        let aliases: Vec<&str> = info.aliases.iter().map(|a| a.as_str()).collect();
        println!("\n  {}", info.key);
        if !aliases.is_empty() {
            println!("     aliases: {}", aliases.join(", "));
        }
        println!("     {}", info.description);
        if let Some(cap) = info.row_cap {
            println!("     row cap: {}", cap);
        }
        for param in &info.params {
            println!(
                "     - {} ({}){}",
                param.name,
                kind_label(&param.kind),
                if param.default == ParamDefault::Required { ", required" } else { "" }
            );
        }
    }
    println!("\n  source: {}", config.intents.view);
    Ok(())
}

fn kind_label(kind: &ParamKind) -> String {
    match kind {
        ParamKind::Integer { min, max } => format!("integer {}..={}", min, max),
        ParamKind::Date => "date".to_string(),
        ParamKind::Enum { allowed } => allowed.join("|"),
        ParamKind::Text { max_len } => format!("text <= {}", max_len),
    }
}
