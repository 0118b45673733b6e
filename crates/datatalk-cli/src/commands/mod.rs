//! Subcommand implementations.

pub mod ask;
pub mod classify;
pub mod explain;
pub mod intents;
pub mod serve;

use anyhow::{Context, Result};
use datatalk_core::DatatalkConfig;
use serde_json::{Map, Value};
use std::path::Path;

pub fn load_config(path: &Path) -> Result<DatatalkConfig> {
    DatatalkConfig::load(path).with_context(|| format!("Failed to load configuration from {:?}", path))
}

/// Parse a `name=value` pair.
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

/// Values stay strings; the generator coerces them per parameter type.
pub fn params_map(params: Vec<(String, String)>) -> Map<String, Value> {
    params
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect()
}
