//! Configuration types for DataTalk.
//!
//! A single YAML file (`datatalk.yaml` by default) holds every section. All
//! fields carry serde defaults, so an empty or missing file yields a usable
//! configuration.

pub mod audit;
pub mod database;
pub mod locale;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use audit::{AuditConfig, AuditMode, AuditStorageBackend, UtterancePolicy};
pub use database::DatabaseConfig;
pub use locale::LocaleConfig;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "datatalk.yaml";

/// Complete DataTalk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatatalkConfig {
    /// Read-only data store connection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Row caps enforced by the generator and the guardrail validator.
    #[serde(default)]
    pub guardrails: GuardrailsConfig,

    /// Presentation settings.
    #[serde(default)]
    pub locale: LocaleConfig,

    /// Audit recording.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Built-in intent catalog settings.
    #[serde(default)]
    pub intents: IntentsConfig,

    /// HTTP surface.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Global row caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    /// Ceiling no statement may exceed, whatever the descriptor asks for.
    #[serde(default = "default_max_rows")]
    pub max_rows_per_query: u32,

    /// Cap applied when a descriptor declares none.
    #[serde(default = "default_row_cap")]
    pub default_row_cap: u32,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            max_rows_per_query: default_max_rows(),
            default_row_cap: default_row_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentsConfig {
    /// Qualified name of the view every built-in template reads from.
    #[serde(default = "default_view")]
    pub view: String,
}

impl Default for IntentsConfig {
    fn default() -> Self {
        Self { view: default_view() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_max_rows() -> u32 {
    200
}

fn default_row_cap() -> u32 {
    50
}

fn default_view() -> String {
    "odoo_replica.vw_invoices_semantic".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DatatalkConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document for a struct
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load and validate. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guardrails.max_rows_per_query == 0 {
            return Err(ConfigError::Config(
                "guardrails.max_rows_per_query must be at least 1".to_string(),
            ));
        }
        if self.guardrails.default_row_cap == 0 {
            return Err(ConfigError::Config(
                "guardrails.default_row_cap must be at least 1".to_string(),
            ));
        }
        if self.audit.queue_capacity == 0 {
            return Err(ConfigError::Config(
                "audit.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.intents.view.trim().is_empty() {
            return Err(ConfigError::Config("intents.view must not be empty".to_string()));
        }
        self.locale.tz()?;
        Ok(())
    }
}
