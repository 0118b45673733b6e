use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

// Configuration types shared across all DataTalk crates
pub mod config;
pub mod error;
pub mod wire;

pub use config::{
    AuditConfig, AuditMode, AuditStorageBackend, ConfigError, DatabaseConfig, DatatalkConfig,
    GuardrailsConfig, IntentsConfig, LocaleConfig, ServerConfig, UtterancePolicy,
};
pub use error::ErrorKind;
pub use wire::{ErrorBody, ErrorEnvelope, QueryStats, ResolveRequest, ResolveResponse, UserRef};

/// Name of a supported question shape.
///
/// Keys are trimmed and lower-cased on construction so lookups are
/// insensitive to how the caller spelled them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentKey(String);

impl IntentKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for IntentKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IntentKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IntentKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// SQL type a bound parameter travels as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Integer,
    Date,
    Text,
}

/// A typed value bound to a placeholder.
///
/// `Null` keeps its type so optional filters can be written as
/// `($n::type IS NULL OR ...)` without changing the statement shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Integer(i64),
    Date(NaiveDate),
    Text(String),
    Null(ParamType),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Integer(_) => ParamType::Integer,
            Self::Date(_) => ParamType::Date,
            Self::Text(_) => ParamType::Text,
            Self::Null(ty) => *ty,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Text(v) => write!(f, "{:?}", v),
            Self::Null(_) => f.write_str("NULL"),
        }
    }
}

/// A parameter value together with the descriptor name it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundParam {
    pub name: String,
    pub value: ParamValue,
}

/// A statement produced for one request.
///
/// `params[i]` is bound to placeholder `$(i + 1)`. Lives only for the
/// duration of a request; audit records copy the SQL text, never this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedQuery {
    pub sql: String,
    pub params: Vec<BoundParam>,
    pub source_intent: IntentKey,
    /// Row bound appended by the generator.
    pub row_cap: u32,
}

/// A single value read back from the data store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal in plain notation (e.g. NUMERIC columns).
    Decimal(String),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Textual form of a scalar, used for currency codes and similar lookups.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Decimal(s) => Some(s),
            _ => None,
        }
    }
}
