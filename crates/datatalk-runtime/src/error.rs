//! Errors surfaced by a resolution.

use crate::adapter::ExecutionError;
use datatalk_core::{ConfigError, ErrorBody, ErrorKind};
use datatalk_guard::RejectionReason;
use datatalk_intents::{GenerateError, RegistryError};
use thiserror::Error;

/// Why a resolution did not produce rows.
///
/// The `Display` form may name relations or carry database text; callers
/// must only ever see [`ResolveError::public_message`].
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Generation(#[from] GenerateError),

    #[error("rejected by guardrails: {0}")]
    Rejected(#[from] RejectionReason),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Generation(e) => e.kind(),
            Self::Rejected(r) => r.kind(),
            Self::Execution(e) => e.kind(),
        }
    }

    /// Message safe to return to the caller: no SQL, no schema names, no
    /// database error text.
    pub fn public_message(&self) -> String {
        match self {
            Self::Generation(GenerateError::UnknownIntent(key)) if key.is_empty() => {
                "the question could not be matched to a supported intent".to_string()
            }
            Self::Generation(e) => e.to_string(),
            Self::Rejected(r) => format!(
                "the generated statement was rejected by the guardrails ({})",
                r.kind()
            ),
            Self::Execution(ExecutionError::Timeout { .. }) => {
                "the query took too long; try a narrower question".to_string()
            }
            Self::Execution(ExecutionError::PoolExhausted { .. }) => {
                "the service is busy; try again shortly".to_string()
            }
            Self::Execution(ExecutionError::Database { .. }) => {
                "the query could not be executed".to_string()
            }
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.public_message(),
        }
    }
}

/// Failures while wiring the engine at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("intent catalog error: {0}")]
    Registry(#[from] RegistryError),
}
