//! Error types for the intents crate.

use datatalk_core::ErrorKind;
use thiserror::Error;

/// Errors raised while building or querying the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A key or alias is already taken.
    #[error("intent '{0}' is already registered")]
    DuplicateIntent(String),

    /// No intent or alias with this key.
    #[error("intent '{0}' is not supported")]
    UnknownIntent(String),

    /// The template function or parameter list is inconsistent.
    #[error("invalid template for intent '{intent}': {reason}")]
    InvalidTemplate { intent: String, reason: String },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateIntent(_) => ErrorKind::DuplicateIntent,
            Self::UnknownIntent(_) => ErrorKind::UnknownIntent,
            Self::InvalidTemplate { .. } => ErrorKind::InvalidTemplate,
        }
    }
}

/// Errors raised while turning a request into a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("intent '{0}' is not supported")]
    UnknownIntent(String),

    #[error("missing required parameter '{name}'")]
    MissingParameter { name: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl GenerateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownIntent(_) => ErrorKind::UnknownIntent,
            Self::MissingParameter { .. } => ErrorKind::MissingParameter,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
