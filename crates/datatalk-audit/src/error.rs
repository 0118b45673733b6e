//! Error types for the audit crate.

use datatalk_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur while persisting audit records.
///
/// None of these ever reach the caller of a resolution; the recorder logs
/// them on the `datatalk::audit` target and counts them.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuditError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::AuditWriteFailure
    }
}
