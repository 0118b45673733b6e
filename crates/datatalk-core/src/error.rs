//! Error taxonomy shared by every stage of a resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error classification.
///
/// Serializes as the variant name (e.g. `"UnknownIntent"`), which is the
/// `kind` field callers receive in error bodies and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    // ===== Generation =====
    UnknownIntent,
    MissingParameter,
    InvalidParameter,

    // ===== Guardrails =====
    WriteClauseDetected,
    UnauthorizedSource,
    MissingOrExcessiveLimit,
    MultipleStatements,
    SuspiciousLiteralSubstitution,

    // ===== Execution =====
    ExecutionTimeout,
    ExecutionError,
    PoolExhausted,

    // ===== Audit (never surfaced to callers) =====
    AuditWriteFailure,

    // ===== Startup =====
    DuplicateIntent,
    InvalidTemplate,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownIntent => "UnknownIntent",
            Self::MissingParameter => "MissingParameter",
            Self::InvalidParameter => "InvalidParameter",
            Self::WriteClauseDetected => "WriteClauseDetected",
            Self::UnauthorizedSource => "UnauthorizedSource",
            Self::MissingOrExcessiveLimit => "MissingOrExcessiveLimit",
            Self::MultipleStatements => "MultipleStatements",
            Self::SuspiciousLiteralSubstitution => "SuspiciousLiteralSubstitution",
            Self::ExecutionTimeout => "ExecutionTimeout",
            Self::ExecutionError => "ExecutionError",
            Self::PoolExhausted => "PoolExhausted",
            Self::AuditWriteFailure => "AuditWriteFailure",
            Self::DuplicateIntent => "DuplicateIntent",
            Self::InvalidTemplate => "InvalidTemplate",
        }
    }

    /// Whether the failure happened before any SQL reached the data store.
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            Self::UnknownIntent
                | Self::MissingParameter
                | Self::InvalidParameter
                | Self::WriteClauseDetected
                | Self::UnauthorizedSource
                | Self::MissingOrExcessiveLimit
                | Self::MultipleStatements
                | Self::SuspiciousLiteralSubstitution
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
