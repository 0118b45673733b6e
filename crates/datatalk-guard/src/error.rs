//! Error types for the guardrail crate.

use datatalk_core::ErrorKind;
use thiserror::Error;

/// Low-level analysis failures.
#[derive(Debug, Clone, Error)]
pub enum GuardError {
    #[error("failed to parse SQL: {0}")]
    Parse(String),

    #[error("failed to tokenize SQL: {0}")]
    Tokenize(String),
}

/// Why a statement was rejected. Exactly one per rejected verdict.
///
/// The detail strings may name relations or literals; they are meant for
/// logs and audit, never for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("write clause detected: {0}")]
    WriteClauseDetected(String),

    #[error("unauthorized source: {0}")]
    UnauthorizedSource(String),

    #[error("missing or excessive limit: {0}")]
    MissingOrExcessiveLimit(String),

    #[error("multiple statements: {0}")]
    MultipleStatements(String),

    #[error("suspicious literal substitution: {0}")]
    SuspiciousLiteralSubstitution(String),
}

impl RejectionReason {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WriteClauseDetected(_) => ErrorKind::WriteClauseDetected,
            Self::UnauthorizedSource(_) => ErrorKind::UnauthorizedSource,
            Self::MissingOrExcessiveLimit(_) => ErrorKind::MissingOrExcessiveLimit,
            Self::MultipleStatements(_) => ErrorKind::MultipleStatements,
            Self::SuspiciousLiteralSubstitution(_) => ErrorKind::SuspiciousLiteralSubstitution,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::WriteClauseDetected(d)
            | Self::UnauthorizedSource(d)
            | Self::MissingOrExcessiveLimit(d)
            | Self::MultipleStatements(d)
            | Self::SuspiciousLiteralSubstitution(d) => d,
        }
    }
}
