//! Error types for the server crate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use datatalk_core::{ErrorEnvelope, ErrorKind};
use datatalk_runtime::ResolveError;
use thiserror::Error;

/// Errors that stop the server itself.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// A resolution failure rendered as `{"error": {"kind", "message"}}`.
#[derive(Debug)]
pub struct ApiError(pub ResolveError);

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ExecutionTimeout | ErrorKind::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ExecutionError => StatusCode::BAD_GATEWAY,
        ErrorKind::AuditWriteFailure | ErrorKind::DuplicateIntent | ErrorKind::InvalidTemplate => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.0.to_body();
        let status = status_for(body.kind);
        (status, Json(ErrorEnvelope::from(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::UnknownIntent), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(ErrorKind::SuspiciousLiteralSubstitution),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(ErrorKind::PoolExhausted), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::ExecutionTimeout), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::ExecutionError), StatusCode::BAD_GATEWAY);
    }
}
