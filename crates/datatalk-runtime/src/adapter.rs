use async_trait::async_trait;
use datatalk_core::{CellValue, ErrorKind, QueryStats};
use datatalk_guard::ApprovedQuery;
use thiserror::Error;

/// Rows read back for one approved statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub stats: QueryStats,
}

impl ExecutionResult {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Data-store failures. `Database` carries the raw cause for logs only.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("statement exceeded the {timeout_ms} ms timeout")]
    Timeout { timeout_ms: u64 },

    #[error("no connection available within {waited_ms} ms")]
    PoolExhausted { waited_ms: u64 },

    #[error("database error: {cause}")]
    Database { cause: String },
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::ExecutionTimeout,
            Self::PoolExhausted { .. } => ErrorKind::PoolExhausted,
            Self::Database { .. } => ErrorKind::ExecutionError,
        }
    }
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run an approved statement read-only, bounded by the executor's
    /// statement timeout. Never retries.
    async fn execute(&self, query: &ApprovedQuery) -> Result<ExecutionResult, ExecutionError>;
}
