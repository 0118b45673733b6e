//! Audit storage backends.

use crate::error::AuditError;
use crate::record::AuditRecord;
use async_trait::async_trait;
use datatalk_core::{AuditConfig, AuditStorageBackend};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Persist one record. Records are never updated once stored.
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Create a storage backend based on configuration.
pub fn create_storage(config: &AuditConfig) -> Arc<dyn AuditStorage> {
    if !config.enabled {
        return Arc::new(NullStorage);
    }
    match config.storage {
        AuditStorageBackend::Console => Arc::new(ConsoleStorage),
        AuditStorageBackend::File => Arc::new(FileStorage::new(&config.file_path)),
        AuditStorageBackend::Null => Arc::new(NullStorage),
    }
}

/// Console storage (JSON lines on stdout).
pub struct ConsoleStorage;

#[async_trait]
impl AuditStorage for ConsoleStorage {
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string(record)?;
        println!("{}", json);
        Ok(())
    }
}

/// File storage (appends JSON lines to a log file).
pub struct FileStorage {
    path: PathBuf,
    // serializes appends from concurrent sync-mode writers
    lock: tokio::sync::Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// In-memory storage, for tests and diagnostics.
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, in storage order.
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .map_err(|e| AuditError::Storage(format!("failed to acquire lock: {}", e)))?
            .push(record.clone());
        Ok(())
    }
}

/// Discards every record.
pub struct NullStorage;

#[async_trait]
impl AuditStorage for NullStorage {
    async fn store(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}
