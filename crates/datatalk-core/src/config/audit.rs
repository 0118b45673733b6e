//! Audit recording configuration.

use serde::{Deserialize, Serialize};

/// Configuration for audit recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit records are persisted at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How records reach storage.
    #[serde(default)]
    pub mode: AuditMode,

    /// Capacity of the bounded queue in `queued` mode.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Storage backend.
    #[serde(default)]
    pub storage: AuditStorageBackend,

    /// File path (for the file backend).
    #[serde(default = "default_file_path")]
    pub file_path: String,

    /// Whether utterances are stored verbatim or hashed.
    #[serde(default)]
    pub utterance: UtterancePolicy,
}

/// Dispatch strategy for audit records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// Bounded queue drained by a dedicated writer task; newest records are
    /// dropped (and counted) when the queue is full.
    #[default]
    Queued,
    /// Written inline before the response is returned; failures are logged.
    Sync,
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditStorageBackend {
    /// JSON lines on stdout.
    Console,
    /// JSON lines appended to `file_path`.
    #[default]
    File,
    /// Discard everything.
    Null,
}

/// How the utterance appears in audit records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UtterancePolicy {
    /// SHA-256 hex digest of the utterance.
    #[default]
    Hashed,
    /// The utterance text as received.
    Plain,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            mode: AuditMode::default(),
            queue_capacity: default_queue_capacity(),
            storage: AuditStorageBackend::default(),
            file_path: default_file_path(),
            utterance: UtterancePolicy::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_file_path() -> String {
    "audit.log".to_string()
}
