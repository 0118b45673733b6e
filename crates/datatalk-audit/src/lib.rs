//! # datatalk-audit
//!
//! Audit trail for DataTalk resolutions.
//!
//! Every resolution attempt (succeeded, rejected or failed) produces exactly
//! one [`AuditRecord`]. The [`AuditRecorder`] persists records through an
//! [`AuditStorage`] backend either inline or through a bounded queue with a
//! dedicated writer; persistence failures are logged on the
//! `datatalk::audit` target and counted, never returned to the caller.
//!
//! ## Outputs
//!
//! - **File**: JSON Lines appended to `audit.file_path`
//! - **Console**: JSON Lines on stdout
//! - **Null**: discarded (also used when `audit.enabled` is false)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use datatalk_audit::{AuditRecord, AuditRecorder};
//! use datatalk_core::AuditConfig;
//!
//! # async fn example() {
//! let recorder = AuditRecorder::from_config(&AuditConfig::default());
//!
//! let record = AuditRecord::builder("29:abc", "overdue_today")
//!     .utterance("facturas vencidas hoy", recorder.utterance_policy())
//!     .sql("SELECT ...")
//!     .duration_ms(18)
//!     .succeeded(7)
//!     .build();
//! recorder.record(record).await;
//!
//! recorder.shutdown().await;
//! # }
//! ```

pub mod error;
pub mod record;
pub mod recorder;
pub mod storage;

pub use error::AuditError;
pub use record::{AuditRecord, AuditRecordBuilder, Outcome, hash_utterance};
pub use recorder::{AuditRecorder, AuditStats};
pub use storage::{
    AuditStorage, ConsoleStorage, FileStorage, MemoryStorage, NullStorage, create_storage,
};
