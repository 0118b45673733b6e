//! Audit recorder.
//!
//! Two dispatch modes:
//!
//! - **queued**: records go into a bounded channel drained by one writer
//!   task. When the channel is full the incoming (newest) record is dropped
//!   and counted. The single writer keeps records in submission order.
//! - **sync**: records are written before `record` returns.
//!
//! In both modes a storage failure is logged on the `datatalk::audit`
//! target and counted; it never propagates to the caller.

use crate::record::AuditRecord;
use crate::storage::{AuditStorage, create_storage};
use datatalk_core::{AuditConfig, AuditMode, ErrorKind, UtterancePolicy};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Audit counters, exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub submitted: u64,
    pub written: u64,
    pub dropped: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> AuditStats {
        AuditStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

enum Dispatch {
    Queued {
        sender: Mutex<Option<mpsc::Sender<AuditRecord>>>,
        writer: Mutex<Option<JoinHandle<()>>>,
    },
    Sync {
        storage: Arc<dyn AuditStorage>,
    },
}

struct Inner {
    dispatch: Dispatch,
    counters: Arc<Counters>,
    utterance: UtterancePolicy,
}

/// Cloneable handle that records one audit entry per resolution.
#[derive(Clone)]
pub struct AuditRecorder {
    inner: Arc<Inner>,
}

impl AuditRecorder {
    /// Build a recorder from configuration.
    ///
    /// Queued mode spawns the writer task, so this must run inside a tokio
    /// runtime.
    pub fn from_config(config: &AuditConfig) -> Self {
        let storage = create_storage(config);
        let recorder = match config.mode {
            AuditMode::Queued => Self::queued(storage, config.queue_capacity),
            AuditMode::Sync => Self::sync(storage),
        };
        tracing::info!(
            enabled = config.enabled,
            mode = ?config.mode,
            storage = ?config.storage,
            "audit recorder ready"
        );
        recorder.with_utterance_policy(config.utterance)
    }

    /// Bounded queue with a dedicated writer task.
    pub fn queued(storage: Arc<dyn AuditStorage>, capacity: usize) -> Self {
        let counters = Arc::new(Counters::default());
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let writer = tokio::spawn(run_writer(receiver, storage, counters.clone()));

        Self {
            inner: Arc::new(Inner {
                dispatch: Dispatch::Queued {
                    sender: Mutex::new(Some(sender)),
                    writer: Mutex::new(Some(writer)),
                },
                counters,
                utterance: UtterancePolicy::default(),
            }),
        }
    }

    /// Inline writes.
    pub fn sync(storage: Arc<dyn AuditStorage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatch: Dispatch::Sync { storage },
                counters: Arc::new(Counters::default()),
                utterance: UtterancePolicy::default(),
            }),
        }
    }

    /// Set how utterances are stored. Only valid before the handle is cloned.
    pub fn with_utterance_policy(mut self, policy: UtterancePolicy) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.utterance = policy;
        }
        self
    }

    pub fn utterance_policy(&self) -> UtterancePolicy {
        self.inner.utterance
    }

    /// Submit a record. Never fails from the caller's point of view.
    pub async fn record(&self, record: AuditRecord) {
        let counters = &self.inner.counters;
        counters.submitted.fetch_add(1, Ordering::Relaxed);

        match &self.inner.dispatch {
            Dispatch::Queued { sender, .. } => {
                let sender = sender.lock().ok().and_then(|guard| guard.clone());
                let Some(sender) = sender else {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        target: "datatalk::audit",
                        event_id = %record.event_id,
                        "audit recorder is shut down, record dropped"
                    );
                    return;
                };
                if let Err(e) = sender.try_send(record) {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    let record = match e {
                        mpsc::error::TrySendError::Full(r) | mpsc::error::TrySendError::Closed(r) => r,
                    };
                    tracing::warn!(
                        target: "datatalk::audit",
                        event_id = %record.event_id,
                        user = %record.user,
                        intent = %record.intent,
                        "audit queue full, record dropped"
                    );
                }
            }
            Dispatch::Sync { storage } => write_one(storage.as_ref(), &record, counters).await,
        }
    }

    pub fn stats(&self) -> AuditStats {
        self.inner.counters.snapshot()
    }

    /// Stop accepting records and wait until the queue is drained.
    ///
    /// Later calls to [`record`](Self::record) count as dropped.
    pub async fn shutdown(&self) {
        let Dispatch::Queued { sender, writer } = &self.inner.dispatch else {
            return;
        };
        if let Ok(mut guard) = sender.lock() {
            guard.take();
        }
        let handle = writer.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(target: "datatalk::audit", error = %e, "audit writer task failed");
            }
        }
        let stats = self.stats();
        tracing::info!(
            written = stats.written,
            dropped = stats.dropped,
            failed = stats.failed,
            "audit queue drained"
        );
    }
}

async fn run_writer(
    mut receiver: mpsc::Receiver<AuditRecord>,
    storage: Arc<dyn AuditStorage>,
    counters: Arc<Counters>,
) {
    while let Some(record) = receiver.recv().await {
        write_one(storage.as_ref(), &record, &counters).await;
    }
}

async fn write_one(storage: &dyn AuditStorage, record: &AuditRecord, counters: &Counters) {
    match storage.store(record).await {
        Ok(()) => {
            counters.written.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                event_id = %record.event_id,
                outcome = %record.outcome,
                intent = %record.intent,
                "audit record written"
            );
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                target: "datatalk::audit",
                kind = %ErrorKind::AuditWriteFailure,
                event_id = %record.event_id,
                error = %e,
                record = %record.to_log_line(),
                "failed to persist audit record"
            );
        }
    }
}
