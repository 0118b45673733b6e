//! Shared application state.

use datatalk_audit::AuditRecorder;
use datatalk_runtime::Orchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            inner: orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner
    }

    pub fn audit(&self) -> &AuditRecorder {
        self.inner.audit()
    }
}
