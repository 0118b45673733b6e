//! Audit record types.
//!
//! One record per resolution attempt: who asked, which intent, the SQL that
//! was produced (if any), and how the attempt ended.

use chrono::{DateTime, Utc};
use datatalk_core::{ErrorKind, UtterancePolicy};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// How a resolution attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Executed and formatted.
    Succeeded,
    /// Stopped before execution (generation or guardrail failure).
    Rejected,
    /// Passed the guardrails but failed in the data store.
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: Uuid,

    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,

    pub user: String,

    /// Intent key as requested (or as classified, when the request had none).
    pub intent: String,

    /// SHA-256 hex digest of the utterance (hashed policy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utterance_hash: Option<String>,

    /// Utterance as received (plain policy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utterance: Option<String>,

    /// Generated SQL, absent when generation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,

    /// Whether the guardrails accepted the statement.
    pub accepted: bool,

    pub outcome: Outcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

impl AuditRecord {
    /// Create a builder. Until told otherwise the record describes an
    /// attempt that was rejected before validation.
    pub fn builder(user: impl Into<String>, intent: impl Into<String>) -> AuditRecordBuilder {
        AuditRecordBuilder::new(user, intent)
    }

    /// Format the record as a human-readable log line.
    ///
    /// Format: `[timestamp] OUTCOME user=... intent=... [error=...] [rows=...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} user={} intent={} accepted={} duration_ms={}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.outcome,
            self.user,
            self.intent,
            self.accepted,
            self.duration_ms,
        );

        if let Some(kind) = self.error_kind {
            line.push_str(&format!(" error={}", kind));
        }

        if let Some(rows) = self.row_count {
            line.push_str(&format!(" rows={}", rows));
        }

        if let Some(ref sql) = self.sql {
            let preview: String = sql.chars().take(100).collect();
            let ellipsis = if preview.len() < sql.len() { "..." } else { "" };
            line.push_str(&format!(" sql=\"{}{}\"", preview.replace('\n', " "), ellipsis));
        }

        line
    }
}

/// SHA-256 hex digest of an utterance.
pub fn hash_utterance(utterance: &str) -> String {
    hex::encode(Sha256::digest(utterance.as_bytes()))
}

/// Builder for audit records.
#[derive(Debug)]
pub struct AuditRecordBuilder {
    record: AuditRecord,
}

impl AuditRecordBuilder {
    pub fn new(user: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            record: AuditRecord {
                event_id: Uuid::new_v4(),
                timestamp: Utc::now(),
                user: user.into(),
                intent: intent.into(),
                utterance_hash: None,
                utterance: None,
                sql: None,
                accepted: false,
                outcome: Outcome::Rejected,
                error_kind: None,
                duration_ms: 0,
                row_count: None,
            },
        }
    }

    /// Set the utterance according to the storage policy.
    pub fn utterance(mut self, utterance: &str, policy: UtterancePolicy) -> Self {
        match policy {
            UtterancePolicy::Hashed => self.record.utterance_hash = Some(hash_utterance(utterance)),
            UtterancePolicy::Plain => self.record.utterance = Some(utterance.to_string()),
        }
        self
    }

    pub fn intent(mut self, intent: impl Into<String>) -> Self {
        self.record.intent = intent.into();
        self
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.record.sql = Some(sql.into());
        self
    }

    pub fn duration_ms(mut self, duration: u64) -> Self {
        self.record.duration_ms = duration;
        self
    }

    /// The statement ran and its rows were returned.
    pub fn succeeded(mut self, row_count: u64) -> Self {
        self.record.accepted = true;
        self.record.outcome = Outcome::Succeeded;
        self.record.row_count = Some(row_count);
        self.record.error_kind = None;
        self
    }

    /// The attempt ended with `kind`.
    ///
    /// Pre-execution kinds (generation and guardrail failures) yield a
    /// rejected record; anything else means the statement had been accepted
    /// and then failed in the data store.
    pub fn failure(mut self, kind: ErrorKind) -> Self {
        let pre_execution = kind.is_pre_execution();
        self.record.accepted = !pre_execution;
        self.record.outcome = if pre_execution {
            Outcome::Rejected
        } else {
            Outcome::Failed
        };
        self.record.error_kind = Some(kind);
        self.record.row_count = None;
        self
    }

    pub fn build(self) -> AuditRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded_record() {
        let record = AuditRecord::builder("u1", "overdue_today")
            .utterance("facturas vencidas hoy", UtterancePolicy::Plain)
            .sql("SELECT 1\nLIMIT 50")
            .duration_ms(12)
            .succeeded(3)
            .build();

        assert!(record.accepted);
        assert_eq!(record.outcome, Outcome::Succeeded);
        assert_eq!(record.row_count, Some(3));
        assert_eq!(record.utterance.as_deref(), Some("facturas vencidas hoy"));
        assert!(record.utterance_hash.is_none());
        assert!(record.error_kind.is_none());
    }

    #[test]
    fn test_failure_kinds_split_into_outcomes() {
        let rejected = AuditRecord::builder("u1", "foo")
            .failure(ErrorKind::UnknownIntent)
            .build();
        assert!(!rejected.accepted);
        assert_eq!(rejected.outcome, Outcome::Rejected);
        assert!(rejected.sql.is_none());

        let failed = AuditRecord::builder("u1", "overdue_today")
            .sql("SELECT 1\nLIMIT 50")
            .failure(ErrorKind::ExecutionTimeout)
            .build();
        assert!(failed.accepted);
        assert_eq!(failed.outcome, Outcome::Failed);
        assert_eq!(failed.error_kind, Some(ErrorKind::ExecutionTimeout));
    }

    #[test]
    fn test_hashed_utterance() {
        let record = AuditRecord::builder("u1", "overdue_today")
            .utterance("abc", UtterancePolicy::Hashed)
            .build();
        assert_eq!(
            record.utterance_hash.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert!(record.utterance.is_none());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let record = AuditRecord::builder("u1", "foo")
            .failure(ErrorKind::UnknownIntent)
            .build();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["error_kind"], "UnknownIntent");
        assert!(json.get("sql").is_none());
        assert!(json.get("row_count").is_none());
    }

    #[test]
    fn test_log_line() {
        let record = AuditRecord::builder("u1", "overdue_today")
            .sql("SELECT *\nFROM v\nLIMIT 50")
            .succeeded(2)
            .build();
        let line = record.to_log_line();
        assert!(line.contains("SUCCEEDED user=u1 intent=overdue_today"));
        assert!(line.contains("rows=2"));
        assert!(line.contains("sql=\"SELECT * FROM v LIMIT 50\""));
    }
}
