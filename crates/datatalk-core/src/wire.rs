//! Request and response shapes exchanged with the channel adapter.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// Identity of the person asking.
///
/// Accepts either a bare string or the `{id, name}` object chat gateways send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(String),
    Account {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Account { id, .. } => id,
        }
    }
}

impl Default for UserRef {
    fn default() -> Self {
        Self::Id("anonymous".to_string())
    }
}

/// One natural-language question routed to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub user: UserRef,
    /// Intent key chosen by the caller. Empty means "classify the utterance".
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub utterance: String,
    /// Raw parameters; names not declared by the intent are ignored.
    #[serde(default, alias = "filters")]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ResolveRequest {
    pub fn new(user: impl Into<String>, intent: impl Into<String>, utterance: impl Into<String>) -> Self {
        Self {
            user: UserRef::Id(user.into()),
            intent: intent.into(),
            utterance: utterance.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    pub duration_ms: u64,
    pub row_count: u64,
}

/// Successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub summary: String,
    /// The executed statement, for transparency.
    pub sql: String,
    pub stats: QueryStats,
}

/// Structured, schema-free failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Wire envelope for failures: `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl From<ErrorBody> for ErrorEnvelope {
    fn from(error: ErrorBody) -> Self {
        Self { error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_gateway_shape() {
        let raw = serde_json::json!({
            "user": {"id": "29:abc", "name": "Ana"},
            "intent": "invoices_due_this_month",
            "utterance": "facturas que vencen este mes",
            "filters": {"date_day": 13}
        });
        let req: ResolveRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(req.user.id(), "29:abc");
        assert_eq!(req.params.get("date_day"), Some(&serde_json::json!(13)));
    }

    #[test]
    fn request_accepts_plain_user_and_missing_params() {
        let raw = serde_json::json!({"user": "u1", "intent": "overdue_today", "utterance": "x"});
        let req: ResolveRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(req.user.id(), "u1");
        assert!(req.params.is_empty());
    }

    #[test]
    fn error_envelope_shape() {
        let env = ErrorEnvelope::from(ErrorBody {
            kind: ErrorKind::UnknownIntent,
            message: "intent 'foo' is not supported".into(),
        });
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["error"]["kind"], "UnknownIntent");
        assert!(json.get("sql").is_none());
    }

    #[test]
    fn stats_use_camel_case() {
        let stats = QueryStats { duration_ms: 12, row_count: 3 };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json, serde_json::json!({"durationMs": 12, "rowCount": 3}));
    }
}
