//! # datatalk-server
//!
//! HTTP surface for chat-channel adapters.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /n2sql/run` | resolve `{user, intent, utterance, params?}` |
//! | `GET /v1/intents` | registered intents, aliases and parameters |
//! | `GET /health` | liveness |
//! | `GET /diag/audit` | audit counters |
//!
//! Failures come back as `{"error": {"kind": ..., "message": ...}}` with 422
//! for generation and guardrail errors, 503 for timeouts and pool
//! exhaustion, and 502 for other database errors.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ServerError, status_for};
pub use routes::create_router;
pub use server::DatatalkServer;
pub use state::AppState;
