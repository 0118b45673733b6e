//! # datatalk-runtime
//!
//! Request handling for DataTalk: the executor seam, result formatting and
//! the orchestrator that ties every stage to the audit trail.
//!
//! ```text
//! Received -> Generated -> Validated -> (Rejected | Executed) -> Formatted -> Audited -> Done
//! ```
//!
//! Any failure short-circuits to `Audited`, so every request produces exactly
//! one audit record.

pub mod adapter;
pub mod error;
pub mod format;
pub mod orchestrator;
pub mod pipeline;

pub use adapter::{ExecutionError, ExecutionResult, QueryExecutor};
pub use error::{ResolveError, StartupError};
pub use format::{FormattedResult, ResultFormatter};
pub use orchestrator::Orchestrator;
pub use pipeline::Pipeline;
