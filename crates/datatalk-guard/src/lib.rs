//! # datatalk-guard
//!
//! Static guardrails for generated SQL.
//!
//! The validator is a pure function over SQL text and a [`GuardrailPolicy`]:
//! it never touches the database. A statement is accepted only when it is a
//! single read-only query over the allowed views, ends in a bounded `LIMIT`,
//! and carries no literal that the first-party templates do not already
//! contain.
//!
//! | Check | Rejection |
//! |-------|-----------|
//! | write, DDL or session keyword; non-query statement | `WriteClauseDetected` |
//! | `;` followed by more SQL | `MultipleStatements` |
//! | relation outside the allow-list, server-side reader function | `UnauthorizedSource` |
//! | no top-level `LIMIT n`, or `n` above the ceiling | `MissingOrExcessiveLimit` |
//! | comment, unknown or exotic literal | `SuspiciousLiteralSubstitution` |

pub mod analyzer;
pub mod error;
pub mod policy;
pub mod validator;

pub use analyzer::SqlAnalyzer;
pub use error::{GuardError, RejectionReason};
pub use policy::{GuardrailPolicy, Literal};
pub use validator::{ApprovedQuery, GuardrailValidator, GuardrailVerdict};
