//! # datatalk-intents
//!
//! Intent registry and SQL template generation for DataTalk.
//!
//! An intent is a named question shape ("invoices due this month"). Each one
//! is registered once with a [`TemplateDescriptor`]: the view it reads, its
//! typed parameters and a pure template function. The [`SqlGenerator`] turns
//! an intent plus caller parameters into a statement whose values are all
//! bound placeholders:
//!
//! ```sql
//! SELECT invoice_number, customer, due_date, ...
//! FROM odoo_replica.vw_invoices_semantic
//! WHERE is_pending
//!   AND due_date >= $1 AND due_date < $2
//!   ...
//! ORDER BY due_date ASC, customer
//! LIMIT 50
//! ```
//!
//! The [`Vocabulary`] maps Spanish utterances to intent keys for callers that
//! do not classify on their own.

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod generator;
pub mod registry;
pub mod vocabulary;

pub use catalog::builtin_registry;
pub use descriptor::{
    Binding, ColumnKind, ColumnSpec, ParamDefault, ParamKind, ParamSpec, SummarySpec,
    TemplateContext, TemplateDescriptor, TemplateFn,
};
pub use error::{GenerateError, RegistryError};
pub use generator::{GeneratorSettings, SqlGenerator};
pub use registry::{IntentEntry, IntentInfo, IntentRegistry};
pub use vocabulary::{Classification, Vocabulary};
