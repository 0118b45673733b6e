//! Template descriptors: the fixed shape of every supported question.

use datatalk_core::ParamType;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Integer { min: i64, max: i64 },
    Date,
    /// One of a closed set of values; matched case-insensitively and bound as text.
    Enum { allowed: Vec<String> },
    /// Free text, trimmed and bounded in length.
    Text { max_len: usize },
}

impl ParamKind {
    pub fn enumeration(allowed: &[&str]) -> Self {
        Self::Enum {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// SQL type the value travels as.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Integer { .. } => ParamType::Integer,
            Self::Date => ParamType::Date,
            Self::Enum { .. } | Self::Text { .. } => ParamType::Text,
        }
    }
}

/// How a parameter value reaches the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// Bound out-of-band as `$n`.
    Placeholder,
    /// Enum only: the canonical value picks one of the template's fixed fragments.
    Fragment,
}

/// Value used when the caller omits a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDefault {
    Required,
    /// Typed SQL NULL; the template treats it as "no filter".
    Null,
    /// First day of the current month, in the configured timezone.
    StartOfMonth,
    /// First day of the next month (exclusive upper bound of "this month").
    StartOfNextMonth,
    Today,
    Integer(i64),
    Choice(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub binding: Binding,
    pub default: ParamDefault,
    pub description: String,
}

impl ParamSpec {
    pub fn placeholder(name: &str, kind: ParamKind, default: ParamDefault) -> Self {
        Self {
            name: name.to_string(),
            kind,
            binding: Binding::Placeholder,
            default,
            description: String::new(),
        }
    }

    pub fn fragment(name: &str, allowed: &[&str], default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::enumeration(allowed),
            binding: Binding::Fragment,
            default: ParamDefault::Choice(default.to_string()),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Presentation kind of a result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Integer,
    /// Money amount; the ISO code is read from `code_column` of the same row.
    Currency { code_column: String },
    Date,
    Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    /// Technical column: available for ordering and totals, never shown.
    pub hidden: bool,
}

impl ColumnSpec {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            hidden: false,
        }
    }

    pub fn hidden(name: &str, kind: ColumnKind) -> Self {
        Self {
            hidden: true,
            ..Self::new(name, kind)
        }
    }

    pub fn currency(name: &str, code_column: &str) -> Self {
        Self::new(
            name,
            ColumnKind::Currency {
                code_column: code_column.to_string(),
            },
        )
    }
}

/// How the formatter phrases its summary sentence.
#[derive(Debug, Clone, Serialize)]
pub struct SummarySpec {
    /// Plural noun for the row count ("facturas", "clientes").
    pub noun: String,
    /// Numeric column summed into the per-currency totals.
    pub total_column: Option<String>,
    /// Column holding the ISO currency code of each row.
    pub currency_column: Option<String>,
}

/// Pure function rendering the statement skeleton (without the row cap).
pub type TemplateFn = fn(&TemplateContext<'_>) -> String;

/// Everything the registry knows about one intent.
#[derive(Clone)]
pub struct TemplateDescriptor {
    pub description: String,
    /// The only relation the template may read from.
    pub view: String,
    /// Ordered parameters; placeholders are numbered in this order.
    pub params: Vec<ParamSpec>,
    pub columns: Vec<ColumnSpec>,
    /// Lower cap than the global default, if any.
    pub row_cap: Option<u32>,
    pub summary: Option<SummarySpec>,
    pub template: TemplateFn,
}

impl fmt::Debug for TemplateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDescriptor")
            .field("description", &self.description)
            .field("view", &self.view)
            .field("params", &self.params)
            .field("columns", &self.columns)
            .field("row_cap", &self.row_cap)
            .finish_non_exhaustive()
    }
}

impl TemplateDescriptor {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// 1-based placeholder position of a parameter.
    pub fn placeholder_index(&self, name: &str) -> Option<usize> {
        self.params
            .iter()
            .filter(|p| p.binding == Binding::Placeholder)
            .position(|p| p.name == name)
            .map(|i| i + 1)
    }

    pub fn placeholder_count(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.binding == Binding::Placeholder)
            .count()
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| !c.hidden)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Render the skeleton for a set of fragment choices.
    ///
    /// Returns the text and any misuse the template committed while rendering.
    pub fn render(&self, choices: &BTreeMap<String, String>) -> (String, Vec<String>) {
        let ctx = TemplateContext::new(self, choices);
        let sql = (self.template)(&ctx);
        (sql, ctx.into_problems())
    }
}

/// What a template function can see while rendering.
///
/// Only exposes the view name, placeholder tokens and canonical enum choices;
/// raw caller values are never reachable from here.
pub struct TemplateContext<'a> {
    descriptor: &'a TemplateDescriptor,
    choices: &'a BTreeMap<String, String>,
    problems: RefCell<Vec<String>>,
}

impl<'a> TemplateContext<'a> {
    fn new(descriptor: &'a TemplateDescriptor, choices: &'a BTreeMap<String, String>) -> Self {
        Self {
            descriptor,
            choices,
            problems: RefCell::new(Vec::new()),
        }
    }

    pub fn view(&self) -> &'a str {
        let descriptor: &'a TemplateDescriptor = self.descriptor;
        &descriptor.view
    }

    /// Placeholder token (`$n`) for a placeholder-bound parameter.
    pub fn placeholder(&self, name: &str) -> String {
        if let Some(index) = self.descriptor.placeholder_index(name) {
            return format!("${}", index);
        }
        match self.descriptor.param(name) {
            Some(_) => self.problem(format!("'{}' is fragment-bound, not a placeholder", name)),
            None => self.problem(format!("unknown parameter '{}'", name)),
        }
        String::new()
    }

    /// Canonical value of a fragment-bound enum parameter.
    pub fn choice(&self, name: &str) -> &'a str {
        match self.descriptor.param(name) {
            Some(p) if p.binding == Binding::Fragment => {
                let choices: &'a BTreeMap<String, String> = self.choices;
                match choices.get(name) {
                    Some(value) => value.as_str(),
                    None => {
                        self.problem(format!("no choice bound for '{}'", name));
                        ""
                    }
                }
            }
            Some(_) => {
                self.problem(format!("'{}' is a placeholder, not a fragment", name));
                ""
            }
            None => {
                self.problem(format!("unknown parameter '{}'", name));
                ""
            }
        }
    }

    fn problem(&self, message: String) {
        self.problems.borrow_mut().push(message);
    }

    fn into_problems(self) -> Vec<String> {
        self.problems.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_template(ctx: &TemplateContext<'_>) -> String {
        let order = match ctx.choice("sort") {
            "desc" => "due_date DESC",
            _ => "due_date ASC",
        };
        format!(
            "SELECT * FROM {} WHERE due_date >= {} AND currency = {} ORDER BY {}",
            ctx.view(),
            ctx.placeholder("from"),
            ctx.placeholder("currency"),
            order
        )
    }

    fn sample() -> TemplateDescriptor {
        TemplateDescriptor {
            description: "sample".into(),
            view: "v".into(),
            params: vec![
                ParamSpec::placeholder("from", ParamKind::Date, ParamDefault::Today),
                ParamSpec::fragment("sort", &["asc", "desc"], "asc"),
                ParamSpec::placeholder("currency", ParamKind::enumeration(&["USD"]), ParamDefault::Null),
            ],
            columns: vec![ColumnSpec::new("due_date", ColumnKind::Date)],
            row_cap: None,
            summary: None,
            template: sample_template,
        }
    }

    #[test]
    fn placeholders_skip_fragment_params() {
        let descriptor = sample();
        assert_eq!(descriptor.placeholder_index("from"), Some(1));
        assert_eq!(descriptor.placeholder_index("currency"), Some(2));
        assert_eq!(descriptor.placeholder_index("sort"), None);
        assert_eq!(descriptor.placeholder_count(), 2);
    }

    #[test]
    fn render_uses_choice() {
        let descriptor = sample();
        let choices = BTreeMap::from([("sort".to_string(), "desc".to_string())]);
        let (sql, problems) = descriptor.render(&choices);
        assert!(problems.is_empty());
        assert_eq!(
            sql,
            "SELECT * FROM v WHERE due_date >= $1 AND currency = $2 ORDER BY due_date DESC"
        );
    }

    #[test]
    fn render_reports_fragment_used_as_placeholder() {
        fn misuse(ctx: &TemplateContext<'_>) -> String {
            format!("SELECT * FROM {} ORDER BY {}", ctx.view(), ctx.placeholder("sort"))
        }
        let descriptor = TemplateDescriptor {
            template: misuse,
            ..sample()
        };
        let choices = BTreeMap::from([("sort".to_string(), "asc".to_string())]);
        let (sql, problems) = descriptor.render(&choices);
        assert_eq!(problems, vec!["'sort' is fragment-bound, not a placeholder".to_string()]);
        assert!(!sql.contains('$'));
    }

    #[test]
    fn render_reports_missing_choice() {
        let descriptor = sample();
        let (_, problems) = descriptor.render(&BTreeMap::new());
        assert_eq!(problems, vec!["no choice bound for 'sort'".to_string()]);
    }
}
