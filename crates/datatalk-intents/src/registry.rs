//! Intent registry.
//!
//! Built once at startup, then shared behind an `Arc` and only read. Every
//! template is rendered for all of its fragment combinations at registration
//! time, so a broken template fails the process start rather than a request.

use crate::descriptor::{Binding, ParamDefault, ParamKind, TemplateDescriptor};
use crate::error::RegistryError;
use datatalk_core::IntentKey;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("placeholder pattern"));

/// A registered intent.
#[derive(Debug)]
pub struct IntentEntry {
    pub key: IntentKey,
    pub aliases: Vec<IntentKey>,
    pub descriptor: TemplateDescriptor,
    shapes: Vec<String>,
}

impl IntentEntry {
    /// Rendered skeletons, one per fragment combination.
    pub fn shapes(&self) -> &[String] {
        &self.shapes
    }
}

/// Listing view of an intent, as served to operators.
#[derive(Debug, Clone, Serialize)]
pub struct IntentInfo {
    pub key: IntentKey,
    pub aliases: Vec<IntentKey>,
    pub description: String,
    pub view: String,
    pub params: Vec<crate::descriptor::ParamSpec>,
    pub columns: Vec<String>,
    pub row_cap: Option<u32>,
}

impl From<&IntentEntry> for IntentInfo {
    fn from(entry: &IntentEntry) -> Self {
        Self {
            key: entry.key.clone(),
            aliases: entry.aliases.clone(),
            description: entry.descriptor.description.clone(),
            view: entry.descriptor.view.clone(),
            params: entry.descriptor.params.clone(),
            columns: entry
                .descriptor
                .visible_columns()
                .map(|c| c.name.clone())
                .collect(),
            row_cap: entry.descriptor.row_cap,
        }
    }
}

#[derive(Debug, Default)]
pub struct IntentRegistry {
    intents: BTreeMap<IntentKey, IntentEntry>,
    aliases: BTreeMap<IntentKey, IntentKey>,
}

impl IntentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under `key`.
    pub fn register(
        &mut self,
        key: impl Into<IntentKey>,
        descriptor: TemplateDescriptor,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if self.is_taken(&key) {
            return Err(RegistryError::DuplicateIntent(key.to_string()));
        }

        let shapes = validate_template(&key, &descriptor)?;
        tracing::debug!(intent = %key, shapes = shapes.len(), "registered intent");

        self.intents.insert(
            key.clone(),
            IntentEntry {
                key,
                aliases: Vec::new(),
                descriptor,
                shapes,
            },
        );
        Ok(())
    }

    /// Make `alias` resolve to the already registered `key`.
    pub fn register_alias(
        &mut self,
        alias: impl Into<IntentKey>,
        key: impl Into<IntentKey>,
    ) -> Result<(), RegistryError> {
        let alias = alias.into();
        let key = key.into();
        if self.is_taken(&alias) {
            return Err(RegistryError::DuplicateIntent(alias.to_string()));
        }
        let entry = self
            .intents
            .get_mut(&key)
            .ok_or_else(|| RegistryError::UnknownIntent(key.to_string()))?;
        entry.aliases.push(alias.clone());
        self.aliases.insert(alias, key);
        Ok(())
    }

    /// Resolve a key or alias, case-insensitively.
    pub fn lookup(&self, key: &str) -> Result<&IntentEntry, RegistryError> {
        let key = IntentKey::new(key);
        let canonical = self.aliases.get(&key).unwrap_or(&key);
        self.intents
            .get(canonical)
            .ok_or_else(|| RegistryError::UnknownIntent(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_ok()
    }

    pub fn entries(&self) -> impl Iterator<Item = &IntentEntry> {
        self.intents.values()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Every view a registered template reads from.
    pub fn views(&self) -> BTreeSet<String> {
        self.intents
            .values()
            .map(|e| e.descriptor.view.clone())
            .collect()
    }

    /// Every rendered skeleton of every intent.
    pub fn template_shapes(&self) -> impl Iterator<Item = &str> {
        self.intents
            .values()
            .flat_map(|e| e.shapes.iter().map(String::as_str))
    }

    pub fn describe(&self) -> Vec<IntentInfo> {
        self.entries().map(IntentInfo::from).collect()
    }

    fn is_taken(&self, key: &IntentKey) -> bool {
        self.intents.contains_key(key) || self.aliases.contains_key(key)
    }
}

/// Check a descriptor's parameters, then render every fragment combination.
fn validate_template(
    key: &IntentKey,
    descriptor: &TemplateDescriptor,
) -> Result<Vec<String>, RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidTemplate {
        intent: key.to_string(),
        reason,
    };

    if descriptor.view.trim().is_empty() {
        return Err(invalid("no view declared".to_string()));
    }

    let mut seen = BTreeSet::new();
    for param in &descriptor.params {
        if !seen.insert(param.name.as_str()) {
            return Err(invalid(format!("parameter '{}' declared twice", param.name)));
        }
        check_default(&param.kind, param.binding, &param.default)
            .map_err(|reason| invalid(format!("parameter '{}': {}", param.name, reason)))?;
    }

    for column in &descriptor.columns {
        if let crate::descriptor::ColumnKind::Currency { code_column } = &column.kind {
            if descriptor.column(code_column).is_none() {
                return Err(invalid(format!(
                    "column '{}' reads its currency from undeclared column '{}'",
                    column.name, code_column
                )));
            }
        }
    }

    let placeholders = descriptor.placeholder_count();
    let mut shapes = Vec::new();
    for choices in fragment_combinations(descriptor) {
        let (sql, problems) = descriptor.render(&choices);
        if let Some(problem) = problems.into_iter().next() {
            return Err(invalid(problem));
        }

        let used: BTreeSet<usize> = PLACEHOLDER
            .captures_iter(&sql)
            .filter_map(|c| c[1].parse().ok())
            .collect();
        if let Some(extra) = used.iter().find(|&&n| n == 0 || n > placeholders) {
            return Err(invalid(format!("placeholder ${} has no parameter", extra)));
        }
        if let Some(missing) = (1..=placeholders).find(|n| !used.contains(n)) {
            return Err(invalid(format!("placeholder ${} missing from template", missing)));
        }
        if !sql.contains(descriptor.view.as_str()) {
            return Err(invalid("template does not read from its view".to_string()));
        }
        shapes.push(sql);
    }
    Ok(shapes)
}

fn check_default(kind: &ParamKind, binding: Binding, default: &ParamDefault) -> Result<(), String> {
    if binding == Binding::Fragment {
        return match (kind, default) {
            (ParamKind::Enum { allowed }, ParamDefault::Choice(choice)) if allowed.contains(choice) => {
                Ok(())
            }
            (ParamKind::Enum { .. }, ParamDefault::Required) => Ok(()),
            (ParamKind::Enum { .. }, _) => {
                Err("fragment default must be one of the allowed values".to_string())
            }
            _ => Err("only enum parameters can select fragments".to_string()),
        };
    }

    match (kind, default) {
        (_, ParamDefault::Required | ParamDefault::Null) => Ok(()),
        (
            ParamKind::Date,
            ParamDefault::StartOfMonth | ParamDefault::StartOfNextMonth | ParamDefault::Today,
        ) => Ok(()),
        (ParamKind::Integer { min, max }, ParamDefault::Integer(n)) if (min..=max).contains(&n) => {
            Ok(())
        }
        (ParamKind::Enum { allowed }, ParamDefault::Choice(choice)) if allowed.contains(choice) => {
            Ok(())
        }
        _ => Err("default does not fit the declared type".to_string()),
    }
}

/// Cartesian product of all fragment-bound enum values.
fn fragment_combinations(descriptor: &TemplateDescriptor) -> Vec<BTreeMap<String, String>> {
    let mut combos = vec![BTreeMap::new()];
    for param in &descriptor.params {
        if param.binding != Binding::Fragment {
            continue;
        }
        let ParamKind::Enum { allowed } = &param.kind else {
            continue;
        };
        combos = combos
            .into_iter()
            .flat_map(|combo| {
                allowed.iter().map(move |value| {
                    let mut next = combo.clone();
                    next.insert(param.name.clone(), value.clone());
                    next
                })
            })
            .collect();
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnKind, ColumnSpec, ParamSpec, TemplateContext};
    use pretty_assertions::assert_eq;

    fn two_sorts(ctx: &TemplateContext<'_>) -> String {
        let order = match ctx.choice("sort") {
            "desc" => "due_date DESC",
            _ => "due_date ASC",
        };
        format!(
            "SELECT due_date FROM {} WHERE due_date >= {} ORDER BY {}",
            ctx.view(),
            ctx.placeholder("from"),
            order
        )
    }

    fn forgets_placeholder(ctx: &TemplateContext<'_>) -> String {
        format!("SELECT due_date FROM {}", ctx.view())
    }

    fn unknown_param(ctx: &TemplateContext<'_>) -> String {
        format!("SELECT * FROM {} WHERE x = {}", ctx.view(), ctx.placeholder("nope"))
    }

    fn descriptor(template: crate::descriptor::TemplateFn) -> TemplateDescriptor {
        TemplateDescriptor {
            description: "test".into(),
            view: "public.v".into(),
            params: vec![
                ParamSpec::placeholder("from", ParamKind::Date, ParamDefault::Today),
                ParamSpec::fragment("sort", &["asc", "desc"], "asc"),
            ],
            columns: vec![ColumnSpec::new("due_date", ColumnKind::Date)],
            row_cap: None,
            summary: None,
            template,
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = IntentRegistry::new();
        registry.register("due", descriptor(two_sorts)).unwrap();
        registry.register_alias("vencen", "due").unwrap();

        assert_eq!(registry.lookup("due").unwrap().key.as_str(), "due");
        assert_eq!(registry.lookup(" VENCEN ").unwrap().key.as_str(), "due");
        assert_eq!(registry.lookup("due").unwrap().shapes().len(), 2);
        assert_eq!(registry.views(), BTreeSet::from(["public.v".to_string()]));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = IntentRegistry::new();
        registry.register("due", descriptor(two_sorts)).unwrap();
        let err = registry.register("DUE", descriptor(two_sorts)).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateIntent("due".into()));
    }

    #[test]
    fn test_alias_collisions_rejected() {
        let mut registry = IntentRegistry::new();
        registry.register("due", descriptor(two_sorts)).unwrap();
        registry.register("other", descriptor(two_sorts)).unwrap();
        registry.register_alias("vencen", "due").unwrap();

        assert!(matches!(
            registry.register_alias("other", "due"),
            Err(RegistryError::DuplicateIntent(_))
        ));
        assert!(matches!(
            registry.register_alias("vencen", "other"),
            Err(RegistryError::DuplicateIntent(_))
        ));
        assert!(matches!(
            registry.register("vencen", descriptor(two_sorts)),
            Err(RegistryError::DuplicateIntent(_))
        ));
        assert!(matches!(
            registry.register_alias("x", "missing"),
            Err(RegistryError::UnknownIntent(_))
        ));
    }

    #[test]
    fn test_unknown_lookup() {
        let registry = IntentRegistry::new();
        let err = registry.lookup("foo").unwrap_err();
        assert_eq!(err.kind(), datatalk_core::ErrorKind::UnknownIntent);
    }

    #[test]
    fn test_missing_placeholder_is_invalid_template() {
        let mut registry = IntentRegistry::new();
        let err = registry.register("bad", descriptor(forgets_placeholder)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTemplate { .. }));
        assert!(err.to_string().contains("$1"));
    }

    #[test]
    fn test_unknown_parameter_is_invalid_template() {
        let mut registry = IntentRegistry::new();
        let err = registry.register("bad", descriptor(unknown_param)).unwrap_err();
        assert!(err.to_string().contains("unknown parameter 'nope'"));
    }

    #[test]
    fn test_bad_fragment_default_is_invalid_template() {
        let mut d = descriptor(two_sorts);
        d.params[1].default = ParamDefault::Choice("sideways".into());
        let mut registry = IntentRegistry::new();
        assert!(matches!(
            registry.register("bad", d),
            Err(RegistryError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_integer_default_out_of_range_is_invalid_template() {
        let mut d = descriptor(two_sorts);
        d.params.push(ParamSpec::placeholder(
            "days",
            ParamKind::Integer { min: 1, max: 10 },
            ParamDefault::Integer(40),
        ));
        let mut registry = IntentRegistry::new();
        assert!(matches!(
            registry.register("bad", d),
            Err(RegistryError::InvalidTemplate { .. })
        ));
    }
}
