//! SQL template generator.
//!
//! Turns an intent key plus loosely typed caller parameters into a
//! [`ResolvedQuery`]. Values only ever travel as bound placeholders or as the
//! canonical spelling of an enum choice; the statement text is always one of
//! the shapes the registry rendered at startup, plus the row cap.

use crate::descriptor::{Binding, ParamDefault, ParamKind, ParamSpec, TemplateDescriptor};
use crate::error::GenerateError;
use crate::registry::IntentRegistry;
use chrono::{Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use datatalk_core::{
    BoundParam, ConfigError, GuardrailsConfig, LocaleConfig, ParamValue, ResolvedQuery,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Row caps and the timezone that decides what "today" is.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub row_ceiling: u32,
    pub default_row_cap: u32,
    pub timezone: Tz,
}

impl GeneratorSettings {
    pub fn from_config(
        guardrails: &GuardrailsConfig,
        locale: &LocaleConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            row_ceiling: guardrails.max_rows_per_query,
            default_row_cap: guardrails.default_row_cap,
            timezone: locale.tz()?,
        })
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            row_ceiling: 200,
            default_row_cap: 50,
            timezone: chrono_tz::America::Lima,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlGenerator {
    registry: Arc<IntentRegistry>,
    settings: GeneratorSettings,
}

impl SqlGenerator {
    pub fn new(registry: Arc<IntentRegistry>, settings: GeneratorSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &Arc<IntentRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.timezone).date_naive()
    }

    pub fn generate(
        &self,
        intent: &str,
        raw: &Map<String, Value>,
    ) -> Result<ResolvedQuery, GenerateError> {
        self.generate_at(intent, raw, self.today())
    }

    /// Generate as if the local date were `today`.
    pub fn generate_at(
        &self,
        intent: &str,
        raw: &Map<String, Value>,
        today: NaiveDate,
    ) -> Result<ResolvedQuery, GenerateError> {
        let entry = self
            .registry
            .lookup(intent)
            .map_err(|_| GenerateError::UnknownIntent(intent.trim().to_string()))?;
        let descriptor = &entry.descriptor;

        let mut params = Vec::with_capacity(descriptor.placeholder_count());
        let mut choices = BTreeMap::new();

        for spec in &descriptor.params {
            let value = match raw.get(&spec.name).filter(|v| !is_blank(v)) {
                Some(v) => coerce(spec, v)?,
                None => default_value(spec, today)?,
            };
            match spec.binding {
                Binding::Placeholder => params.push(BoundParam {
                    name: spec.name.clone(),
                    value,
                }),
                Binding::Fragment => {
                    if let ParamValue::Text(choice) = value {
                        choices.insert(spec.name.clone(), choice);
                    }
                }
            }
        }

        let (skeleton, problems) = descriptor.render(&choices);
        debug_assert!(problems.is_empty(), "template validated at registration");

        let row_cap = self.row_cap(descriptor);
        let sql = format!("{}\nLIMIT {}", skeleton.trim_end(), row_cap);

        tracing::debug!(
            intent = %entry.key,
            params = params.len(),
            row_cap,
            "generated statement"
        );

        Ok(ResolvedQuery {
            sql,
            params,
            source_intent: entry.key.clone(),
            row_cap,
        })
    }

    /// Descriptor cap (or the default), never above the ceiling.
    pub fn row_cap(&self, descriptor: &TemplateDescriptor) -> u32 {
        descriptor
            .row_cap
            .unwrap_or(self.settings.default_row_cap)
            .min(self.settings.row_ceiling)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce(spec: &ParamSpec, raw: &Value) -> Result<ParamValue, GenerateError> {
    let name = spec.name.as_str();
    match &spec.kind {
        ParamKind::Integer { min, max } => {
            let n = match raw {
                Value::Number(n) => n
                    .as_i64()
                    .ok_or_else(|| GenerateError::invalid(name, "expected a whole number"))?,
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| GenerateError::invalid(name, "expected a whole number"))?,
                _ => return Err(GenerateError::invalid(name, "expected a whole number")),
            };
            if n < *min || n > *max {
                return Err(GenerateError::invalid(
                    name,
                    format!("must be between {} and {}", min, max),
                ));
            }
            Ok(ParamValue::Integer(n))
        }
        ParamKind::Date => {
            let s = raw
                .as_str()
                .ok_or_else(|| GenerateError::invalid(name, "expected a date (YYYY-MM-DD)"))?;
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(ParamValue::Date)
                .map_err(|_| GenerateError::invalid(name, "expected a date (YYYY-MM-DD)"))
        }
        ParamKind::Enum { allowed } => {
            let s = raw
                .as_str()
                .ok_or_else(|| GenerateError::invalid(name, "expected text"))?
                .trim();
            allowed
                .iter()
                .find(|a| a.eq_ignore_ascii_case(s))
                .map(|a| ParamValue::Text(a.clone()))
                .ok_or_else(|| {
                    GenerateError::invalid(name, format!("must be one of {}", allowed.join(", ")))
                })
        }
        ParamKind::Text { max_len } => {
            let s = raw
                .as_str()
                .ok_or_else(|| GenerateError::invalid(name, "expected text"))?
                .trim();
            if s.chars().count() > *max_len {
                return Err(GenerateError::invalid(
                    name,
                    format!("must be at most {} characters", max_len),
                ));
            }
            Ok(ParamValue::Text(s.to_string()))
        }
    }
}

fn default_value(spec: &ParamSpec, today: NaiveDate) -> Result<ParamValue, GenerateError> {
    let start_of_month = || {
        today
            .with_day(1)
            .ok_or_else(|| GenerateError::invalid(&spec.name, "date out of range"))
    };
    match &spec.default {
        ParamDefault::Required => Err(GenerateError::MissingParameter {
            name: spec.name.clone(),
        }),
        ParamDefault::Null => Ok(ParamValue::Null(spec.kind.param_type())),
        ParamDefault::StartOfMonth => start_of_month().map(ParamValue::Date),
        ParamDefault::StartOfNextMonth => start_of_month()?
            .checked_add_months(Months::new(1))
            .map(ParamValue::Date)
            .ok_or_else(|| GenerateError::invalid(&spec.name, "date out of range")),
        ParamDefault::Today => Ok(ParamValue::Date(today)),
        ParamDefault::Integer(n) => Ok(ParamValue::Integer(*n)),
        ParamDefault::Choice(choice) => Ok(ParamValue::Text(choice.clone())),
    }
}
