//! Generation and validation wired from configuration.

use crate::error::StartupError;
use datatalk_core::{DatatalkConfig, ResolvedQuery};
use datatalk_guard::{GuardrailPolicy, GuardrailValidator, GuardrailVerdict};
use datatalk_intents::{GenerateError, GeneratorSettings, SqlGenerator, builtin_registry};
use serde_json::{Map, Value};
use std::sync::Arc;

/// The pure half of a resolution: intent to validated SQL, no I/O.
#[derive(Debug, Clone)]
pub struct Pipeline {
    generator: SqlGenerator,
    validator: GuardrailValidator,
}

impl Pipeline {
    pub fn new(generator: SqlGenerator, validator: GuardrailValidator) -> Self {
        Self {
            generator,
            validator,
        }
    }

    /// Built-in catalog over the configured view, guardrails derived from it.
    pub fn from_config(config: &DatatalkConfig) -> Result<Self, StartupError> {
        let registry = Arc::new(builtin_registry(&config.intents.view)?);
        let settings = GeneratorSettings::from_config(&config.guardrails, &config.locale)?;
        let policy = GuardrailPolicy::new(settings.row_ceiling, registry.views())
            .allow_literals_from(registry.template_shapes());

        tracing::info!(
            intents = registry.len(),
            view = %config.intents.view,
            row_ceiling = settings.row_ceiling,
            "intent catalog loaded"
        );

        Ok(Self::new(
            SqlGenerator::new(registry, settings),
            GuardrailValidator::new(policy),
        ))
    }

    pub fn generator(&self) -> &SqlGenerator {
        &self.generator
    }

    pub fn validator(&self) -> &GuardrailValidator {
        &self.validator
    }

    /// Generate and validate without executing.
    pub fn explain(
        &self,
        intent: &str,
        params: &Map<String, Value>,
        today: Option<chrono::NaiveDate>,
    ) -> Result<(ResolvedQuery, GuardrailVerdict), GenerateError> {
        let query = match today {
            Some(today) => self.generator.generate_at(intent, params, today)?,
            None => self.generator.generate(intent, params)?,
        };
        let verdict = self.validator.validate(&query);
        Ok((query, verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_config_builds_an_accepting_pipeline() {
        let pipeline = Pipeline::from_config(&DatatalkConfig::default()).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 10, 15);
        let (query, verdict) = pipeline
            .explain("vencen_mes", &Map::new(), today)
            .unwrap();
        assert!(verdict.is_accepted());
        assert_eq!(query.source_intent.as_str(), "invoices_due_this_month");
        assert!(query.sql.ends_with("\nLIMIT 50"));
    }

    #[test]
    fn test_custom_view_is_allowed() {
        let mut config = DatatalkConfig::default();
        config.intents.view = "reporting.invoices".to_string();
        let pipeline = Pipeline::from_config(&config).unwrap();
        let (query, verdict) = pipeline.explain("overdue_today", &Map::new(), None).unwrap();
        assert!(query.sql.contains("reporting.invoices"));
        assert!(verdict.is_accepted());
    }
}
