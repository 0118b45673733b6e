//! Locale and timezone settings used by the generator and the formatter.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ConfigError;

/// Presentation settings for formatted results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// IANA timezone name; also decides what "this month" and "today" mean.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Locale tag, informational.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Symbol per ISO currency code.
    #[serde(default = "default_currency_symbols")]
    pub currency_symbols: BTreeMap<String, String>,

    /// Symbol used when a row carries no known currency code.
    #[serde(default = "default_currency_symbol")]
    pub default_currency_symbol: String,

    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: String,

    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: String,

    /// `chrono` pattern for DATE values.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// `chrono` pattern for timestamps, applied after conversion to `timezone`.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            locale: default_locale(),
            currency_symbols: default_currency_symbols(),
            default_currency_symbol: default_currency_symbol(),
            thousands_separator: default_thousands_separator(),
            decimal_separator: default_decimal_separator(),
            date_format: default_date_format(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

impl LocaleConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::Config(format!("invalid timezone '{}': {}", self.timezone, e)))
    }

    /// Symbol for an ISO code, falling back to the default symbol.
    pub fn symbol_for(&self, code: Option<&str>) -> &str {
        code.and_then(|c| self.currency_symbols.get(&c.trim().to_uppercase()))
            .map(String::as_str)
            .unwrap_or(&self.default_currency_symbol)
    }
}

fn default_timezone() -> String {
    "America/Lima".to_string()
}

fn default_locale() -> String {
    "es-PE".to_string()
}

fn default_currency_symbols() -> BTreeMap<String, String> {
    [("USD", "$"), ("PEN", "S/"), ("EUR", "€")]
        .into_iter()
        .map(|(code, symbol)| (code.to_string(), symbol.to_string()))
        .collect()
}

fn default_currency_symbol() -> String {
    "S/".to_string()
}

fn default_thousands_separator() -> String {
    ",".to_string()
}

fn default_decimal_separator() -> String {
    ".".to_string()
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_timestamp_format() -> String {
    "%d/%m/%Y %H:%M".to_string()
}
