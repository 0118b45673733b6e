//! Presentation of execution results.
//!
//! Turns raw cells into display strings (currency masks, local dates and
//! timestamps, grouped integers), drops technical columns, and phrases the
//! Spanish summary sentence.

use crate::adapter::ExecutionResult;
use chrono_tz::Tz;
use datatalk_core::{CellValue, ConfigError, LocaleConfig};
use datatalk_intents::{ColumnKind, TemplateDescriptor};
use serde_json::Value;
use std::collections::BTreeMap;

/// Display-ready rows plus the summary sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct ResultFormatter {
    locale: LocaleConfig,
    tz: Tz,
}

impl ResultFormatter {
    pub fn new(locale: LocaleConfig) -> Result<Self, ConfigError> {
        let tz = locale.tz()?;
        Ok(Self { locale, tz })
    }

    pub fn locale(&self) -> &LocaleConfig {
        &self.locale
    }

    /// Format a result. Without a descriptor every column is shown with
    /// generic formatting and the summary counts "filas".
    pub fn format(
        &self,
        descriptor: Option<&TemplateDescriptor>,
        result: &ExecutionResult,
        row_cap: u32,
    ) -> FormattedResult {
        let visible: Vec<usize> = result
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                !descriptor
                    .and_then(|d| d.column(name))
                    .is_some_and(|c| c.hidden)
            })
            .map(|(i, _)| i)
            .collect();

        // an empty result carries no column metadata
        let columns = match descriptor {
            Some(d) if result.columns.is_empty() => {
                d.visible_columns().map(|c| c.name.clone()).collect()
            }
            _ => visible.iter().map(|&i| result.columns[i].clone()).collect(),
        };
        let rows = result
            .rows
            .iter()
            .map(|row| {
                visible
                    .iter()
                    .map(|&i| {
                        let cell = row.get(i).unwrap_or(&CellValue::Null);
                        let spec = descriptor.and_then(|d| d.column(&result.columns[i]));
                        match spec.map(|c| &c.kind) {
                            Some(ColumnKind::Currency { code_column }) => {
                                let code = result
                                    .column_index(code_column)
                                    .and_then(|c| row.get(c))
                                    .and_then(CellValue::as_text);
                                self.currency_cell(cell, code)
                            }
                            _ => self.cell(cell),
                        }
                    })
                    .collect()
            })
            .collect();

        FormattedResult {
            columns,
            rows,
            summary: self.summary(descriptor, result, row_cap),
        }
    }

    /// Spanish summary: count, per-currency totals and a truncation note.
    pub fn summary(
        &self,
        descriptor: Option<&TemplateDescriptor>,
        result: &ExecutionResult,
        row_cap: u32,
    ) -> String {
        let row_count = result.rows.len();
        if row_count == 0 {
            return "No se encontraron resultados.".to_string();
        }

        let spec = descriptor.and_then(|d| d.summary.as_ref());
        let noun = spec.map(|s| s.noun.as_str()).unwrap_or("filas");
        let mut summary = format!("Se encontraron {} {}.", row_count, noun);

        let total_at = spec
            .and_then(|s| s.total_column.as_deref())
            .and_then(|c| result.column_index(c));
        if let Some(total_at) = total_at {
            let code_at = spec
                .and_then(|s| s.currency_column.as_deref())
                .and_then(|c| result.column_index(c));

            let mut totals: BTreeMap<Option<String>, i128> = BTreeMap::new();
            for row in &result.rows {
                let Some(cents) = row.get(total_at).and_then(cell_cents) else {
                    continue;
                };
                let code = code_at
                    .and_then(|c| row.get(c))
                    .and_then(CellValue::as_text)
                    .map(|c| c.trim().to_uppercase());
                *totals.entry(code).or_insert(0) += cents;
            }
            if !totals.is_empty() {
                let rendered: Vec<String> = totals
                    .iter()
                    .map(|(code, cents)| self.render_money(*cents, Some(self.locale.symbol_for(code.as_deref()))))
                    .collect();
                summary.push_str(&format!(" Total: {}.", rendered.join("; ")));
            }
        }

        if row_count as u64 == u64::from(row_cap) {
            summary.push_str(&format!(" Se muestran las primeras {} filas.", row_cap));
        }
        summary
    }

    /// `<symbol> <grouped>.<2 decimals>`, negatives as `-<symbol> ...`.
    pub fn format_currency(&self, raw: &str, code: Option<&str>) -> Option<String> {
        parse_cents(raw).map(|cents| self.render_money(cents, Some(self.locale.symbol_for(code))))
    }

    fn currency_cell(&self, cell: &CellValue, code: Option<&str>) -> Value {
        match cell_cents(cell) {
            Some(cents) => Value::String(self.render_money(cents, Some(self.locale.symbol_for(code)))),
            None => self.cell(cell),
        }
    }

    /// Generic formatting for columns without a currency spec.
    pub fn cell(&self, cell: &CellValue) -> Value {
        match cell {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::String(if *b { "sí" } else { "no" }.to_string()),
            CellValue::Int(n) => Value::String(self.group_signed(*n)),
            CellValue::Float(_) | CellValue::Decimal(_) => match cell_cents(cell) {
                Some(cents) => Value::String(self.render_money(cents, None)),
                None => Value::String(raw_text(cell)),
            },
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Date(d) => Value::String(d.format(&self.locale.date_format).to_string()),
            CellValue::Timestamp(ts) => Value::String(
                ts.with_timezone(&self.tz)
                    .format(&self.locale.timestamp_format)
                    .to_string(),
            ),
        }
    }

    fn render_money(&self, cents: i128, symbol: Option<&str>) -> String {
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        let body = format!(
            "{}{}{:02}",
            group_digits(&(abs / 100).to_string(), &self.locale.thousands_separator),
            self.locale.decimal_separator,
            abs % 100
        );
        match symbol {
            Some(symbol) => format!("{}{} {}", sign, symbol, body),
            None => format!("{}{}", sign, body),
        }
    }

    fn group_signed(&self, n: i64) -> String {
        let grouped = group_digits(&n.unsigned_abs().to_string(), &self.locale.thousands_separator);
        if n < 0 { format!("-{}", grouped) } else { grouped }
    }
}

fn raw_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Float(f) => f.to_string(),
        CellValue::Decimal(s) | CellValue::Text(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

fn cell_cents(cell: &CellValue) -> Option<i128> {
    match cell {
        CellValue::Int(n) => i128::from(*n).checked_mul(100),
        CellValue::Float(f) if f.is_finite() => parse_cents(&f.to_string()),
        CellValue::Decimal(s) | CellValue::Text(s) => parse_cents(s),
        _ => None,
    }
}

/// Parse a plain or scientific decimal into cents, rounding half away from
/// zero. Only the third decimal digit decides the rounding.
fn parse_cents(raw: &str) -> Option<i128> {
    let raw = raw.trim();
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], unsigned[at + 1..].parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    if exponent.abs() > 64 {
        return None;
    }

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut digits = format!("{}{}", int_part, frac_part);
    let mut point = int_part.len() as i64 + exponent;
    if point < 0 {
        digits.insert_str(0, &"0".repeat(point.unsigned_abs() as usize));
        point = 0;
    }
    let point = point as usize;
    if point > digits.len() {
        digits.push_str(&"0".repeat(point - digits.len()));
    }

    let whole: i128 = match &digits[..point] {
        "" => 0,
        w => w.parse().ok()?,
    };
    let frac: Vec<u8> = digits[point..]
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .map(|b| b - b'0')
        .collect();

    let mut cents = whole
        .checked_mul(100)?
        .checked_add(i128::from(frac[0]) * 10 + i128::from(frac[1]))?;
    if frac[2] >= 5 {
        cents = cents.checked_add(1)?;
    }
    Some(if negative { -cents } else { cents })
}

fn group_digits(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use datatalk_core::QueryStats;
    use datatalk_intents::builtin_registry;
    use pretty_assertions::assert_eq;

    fn formatter() -> ResultFormatter {
        ResultFormatter::new(LocaleConfig::default()).unwrap()
    }

    fn result(columns: &[&str], rows: Vec<Vec<CellValue>>) -> ExecutionResult {
        let row_count = rows.len() as u64;
        ExecutionResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            stats: QueryStats {
                duration_ms: 5,
                row_count,
            },
        }
    }

    #[test]
    fn test_currency_table() {
        let f = formatter();
        let cases = [
            ("1234567.5", "PEN", "S/ 1,234,567.50"),
            ("0", "PEN", "S/ 0.00"),
            ("999.995", "PEN", "S/ 1,000.00"),
            ("-1234.5", "USD", "-$ 1,234.50"),
            ("1000000", "EUR", "€ 1,000,000.00"),
            ("-0.001", "PEN", "S/ 0.00"),
        ];
        for (raw, code, expected) in cases {
            assert_eq!(f.format_currency(raw, Some(code)).as_deref(), Some(expected), "{}", raw);
        }
    }

    #[test]
    fn test_currency_edge_inputs() {
        let f = formatter();
        assert_eq!(f.format_currency("1.5E+3", Some("USD")).as_deref(), Some("$ 1,500.00"));
        assert_eq!(f.format_currency("12.345", Some("GBP")).as_deref(), Some("S/ 12.35"));
        assert_eq!(f.format_currency(".5", None).as_deref(), Some("S/ 0.50"));
        assert_eq!(f.format_currency("abc", None), None);
        assert_eq!(f.format_currency("", None), None);
    }

    #[test]
    fn test_custom_separators() {
        let f = ResultFormatter::new(LocaleConfig {
            thousands_separator: ".".into(),
            decimal_separator: ",".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(f.format_currency("1234567.5", Some("EUR")).as_deref(), Some("€ 1.234.567,50"));
    }

    #[test]
    fn test_generic_cells() {
        let f = formatter();
        assert_eq!(f.cell(&CellValue::Int(-1234567)), Value::String("-1,234,567".into()));
        assert_eq!(f.cell(&CellValue::Int(999)), Value::String("999".into()));
        assert_eq!(f.cell(&CellValue::Bool(true)), Value::String("sí".into()));
        assert_eq!(f.cell(&CellValue::Bool(false)), Value::String("no".into()));
        assert_eq!(f.cell(&CellValue::Null), Value::Null);
        assert_eq!(
            f.cell(&CellValue::Decimal("1234.5".into())),
            Value::String("1,234.50".into())
        );
        assert_eq!(
            f.cell(&CellValue::Date(NaiveDate::from_ymd_opt(2025, 10, 5).unwrap())),
            Value::String("05/10/2025".into())
        );
        let ts = Utc.with_ymd_and_hms(2025, 10, 15, 17, 30, 0).unwrap();
        assert_eq!(f.cell(&CellValue::Timestamp(ts)), Value::String("15/10/2025 12:30".into()));
    }

    #[test]
    fn test_hidden_columns_dropped_and_totals_per_currency() {
        let registry = builtin_registry("odoo_replica.vw_invoices_semantic").unwrap();
        let descriptor = &registry.lookup("overdue_today").unwrap().descriptor;

        let row = |n: &str, amount: &str, code: &str| {
            vec![
                CellValue::Text(n.into()),
                CellValue::Text("ACME".into()),
                CellValue::Date(NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()),
                CellValue::Int(15),
                CellValue::Decimal(amount.into()),
                CellValue::Text(code.into()),
                CellValue::Decimal(amount.into()),
            ]
        };
        let raw = result(
            &[
                "invoice_number",
                "customer",
                "due_date",
                "days_overdue",
                "amount_residual",
                "currency",
                "amount_residual_num",
            ],
            vec![
                row("F001-1", "100.10", "PEN"),
                row("F001-2", "200.20", "PEN"),
                row("F001-3", "50", "USD"),
            ],
        );

        let formatted = formatter().format(Some(descriptor), &raw, 3);
        assert_eq!(
            formatted.columns,
            vec!["invoice_number", "customer", "due_date", "days_overdue", "amount_residual", "currency"]
        );
        assert_eq!(formatted.rows[0][4], Value::String("S/ 100.10".into()));
        assert_eq!(formatted.rows[2][4], Value::String("$ 50.00".into()));
        assert_eq!(formatted.rows[0][2], Value::String("30/09/2025".into()));
        assert_eq!(
            formatted.summary,
            "Se encontraron 3 facturas. Total: S/ 300.30; $ 50.00. Se muestran las primeras 3 filas."
        );
    }

    #[test]
    fn test_empty_summary() {
        let raw = result(&["customer"], vec![]);
        let formatted = formatter().format(None, &raw, 50);
        assert!(formatted.rows.is_empty());
        assert_eq!(formatted.summary, "No se encontraron resultados.");
    }

    #[test]
    fn test_empty_result_keeps_descriptor_columns() {
        let registry = builtin_registry("odoo_replica.vw_invoices_semantic").unwrap();
        let descriptor = &registry.lookup("top_clients_overdue").unwrap().descriptor;
        let formatted = formatter().format(Some(descriptor), &result(&[], vec![]), 10);
        assert_eq!(
            formatted.columns,
            vec!["customer", "currency", "invoices", "overdue_balance"]
        );
    }

    #[test]
    fn test_summary_without_descriptor() {
        let raw = result(&["n"], vec![vec![CellValue::Int(1)], vec![CellValue::Int(2)]]);
        assert_eq!(formatter().summary(None, &raw, 50), "Se encontraron 2 filas.");
    }
}
