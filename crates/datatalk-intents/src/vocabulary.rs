//! Spanish vocabulary: utterance → intent key plus extracted parameters.
//!
//! Keyword groups are matched on word boundaries; each intent collects points
//! from the groups present and the best positive score wins. Extraction only
//! proposes parameters. Explicit request parameters always take precedence.

use crate::catalog::{
    CUSTOMER_INVOICES, INVOICES_DUE_NEXT_DAYS, INVOICES_DUE_THIS_MONTH, OVERDUE_THIS_MONTH,
    OVERDUE_TODAY, TOP_CLIENTS_OVERDUE,
};
use datatalk_core::IntentKey;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;

const INVOICE: &[&str] = &["factura", "facturas", "comprobante", "comprobantes", "documento de venta"];
const PENDING: &[&str] = &["pendiente", "pendientes", "por pagar", "cuentas por cobrar", "pdp"];
const DUE: &[&str] = &["vencen", "vencimiento", "por vencer", "vence", "expira", "caduca"];
const OVERDUE: &[&str] = &[
    "vencida", "vencidas", "vencido", "vencidos", "atrasada", "atrasadas", "en mora",
];
const THIS_MONTH: &[&str] = &["este mes", "mes actual", "para este mes", "en el mes", "del mes"];
const TODAY: &[&str] = &["hoy", "al día de hoy", "para hoy"];
const TOP: &[&str] = &["top", "ranking", "mayor saldo", "más deuda", "mayores deudores"];
const CUSTOMER: &[&str] = &["cliente", "clientes", "razón social", "account"];

const NUMBER_WORDS: &[(&str, i64)] = &[
    ("una", 1), ("un", 1), ("uno", 1), ("dos", 2), ("tres", 3), ("cuatro", 4),
    ("cinco", 5), ("seis", 6), ("siete", 7), ("ocho", 8), ("nueve", 9), ("diez", 10),
    ("once", 11), ("doce", 12), ("trece", 13), ("catorce", 14), ("quince", 15),
];

fn words(list: &[&str]) -> Regex {
    let alternation = list
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    pattern(&format!(r"\b({alternation})\b"))
}

fn pattern(source: &str) -> Regex {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .expect("vocabulary pattern")
}

fn number_alternation() -> String {
    NUMBER_WORDS
        .iter()
        .map(|(w, _)| *w)
        .collect::<Vec<_>>()
        .join("|")
}

struct Patterns {
    invoice: Regex,
    pending: Regex,
    due: Regex,
    overdue: Regex,
    this_month: Regex,
    today: Regex,
    top: Regex,
    customer: Regex,
    whole_month: Regex,
    customer_name: Regex,
    day: Vec<Regex>,
    window: Regex,
    next_weeks_bare: Regex,
    currency: Vec<(Regex, &'static str)>,
    sort_desc: Regex,
    sort_asc: Regex,
    field_amount: Regex,
    field_date: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
    let numbers = number_alternation();
    Patterns {
        invoice: words(INVOICE),
        pending: words(PENDING),
        due: words(DUE),
        overdue: words(OVERDUE),
        this_month: words(THIS_MONTH),
        today: words(TODAY),
        top: words(TOP),
        customer: words(CUSTOMER),
        whole_month: pattern(r"\btodo\s+el\s+mes\b|\bmes\s+entero\b"),
        customer_name: pattern(r"\b(?:del|de\s+la|de)\s+cliente\s+(.+?)\s*[?.!]*$"),
        day: vec![
            pattern(r"\bd[ií]a\s+(\d{1,2})\b"),
            pattern(r"\b(?:el|las\s+del|los\s+del)\s+(\d{1,2})\b"),
            pattern(r"\b(\d{1,2})\s+(?:de\s+este|del\s+presente)\s+mes\b"),
        ],
        window: pattern(&format!(
            r"\b(?:pr[oó]xim[oa]s?|siguientes?)\s+(\d+|{numbers})\s+(semanas?|d[ií]as?)\b"
        )),
        next_weeks_bare: pattern(r"\b(?:pr[oó]xim[oa]s?|siguientes?)\s+semanas?\b"),
        currency: vec![
            (pattern(r"\b(?:en\s+)?(?:usd|d[oó]lar(?:es)?)\b|us\$"), "USD"),
            (pattern(r"\b(?:en\s+)?(?:pen|sol(?:es)?)\b|s/"), "PEN"),
            (pattern(r"\b(?:en\s+)?(?:eur|euros?)\b|€"), "EUR"),
        ],
        sort_desc: pattern(r"\bde\s+mayor\s+a\s+menor\b|\bdesc(?:endente)?\b|\bm[aá]s\s+altas?\b|\bmayores\b"),
        sort_asc: pattern(r"\bde\s+menor\s+a\s+mayor\b|\basc(?:endente)?\b|\bm[aá]s\s+bajas?\b|\bmenores\b"),
        field_amount: pattern(r"\b(?:monto|importe|saldo|residual)\b"),
        field_date: pattern(r"\b(?:fecha|vencimiento)\b"),
    }
});

/// Result of classifying one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    /// Best intent, or `None` when nothing scored.
    pub intent: Option<IntentKey>,
    pub score: u32,
    /// Parameters read from the utterance, named like the catalog's parameters.
    pub params: Map<String, Value>,
}

/// Built-in Spanish vocabulary for the invoice catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vocabulary;

impl Vocabulary {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, utterance: &str) -> Classification {
        let text = utterance.trim();
        if text.is_empty() {
            return Classification::default();
        }
        let p = &*PATTERNS;

        let has_pending = p.pending.is_match(text);
        let has_due = p.due.is_match(text);
        let has_overdue = p.overdue.is_match(text);
        let has_month = p.this_month.is_match(text) || p.whole_month.is_match(text);
        let has_today = p.today.is_match(text);
        let has_top = p.top.is_match(text);
        let has_client = p.customer.is_match(text);
        let has_window = p.window.is_match(text) || p.next_weeks_bare.is_match(text);
        // talking about pending, due or overdue items implies invoices
        let has_invoice =
            p.invoice.is_match(text) || has_pending || has_due || has_overdue || has_top;
        let customer_name = p
            .customer_name
            .captures(text)
            .map(|c| c[1].trim().to_string())
            .filter(|name| !name.is_empty());

        let mut scores: Vec<(&str, u32)> = Vec::new();
        let mut add = |intent: &'static str, points: u32| {
            match scores.iter_mut().find(|(k, _)| *k == intent) {
                Some((_, total)) => *total += points,
                None => scores.push((intent, points)),
            }
        };

        if has_invoice && (has_due || has_pending) && has_month && !has_overdue {
            add(INVOICES_DUE_THIS_MONTH, 5);
        }
        if has_invoice && has_month {
            add(INVOICES_DUE_THIS_MONTH, 2);
        }
        if has_invoice && has_today {
            add(OVERDUE_TODAY, 5);
        }
        if has_overdue && has_today {
            add(OVERDUE_TODAY, 2);
        }
        if has_overdue && !has_month {
            add(OVERDUE_TODAY, 3);
        }
        if has_overdue && has_month {
            add(OVERDUE_THIS_MONTH, 8);
        }
        if has_window && !has_overdue {
            add(INVOICES_DUE_NEXT_DAYS, 9);
        }
        if has_top && has_client && (has_due || has_pending || has_overdue) {
            add(TOP_CLIENTS_OVERDUE, 6);
        }
        if has_top && has_client {
            add(TOP_CLIENTS_OVERDUE, 6);
        }
        if customer_name.is_some() && !has_top {
            add(CUSTOMER_INVOICES, 10);
        }

        // first declared wins ties
        let best = scores
            .iter()
            .fold(None::<(&str, u32)>, |best, &(k, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((k, s)),
            });

        let mut params = self.extract_params(text);
        if let Some(name) = customer_name {
            params.insert("customer".to_string(), Value::String(name));
        }

        match best {
            Some((intent, score)) if score > 0 => Classification {
                intent: Some(IntentKey::new(intent)),
                score,
                params,
            },
            _ => Classification {
                intent: None,
                score: 0,
                params,
            },
        }
    }

    /// Parameters mentioned in the utterance: `day`, `days`, `currency`, `sort`.
    pub fn extract_params(&self, utterance: &str) -> Map<String, Value> {
        let p = &*PATTERNS;
        let text = utterance.to_lowercase();
        let mut params = Map::new();

        if let Some(day) = extract_day(p, &text) {
            params.insert("day".to_string(), Value::from(day));
        }
        if let Some(days) = extract_window_days(p, &text) {
            params.insert("days".to_string(), Value::from(days));
        }
        if p.whole_month.is_match(&text) {
            params.remove("day");
            params.remove("days");
        }
        if let Some(code) = p
            .currency
            .iter()
            .find(|(rx, _)| rx.is_match(&text))
            .map(|(_, code)| *code)
        {
            params.insert("currency".to_string(), Value::from(code));
        }
        if let Some(sort) = extract_sort(p, &text) {
            params.insert("sort".to_string(), Value::from(sort));
        }
        params
    }
}

fn extract_day(p: &Patterns, text: &str) -> Option<i64> {
    p.day
        .iter()
        .filter_map(|rx| rx.captures(text))
        .filter_map(|c| c[1].parse::<i64>().ok())
        .find(|d| (1..=31).contains(d))
}

fn number_value(token: &str) -> Option<i64> {
    token.parse::<i64>().ok().or_else(|| {
        NUMBER_WORDS
            .iter()
            .find(|(w, _)| *w == token)
            .map(|(_, n)| *n)
    })
}

fn extract_window_days(p: &Patterns, text: &str) -> Option<i64> {
    if let Some(c) = p.window.captures(text) {
        let count = number_value(&c[1]).unwrap_or(1);
        return Some(if c[2].starts_with("semana") {
            count.clamp(1, 12) * 7
        } else {
            count.clamp(1, 90)
        });
    }
    // "próximas semanas" without a count means two weeks
    p.next_weeks_bare.is_match(text).then_some(14)
}

fn extract_sort(p: &Patterns, text: &str) -> Option<&'static str> {
    let desc = p.sort_desc.is_match(text);
    let asc = p.sort_asc.is_match(text);
    if p.field_amount.is_match(text) {
        return Some(if asc && !desc { "amount_asc" } else { "amount_desc" });
    }
    // a direction without an amount word orders by due date
    match (desc, asc) {
        (true, _) => Some("date_desc"),
        (false, true) => Some("date_asc"),
        _ if p.field_date.is_match(text) => Some("date_asc"),
        _ => None,
    }
}
