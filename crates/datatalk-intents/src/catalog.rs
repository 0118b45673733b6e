//! Built-in invoice intents.
//!
//! Every template reads from one semantic view exposing
//! `invoice_number, customer, due_date, amount_residual, currency,
//! is_pending, is_overdue, days_overdue`.

use crate::descriptor::{
    ColumnKind, ColumnSpec, ParamDefault, ParamKind, ParamSpec, SummarySpec, TemplateContext,
    TemplateDescriptor, TemplateFn,
};
use crate::error::RegistryError;
use crate::registry::IntentRegistry;

pub const INVOICES_DUE_THIS_MONTH: &str = "invoices_due_this_month";
pub const OVERDUE_TODAY: &str = "overdue_today";
pub const OVERDUE_THIS_MONTH: &str = "overdue_this_month";
pub const INVOICES_DUE_NEXT_DAYS: &str = "invoices_due_next_days";
pub const TOP_CLIENTS_OVERDUE: &str = "top_clients_overdue";
pub const CUSTOMER_INVOICES: &str = "customer_invoices";

pub const CURRENCIES: &[&str] = &["USD", "PEN", "EUR"];
const SORTS: &[&str] = &["date_asc", "date_desc", "amount_desc", "amount_asc"];
const OVERDUE_SORTS: &[&str] = &["overdue_desc", "date_asc", "date_desc", "amount_desc", "amount_asc"];

const INVOICE_COLUMNS: &str = "invoice_number, customer, due_date, \
     round(amount_residual, 2) AS amount_residual, currency, \
     amount_residual AS amount_residual_num";
const OVERDUE_COLUMNS: &str = "invoice_number, customer, due_date, days_overdue, \
     round(amount_residual, 2) AS amount_residual, currency, \
     amount_residual AS amount_residual_num";

/// Build the registry holding every built-in intent, reading from `view`.
pub fn builtin_registry(view: &str) -> Result<IntentRegistry, RegistryError> {
    let mut registry = IntentRegistry::new();

    registry.register(
        INVOICES_DUE_THIS_MONTH,
        invoice_listing(
            view,
            "Pending invoices due within the current month",
            vec![
                ParamSpec::placeholder("due_from", ParamKind::Date, ParamDefault::StartOfMonth)
                    .with_description("first due date included"),
                ParamSpec::placeholder("due_to", ParamKind::Date, ParamDefault::StartOfNextMonth)
                    .with_description("first due date excluded"),
                ParamSpec::placeholder("day", ParamKind::Integer { min: 1, max: 31 }, ParamDefault::Null)
                    .with_description("only this day of the month"),
                currency_param(),
                ParamSpec::fragment("sort", SORTS, "date_asc"),
            ],
            false,
            due_this_month,
        ),
    )?;
    registry.register_alias("vencen_mes", INVOICES_DUE_THIS_MONTH)?;
    registry.register_alias("facturas_vencen_mes", INVOICES_DUE_THIS_MONTH)?;

    registry.register(
        OVERDUE_TODAY,
        invoice_listing(
            view,
            "Invoices overdue as of today",
            vec![currency_param(), ParamSpec::fragment("sort", OVERDUE_SORTS, "overdue_desc")],
            true,
            overdue_today,
        ),
    )?;
    registry.register_alias("vencidas_hoy", OVERDUE_TODAY)?;

    registry.register(
        OVERDUE_THIS_MONTH,
        invoice_listing(
            view,
            "Overdue invoices whose due date falls in the given month",
            vec![
                ParamSpec::placeholder("month_of", ParamKind::Date, ParamDefault::Today)
                    .with_description("any date within the month"),
                currency_param(),
                ParamSpec::fragment("sort", OVERDUE_SORTS, "overdue_desc"),
            ],
            true,
            overdue_this_month,
        ),
    )?;
    registry.register_alias("vencidas_mes", OVERDUE_THIS_MONTH)?;

    registry.register(
        INVOICES_DUE_NEXT_DAYS,
        invoice_listing(
            view,
            "Pending invoices due in the next N days",
            vec![
                ParamSpec::placeholder("from", ParamKind::Date, ParamDefault::Today)
                    .with_description("start of the window"),
                ParamSpec::placeholder("days", ParamKind::Integer { min: 1, max: 90 }, ParamDefault::Integer(14))
                    .with_description("window length in days"),
                currency_param(),
                ParamSpec::fragment("sort", SORTS, "date_asc"),
            ],
            false,
            due_next_days,
        ),
    )?;
    registry.register_alias("vencen_proximos_dias", INVOICES_DUE_NEXT_DAYS)?;

    registry.register(
        TOP_CLIENTS_OVERDUE,
        TemplateDescriptor {
            description: "Customers with the largest overdue balance".to_string(),
            view: view.to_string(),
            params: vec![currency_param()],
            columns: vec![
                ColumnSpec::new("customer", ColumnKind::Text),
                ColumnSpec::new("currency", ColumnKind::Text),
                ColumnSpec::new("invoices", ColumnKind::Integer),
                ColumnSpec::currency("overdue_balance", "currency"),
                ColumnSpec::hidden(
                    "overdue_balance_num",
                    ColumnKind::Currency {
                        code_column: "currency".to_string(),
                    },
                ),
            ],
            row_cap: Some(10),
            summary: Some(SummarySpec {
                noun: "clientes".to_string(),
                total_column: Some("overdue_balance_num".to_string()),
                currency_column: Some("currency".to_string()),
            }),
            template: top_clients_overdue,
        },
    )?;
    registry.register_alias("top_clientes_vencido", TOP_CLIENTS_OVERDUE)?;

    registry.register(
        CUSTOMER_INVOICES,
        invoice_listing(
            view,
            "Pending invoices of customers whose name contains the given text",
            vec![
                ParamSpec::placeholder("customer", ParamKind::Text { max_len: 80 }, ParamDefault::Required)
                    .with_description("part of the customer name"),
                currency_param(),
                ParamSpec::fragment("sort", SORTS, "date_asc"),
            ],
            false,
            customer_invoices,
        ),
    )?;
    registry.register_alias("facturas_cliente", CUSTOMER_INVOICES)?;

    Ok(registry)
}

fn currency_param() -> ParamSpec {
    ParamSpec::placeholder("currency", ParamKind::enumeration(CURRENCIES), ParamDefault::Null)
        .with_description("ISO currency code")
}

fn invoice_listing(
    view: &str,
    description: &str,
    params: Vec<ParamSpec>,
    overdue: bool,
    template: TemplateFn,
) -> TemplateDescriptor {
    let mut columns = vec![
        ColumnSpec::new("invoice_number", ColumnKind::Text),
        ColumnSpec::new("customer", ColumnKind::Text),
        ColumnSpec::new("due_date", ColumnKind::Date),
    ];
    if overdue {
        columns.push(ColumnSpec::new("days_overdue", ColumnKind::Integer));
    }
    columns.extend([
        ColumnSpec::currency("amount_residual", "currency"),
        ColumnSpec::new("currency", ColumnKind::Text),
        ColumnSpec::hidden(
            "amount_residual_num",
            ColumnKind::Currency {
                code_column: "currency".to_string(),
            },
        ),
    ]);

    TemplateDescriptor {
        description: description.to_string(),
        view: view.to_string(),
        params,
        columns,
        row_cap: None,
        summary: Some(SummarySpec {
            noun: "facturas".to_string(),
            total_column: Some("amount_residual_num".to_string()),
            currency_column: Some("currency".to_string()),
        }),
        template,
    }
}

fn order_by(choice: &str) -> &'static str {
    match choice {
        "date_desc" => "due_date DESC, customer",
        "amount_desc" => "amount_residual_num DESC, due_date",
        "amount_asc" => "amount_residual_num ASC, due_date",
        "overdue_desc" => "days_overdue DESC, amount_residual_num DESC",
        _ => "due_date ASC, customer",
    }
}

fn currency_filter(ctx: &TemplateContext<'_>) -> String {
    let p = ctx.placeholder("currency");
    format!("({p}::text IS NULL OR currency = {p})")
}

fn due_this_month(ctx: &TemplateContext<'_>) -> String {
    let day = ctx.placeholder("day");
    format!(
        "SELECT {INVOICE_COLUMNS}\n\
         FROM {view}\n\
         WHERE is_pending\n  \
           AND due_date >= {from} AND due_date < {to}\n  \
           AND ({day}::int IS NULL OR EXTRACT(DAY FROM due_date) = {day})\n  \
           AND {currency}\n\
         ORDER BY {order}",
        view = ctx.view(),
        from = ctx.placeholder("due_from"),
        to = ctx.placeholder("due_to"),
        currency = currency_filter(ctx),
        order = order_by(ctx.choice("sort")),
    )
}

fn overdue_today(ctx: &TemplateContext<'_>) -> String {
    format!(
        "SELECT {OVERDUE_COLUMNS}\n\
         FROM {view}\n\
         WHERE is_overdue\n  \
           AND {currency}\n\
         ORDER BY {order}",
        view = ctx.view(),
        currency = currency_filter(ctx),
        order = order_by(ctx.choice("sort")),
    )
}

fn overdue_this_month(ctx: &TemplateContext<'_>) -> String {
    format!(
        "SELECT {OVERDUE_COLUMNS}\n\
         FROM {view}\n\
         WHERE is_overdue\n  \
           AND date_trunc('month', due_date) = date_trunc('month', {month}::date)\n  \
           AND {currency}\n\
         ORDER BY {order}",
        view = ctx.view(),
        month = ctx.placeholder("month_of"),
        currency = currency_filter(ctx),
        order = order_by(ctx.choice("sort")),
    )
}

fn due_next_days(ctx: &TemplateContext<'_>) -> String {
    let from = ctx.placeholder("from");
    format!(
        "SELECT {INVOICE_COLUMNS}\n\
         FROM {view}\n\
         WHERE is_pending\n  \
           AND due_date >= {from} AND due_date < {from}::date + {days}::int\n  \
           AND {currency}\n\
         ORDER BY {order}",
        view = ctx.view(),
        days = ctx.placeholder("days"),
        currency = currency_filter(ctx),
        order = order_by(ctx.choice("sort")),
    )
}

fn top_clients_overdue(ctx: &TemplateContext<'_>) -> String {
    format!(
        "SELECT customer, currency, COUNT(*) AS invoices, \
         round(SUM(amount_residual), 2) AS overdue_balance, \
         SUM(amount_residual) AS overdue_balance_num\n\
         FROM {view}\n\
         WHERE is_overdue\n  \
           AND {currency}\n\
         GROUP BY customer, currency\n\
         ORDER BY overdue_balance_num DESC, customer",
        view = ctx.view(),
        currency = currency_filter(ctx),
    )
}

fn customer_invoices(ctx: &TemplateContext<'_>) -> String {
    format!(
        "SELECT {INVOICE_COLUMNS}\n\
         FROM {view}\n\
         WHERE is_pending\n  \
           AND customer ILIKE ('%' || {customer} || '%')\n  \
           AND {currency}\n\
         ORDER BY {order}",
        view = ctx.view(),
        customer = ctx.placeholder("customer"),
        currency = currency_filter(ctx),
        order = order_by(ctx.choice("sort")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog_registers_all_intents() {
        let registry = builtin_registry("odoo_replica.vw_invoices_semantic").unwrap();
        let keys: Vec<&str> = registry.entries().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                CUSTOMER_INVOICES,
                INVOICES_DUE_NEXT_DAYS,
                INVOICES_DUE_THIS_MONTH,
                OVERDUE_THIS_MONTH,
                OVERDUE_TODAY,
                TOP_CLIENTS_OVERDUE,
            ]
        );
        for alias in ["vencen_mes", "facturas_vencen_mes", "vencidas_hoy", "top_clientes_vencido"] {
            assert!(registry.contains(alias), "alias {alias} missing");
        }
    }

    #[test]
    fn test_every_sort_has_a_distinct_shape() {
        let registry = builtin_registry("v").unwrap();
        let entry = registry.lookup(OVERDUE_TODAY).unwrap();
        assert_eq!(entry.shapes().len(), OVERDUE_SORTS.len());
        let distinct: std::collections::BTreeSet<&String> = entry.shapes().iter().collect();
        assert_eq!(distinct.len(), OVERDUE_SORTS.len());
    }

    #[test]
    fn test_templates_read_only_their_view() {
        let registry = builtin_registry("odoo_replica.vw_invoices_semantic").unwrap();
        for shape in registry.template_shapes() {
            assert_eq!(shape.matches("\nFROM ").count(), 1, "{shape}");
            assert!(shape.contains("\nFROM odoo_replica.vw_invoices_semantic\n"));
            assert!(!shape.contains(';'));
            assert!(!shape.contains("LIMIT"));
        }
    }

    #[test]
    fn test_top_clients_is_capped_at_ten() {
        let registry = builtin_registry("v").unwrap();
        let entry = registry.lookup("top_clientes_vencido").unwrap();
        assert_eq!(entry.descriptor.row_cap, Some(10));
        assert!(entry.shapes()[0].contains("GROUP BY customer, currency"));
    }
}
