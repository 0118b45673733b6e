//! Chat-style markdown tables.

use serde_json::Value;

/// Render a header, a separator and up to `max_rows` rows.
pub fn markdown_table(columns: &[String], rows: &[Vec<Value>], max_rows: usize) -> String {
    if rows.is_empty() {
        return "_(sin resultados)_".to_string();
    }

    let mut lines = Vec::with_capacity(rows.len().min(max_rows) + 2);
    lines.push(format!(
        "| {} |",
        columns.iter().map(|c| escape(c)).collect::<Vec<_>>().join(" | ")
    ));
    lines.push(format!("|{}|", vec!["---"; columns.len()].join("|")));
    for row in rows.iter().take(max_rows) {
        let cells: Vec<String> = row.iter().map(cell).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape(s),
        other => escape(&other.to_string()),
    }
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
