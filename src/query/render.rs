//! Markdown rendering of query results for LLM consumption.

use crate::warehouse::{QueryResult, Value};

/// Renders a result set as a Markdown table, showing at most `max_rows` rows.
pub fn markdown_table(result: &QueryResult, max_rows: usize) -> String {
    if result.columns.is_empty() {
        return "Query completed with no result columns.".to_string();
    }
    if result.rows.is_empty() {
        return "Query returned no rows.".to_string();
    }

    let mut out = String::new();

    let headers: Vec<String> = result.columns.iter().map(|c| escape_cell(&c.name)).collect();
    out.push_str(&format!("| {} |\n", headers.join(" | ")));
    let separators: Vec<&str> = result
        .columns
        .iter()
        .map(|c| if c.is_numeric() { "---:" } else { "---" })
        .collect();
    out.push_str(&format!("| {} |\n", separators.join(" | ")));

    for row in result.rows.iter().take(max_rows) {
        let cells: Vec<String> = row.iter().map(render_value).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    let shown = result.rows.len().min(max_rows);
    let total = result
        .total_rows
        .unwrap_or(result.row_count as u64)
        .max(result.rows.len() as u64);
    if (shown as u64) < total {
        out.push_str(&format!("\n_Showing {shown} of {total} rows._\n"));
    }

    out
}

fn render_value(value: &Value) -> String {
    escape_cell(&value.to_display_string())
}

/// Escapes pipes and flattens newlines so a value stays inside its cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
