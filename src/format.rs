//! Rendering of query results for the terminal.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

use crate::error::{AppError, AppResult};
use crate::models::QueryResult;

/// Output format for result tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ASCII table format (like MySQL CLI)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// The full result as pretty JSON
    Json,
}

pub fn format_result(result: &QueryResult, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Table => Ok(format_as_table(result)),
        OutputFormat::Markdown => Ok(format_as_markdown(result)),
        OutputFormat::Json => serde_json::to_string_pretty(result)
            .map_err(|e| AppError::internal(format!("Failed to serialize result: {}", e))),
    }
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

fn cell(row: &[JsonValue], idx: usize) -> &JsonValue {
    row.get(idx).unwrap_or(&JsonValue::Null)
}

fn footer(result: &QueryResult) -> String {
    let seconds = result.execution_time_ms as f64 / 1000.0;
    let mut footer = if result.is_empty() {
        format!("Empty set ({:.2} sec)\n", seconds)
    } else {
        let row_text = if result.row_count() == 1 { "row" } else { "rows" };
        format!(
            "{} {} in set ({:.2} sec)\n",
            result.row_count(),
            row_text,
            seconds
        )
    };
    if result.truncated {
        footer.push_str(&format!(
            "Output truncated to the first {} rows\n",
            result.row_count()
        ));
    }
    footer
}

pub fn format_as_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return footer(result);
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.name.width()).collect();
    for row in &result.rows {
        for (i, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(format_value(cell(row, i)).width());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| pad(&col.name, *w, Align::Center))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in &result.rows {
        let line: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = cell(row, i);
                let align = if matches!(value, JsonValue::Number(_)) {
                    Align::Right
                } else {
                    Align::Left
                };
                pad(&format_value(value), *w, align)
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }
    if !result.rows.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&footer(result));
    output
}

enum Align {
    Left,
    Right,
    Center,
}

/// `| text |` padded by display width, so wide characters line up.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    let (left, right) = match align {
        Align::Left => (0, fill),
        Align::Right => (fill, 0),
        Align::Center => (fill / 2, fill - fill / 2),
    };
    format!("| {}{}{} ", " ".repeat(left), text, " ".repeat(right))
}

pub fn format_as_markdown(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return "*Empty set*\n".to_string();
    }

    let mut output = String::new();

    let header: String = result
        .columns
        .iter()
        .map(|c| format!("| {} ", escape_markdown(&c.name)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = result.columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in &result.rows {
        let line: String = (0..result.columns.len())
            .map(|i| format!("| {} ", escape_markdown(&format_value(cell(row, i)))))
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }

    output.push_str(&format!("\n*{} rows*", result.row_count()));
    if result.truncated {
        output.push_str(" *(truncated)*");
    }
    output.push('\n');

    output
}

fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
