//! Result table rendering.
//!
//! Turns a [`TabularResult`] into the HTML table shown under a cell. Values are
//! stringified, then escaped, then placed into cells; long results are cut at
//! the configured row limit with a trailing `...` row.

use crate::config::OutputSettings;
use crate::db::{TabularResult, Value};
use once_cell::sync::Lazy;
use regex::Regex;

/// Shown instead of a table when a statement returned no rows.
pub const EMPTY_RESULTS_TABLE: &str = "*Empty Results Table*";

/// Value of every cell in the row appended to truncated tables.
pub const ELLIPSIS: &str = "...";

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\n\r]+").expect("line break pattern is valid"));

/// Renders a result as an HTML table fragment.
pub fn render_table(result: &TabularResult, settings: &OutputSettings) -> String {
    if result.is_empty() {
        return EMPTY_RESULTS_TABLE.to_string();
    }

    let max_rows = settings.max_result_rows;
    let ellipsis_row: Vec<Value>;
    let mut rows: Vec<&[Value]> = result.rows.iter().take(max_rows).map(Vec::as_slice).collect();
    if result.len() > max_rows {
        ellipsis_row = vec![Value::from(ELLIPSIS); result.columns.len()];
        rows.push(&ellipsis_row);
    }

    let header = html_row(
        "th",
        result.column_names().map(|name| escape_cell(&collapse_line_breaks(name))),
    );
    let body = rows
        .iter()
        .map(|row| html_row("td", row.iter().map(|v| escape_cell(&stringify_value(v)))))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
  <div>
  <style scoped>
    table {{
      font-family: {font}
    }}
    table tbody tr:not(:first-child) td {{
      border-top: none;
      padding-top: 3px;
    }}
    table tbody tr:not(:last-child) td {{
      border-bottom: none;
      padding-bottom: 3px;
    }}
  </style>
  <table>
    <thead>
      {header}
    </thead>
    <tbody>
      {body}
    </tbody>
  </table>
  </div>"#,
        font = settings.font_family,
    )
}

fn html_row(tag: &str, cells: impl Iterator<Item = String>) -> String {
    let content: String = cells.map(|cell| format!("<{tag}>{cell}</{tag}>")).collect();
    format!("<tr>{content}</tr>")
}

/// Turns a value into the text placed in a table cell, before escaping.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        Value::Json(json) => serde_json::to_string(json).unwrap_or_else(|_| json.to_string()),
        Value::String(s) => collapse_line_breaks(s),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
    }
}

fn collapse_line_breaks(s: &str) -> String {
    LINE_BREAKS.replace_all(s, " ").into_owned()
}

/// Escapes text for an HTML table cell.
///
/// A backslash maps to `&apos;`; existing notebooks render with that mapping.
pub fn escape_cell(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\\', "&apos;")
        .replace(' ', "&nbsp;")
}
