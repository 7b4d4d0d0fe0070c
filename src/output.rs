//! Rendering of labelled result sets.
//!
//! Text output writes one row per line in the row's own shape; JSON output
//! writes one JSON document per result set.

use crate::db::{ObjectRow, OutFormat, QueryResult, Rows, Value};
use serde::Serialize;
use std::io::Write;

/// How result sets are written to the output channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputStyle {
    /// Human-readable rows under a label line.
    #[default]
    Text,
    /// One JSON object per result set (JSON Lines).
    Json,
}

impl std::str::FromStr for OutputStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output style: {s}. Expected: text or json")),
        }
    }
}

/// Builds the label printed above a result set.
///
/// `requested_default` is true when the caller left the format to the client.
pub fn label(title: &str, format: OutFormat, requested_default: bool) -> String {
    let format = format.as_str().to_uppercase();
    if requested_default {
        format!("----- {title} (default {format} output format) --------")
    } else {
        format!("----- {title} ({format} output format) --------")
    }
}

/// Writes labelled result sets in the configured style.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultPrinter {
    style: OutputStyle,
}

#[derive(Serialize)]
struct JsonResultSet<'a> {
    label: &'a str,
    out_format: OutFormat,
    row_count: usize,
    was_truncated: bool,
    rows: &'a Rows,
}

impl ResultPrinter {
    pub fn new(style: OutputStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> OutputStyle {
        self.style
    }

    /// Writes `result` preceded by `label` and flushes the writer.
    pub fn print<W: Write + ?Sized>(
        &self,
        out: &mut W,
        label: &str,
        result: &QueryResult,
    ) -> std::io::Result<()> {
        match self.style {
            OutputStyle::Text => write_text(out, label, result)?,
            OutputStyle::Json => {
                let document = JsonResultSet {
                    label,
                    out_format: result.out_format(),
                    row_count: result.row_count,
                    was_truncated: result.was_truncated,
                    rows: &result.rows,
                };
                serde_json::to_writer(&mut *out, &document)?;
                writeln!(out)?;
            }
        }
        out.flush()
    }
}

fn write_text<W: Write + ?Sized>(
    out: &mut W,
    label: &str,
    result: &QueryResult,
) -> std::io::Result<()> {
    writeln!(out, "{label}")?;
    if result.rows.is_empty() {
        writeln!(out, "(no rows)")?;
    }
    match &result.rows {
        Rows::Array(rows) => {
            for row in rows {
                writeln!(out, "{}", format_array_row(row))?;
            }
        }
        Rows::Object(rows) => {
            for row in rows {
                writeln!(out, "{}", format_object_row(row))?;
            }
        }
    }
    if let Some(warning) = result.truncation_warning() {
        writeln!(out, "{warning}")?;
    }
    Ok(())
}

/// Formats a positional row as `[1400, "Seattle"]`.
pub fn format_array_row(row: &[Value]) -> String {
    let values: Vec<String> = row.iter().map(Value::to_literal).collect();
    format!("[{}]", values.join(", "))
}

/// Formats a keyed row as `{location_id: 1400, city: "Seattle"}`.
pub fn format_object_row(row: &ObjectRow) -> String {
    let fields: Vec<String> = row
        .iter()
        .map(|(key, value)| format!("{key}: {}", value.to_literal()))
        .collect();
    format!("{{{}}}", fields.join(", "))
}
