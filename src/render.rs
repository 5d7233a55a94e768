//! Turning module content into panel display content.

use serde_json::Value;

use crate::highlight::{highlight, Format};
use crate::models::PanelContent;

/// Render a structured value as pretty JSON (two-space indent, key order kept).
pub fn to_json_text(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Render a structured value in the secondary `key: value` format.
///
/// Example output:
/// ```text
/// server:
///   host: localhost
///   ports:
///     - 80
///     - 443
/// debug: false
/// ```
pub fn to_secondary_text(value: &Value) -> String {
    let mut lines = Vec::new();
    match value {
        Value::Object(_) | Value::Array(_) if !is_empty_collection(value) => {
            write_block(value, 0, &mut lines)
        }
        scalar => lines.push(scalar_text(scalar)),
    }
    lines.join("\n")
}

fn write_block(value: &Value, depth: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                if is_block(item) {
                    lines.push(format!("{pad}{key}:"));
                    write_block(item, depth + 1, lines);
                } else {
                    lines.push(format!("{pad}{key}: {}", scalar_text(item)));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if is_block(item) {
                    lines.push(format!("{pad}-"));
                    write_block(item, depth + 1, lines);
                } else {
                    lines.push(format!("{pad}- {}", scalar_text(item)));
                }
            }
        }
        scalar => lines.push(format!("{pad}{}", scalar_text(scalar))),
    }
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_block(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_)) && !is_empty_collection(value)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Object(_) => "{}".to_string(),
        Value::Array(_) => "[]".to_string(),
        other => other.to_string(),
    }
}

/// Display content for a structured value.
pub fn structured_content(value: &Value, view_json: bool, highlighted: bool) -> PanelContent {
    let (text, format) = if view_json {
        (to_json_text(value), Format::Json)
    } else {
        (to_secondary_text(value), Format::Secondary)
    };
    presented(text, format, highlighted)
}

/// Display content for raw text. Raw text is always the secondary format.
pub fn raw_content(text: &str, highlighted: bool) -> PanelContent {
    presented(text.to_string(), Format::Secondary, highlighted)
}

fn presented(text: String, format: Format, highlighted: bool) -> PanelContent {
    if highlighted {
        PanelContent::Markup(highlight(&text, format))
    } else {
        PanelContent::Text(text)
    }
}
