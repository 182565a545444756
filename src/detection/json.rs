//! JSON records.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`. Headers are the keys of the first object, in
//!   the order they appear.
//! - Newline-delimited JSON: `{"a":1}\n{"b":2}\n`. Headers are the sorted union of every key seen;
//!   malformed or non-object lines are skipped.
//!
//! Cells are rendered to strings: strings as-is, numbers and booleans in their JSON spelling,
//! `null` and missing keys as empty strings, nested arrays/objects as compact JSON.

use std::collections::BTreeSet;

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::types::{DetectedFormat, DetectedTable};

/// Parse JSON text into a table. Never fails; unusable input yields an empty table.
pub fn parse_json(text: &str) -> DetectedTable {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return DetectedTable::empty(DetectedFormat::JsonRecords);
    }

    if let Ok(JsonValue::Array(items)) = serde_json::from_str::<JsonValue>(trimmed) {
        if let Some(JsonValue::Object(first)) = items.first() {
            let headers: Vec<String> = first.keys().cloned().collect();
            let rows: Vec<Vec<String>> = items
                .iter()
                .filter_map(|item| match item {
                    JsonValue::Object(obj) => Some(render_row(obj, &headers)),
                    other => {
                        debug!(kind = json_kind(other), "skipping non-object array element");
                        None
                    }
                })
                .collect();
            return records_table(headers, rows);
        }
    }

    parse_ndjson(trimmed)
}

fn parse_ndjson(text: &str) -> DetectedTable {
    let mut objects = Vec::new();
    for (idx0, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonValue>(line) {
            Ok(JsonValue::Object(obj)) => objects.push(obj),
            Ok(other) => debug!(line = idx0 + 1, kind = json_kind(&other), "skipping non-object line"),
            Err(e) => debug!(line = idx0 + 1, error = %e, "skipping malformed json line"),
        }
    }

    if objects.is_empty() {
        return DetectedTable::empty(DetectedFormat::JsonRecords);
    }

    let keys: BTreeSet<&String> = objects.iter().flat_map(|o| o.keys()).collect();
    let headers: Vec<String> = keys.into_iter().cloned().collect();
    let rows = objects.iter().map(|o| render_row(o, &headers)).collect();
    records_table(headers, rows)
}

fn records_table(headers: Vec<String>, rows: Vec<Vec<String>>) -> DetectedTable {
    DetectedTable {
        format: DetectedFormat::JsonRecords,
        headers,
        raw_rows: rows.clone(),
        rows,
        has_header: true,
        degradations: Vec::new(),
    }
}

fn render_row(obj: &Map<String, JsonValue>, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| obj.get(h).map(render_cell).unwrap_or_default())
        .collect()
}

fn render_cell(v: &JsonValue) -> String {
    match v {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
