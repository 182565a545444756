//! Whitespace-separated text.
//!
//! Fields are runs of non-whitespace; single- or double-quoted segments are kept whole, so
//! `"New York" 12` is two fields. Quote characters surrounding a field are stripped.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{DetectedFormat, DetectedTable, synthesized_headers};

use super::delimited::first_row_has_text;

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:[^\s"']+|"[^"]*"|'[^']*')+"#).expect("field pattern is valid"));

/// Split a single line into fields.
pub fn split_fields(line: &str) -> Vec<String> {
    FIELD
        .find_iter(line)
        .map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\'').to_string())
        .collect()
}

/// Parse whitespace-separated text. Header iff some field of the first row is not a number.
pub fn parse_whitespace(text: &str) -> DetectedTable {
    let raw_rows: Vec<Vec<String>> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(split_fields)
        .filter(|fields| !fields.is_empty())
        .collect();

    let Some(first) = raw_rows.first() else {
        return DetectedTable::empty(DetectedFormat::WhitespaceText);
    };

    let has_header = first_row_has_text(first.iter().map(String::as_str));
    let (headers, rows) = if has_header {
        (first.clone(), raw_rows[1..].to_vec())
    } else {
        (synthesized_headers(first.len()), raw_rows.clone())
    };

    DetectedTable {
        format: DetectedFormat::WhitespaceText,
        headers,
        rows,
        has_header,
        raw_rows,
        degradations: Vec::new(),
    }
}
