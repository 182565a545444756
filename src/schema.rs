//! Column schema proposal from detected headers and rows.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{LoadError, LoadResult};
use crate::inference::{InferenceOptions, detect_type_with};
use crate::store::sanitize_identifier;
use crate::types::{ColumnSchema, ColumnType};

/// Number of leading rows sampled per column for type inference.
pub const TYPE_SAMPLE_ROWS: usize = 100;
/// Maximum number of preview values kept per column.
pub const PREVIEW_VALUES: usize = 5;

/// Options controlling [`detect_schema_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemaOptions {
    /// See [`TYPE_SAMPLE_ROWS`].
    pub sample_rows: usize,
    /// See [`PREVIEW_VALUES`].
    pub preview_values: usize,
    pub inference: InferenceOptions,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            sample_rows: TYPE_SAMPLE_ROWS,
            preview_values: PREVIEW_VALUES,
            inference: InferenceOptions::default(),
        }
    }
}

/// Propose one column per header, in header order.
pub fn detect_schema<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) -> Vec<ColumnSchema> {
    detect_schema_with(headers, rows, &SchemaOptions::default())
}

pub fn detect_schema_with<H: AsRef<str>>(
    headers: &[H],
    rows: &[Vec<String>],
    options: &SchemaOptions,
) -> Vec<ColumnSchema> {
    let sample = &rows[..rows.len().min(options.sample_rows)];

    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let values: Vec<&str> = sample
                .iter()
                .filter_map(|row| row.get(idx).map(String::as_str))
                .collect();
            let column_type = detect_type_with(&values, &options.inference);
            let preview = values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .take(options.preview_values)
                .map(str::to_owned)
                .collect();
            ColumnSchema {
                name: header.as_ref().trim().to_string(),
                column_type,
                sample: preview,
            }
        })
        .collect()
}

/// A per-column change requested during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnOverride {
    /// Zero-based column position.
    pub index: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub column_type: Option<ColumnType>,
}

/// Apply overrides in place. Fails if an override points past the last column or renames a
/// column to a blank name.
pub fn apply_overrides(schema: &mut [ColumnSchema], overrides: &[ColumnOverride]) -> LoadResult<()> {
    let width = schema.len();
    for o in overrides {
        let column = schema.get_mut(o.index).ok_or_else(|| {
            LoadError::schema(format!("override for column {} but schema has {width} columns", o.index))
        })?;
        if let Some(name) = &o.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(LoadError::schema(format!("override for column {} has a blank name", o.index)));
            }
            column.name = name.to_string();
        }
        if let Some(column_type) = o.column_type {
            column.column_type = column_type;
        }
    }
    Ok(())
}

/// Reject schemas whose column names collide once sanitized (e.g. `a-b` and `a b`).
///
/// SQLite column names are case-insensitive, so `Name` and `name` collide as well.
pub fn check_identifiers(schema: &[ColumnSchema]) -> LoadResult<()> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(schema.len());
    for column in schema {
        let sanitized = sanitize_identifier(&column.name);
        if let Some(previous) = seen.insert(sanitized.to_ascii_lowercase(), &column.name) {
            return Err(LoadError::schema(format!(
                "columns '{previous}' and '{}' both sanitize to '{sanitized}'",
                column.name
            )));
        }
    }
    Ok(())
}
