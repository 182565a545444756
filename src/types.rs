//! Core data model shared by detection, schema inference and loading.
//!
//! Detection produces a [`DetectedTable`] of raw strings; schema inference turns its headers into
//! an ordered list of [`ColumnSchema`]s; loading coerces each cell into a typed [`Value`].

use std::fmt;

use serde::Deserialize;

/// Storage type of a column in the target relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// Free-form text (also the fallback for empty or mostly non-numeric columns).
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point number.
    Real,
}

impl ColumnType {
    /// SQL type name used in `CREATE TABLE`.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }

    /// Parse a type name (case-insensitive, surrounding whitespace ignored).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Some(Self::Text),
            "INTEGER" => Some(Self::Integer),
            "REAL" => Some(Self::Real),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A single proposed (or confirmed) column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Column name as it appears in the source (sanitized only when the relation is created).
    pub name: String,
    /// Inferred storage type.
    pub column_type: ColumnType,
    /// Up to a handful of non-blank preview values, in row order.
    pub sample: Vec<String>,
}

impl ColumnSchema {
    /// Create a column without preview values.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            sample: Vec::new(),
        }
    }
}

/// Serialization detected for an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    /// One record per line, fields separated by the given character.
    Delimited(char),
    /// A JSON array of objects, or newline-delimited JSON objects.
    JsonRecords,
    /// Fields separated by runs of whitespace, with quoted runs kept whole.
    WhitespaceText,
}

impl DetectedFormat {
    /// Short name shown to operators.
    pub fn name(self) -> &'static str {
        match self {
            Self::Delimited(_) => "CSV",
            Self::JsonRecords => "JSON",
            Self::WhitespaceText => "TEXT",
        }
    }
}

impl fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A heuristic that fell back to its documented default.
///
/// Degradations are not errors; they are recorded on the [`DetectedTable`] and logged so callers
/// (and tests) can tell a confident detection from a defaulted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// No candidate delimiter split the sample into two or more fields; comma was assumed.
    DelimiterDefaulted,
    /// The statistical header sniff could not decide; the non-numeric first row rule was used.
    HeaderSniffFailed,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DelimiterDefaulted => f.write_str("delimiter defaulted to ','"),
            Self::HeaderSniffFailed => f.write_str("header sniff failed; used non-numeric first row rule"),
        }
    }
}

/// Result of parsing a file of unknown layout.
///
/// `rows` are the data rows (header row excluded). `raw_rows` are every parsed row, including a
/// textual header row when one was detected. Rows may be ragged.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    /// Serialization the rows were parsed with.
    pub format: DetectedFormat,
    /// Column names, detected or synthesized.
    pub headers: Vec<String>,
    /// Data rows.
    pub rows: Vec<Vec<String>>,
    /// Whether a header was detected in the source.
    pub has_header: bool,
    /// All parsed rows, header row included.
    pub raw_rows: Vec<Vec<String>>,
    /// Heuristics that fell back to defaults while producing this table.
    pub degradations: Vec<Degradation>,
}

impl DetectedTable {
    /// An empty table (no headers, no rows).
    pub fn empty(format: DetectedFormat) -> Self {
        Self {
            format,
            headers: Vec::new(),
            rows: Vec::new(),
            has_header: false,
            raw_rows: Vec::new(),
            degradations: Vec::new(),
        }
    }

    /// Returns true if there is nothing to load.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A single coerced cell, ready to be bound to an insert statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/blank value.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 string.
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Synthesized column names `column_1..=column_n`.
pub fn synthesized_headers(width: usize) -> Vec<String> {
    (1..=width).map(|i| format!("column_{i}")).collect()
}
