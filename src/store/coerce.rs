//! Total coercion of raw strings into typed [`Value`]s.

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};

use crate::types::{ColumnType, Value};

/// A value that did not parse as its column's numeric type and is kept as text instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionFallback {
    /// The original string, unchanged.
    pub raw: String,
    /// The type it failed to parse as.
    pub target: ColumnType,
}

impl CoercionFallback {
    pub fn into_value(self) -> Value {
        Value::Text(self.raw)
    }
}

/// Coerce a raw cell into a [`Value`] for a column of type `target`.
///
/// Never fails:
/// - blank input is [`Value::Null`] whatever the type
/// - `INTEGER` accepts integer literals and truncates real literals toward zero (`"3.0"` → `3`)
/// - `REAL` accepts anything that parses as a float
/// - `TEXT` keeps the trimmed string
///
/// A numeric value that does not parse is stored as the original string.
pub fn coerce_value(raw: &str, target: ColumnType) -> Value {
    try_coerce(raw, target).unwrap_or_else(CoercionFallback::into_value)
}

/// Like [`coerce_value`], but reports when a numeric value fell back to text.
pub fn try_coerce(raw: &str, target: ColumnType) -> Result<Value, CoercionFallback> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let fallback = || CoercionFallback {
        raw: raw.to_string(),
        target,
    };

    match target {
        ColumnType::Text => Ok(Value::Text(trimmed.to_string())),
        ColumnType::Integer => parse_integer(trimmed).map(Value::Integer).ok_or_else(fallback),
        ColumnType::Real => trimmed.parse::<f64>().map(Value::Real).map_err(|_| fallback()),
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let truncated = s.parse::<f64>().ok()?.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is out of range.
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(v) => ToSqlOutput::from(*v),
            Value::Real(v) => ToSqlOutput::from(*v),
            Value::Text(v) => ToSqlOutput::from(v.as_str()),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::Text(format!("<blob {} bytes>", bytes.len())),
        }
    }
}
