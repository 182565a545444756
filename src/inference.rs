//! Column type inference over sampled string values.

use crate::types::ColumnType;

/// Share of non-blank values that must be numeric for a column to be typed numeric.
pub const NUMERIC_THRESHOLD: f64 = 0.8;

/// Options controlling [`detect_type_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOptions {
    /// Minimum `(integers + reals) / non_blank` ratio for a numeric type.
    pub numeric_threshold: f64,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            numeric_threshold: NUMERIC_THRESHOLD,
        }
    }
}

/// How a single value parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Integer,
    Real,
    Other,
}

/// Classify a single (already trimmed) value.
pub fn classify(value: &str) -> ValueClass {
    if value.parse::<i64>().is_ok() {
        ValueClass::Integer
    } else if value.parse::<f64>().is_ok() {
        ValueClass::Real
    } else {
        ValueClass::Other
    }
}

/// Returns true if `value` parses as a floating point number once trimmed.
pub fn looks_like_number(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

/// Infer the storage type of a column using the default threshold.
///
/// Blank values are ignored. An empty or all-blank column is `TEXT`.
pub fn detect_type<S: AsRef<str>>(values: &[S]) -> ColumnType {
    detect_type_with(values, &InferenceOptions::default())
}

/// Infer the storage type of a column.
pub fn detect_type_with<S: AsRef<str>>(values: &[S], options: &InferenceOptions) -> ColumnType {
    let mut total = 0usize;
    let mut integers = 0usize;
    let mut reals = 0usize;

    for value in values {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        total += 1;
        match classify(value) {
            ValueClass::Integer => integers += 1,
            ValueClass::Real => reals += 1,
            ValueClass::Other => {}
        }
    }

    if total == 0 {
        return ColumnType::Text;
    }

    let numeric_ratio = (integers + reals) as f64 / total as f64;
    if numeric_ratio >= options.numeric_threshold {
        if reals == 0 {
            ColumnType::Integer
        } else {
            ColumnType::Real
        }
    } else {
        ColumnType::Text
    }
}
