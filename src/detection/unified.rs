//! Unified detection entrypoint.
//!
//! [`detect_and_load`] reads a file and runs the detection cascade:
//!
//! 1. If the extension names a strategy, try it. A successful attempt is returned as is, even when
//!    it found no rows (an empty `.csv` is empty, not an error).
//! 2. Otherwise, or if that attempt errored, try [`FALLBACK_ORDER`] and accept the first attempt
//!    with non-empty headers and rows.
//! 3. If nothing qualifies, fail with [`LoadError::Format`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{LoadError, LoadResult};
use crate::types::DetectedTable;

use super::{DetectionOptions, delimited, json, whitespace};

/// A named format-detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStrategy {
    /// Delimited text (comma, semicolon, pipe or tab).
    Delimited,
    /// JSON array of objects or newline-delimited objects.
    Json,
    /// Whitespace-separated text.
    Whitespace,
}

/// Order in which strategies are tried when the extension does not settle it.
pub const FALLBACK_ORDER: [FormatStrategy; 3] = [
    FormatStrategy::Delimited,
    FormatStrategy::Json,
    FormatStrategy::Whitespace,
];

impl FormatStrategy {
    /// Strategy hinted by a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Delimited),
            "json" | "ndjson" => Some(Self::Json),
            "txt" | "tsv" | "dat" => Some(Self::Whitespace),
            _ => None,
        }
    }

    /// Strategy hinted by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::Json => "json",
            Self::Whitespace => "whitespace",
        }
    }

    /// Run this strategy over in-memory text.
    pub fn parse(self, text: &str, options: &DetectionOptions) -> LoadResult<DetectedTable> {
        match self {
            Self::Delimited => delimited::parse_delimited_with(text, options),
            Self::Json => Ok(json::parse_json(text)),
            Self::Whitespace => Ok(whitespace::parse_whitespace(text)),
        }
    }
}

/// Detect the format of the file at `path` and parse it.
///
/// # Examples
///
/// ```no_run
/// use dbload::detection::detect_and_load;
///
/// # fn main() -> Result<(), dbload::LoadError> {
/// let table = detect_and_load("people.csv")?;
/// println!("{} columns, {} rows", table.headers.len(), table.row_count());
/// # Ok(())
/// # }
/// ```
pub fn detect_and_load(path: impl AsRef<Path>) -> LoadResult<DetectedTable> {
    detect_and_load_with(path, &DetectionOptions::default())
}

pub fn detect_and_load_with(path: impl AsRef<Path>, options: &DetectionOptions) -> LoadResult<DetectedTable> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let table = cascade(&text, FormatStrategy::from_path(path), options).map_err(|message| LoadError::Format {
        path: path.to_path_buf(),
        message,
    })?;
    for degradation in &table.degradations {
        warn!(path = %path.display(), %degradation, "detection degraded");
    }
    Ok(table)
}

/// Run the detection cascade over in-memory text, with an optional strategy hint.
pub fn detect_and_load_str(
    text: &str,
    hint: Option<FormatStrategy>,
    options: &DetectionOptions,
) -> LoadResult<DetectedTable> {
    cascade(text, hint, options).map_err(|message| LoadError::Format {
        path: PathBuf::from("<input>"),
        message,
    })
}

fn cascade(text: &str, hint: Option<FormatStrategy>, options: &DetectionOptions) -> Result<DetectedTable, String> {
    if let Some(strategy) = hint {
        match strategy.parse(text, options) {
            Ok(table) => {
                debug!(strategy = strategy.name(), rows = table.row_count(), "extension strategy succeeded");
                return Ok(table);
            }
            Err(e) => debug!(strategy = strategy.name(), error = %e, "extension strategy failed"),
        }
    }

    let mut attempts = Vec::with_capacity(FALLBACK_ORDER.len());
    for strategy in FALLBACK_ORDER {
        match strategy.parse(text, options) {
            Ok(table) if !table.is_empty() => {
                debug!(strategy = strategy.name(), rows = table.row_count(), "fallback strategy succeeded");
                return Ok(table);
            }
            Ok(_) => attempts.push(format!("{}: no rows", strategy.name())),
            Err(e) => attempts.push(format!("{}: {e}", strategy.name())),
        }
    }
    Err(attempts.join("; "))
}

fn read_text(path: &Path) -> LoadResult<String> {
    let text = fs::read_to_string(path)?;
    if let Some(rest) = text.strip_prefix('\u{feff}') {
        return Ok(rest.to_string());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DetectedFormat;

    #[test]
    fn extension_hints() {
        assert_eq!(FormatStrategy::from_extension("CSV"), Some(FormatStrategy::Delimited));
        assert_eq!(FormatStrategy::from_extension("ndjson"), Some(FormatStrategy::Json));
        assert_eq!(FormatStrategy::from_extension("tsv"), Some(FormatStrategy::Whitespace));
        assert_eq!(FormatStrategy::from_extension("dat"), Some(FormatStrategy::Whitespace));
        assert_eq!(FormatStrategy::from_extension("xlsx"), None);
    }

    #[test]
    fn hinted_empty_result_is_returned_as_is() {
        let t = detect_and_load_str("", Some(FormatStrategy::Delimited), &DetectionOptions::default()).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn unhinted_empty_input_is_a_format_error() {
        let err = detect_and_load_str("   \n", None, &DetectionOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
        assert!(err.to_string().contains("delimited: no rows"));
    }

    #[test]
    fn unhinted_input_tries_delimited_first() {
        let t = detect_and_load_str("a|b\n1|2\n", None, &DetectionOptions::default()).unwrap();
        assert_eq!(t.format, DetectedFormat::Delimited('|'));
    }
}
