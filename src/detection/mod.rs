//! Format detection for files of unknown layout.
//!
//! Most callers should use [`detect_and_load`] (from [`unified`]) which:
//!
//! - picks a first strategy from the file extension
//! - falls back to trying delimited text, JSON, then whitespace-separated text, in that order
//! - returns a [`crate::types::DetectedTable`] with headers, data rows and raw rows
//!
//! Each strategy is also available on its own:
//! - [`delimited`]: delimiter scoring, header sniffing, quoted field parsing
//! - [`json`]: array-of-objects and newline-delimited objects
//! - [`whitespace`]: whitespace-separated fields with quoted runs
//!
//! Heuristics never fail outright. When one falls back to its documented default the result is
//! wrapped in a [`Detection`] carrying the [`Degradation`], and the degradation is recorded on
//! the detected table.

pub mod delimited;
pub mod json;
pub mod unified;
pub mod whitespace;

use crate::types::Degradation;

pub use delimited::{DEFAULT_DELIMITER, DELIMITER_CANDIDATES, detect_delimiter, detect_header, parse_delimited};
pub use json::parse_json;
pub use unified::{FALLBACK_ORDER, FormatStrategy, detect_and_load, detect_and_load_str, detect_and_load_with};
pub use whitespace::parse_whitespace;

/// Number of leading non-empty lines scored by delimiter detection.
pub const DELIMITER_SAMPLE_LINES: usize = 5;
/// Number of leading lines handed to the header sniff.
pub const HEADER_SAMPLE_LINES: usize = 10;
/// Maximum number of rows after the header candidate compared by the header sniff.
pub const HEADER_SNIFF_ROWS: usize = 20;

/// Sampling limits used by the detection heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionOptions {
    /// See [`DELIMITER_SAMPLE_LINES`].
    pub delimiter_sample_lines: usize,
    /// See [`HEADER_SAMPLE_LINES`].
    pub header_sample_lines: usize,
    /// See [`HEADER_SNIFF_ROWS`].
    pub header_sniff_rows: usize,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            delimiter_sample_lines: DELIMITER_SAMPLE_LINES,
            header_sample_lines: HEADER_SAMPLE_LINES,
            header_sniff_rows: HEADER_SNIFF_ROWS,
        }
    }
}

/// A heuristic's answer plus whether it had to fall back to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection<T> {
    pub value: T,
    pub degradation: Option<Degradation>,
}

impl<T> Detection<T> {
    pub fn confident(value: T) -> Self {
        Self {
            value,
            degradation: None,
        }
    }

    pub fn degraded(value: T, degradation: Degradation) -> Self {
        Self {
            value,
            degradation: Some(degradation),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}
