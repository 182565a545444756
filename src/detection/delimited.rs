//! Delimited text: delimiter scoring, header sniffing and record parsing.

use tracing::debug;

use crate::error::LoadResult;
use crate::inference::looks_like_number;
use crate::types::{Degradation, DetectedFormat, DetectedTable, synthesized_headers};

use super::{Detection, DetectionOptions};

/// Candidate delimiters, in tie-break order.
pub const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '|', '\t'];

/// Delimiter assumed when no candidate splits the sample into several fields.
pub const DEFAULT_DELIMITER: char = ',';

/// Pick the delimiter that splits the leading lines into the most, most evenly sized, field sets.
///
/// For each candidate the score is `consistency * avg_fields`, where
/// `consistency = 1 - (max - min) / max(avg, 1)`; candidates averaging fewer than two fields
/// score zero. Ties keep the earlier candidate. If every score is zero the result is
/// [`DEFAULT_DELIMITER`], flagged as [`Degradation::DelimiterDefaulted`].
pub fn detect_delimiter<S: AsRef<str>>(sample_lines: &[S]) -> Detection<char> {
    detect_delimiter_with(sample_lines, &DetectionOptions::default())
}

pub fn detect_delimiter_with<S: AsRef<str>>(sample_lines: &[S], options: &DetectionOptions) -> Detection<char> {
    let lines: Vec<&str> = sample_lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .take(options.delimiter_sample_lines)
        .collect();

    let mut best = DEFAULT_DELIMITER;
    let mut best_score = 0.0_f64;
    for candidate in DELIMITER_CANDIDATES {
        let score = delimiter_score(&lines, candidate);
        debug!(delimiter = ?candidate, score, "scored delimiter candidate");
        if score > best_score {
            best = candidate;
            best_score = score;
        }
    }

    if best_score > 0.0 {
        Detection::confident(best)
    } else {
        Detection::degraded(DEFAULT_DELIMITER, Degradation::DelimiterDefaulted)
    }
}

fn delimiter_score(lines: &[&str], delimiter: char) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    let counts: Vec<usize> = lines.iter().map(|l| l.split(delimiter).count()).collect();
    let max = counts.iter().copied().max().unwrap_or(0);
    let min = counts.iter().copied().min().unwrap_or(0);
    let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;

    if avg < 2.0 {
        return 0.0;
    }
    let consistency = 1.0 - (max - min) as f64 / avg.max(1.0);
    consistency * avg
}

/// Decide whether the first line is a header.
///
/// Runs a statistical sniff comparing the first row with the rows after it; if the sniff cannot
/// decide, falls back to "header iff some field of the first row is not a number", flagged as
/// [`Degradation::HeaderSniffFailed`].
pub fn detect_header<S: AsRef<str>>(sample_lines: &[S], delimiter: char) -> Detection<bool> {
    detect_header_with(sample_lines, delimiter, &DetectionOptions::default())
}

pub fn detect_header_with<S: AsRef<str>>(
    sample_lines: &[S],
    delimiter: char,
    options: &DetectionOptions,
) -> Detection<bool> {
    let lines: Vec<&str> = sample_lines
        .iter()
        .take(options.header_sample_lines)
        .map(|l| l.as_ref().trim())
        .collect();

    if let Some(has_header) = sniff_header(&lines, delimiter, options.header_sniff_rows) {
        return Detection::confident(has_header);
    }

    let first_row = lines.first().copied().unwrap_or("");
    let has_header = first_row_has_text(first_row.split(delimiter));
    debug!(has_header, "header sniff undecided, used first-row rule");
    Detection::degraded(has_header, Degradation::HeaderSniffFailed)
}

/// True if any field is not a number.
pub(crate) fn first_row_has_text<'a>(fields: impl IntoIterator<Item = &'a str>) -> bool {
    fields.into_iter().any(|f| !looks_like_number(f))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Numeric,
    Length(usize),
}

impl CellKind {
    fn of(value: &str) -> Self {
        if looks_like_number(value) {
            Self::Numeric
        } else {
            Self::Length(value.chars().count())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ColumnKind {
    Unseen,
    Consistent(CellKind),
    Mixed,
}

/// Votes header vs. data per column. `None` when the sample gives nothing to vote on.
fn sniff_header(lines: &[&str], delimiter: char, max_rows: usize) -> Option<bool> {
    let records = read_records(&lines.join("\n"), delimiter).ok()?;
    let (header, rest) = records.split_first()?;
    let width = header.len();

    let mut kinds = vec![ColumnKind::Unseen; width];
    let mut matched = 0usize;
    for row in rest.iter().take(max_rows) {
        if row.len() != width {
            continue;
        }
        matched += 1;
        for (kind, value) in kinds.iter_mut().zip(row) {
            let cell = CellKind::of(value);
            *kind = match *kind {
                ColumnKind::Unseen => ColumnKind::Consistent(cell),
                ColumnKind::Consistent(seen) if seen == cell => ColumnKind::Consistent(seen),
                _ => ColumnKind::Mixed,
            };
        }
    }
    if matched == 0 {
        return None;
    }

    let mut votes = 0i32;
    let mut voters = 0usize;
    for (kind, name) in kinds.iter().zip(header) {
        let ColumnKind::Consistent(cell) = kind else {
            continue;
        };
        voters += 1;
        let looks_like_header = match cell {
            CellKind::Length(len) => name.chars().count() != *len,
            CellKind::Numeric => !looks_like_number(name),
        };
        votes += if looks_like_header { 1 } else { -1 };
    }
    if voters == 0 {
        return None;
    }
    debug!(votes, voters, matched, "header sniff");
    Some(votes > 0)
}

fn read_records(text: &str, delimiter: char) -> LoadResult<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        records.push(record.iter().map(str::to_owned).collect());
    }
    Ok(records)
}

/// Parse delimited text, detecting delimiter and header presence.
pub fn parse_delimited(text: &str) -> LoadResult<DetectedTable> {
    parse_delimited_with(text, &DetectionOptions::default())
}

pub fn parse_delimited_with(text: &str, options: &DetectionOptions) -> LoadResult<DetectedTable> {
    let lines: Vec<&str> = text.lines().collect();
    let delimiter = detect_delimiter_with(&lines, options);
    let format = DetectedFormat::Delimited(delimiter.value);

    if text.trim().is_empty() {
        return Ok(DetectedTable::empty(format));
    }

    let header = detect_header_with(&lines, delimiter.value, options);
    let raw_rows = read_records(text, delimiter.value)?;
    let Some(first) = raw_rows.first() else {
        return Ok(DetectedTable::empty(format));
    };

    let (headers, rows) = if header.value {
        (first.clone(), raw_rows[1..].to_vec())
    } else {
        (synthesized_headers(first.len()), raw_rows.clone())
    };

    let degradations = [delimiter.degradation, header.degradation]
        .into_iter()
        .flatten()
        .collect();

    Ok(DetectedTable {
        format,
        headers,
        rows,
        has_header: header.value,
        raw_rows,
        degradations,
    })
}
