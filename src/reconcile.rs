//! Schema reconciliation: the request/response contract between the pipeline and whoever
//! confirms the proposed headers, schema and relation name.
//!
//! The pipeline only depends on the [`Reconciler`] trait. Implementations:
//!
//! - [`AcceptAll`]: accepts every proposal (non-interactive runs)
//! - [`ScriptedReconciler`]: answers from [`ScriptedAnswers`], typically deserialized from a JSON
//!   file, for harnesses and tests
//! - [`TerminalReconciler`]: prompts on any `BufRead`/`Write` pair

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{LoadError, LoadResult};
use crate::schema::ColumnOverride;
use crate::types::{ColumnSchema, ColumnType, DetectedFormat};

/// Proposed header list for one file.
#[derive(Debug, Clone, Copy)]
pub struct HeaderProposal<'a> {
    pub path: &'a Path,
    pub headers: &'a [String],
    /// The first data row, for comparison with the headers.
    pub preview: &'a [String],
    /// Whether the headers were read from the file (false means they were synthesized).
    pub has_header: bool,
}

/// Answer to a [`HeaderProposal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderDecision {
    Accept,
    /// Replacement names; must have the same length as the proposal.
    Replace(Vec<String>),
}

/// Answer to a schema proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDecision {
    Accept,
    Override(Vec<ColumnOverride>),
    /// Cancel ingestion of this file only.
    Abort,
}

/// Synchronous propose → accept/override/abort contract.
pub trait Reconciler {
    fn confirm_headers(&mut self, proposal: &HeaderProposal<'_>) -> LoadResult<HeaderDecision>;

    fn confirm_schema(
        &mut self,
        path: &Path,
        schema: &[ColumnSchema],
        format: DetectedFormat,
    ) -> LoadResult<SchemaDecision>;

    /// Confirm the relation name. Defaults to the proposed name.
    fn confirm_relation_name(&mut self, _path: &Path, proposed: &str) -> LoadResult<String> {
        Ok(proposed.to_string())
    }
}

impl<R: Reconciler + ?Sized> Reconciler for &mut R {
    fn confirm_headers(&mut self, proposal: &HeaderProposal<'_>) -> LoadResult<HeaderDecision> {
        (**self).confirm_headers(proposal)
    }

    fn confirm_schema(
        &mut self,
        path: &Path,
        schema: &[ColumnSchema],
        format: DetectedFormat,
    ) -> LoadResult<SchemaDecision> {
        (**self).confirm_schema(path, schema, format)
    }

    fn confirm_relation_name(&mut self, path: &Path, proposed: &str) -> LoadResult<String> {
        (**self).confirm_relation_name(path, proposed)
    }
}

/// Accepts every proposal unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl Reconciler for AcceptAll {
    fn confirm_headers(&mut self, _proposal: &HeaderProposal<'_>) -> LoadResult<HeaderDecision> {
        Ok(HeaderDecision::Accept)
    }

    fn confirm_schema(&mut self, _: &Path, _: &[ColumnSchema], _: DetectedFormat) -> LoadResult<SchemaDecision> {
        Ok(SchemaDecision::Accept)
    }
}

/// Scripted answer to a schema proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedSchema {
    #[default]
    Accept,
    Abort,
    Override(Vec<ColumnOverride>),
}

/// Scripted answers for one file. Missing fields accept the proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileAnswers {
    #[serde(default)]
    pub headers: Option<Vec<String>>,
    #[serde(default)]
    pub schema: ScriptedSchema,
    #[serde(default)]
    pub table: Option<String>,
}

/// Answers keyed by file path or file name.
///
/// ```json
/// {
///   "files": {
///     "people.csv": { "headers": ["id", "name"], "table": "people" },
///     "events.json": { "schema": { "override": [{ "index": 0, "type": "TEXT" }] } },
///     "junk.txt": { "schema": "abort" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedAnswers {
    #[serde(default)]
    pub files: HashMap<String, FileAnswers>,
}

impl ScriptedAnswers {
    /// Load answers from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> LoadResult<Self> {
        serde_json::from_str(text).map_err(|e| LoadError::schema(format!("invalid answers file: {e}")))
    }

    /// Answers for `path`, matched by full path first, then by file name.
    pub fn for_path(&self, path: &Path) -> Option<&FileAnswers> {
        self.files.get(&path.display().to_string()).or_else(|| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.files.get(n))
        })
    }
}

/// Reconciler driven by [`ScriptedAnswers`]. Files without answers are accepted as proposed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReconciler {
    answers: ScriptedAnswers,
}

impl ScriptedReconciler {
    pub fn new(answers: ScriptedAnswers) -> Self {
        Self { answers }
    }
}

impl Reconciler for ScriptedReconciler {
    fn confirm_headers(&mut self, proposal: &HeaderProposal<'_>) -> LoadResult<HeaderDecision> {
        Ok(match self.answers.for_path(proposal.path).and_then(|a| a.headers.clone()) {
            Some(headers) => HeaderDecision::Replace(headers),
            None => HeaderDecision::Accept,
        })
    }

    fn confirm_schema(&mut self, path: &Path, _: &[ColumnSchema], _: DetectedFormat) -> LoadResult<SchemaDecision> {
        Ok(match self.answers.for_path(path).map(|a| &a.schema) {
            None | Some(ScriptedSchema::Accept) => SchemaDecision::Accept,
            Some(ScriptedSchema::Abort) => SchemaDecision::Abort,
            Some(ScriptedSchema::Override(o)) => SchemaDecision::Override(o.clone()),
        })
    }

    fn confirm_relation_name(&mut self, path: &Path, proposed: &str) -> LoadResult<String> {
        Ok(self
            .answers
            .for_path(path)
            .and_then(|a| a.table.clone())
            .unwrap_or_else(|| proposed.to_string()))
    }
}

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is valid"));

const RESERVED_WORDS: &[&str] = &[
    "table", "index", "select", "insert", "update", "delete", "create", "drop", "alter", "where", "from", "join",
    "order", "group", "having", "union",
];

/// Check a relation name typed by an operator.
pub fn validate_relation_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("table name cannot be empty".to_string());
    }
    if !TABLE_NAME.is_match(name) {
        return Err("table name must start with a letter or underscore and contain only letters, digits and underscores".to_string());
    }
    if RESERVED_WORDS.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(format!("'{name}' is a reserved SQL keyword"));
    }
    Ok(())
}

/// Interactive reconciler over a line-oriented input and an output.
///
/// End of input at any prompt aborts the current file.
pub struct TerminalReconciler<R, W> {
    input: R,
    output: W,
    current: PathBuf,
}

impl<R: BufRead, W: Write> TerminalReconciler<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            current: PathBuf::new(),
        }
    }

    fn prompt(&mut self, message: &str) -> LoadResult<String> {
        write!(self.output, "{message}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Err(LoadError::Aborted {
                path: self.current.clone(),
            });
        }
        Ok(line.trim().to_string())
    }

    fn yes_no(&mut self, message: &str) -> LoadResult<bool> {
        loop {
            match self.prompt(message)?.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please enter 'y' (yes) or 'n' (no)")?,
            }
        }
    }

    fn manual_headers(&mut self, count: usize) -> LoadResult<Vec<String>> {
        writeln!(self.output, "\nPlease enter {count} field names:")?;
        let mut headers = Vec::with_capacity(count);
        for i in 1..=count {
            loop {
                let name = self.prompt(&format!("  Field {i} name: "))?;
                if !name.is_empty() {
                    headers.push(name);
                    break;
                }
                writeln!(self.output, "    Field name cannot be empty")?;
            }
        }
        Ok(headers)
    }

    fn edit_schema(&mut self, schema: &[ColumnSchema]) -> LoadResult<Vec<ColumnOverride>> {
        writeln!(self.output, "\nAvailable types: TEXT, INTEGER, REAL")?;
        writeln!(self.output, "Press Enter to keep the current value.")?;
        let mut overrides = Vec::new();
        for (index, column) in schema.iter().enumerate() {
            writeln!(self.output, "\nField {}:", index + 1)?;
            let name = self.prompt(&format!("  Name [{}]: ", column.name))?;
            let column_type = loop {
                let answer = self.prompt(&format!("  Type [{}]: ", column.column_type))?;
                if answer.is_empty() {
                    break None;
                }
                match ColumnType::parse(&answer) {
                    Some(t) => break Some(t),
                    None => writeln!(self.output, "    Invalid type. Use: TEXT, INTEGER, or REAL")?,
                }
            };
            if !name.is_empty() || column_type.is_some() {
                overrides.push(ColumnOverride {
                    index,
                    name: (!name.is_empty()).then_some(name),
                    column_type,
                });
            }
        }
        Ok(overrides)
    }
}

/// Render a schema proposal as a numbered list.
pub fn render_schema(schema: &[ColumnSchema], format: DetectedFormat) -> String {
    let mut out = format!("Detected {format} format with {} fields:\n", schema.len());
    for (i, column) in schema.iter().enumerate() {
        let mut preview = column
            .sample
            .iter()
            .take(3)
            .map(|v| format!("'{v}'"))
            .collect::<Vec<_>>()
            .join(", ");
        if column.sample.len() > 3 {
            preview.push_str("...");
        }
        out.push_str(&format!(
            "{:2}. {:<20} ({:<8}) Sample: {preview}\n",
            i + 1,
            column.name,
            column.column_type.sql_name()
        ));
    }
    out
}

impl<R: BufRead, W: Write> Reconciler for TerminalReconciler<R, W> {
    fn confirm_headers(&mut self, proposal: &HeaderProposal<'_>) -> LoadResult<HeaderDecision> {
        self.current = proposal.path.to_path_buf();
        if proposal.has_header {
            writeln!(self.output, "\nDetected first line as headers:")?;
            for (i, h) in proposal.headers.iter().enumerate() {
                writeln!(self.output, "  {}. {h}", i + 1)?;
            }
            if !proposal.preview.is_empty() {
                writeln!(self.output, "\nFirst data row:")?;
                for (i, v) in proposal.preview.iter().enumerate() {
                    writeln!(self.output, "  {}. {v}", i + 1)?;
                }
            }
            if self.yes_no("\nAre these correct field names? (y/n): ")? {
                return Ok(HeaderDecision::Accept);
            }
        } else {
            writeln!(self.output, "\nNo headers detected. First row appears to be data:")?;
            for (i, v) in proposal.preview.iter().enumerate() {
                writeln!(self.output, "  {}. {v}", i + 1)?;
            }
            if self.yes_no(&format!(
                "\nUse generated names ({})? (y/n): ",
                proposal.headers.join(", ")
            ))? {
                return Ok(HeaderDecision::Accept);
            }
        }
        Ok(HeaderDecision::Replace(self.manual_headers(proposal.headers.len())?))
    }

    fn confirm_schema(
        &mut self,
        path: &Path,
        schema: &[ColumnSchema],
        format: DetectedFormat,
    ) -> LoadResult<SchemaDecision> {
        self.current = path.to_path_buf();
        write!(self.output, "\n{}", render_schema(schema, format))?;
        loop {
            match self.prompt("\nProceed with import? (y/n/edit): ")?.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(SchemaDecision::Accept),
                "n" | "no" => return Ok(SchemaDecision::Abort),
                "e" | "edit" => return Ok(SchemaDecision::Override(self.edit_schema(schema)?)),
                _ => writeln!(self.output, "Please enter 'y' (yes), 'n' (no), or 'edit'")?,
            }
        }
    }

    fn confirm_relation_name(&mut self, path: &Path, proposed: &str) -> LoadResult<String> {
        self.current = path.to_path_buf();
        loop {
            let answer = self.prompt(&format!("Table name [{proposed}]: "))?;
            let name = if answer.is_empty() { proposed.to_string() } else { answer };
            match validate_relation_name(&name) {
                Ok(()) => return Ok(name),
                Err(message) => writeln!(self.output, "{message}")?,
            }
        }
    }
}
