//! Per-file pipeline: detect, propose a schema, reconcile, ensure the relation, load.
//!
//! Each file moves through [`FileState`]:
//!
//! ```text
//! Detecting → SchemaProposed → Reconciled → RelationEnsured → Loading → Done
//! ```
//!
//! Any stage can fail. A failure ends that file's run only; the next file starts from
//! `Detecting` with nothing carried over. The exception is [`LoadError::StoreUnavailable`], which
//! stops [`Pipeline::run`].
//!
//! A file whose load fails after its relation was created leaves that relation in place (possibly
//! empty).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::detection::{DetectionOptions, detect_and_load_with};
use crate::error::{LoadError, LoadResult};
use crate::observability::{FileContext, PipelineObserver, Severity, severity_for_error};
use crate::reconcile::{HeaderDecision, HeaderProposal, Reconciler, SchemaDecision};
use crate::schema::{SchemaOptions, apply_overrides, check_identifiers, detect_schema_with};
use crate::store::{LoadStats, Store, sanitize_identifier};
use crate::types::DetectedFormat;

/// Relation name used when a file has no usable stem.
pub const DEFAULT_RELATION: &str = "data";

/// Stage of one file's pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Detecting,
    SchemaProposed,
    Reconciled,
    RelationEnsured,
    Loading,
    Done,
    Failed,
}

/// Options controlling a [`Pipeline`].
#[derive(Clone)]
pub struct PipelineOptions {
    pub detection: DetectionOptions,
    pub schema: SchemaOptions,
    /// Relation name for every file. If `None`, each file's stem is proposed.
    pub table: Option<String>,
    /// Optional observer for per-file outcomes.
    pub observer: Option<Arc<dyn PipelineObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("detection", &self.detection)
            .field("schema", &self.schema)
            .field("table", &self.table)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            detection: DetectionOptions::default(),
            schema: SchemaOptions::default(),
            table: None,
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// How a file's run ended.
#[derive(Debug)]
pub enum FileOutcome {
    Loaded { relation: String, stats: LoadStats },
    /// `state` is the last stage the file entered before failing.
    Failed { state: FileState, error: LoadError },
}

/// Result of one file's run.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub format: Option<DetectedFormat>,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn is_loaded(&self) -> bool {
        matches!(self.outcome, FileOutcome::Loaded { .. })
    }

    /// Final state: `Done` when loaded, `Failed` otherwise.
    pub fn state(&self) -> FileState {
        match self.outcome {
            FileOutcome::Loaded { .. } => FileState::Done,
            FileOutcome::Failed { .. } => FileState::Failed,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match &self.outcome {
            FileOutcome::Failed { error, .. } => Some(error),
            FileOutcome::Loaded { .. } => None,
        }
    }
}

/// Reports for every file of a run, in input order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<FileReport>,
    /// A store failure stopped the run; the last report carries the error.
    pub stopped: bool,
}

impl RunSummary {
    /// The store failure that stopped the run, if any.
    pub fn fatal_error(&self) -> Option<&LoadError> {
        if self.stopped {
            self.reports.last().and_then(FileReport::error)
        } else {
            None
        }
    }

    pub fn loaded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_loaded()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.loaded()
    }

    pub fn rows(&self) -> usize {
        self.reports
            .iter()
            .map(|r| match &r.outcome {
                FileOutcome::Loaded { stats, .. } => stats.rows,
                FileOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}

/// Drives files through detection, reconciliation and loading against one store.
pub struct Pipeline<'s, R> {
    store: &'s mut Store,
    reconciler: R,
    options: PipelineOptions,
}

struct Progress {
    state: FileState,
    format: Option<DetectedFormat>,
}

impl<'s, R: Reconciler> Pipeline<'s, R> {
    pub fn new(store: &'s mut Store, reconciler: R, options: PipelineOptions) -> Self {
        Self {
            store,
            reconciler,
            options,
        }
    }

    /// Run every file in order.
    ///
    /// Per-file failures are recorded in the summary and the run continues. A fatal store
    /// failure is reported to the observer and stops the run; files after it are not attempted
    /// and [`RunSummary::fatal_error`] returns it.
    pub fn run<P: AsRef<Path>>(&mut self, paths: &[P]) -> RunSummary {
        let mut summary = RunSummary::default();
        for path in paths {
            let report = self.load_file(path.as_ref());
            let fatal = report.error().is_some_and(LoadError::is_fatal);
            summary.reports.push(report);
            if fatal {
                summary.stopped = true;
                warn!(skipped = paths.len() - summary.reports.len(), "store unavailable, stopping run");
                break;
            }
        }
        info!(
            files = summary.reports.len(),
            loaded = summary.loaded(),
            failed = summary.failed(),
            rows = summary.rows(),
            "run complete"
        );
        summary
    }

    /// Run one file through every stage and report the outcome to the observer.
    pub fn load_file(&mut self, path: &Path) -> FileReport {
        info!(path = %path.display(), "processing file");
        let mut progress = Progress {
            state: FileState::Detecting,
            format: None,
        };
        let result = self.process(path, &mut progress);

        let ctx = FileContext {
            path: path.to_path_buf(),
            format: progress.format,
            state: progress.state,
        };
        let outcome = match result {
            Ok((relation, stats)) => {
                let ctx = FileContext {
                    state: FileState::Done,
                    ..ctx
                };
                if let Some(observer) = &self.options.observer {
                    observer.on_success(&ctx, stats);
                }
                FileOutcome::Loaded { relation, stats }
            }
            Err(error) => {
                let severity = severity_for_error(&error);
                if let Some(observer) = &self.options.observer {
                    observer.on_failure(&ctx, severity, &error);
                    if severity >= self.options.alert_at_or_above {
                        observer.on_alert(&ctx, severity, &error);
                    }
                }
                FileOutcome::Failed {
                    state: progress.state,
                    error,
                }
            }
        };

        FileReport {
            path: path.to_path_buf(),
            format: progress.format,
            outcome,
        }
    }

    fn process(&mut self, path: &Path, progress: &mut Progress) -> LoadResult<(String, LoadStats)> {
        let table = detect_and_load_with(path, &self.options.detection)?;
        progress.format = Some(table.format);
        if table.is_empty() {
            return Err(LoadError::Format {
                path: path.to_path_buf(),
                message: "no data rows found".to_string(),
            });
        }
        debug!(
            path = %path.display(),
            format = table.format.name(),
            columns = table.headers.len(),
            rows = table.row_count(),
            has_header = table.has_header,
            "detected table"
        );

        let preview = table.rows.first().map(Vec::as_slice).unwrap_or(&[]);
        let decision = self.reconciler.confirm_headers(&HeaderProposal {
            path,
            headers: &table.headers,
            preview,
            has_header: table.has_header,
        })?;
        let (headers, rows) = match decision {
            HeaderDecision::Accept => (table.headers, table.rows),
            HeaderDecision::Replace(headers) => {
                if headers.len() != table.headers.len() {
                    return Err(LoadError::schema(format!(
                        "expected {} header names, got {}",
                        table.headers.len(),
                        headers.len()
                    )));
                }
                // The detected header row, if any, becomes data.
                (headers, table.raw_rows)
            }
        };

        progress.state = FileState::SchemaProposed;
        let mut schema = detect_schema_with(&headers, &rows, &self.options.schema);
        match self.reconciler.confirm_schema(path, &schema, table.format)? {
            SchemaDecision::Accept => {}
            SchemaDecision::Override(overrides) => apply_overrides(&mut schema, &overrides)?,
            SchemaDecision::Abort => {
                return Err(LoadError::Aborted {
                    path: path.to_path_buf(),
                });
            }
        }

        progress.state = FileState::Reconciled;
        let proposed = self.options.table.clone().unwrap_or_else(|| default_relation_name(path));
        let name = self.reconciler.confirm_relation_name(path, &proposed)?;
        if sanitize_identifier(name.trim()).is_empty() {
            return Err(LoadError::schema("relation name is empty"));
        }
        check_identifiers(&schema)?;

        let relation = self.store.ensure_relation(name.trim(), &schema)?;
        progress.state = FileState::RelationEnsured;
        debug!(relation = %relation.name, "relation ensured");

        progress.state = FileState::Loading;
        let stats = self.store.insert_rows(&relation.name, &relation.columns, &rows)?;
        progress.state = FileState::Done;
        Ok((relation.name, stats))
    }
}

/// Proposed relation name for a file: its stem, or [`DEFAULT_RELATION`].
pub fn default_relation_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_RELATION)
        .to_string()
}
