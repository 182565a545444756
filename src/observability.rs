use std::fmt;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::LoadError;
use crate::pipeline::FileState;
use crate::store::LoadStats;
use crate::types::DetectedFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The file was skipped on purpose (reconciler abort).
    Info,
    /// The file was not loadable as data (no format detected, no rows).
    Warning,
    /// Loading the file failed.
    Error,
    /// The store itself failed; the run stops.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

/// Classify a per-file error.
pub fn severity_for_error(error: &LoadError) -> Severity {
    match error {
        LoadError::Aborted { .. } => Severity::Info,
        LoadError::Format { .. } => Severity::Warning,
        LoadError::StoreUnavailable { .. } => Severity::Critical,
        _ => Severity::Error,
    }
}

/// Where a file's pipeline run stood when an event was reported.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub path: PathBuf,
    /// `None` until detection succeeded.
    pub format: Option<DetectedFormat>,
    pub state: FileState,
}

/// Observer interface for per-file outcomes.
pub trait PipelineObserver: Send + Sync {
    /// Called when a file was loaded (including a file with zero data rows).
    fn on_success(&self, _ctx: &FileContext, _stats: LoadStats) {}

    /// Called when a file was skipped.
    fn on_failure(&self, _ctx: &FileContext, _severity: Severity, _error: &LoadError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &FileContext, severity: Severity, error: &LoadError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Reports outcomes as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

fn format_name(ctx: &FileContext) -> &'static str {
    ctx.format.map_or("unknown", |f| f.name())
}

impl PipelineObserver for TracingObserver {
    fn on_success(&self, ctx: &FileContext, stats: LoadStats) {
        info!(
            path = %ctx.path.display(),
            format = format_name(ctx),
            rows = stats.rows,
            fallbacks = stats.coercion_fallbacks,
            "file loaded"
        );
    }

    fn on_failure(&self, ctx: &FileContext, severity: Severity, error: &LoadError) {
        let path = ctx.path.display();
        let format = format_name(ctx);
        let state = ctx.state;
        match severity {
            Severity::Info => info!(path = %path, format, ?state, %error, "file skipped"),
            Severity::Warning => warn!(path = %path, format, ?state, %error, "file skipped"),
            Severity::Error | Severity::Critical => {
                error!(path = %path, format, ?state, %severity, %error, "file failed")
            }
        }
    }

    fn on_alert(&self, ctx: &FileContext, severity: Severity, error: &LoadError) {
        error!(
            path = %ctx.path.display(),
            format = format_name(ctx),
            state = ?ctx.state,
            %severity,
            %error,
            "ALERT"
        );
    }
}
