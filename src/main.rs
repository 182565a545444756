//! `dbload` command-line entrypoint.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dbload::logging::{LogConfig, LogFormat, init_logging};
use dbload::observability::{Severity, TracingObserver};
use dbload::pipeline::{Pipeline, PipelineOptions, RunSummary};
use dbload::reconcile::{AcceptAll, Reconciler, ScriptedAnswers, ScriptedReconciler, TerminalReconciler};
use dbload::shell::Shell;
use dbload::store::{LoadOptions, Store};
use tracing::error;

mod cli;
mod summary;

use crate::cli::{Cli, LogFormatArg};
use crate::summary::print_summary;

fn main() {
    let cli = Cli::parse();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            error!(error = %format!("{error:#}"), "run failed");
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<()> {
    let answers = cli
        .answers
        .as_ref()
        .map(|path| ScriptedAnswers::from_path(path).with_context(|| format!("read answers {}", path.display())))
        .transpose()?;

    let mut store = Store::open(&cli.db)?.with_options(LoadOptions {
        batch_size: cli.batch_size,
    });
    let interactive = io::stdin().is_terminal();

    let options = PipelineOptions {
        table: cli.table.clone(),
        observer: Some(Arc::new(TracingObserver)),
        alert_at_or_above: Severity::Critical,
        ..PipelineOptions::default()
    };

    let summary = if cli.files.is_empty() {
        RunSummary::default()
    } else if let Some(answers) = answers {
        load_files(&mut store, ScriptedReconciler::new(answers), options, cli)
    } else if cli.yes || !interactive {
        load_files(&mut store, AcceptAll, options, cli)
    } else {
        let reconciler = TerminalReconciler::new(io::stdin().lock(), io::stdout());
        load_files(&mut store, reconciler, options, cli)
    };
    print_summary(&summary);
    if let Some(error) = summary.fatal_error() {
        bail!("run stopped: {error}");
    }

    if interactive && !cli.no_shell {
        Shell::new(&store, io::stdin().lock(), io::stdout())
            .run()
            .context("query shell")?;
    }
    Ok(())
}

fn load_files<R: Reconciler>(store: &mut Store, reconciler: R, options: PipelineOptions, cli: &Cli) -> RunSummary {
    Pipeline::new(store, reconciler, options).run(cli.files.as_slice())
}

/// Build logging configuration from CLI flags.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        log_file: cli.log_file.clone(),
        with_ansi: cli.log_file.is_none() && io::stderr().is_terminal(),
        ..LogConfig::default()
    }
}
