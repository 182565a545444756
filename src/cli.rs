//! CLI argument definitions for `dbload`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use dbload::store::{BATCH_SIZE, DEFAULT_DB_PATH};

#[derive(Parser)]
#[command(
    name = "dbload",
    version,
    about = "Load CSV, JSON and whitespace-delimited text files into SQLite",
    long_about = "Detect the format, headers and column types of each input file, confirm them, \
                  and load the rows into a SQLite table.\n\n\
                  Each file is loaded independently: a file that fails is reported and the run \
                  continues with the next one. When stdin is a terminal, a query shell opens \
                  after loading."
)]
pub struct Cli {
    /// Files to load, in order.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// SQLite database file (created if missing).
    #[arg(long = "db", value_name = "PATH", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Load every file into this table instead of one table per file stem.
    #[arg(long = "table", value_name = "NAME")]
    pub table: Option<String>,

    /// Accept every detected header, schema and table name without prompting.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Answer reconciliation prompts from a JSON answers file.
    #[arg(long = "answers", value_name = "FILE", conflicts_with = "yes")]
    pub answers: Option<PathBuf>,

    /// Do not open the query shell after loading.
    #[arg(long = "no-shell")]
    pub no_shell: bool,

    /// Rows per insert batch.
    #[arg(long = "batch-size", value_name = "N", default_value_t = BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_batch_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
