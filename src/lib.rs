//! `dbload` loads delimited, JSON and whitespace-separated text files into SQLite without a
//! schema declared up front.
//!
//! For each file it:
//!
//! 1. detects the serialization, delimiter and header row ([`detection`])
//! 2. infers a type per column from a sample of values ([`inference`], [`schema`])
//! 3. asks a [`reconcile::Reconciler`] to confirm or override headers, schema and table name
//! 4. creates the table if needed and inserts every row in one transaction ([`store`])
//!
//! [`pipeline::Pipeline`] runs those steps for a list of files, one at a time. A file that fails
//! at any step is reported and skipped; only a store that cannot be opened or written stops the
//! run.
//!
//! ## Supported inputs
//!
//! - **Delimited text**: comma, semicolon, pipe or tab, with quoted fields (`.csv`)
//! - **JSON**: an array of flat objects, or one object per line (`.json`, `.ndjson`)
//! - **Whitespace-separated text**: quoted runs kept whole (`.txt`, `.tsv`, `.dat`)
//!
//! Unknown extensions are detected by trying each strategy in turn.
//!
//! ## Column types
//!
//! Columns are `INTEGER`, `REAL` or `TEXT`. A column is numeric when at least 80% of its
//! non-blank sampled values parse as numbers. Blank cells load as `NULL`; a value that does not
//! parse as its column's numeric type is stored as its original text.
//!
//! ## Example
//!
//! ```rust
//! use dbload::detection::{DetectionOptions, FormatStrategy, detect_and_load_str};
//! use dbload::schema::detect_schema;
//! use dbload::store::Store;
//! use dbload::types::ColumnType;
//!
//! # fn main() -> Result<(), dbload::LoadError> {
//! let table = detect_and_load_str(
//!     "id,name\n1,Ada\n2,Grace\n",
//!     Some(FormatStrategy::Delimited),
//!     &DetectionOptions::default(),
//! )?;
//! assert!(table.has_header);
//!
//! let schema = detect_schema(&table.headers, &table.rows);
//! assert_eq!(schema[0].column_type, ColumnType::Integer);
//!
//! let mut store = Store::open_in_memory()?;
//! let relation = store.ensure_relation("people", &schema)?;
//! let stats = store.insert_rows(&relation.name, &relation.columns, &table.rows)?;
//! assert_eq!(stats.rows, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`detection`]: format, delimiter and header detection
//! - [`inference`]: per-column type inference
//! - [`schema`]: schema proposal, overrides and identifier checks
//! - [`store`]: the SQLite store, value coercion and loading
//! - [`reconcile`]: the confirmation contract and its implementations
//! - [`pipeline`]: per-file state machine over a list of files
//! - [`observability`]: per-file outcome observers and severities
//! - [`shell`]: interactive query shell
//! - [`logging`]: `tracing` subscriber setup for the binary
//! - [`types`], [`error`]: shared data model and error type

pub mod detection;
pub mod error;
pub mod inference;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod reconcile;
pub mod schema;
pub mod shell;
pub mod store;
pub mod types;

pub use error::{LoadError, LoadResult};
