//! The target store: one SQLite connection, owned by [`Store`].
//!
//! Loading issues exactly two statement shapes:
//!
//! - `CREATE TABLE IF NOT EXISTS "relation" ("col" TYPE, ...)` from [`Store::ensure_relation`]
//! - `INSERT INTO "relation" ("col", ...) VALUES (?, ...)` from [`Store::insert_rows`], one
//!   transaction per call
//!
//! Every statement goes through the single connection, so statements are never in flight
//! concurrently. Dropping the store closes the connection; a transaction that was not committed
//! is rolled back.
//!
//! The whole file being loaded is held in memory; there is no streaming.

mod coerce;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, ErrorCode, params_from_iter};
use tracing::{debug, info, warn};

use crate::error::{LoadError, LoadResult};
use crate::types::{ColumnSchema, Value};

pub use coerce::{CoercionFallback, coerce_value, try_coerce};

/// Rows per insert batch.
pub const BATCH_SIZE: usize = 1_000;

/// Default database file used by the CLI.
pub const DEFAULT_DB_PATH: &str = "data.db";

/// Options controlling [`Store::insert_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// See [`BATCH_SIZE`]. Must be > 0.
    pub batch_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { batch_size: BATCH_SIZE }
    }
}

/// Counts reported by a successful [`Store::insert_rows`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Rows inserted.
    pub rows: usize,
    /// Batches executed.
    pub batches: usize,
    /// Numeric cells stored as text because they did not parse.
    pub coercion_fallbacks: usize,
}

/// A relation that exists in the store with (at least) these columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRelation {
    /// Sanitized relation name.
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

/// Rows returned by an ad hoc statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Rows changed, for statements that return no columns.
    pub affected: Option<usize>,
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Handle to the target store.
pub struct Store {
    conn: Connection,
    path: PathBuf,
    options: LoadOptions,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish()
    }
}

impl Store {
    /// Open (or create) the database at `path`.
    ///
    /// Fails with [`LoadError::StoreUnavailable`] if the file cannot be opened or is not a
    /// database.
    pub fn open(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| LoadError::StoreUnavailable {
            path: path.clone(),
            source,
        })?;
        // Opening is lazy; touch the schema so a non-database file fails here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|source| LoadError::StoreUnavailable {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "connected to store");
        Ok(Self {
            conn,
            path,
            options: LoadOptions::default(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> LoadResult<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| LoadError::StoreUnavailable {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            conn,
            path,
            options: LoadOptions::default(),
        })
    }

    /// Replace the load options.
    ///
    /// # Panics
    ///
    /// Panics if `options.batch_size == 0`.
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        assert!(options.batch_size > 0, "batch_size must be > 0");
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the relation if it does not exist. Never alters an existing relation.
    ///
    /// If a relation with the same sanitized name exists but lacks one of the schema's columns,
    /// fails with [`LoadError::RelationConflict`]. Ensuring the same schema twice is a no-op.
    pub fn ensure_relation(&mut self, name: &str, schema: &[ColumnSchema]) -> LoadResult<TargetRelation> {
        let relation = sanitize_identifier(name);

        let existing = self.columns_of(&relation).map_err(|source| self.store_error(source))?;
        if !existing.is_empty() {
            let missing: Vec<String> = schema
                .iter()
                .map(|c| sanitize_identifier(&c.name))
                .filter(|c| !existing.iter().any(|(name, _)| name.eq_ignore_ascii_case(c)))
                .collect();
            if !missing.is_empty() {
                return Err(LoadError::RelationConflict {
                    relation,
                    message: format!("existing relation has no column(s) {}", missing.join(", ")),
                });
            }
            debug!(relation, "relation already exists");
        }

        let columns = schema
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&sanitize_identifier(&c.name)), c.column_type.sql_name()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CREATE TABLE IF NOT EXISTS {} ({columns})", quote_identifier(&relation));

        self.conn
            .execute(&sql, [])
            .map_err(|source| self.store_error(source))?;
        if existing.is_empty() {
            info!(relation, columns = schema.len(), "created relation");
        }

        Ok(TargetRelation {
            name: relation,
            columns: schema.to_vec(),
        })
    }

    /// Insert `rows` into `relation`, coercing each cell to its column's type.
    ///
    /// Short rows are padded with blanks (stored as NULL) and long rows are truncated to the
    /// schema width. Rows are inserted in batches inside a single transaction which is committed
    /// last, so any failure rolls back every row of this call.
    pub fn insert_rows(&mut self, relation: &str, schema: &[ColumnSchema], rows: &[Vec<String>]) -> LoadResult<LoadStats> {
        let relation = sanitize_identifier(relation);
        let mut stats = LoadStats::default();
        if rows.is_empty() {
            warn!(relation, "no rows to insert");
            return Ok(stats);
        }

        let column_list = schema
            .iter()
            .map(|c| quote_identifier(&sanitize_identifier(&c.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; schema.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            quote_identifier(&relation)
        );

        let path = self.path.clone();
        let fail = |source: rusqlite::Error| load_error(&path, &relation, source);

        info!(relation, rows = rows.len(), "importing rows");
        let tx = self.conn.transaction().map_err(fail)?;
        {
            let mut stmt = tx.prepare_cached(&sql).map_err(fail)?;
            let mut values: Vec<Value> = Vec::with_capacity(schema.len());
            for batch in rows.chunks(self.options.batch_size) {
                for row in batch {
                    values.clear();
                    for (idx, column) in schema.iter().enumerate() {
                        let raw = row.get(idx).map(String::as_str).unwrap_or("");
                        let value = try_coerce(raw, column.column_type).unwrap_or_else(|fallback| {
                            stats.coercion_fallbacks += 1;
                            fallback.into_value()
                        });
                        values.push(value);
                    }
                    stmt.execute(params_from_iter(values.iter())).map_err(fail)?;
                }
                stats.rows += batch.len();
                stats.batches += 1;
                debug!(relation, imported = stats.rows, total = rows.len(), "batch inserted");
            }
        }
        tx.commit().map_err(fail)?;

        if stats.coercion_fallbacks > 0 {
            warn!(
                relation,
                fallbacks = stats.coercion_fallbacks,
                "numeric values that did not parse were stored as text"
            );
        }
        info!(relation, rows = stats.rows, batches = stats.batches, "import committed");
        Ok(stats)
    }

    /// Names of user tables, sorted.
    pub fn tables(&self) -> LoadResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// `(name, declared type)` for each column of `table`; empty if the table does not exist.
    pub fn table_columns(&self, table: &str) -> LoadResult<Vec<(String, String)>> {
        Ok(self.columns_of(table)?)
    }

    fn columns_of(&self, table: &str) -> rusqlite::Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
        let columns = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
            .collect::<Result<Vec<_>, _>>();
        columns
    }

    /// Classify a statement error outside a load transaction.
    fn store_error(&self, source: rusqlite::Error) -> LoadError {
        if is_store_unavailable(&source) {
            LoadError::StoreUnavailable {
                path: self.path.clone(),
                source,
            }
        } else {
            LoadError::Store(source)
        }
    }

    /// Run one ad hoc statement.
    pub fn query(&self, sql: &str) -> LoadResult<QueryResult> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        if columns.is_empty() {
            let affected = stmt.execute([])?;
            return Ok(QueryResult {
                columns,
                rows: Vec::new(),
                affected: Some(affected),
            });
        }

        let width = columns.len();
        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut out = Vec::with_capacity(width);
            for idx in 0..width {
                out.push(Value::from(row.get_ref(idx)?));
            }
            rows.push(out);
        }
        Ok(QueryResult {
            columns,
            rows,
            affected: None,
        })
    }
}

fn is_store_unavailable(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(
            ErrorCode::CannotOpen
                | ErrorCode::ReadOnly
                | ErrorCode::DiskFull
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::PermissionDenied
        )
    )
}

fn load_error(path: &Path, relation: &str, source: rusqlite::Error) -> LoadError {
    if is_store_unavailable(&source) {
        LoadError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        }
    } else {
        LoadError::LoadFailure {
            relation: relation.to_string(),
            source,
        }
    }
}
