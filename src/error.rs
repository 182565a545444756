use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for detection, loading and pipeline operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error type returned across the crate.
///
/// One enum covers every stage of a file's pipeline run. Only [`LoadError::StoreUnavailable`] is
/// fatal for a whole run; everything else aborts the current file only.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying I/O error (file not found, permission denied, invalid UTF-8, terminal I/O).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// No detector produced non-empty headers and rows for the file.
    #[error("could not detect format of {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    /// The confirmed schema cannot be used (identifier collision, bad override, header count).
    #[error("schema error: {message}")]
    Schema { message: String },

    /// The target relation already exists with a shape incompatible with the schema.
    #[error("relation '{relation}' conflicts with the proposed schema: {message}")]
    RelationConflict { relation: String, message: String },

    /// A statement failed while inserting; the file's whole insert was rolled back.
    #[error("failed to load rows into '{relation}': {source}")]
    LoadFailure {
        relation: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The target store cannot be opened or written.
    #[error("store unavailable at {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Any other store error (ad hoc queries, relation creation).
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The reconciler cancelled ingestion of this file.
    #[error("ingestion of {} aborted", path.display())]
    Aborted { path: PathBuf },
}

impl LoadError {
    /// Returns true if the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }
}
