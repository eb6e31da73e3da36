//! Error types for md-core

use crate::table::RecordId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in md-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Header row has no `id` column
    #[error("id column not found: {path}")]
    MissingIdColumn { path: PathBuf },

    /// The same (id, column) pair appears twice in one file
    #[error("duplicate key (id {id}, column '{column}'): {path} row {row}")]
    DuplicateKey {
        path: PathBuf,
        row: usize,
        id: RecordId,
        column: String,
    },

    /// Blank cell; blanks are never treated as "leave unchanged"
    #[error("empty value in column '{column}': {path} row {row}")]
    EmptyValue {
        path: PathBuf,
        row: usize,
        column: String,
    },

    /// The id cell is not a non-negative integer
    #[error("invalid id '{value}': {path} row {row}")]
    InvalidId {
        path: PathBuf,
        row: usize,
        value: String,
    },

    /// None of delete/update/insert exist under a version directory
    #[error("neither insert/update/delete directories were found for table '{table}': {dir}")]
    NoEditDirectories { dir: PathBuf, table: String },

    /// Delete file names an id the table does not hold
    #[error("attempted to delete a non-existent id {id}: {path}")]
    DeleteMissingId { id: RecordId, path: PathBuf },

    /// Insert file names an id the table already holds
    #[error("tried to insert an existing id {id}: {path}")]
    InsertExistingId { id: RecordId, path: PathBuf },

    /// Update file names an id the table does not hold
    #[error("tried to update a non-existent id {id}: {path}")]
    UpdateMissingId { id: RecordId, path: PathBuf },

    /// An id was targeted more than once by insert/update files of one version
    #[error("id {id} is not unique within {dir} for table '{table}'")]
    IdNotUnique {
        dir: PathBuf,
        table: String,
        id: RecordId,
    },

    /// A record has no value for a column other records carry
    #[error("table '{table}': record {id} has no value for column '{column}'")]
    MissingCell {
        table: String,
        id: RecordId,
        column: String,
    },

    /// Version name is not of the form `1_2_3`
    #[error("invalid version format: '{0}'")]
    InvalidVersion(String),

    /// Version not present in the list being searched
    #[error("version not found: {0}")]
    VersionNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
