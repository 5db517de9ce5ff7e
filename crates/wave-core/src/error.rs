//! Error types for wave-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wave-core
#[derive(Debug, Error)]
pub enum Error {
    /// No datasets were selected for a merge
    #[error("no datasets selected for merge")]
    EmptyDatasetSet,

    /// Primary key column is absent from one or more waves
    #[error("primary key '{key}' is missing from wave(s) {}", join_waves(.waves))]
    MissingPrimaryKey { key: String, waves: Vec<u32> },

    /// A wave repeats a primary-key value, so rows cannot be aligned one-to-one.
    /// An empty `value` means several rows lack a key value.
    #[error("wave {wave} has {} in key column '{column}'", describe_duplicate(.value))]
    DuplicateKeyInWideMerge {
        wave: u32,
        column: String,
        value: String,
    },

    /// Two selected datasets carry the same wave number
    #[error("more than one dataset is tagged as wave {wave}")]
    DuplicateWave { wave: u32 },

    /// Wave numbers start at 1
    #[error("dataset '{source_name}' has wave 0; waves must be positive")]
    InvalidWave { source_name: String },

    /// A generated column name clashes with one already in the table
    #[error("column '{column}' from wave {wave} conflicts with an existing column")]
    ColumnConflict { wave: u32, column: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse CSV
    #[error("failed to parse CSV '{path}': {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// CSV writing error
    #[error("CSV write error: {0}")]
    CsvWrite(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_waves(waves: &[u32]) -> String {
    waves
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_duplicate(value: &str) -> String {
    if value.is_empty() {
        "more than one row with a missing key value".to_string()
    } else {
        format!("duplicate value '{}'", value)
    }
}
