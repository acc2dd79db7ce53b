//! Error types for d2rdiff operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, D2rDiffError>;

#[derive(Error, Debug)]
pub enum D2rDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Failed to start extractor '{}': {source}", tool.display())]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extractor exited with code {code}: {last_line}")]
    ExternalTool { code: i32, last_line: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Malformed version marker {}: {reason}", path.display())]
    MalformedVersionMarker { path: PathBuf, reason: String },

    #[error("Schema inconsistency in {file}: expected {expected} fields, found {found}")]
    SchemaInconsistency {
        file: String,
        expected: usize,
        found: usize,
    },

    #[error("No baseline file for {file}")]
    MissingComparisonFile { file: String },

    #[error("Snapshot not found: {name}")]
    SnapshotNotFound { name: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Store error: {message}")]
    Store { message: String },
}

impl D2rDiffError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
        }
    }

    pub fn malformed_marker(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedVersionMarker {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True when the error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
