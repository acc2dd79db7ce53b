//! # d2rdiff
//!
//! Extracts a game's tab-delimited data tables with an external extractor,
//! commits each extraction under its build identifier, indexes snapshots into
//! DuckDB and reports structural and content differences between a baseline
//! snapshot and mod directories.

pub mod cancel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod diff;
pub mod error;
pub mod extraction;
pub mod indexer;
pub mod output;
pub mod progress;
pub mod resolver;
pub mod table;
pub mod workspace;

pub use cancel::CancellationToken;
pub use diff::{Comparison, DiffEngine, DiffResult, FileReport};
pub use error::{D2rDiffError, Result};
pub use extraction::{ExtractionOrchestrator, ExtractionOutcome, ExtractionRun, VersionedSnapshot};
pub use indexer::{BatchIndexer, IndexReport};
pub use workspace::D2rWorkspace;

/// Current format version for d2rdiff config files
pub const FORMAT_VERSION: &str = "1.0.0";

/// Extension of the data table files
pub const TABLE_EXTENSION: &str = "txt";

/// Marker file holding the build identifier, relative to an extraction root
pub const VERSION_MARKER_PATH: &str = "data/global/dataversionbuild.txt";

/// Approximate table file count of a full extraction
pub const DEFAULT_ESTIMATED_FILES: usize = 350;

/// Default number of rows appended between flushes when indexing
pub const DEFAULT_BATCH_SIZE: usize = 1000;
