//! Command-line interface for d2rdiff

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "d2rdiff")]
#[command(about = "Extract, version, index and diff game data tables")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override workspace location
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Log filter used when RUST_LOG is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize d2rdiff workspace
    Init {
        /// Overwrite an existing config with defaults
        #[arg(long)]
        force: bool,
    },

    /// Run the external extractor and commit the result as a version
    Extract {
        /// Game installation (archive source) directory
        source: PathBuf,

        /// Extractor executable (overrides tool_path in config)
        #[arg(long)]
        tool: Option<PathBuf>,

        /// Expected number of table files, used for the progress percentage
        #[arg(long, value_parser = validate_positive)]
        estimated_files: Option<usize>,

        /// Do not index the committed snapshot
        #[arg(long)]
        no_index: bool,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Load a snapshot into a queryable DuckDB store
    Index {
        /// Snapshot: version name, "latest", or a directory path
        #[arg(default_value = "latest")]
        snapshot: String,

        /// Store file (defaults to .d2rdiff/indexes/<version>.duckdb)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Rows appended between flushes (must be > 0)
        #[arg(long, value_parser = validate_positive)]
        batch_size: Option<usize>,
    },

    /// Compare mod directories against a baseline snapshot
    Diff {
        /// Baseline: version name, "latest", or a directory path
        baseline: String,

        /// Mod directories to compare
        #[arg(required = true)]
        candidates: Vec<PathBuf>,

        /// Directory for JSON reports (defaults to .d2rdiff/reports)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// List committed versions
    Versions {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Validate that a count is greater than 0
fn validate_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("Invalid value: '{}'. Must be a positive integer.", s))?;

    if value == 0 {
        return Err("Value must be greater than 0".to_string());
    }

    Ok(value)
}
