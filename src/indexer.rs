//! Bulk loading of an extracted snapshot into a DuckDB store
//!
//! Every table file becomes one all-VARCHAR table named after its relative
//! path. The whole walk runs in a single transaction committed at the end, so
//! an interrupted load leaves no partially populated store behind.
//!
//! A failed statement aborts a DuckDB transaction, so each file is read and
//! validated in full before anything is sent to the store. Problems found at
//! that stage are per-file failures; an error from the store itself ends the
//! load.

use crate::config::Settings;
use crate::error::{D2rDiffError, Result};
use crate::table::{normalize_relative, read_rows, walk_table_files, Row};
use duckdb::{appender_params_from_iter, Connection, Transaction};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Indexer tuning
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Rows appended between flushes
    pub batch_size: usize,
    pub memory_limit: Option<String>,
    pub table_extension: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::DEFAULT_BATCH_SIZE,
            memory_limit: None,
            table_extension: crate::TABLE_EXTENSION.to_string(),
        }
    }
}

impl From<&Settings> for IndexerConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            memory_limit: settings.memory_limit.clone(),
            table_extension: settings.table_extension.clone(),
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexOutcome {
    Loaded {
        table: String,
        rows: usize,
        /// Rows whose field count did not match the header
        dropped: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileIndexResult {
    pub file: String,
    #[serde(flatten)]
    pub outcome: IndexOutcome,
}

/// Per-file results of one index run, in walk order
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub store: PathBuf,
    pub files: Vec<FileIndexResult>,
}

impl IndexReport {
    pub fn tables_loaded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, IndexOutcome::Loaded { .. }))
            .count()
    }

    pub fn rows_loaded(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.outcome {
                IndexOutcome::Loaded { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileIndexResult> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, IndexOutcome::Failed { .. }))
    }

    pub fn outcome_for(&self, file: &str) -> Option<&IndexOutcome> {
        self.files.iter().find(|f| f.file == file).map(|f| &f.outcome)
    }
}

/// A file read and validated, ready to be written
#[derive(Debug)]
struct StagedTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
    dropped: usize,
}

enum Staged {
    Load(StagedTable),
    Skip(String),
}

/// Loads snapshot directories into DuckDB stores
#[derive(Debug, Clone, Default)]
pub struct BatchIndexer {
    config: IndexerConfig,
}

impl BatchIndexer {
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    /// Rebuild the store at `store` from every table file under `snapshot`
    pub fn index(&self, snapshot: &Path, store: &Path) -> Result<IndexReport> {
        if !snapshot.is_dir() {
            return Err(D2rDiffError::invalid_input(format!(
                "Snapshot directory does not exist: {}",
                snapshot.display()
            )));
        }

        reset_store(store)?;
        log::info!("Storing extraction into: {}", store.display());

        let mut connection = Connection::open(store)?;
        self.tune(&connection)?;

        let mut paths = walk_table_files(snapshot, &self.config.table_extension)?;
        paths.sort();

        let tx = connection.transaction()?;
        let mut tables = HashSet::new();
        let mut files = Vec::with_capacity(paths.len());

        for path in paths {
            let relative = match path.strip_prefix(snapshot) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => continue,
            };
            let file = normalize_relative(&relative);

            let outcome = match self.stage(&path, &relative, &mut tables) {
                Ok(Staged::Load(staged)) => {
                    self.load(&tx, &staged)?;
                    log::info!(
                        "Inserted {} rows into {}{}",
                        staged.rows.len(),
                        staged.name,
                        if staged.dropped > 0 {
                            format!(" ({} dropped)", staged.dropped)
                        } else {
                            String::new()
                        }
                    );
                    IndexOutcome::Loaded {
                        table: staged.name,
                        rows: staged.rows.len(),
                        dropped: staged.dropped,
                    }
                }
                Ok(Staged::Skip(reason)) => {
                    log::debug!("Skipping {}: {}", file, reason);
                    IndexOutcome::Skipped { reason }
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", file, e);
                    IndexOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            files.push(FileIndexResult { file, outcome });
        }

        tx.commit()?;

        let report = IndexReport {
            store: store.to_path_buf(),
            files,
        };
        log::info!(
            "Indexed {} tables ({} rows) into {}",
            report.tables_loaded(),
            report.rows_loaded(),
            store.display()
        );

        Ok(report)
    }

    /// Bulk-load settings; the store is rebuildable so durability is traded for speed
    fn tune(&self, connection: &Connection) -> Result<()> {
        connection.execute_batch(
            "SET enable_progress_bar=false;
             SET checkpoint_threshold='1GB';",
        )?;

        if let Some(limit) = &self.config.memory_limit {
            connection.execute_batch(&format!(
                "SET memory_limit='{}';",
                limit.replace('\'', "''")
            ))?;
        }

        Ok(())
    }

    fn stage(&self, path: &Path, relative: &Path, tables: &mut HashSet<String>) -> Result<Staged> {
        let mut rows = read_rows(path)?;

        let Some(header) = rows.first() else {
            return Ok(Staged::Skip("empty file".to_string()));
        };
        if header.len() < 2 {
            return Ok(Staged::Skip("fewer than two columns".to_string()));
        }

        let columns = column_names(header)?;
        let name = table_name_for(relative, &self.config.table_extension);
        if name.is_empty() {
            return Err(D2rDiffError::invalid_input("file name yields an empty table name"));
        }
        if !tables.insert(name.to_ascii_lowercase()) {
            return Err(D2rDiffError::invalid_input(format!(
                "table name '{}' is already used by another file",
                name
            )));
        }

        let file = normalize_relative(relative);
        let expected = columns.len();
        let mut dropped = 0;
        rows.remove(0);
        rows.retain(|row| {
            if row.len() == expected {
                return true;
            }
            if dropped == 0 {
                log::warn!(
                    "{}",
                    D2rDiffError::SchemaInconsistency {
                        file: file.clone(),
                        expected,
                        found: row.len(),
                    }
                );
            }
            dropped += 1;
            false
        });

        Ok(Staged::Load(StagedTable {
            name,
            columns,
            rows,
            dropped,
        }))
    }

    fn load(&self, tx: &Transaction<'_>, staged: &StagedTable) -> Result<()> {
        log::info!("Creating table: {}", staged.name);

        let columns = staged
            .columns
            .iter()
            .map(|c| format!("{} VARCHAR", quote_identifier(c)))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute_batch(&format!(
            "CREATE TABLE {} ({});",
            quote_identifier(&staged.name),
            columns
        ))?;

        let mut appender = tx.appender(&staged.name)?;
        for batch in staged.rows.chunks(self.config.batch_size.max(1)) {
            for row in batch {
                appender.append_row(appender_params_from_iter(row.iter()))?;
            }
            appender.flush()?;
        }

        Ok(())
    }
}

/// Delete an existing store (and its write-ahead log) so the load starts empty
fn reset_store(store: &Path) -> Result<()> {
    if let Some(parent) = store.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    if store.exists() {
        fs::remove_file(store).map_err(|e| {
            D2rDiffError::store(format!("Failed to delete {}: {}", store.display(), e))
        })?;
        log::info!("Deleted existing store: {}", store.display());
    }

    let mut wal = store.as_os_str().to_owned();
    wal.push(".wal");
    let wal = PathBuf::from(wal);
    if wal.exists() {
        fs::remove_file(&wal)?;
    }

    Ok(())
}

/// Trimmed header fields as column names.
///
/// Blank names get a positional placeholder since DuckDB rejects empty
/// identifiers; names that differ only by case collide in DuckDB.
fn column_names(header: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(header.len());

    for (i, raw) in header.iter().enumerate() {
        let trimmed = raw.trim();
        let name = if trimmed.is_empty() {
            format!("column{}", i + 1)
        } else {
            trimmed.to_string()
        };

        if !seen.insert(name.to_lowercase()) {
            return Err(D2rDiffError::invalid_input(format!(
                "duplicate column name '{}'",
                name
            )));
        }
        columns.push(name);
    }

    Ok(columns)
}

/// Table name for a file: relative path without the table extension, with
/// separators and every character outside `[A-Za-z0-9_]` replaced by `_`
pub fn table_name_for(relative: &Path, extension: &str) -> String {
    let joined = normalize_relative(relative);
    let suffix = format!(".{}", extension);

    let stem = if joined.len() >= suffix.len()
        && joined.is_char_boundary(joined.len() - suffix.len())
        && joined[joined.len() - suffix.len()..].eq_ignore_ascii_case(&suffix)
    {
        &joined[..joined.len() - suffix.len()]
    } else {
        joined.as_str()
    };

    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
