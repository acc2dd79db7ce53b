//! Structural and content comparison of a candidate tree against a baseline
//!
//! The candidate drives the file set: every table file under the candidate
//! directory is looked up in the baseline and compared in five categories.
//! Files that exist only in the baseline are never visited.

use crate::error::{D2rDiffError, Result};
use crate::table::{list_table_files, Row, Table};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Terminal state of one file's comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffState {
    /// No baseline counterpart
    Missing,
    /// Header sets differ; entries were not compared
    BadHeaders,
    EntriesCompared,
}

/// Same header set, different position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMismatch {
    pub position: usize,
    /// Baseline header at `position`
    pub expected: String,
    /// Candidate header at `position`
    pub found: String,
}

/// A baseline row and the candidate row sharing its key, tab-joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMismatch {
    pub baseline: String,
    pub candidate: String,
}

/// Differences for one file, relative to the baseline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub file: String,
    pub exists: bool,
    pub baseline_headers: Vec<String>,
    pub missing_headers: Vec<String>,
    pub unknown_headers: Vec<String>,
    pub mismatched_headers: Vec<HeaderMismatch>,
    pub missing_entries: Vec<String>,
    pub mismatched_entries: Vec<EntryMismatch>,
}

impl DiffResult {
    fn missing(file: &str) -> Self {
        Self {
            file: file.to_string(),
            exists: false,
            ..Self::default()
        }
    }

    pub fn has_bad_headers(&self) -> bool {
        !self.missing_headers.is_empty() || !self.unknown_headers.is_empty()
    }

    pub fn state(&self) -> DiffState {
        if !self.exists {
            DiffState::Missing
        } else if self.has_bad_headers() {
            DiffState::BadHeaders
        } else {
            DiffState::EntriesCompared
        }
    }

    pub fn has_differences(&self) -> bool {
        !self.exists
            || self.has_bad_headers()
            || !self.mismatched_headers.is_empty()
            || !self.missing_entries.is_empty()
            || !self.mismatched_entries.is_empty()
    }
}

/// Outcome for one candidate file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileReport {
    Compared(DiffResult),
    /// Either side could not be read
    Unreadable { file: String, reason: String },
}

impl FileReport {
    pub fn file(&self) -> &str {
        match self {
            Self::Compared(result) => &result.file,
            Self::Unreadable { file, .. } => file,
        }
    }

    pub fn result(&self) -> Option<&DiffResult> {
        match self {
            Self::Compared(result) => Some(result),
            Self::Unreadable { .. } => None,
        }
    }

    /// Reason a file had no usable baseline, if it did not
    pub fn missing_reason(&self) -> Option<D2rDiffError> {
        match self {
            Self::Compared(result) if !result.exists => Some(D2rDiffError::MissingComparisonFile {
                file: result.file.clone(),
            }),
            _ => None,
        }
    }
}

/// Every file report for one candidate directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub baseline: PathBuf,
    pub candidate: PathBuf,
    pub files: Vec<FileReport>,
}

impl Comparison {
    pub fn summary(&self) -> ComparisonSummary {
        let mut summary = ComparisonSummary {
            files_compared: self.files.len(),
            ..ComparisonSummary::default()
        };

        for report in &self.files {
            let result = match report {
                FileReport::Compared(result) => result,
                FileReport::Unreadable { .. } => {
                    summary.unreadable += 1;
                    continue;
                }
            };
            if !result.exists {
                summary.missing_files += 1;
            }
            if !result.missing_headers.is_empty() {
                summary.missing_headers += 1;
            }
            if !result.unknown_headers.is_empty() {
                summary.unknown_headers += 1;
            }
            if !result.mismatched_headers.is_empty() {
                summary.mismatched_headers += 1;
            }
            if !result.missing_entries.is_empty() {
                summary.missing_entries += 1;
            }
            if !result.mismatched_entries.is_empty() {
                summary.mismatched_entries += 1;
            }
        }

        summary
    }

    pub fn report_for(&self, file: &str) -> Option<&FileReport> {
        self.files.iter().find(|r| r.file() == file)
    }
}

/// Number of files with at least one item in each category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub files_compared: usize,
    pub missing_files: usize,
    pub unreadable: usize,
    pub missing_headers: usize,
    pub unknown_headers: usize,
    pub mismatched_headers: usize,
    pub missing_entries: usize,
    pub mismatched_entries: usize,
}

impl ComparisonSummary {
    pub fn is_clean(&self) -> bool {
        *self
            == Self {
                files_compared: self.files_compared,
                ..Self::default()
            }
    }
}

/// Compares candidate directories against one baseline
#[derive(Debug, Clone)]
pub struct DiffEngine {
    table_extension: String,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(crate::TABLE_EXTENSION)
    }
}

impl DiffEngine {
    pub fn new(table_extension: impl Into<String>) -> Self {
        Self {
            table_extension: table_extension.into(),
        }
    }

    /// Compare every table file under `candidate` with its baseline counterpart.
    ///
    /// Only listing the candidate directory can fail; per-file problems are
    /// recorded as `FileReport::Unreadable`.
    pub fn compare(&self, baseline: &Path, candidate: &Path) -> Result<Comparison> {
        let files = list_table_files(candidate, &self.table_extension)?;
        log::info!(
            "Comparing {} files from {} against {}",
            files.len(),
            candidate.display(),
            baseline.display()
        );

        let reports = files
            .par_iter()
            .map(|file| compare_file(baseline, candidate, file))
            .collect();

        Ok(Comparison {
            baseline: baseline.to_path_buf(),
            candidate: candidate.to_path_buf(),
            files: reports,
        })
    }

    /// Run one comparison per candidate in parallel and wait for all of them.
    ///
    /// Results are in candidate order; a candidate that cannot be listed
    /// yields its own error without affecting the others.
    pub fn compare_many(&self, baseline: &Path, candidates: &[PathBuf]) -> Vec<Result<Comparison>> {
        candidates
            .par_iter()
            .map(|candidate| self.compare(baseline, candidate))
            .collect()
    }
}

/// Compare one relative file path, catching read failures
pub fn compare_file(baseline: &Path, candidate: &Path, file: &str) -> FileReport {
    let baseline_path = baseline.join(file);
    if !baseline_path.exists() {
        return FileReport::Compared(DiffResult::missing(file));
    }

    let tables = Table::read(baseline, file).and_then(|b| Table::read(candidate, file).map(|c| (b, c)));
    match tables {
        Ok((baseline_table, candidate_table)) => {
            FileReport::Compared(compare_tables(&baseline_table, &candidate_table))
        }
        Err(e) => {
            log::warn!("Cannot compare {}: {}", file, e);
            FileReport::Unreadable {
                file: file.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Compare two parsed tables; `baseline.path` names the result
pub fn compare_tables(baseline: &Table, candidate: &Table) -> DiffResult {
    let baseline_headers = baseline.header_fields();
    let candidate_headers = candidate.header_fields();

    let mut result = DiffResult {
        file: baseline.path.clone(),
        exists: true,
        baseline_headers: baseline_headers.to_vec(),
        missing_headers: difference(baseline_headers, candidate_headers),
        unknown_headers: difference(candidate_headers, baseline_headers),
        ..DiffResult::default()
    };

    if result.has_bad_headers() {
        return result;
    }

    result.mismatched_headers = baseline_headers
        .iter()
        .zip(candidate_headers)
        .enumerate()
        .filter(|(_, (expected, found))| expected != found)
        .map(|(position, (expected, found))| HeaderMismatch {
            position,
            expected: expected.clone(),
            found: found.clone(),
        })
        .collect();

    let (missing, mismatched) = compare_entries(baseline.data_rows(), candidate.data_rows());
    result.missing_entries = missing;
    result.mismatched_entries = mismatched;
    result
}

/// Items of `left` absent from `right`, in `left` order
fn difference(left: &[String], right: &[String]) -> Vec<String> {
    let right: HashSet<&str> = right.iter().map(String::as_str).collect();
    left.iter()
        .filter(|h| !right.contains(h.as_str()))
        .cloned()
        .collect()
}

/// Match baseline rows to candidate rows by first field.
///
/// The first candidate row carrying a key is its match, as a front-to-back
/// scan would find; later rows with the same key are never consulted.
fn compare_entries(baseline: &[Row], candidate: &[Row]) -> (Vec<String>, Vec<EntryMismatch>) {
    let mut by_key: HashMap<&str, &Row> = HashMap::with_capacity(candidate.len());
    for row in candidate {
        if let Some(key) = row.first() {
            by_key.entry(key.as_str()).or_insert(row);
        }
    }

    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for row in baseline {
        let Some(key) = row.first() else {
            continue;
        };

        match by_key.get(key.as_str()) {
            None => missing.push(row.join("\t")),
            Some(found) => {
                if first_divergence(row, found).is_some() {
                    mismatched.push(EntryMismatch {
                        baseline: row.join("\t"),
                        candidate: found.join("\t"),
                    });
                }
            }
        }
    }

    (missing, mismatched)
}

/// Index of the first non-key field that differs; a field present on only
/// one side counts as different
fn first_divergence(baseline: &Row, candidate: &Row) -> Option<usize> {
    let width = baseline.len().max(candidate.len());
    (1..width).find(|&i| baseline.get(i) != candidate.get(i))
}
