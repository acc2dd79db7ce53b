//! Tab-delimited table reading

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One row of a table: its fields in file order
pub type Row = Vec<String>;

/// A parsed tab-delimited file
#[derive(Debug, Clone)]
pub struct Table {
    /// Path relative to the directory it was read from, `/`-separated
    pub path: String,
    pub rows: Vec<Row>,
}

impl Table {
    /// Read `relative` under `root`
    pub fn read(root: &Path, relative: &str) -> Result<Self> {
        let rows = read_rows(&root.join(relative))?;
        Ok(Self {
            path: relative.to_string(),
            rows,
        })
    }

    /// Header row, or `None` for an empty file
    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Header fields; empty for an empty file
    pub fn header_fields(&self) -> &[String] {
        self.header().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows after the header
    pub fn data_rows(&self) -> &[Row] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }
}

/// Read every line of a file as a row of tab-separated fields.
///
/// Trailing empty fields are kept, so `a\t\t` yields three fields. Bytes that
/// are not valid UTF-8 are replaced rather than rejected.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(content.lines().map(split_fields).collect())
}

/// Split a single line on tabs without collapsing empty fields
pub fn split_fields(line: &str) -> Row {
    line.split('\t').map(str::to_string).collect()
}

/// Whether `path` names a table file with the given extension (case-insensitive)
pub fn has_table_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// List every table file under `root` as sorted, `/`-separated relative paths
pub fn list_table_files(root: &Path, extension: &str) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for path in walk_table_files(root, extension)? {
        if let Ok(relative) = path.strip_prefix(root) {
            files.push(normalize_relative(relative));
        }
    }

    files.sort();
    Ok(files)
}

/// Absolute paths of every regular table file under `root`
pub fn walk_table_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() && has_table_extension(entry.path(), extension) {
            paths.push(entry.into_path());
        }
    }

    Ok(paths)
}

/// Render a relative path with `/` separators regardless of platform
pub fn normalize_relative(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
