//! Workspace configuration

use crate::error::{D2rDiffError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings persisted in `.d2rdiff/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub format_version: String,
    /// External extractor binary
    pub tool_path: Option<PathBuf>,
    /// Rough number of table files in a full extraction, used only for percentages
    pub estimated_total_files: usize,
    /// Wildcard handed to the extractor's file-pattern flag
    pub file_pattern: String,
    pub table_extension: String,
    /// Marker file relative to the extraction root holding the build identifier
    pub version_marker: PathBuf,
    /// Rows appended between flushes when indexing
    pub batch_size: usize,
    /// DuckDB memory limit, e.g. "2GB"
    pub memory_limit: Option<String>,
    pub index_after_extract: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format_version: crate::FORMAT_VERSION.to_string(),
            tool_path: None,
            estimated_total_files: crate::DEFAULT_ESTIMATED_FILES,
            file_pattern: "*".to_string(),
            table_extension: crate::TABLE_EXTENSION.to_string(),
            version_marker: PathBuf::from(crate::VERSION_MARKER_PATH),
            batch_size: crate::DEFAULT_BATCH_SIZE,
            memory_limit: None,
            index_after_extract: true,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; keys that are absent keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            D2rDiffError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let settings: Settings = serde_json::from_str(&content).map_err(|e| {
            D2rDiffError::config(format!("Failed to parse config {}: {}", path.display(), e))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings if the file exists, otherwise defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(D2rDiffError::config("batch_size must be greater than 0"));
        }
        if self.table_extension.is_empty() || self.table_extension.contains('.') {
            return Err(D2rDiffError::config(format!(
                "table_extension must be a bare extension like 'txt', got '{}'",
                self.table_extension
            )));
        }
        if self.version_marker.is_absolute() {
            return Err(D2rDiffError::config(
                "version_marker must be relative to the extraction root",
            ));
        }
        Ok(())
    }

    /// Extractor path, or a configuration error naming how to set it
    pub fn require_tool(&self) -> Result<&Path> {
        self.tool_path.as_deref().ok_or_else(|| {
            D2rDiffError::config(
                "No extractor configured. Pass --tool or set tool_path in .d2rdiff/config.json",
            )
        })
    }
}
