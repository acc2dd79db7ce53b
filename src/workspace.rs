//! Workspace management: extraction root, committed versions, stores and reports

use crate::config::Settings;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the working directory the extractor writes into
pub const WORKING_DIR_NAME: &str = "latest";

/// Manages the .d2rdiff workspace directory
#[derive(Debug, Clone)]
pub struct D2rWorkspace {
    /// Project root directory (where .d2rdiff/ lives)
    pub root: PathBuf,
    /// .d2rdiff/ directory path
    pub state_dir: PathBuf,
    /// .d2rdiff/extracted/ holds the working dir and committed versions
    pub extracted_dir: PathBuf,
    /// .d2rdiff/indexes/ holds one store per version
    pub indexes_dir: PathBuf,
    /// .d2rdiff/reports/ holds JSON diff reports
    pub reports_dir: PathBuf,
}

/// A committed version directory
#[derive(Debug, Clone, Serialize)]
pub struct VersionEntry {
    pub version: String,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
}

impl D2rWorkspace {
    /// Find existing workspace or create a new one
    pub fn find_or_create(start_dir: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let start = start_dir.unwrap_or(&current_dir);

        if let Some(workspace) = Self::find_existing(start) {
            return Ok(workspace);
        }

        Self::create_new(start.to_path_buf())
    }

    /// Find existing .d2rdiff workspace by walking up directory tree
    fn find_existing(start_dir: &Path) -> Option<Self> {
        let mut current = start_dir;

        loop {
            if current.join(".d2rdiff").is_dir() {
                return Some(Self::from_root(current.to_path_buf()));
            }

            if current.join(".git").exists() {
                break;
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        None
    }

    /// Create a new workspace in the specified root directory
    pub fn create_new(root: PathBuf) -> Result<Self> {
        let workspace = Self::from_root(root);
        workspace.ensure_dirs()?;
        workspace.write_default_config(false)?;

        log::info!("Created d2rdiff workspace at: {}", workspace.root.display());

        Ok(workspace)
    }

    /// Create workspace from root directory path
    pub fn from_root(root: PathBuf) -> Self {
        let state_dir = root.join(".d2rdiff");
        let extracted_dir = state_dir.join("extracted");
        let indexes_dir = state_dir.join("indexes");
        let reports_dir = state_dir.join("reports");

        Self {
            root,
            state_dir,
            extracted_dir,
            indexes_dir,
            reports_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.extracted_dir)?;
        fs::create_dir_all(&self.indexes_dir)?;
        fs::create_dir_all(&self.reports_dir)?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.json")
    }

    /// Write the default config, leaving an existing one alone unless forced
    pub fn write_default_config(&self, force: bool) -> Result<()> {
        let path = self.config_path();
        if path.exists() && !force {
            return Ok(());
        }
        Settings::default().save(&path)
    }

    pub fn settings(&self) -> Result<Settings> {
        Settings::load_or_default(&self.config_path())
    }

    /// Directory the extractor writes into before versioning
    pub fn working_dir(&self) -> PathBuf {
        self.extracted_dir.join(WORKING_DIR_NAME)
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.extracted_dir.join(version)
    }

    pub fn store_path(&self, version: &str) -> PathBuf {
        self.indexes_dir.join(format!("{}.duckdb", version))
    }

    pub fn report_path(&self, name: &str) -> PathBuf {
        self.reports_dir.join(format!("{}.json", name))
    }

    pub fn version_exists(&self, version: &str) -> bool {
        version != WORKING_DIR_NAME && self.version_dir(version).is_dir()
    }

    /// Committed versions sorted by name
    pub fn list_versions(&self) -> Result<Vec<VersionEntry>> {
        let mut versions = Vec::new();

        if !self.extracted_dir.exists() {
            return Ok(versions);
        }

        for entry in fs::read_dir(&self.extracted_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name == WORKING_DIR_NAME {
                continue;
            }

            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            versions.push(VersionEntry {
                version: name,
                path: entry.path(),
                modified,
            });
        }

        versions.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(versions)
    }

    /// Most recently committed version by modification time
    pub fn latest_version(&self) -> Result<Option<VersionEntry>> {
        let versions = self.list_versions()?;
        Ok(versions.into_iter().max_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.version.cmp(&b.version))
        }))
    }
}
