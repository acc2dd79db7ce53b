//! Snapshot reference resolution

use crate::error::{D2rDiffError, Result};
use crate::workspace::D2rWorkspace;
use std::fs;
use std::path::{Path, PathBuf};

/// Reference to a snapshot (by version, `latest`, or path)
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotRef {
    /// Most recently committed version
    Latest,
    /// Committed version name (e.g., "1.6.84219")
    Version(String),
    /// Direct path to an extracted directory
    Path(PathBuf),
}

impl SnapshotRef {
    pub fn from_string(s: &str) -> Self {
        if s.eq_ignore_ascii_case("latest") {
            return Self::Latest;
        }
        let path = Path::new(s);
        if path.exists() || s.contains('/') || s.contains('\\') {
            Self::Path(path.to_path_buf())
        } else {
            Self::Version(s.to_string())
        }
    }
}

/// A snapshot directory ready to be read
#[derive(Debug, Clone)]
pub struct ResolvedSnapshot {
    pub name: String,
    pub path: PathBuf,
}

/// Resolves snapshot references against a workspace
#[derive(Debug)]
pub struct SnapshotResolver {
    workspace: D2rWorkspace,
}

impl SnapshotResolver {
    pub fn new(workspace: D2rWorkspace) -> Self {
        Self { workspace }
    }

    pub fn resolve(&self, snapshot_ref: &SnapshotRef) -> Result<ResolvedSnapshot> {
        match snapshot_ref {
            SnapshotRef::Latest => self.resolve_latest(),
            SnapshotRef::Version(version) => self.resolve_version(version),
            SnapshotRef::Path(path) => self.resolve_path(path),
        }
    }

    fn resolve_latest(&self) -> Result<ResolvedSnapshot> {
        let latest = self
            .workspace
            .latest_version()?
            .ok_or_else(|| D2rDiffError::SnapshotNotFound {
                name: "latest".to_string(),
            })?;

        Ok(ResolvedSnapshot {
            name: latest.version,
            path: latest.path,
        })
    }

    fn resolve_version(&self, version: &str) -> Result<ResolvedSnapshot> {
        if !self.workspace.version_exists(version) {
            return Err(D2rDiffError::SnapshotNotFound {
                name: version.to_string(),
            });
        }

        Ok(ResolvedSnapshot {
            name: version.to_string(),
            path: self.workspace.version_dir(version),
        })
    }

    fn resolve_path(&self, path: &Path) -> Result<ResolvedSnapshot> {
        if !path.is_dir() {
            return Err(D2rDiffError::invalid_input(format!(
                "Not a directory: {}",
                path.display()
            )));
        }

        let name = self
            .committed_version_name(path)
            .unwrap_or_else(|| display_name(path));

        Ok(ResolvedSnapshot {
            name,
            path: path.to_path_buf(),
        })
    }

    /// Full directory name when `path` is a version directory of this workspace
    fn committed_version_name(&self, path: &Path) -> Option<String> {
        let path = fs::canonicalize(path).ok()?;
        let extracted = fs::canonicalize(&self.workspace.extracted_dir).ok()?;
        if path.parent()? != extracted {
            return None;
        }

        let name = path.file_name()?.to_str()?.to_string();
        self.workspace.version_exists(&name).then_some(name)
    }
}

/// Short name for a directory: its last component up to the first dot.
///
/// `mods/Reimagined/Reimagined.mpq` becomes `Reimagined`.
pub fn display_name(path: &Path) -> String {
    let last = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    match last.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => last,
    }
}
