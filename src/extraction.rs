//! External extractor orchestration and snapshot versioning
//!
//! One run launches the extractor against a source tree, merges its stdout
//! and stderr into a single line stream, reports heuristic progress for every
//! line and honours cancellation between lines. A successful run is committed
//! by renaming the working directory after the build identifier found in the
//! version marker file; an identifier that is already committed wins and the
//! fresh extraction is thrown away.

use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{D2rDiffError, Result};
use crate::table::read_rows;
use crate::workspace::{D2rWorkspace, WORKING_DIR_NAME};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, BufReader, PipeReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// How long to wait for tool output before re-checking cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parameters of one extractor invocation
#[derive(Debug, Clone)]
pub struct ExtractionRun {
    pub source: PathBuf,
    /// Directory the tool writes into; renamed to the version on success
    pub working_dir: PathBuf,
    pub tool: PathBuf,
    /// Only used for the progress percentage
    pub estimated_total_files: usize,
    pub file_pattern: String,
    /// Marker file relative to `working_dir`
    pub version_marker: PathBuf,
    pub table_extension: String,
}

impl ExtractionRun {
    pub fn new(source: impl Into<PathBuf>, working_dir: impl Into<PathBuf>, tool: impl Into<PathBuf>) -> Self {
        let defaults = Settings::default();
        Self {
            source: source.into(),
            working_dir: working_dir.into(),
            tool: tool.into(),
            estimated_total_files: defaults.estimated_total_files,
            file_pattern: defaults.file_pattern,
            version_marker: defaults.version_marker,
            table_extension: defaults.table_extension,
        }
    }

    /// Build a run that extracts into the workspace's working directory
    pub fn for_workspace(
        source: impl Into<PathBuf>,
        workspace: &D2rWorkspace,
        settings: &Settings,
        tool: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            working_dir: workspace.working_dir(),
            tool: tool.into(),
            estimated_total_files: settings.estimated_total_files,
            file_pattern: settings.file_pattern.clone(),
            version_marker: settings.version_marker.clone(),
            table_extension: settings.table_extension.clone(),
        }
    }

    pub fn with_estimated_total(mut self, estimated_total_files: usize) -> Self {
        self.estimated_total_files = estimated_total_files;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.tool);
        cmd.arg("-s")
            .arg(&self.source)
            .arg("-d")
            .arg(&self.working_dir)
            .arg("-p")
            .arg(&self.file_pattern)
            .stdin(Stdio::null());
        cmd
    }

    /// Start the tool with stdout and stderr sharing one pipe, so lines keep
    /// the order the tool wrote them in
    fn spawn(&self) -> Result<(Child, PipeReader)> {
        let spawn_error = |source: io::Error| D2rDiffError::Spawn {
            tool: self.tool.clone(),
            source,
        };

        let (reader, writer) = io::pipe().map_err(spawn_error)?;
        let stderr = writer.try_clone().map_err(spawn_error)?;
        // The Command holds the parent's write ends; it is dropped right after
        // spawning so the reader sees EOF once the tool exits
        let child = self
            .command()
            .stdout(writer)
            .stderr(stderr)
            .spawn()
            .map_err(spawn_error)?;

        Ok((child, reader))
    }

    fn command_line(&self) -> String {
        format!(
            "{} -s {} -d {} -p {}",
            self.tool.display(),
            self.source.display(),
            self.working_dir.display(),
            self.file_pattern
        )
    }
}

/// An extraction committed under its build identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionedSnapshot {
    pub version: String,
    pub path: PathBuf,
}

/// Result of a run that finished without error
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// The working directory was renamed to a new version directory
    Committed(VersionedSnapshot),
    /// The version was already committed; the fresh extraction was removed
    Discarded { existing: VersionedSnapshot },
}

impl ExtractionOutcome {
    /// The snapshot created by this run, if any
    pub fn committed(&self) -> Option<&VersionedSnapshot> {
        match self {
            Self::Committed(snapshot) => Some(snapshot),
            Self::Discarded { .. } => None,
        }
    }

    /// The snapshot that is authoritative for this version after the run
    pub fn snapshot(&self) -> &VersionedSnapshot {
        match self {
            Self::Committed(snapshot) => snapshot,
            Self::Discarded { existing } => existing,
        }
    }
}

/// Turns tool chatter into an approximate percentage
#[derive(Debug)]
pub struct ProgressEstimator {
    extracted: usize,
    estimated_total: usize,
    suffix: String,
}

impl ProgressEstimator {
    pub fn new(estimated_total: usize, table_extension: &str) -> Self {
        Self {
            extracted: 0,
            estimated_total,
            suffix: format!(".{}", table_extension.to_ascii_lowercase()),
        }
    }

    /// Count `line` if it names a table file and return the current percent
    pub fn observe(&mut self, line: &str) -> u8 {
        if line.trim().to_ascii_lowercase().ends_with(&self.suffix) {
            self.extracted += 1;
        }
        self.percent()
    }

    pub fn percent(&self) -> u8 {
        if self.estimated_total == 0 {
            return 0;
        }
        let ratio = 100.0 * self.extracted as f64 / self.estimated_total as f64;
        ratio.round().min(100.0) as u8
    }

    pub fn extracted(&self) -> usize {
        self.extracted
    }
}

/// Runs the external extractor, one run at a time per orchestrator
#[derive(Debug, Default)]
pub struct ExtractionOrchestrator {
    active: Mutex<Option<CancellationToken>>,
}

impl ExtractionOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the in-flight run. Returns `false` and does nothing when idle.
    pub fn cancel(&self) -> bool {
        match self.lock_active().as_ref() {
            Some(token) => {
                log::info!("Cancellation requested for running extraction");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Run the extractor and commit its output.
    ///
    /// `sink` receives `(percent, line)` for every line the tool prints.
    pub fn extract<F>(
        &self,
        run: &ExtractionRun,
        mut sink: F,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutcome>
    where
        F: FnMut(u8, &str),
    {
        let _active = ActiveRun::register(&self.active, cancel.clone());

        reset_working_dir(&run.working_dir)?;
        if let Err(e) = self.run_tool(run, &mut sink, cancel) {
            discard_working_dir(&run.working_dir);
            return Err(e);
        }

        commit_version(&run.working_dir, &run.version_marker)
    }

    /// Spawn the tool and stream its output until it exits or is cancelled
    fn run_tool<F>(&self, run: &ExtractionRun, sink: &mut F, cancel: &CancellationToken) -> Result<()>
    where
        F: FnMut(u8, &str),
    {
        cancel.check()?;

        log::info!("Running: {}", run.command_line());
        let (mut child, output) = run.spawn()?;

        let lines = read_lines(output);
        let mut estimator = ProgressEstimator::new(run.estimated_total_files, &run.table_extension);
        let mut last_line = String::new();

        loop {
            match lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    if cancel.is_cancelled() {
                        terminate(&mut child);
                        return Err(D2rDiffError::Cancelled);
                    }
                    let percent = estimator.observe(&line);
                    log::debug!("extractor: {}", line);
                    sink(percent, &line);
                    last_line = line;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        terminate(&mut child);
                        return Err(D2rDiffError::Cancelled);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let status = child.wait()?;
        if cancel.is_cancelled() {
            return Err(D2rDiffError::Cancelled);
        }
        if !status.success() {
            return Err(D2rDiffError::ExternalTool {
                code: status.code().unwrap_or(-1),
                last_line,
            });
        }

        log::info!(
            "Extractor finished: {} table files reported",
            estimator.extracted()
        );
        Ok(())
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Records the running token for `cancel()` and clears it when the run ends
struct ActiveRun<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
}

impl<'a> ActiveRun<'a> {
    fn register(slot: &'a Mutex<Option<CancellationToken>>, token: CancellationToken) -> Self {
        *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
        Self { slot }
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

/// Forward every output line into a channel
fn read_lines(output: PipeReader) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    pump_lines(output, tx);
    rx
}

/// The reader thread is detached: after a kill, a grandchild may still hold the
/// pipe open and the thread ends once it closes or the receiver is gone.
fn pump_lines<R: Read + Send + 'static>(reader: R, tx: Sender<String>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(|c| c == '\r' || c == '\n')
                        .to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Extractor stream closed: {}", e);
                    break;
                }
            }
        }
    });
}

fn terminate(child: &mut Child) {
    log::info!("Terminating extractor (pid {})", child.id());
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill extractor: {}", e);
    }
    if let Err(e) = child.wait() {
        log::warn!("Failed to reap extractor: {}", e);
    }
}

/// Remove output left behind by an earlier aborted run and recreate the dir
fn reset_working_dir(working_dir: &Path) -> Result<()> {
    if working_dir.exists() {
        log::info!(
            "Removing leftover working directory '{}'",
            working_dir.display()
        );
        fs::remove_dir_all(working_dir)?;
    }
    fs::create_dir_all(working_dir)?;
    Ok(())
}

/// Best-effort removal of a failed run's partial output
fn discard_working_dir(working_dir: &Path) {
    if let Err(e) = fs::remove_dir_all(working_dir) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!(
                "Failed to remove working directory '{}': {}",
                working_dir.display(),
                e
            );
        }
    }
}

/// Read the build identifier from the marker file's first field
pub fn read_version_marker(path: &Path) -> Result<String> {
    let rows = read_rows(path).map_err(|e| D2rDiffError::malformed_marker(path, e.to_string()))?;

    let version = rows
        .first()
        .and_then(|row| row.first())
        .map(|field| field.trim().to_string())
        .unwrap_or_default();

    if version.is_empty() {
        return Err(D2rDiffError::malformed_marker(path, "marker is empty"));
    }
    if version == "."
        || version == ".."
        || version == WORKING_DIR_NAME
        || version.contains(['/', '\\'])
    {
        return Err(D2rDiffError::malformed_marker(
            path,
            format!("'{}' is not usable as a directory name", version),
        ));
    }

    Ok(version)
}

/// Rename `working_dir` to a sibling named after its version marker.
///
/// An existing sibling is authoritative: the working directory is removed and
/// the existing snapshot returned.
pub fn commit_version(working_dir: &Path, marker: &Path) -> Result<ExtractionOutcome> {
    let version = read_version_marker(&working_dir.join(marker))?;
    let parent = working_dir.parent().ok_or_else(|| {
        D2rDiffError::invalid_input(format!(
            "Working directory has no parent: {}",
            working_dir.display()
        ))
    })?;
    let target = parent.join(&version);

    if target.exists() {
        log::info!(
            "Version folder '{}' already exists, discarding extraction",
            target.display()
        );
        fs::remove_dir_all(working_dir)?;
        return Ok(ExtractionOutcome::Discarded {
            existing: VersionedSnapshot {
                version,
                path: target,
            },
        });
    }

    fs::rename(working_dir, &target)?;
    log::info!("Committed extraction as version folder '{}'", target.display());

    Ok(ExtractionOutcome::Committed(VersionedSnapshot {
        version,
        path: target,
    }))
}
