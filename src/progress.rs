//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for d2rdiff operations
#[derive(Debug)]
pub struct ProgressReporter {
    pub extract_pb: Option<ProgressBar>,
    pub index_pb: Option<ProgressBar>,
    pub diff_pb: Option<ProgressBar>,
    show_progress: bool,
}

impl ProgressReporter {
    /// Create progress reporter for an extraction run
    pub fn new_for_extraction() -> Self {
        Self {
            extract_pb: Some(create_percent_bar("Starting extractor...")),
            index_pb: None,
            diff_pb: None,
            show_progress: true,
        }
    }

    /// Create progress reporter for diff operations
    pub fn new_for_diff(candidates: usize) -> Self {
        Self {
            extract_pb: None,
            index_pb: None,
            diff_pb: Some(create_spinner(&format!(
                "Comparing {} candidate(s)...",
                candidates
            ))),
            show_progress: true,
        }
    }

    /// Create progress reporter that only shows the indexing spinner
    pub fn new_for_index() -> Self {
        Self {
            extract_pb: None,
            index_pb: None,
            diff_pb: None,
            show_progress: true,
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            extract_pb: None,
            index_pb: None,
            diff_pb: None,
            show_progress: false,
        }
    }

    /// Update extraction percent and show the latest tool line
    pub fn update_extraction(&self, percent: u8, line: &str) {
        if let Some(pb) = &self.extract_pb {
            pb.set_position(u64::from(percent));
            pb.set_message(truncate(line, 60));
        }
    }

    pub fn finish_extraction(&mut self, message: &str) {
        if let Some(pb) = self.extract_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    /// Lazily create the indexing spinner
    pub fn start_index(&mut self, message: &str) {
        if self.show_progress && self.index_pb.is_none() {
            self.index_pb = Some(create_spinner(message));
        }
    }

    pub fn finish_index(&mut self, message: &str) {
        if let Some(pb) = self.index_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    pub fn finish_diff(&mut self, message: &str) {
        if let Some(pb) = self.diff_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        for pb in [
            self.extract_pb.take(),
            self.index_pb.take(),
            self.diff_pb.take(),
        ]
        .into_iter()
        .flatten()
        {
            pb.finish_and_clear();
        }
    }
}

fn truncate(line: &str, max_chars: usize) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let tail: String = trimmed
        .chars()
        .rev()
        .take(max_chars.saturating_sub(1))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("…{}", tail)
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a 0-100 percent bar
fn create_percent_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .expect("Invalid progress template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
