//! Output formatting utilities

use crate::diff::{Comparison, ComparisonSummary, DiffState, FileReport};
use crate::error::Result;
use crate::extraction::ExtractionOutcome;
use crate::indexer::{IndexOutcome, IndexReport};
use crate::workspace::VersionEntry;
use std::fs;
use std::path::Path;

/// Pretty printer for d2rdiff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print committed versions
    pub fn print_versions(versions: &[VersionEntry]) {
        if versions.is_empty() {
            println!("No versions committed yet.");
            return;
        }

        println!("📦 Committed versions:");
        for (i, entry) in versions.iter().enumerate() {
            let prefix = if i == versions.len() - 1 { "└─" } else { "├─" };
            let modified = entry
                .modified
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("{} {} ({})", prefix, entry.version, modified);
        }
    }

    pub fn print_extraction_outcome(outcome: &ExtractionOutcome) {
        match outcome {
            ExtractionOutcome::Committed(snapshot) => {
                println!("✅ Committed version '{}'", snapshot.version);
                println!("└─ {}", snapshot.path.display());
            }
            ExtractionOutcome::Discarded { existing } => {
                println!(
                    "🟡 Version '{}' already exists, extraction discarded",
                    existing.version
                );
                println!("└─ {}", existing.path.display());
            }
        }
    }

    pub fn print_index_report(report: &IndexReport) {
        let skipped = report
            .files
            .iter()
            .filter(|f| matches!(f.outcome, IndexOutcome::Skipped { .. }))
            .count();
        let failures: Vec<_> = report.failures().collect();

        println!("🗄️  Index: {}", report.store.display());
        println!("├─ Tables: {}", report.tables_loaded());
        println!("├─ Rows: {}", report.rows_loaded());
        println!("├─ Skipped files: {}", skipped);
        if failures.is_empty() {
            println!("└─ ✅ Failed files: 0");
        } else {
            println!("└─ ❌ Failed files: {}", failures.len());
            for (i, failure) in failures.iter().enumerate() {
                let prefix = if i == failures.len() - 1 { "   └─" } else { "   ├─" };
                if let IndexOutcome::Failed { reason } = &failure.outcome {
                    println!("{} {}: {}", prefix, failure.file, reason);
                }
            }
        }
    }

    /// Print per-category counts and the files with differences
    pub fn print_comparison(comparison: &Comparison) {
        let summary = comparison.summary();
        println!(
            "🔍 {} → {}",
            comparison.baseline.display(),
            comparison.candidate.display()
        );
        Self::print_summary(&summary);

        let flagged: Vec<&FileReport> = comparison
            .files
            .iter()
            .filter(|r| r.result().map_or(true, |d| d.has_differences()))
            .collect();

        for (i, report) in flagged.iter().enumerate() {
            let prefix = if i == flagged.len() - 1 { "   └─" } else { "   ├─" };
            match report {
                FileReport::Unreadable { file, reason } => {
                    println!("{} {}: unreadable ({})", prefix, file, reason);
                }
                FileReport::Compared(result) => {
                    let detail = match result.state() {
                        DiffState::Missing => report
                            .missing_reason()
                            .map(|e| e.to_string())
                            .unwrap_or_default(),
                        DiffState::BadHeaders => format!(
                            "{} missing / {} unknown headers",
                            result.missing_headers.len(),
                            result.unknown_headers.len()
                        ),
                        DiffState::EntriesCompared => format!(
                            "{} reordered headers, {} missing / {} mismatched entries",
                            result.mismatched_headers.len(),
                            result.missing_entries.len(),
                            result.mismatched_entries.len()
                        ),
                    };
                    println!("{} {}: {}", prefix, result.file, detail);
                }
            }
        }
    }

    fn print_summary(summary: &ComparisonSummary) {
        let mark = |n: usize| if n == 0 { "✅" } else { "❌" };
        println!("├─ Files compared: {}", summary.files_compared);
        println!("├─ {} No baseline file: {}", mark(summary.missing_files), summary.missing_files);
        println!("├─ {} Unreadable: {}", mark(summary.unreadable), summary.unreadable);
        println!("├─ {} Missing headers: {}", mark(summary.missing_headers), summary.missing_headers);
        println!("├─ {} Unknown headers: {}", mark(summary.unknown_headers), summary.unknown_headers);
        println!("├─ {} Mismatched headers: {}", mark(summary.mismatched_headers), summary.mismatched_headers);
        println!("├─ {} Missing entries: {}", mark(summary.missing_entries), summary.missing_entries);
        println!("└─ {} Mismatched entries: {}", mark(summary.mismatched_entries), summary.mismatched_entries);
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Write a comparison and its summary to `path`
    pub fn write_comparison(comparison: &Comparison, path: &Path) -> Result<()> {
        let json = serde_json::json!({
            "baseline": comparison.baseline,
            "candidate": comparison.candidate,
            "summary": comparison.summary(),
            "files": comparison.files,
        });

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&json)?)?;
        Ok(())
    }
}
