//! Command implementations for d2rdiff CLI

use crate::cancel::CancellationToken;
use crate::cli::{Commands, OutputFormat};
use crate::diff::DiffEngine;
use crate::error::{D2rDiffError, Result};
use crate::extraction::{ExtractionOrchestrator, ExtractionRun};
use crate::indexer::{BatchIndexer, IndexReport, IndexerConfig};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use crate::resolver::{display_name, SnapshotRef, SnapshotResolver};
use crate::workspace::D2rWorkspace;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Execute a command
pub fn execute_command(command: Commands, workspace_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Init { force } => init_command(workspace_path, force),
        Commands::Extract {
            source,
            tool,
            estimated_files,
            no_index,
            timeout,
        } => extract_command(
            workspace_path,
            &source,
            tool.as_deref(),
            estimated_files,
            no_index,
            timeout,
        ),
        Commands::Index {
            snapshot,
            store,
            batch_size,
        } => index_command(workspace_path, &snapshot, store.as_deref(), batch_size),
        Commands::Diff {
            baseline,
            candidates,
            output,
            format,
        } => diff_command(workspace_path, &baseline, &candidates, output.as_deref(), &format),
        Commands::Versions { format } => versions_command(workspace_path, &format),
    }
}

/// Initialize d2rdiff workspace
fn init_command(workspace_path: Option<&Path>, force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let root = workspace_path.unwrap_or(&current_dir);

    // Always create in the given directory, never a parent's workspace
    let workspace = D2rWorkspace::create_new(root.to_path_buf())?;
    if force {
        workspace.write_default_config(true)?;
    }

    println!("✅ Initialized d2rdiff workspace at: {}", workspace.root.display());
    println!("📁 Config: {}", workspace.config_path().display());

    Ok(())
}

/// Run the extractor, commit the version and optionally index it
fn extract_command(
    workspace_path: Option<&Path>,
    source: &Path,
    tool: Option<&Path>,
    estimated_files: Option<usize>,
    no_index: bool,
    timeout: Option<u64>,
) -> Result<()> {
    let workspace = D2rWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;

    if !source.is_dir() {
        return Err(D2rDiffError::invalid_input(format!(
            "Source directory does not exist: {}",
            source.display()
        )));
    }

    let tool = match tool {
        Some(tool) => tool.to_path_buf(),
        None => settings.require_tool()?.to_path_buf(),
    };

    let mut run = ExtractionRun::for_workspace(source, &workspace, &settings, tool);
    if let Some(estimated) = estimated_files {
        run = run.with_estimated_total(estimated);
    }

    let mut cancel = CancellationToken::new();
    if let Some(seconds) = timeout {
        cancel = cancel.with_timeout(Duration::from_secs(seconds));
    }
    let orchestrator = Arc::new(ExtractionOrchestrator::new());
    install_interrupt_handler(&orchestrator);

    println!("📦 Extracting '{}'...", source.display());

    let mut progress = ProgressReporter::new_for_extraction();
    let result = orchestrator.extract(
        &run,
        |percent, line| progress.update_extraction(percent, line),
        &cancel,
    );

    let outcome = match result {
        Ok(outcome) => {
            progress.finish_extraction("Extraction finished");
            outcome
        }
        Err(e) => {
            progress.finish_extraction("Extraction stopped");
            return Err(e);
        }
    };

    PrettyPrinter::print_extraction_outcome(&outcome);

    if let Some(snapshot) = outcome.committed() {
        if settings.index_after_extract && !no_index {
            let store = workspace.store_path(&snapshot.version);
            let indexer = BatchIndexer::new(IndexerConfig::from(&settings));
            let report = run_index(&indexer, &snapshot.path, &store, &mut progress)?;
            PrettyPrinter::print_index_report(&report);
        }
    }

    Ok(())
}

/// On Ctrl+C cancel the running extraction, or exit when none is in flight
fn install_interrupt_handler(orchestrator: &Arc<ExtractionOrchestrator>) {
    let orchestrator = Arc::clone(orchestrator);
    if let Err(e) = ctrlc::set_handler(move || {
        if orchestrator.cancel() {
            eprintln!("\n🛑 Cancelling extraction...");
        } else {
            eprintln!("\n🛑 Interrupted");
            std::process::exit(130);
        }
    }) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }
}

/// Index a snapshot into its store
fn index_command(
    workspace_path: Option<&Path>,
    snapshot: &str,
    store: Option<&Path>,
    batch_size: Option<usize>,
) -> Result<()> {
    let workspace = D2rWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;
    let resolver = SnapshotResolver::new(workspace.clone());
    let resolved = resolver.resolve(&SnapshotRef::from_string(snapshot))?;

    let store = match store {
        Some(store) => store.to_path_buf(),
        None => workspace.store_path(&resolved.name),
    };

    let mut config = IndexerConfig::from(&settings);
    if let Some(batch_size) = batch_size {
        config.batch_size = batch_size;
    }

    let mut progress = ProgressReporter::new_for_index();
    let report = run_index(&BatchIndexer::new(config), &resolved.path, &store, &mut progress)?;
    PrettyPrinter::print_index_report(&report);

    Ok(())
}

fn run_index(
    indexer: &BatchIndexer,
    snapshot: &Path,
    store: &Path,
    progress: &mut ProgressReporter,
) -> Result<IndexReport> {
    progress.start_index(&format!("Indexing {}...", snapshot.display()));
    let report = indexer.index(snapshot, store);
    progress.finish_index("Indexing finished");
    report
}

/// Compare candidates against a baseline and write one report per candidate
fn diff_command(
    workspace_path: Option<&Path>,
    baseline: &str,
    candidates: &[PathBuf],
    output: Option<&Path>,
    format: &str,
) -> Result<()> {
    let format = OutputFormat::parse(format).map_err(D2rDiffError::invalid_input)?;
    let workspace = D2rWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;
    let resolver = SnapshotResolver::new(workspace.clone());
    let baseline = resolver.resolve(&SnapshotRef::from_string(baseline))?;

    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| workspace.reports_dir.clone());

    let engine = DiffEngine::new(settings.table_extension.clone());
    let mut progress = if format == OutputFormat::Pretty {
        ProgressReporter::new_for_diff(candidates.len())
    } else {
        ProgressReporter::new_minimal()
    };
    let results = engine.compare_many(&baseline.path, candidates);
    progress.finish_diff("Comparison finished");

    let report_names = unique_report_names(candidates);
    let mut comparisons = Vec::new();
    let mut failed = 0;

    for ((candidate, name), result) in candidates.iter().zip(&report_names).zip(results) {
        match result {
            Ok(comparison) => {
                let report_path = output_dir.join(format!("{}.json", name));
                JsonFormatter::write_comparison(&comparison, &report_path)?;

                if format == OutputFormat::Pretty {
                    PrettyPrinter::print_comparison(&comparison);
                    println!("📄 Report written to: {}", report_path.display());
                }
                comparisons.push(comparison);
            }
            Err(e) => {
                failed += 1;
                eprintln!("❌ {}: {}", candidate.display(), e);
            }
        }
    }

    if format == OutputFormat::Json {
        println!("{}", JsonFormatter::format(&comparisons)?);
    }

    if failed > 0 {
        return Err(D2rDiffError::invalid_input(format!(
            "{} of {} candidate(s) could not be compared",
            failed,
            candidates.len()
        )));
    }

    Ok(())
}

/// Report file stems per candidate, numbered when two candidates share a name
fn unique_report_names(candidates: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();
    candidates
        .iter()
        .map(|candidate| {
            let base = display_name(candidate);
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}-{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// List committed versions
fn versions_command(workspace_path: Option<&Path>, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format).map_err(D2rDiffError::invalid_input)?;
    let workspace = D2rWorkspace::find_or_create(workspace_path)?;
    let versions = workspace.list_versions()?;

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_versions(&versions),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&versions)?),
    }

    Ok(())
}
