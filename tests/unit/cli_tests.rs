//! Unit tests for CLI argument parsing and validation

use clap::Parser;
use d2rdiff::cli::{Cli, Commands};
use std::path::PathBuf;

#[test]
fn test_cli_init_command() {
    let cli = Cli::try_parse_from(["d2rdiff", "init"]).unwrap();
    match cli.command {
        Commands::Init { force } => assert!(!force),
        _ => panic!("Expected Init command"),
    }
}

#[test]
fn test_cli_extract_defaults() {
    let cli = Cli::try_parse_from(["d2rdiff", "extract", "/games/d2r"]).unwrap();
    match cli.command {
        Commands::Extract {
            source,
            tool,
            estimated_files,
            no_index,
            timeout,
        } => {
            assert_eq!(source, PathBuf::from("/games/d2r"));
            assert!(tool.is_none());
            assert!(estimated_files.is_none());
            assert!(!no_index);
            assert!(timeout.is_none());
        }
        _ => panic!("Expected Extract command"),
    }
}

#[test]
fn test_cli_extract_with_options() {
    let cli = Cli::try_parse_from([
        "d2rdiff",
        "extract",
        "/games/d2r",
        "--tool",
        "/opt/casc/extract",
        "--estimated-files",
        "400",
        "--no-index",
        "--timeout",
        "600",
    ])
    .unwrap();
    match cli.command {
        Commands::Extract {
            tool,
            estimated_files,
            no_index,
            timeout,
            ..
        } => {
            assert_eq!(tool, Some(PathBuf::from("/opt/casc/extract")));
            assert_eq!(estimated_files, Some(400));
            assert!(no_index);
            assert_eq!(timeout, Some(600));
        }
        _ => panic!("Expected Extract command"),
    }
}

#[test]
fn test_cli_extract_rejects_zero_estimate() {
    let result = Cli::try_parse_from(["d2rdiff", "extract", "src", "--estimated-files", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_index_defaults_to_latest() {
    let cli = Cli::try_parse_from(["d2rdiff", "index"]).unwrap();
    match cli.command {
        Commands::Index {
            snapshot,
            store,
            batch_size,
        } => {
            assert_eq!(snapshot, "latest");
            assert!(store.is_none());
            assert!(batch_size.is_none());
        }
        _ => panic!("Expected Index command"),
    }
}

#[test]
fn test_cli_index_rejects_zero_batch_size() {
    let result = Cli::try_parse_from(["d2rdiff", "index", "1.6.84219", "--batch-size", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_diff_requires_candidates() {
    assert!(Cli::try_parse_from(["d2rdiff", "diff", "latest"]).is_err());

    let cli = Cli::try_parse_from([
        "d2rdiff",
        "diff",
        "latest",
        "mods/Reimagined",
        "mods/Eastern_Sun",
        "--format",
        "json",
    ])
    .unwrap();
    match cli.command {
        Commands::Diff {
            baseline,
            candidates,
            output,
            format,
        } => {
            assert_eq!(baseline, "latest");
            assert_eq!(candidates.len(), 2);
            assert!(output.is_none());
            assert_eq!(format, "json");
        }
        _ => panic!("Expected Diff command"),
    }
}

#[test]
fn test_cli_global_flags() {
    let cli = Cli::try_parse_from(["d2rdiff", "versions", "--workspace", "/tmp/ws", "-v"]).unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
    assert!(matches!(cli.command, Commands::Versions { .. }));
}
