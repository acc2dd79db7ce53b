//! Main entry point for d2rdiff CLI

use clap::Parser;
use d2rdiff::cli::Cli;
use d2rdiff::commands::execute_command;
use env_logger::Env;

fn main() {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over the verbosity default
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.default_log_filter()))
        .init();

    if let Err(e) = execute_command(cli.command, cli.workspace.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(if e.is_cancelled() { 130 } else { 1 });
    }
}
