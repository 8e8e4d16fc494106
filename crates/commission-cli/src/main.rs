//! # commission CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commission_cli::import::{run_import, ImportArgs};
use commission_cli::periods::run_periods;
use commission_cli::report::{run_report, ReportArgs};
use commission_cli::resolve::{run_resolve, ResolveArgs};

/// Commission stack CLI.
///
/// Computes seller commission reports from a ledger snapshot file.
#[derive(Parser, Debug)]
#[command(name = "commission", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the ledger snapshot file.
    #[arg(long, global = true, default_value = "ledger.json")]
    ledger: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a period from the upstream sales source into the ledger file.
    Import(ImportArgs),

    /// Print the commission report for a period.
    Report(ReportArgs),

    /// Show the rate a seller earns on a product and where it comes from.
    Resolve(ResolveArgs),

    /// List periods with cached sales.
    Periods,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(ledger = %cli.ledger.display(), "commission CLI starting");

    let result = match &cli.command {
        Commands::Import(args) => run_import(args, &cli.ledger),
        Commands::Report(args) => run_report(args, &cli.ledger),
        Commands::Resolve(args) => run_resolve(args, &cli.ledger),
        Commands::Periods => run_periods(&cli.ledger),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
