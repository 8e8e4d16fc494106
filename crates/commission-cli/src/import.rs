//! # Import Subcommand
//!
//! Fetches one period from the upstream sales source (configured through
//! `UPSTREAM_SALES_URL` and `UPSTREAM_API_TOKEN`) and stores it in the
//! ledger snapshot, creating the file if needed. The file is only rewritten
//! after a successful fetch.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use commission_upstream::{fetch_line_items, UpstreamClient, UpstreamConfig};

/// Arguments for the `commission import` subcommand.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Month (1-12). Defaults to the current month.
    #[arg(long)]
    pub month: Option<u32>,
    /// Year. Defaults to the current year.
    #[arg(long)]
    pub year: Option<i32>,
}

/// Execute the import subcommand.
pub fn run_import(args: &ImportArgs, ledger_path: &Path) -> Result<u8> {
    let period = crate::period_arg(args.month, args.year)?;
    let config = UpstreamConfig::from_env().context("upstream sales source not configured")?;
    let client = UpstreamClient::new(config).context("failed to create upstream client")?;
    let ledger = crate::snapshot::load_or_default(ledger_path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let rows = runtime
        .block_on(fetch_line_items(&client, period))
        .with_context(|| format!("failed to fetch {period} from upstream"))?;

    let summary = ledger
        .import_rows(period, rows)
        .with_context(|| format!("import of {period} rejected"))?;
    crate::snapshot::save(ledger_path, &ledger)?;

    println!(
        "Data imported successfully: {} rows ({} sellers) for {}",
        summary.rows, summary.sellers, summary.period
    );
    Ok(0)
}
