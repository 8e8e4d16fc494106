//! # Report Subcommand
//!
//! Prints the commission report for one period, as a table or as the same
//! JSON document the API serves.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use commission_core::format_amount;
use commission_engine::CommissionReport;

/// Arguments for the `commission report` subcommand.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Month (1-12). Defaults to the current month.
    #[arg(long)]
    pub month: Option<u32>,
    /// Year. Defaults to the current year.
    #[arg(long)]
    pub year: Option<i32>,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the report subcommand.
pub fn run_report(args: &ReportArgs, ledger_path: &Path) -> Result<u8> {
    let period = crate::period_arg(args.month, args.year)?;
    let ledger = crate::snapshot::load(ledger_path)?;
    let report = ledger.generate_report(period);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report).context("failed to write report")?;
        writeln!(out)?;
    } else {
        write_table(&mut out, &report)?;
    }
    Ok(0)
}

/// Render a report as a fixed-width table.
pub fn write_table(out: &mut impl Write, report: &CommissionReport) -> Result<()> {
    writeln!(out, "{}", report.message)?;
    if report.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(
        out,
        "{:>8}  {:<24}  {:>14}  {:>12}  {:>12}  {:>14}",
        "SELLER", "NAME", "REVENUE", "COMMISSION", "FINAL", "FINAL REVENUE"
    )?;
    for record in &report.sellers {
        writeln!(
            out,
            "{:>8}  {:<24}  {:>14}  {:>12}  {:>12}  {:>14}",
            record.seller.id,
            truncate(&record.seller.name, 24),
            format_amount(record.total_revenue),
            format_amount(record.total_commission),
            format_amount(record.final_commission),
            format_amount(record.final_revenue),
        )?;
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max - 1).collect();
    cut.push('…');
    cut
}
