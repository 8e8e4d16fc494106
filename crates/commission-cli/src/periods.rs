//! # Periods Subcommand

use std::path::Path;

use anyhow::Result;

/// Print every period with cached sales, oldest first, one per line.
pub fn run_periods(ledger_path: &Path) -> Result<u8> {
    let ledger = crate::snapshot::load(ledger_path)?;
    let periods = ledger.available_periods();
    if periods.is_empty() {
        tracing::warn!("no periods imported yet");
    }
    for period in periods {
        println!("{period}");
    }
    Ok(0)
}
