//! # commission-cli: CLI Tool for the Commission Stack
//!
//! Works on a ledger snapshot file: the JSON form of
//! [`commission_engine::LedgerExport`] holding sellers, rate tables, cached
//! sales and adjustments.
//!
//! ## Subcommands
//!
//! - `commission import`: fetch a period from the upstream sales source and
//!   store it in the snapshot.
//! - `commission report`: print the commission report for a period.
//! - `commission resolve`: show which rate a seller earns on a product.
//! - `commission periods`: list the periods with cached sales.
//!
//! ```bash
//! commission --ledger ledger.json import --month 3 --year 2025
//! commission --ledger ledger.json report --month 3 --year 2025 --json
//! commission --ledger ledger.json resolve --seller 83 --product 4711
//! ```

pub mod import;
pub mod periods;
pub mod report;
pub mod resolve;
pub mod snapshot;

use anyhow::{Context, Result};
use commission_core::Period;

/// Build a period from optional CLI flags; a missing flag takes the current
/// month or year.
pub fn period_arg(month: Option<u32>, year: Option<i32>) -> Result<Period> {
    let now = Period::current();
    let month = month.unwrap_or(now.month());
    let year = year.unwrap_or(now.year());
    Period::new(month, year).with_context(|| format!("invalid period {month:02}/{year}"))
}
