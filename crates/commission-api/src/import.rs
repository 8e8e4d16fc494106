//! # Period Import
//!
//! Pulls one period from the sales source and makes it the cached copy:
//!
//! ```text
//! SalesSource::fetch ──▶ Ledger::prepare_import ──▶ db::sales::replace_period ──▶ Ledger::commit_import
//!                                                    (one transaction)
//! ```
//!
//! Any failure before the commit leaves both the database and the ledger as
//! they were: a failed fetch never clears a previously imported period.
//!
//! The fetch runs unlocked. Everything from the prepare step to the commit
//! runs under the caller's seller write lock.

use commission_core::Period;
use commission_engine::{ImportSummary, Ledger, LedgerError};
use commission_upstream::{fetch_line_items, SalesSource, UpstreamError};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::Mutex;

/// Why an import did not happen.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The sales source could not be read or returned unusable rows.
    #[error("upstream fetch failed: {0}")]
    Fetch(#[from] UpstreamError),

    /// The ledger rejected the batch (e.g. no rows for the period).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The database transaction failed.
    #[error("failed to store imported period: {0}")]
    Store(#[from] sqlx::Error),
}

/// Import one period from `source` into the ledger (and the database, when
/// one is configured).
pub async fn import_period<S: SalesSource>(
    ledger: &Ledger,
    pool: Option<&PgPool>,
    source: &S,
    period: Period,
    seller_writes: &Mutex<()>,
) -> Result<ImportSummary, ImportError> {
    let rows = fetch_line_items(source, period).await?;

    let _guard = seller_writes.lock().await;
    let prepared = ledger.prepare_import(period, rows)?;

    if let Some(pool) = pool {
        crate::db::sales::replace_period(pool, &prepared).await?;
    }

    Ok(ledger.commit_import(prepared))
}
