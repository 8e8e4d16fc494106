//! Reading and writing the ledger snapshot file.

use std::path::Path;

use anyhow::{Context, Result};
use commission_engine::{Ledger, LedgerExport};

/// Load a ledger from a snapshot file.
pub fn load(path: &Path) -> Result<Ledger> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ledger file: {}", path.display()))?;
    let export: LedgerExport = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse ledger file: {}", path.display()))?;
    Ledger::from_export(export)
        .with_context(|| format!("inconsistent ledger file: {}", path.display()))
}

/// Load a ledger, starting empty if the file does not exist yet.
pub fn load_or_default(path: &Path) -> Result<Ledger> {
    if path.exists() {
        load(path)
    } else {
        tracing::info!(path = %path.display(), "ledger file not found, starting empty");
        Ok(Ledger::new())
    }
}

/// Write a ledger to a snapshot file.
///
/// The file is written next to its destination and renamed over it, so an
/// interrupted write never leaves a truncated snapshot.
pub fn save(path: &Path, ledger: &Ledger) -> Result<()> {
    let json = serde_json::to_string_pretty(&ledger.export())
        .context("failed to serialize ledger")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("failed to write ledger file: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace ledger file: {}", path.display()))?;
    Ok(())
}
