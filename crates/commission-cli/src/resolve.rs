//! # Resolve Subcommand
//!
//! Shows the rate a seller earns on a product under the snapshot's rules
//! and which tier supplied it.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use commission_core::{ProductCode, SellerId};

/// Arguments for the `commission resolve` subcommand.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Seller id.
    #[arg(long)]
    pub seller: i64,
    /// Product code.
    #[arg(long)]
    pub product: String,
}

/// Execute the resolve subcommand.
pub fn run_resolve(args: &ResolveArgs, ledger_path: &Path) -> Result<u8> {
    let seller_id = SellerId::new(args.seller).context("invalid --seller")?;
    let product_code = ProductCode::new(args.product.as_str()).context("invalid --product")?;
    let ledger = crate::snapshot::load(ledger_path)?;

    let resolved = ledger.resolve(seller_id, &product_code);
    println!(
        "seller={} product={} rate={} ({}%) source={}",
        seller_id,
        product_code,
        resolved.rate,
        resolved.rate.as_percent(),
        resolved.source
    );
    Ok(0)
}
