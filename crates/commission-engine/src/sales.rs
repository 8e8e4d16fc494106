//! Cached upstream sales line-items.

use std::collections::BTreeMap;

use commission_core::{BranchId, Period, ProductCode, SellerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One sales record for a seller, product and branch in a period.
///
/// Several rows may share the same key; they are summed, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesLineItem {
    pub period: Period,
    pub seller_id: SellerId,
    /// Seller name as reported by the upstream at import time.
    pub seller_name: String,
    pub product_code: ProductCode,
    pub product_desc: String,
    pub branch_id: BranchId,
    pub revenue: Decimal,
    /// Value of goods returned.
    #[serde(default)]
    pub return_value: Decimal,
    /// Value of invoices still open.
    #[serde(default)]
    pub open_invoice_value: Decimal,
    /// Surcharges on invoices paid late from the prior month.
    #[serde(default)]
    pub prior_surcharge_value: Decimal,
}

/// Distinct sellers in a batch of rows with the first name reported for each.
pub fn reported_sellers(rows: &[SalesLineItem]) -> BTreeMap<SellerId, String> {
    let mut sellers = BTreeMap::new();
    for row in rows {
        sellers
            .entry(row.seller_id)
            .or_insert_with(|| row.seller_name.clone());
    }
    sellers
}
