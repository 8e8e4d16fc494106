//! # Report Value Objects
//!
//! Immutable results of a report run. Monetary fields keep full precision in
//! memory and serialize as two-decimal strings.

use commission_core::{serialize_amount, BranchId, Period, ProductCode, Rate, SellerId};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adjustment::{FinancialAdjustment, RevenueAdjustment};
use crate::resolver::RateSource;
use crate::rules::{Seller, SellerCategory};
use crate::sales::SalesLineItem;

/// Sums over one bucket of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketTotals {
    #[serde(serialize_with = "serialize_amount")]
    pub revenue: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub commission: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub return_value: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub open_invoice_value: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub prior_surcharge_value: Decimal,
}

impl BucketTotals {
    /// Add one row and its computed commission.
    ///
    /// Returns `false` and leaves the totals unchanged if any sum would
    /// overflow.
    #[must_use]
    pub fn add(&mut self, item: &SalesLineItem, commission: Decimal) -> bool {
        let next = (|| {
            Some(Self {
                revenue: self.revenue.checked_add(item.revenue)?,
                commission: self.commission.checked_add(commission)?,
                return_value: self.return_value.checked_add(item.return_value)?,
                open_invoice_value: self.open_invoice_value.checked_add(item.open_invoice_value)?,
                prior_surcharge_value: self
                    .prior_surcharge_value
                    .checked_add(item.prior_surcharge_value)?,
            })
        })();
        match next {
            Some(totals) => {
                *self = totals;
                true
            }
            None => false,
        }
    }
}

/// One rate-modified row, listed individually in the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetail {
    pub product_code: ProductCode,
    pub product_desc: String,
    #[serde(serialize_with = "serialize_amount")]
    pub revenue: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub commission: Decimal,
    pub rate: Rate,
    pub rate_source: RateSource,
}

/// Totals of one seller in one branch, split into rate-modified and standard
/// products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchBreakdown {
    pub branch_id: BranchId,
    /// Revenue of every row in the branch, both buckets.
    #[serde(serialize_with = "serialize_amount")]
    pub revenue: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub commission: Decimal,
    pub rate_modified: BucketTotals,
    pub standard: BucketTotals,
    /// One entry per rate-modified row, in cache order.
    pub rate_modified_products: Vec<ProductDetail>,
}

/// Seller metadata carried into the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerSummary {
    /// Seller (RCA) code.
    pub id: SellerId,
    /// Name as last reported by the upstream.
    pub name: String,
    /// Operator-assigned category.
    pub category: SellerCategory,
    /// Whether the seller is a cooperative member.
    pub is_cooperative: bool,
}

impl From<&Seller> for SellerSummary {
    fn from(s: &Seller) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            category: s.category,
            is_cooperative: s.is_cooperative,
        }
    }
}

/// One seller's line in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedRecord {
    pub seller: SellerSummary,
    pub branches: Vec<BranchBreakdown>,
    #[serde(serialize_with = "serialize_amount")]
    pub total_revenue: Decimal,
    /// Raw per-seller sums across every branch and bucket.
    #[serde(serialize_with = "serialize_amount")]
    pub total_return_value: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub total_open_invoice_value: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub total_prior_surcharge_value: Decimal,
    pub financial_adjustment: Option<FinancialAdjustment>,
    pub revenue_adjustment: Option<RevenueAdjustment>,
    #[serde(serialize_with = "serialize_amount")]
    pub total_commission_base: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub commission_from_revenue_adjustment: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub total_commission: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub final_commission: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub final_revenue: Decimal,
}

impl ConsolidatedRecord {
    /// Seller id of this record.
    pub fn seller_id(&self) -> SellerId {
        self.seller.id
    }
}

/// A finished report: sellers ordered by final revenue, highest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommissionReport {
    pub period: Period,
    /// "Report generated for MM/YYYY" or the no-data notice.
    pub message: String,
    pub sellers: Vec<ConsolidatedRecord>,
}

impl CommissionReport {
    /// The record for one seller.
    pub fn get(&self, seller_id: SellerId) -> Option<&ConsolidatedRecord> {
        self.sellers.iter().find(|r| r.seller.id == seller_id)
    }

    /// Whether the period had no cached data (or every row was filtered).
    pub fn is_empty(&self) -> bool {
        self.sellers.is_empty()
    }
}
