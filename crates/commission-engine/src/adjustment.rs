//! # Manual Adjustments and the Overlay
//!
//! Operators can record, per seller and period, at most one
//! [`FinancialAdjustment`] (returns, open invoices, late-payment surcharges)
//! and at most one [`RevenueAdjustment`] (extra revenue paid at its own
//! rate). Both are upserted by natural key.
//!
//! [`apply_adjustments`] folds them into a seller's consolidated base:
//!
//! ```text
//! commission_from_revenue_adjustment = amount * rate
//! total_commission = total_commission_base + commission_from_revenue_adjustment
//! final_commission = total_commission + prior_surcharge - return_value - open_invoice
//! final_revenue    = total_revenue + amount
//! ```
//!
//! The arithmetic is checked. If the adjustments would overflow a seller's
//! figures, [`try_apply_adjustments`] yields `None` and
//! [`apply_adjustments`] reports the unadjusted base instead.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use commission_core::{check_amount, Period, Rate, SellerId, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LedgerError;

/// Maximum length of a revenue adjustment reason.
pub const MAX_REASON_LEN: usize = 500;

/// Financial corrections for one seller in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialAdjustment {
    pub seller_id: SellerId,
    pub period: Period,
    /// Subtracted from the commission.
    pub return_value: Decimal,
    /// Subtracted from the commission.
    pub open_invoice_value: Decimal,
    /// Late-payment surcharge, added to the commission.
    pub prior_surcharge_value: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl FinancialAdjustment {
    /// Build an adjustment stamped now.
    pub fn new(
        seller_id: SellerId,
        period: Period,
        return_value: Decimal,
        open_invoice_value: Decimal,
        prior_surcharge_value: Decimal,
    ) -> Self {
        Self {
            seller_id,
            period,
            return_value,
            open_invoice_value,
            prior_surcharge_value,
            updated_at: Utc::now(),
        }
    }
}

/// Additional revenue credited to a seller in one period, with the rate it
/// earns commission at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueAdjustment {
    pub seller_id: SellerId,
    pub period: Period,
    pub amount: Decimal,
    pub rate: Rate,
    #[serde(default)]
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RevenueAdjustment {
    /// Build an adjustment stamped now. Blank reasons are dropped; amounts
    /// beyond [`commission_core::MAX_AMOUNT`] are rejected.
    pub fn new(
        seller_id: SellerId,
        period: Period,
        amount: Decimal,
        rate: Rate,
        reason: Option<String>,
    ) -> Result<Self, ValidationError> {
        let amount = check_amount("amount", amount)?;
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if let Some(r) = &reason {
            if r.chars().count() > MAX_REASON_LEN {
                return Err(ValidationError::TooLong {
                    field: "reason".into(),
                    max: MAX_REASON_LEN,
                });
            }
        }
        Ok(Self {
            seller_id,
            period,
            amount,
            rate,
            reason,
            updated_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Overlay arithmetic
// ---------------------------------------------------------------------------

/// Pre-adjustment totals of one seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayBase {
    /// Revenue summed over every branch.
    pub total_revenue: Decimal,
    /// Commission summed over every branch.
    pub total_commission_base: Decimal,
}

/// Post-adjustment figures of one seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsolidatedFigures {
    pub total_commission_base: Decimal,
    /// `amount * rate` of the revenue adjustment, zero without one.
    pub commission_from_revenue_adjustment: Decimal,
    pub total_commission: Decimal,
    /// Commission after surcharges, returns and open invoices. May be negative.
    pub final_commission: Decimal,
    pub final_revenue: Decimal,
}

impl ConsolidatedFigures {
    /// The figures of a seller with no adjustments.
    pub fn unadjusted(base: OverlayBase) -> Self {
        Self {
            total_commission_base: base.total_commission_base,
            commission_from_revenue_adjustment: Decimal::ZERO,
            total_commission: base.total_commission_base,
            final_commission: base.total_commission_base,
            final_revenue: base.total_revenue,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Add(Decimal),
    Subtract(Decimal),
}

impl Step {
    fn apply(self, acc: Decimal) -> Option<Decimal> {
        match self {
            Self::Add(v) => acc.checked_add(v),
            Self::Subtract(v) => acc.checked_sub(v),
        }
    }
}

/// Fold the adjustments (either may be absent) into a seller's base totals.
///
/// Returns `None` if any intermediate figure overflows.
pub fn try_apply_adjustments(
    base: OverlayBase,
    financial: Option<&FinancialAdjustment>,
    revenue: Option<&RevenueAdjustment>,
) -> Option<ConsolidatedFigures> {
    let (amount, rate) = revenue.map_or((Decimal::ZERO, Rate::ZERO), |r| (r.amount, r.rate));
    let commission_from_revenue_adjustment = amount.checked_mul(rate.value())?;
    let total_commission = base
        .total_commission_base
        .checked_add(commission_from_revenue_adjustment)?;

    let steps = financial.map_or_else(Vec::new, |f| {
        vec![
            Step::Add(f.prior_surcharge_value),
            Step::Subtract(f.return_value),
            Step::Subtract(f.open_invoice_value),
        ]
    });
    let final_commission = steps
        .into_iter()
        .try_fold(total_commission, |acc, step| step.apply(acc))?;

    Some(ConsolidatedFigures {
        total_commission_base: base.total_commission_base,
        commission_from_revenue_adjustment,
        total_commission,
        final_commission,
        final_revenue: base.total_revenue.checked_add(amount)?,
    })
}

/// Like [`try_apply_adjustments`], falling back to the unadjusted figures
/// on overflow.
pub fn apply_adjustments(
    base: OverlayBase,
    financial: Option<&FinancialAdjustment>,
    revenue: Option<&RevenueAdjustment>,
) -> ConsolidatedFigures {
    try_apply_adjustments(base, financial, revenue).unwrap_or_else(|| {
        let seller_id = revenue
            .map(|r| r.seller_id)
            .or_else(|| financial.map(|f| f.seller_id));
        warn!(seller_id = ?seller_id, "adjustments overflow seller totals; ignoring them");
        ConsolidatedFigures::unadjusted(base)
    })
}

// ---------------------------------------------------------------------------
// AdjustmentBook
// ---------------------------------------------------------------------------

/// Both adjustment tables, keyed by (seller, period).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentBook {
    financial: BTreeMap<(SellerId, Period), FinancialAdjustment>,
    revenue: BTreeMap<(SellerId, Period), RevenueAdjustment>,
}

impl AdjustmentBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// The financial adjustment for a seller and period.
    pub fn financial(&self, seller_id: SellerId, period: Period) -> Option<&FinancialAdjustment> {
        self.financial.get(&(seller_id, period))
    }

    /// The revenue adjustment for a seller and period.
    pub fn revenue(&self, seller_id: SellerId, period: Period) -> Option<&RevenueAdjustment> {
        self.revenue.get(&(seller_id, period))
    }

    /// Insert or replace by natural key. Returns the previous entry.
    pub fn upsert_financial(&mut self, adj: FinancialAdjustment) -> Option<FinancialAdjustment> {
        self.financial.insert((adj.seller_id, adj.period), adj)
    }

    /// Insert or replace by natural key. Returns the previous entry.
    pub fn upsert_revenue(&mut self, adj: RevenueAdjustment) -> Option<RevenueAdjustment> {
        self.revenue.insert((adj.seller_id, adj.period), adj)
    }

    /// Remove a financial adjustment.
    pub fn remove_financial(
        &mut self,
        seller_id: SellerId,
        period: Period,
    ) -> Result<FinancialAdjustment, LedgerError> {
        self.financial
            .remove(&(seller_id, period))
            .ok_or(LedgerError::AdjustmentNotFound {
                kind: "financial",
                seller_id,
                period,
            })
    }

    /// Remove a revenue adjustment.
    pub fn remove_revenue(
        &mut self,
        seller_id: SellerId,
        period: Period,
    ) -> Result<RevenueAdjustment, LedgerError> {
        self.revenue
            .remove(&(seller_id, period))
            .ok_or(LedgerError::AdjustmentNotFound {
                kind: "revenue",
                seller_id,
                period,
            })
    }

    /// All financial adjustments, ordered by (seller, period).
    pub fn all_financial(&self) -> Vec<FinancialAdjustment> {
        self.financial.values().cloned().collect()
    }

    /// All revenue adjustments, ordered by (seller, period).
    pub fn all_revenue(&self) -> Vec<RevenueAdjustment> {
        self.revenue.values().cloned().collect()
    }

    /// A copy restricted to one period.
    pub fn for_period(&self, period: Period) -> Self {
        Self {
            financial: self
                .financial
                .iter()
                .filter(|((_, p), _)| *p == period)
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            revenue: self
                .revenue
                .iter()
                .filter(|((_, p), _)| *p == period)
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
        }
    }
}
