//! # Ledger Errors
//!
//! Failures raised by rule-store, seller and adjustment operations on the
//! [`Ledger`](crate::ledger::Ledger). Input validation failures are
//! [`commission_core::ValidationError`] and are raised before these.

use commission_core::{Period, ProductCode, SellerId};
use thiserror::Error;

use crate::rules::RuleScope;

/// Errors from ledger mutations and lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No seller with this id is known.
    #[error("seller {0} not found")]
    SellerNotFound(SellerId),

    /// The seller has no default commission rate.
    #[error("no default commission rate for seller {0}")]
    DefaultRateNotFound(SellerId),

    /// A product rule for this (scope, product) pair already exists.
    #[error("a product rule for {scope} and product {product_code} already exists")]
    DuplicateProductRule {
        /// Scope of the conflicting rule.
        scope: RuleScope,
        /// Product code of the conflicting rule.
        product_code: ProductCode,
    },

    /// No product rule with this id.
    #[error("product rule {0} not found")]
    ProductRuleNotFound(i64),

    /// No special product with this code.
    #[error("special product {0} not found")]
    SpecialProductNotFound(ProductCode),

    /// No adjustment stored under this natural key.
    #[error("no {kind} adjustment for seller {seller_id} in {period}")]
    AdjustmentNotFound {
        /// `financial` or `revenue`.
        kind: &'static str,
        /// Seller of the requested adjustment.
        seller_id: SellerId,
        /// Period of the requested adjustment.
        period: Period,
    },

    /// An import carried no rows; the cached period is left untouched.
    #[error("no upstream data found for {0}")]
    EmptyImport(Period),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_rule_message_names_scope_and_product() {
        let err = LedgerError::DuplicateProductRule {
            scope: RuleScope::Global,
            product_code: ProductCode::new("4711").unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("global"));
        assert!(msg.contains("4711"));
    }

    #[test]
    fn adjustment_not_found_message_uses_period_format() {
        let err = LedgerError::AdjustmentNotFound {
            kind: "financial",
            seller_id: SellerId::new(83).unwrap(),
            period: Period::new(3, 2025).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "no financial adjustment for seller 83 in 03/2025"
        );
    }
}
