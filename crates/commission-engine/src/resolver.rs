//! # Commission Rate Resolver
//!
//! Picks the single rate that applies to a (seller, product) pair. Tiers are
//! walked most specific first and the first hit wins:
//!
//! 1. product rule scoped to this seller
//! 2. special product
//! 3. global product rule
//! 4. the seller's default rate
//! 5. [`Rate::FALLBACK`] (1.5%)
//!
//! Resolution never fails.

use commission_core::{ProductCode, Rate, SellerId};
use serde::{Deserialize, Serialize};

use crate::rules::{RuleBook, RuleScope};

/// The tier that supplied a resolved rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    SellerProductRule,
    SpecialProduct,
    GlobalProductRule,
    SellerDefault,
    Fallback,
}

impl RateSource {
    /// Return the string representation of this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SellerProductRule => "seller_product_rule",
            Self::SpecialProduct => "special_product",
            Self::GlobalProductRule => "global_product_rule",
            Self::SellerDefault => "seller_default",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rate together with the tier it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRate {
    pub rate: Rate,
    pub source: RateSource,
}

/// Resolve the rate and its source for a seller and product.
pub fn resolve(rules: &RuleBook, seller_id: SellerId, product_code: &ProductCode) -> ResolvedRate {
    let hit = |rate: Rate, source: RateSource| ResolvedRate { rate, source };

    if let Some(rule) = rules.product_rule(RuleScope::Seller(seller_id), product_code) {
        return hit(rule.rate, RateSource::SellerProductRule);
    }
    if let Some(special) = rules.special_product(product_code) {
        return hit(special.rate, RateSource::SpecialProduct);
    }
    if let Some(rule) = rules.product_rule(RuleScope::Global, product_code) {
        return hit(rule.rate, RateSource::GlobalProductRule);
    }
    if let Some(rate) = rules.default_rate(seller_id) {
        return hit(rate, RateSource::SellerDefault);
    }
    hit(Rate::FALLBACK, RateSource::Fallback)
}

/// Resolve only the rate.
pub fn resolve_rate(rules: &RuleBook, seller_id: SellerId, product_code: &ProductCode) -> Rate {
    resolve(rules, seller_id, product_code).rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ProductRule, SpecialProduct};

    fn seller(n: i64) -> SellerId {
        SellerId::new(n).unwrap()
    }

    fn code(s: &str) -> ProductCode {
        ProductCode::new(s).unwrap()
    }

    fn rate(s: &str) -> Rate {
        Rate::parse(s).unwrap()
    }

    /// Seller 83 / product A has an entry in every tier.
    fn full_book() -> RuleBook {
        let mut book = RuleBook::new();
        book.insert_product_rule(ProductRule {
            id: 1,
            scope: RuleScope::Seller(seller(83)),
            product_code: code("A"),
            rate: rate("0.05"),
        })
        .unwrap();
        book.upsert_special_product(SpecialProduct::new(code("A"), "Alpha", rate("0.04")).unwrap());
        book.insert_product_rule(ProductRule {
            id: 2,
            scope: RuleScope::Global,
            product_code: code("A"),
            rate: rate("0.03"),
        })
        .unwrap();
        book.set_default_rate(seller(83), rate("0.02"));
        book
    }

    #[test]
    fn seller_rule_wins_over_every_other_tier() {
        let r = resolve(&full_book(), seller(83), &code("A"));
        assert_eq!(r.rate, rate("0.05"));
        assert_eq!(r.source, RateSource::SellerProductRule);
    }

    #[test]
    fn falls_through_tiers_in_order() {
        let mut book = full_book();

        book.remove_product_rule(1).unwrap();
        let r = resolve(&book, seller(83), &code("A"));
        assert_eq!((r.rate, r.source), (rate("0.04"), RateSource::SpecialProduct));

        book.remove_special_product(&code("A")).unwrap();
        let r = resolve(&book, seller(83), &code("A"));
        assert_eq!((r.rate, r.source), (rate("0.03"), RateSource::GlobalProductRule));

        book.remove_product_rule(2).unwrap();
        let r = resolve(&book, seller(83), &code("A"));
        assert_eq!((r.rate, r.source), (rate("0.02"), RateSource::SellerDefault));

        book.remove_default_rate(seller(83)).unwrap();
        let r = resolve(&book, seller(83), &code("A"));
        assert_eq!((r.rate, r.source), (Rate::FALLBACK, RateSource::Fallback));
    }

    #[test]
    fn empty_book_yields_fallback() {
        assert_eq!(
            resolve_rate(&RuleBook::new(), seller(1), &code("anything")).value(),
            rust_decimal::Decimal::new(15, 3)
        );
    }

    #[test]
    fn other_sellers_rule_does_not_apply() {
        let r = resolve(&full_book(), seller(12), &code("A"));
        assert_eq!(r.source, RateSource::SpecialProduct);
    }

    #[test]
    fn product_codes_match_exactly() {
        let r = resolve(&full_book(), seller(83), &code("a"));
        assert_eq!(r.source, RateSource::SellerDefault);
    }
}
