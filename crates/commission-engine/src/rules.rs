//! # Rule Store
//!
//! The three independently maintained rate tables and the seller register:
//!
//! - **Default rates**: one rate per seller, used when no product-level rule
//!   applies.
//! - **Product rules**: a rate for one product, scoped either to one seller
//!   or to every seller ([`RuleScope::Global`]). Unique per (scope, product).
//! - **Special products**: a catalog-wide rate for one product, unique per
//!   product code.
//!
//! [`RuleBook`] is plain data. Precedence between the tables lives in
//! [`crate::resolver`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use commission_core::{ProductCode, Rate, SellerId, ValidationError};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Maximum length of seller and product display names.
const MAX_NAME_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Sellers
// ---------------------------------------------------------------------------

/// Whether a seller is on the payroll or an outside representative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerCategory {
    /// Employed seller.
    Internal,
    /// Outside sales representative.
    #[default]
    External,
}

impl SellerCategory {
    /// Return the string representation of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

impl std::fmt::Display for SellerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SellerCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            other => Err(format!("unknown seller category: {other}")),
        }
    }
}

/// A seller known to the report.
///
/// Names come from the upstream on import; the category and both flags are
/// operator-maintained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub name: String,
    #[serde(default)]
    pub category: SellerCategory,
    #[serde(default)]
    pub is_cooperative: bool,
    #[serde(default)]
    pub exclude_from_report: bool,
}

impl Seller {
    /// A new seller with default category and flags.
    pub fn new(id: SellerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: SellerCategory::default(),
            is_cooperative: false,
            exclude_from_report: false,
        }
    }

    /// Apply a partial flag update.
    pub fn apply_flags(&mut self, flags: &SellerFlags) {
        if let Some(category) = flags.category {
            self.category = category;
        }
        if let Some(coop) = flags.is_cooperative {
            self.is_cooperative = coop;
        }
        if let Some(exclude) = flags.exclude_from_report {
            self.exclude_from_report = exclude;
        }
    }
}

/// Operator-editable seller attributes. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerFlags {
    #[serde(default)]
    pub category: Option<SellerCategory>,
    #[serde(default)]
    pub is_cooperative: Option<bool>,
    #[serde(default)]
    pub exclude_from_report: Option<bool>,
}

// ---------------------------------------------------------------------------
// Rate tables
// ---------------------------------------------------------------------------

/// A seller's default commission rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRate {
    pub seller_id: SellerId,
    pub rate: Rate,
}

/// Which sellers a product rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Only this seller.
    Seller(SellerId),
    /// Every seller.
    Global,
}

impl RuleScope {
    /// Scope from an optional seller id: `None` means every seller.
    pub fn from_seller(seller_id: Option<SellerId>) -> Self {
        seller_id.map_or(Self::Global, Self::Seller)
    }

    /// The seller this scope is restricted to, if any.
    pub fn seller_id(&self) -> Option<SellerId> {
        match self {
            Self::Seller(id) => Some(*id),
            Self::Global => None,
        }
    }
}

impl std::fmt::Display for RuleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seller(id) => write!(f, "seller {id}"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// A product-level rate, seller-specific or global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRule {
    pub id: i64,
    pub scope: RuleScope,
    pub product_code: ProductCode,
    pub rate: Rate,
}

/// A catalog-wide rate for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialProduct {
    pub product_code: ProductCode,
    pub product_name: String,
    pub rate: Rate,
    pub registered_at: DateTime<Utc>,
}

impl SpecialProduct {
    /// Validate and build a special product registered now.
    pub fn new(
        product_code: ProductCode,
        product_name: impl Into<String>,
        rate: Rate,
    ) -> Result<Self, ValidationError> {
        let product_name = product_name.into().trim().to_string();
        if product_name.is_empty() {
            return Err(ValidationError::MissingField("product_name".into()));
        }
        if product_name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "product_name".into(),
                max: MAX_NAME_LEN,
            });
        }
        Ok(Self {
            product_code,
            product_name,
            rate,
            registered_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// RuleBook
// ---------------------------------------------------------------------------

/// All three rate tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleBook {
    default_rates: BTreeMap<SellerId, Rate>,
    product_rules: BTreeMap<RuleScope, BTreeMap<ProductCode, ProductRule>>,
    special_products: BTreeMap<ProductCode, SpecialProduct>,
}

impl RuleBook {
    /// Create an empty rule book.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default rate for a seller.
    pub fn default_rate(&self, seller_id: SellerId) -> Option<Rate> {
        self.default_rates.get(&seller_id).copied()
    }

    /// All default rates, ordered by seller id.
    pub fn default_rates(&self) -> Vec<DefaultRate> {
        self.default_rates
            .iter()
            .map(|(&seller_id, &rate)| DefaultRate { seller_id, rate })
            .collect()
    }

    /// Set (insert or replace) a seller's default rate.
    pub fn set_default_rate(&mut self, seller_id: SellerId, rate: Rate) -> DefaultRate {
        self.default_rates.insert(seller_id, rate);
        DefaultRate { seller_id, rate }
    }

    /// Remove a seller's default rate.
    pub fn remove_default_rate(&mut self, seller_id: SellerId) -> Result<DefaultRate, LedgerError> {
        self.default_rates
            .remove(&seller_id)
            .map(|rate| DefaultRate { seller_id, rate })
            .ok_or(LedgerError::DefaultRateNotFound(seller_id))
    }

    /// The product rule for exactly this scope and product.
    pub fn product_rule(&self, scope: RuleScope, product_code: &ProductCode) -> Option<&ProductRule> {
        self.product_rules.get(&scope)?.get(product_code)
    }

    /// All product rules, ordered by id.
    pub fn product_rules(&self) -> Vec<ProductRule> {
        let mut rules: Vec<ProductRule> = self
            .product_rules
            .values()
            .flat_map(|by_code| by_code.values().cloned())
            .collect();
        rules.sort_by_key(|r| r.id);
        rules
    }

    /// Fail if a rule for (scope, product) already exists.
    pub fn ensure_product_rule_free(
        &self,
        scope: RuleScope,
        product_code: &ProductCode,
    ) -> Result<(), LedgerError> {
        if self.product_rule(scope, product_code).is_some() {
            return Err(LedgerError::DuplicateProductRule {
                scope,
                product_code: product_code.clone(),
            });
        }
        Ok(())
    }

    /// The id the next in-memory product rule receives.
    pub fn next_rule_id(&self) -> i64 {
        self.product_rules
            .values()
            .flat_map(|by_code| by_code.values())
            .map(|r| r.id)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Insert a product rule carrying an already-assigned id.
    pub fn insert_product_rule(&mut self, rule: ProductRule) -> Result<(), LedgerError> {
        self.ensure_product_rule_free(rule.scope, &rule.product_code)?;
        self.product_rules
            .entry(rule.scope)
            .or_default()
            .insert(rule.product_code.clone(), rule);
        Ok(())
    }

    /// The product rule with this id.
    pub fn product_rule_by_id(&self, id: i64) -> Option<&ProductRule> {
        self.product_rules
            .values()
            .flat_map(|by_code| by_code.values())
            .find(|r| r.id == id)
    }

    /// Change the rate of an existing product rule. Scope and product stay.
    pub fn set_product_rule_rate(&mut self, id: i64, rate: Rate) -> Result<ProductRule, LedgerError> {
        let rule = self
            .product_rules
            .values_mut()
            .flat_map(|by_code| by_code.values_mut())
            .find(|r| r.id == id)
            .ok_or(LedgerError::ProductRuleNotFound(id))?;
        rule.rate = rate;
        Ok(rule.clone())
    }

    /// Remove a product rule by id.
    pub fn remove_product_rule(&mut self, id: i64) -> Result<ProductRule, LedgerError> {
        let key = self
            .product_rules
            .iter()
            .find_map(|(scope, by_code)| {
                by_code
                    .values()
                    .find(|r| r.id == id)
                    .map(|r| (*scope, r.product_code.clone()))
            })
            .ok_or(LedgerError::ProductRuleNotFound(id))?;

        let by_code = self
            .product_rules
            .get_mut(&key.0)
            .ok_or(LedgerError::ProductRuleNotFound(id))?;
        let removed = by_code
            .remove(&key.1)
            .ok_or(LedgerError::ProductRuleNotFound(id))?;
        if by_code.is_empty() {
            self.product_rules.remove(&key.0);
        }
        Ok(removed)
    }

    /// The special product registered under this code.
    pub fn special_product(&self, product_code: &ProductCode) -> Option<&SpecialProduct> {
        self.special_products.get(product_code)
    }

    /// All special products, ordered by code.
    pub fn special_products(&self) -> Vec<SpecialProduct> {
        self.special_products.values().cloned().collect()
    }

    /// Insert or replace a special product. Returns the previous entry.
    pub fn upsert_special_product(&mut self, product: SpecialProduct) -> Option<SpecialProduct> {
        self.special_products
            .insert(product.product_code.clone(), product)
    }

    /// Remove a special product.
    pub fn remove_special_product(
        &mut self,
        product_code: &ProductCode,
    ) -> Result<SpecialProduct, LedgerError> {
        self.special_products
            .remove(product_code)
            .ok_or_else(|| LedgerError::SpecialProductNotFound(product_code.clone()))
    }

    /// Products whose rate is modified catalog-wide: every special product
    /// code plus every global product-rule code.
    pub fn rate_modified_products(&self) -> BTreeSet<ProductCode> {
        let mut codes: BTreeSet<ProductCode> = self.special_products.keys().cloned().collect();
        if let Some(global) = self.product_rules.get(&RuleScope::Global) {
            codes.extend(global.keys().cloned());
        }
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seller(n: i64) -> SellerId {
        SellerId::new(n).unwrap()
    }

    fn code(s: &str) -> ProductCode {
        ProductCode::new(s).unwrap()
    }

    fn rate(s: &str) -> Rate {
        Rate::parse(s).unwrap()
    }

    fn rule(id: i64, scope: RuleScope, product: &str, r: &str) -> ProductRule {
        ProductRule {
            id,
            scope,
            product_code: code(product),
            rate: rate(r),
        }
    }

    #[test]
    fn default_rate_upsert_replaces() {
        let mut book = RuleBook::new();
        book.set_default_rate(seller(7), rate("0.02"));
        book.set_default_rate(seller(7), rate("0.025"));
        assert_eq!(book.default_rates().len(), 1);
        assert_eq!(book.default_rate(seller(7)), Some(rate("0.025")));
    }

    #[test]
    fn remove_missing_default_rate_is_not_found() {
        let mut book = RuleBook::new();
        assert_eq!(
            book.remove_default_rate(seller(7)),
            Err(LedgerError::DefaultRateNotFound(seller(7)))
        );
    }

    #[test]
    fn duplicate_product_rule_conflicts() {
        let mut book = RuleBook::new();
        book.insert_product_rule(rule(1, RuleScope::Seller(seller(83)), "A", "0.03"))
            .unwrap();
        let err = book
            .insert_product_rule(rule(2, RuleScope::Seller(seller(83)), "A", "0.04"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateProductRule { .. }));
        // Same product under a different scope is a separate rule.
        book.insert_product_rule(rule(3, RuleScope::Global, "A", "0.05"))
            .unwrap();
        assert_eq!(book.product_rules().len(), 2);
    }

    #[test]
    fn remove_product_rule_by_id() {
        let mut book = RuleBook::new();
        book.insert_product_rule(rule(1, RuleScope::Global, "A", "0.03"))
            .unwrap();
        book.insert_product_rule(rule(2, RuleScope::Global, "B", "0.03"))
            .unwrap();
        let removed = book.remove_product_rule(1).unwrap();
        assert_eq!(removed.product_code, code("A"));
        assert_eq!(book.next_rule_id(), 3);
        assert_eq!(
            book.remove_product_rule(1),
            Err(LedgerError::ProductRuleNotFound(1))
        );
    }

    #[test]
    fn product_rule_rate_update_keeps_key() {
        let mut book = RuleBook::new();
        book.insert_product_rule(rule(4, RuleScope::Seller(seller(83)), "A", "0.03"))
            .unwrap();
        let updated = book.set_product_rule_rate(4, rate("0.07")).unwrap();
        assert_eq!(updated.scope, RuleScope::Seller(seller(83)));
        assert_eq!(
            book.product_rule(RuleScope::Seller(seller(83)), &code("A")).unwrap().rate,
            rate("0.07")
        );
        assert_eq!(
            book.set_product_rule_rate(5, rate("0.07")),
            Err(LedgerError::ProductRuleNotFound(5))
        );
    }

    #[test]
    fn next_rule_id_starts_at_one() {
        assert_eq!(RuleBook::new().next_rule_id(), 1);
    }

    #[test]
    fn rate_modified_set_is_special_union_global() {
        let mut book = RuleBook::new();
        book.upsert_special_product(SpecialProduct::new(code("S1"), "Soda", rate("0.01")).unwrap());
        book.insert_product_rule(rule(1, RuleScope::Global, "G1", "0.02"))
            .unwrap();
        book.insert_product_rule(rule(2, RuleScope::Seller(seller(5)), "P1", "0.02"))
            .unwrap();

        let set = book.rate_modified_products();
        assert!(set.contains(&code("S1")));
        assert!(set.contains(&code("G1")));
        assert!(!set.contains(&code("P1")));
    }

    #[test]
    fn special_product_requires_name() {
        assert!(SpecialProduct::new(code("S1"), "  ", rate("0.01")).is_err());
        assert!(SpecialProduct::new(code("S1"), "x".repeat(201), rate("0.01")).is_err());
    }

    #[test]
    fn seller_flags_apply_partially() {
        let mut s = Seller::new(seller(1), "Ana");
        s.apply_flags(&SellerFlags {
            exclude_from_report: Some(true),
            ..Default::default()
        });
        assert!(s.exclude_from_report);
        assert!(!s.is_cooperative);
        assert_eq!(s.category, SellerCategory::External);
    }

    #[test]
    fn rule_scope_serde_shape() {
        assert_eq!(
            serde_json::to_value(RuleScope::Global).unwrap(),
            serde_json::json!("global")
        );
        assert_eq!(
            serde_json::to_value(RuleScope::Seller(seller(83))).unwrap(),
            serde_json::json!({"seller": 83})
        );
    }
}
