//! # Ledger
//!
//! Thread-safe in-memory home of every table: sellers, the rule book, cached
//! sales partitions and manual adjustments.
//!
//! All operations are synchronous. The lock is `parking_lot::RwLock` and is
//! never held across an `.await`.
//!
//! ## Import
//!
//! A period import replaces that period's rows wholesale and refreshes the
//! seller table in one write-lock critical section, so a report never sees a
//! half-imported period. Imports are split in two so a persistence layer can
//! commit in between:
//!
//! 1. [`Ledger::prepare_import`] validates the rows and computes the new
//!    seller table without mutating anything.
//! 2. [`Ledger::commit_import`] swaps both in.
//!
//! The refreshed seller table holds exactly the sellers present in the
//! imported rows, named as the upstream reports them. Category and flags of
//! sellers that were already known are carried over, read again at commit
//! time so a flag update made after the prepare step is not lost.
//!
//! ## Reports
//!
//! [`Ledger::snapshot`] clones what one period's report needs under a read
//! lock; the pipeline then runs without holding any lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use commission_core::{Period, ProductCode, Rate, SellerId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adjustment::{AdjustmentBook, FinancialAdjustment, RevenueAdjustment};
use crate::error::LedgerError;
use crate::pipeline::{build_report, ReportInputs};
use crate::report::CommissionReport;
use crate::resolver::{resolve, ResolvedRate};
use crate::rules::{
    DefaultRate, ProductRule, RuleBook, RuleScope, Seller, SellerFlags, SpecialProduct,
};
use crate::sales::{reported_sellers, SalesLineItem};

#[derive(Debug, Default)]
struct LedgerState {
    sellers: BTreeMap<SellerId, Seller>,
    rules: RuleBook,
    sales: BTreeMap<Period, Arc<Vec<SalesLineItem>>>,
    adjustments: AdjustmentBook,
}

impl LedgerState {
    fn from_export(export: LedgerExport) -> Result<Self, LedgerError> {
        let mut state = Self::default();

        for seller in export.sellers {
            state.sellers.insert(seller.id, seller);
        }
        for dr in export.default_rates {
            state.rules.set_default_rate(dr.seller_id, dr.rate);
        }
        for rule in export.product_rules {
            state.rules.insert_product_rule(rule)?;
        }
        for sp in export.special_products {
            state.rules.upsert_special_product(sp);
        }

        let mut partitions: BTreeMap<Period, Vec<SalesLineItem>> = BTreeMap::new();
        for row in export.sales {
            partitions.entry(row.period).or_default().push(row);
        }
        state.sales = partitions
            .into_iter()
            .map(|(period, rows)| (period, Arc::new(rows)))
            .collect();

        for adj in export.financial_adjustments {
            state.adjustments.upsert_financial(adj);
        }
        for adj in export.revenue_adjustments {
            state.adjustments.upsert_revenue(adj);
        }

        Ok(state)
    }
}

/// Shared handle to the ledger. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: Arc<RwLock<LedgerState>>,
}

/// Everything one report run reads, detached from the ledger.
#[derive(Debug, Clone)]
pub struct ReportSnapshot {
    pub period: Period,
    pub rows: Arc<Vec<SalesLineItem>>,
    pub sellers: BTreeMap<SellerId, Seller>,
    pub rules: RuleBook,
    pub adjustments: AdjustmentBook,
}

impl ReportSnapshot {
    /// Borrow as pipeline inputs.
    pub fn inputs(&self) -> ReportInputs<'_> {
        ReportInputs {
            period: self.period,
            rows: &self.rows,
            sellers: &self.sellers,
            rules: &self.rules,
            adjustments: &self.adjustments,
        }
    }

    /// Run the pipeline over this snapshot.
    pub fn build_report(&self) -> CommissionReport {
        build_report(&self.inputs())
    }
}

/// A validated import, ready to be committed.
#[derive(Debug, Clone)]
pub struct PreparedImport {
    period: Period,
    rows: Vec<SalesLineItem>,
    sellers: Vec<Seller>,
}

impl PreparedImport {
    /// The imported period.
    pub fn period(&self) -> Period {
        self.period
    }

    /// The rows that will replace the period's partition.
    pub fn rows(&self) -> &[SalesLineItem] {
        &self.rows
    }

    /// The seller table that will replace the current one.
    pub fn sellers(&self) -> &[Seller] {
        &self.sellers
    }
}

/// Outcome of a committed import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub period: Period,
    /// Rows now cached for the period.
    pub rows: usize,
    /// Size of the refreshed seller table.
    pub sellers: usize,
}

/// Flat, serializable form of the whole ledger.
///
/// Used for the CLI snapshot file and for hydrating from the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerExport {
    pub sellers: Vec<Seller>,
    pub default_rates: Vec<DefaultRate>,
    pub product_rules: Vec<ProductRule>,
    pub special_products: Vec<SpecialProduct>,
    pub sales: Vec<SalesLineItem>,
    pub financial_adjustments: Vec<FinancialAdjustment>,
    pub revenue_adjustments: Vec<RevenueAdjustment>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from its flat form.
    pub fn from_export(export: LedgerExport) -> Result<Self, LedgerError> {
        Ok(Self {
            state: Arc::new(RwLock::new(LedgerState::from_export(export)?)),
        })
    }

    /// Replace every table with the contents of `export`.
    ///
    /// On error the ledger is left unchanged.
    pub fn restore(&self, export: LedgerExport) -> Result<(), LedgerError> {
        let state = LedgerState::from_export(export)?;
        *self.state.write() = state;
        Ok(())
    }

    /// Flatten the whole ledger.
    pub fn export(&self) -> LedgerExport {
        let state = self.state.read();
        LedgerExport {
            sellers: state.sellers.values().cloned().collect(),
            default_rates: state.rules.default_rates(),
            product_rules: state.rules.product_rules(),
            special_products: state.rules.special_products(),
            sales: state
                .sales
                .values()
                .flat_map(|rows| rows.iter().cloned())
                .collect(),
            financial_adjustments: state.adjustments.all_financial(),
            revenue_adjustments: state.adjustments.all_revenue(),
        }
    }

    // -- Reports -----------------------------------------------------------

    /// Consistent copy of the inputs for one period's report.
    pub fn snapshot(&self, period: Period) -> ReportSnapshot {
        let state = self.state.read();
        ReportSnapshot {
            period,
            rows: state.sales.get(&period).cloned().unwrap_or_default(),
            sellers: state.sellers.clone(),
            rules: state.rules.clone(),
            adjustments: state.adjustments.for_period(period),
        }
    }

    /// Generate the report for a period.
    pub fn generate_report(&self, period: Period) -> CommissionReport {
        self.snapshot(period).build_report()
    }

    // -- Sales cache ---------------------------------------------------------

    /// Cached rows of a period. Empty when nothing was imported.
    pub fn cached_rows(&self, period: Period) -> Arc<Vec<SalesLineItem>> {
        self.state
            .read()
            .sales
            .get(&period)
            .cloned()
            .unwrap_or_default()
    }

    /// Periods with cached rows, oldest first.
    pub fn available_periods(&self) -> Vec<Period> {
        self.state.read().sales.keys().copied().collect()
    }

    /// Validate an import and compute the refreshed seller table.
    ///
    /// Every row is stamped with `period`. Nothing is mutated.
    pub fn prepare_import(
        &self,
        period: Period,
        mut rows: Vec<SalesLineItem>,
    ) -> Result<PreparedImport, LedgerError> {
        if rows.is_empty() {
            return Err(LedgerError::EmptyImport(period));
        }
        for row in &mut rows {
            row.period = period;
        }

        let state = self.state.read();
        let sellers = reported_sellers(&rows)
            .into_iter()
            .map(|(id, name)| match state.sellers.get(&id) {
                Some(known) => Seller {
                    name,
                    ..known.clone()
                },
                None => Seller::new(id, name),
            })
            .collect();

        Ok(PreparedImport {
            period,
            rows,
            sellers,
        })
    }

    /// Swap a prepared import in: the period partition and the seller table
    /// change together.
    pub fn commit_import(&self, prepared: PreparedImport) -> ImportSummary {
        let summary = ImportSummary {
            period: prepared.period,
            rows: prepared.rows.len(),
            sellers: prepared.sellers.len(),
        };

        {
            let mut state = self.state.write();
            let sellers = prepared
                .sellers
                .into_iter()
                .map(|s| match state.sellers.get(&s.id) {
                    Some(current) => Seller {
                        name: s.name,
                        ..current.clone()
                    },
                    None => s,
                })
                .map(|s| (s.id, s))
                .collect();
            state
                .sales
                .insert(prepared.period, Arc::new(prepared.rows));
            state.sellers = sellers;
        }

        info!(
            period = %summary.period,
            rows = summary.rows,
            sellers = summary.sellers,
            "sales period imported"
        );
        summary
    }

    /// Prepare and commit in one call.
    pub fn import_rows(
        &self,
        period: Period,
        rows: Vec<SalesLineItem>,
    ) -> Result<ImportSummary, LedgerError> {
        let prepared = self.prepare_import(period, rows)?;
        Ok(self.commit_import(prepared))
    }

    // -- Sellers -------------------------------------------------------------

    /// All sellers ordered by name, then id.
    pub fn sellers(&self) -> Vec<Seller> {
        let mut sellers: Vec<Seller> = self.state.read().sellers.values().cloned().collect();
        sellers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        sellers
    }

    /// One seller.
    pub fn seller(&self, id: SellerId) -> Option<Seller> {
        self.state.read().sellers.get(&id).cloned()
    }

    /// Update operator flags of one seller.
    pub fn update_seller(&self, id: SellerId, flags: &SellerFlags) -> Result<Seller, LedgerError> {
        let mut state = self.state.write();
        let seller = state
            .sellers
            .get_mut(&id)
            .ok_or(LedgerError::SellerNotFound(id))?;
        seller.apply_flags(flags);
        Ok(seller.clone())
    }

    // -- Rules ---------------------------------------------------------------

    /// Resolve the rate for a seller and product against the current rules.
    pub fn resolve(&self, seller_id: SellerId, product_code: &ProductCode) -> ResolvedRate {
        resolve(&self.state.read().rules, seller_id, product_code)
    }

    /// All default rates.
    pub fn default_rates(&self) -> Vec<DefaultRate> {
        self.state.read().rules.default_rates()
    }

    /// One seller's default rate.
    pub fn default_rate(&self, seller_id: SellerId) -> Result<DefaultRate, LedgerError> {
        self.state
            .read()
            .rules
            .default_rate(seller_id)
            .map(|rate| DefaultRate { seller_id, rate })
            .ok_or(LedgerError::DefaultRateNotFound(seller_id))
    }

    /// Set a seller's default rate.
    pub fn set_default_rate(&self, seller_id: SellerId, rate: Rate) -> DefaultRate {
        self.state.write().rules.set_default_rate(seller_id, rate)
    }

    /// Remove a seller's default rate.
    pub fn remove_default_rate(&self, seller_id: SellerId) -> Result<DefaultRate, LedgerError> {
        self.state.write().rules.remove_default_rate(seller_id)
    }

    /// All product rules.
    pub fn product_rules(&self) -> Vec<ProductRule> {
        self.state.read().rules.product_rules()
    }

    /// Fail with a conflict if a rule for (scope, product) exists.
    pub fn ensure_product_rule_free(
        &self,
        scope: RuleScope,
        product_code: &ProductCode,
    ) -> Result<(), LedgerError> {
        self.state
            .read()
            .rules
            .ensure_product_rule_free(scope, product_code)
    }

    /// Create a product rule with the next free id.
    pub fn add_product_rule(
        &self,
        scope: RuleScope,
        product_code: ProductCode,
        rate: Rate,
    ) -> Result<ProductRule, LedgerError> {
        let mut state = self.state.write();
        let rule = ProductRule {
            id: state.rules.next_rule_id(),
            scope,
            product_code,
            rate,
        };
        state.rules.insert_product_rule(rule.clone())?;
        Ok(rule)
    }

    /// Insert a product rule whose id was assigned elsewhere (the database).
    pub fn insert_product_rule(&self, rule: ProductRule) -> Result<(), LedgerError> {
        self.state.write().rules.insert_product_rule(rule)
    }

    /// One product rule by id.
    pub fn product_rule(&self, id: i64) -> Result<ProductRule, LedgerError> {
        self.state
            .read()
            .rules
            .product_rule_by_id(id)
            .cloned()
            .ok_or(LedgerError::ProductRuleNotFound(id))
    }

    /// Change the rate of a product rule.
    pub fn set_product_rule_rate(&self, id: i64, rate: Rate) -> Result<ProductRule, LedgerError> {
        self.state.write().rules.set_product_rule_rate(id, rate)
    }

    /// Remove a product rule by id.
    pub fn remove_product_rule(&self, id: i64) -> Result<ProductRule, LedgerError> {
        self.state.write().rules.remove_product_rule(id)
    }

    /// All special products.
    pub fn special_products(&self) -> Vec<SpecialProduct> {
        self.state.read().rules.special_products()
    }

    /// Insert or replace a special product.
    pub fn upsert_special_product(&self, product: SpecialProduct) -> SpecialProduct {
        self.state
            .write()
            .rules
            .upsert_special_product(product.clone());
        product
    }

    /// Remove a special product.
    pub fn remove_special_product(
        &self,
        product_code: &ProductCode,
    ) -> Result<SpecialProduct, LedgerError> {
        self.state.write().rules.remove_special_product(product_code)
    }

    // -- Adjustments ---------------------------------------------------------

    /// The financial adjustment for (seller, period).
    pub fn financial_adjustment(
        &self,
        seller_id: SellerId,
        period: Period,
    ) -> Option<FinancialAdjustment> {
        self.state
            .read()
            .adjustments
            .financial(seller_id, period)
            .cloned()
    }

    /// The revenue adjustment for (seller, period).
    pub fn revenue_adjustment(
        &self,
        seller_id: SellerId,
        period: Period,
    ) -> Option<RevenueAdjustment> {
        self.state
            .read()
            .adjustments
            .revenue(seller_id, period)
            .cloned()
    }

    /// Insert or replace a financial adjustment.
    pub fn upsert_financial_adjustment(&self, adj: FinancialAdjustment) -> FinancialAdjustment {
        self.state.write().adjustments.upsert_financial(adj.clone());
        adj
    }

    /// Insert or replace a revenue adjustment.
    pub fn upsert_revenue_adjustment(&self, adj: RevenueAdjustment) -> RevenueAdjustment {
        self.state.write().adjustments.upsert_revenue(adj.clone());
        adj
    }

    /// Remove a financial adjustment.
    pub fn remove_financial_adjustment(
        &self,
        seller_id: SellerId,
        period: Period,
    ) -> Result<FinancialAdjustment, LedgerError> {
        self.state
            .write()
            .adjustments
            .remove_financial(seller_id, period)
    }

    /// Remove a revenue adjustment.
    pub fn remove_revenue_adjustment(
        &self,
        seller_id: SellerId,
        period: Period,
    ) -> Result<RevenueAdjustment, LedgerError> {
        self.state
            .write()
            .adjustments
            .remove_revenue(seller_id, period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SellerCategory;
    use crate::sales::fixtures::row;
    use rust_decimal::Decimal;

    fn id(n: i64) -> SellerId {
        SellerId::new(n).unwrap()
    }

    fn p(month: u32) -> Period {
        Period::new(month, 2025).unwrap()
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn empty_ledger_report_says_import_first() {
        let report = Ledger::new().generate_report(p(3));
        assert!(report.is_empty());
        assert_eq!(report.message, "No data found for 03/2025. Import the data first.");
    }

    #[test]
    fn import_replaces_partition_wholesale() {
        let ledger = Ledger::new();
        ledger
            .import_rows(p(3), vec![row(p(3), 1, "Ana", "A", "1", "10"), row(p(3), 1, "Ana", "B", "1", "20")])
            .unwrap();
        ledger
            .import_rows(p(3), vec![row(p(3), 1, "Ana", "C", "1", "30")])
            .unwrap();
        let rows = ledger.cached_rows(p(3));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_code.as_str(), "C");
    }

    #[test]
    fn empty_import_leaves_cache_untouched() {
        let ledger = Ledger::new();
        ledger
            .import_rows(p(3), vec![row(p(3), 1, "Ana", "A", "1", "10")])
            .unwrap();
        assert_eq!(
            ledger.import_rows(p(3), Vec::new()),
            Err(LedgerError::EmptyImport(p(3)))
        );
        assert_eq!(ledger.cached_rows(p(3)).len(), 1);
        assert_eq!(ledger.sellers().len(), 1);
    }

    #[test]
    fn seller_refresh_is_destructive_and_keeps_flags() {
        let ledger = Ledger::new();
        ledger
            .import_rows(
                p(3),
                vec![row(p(3), 1, "Ana", "A", "1", "10"), row(p(3), 2, "Bia", "A", "1", "10")],
            )
            .unwrap();
        ledger
            .update_seller(
                id(1),
                &SellerFlags {
                    category: Some(SellerCategory::Internal),
                    is_cooperative: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        ledger
            .import_rows(
                p(4),
                vec![row(p(4), 1, "Ana Maria", "A", "1", "10"), row(p(4), 3, "Caio", "A", "1", "10")],
            )
            .unwrap();

        let ids: Vec<i64> = ledger.sellers().iter().map(|s| s.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
        let ana = ledger.seller(id(1)).unwrap();
        assert_eq!(ana.name, "Ana Maria");
        assert_eq!(ana.category, SellerCategory::Internal);
        assert!(ana.is_cooperative);
        assert!(ledger.seller(id(2)).is_none());
    }

    #[test]
    fn flag_update_between_prepare_and_commit_survives() {
        let ledger = Ledger::new();
        ledger
            .import_rows(p(3), vec![row(p(3), 1, "Ana", "A", "1", "10")])
            .unwrap();

        let prepared = ledger
            .prepare_import(p(3), vec![row(p(3), 1, "Ana Maria", "A", "1", "20")])
            .unwrap();
        ledger
            .update_seller(
                id(1),
                &SellerFlags {
                    exclude_from_report: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        ledger.commit_import(prepared);

        let ana = ledger.seller(id(1)).unwrap();
        assert_eq!(ana.name, "Ana Maria");
        assert!(ana.exclude_from_report);
        assert!(ledger.generate_report(p(3)).is_empty());
    }

    #[test]
    fn oversized_stored_adjustment_does_not_break_the_report() {
        let ledger = Ledger::new();
        ledger
            .import_rows(p(3), vec![row(p(3), 1, "Ana", "A", "1", "50000")])
            .unwrap();
        ledger.upsert_revenue_adjustment(RevenueAdjustment {
            seller_id: id(1),
            period: p(3),
            amount: d("79228162514264337593543950335"),
            rate: Rate::parse("0.5").unwrap(),
            reason: None,
            updated_at: chrono::Utc::now(),
        });

        let report = ledger.generate_report(p(3));
        let rec = report.get(id(1)).unwrap();
        assert_eq!(rec.final_revenue, d("50000"));
        assert!(rec.revenue_adjustment.is_none());
    }

    #[test]
    fn report_for_period_skips_sellers_dropped_by_later_import() {
        let ledger = Ledger::new();
        ledger
            .import_rows(p(3), vec![row(p(3), 2, "Bia", "A", "1", "10")])
            .unwrap();
        ledger
            .import_rows(p(4), vec![row(p(4), 1, "Ana", "A", "1", "10")])
            .unwrap();
        assert!(ledger.generate_report(p(3)).is_empty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_imports() {
        let ledger = Ledger::new();
        ledger
            .import_rows(p(3), vec![row(p(3), 1, "Ana", "A", "1", "100")])
            .unwrap();
        let snapshot = ledger.snapshot(p(3));
        ledger
            .import_rows(p(3), vec![row(p(3), 1, "Ana", "A", "1", "999")])
            .unwrap();
        let report = snapshot.build_report();
        assert_eq!(report.get(id(1)).unwrap().total_revenue, d("100"));
    }

    #[test]
    fn available_periods_sorted_by_year_then_month() {
        let ledger = Ledger::new();
        let dec24 = Period::new(12, 2024).unwrap();
        ledger
            .import_rows(p(2), vec![row(p(2), 1, "Ana", "A", "1", "1")])
            .unwrap();
        ledger
            .import_rows(dec24, vec![row(dec24, 1, "Ana", "A", "1", "1")])
            .unwrap();
        assert_eq!(ledger.available_periods(), vec![dec24, p(2)]);
    }

    #[test]
    fn add_product_rule_assigns_ids_and_conflicts() {
        let ledger = Ledger::new();
        let code = ProductCode::new("A").unwrap();
        let rate = Rate::parse("0.03").unwrap();
        let first = ledger
            .add_product_rule(RuleScope::Global, code.clone(), rate)
            .unwrap();
        assert_eq!(first.id, 1);
        assert!(matches!(
            ledger.add_product_rule(RuleScope::Global, code.clone(), rate),
            Err(LedgerError::DuplicateProductRule { .. })
        ));
        let second = ledger
            .add_product_rule(RuleScope::Seller(id(1)), code, rate)
            .unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn adjustment_upsert_never_duplicates() {
        let ledger = Ledger::new();
        for amount in ["10", "20", "30"] {
            ledger.upsert_financial_adjustment(FinancialAdjustment::new(
                id(1),
                p(3),
                d(amount),
                Decimal::ZERO,
                Decimal::ZERO,
            ));
        }
        assert_eq!(ledger.export().financial_adjustments.len(), 1);
        assert_eq!(
            ledger.financial_adjustment(id(1), p(3)).unwrap().return_value,
            d("30")
        );
    }

    #[test]
    fn export_round_trips_through_from_export() {
        let ledger = Ledger::new();
        ledger
            .import_rows(p(3), vec![row(p(3), 1, "Ana", "A", "1", "100")])
            .unwrap();
        ledger.set_default_rate(id(1), Rate::parse("0.02").unwrap());
        ledger
            .add_product_rule(RuleScope::Global, ProductCode::new("A").unwrap(), Rate::parse("0.05").unwrap())
            .unwrap();

        let restored = Ledger::from_export(ledger.export()).unwrap();
        assert_eq!(restored.export(), ledger.export());
        assert_eq!(
            restored.generate_report(p(3)),
            ledger.generate_report(p(3))
        );
    }

    #[test]
    fn failed_restore_leaves_ledger_unchanged() {
        let ledger = Ledger::new();
        ledger.set_default_rate(id(1), Rate::parse("0.02").unwrap());

        let rule = ProductRule {
            id: 1,
            scope: RuleScope::Global,
            product_code: ProductCode::new("A").unwrap(),
            rate: Rate::FALLBACK,
        };
        let bad = LedgerExport {
            product_rules: vec![rule.clone(), ProductRule { id: 2, ..rule }],
            ..Default::default()
        };
        assert!(ledger.restore(bad).is_err());
        assert_eq!(ledger.default_rates().len(), 1);
    }
}
