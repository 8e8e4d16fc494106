//! # Aggregation Pipeline
//!
//! Turns one period's cached rows into a [`CommissionReport`]. Each stage is
//! a separate function over immutable inputs:
//!
//! 1. [`price_lines`]: drop excluded sellers, resolve a rate and compute the
//!    commission for every row.
//! 2. [`group_by_branch`]: group by (seller, branch) and split each group
//!    into rate-modified and standard buckets.
//! 3. [`consolidate`]: sum a seller's branches.
//! 4. [`try_apply_adjustments`]: overlay manual adjustments.
//! 5. [`sort_records`]: final revenue descending, seller id ascending.
//!
//! [`build_report`] runs them in order. Sellers with rows but no seller
//! record are skipped and logged. Sums are checked: a row or branch that
//! would overflow its totals is skipped and logged, and adjustments that
//! would overflow a seller's figures are left out of that seller's record.

use std::collections::{BTreeMap, BTreeSet};

use commission_core::{BranchId, Period, ProductCode, SellerId};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::adjustment::{try_apply_adjustments, AdjustmentBook, ConsolidatedFigures, OverlayBase};
use crate::report::{
    BranchBreakdown, BucketTotals, CommissionReport, ConsolidatedRecord, ProductDetail,
    SellerSummary,
};
use crate::resolver::{resolve, ResolvedRate};
use crate::rules::{RuleBook, Seller};
use crate::sales::SalesLineItem;

/// Everything a report run reads. Borrowed from a ledger snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    /// The reported period.
    pub period: Period,
    /// Cached rows of `period`.
    pub rows: &'a [SalesLineItem],
    /// Current seller table, including report exclusions.
    pub sellers: &'a BTreeMap<SellerId, Seller>,
    pub rules: &'a RuleBook,
    pub adjustments: &'a AdjustmentBook,
}

/// A row with its resolved rate and commission.
#[derive(Debug, Clone, Copy)]
pub struct PricedLine<'a> {
    /// The cached row.
    pub item: &'a SalesLineItem,
    /// Rate applied to the row and the tier it came from.
    pub resolved: ResolvedRate,
    /// `item.revenue * resolved.rate`, unrounded.
    pub commission: Decimal,
}

/// Pre-overlay sums of one seller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SellerTotals {
    pub total_revenue: Decimal,
    pub total_commission_base: Decimal,
    /// Raw return values of every row, before any adjustment.
    pub total_return_value: Decimal,
    pub total_open_invoice_value: Decimal,
    pub total_prior_surcharge_value: Decimal,
}

/// Status message for a period with no cached rows.
pub fn no_data_message(period: Period) -> String {
    format!("No data found for {period}. Import the data first.")
}

/// Status message for a generated report.
pub fn success_message(period: Period) -> String {
    format!("Report generated for {period}")
}

/// Stage 1: drop rows of report-excluded sellers and price the rest.
pub fn price_lines<'a>(
    rows: &'a [SalesLineItem],
    sellers: &BTreeMap<SellerId, Seller>,
    rules: &RuleBook,
) -> Vec<PricedLine<'a>> {
    let excluded: BTreeSet<SellerId> = sellers
        .values()
        .filter(|s| s.exclude_from_report)
        .map(|s| s.id)
        .collect();

    rows.iter()
        .filter(|item| !excluded.contains(&item.seller_id))
        .map(|item| {
            let resolved = resolve(rules, item.seller_id, &item.product_code);
            PricedLine {
                item,
                resolved,
                commission: resolved.rate.apply(item.revenue),
            }
        })
        .collect()
}

#[derive(Default)]
struct BranchAccumulator {
    revenue: Decimal,
    commission: Decimal,
    rate_modified: BucketTotals,
    standard: BucketTotals,
    details: Vec<ProductDetail>,
}

/// Stage 2: per-seller branch breakdowns, branches ordered by id.
///
/// A row lands in the rate-modified bucket iff its product is in
/// `rate_modified`, regardless of which tier priced it.
pub fn group_by_branch(
    lines: &[PricedLine<'_>],
    rate_modified: &BTreeSet<ProductCode>,
) -> BTreeMap<SellerId, Vec<BranchBreakdown>> {
    let mut groups: BTreeMap<(SellerId, BranchId), BranchAccumulator> = BTreeMap::new();

    for line in lines {
        let item = line.item;
        let acc = groups
            .entry((item.seller_id, item.branch_id.clone()))
            .or_default();
        let modified = rate_modified.contains(&item.product_code);

        let sums = acc
            .revenue
            .checked_add(item.revenue)
            .zip(acc.commission.checked_add(line.commission));
        let bucket = if modified {
            &mut acc.rate_modified
        } else {
            &mut acc.standard
        };
        let Some((revenue, commission)) = sums.filter(|_| bucket.add(item, line.commission)) else {
            warn!(
                seller_id = %item.seller_id,
                branch_id = %item.branch_id,
                product_code = %item.product_code,
                "skipping row that overflows branch totals"
            );
            continue;
        };
        acc.revenue = revenue;
        acc.commission = commission;

        if modified {
            acc.details.push(ProductDetail {
                product_code: item.product_code.clone(),
                product_desc: item.product_desc.clone(),
                revenue: item.revenue,
                commission: line.commission,
                rate: line.resolved.rate,
                rate_source: line.resolved.source,
            });
        }
    }

    let mut by_seller: BTreeMap<SellerId, Vec<BranchBreakdown>> = BTreeMap::new();
    for ((seller_id, branch_id), acc) in groups {
        by_seller.entry(seller_id).or_default().push(BranchBreakdown {
            branch_id,
            revenue: acc.revenue,
            commission: acc.commission,
            rate_modified: acc.rate_modified,
            standard: acc.standard,
            rate_modified_products: acc.details,
        });
    }
    by_seller
}

/// Stage 3: sum one seller's branches.
///
/// A branch whose addition would overflow the totals is left out.
pub fn consolidate(branches: &[BranchBreakdown]) -> SellerTotals {
    branches
        .iter()
        .fold(SellerTotals::default(), |totals, branch| {
            add_branch(totals, branch).unwrap_or_else(|| {
                warn!(branch_id = %branch.branch_id, "skipping branch that overflows seller totals");
                totals
            })
        })
}

fn add_branch(totals: SellerTotals, branch: &BranchBreakdown) -> Option<SellerTotals> {
    let buckets = [&branch.rate_modified, &branch.standard];
    let sum = |start: Decimal, pick: fn(&BucketTotals) -> Decimal| {
        buckets
            .into_iter()
            .try_fold(start, |acc, bucket| acc.checked_add(pick(bucket)))
    };
    Some(SellerTotals {
        total_revenue: totals.total_revenue.checked_add(branch.revenue)?,
        total_commission_base: totals.total_commission_base.checked_add(branch.commission)?,
        total_return_value: sum(totals.total_return_value, |b| b.return_value)?,
        total_open_invoice_value: sum(totals.total_open_invoice_value, |b| b.open_invoice_value)?,
        total_prior_surcharge_value: sum(totals.total_prior_surcharge_value, |b| {
            b.prior_surcharge_value
        })?,
    })
}

/// Stage 5: final revenue descending, ties by seller id ascending.
pub fn sort_records(records: &mut [ConsolidatedRecord]) {
    records.sort_by(|a, b| {
        b.final_revenue
            .cmp(&a.final_revenue)
            .then_with(|| a.seller.id.cmp(&b.seller.id))
    });
}

/// Run the whole pipeline for one period.
///
/// An empty period is not an error: it yields an empty report carrying the
/// "No data found" message.
pub fn build_report(inputs: &ReportInputs<'_>) -> CommissionReport {
    let period = inputs.period;
    if inputs.rows.is_empty() {
        return CommissionReport {
            period,
            message: no_data_message(period),
            sellers: Vec::new(),
        };
    }

    let lines = price_lines(inputs.rows, inputs.sellers, inputs.rules);
    let rate_modified = inputs.rules.rate_modified_products();
    let grouped = group_by_branch(&lines, &rate_modified);

    let mut records = Vec::with_capacity(grouped.len());
    for (seller_id, branches) in grouped {
        let Some(seller) = inputs.sellers.get(&seller_id) else {
            let rows = lines.iter().filter(|l| l.item.seller_id == seller_id).count();
            warn!(seller_id = %seller_id, rows, period = %period, "skipping rows of unknown seller");
            continue;
        };

        let totals = consolidate(&branches);
        let base = OverlayBase {
            total_revenue: totals.total_revenue,
            total_commission_base: totals.total_commission_base,
        };
        let financial = inputs.adjustments.financial(seller_id, period);
        let revenue = inputs.adjustments.revenue(seller_id, period);
        let (financial, revenue, figures) = match try_apply_adjustments(base, financial, revenue) {
            Some(figures) => (financial, revenue, figures),
            None => {
                warn!(
                    seller_id = %seller_id,
                    period = %period,
                    "adjustments overflow seller totals; reporting unadjusted figures"
                );
                (None, None, ConsolidatedFigures::unadjusted(base))
            }
        };

        records.push(ConsolidatedRecord {
            seller: SellerSummary::from(seller),
            branches,
            total_revenue: totals.total_revenue,
            total_return_value: totals.total_return_value,
            total_open_invoice_value: totals.total_open_invoice_value,
            total_prior_surcharge_value: totals.total_prior_surcharge_value,
            financial_adjustment: financial.cloned(),
            revenue_adjustment: revenue.cloned(),
            total_commission_base: figures.total_commission_base,
            commission_from_revenue_adjustment: figures.commission_from_revenue_adjustment,
            total_commission: figures.total_commission,
            final_commission: figures.final_commission,
            final_revenue: figures.final_revenue,
        });
    }

    sort_records(&mut records);
    info!(period = %period, rows = lines.len(), sellers = records.len(), "commission report generated");

    CommissionReport {
        period,
        message: success_message(period),
        sellers: records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::{FinancialAdjustment, RevenueAdjustment};
    use crate::rules::{ProductRule, RuleScope, SpecialProduct};
    use crate::sales::fixtures::row;
    use commission_core::Rate;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn id(n: i64) -> SellerId {
        SellerId::new(n).unwrap()
    }

    fn code(s: &str) -> ProductCode {
        ProductCode::new(s).unwrap()
    }

    fn period() -> Period {
        Period::new(3, 2025).unwrap()
    }

    fn sellers(ids: &[(i64, &str)]) -> BTreeMap<SellerId, Seller> {
        ids.iter()
            .map(|(n, name)| (id(*n), Seller::new(id(*n), *name)))
            .collect()
    }

    fn run(
        rows: &[SalesLineItem],
        sellers: &BTreeMap<SellerId, Seller>,
        rules: &RuleBook,
        adjustments: &AdjustmentBook,
    ) -> CommissionReport {
        build_report(&ReportInputs {
            period: period(),
            rows,
            sellers,
            rules,
            adjustments,
        })
    }

    #[test]
    fn empty_period_reports_no_data_message() {
        let report = run(&[], &BTreeMap::new(), &RuleBook::new(), &AdjustmentBook::new());
        assert!(report.is_empty());
        assert_eq!(report.message, "No data found for 03/2025. Import the data first.");
    }

    #[test]
    fn fallback_rate_and_success_message() {
        let rows = vec![row(period(), 1, "Ana", "A", "1", "50000")];
        let report = run(&rows, &sellers(&[(1, "Ana")]), &RuleBook::new(), &AdjustmentBook::new());
        assert_eq!(report.message, "Report generated for 03/2025");
        let rec = report.get(id(1)).unwrap();
        assert_eq!(rec.total_commission_base, d("750"));
        assert_eq!(rec.final_commission, d("750"));
    }

    #[test]
    fn overlay_arithmetic_end_to_end() {
        let rows = vec![row(period(), 83, "Michelle", "A", "1", "50000")];
        let mut adj = AdjustmentBook::new();
        adj.upsert_revenue(
            RevenueAdjustment::new(id(83), period(), d("5000"), Rate::FALLBACK, None).unwrap(),
        );
        adj.upsert_financial(FinancialAdjustment::new(id(83), period(), d("100"), d("50"), d("30")));

        let report = run(&rows, &sellers(&[(83, "Michelle")]), &RuleBook::new(), &adj);
        let rec = report.get(id(83)).unwrap();
        assert_eq!(rec.total_commission, d("825"));
        assert_eq!(rec.final_commission, d("705"));
        assert_eq!(rec.final_revenue, d("55000"));
        assert!(rec.financial_adjustment.is_some());
    }

    #[test]
    fn excluded_sellers_are_dropped() {
        let rows = vec![
            row(period(), 1, "Ana", "A", "1", "100"),
            row(period(), 2, "Bia", "A", "1", "100"),
        ];
        let mut table = sellers(&[(1, "Ana"), (2, "Bia")]);
        table.get_mut(&id(2)).unwrap().exclude_from_report = true;
        let report = run(&rows, &table, &RuleBook::new(), &AdjustmentBook::new());
        assert!(report.get(id(1)).is_some());
        assert!(report.get(id(2)).is_none());
    }

    #[test]
    fn unknown_sellers_are_skipped() {
        let rows = vec![
            row(period(), 1, "Ana", "A", "1", "100"),
            row(period(), 9, "Ghost", "A", "1", "100"),
        ];
        let report = run(&rows, &sellers(&[(1, "Ana")]), &RuleBook::new(), &AdjustmentBook::new());
        assert_eq!(report.sellers.len(), 1);
        assert_eq!(report.message, "Report generated for 03/2025");
    }

    #[test]
    fn zero_revenue_seller_still_appears() {
        let rows = vec![row(period(), 1, "Ana", "A", "1", "0")];
        let report = run(&rows, &sellers(&[(1, "Ana")]), &RuleBook::new(), &AdjustmentBook::new());
        assert_eq!(report.get(id(1)).unwrap().final_revenue, Decimal::ZERO);
    }

    #[test]
    fn sorted_by_final_revenue_then_seller_id() {
        let rows = vec![
            row(period(), 3, "C", "A", "1", "100"),
            row(period(), 1, "A", "A", "1", "100"),
            row(period(), 2, "B", "A", "1", "500"),
        ];
        let report = run(
            &rows,
            &sellers(&[(1, "A"), (2, "B"), (3, "C")]),
            &RuleBook::new(),
            &AdjustmentBook::new(),
        );
        let order: Vec<i64> = report.sellers.iter().map(|r| r.seller_id().get()).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn revenue_adjustment_moves_seller_up() {
        let rows = vec![
            row(period(), 1, "A", "A", "1", "100"),
            row(period(), 2, "B", "A", "1", "150"),
        ];
        let mut adj = AdjustmentBook::new();
        adj.upsert_revenue(RevenueAdjustment::new(id(1), period(), d("100"), Rate::ZERO, None).unwrap());
        let report = run(&rows, &sellers(&[(1, "A"), (2, "B")]), &RuleBook::new(), &adj);
        assert_eq!(report.sellers[0].seller_id(), id(1));
    }

    #[test]
    fn overflowing_revenue_adjustment_is_left_out() {
        let rows = vec![row(period(), 1, "Ana", "A", "1", "50000")];
        let mut adj = AdjustmentBook::new();
        adj.upsert_revenue(RevenueAdjustment {
            amount: Decimal::MAX,
            ..RevenueAdjustment::new(id(1), period(), d("1"), Rate::parse("1").unwrap(), None).unwrap()
        });

        let report = run(&rows, &sellers(&[(1, "Ana")]), &RuleBook::new(), &adj);
        let rec = report.get(id(1)).unwrap();
        assert_eq!(rec.final_revenue, d("50000"));
        assert_eq!(rec.final_commission, d("750"));
        assert_eq!(rec.commission_from_revenue_adjustment, Decimal::ZERO);
        assert!(rec.revenue_adjustment.is_none());
    }

    #[test]
    fn overflowing_row_is_skipped() {
        let mut huge = row(period(), 1, "Ana", "A", "1", "1");
        huge.revenue = Decimal::MAX;
        let rows = vec![huge.clone(), huge, row(period(), 1, "Ana", "A", "2", "100")];

        let report = run(&rows, &sellers(&[(1, "Ana")]), &RuleBook::new(), &AdjustmentBook::new());
        let rec = report.get(id(1)).unwrap();
        assert_eq!(rec.branches.len(), 2);
        assert_eq!(rec.branches[0].revenue, Decimal::MAX);
        assert_eq!(rec.branches[0].standard.revenue, Decimal::MAX);
        // The second branch would overflow the seller total and is left out.
        assert_eq!(rec.total_revenue, Decimal::MAX);
    }

    #[test]
    fn buckets_split_by_rate_modified_set() {
        let mut rules = RuleBook::new();
        rules.upsert_special_product(
            SpecialProduct::new(code("S"), "Special", Rate::parse("0.04").unwrap()).unwrap(),
        );
        rules
            .insert_product_rule(ProductRule {
                id: 1,
                scope: RuleScope::Seller(id(1)),
                product_code: code("P"),
                rate: Rate::parse("0.10").unwrap(),
            })
            .unwrap();

        let mut special = row(period(), 1, "Ana", "S", "1", "1000");
        special.return_value = d("5");
        let rows = vec![
            special,
            row(period(), 1, "Ana", "P", "1", "1000"),
            row(period(), 1, "Ana", "X", "2", "1000"),
        ];
        let report = run(&rows, &sellers(&[(1, "Ana")]), &rules, &AdjustmentBook::new());
        let rec = report.get(id(1)).unwrap();

        assert_eq!(rec.branches.len(), 2);
        let b1 = &rec.branches[0];
        assert_eq!(b1.branch_id.as_str(), "1");
        assert_eq!(b1.rate_modified.revenue, d("1000"));
        assert_eq!(b1.rate_modified.commission, d("40"));
        assert_eq!(b1.rate_modified.return_value, d("5"));
        // Seller-specific rule prices P at 10% but P stays standard.
        assert_eq!(b1.standard.revenue, d("1000"));
        assert_eq!(b1.standard.commission, d("100"));
        assert_eq!(b1.revenue, d("2000"));
        assert_eq!(b1.rate_modified_products.len(), 1);

        assert_eq!(rec.total_revenue, d("3000"));
        assert_eq!(rec.total_commission_base, d("155"));
        assert_eq!(rec.total_return_value, d("5"));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let rows = vec![
            row(period(), 1, "Ana", "A", "1", "123.45"),
            row(period(), 2, "Bia", "B", "2", "678.90"),
        ];
        let table = sellers(&[(1, "Ana"), (2, "Bia")]);
        let rules = RuleBook::new();
        let adj = AdjustmentBook::new();
        assert_eq!(run(&rows, &table, &rules, &adj), run(&rows, &table, &rules, &adj));
    }
}
