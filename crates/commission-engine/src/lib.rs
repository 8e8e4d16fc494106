//! # commission-engine: Rate Resolution and Report Aggregation
//!
//! The core of the commission stack. Given cached sales rows for a period,
//! the rule tables and the manual adjustments, it produces one consolidated
//! record per seller:
//!
//! ```text
//! cached rows ─► price_lines ─► group_by_branch ─► consolidate ─► apply_adjustments ─► sort
//!                    │
//!                    └─ resolver: seller rule → special product → global rule → default → 1.5%
//! ```
//!
//! ## Modules
//!
//! - [`rules`]: sellers, default rates, product rules, special products.
//! - [`resolver`]: the rate-precedence lookup.
//! - [`sales`]: cached sales line-items.
//! - [`adjustment`]: financial/revenue adjustments and the overlay arithmetic.
//! - [`pipeline`]: the staged aggregation and [`build_report`].
//! - [`report`]: immutable report value objects.
//! - [`ledger`]: the thread-safe container with atomic period import.
//!
//! Nothing here performs I/O. Upstream fetching and persistence live in
//! `commission-upstream` and `commission-api`.

pub mod adjustment;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod sales;

pub use adjustment::{
    apply_adjustments, try_apply_adjustments, AdjustmentBook, ConsolidatedFigures,
    FinancialAdjustment, OverlayBase, RevenueAdjustment,
};
pub use error::LedgerError;
pub use ledger::{ImportSummary, Ledger, LedgerExport, PreparedImport, ReportSnapshot};
pub use pipeline::{build_report, ReportInputs};
pub use report::{BranchBreakdown, BucketTotals, CommissionReport, ConsolidatedRecord, ProductDetail};
pub use resolver::{resolve, resolve_rate, RateSource, ResolvedRate};
pub use rules::{
    DefaultRate, ProductRule, RuleBook, RuleScope, Seller, SellerCategory, SellerFlags,
    SpecialProduct,
};
pub use sales::SalesLineItem;
