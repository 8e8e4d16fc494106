//! # API Route Modules
//!
//! - `reports`: commission report for a period, list of cached periods.
//! - `imports`: pull one period from the upstream sales source.
//! - `sellers`: seller list and operator flags.
//! - `rules`: default rates, product rules, special products, and a rate
//!   resolution probe.
//! - `adjustments`: per-seller, per-period financial and revenue
//!   adjustments.

pub mod adjustments;
pub mod imports;
pub mod reports;
pub mod rules;
pub mod sellers;
