#![deny(missing_docs)]

//! # commission-core: Foundational Types for the Commission Stack
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies, only `serde`, `thiserror`, `chrono` and
//! `rust_decimal` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain identifiers.** A [`SellerId`] cannot be
//!    passed where a [`ProductCode`] is expected, and both validate at
//!    construction.
//!
//! 2. **Fixed-point money.** Amounts and rates are `rust_decimal::Decimal`.
//!    Nothing in the stack sums currency in binary floating point; rounding
//!    happens once, at display time, via [`money::format_amount`].
//!
//! 3. **[`ValidationError`] is checked before mutation.** Every write path
//!    validates its inputs with these types before touching a store.

pub mod error;
pub mod identity;
pub mod money;
pub mod period;

pub use error::ValidationError;
pub use identity::{BranchId, ProductCode, SellerId};
pub use money::{
    check_amount, format_amount, parse_amount, round_money, serialize_amount, Rate, MAX_AMOUNT,
};
pub use period::Period;
