//! # Error Types: Validation Hierarchy
//!
//! Structured validation errors shared by every write path in the stack,
//! built with `thiserror`. Each variant carries the rejected input so that
//! operators can diagnose a bad request without guesswork.

use thiserror::Error;

/// Validation errors for domain primitives and write requests.
///
/// Raised before any store mutation; a request that fails validation leaves
/// every table unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Seller (RCA) codes are positive integers.
    #[error("invalid seller id: {0} (expected a positive integer)")]
    InvalidSellerId(i64),

    /// Product code is empty or too long.
    #[error("invalid product code: \"{0}\" (expected 1-50 characters)")]
    InvalidProductCode(String),

    /// Branch identifier is empty or too long.
    #[error("invalid branch id: \"{0}\" (expected 1-50 characters)")]
    InvalidBranchId(String),

    /// Month outside 1..=12.
    #[error("invalid month: {0} (expected 1-12)")]
    InvalidMonth(u32),

    /// Year outside the supported reporting range.
    #[error("invalid year: {0} (expected 2000-2100)")]
    InvalidYear(i32),

    /// A commission rate must be a fraction in `[0, 1]`.
    #[error("invalid commission rate: {0} (expected a fraction between 0 and 1)")]
    InvalidRate(String),

    /// A monetary value could not be parsed as a decimal number.
    #[error("invalid amount for {field}: \"{value}\"")]
    InvalidAmount {
        /// The request field that carried the value.
        field: String,
        /// The rejected input.
        value: String,
    },

    /// A required field was absent or blank.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A free-text field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// The request field.
        field: String,
        /// Maximum accepted length in characters.
        max: usize,
    },
}
