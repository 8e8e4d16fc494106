//! # Custom Extractors & Validation
//!
//! The [`Validate`] trait for request DTOs, helpers to extract and validate
//! JSON bodies, and [`NumericInput`] for amount fields that operators may
//! send either as JSON numbers or as strings.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use commission_core::{check_amount, parse_amount, Period, Rate, SellerId, ValidationError};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppError;

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// A numeric field accepted as a JSON number or a decimal string.
///
/// Non-numeric text deserializes fine and fails in [`NumericInput::amount`],
/// so the client gets a 422 naming the field instead of a 400 parse error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
}

impl Default for NumericInput {
    fn default() -> Self {
        Self::Number(0.into())
    }
}

impl NumericInput {
    /// Parse as a decimal amount, naming `field` on failure.
    ///
    /// Magnitudes above [`commission_core::MAX_AMOUNT`] are rejected.
    pub fn amount(&self, field: &str) -> Result<Decimal, ValidationError> {
        let raw = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        };
        let value = parse_amount(&raw).ok_or_else(|| ValidationError::InvalidAmount {
            field: field.to_string(),
            value: raw,
        })?;
        check_amount(field, value)
    }

    /// Parse as a commission rate in `[0, 1]`.
    pub fn rate(&self) -> Result<Rate, ValidationError> {
        match self {
            Self::Number(n) => Rate::parse(&n.to_string()),
            Self::Text(s) => Rate::parse(s),
        }
    }
}

/// Validate a raw seller id from a path segment or body.
pub fn seller_id(raw: i64) -> Result<SellerId, AppError> {
    Ok(SellerId::new(raw)?)
}

/// Validate a raw `(year, month)` pair from a path.
pub fn period(year: i32, month: u32) -> Result<Period, AppError> {
    Ok(Period::new(month, year)?)
}
