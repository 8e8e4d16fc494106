//! # Money and Rate Helpers
//!
//! All monetary values in the stack are `rust_decimal::Decimal`. Sums and
//! products keep full precision; [`round_money`] and [`format_amount`] apply
//! the two-decimal display rounding exactly once, at the output boundary.
//!
//! Commission rates are fractions (`0.015` is 1.5%) wrapped in [`Rate`],
//! which rejects anything outside `[0, 1]`.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;

/// Largest magnitude accepted for a single monetary input: 10^15.
///
/// Sums of many such values stay far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Parse a decimal amount from a string.
///
/// Accepts plain decimal notation with an optional sign (`"5000"`,
/// `"-12.5"`, `"0.015"`) and exponent notation (`"1e-7"`, `"2.5E3"`).
/// Returns `None` for blank or unparseable input.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Reject amounts whose magnitude exceeds [`MAX_AMOUNT`].
pub fn check_amount(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value.abs() > MAX_AMOUNT {
        return Err(ValidationError::InvalidAmount {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Round an amount to cents, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        // Avoid rendering "-0.00".
        return Decimal::ZERO;
    }
    rounded
}

/// Format an amount with exactly two decimal places.
///
/// `825` → `"825.00"`, `74.995` → `"75.00"`, `0.1` → `"0.10"`.
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = round_money(value);
    rounded.rescale(2);
    rounded.to_string()
}

/// Serialize an amount as its two-decimal display string.
///
/// For report fields: `#[serde(serialize_with = "serialize_amount")]`.
pub fn serialize_amount<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_amount(*value))
}

/// A commission rate expressed as a fraction of revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    /// Zero rate, used when a manual revenue adjustment is absent.
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// Rate applied when no rule tier matches: 1.5%.
    pub const FALLBACK: Rate = Rate(Decimal::from_parts(15, 0, 0, false, 3));

    /// Create a rate, rejecting values outside `[0, 1]`.
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if (value.is_sign_negative() && !value.is_zero()) || value > Decimal::ONE {
            return Err(ValidationError::InvalidRate(value.to_string()));
        }
        Ok(Self(value.normalize()))
    }

    /// Parse a rate from its decimal string form (`"0.025"`).
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let value = parse_amount(s).ok_or_else(|| ValidationError::InvalidRate(s.to_string()))?;
        Self::new(value)
    }

    /// The underlying fraction.
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Apply this rate to an amount, keeping full precision.
    pub fn apply(self, amount: Decimal) -> Decimal {
        amount * self.0
    }

    /// The rate as a percentage (`0.015` → `1.5`).
    pub fn as_percent(self) -> Decimal {
        (self.0 * Decimal::ONE_HUNDRED).normalize()
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parse_amount_accepts_plain_decimals() {
        assert_eq!(parse_amount("5000"), Some(d("5000")));
        assert_eq!(parse_amount(" 100.50 "), Some(d("100.50")));
        assert_eq!(parse_amount("-12.5"), Some(d("-12.5")));
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("1,5"), None);
    }

    #[test]
    fn parse_amount_accepts_exponent_form() {
        assert_eq!(parse_amount("1e-7"), Some(Decimal::new(1, 7)));
        assert_eq!(parse_amount("2.5E3"), Some(d("2500")));
        assert_eq!(parse_amount("1e21"), Some(d("1000000000000000000000")));
        assert_eq!(parse_amount("1e"), None);
    }

    #[test]
    fn amounts_are_bounded() {
        assert_eq!(MAX_AMOUNT, d("1000000000000000"));
        assert_eq!(check_amount("amount", MAX_AMOUNT), Ok(MAX_AMOUNT));
        assert_eq!(check_amount("amount", -MAX_AMOUNT), Ok(-MAX_AMOUNT));
        let err = check_amount("amount", d("79228162514264337593543950335")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount { ref field, .. } if field == "amount"));
        assert!(check_amount("amount", d("-1000000000000000.01")).is_err());
    }

    #[test]
    fn format_amount_pads_and_rounds() {
        assert_eq!(format_amount(d("825")), "825.00");
        assert_eq!(format_amount(d("0.1")), "0.10");
        assert_eq!(format_amount(d("74.995")), "75.00");
        assert_eq!(format_amount(d("-74.995")), "-75.00");
        assert_eq!(format_amount(d("-0.001")), "0.00");
    }

    #[test]
    fn serialize_amount_emits_display_string() {
        #[derive(Serialize)]
        struct Row {
            #[serde(serialize_with = "serialize_amount")]
            total: Decimal,
        }
        let json = serde_json::to_string(&Row { total: d("825.00000") }).unwrap();
        assert_eq!(json, r#"{"total":"825.00"}"#);
    }

    #[test]
    fn fallback_rate_is_one_and_a_half_percent() {
        assert_eq!(Rate::FALLBACK.value(), d("0.015"));
        assert_eq!(Rate::FALLBACK.as_percent(), d("1.5"));
    }

    #[test]
    fn rate_bounds() {
        assert!(Rate::new(d("0")).is_ok());
        assert!(Rate::new(d("1")).is_ok());
        assert!(Rate::new(d("1.0001")).is_err());
        assert!(Rate::new(d("-0.01")).is_err());
        assert!(Rate::parse("x").is_err());
    }

    #[test]
    fn rate_apply_keeps_precision() {
        let rate = Rate::parse("0.015").unwrap();
        assert_eq!(rate.apply(d("5000.00")), d("75.00000"));
        assert_eq!(rate.apply(d("333.33")), d("4.99995"));
    }

    #[test]
    fn rate_deserializes_from_number_or_string() {
        let a: Rate = serde_json::from_str("0.025").unwrap();
        let b: Rate = serde_json::from_str("\"0.025\"").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<Rate>("2").is_err());
    }
}
