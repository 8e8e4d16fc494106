//! # Reporting Periods
//!
//! A [`Period`] is one calendar month of one year. Sales are imported, cached
//! and reported per period; manual adjustments are keyed by seller and period.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Earliest supported reporting year.
pub const MIN_YEAR: i32 = 2000;
/// Latest supported reporting year.
pub const MAX_YEAR: i32 = 2100;

/// A (month, year) reporting period.
///
/// Ordered chronologically: year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod", into = "RawPeriod")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a validated period.
    pub fn new(month: u32, year: i32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidMonth(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(ValidationError::InvalidYear(year));
        }
        Ok(Self { year, month })
    }

    /// The current calendar month (UTC).
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    /// Month, 1-12.
    pub fn month(self) -> u32 {
        self.month
    }

    /// Four-digit year.
    pub fn year(self) -> i32 {
        self.year
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.year, self.month).cmp(&(other.year, other.month))
    }
}

impl std::fmt::Display for Period {
    /// `MM/YYYY`, e.g. `03/2025`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

#[derive(Serialize, Deserialize)]
struct RawPeriod {
    month: u32,
    year: i32,
}

impl TryFrom<RawPeriod> for Period {
    type Error = ValidationError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Self::new(raw.month, raw.year)
    }
}

impl From<Period> for RawPeriod {
    fn from(p: Period) -> Self {
        Self {
            month: p.month,
            year: p.year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_month_and_year() {
        assert_eq!(Period::new(0, 2025), Err(ValidationError::InvalidMonth(0)));
        assert_eq!(Period::new(13, 2025), Err(ValidationError::InvalidMonth(13)));
        assert_eq!(Period::new(1, 1999), Err(ValidationError::InvalidYear(1999)));
        assert!(Period::new(12, 2024).is_ok());
    }

    #[test]
    fn orders_by_year_then_month() {
        let mut periods = vec![
            Period::new(1, 2025).unwrap(),
            Period::new(12, 2024).unwrap(),
            Period::new(3, 2024).unwrap(),
        ];
        periods.sort();
        let shown: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(shown, vec!["03/2024", "12/2024", "01/2025"]);
    }

    #[test]
    fn serde_validates() {
        let p: Period = serde_json::from_str(r#"{"month":12,"year":2024}"#).unwrap();
        assert_eq!(p.month(), 12);
        assert!(serde_json::from_str::<Period>(r#"{"month":13,"year":2024}"#).is_err());
        assert_eq!(
            serde_json::to_value(p).unwrap(),
            serde_json::json!({"month": 12, "year": 2024})
        );
    }

    #[test]
    fn current_is_valid() {
        let now = Period::current();
        assert!(Period::new(now.month(), now.year()).is_ok());
    }
}
