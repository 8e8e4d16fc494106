//! # Identity Newtypes
//!
//! Domain identifiers used across the commission stack. Each identifier is a
//! distinct type and validates its format at construction.
//!
//! - [`SellerId`]: the RCA code of a seller, a positive integer.
//! - [`ProductCode`]: catalog product code as reported by the upstream.
//! - [`BranchId`]: organizational sub-unit a sale was booked under.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of product codes and branch identifiers.
const MAX_CODE_LEN: usize = 50;

/// RCA code identifying a seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SellerId(i64);

impl SellerId {
    /// Create a seller id, rejecting zero and negative codes.
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if raw <= 0 {
            return Err(ValidationError::InvalidSellerId(raw));
        }
        Ok(Self(raw))
    }

    /// The raw RCA code.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for SellerId {
    type Error = ValidationError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<SellerId> for i64 {
    fn from(id: SellerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SellerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product code.
///
/// Stored trimmed. Codes are compared as strings: `"0123"` and `"123"` are
/// different products.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductCode(String);

impl ProductCode {
    /// Create a validated product code (1-50 characters after trimming).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_CODE_LEN {
            return Err(ValidationError::InvalidProductCode(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductCode {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<ProductCode> for String {
    fn from(code: ProductCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Branch (organizational sub-unit) identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchId(String);

impl BranchId {
    /// Create a validated branch id (1-50 characters after trimming).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_CODE_LEN {
            return Err(ValidationError::InvalidBranchId(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The branch id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchId {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<BranchId> for String {
    fn from(id: BranchId) -> Self {
        id.0
    }
}

impl std::fmt::Display for BranchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seller_id_rejects_non_positive() {
        assert!(SellerId::new(0).is_err());
        assert!(SellerId::new(-1).is_err());
        assert_eq!(SellerId::new(83).unwrap().get(), 83);
    }

    #[test]
    fn seller_id_serializes_as_integer() {
        let id = SellerId::new(83).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "83");
        let back: SellerId = serde_json::from_str("83").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<SellerId>("0").is_err());
    }

    #[test]
    fn product_code_is_trimmed() {
        let code = ProductCode::new("  123 ").unwrap();
        assert_eq!(code.as_str(), "123");
    }

    #[test]
    fn product_code_rejects_blank_and_long() {
        assert!(ProductCode::new("   ").is_err());
        assert!(ProductCode::new("x".repeat(51)).is_err());
        assert!(ProductCode::new("x".repeat(50)).is_ok());
    }

    #[test]
    fn product_codes_compare_as_strings() {
        assert_ne!(ProductCode::new("0123").unwrap(), ProductCode::new("123").unwrap());
    }

    #[test]
    fn branch_id_rejects_blank() {
        assert!(BranchId::new("").is_err());
        assert_eq!(BranchId::new("01").unwrap().to_string(), "01");
    }
}
