//! Upstream sales rows and their conversion into cached line-items.
//!
//! The upstream is loosely typed: codes may arrive as numbers or strings and
//! monetary fields may be missing, `null` or non-numeric. Codes are
//! normalized to strings; unusable amounts count as zero. An amount beyond
//! [`commission_core::MAX_AMOUNT`] makes the row invalid.

use commission_core::{check_amount, parse_amount, BranchId, Period, ProductCode, SellerId};
use commission_engine::SalesLineItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::UpstreamError;

/// One row of `GET /api/v1/sales`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamSalesRow {
    pub seller_id: i64,
    #[serde(default)]
    pub seller_name: String,
    #[serde(deserialize_with = "code")]
    pub product_code: String,
    #[serde(default)]
    pub product_desc: String,
    #[serde(deserialize_with = "code")]
    pub branch_id: String,
    #[serde(default, deserialize_with = "amount")]
    pub revenue: Decimal,
    #[serde(default, deserialize_with = "amount")]
    pub return_value: Decimal,
    #[serde(default, deserialize_with = "amount")]
    pub open_invoice_value: Decimal,
    #[serde(default, deserialize_with = "amount")]
    pub prior_surcharge_value: Decimal,
}

impl UpstreamSalesRow {
    /// Validate and convert into a line-item of `period`.
    pub fn into_line_item(self, period: Period) -> Result<SalesLineItem, String> {
        let seller_id = SellerId::new(self.seller_id).map_err(|e| e.to_string())?;
        let product_code = ProductCode::new(self.product_code).map_err(|e| e.to_string())?;
        let branch_id = BranchId::new(self.branch_id).map_err(|e| e.to_string())?;
        let bounded = |field: &str, value: Decimal| check_amount(field, value).map_err(|e| e.to_string());
        Ok(SalesLineItem {
            period,
            seller_id,
            seller_name: self.seller_name.trim().to_string(),
            product_code,
            product_desc: self.product_desc.trim().to_string(),
            branch_id,
            revenue: bounded("revenue", self.revenue)?,
            return_value: bounded("return_value", self.return_value)?,
            open_invoice_value: bounded("open_invoice_value", self.open_invoice_value)?,
            prior_surcharge_value: bounded("prior_surcharge_value", self.prior_surcharge_value)?,
        })
    }
}

/// Convert a fetched batch. Any invalid row fails the whole batch.
pub fn into_line_items(
    rows: Vec<UpstreamSalesRow>,
    period: Period,
) -> Result<Vec<SalesLineItem>, UpstreamError> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            row.into_line_item(period)
                .map_err(|reason| UpstreamError::InvalidRow { index, reason })
        })
        .collect()
}

fn code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number code, got {other}"
        ))),
    }
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let raw = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s,
        _ => return Ok(Decimal::ZERO),
    };
    Ok(parse_amount(&raw).unwrap_or_else(|| {
        if !raw.trim().is_empty() {
            tracing::warn!(value = %raw, "unparseable upstream amount counted as zero");
        }
        Decimal::ZERO
    }))
}
