//! Adjustment persistence: `financial_adjustments` and
//! `revenue_adjustments`, both keyed by (seller_id, year, month).
//!
//! Writes are `INSERT ... ON CONFLICT DO UPDATE`, so saving the same key
//! twice replaces the row instead of raising a duplicate-key error.

use chrono::{DateTime, Utc};
use commission_core::{Period, Rate, SellerId};
use commission_engine::{FinancialAdjustment, RevenueAdjustment};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{decode_error, period_columns, period_from_columns};

/// Load every financial adjustment.
pub async fn load_financial(pool: &PgPool) -> Result<Vec<FinancialAdjustment>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FinancialRow>(
        "SELECT seller_id, month, year, return_value, open_invoice_value,
         prior_surcharge_value, updated_at
         FROM financial_adjustments ORDER BY year, month, seller_id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(FinancialRow::into_record).collect()
}

/// Insert or replace a financial adjustment.
pub async fn upsert_financial(pool: &PgPool, adj: &FinancialAdjustment) -> Result<(), sqlx::Error> {
    let (month, year) = period_columns(adj.period);
    sqlx::query(
        "INSERT INTO financial_adjustments (seller_id, month, year, return_value,
         open_invoice_value, prior_surcharge_value, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (seller_id, year, month) DO UPDATE
         SET return_value = EXCLUDED.return_value,
             open_invoice_value = EXCLUDED.open_invoice_value,
             prior_surcharge_value = EXCLUDED.prior_surcharge_value,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(adj.seller_id.get())
    .bind(month)
    .bind(year)
    .bind(adj.return_value)
    .bind(adj.open_invoice_value)
    .bind(adj.prior_surcharge_value)
    .bind(adj.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a financial adjustment. Returns `false` if none existed.
pub async fn delete_financial(
    pool: &PgPool,
    seller_id: SellerId,
    period: Period,
) -> Result<bool, sqlx::Error> {
    delete(pool, "financial_adjustments", seller_id, period).await
}

/// Load every revenue adjustment.
pub async fn load_revenue(pool: &PgPool) -> Result<Vec<RevenueAdjustment>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RevenueRow>(
        "SELECT seller_id, month, year, amount, rate, reason, updated_at
         FROM revenue_adjustments ORDER BY year, month, seller_id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RevenueRow::into_record).collect()
}

/// Insert or replace a revenue adjustment.
pub async fn upsert_revenue(pool: &PgPool, adj: &RevenueAdjustment) -> Result<(), sqlx::Error> {
    let (month, year) = period_columns(adj.period);
    sqlx::query(
        "INSERT INTO revenue_adjustments (seller_id, month, year, amount, rate, reason, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (seller_id, year, month) DO UPDATE
         SET amount = EXCLUDED.amount,
             rate = EXCLUDED.rate,
             reason = EXCLUDED.reason,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(adj.seller_id.get())
    .bind(month)
    .bind(year)
    .bind(adj.amount)
    .bind(adj.rate.value())
    .bind(&adj.reason)
    .bind(adj.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a revenue adjustment. Returns `false` if none existed.
pub async fn delete_revenue(
    pool: &PgPool,
    seller_id: SellerId,
    period: Period,
) -> Result<bool, sqlx::Error> {
    delete(pool, "revenue_adjustments", seller_id, period).await
}

async fn delete(
    pool: &PgPool,
    table: &'static str,
    seller_id: SellerId,
    period: Period,
) -> Result<bool, sqlx::Error> {
    let (month, year) = period_columns(period);
    let sql = format!("DELETE FROM {table} WHERE seller_id = $1 AND month = $2 AND year = $3");
    let result = sqlx::query(&sql)
        .bind(seller_id.get())
        .bind(month)
        .bind(year)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct FinancialRow {
    seller_id: i64,
    month: i32,
    year: i32,
    return_value: Decimal,
    open_invoice_value: Decimal,
    prior_surcharge_value: Decimal,
    updated_at: DateTime<Utc>,
}

impl FinancialRow {
    fn into_record(self) -> Result<FinancialAdjustment, sqlx::Error> {
        Ok(FinancialAdjustment {
            seller_id: SellerId::new(self.seller_id).map_err(decode_error)?,
            period: period_from_columns(self.month, self.year)?,
            return_value: self.return_value,
            open_invoice_value: self.open_invoice_value,
            prior_surcharge_value: self.prior_surcharge_value,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RevenueRow {
    seller_id: i64,
    month: i32,
    year: i32,
    amount: Decimal,
    rate: Decimal,
    reason: Option<String>,
    updated_at: DateTime<Utc>,
}

impl RevenueRow {
    fn into_record(self) -> Result<RevenueAdjustment, sqlx::Error> {
        Ok(RevenueAdjustment {
            seller_id: SellerId::new(self.seller_id).map_err(decode_error)?,
            period: period_from_columns(self.month, self.year)?,
            amount: self.amount,
            rate: Rate::new(self.rate).map_err(decode_error)?,
            reason: self.reason,
            updated_at: self.updated_at,
        })
    }
}
