//! Rate-table persistence: `default_rates`, `product_rules` and
//! `special_products`.
//!
//! `product_rules.id` is assigned by the database (`BIGSERIAL`); the
//! in-memory rule book receives the id through [`insert_product_rule`].
//! Uniqueness of (scope, product) is enforced by an expression index on
//! `COALESCE(seller_id, 0)`.

use chrono::{DateTime, Utc};
use commission_core::{ProductCode, Rate, SellerId};
use commission_engine::{DefaultRate, ProductRule, RuleScope, SpecialProduct};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::decode_error;

// -- Default rates -----------------------------------------------------------

/// Load every default rate.
pub async fn load_default_rates(pool: &PgPool) -> Result<Vec<DefaultRate>, sqlx::Error> {
    let rows: Vec<(i64, Decimal)> =
        sqlx::query_as("SELECT seller_id, rate FROM default_rates ORDER BY seller_id")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(seller_id, rate)| {
            Ok(DefaultRate {
                seller_id: SellerId::new(seller_id).map_err(decode_error)?,
                rate: Rate::new(rate).map_err(decode_error)?,
            })
        })
        .collect()
}

/// Insert or replace a seller's default rate.
pub async fn upsert_default_rate(pool: &PgPool, rate: &DefaultRate) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO default_rates (seller_id, rate) VALUES ($1, $2)
         ON CONFLICT (seller_id) DO UPDATE SET rate = EXCLUDED.rate",
    )
    .bind(rate.seller_id.get())
    .bind(rate.rate.value())
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a seller's default rate. Returns `false` if none existed.
pub async fn delete_default_rate(pool: &PgPool, seller_id: SellerId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM default_rates WHERE seller_id = $1")
        .bind(seller_id.get())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// -- Product rules -----------------------------------------------------------

/// Load every product rule.
pub async fn load_product_rules(pool: &PgPool) -> Result<Vec<ProductRule>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProductRuleRow>(
        "SELECT id, seller_id, product_code, rate FROM product_rules ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ProductRuleRow::into_record).collect()
}

/// Insert a product rule and return it with its database-assigned id.
///
/// A duplicate (scope, product) surfaces as a unique violation; see
/// [`super::is_unique_violation`].
pub async fn insert_product_rule(
    pool: &PgPool,
    scope: RuleScope,
    product_code: &ProductCode,
    rate: Rate,
) -> Result<ProductRule, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO product_rules (seller_id, product_code, rate)
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(scope.seller_id().map(SellerId::get))
    .bind(product_code.as_str())
    .bind(rate.value())
    .fetch_one(pool)
    .await?;

    Ok(ProductRule {
        id,
        scope,
        product_code: product_code.clone(),
        rate,
    })
}

/// Change the rate of a product rule. Returns `false` if none existed.
pub async fn update_product_rule_rate(pool: &PgPool, id: i64, rate: Rate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE product_rules SET rate = $2 WHERE id = $1")
        .bind(id)
        .bind(rate.value())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a product rule by id. Returns `false` if none existed.
pub async fn delete_product_rule(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM product_rules WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct ProductRuleRow {
    id: i64,
    seller_id: Option<i64>,
    product_code: String,
    rate: Decimal,
}

impl ProductRuleRow {
    fn into_record(self) -> Result<ProductRule, sqlx::Error> {
        let seller_id = self
            .seller_id
            .map(SellerId::new)
            .transpose()
            .map_err(decode_error)?;
        Ok(ProductRule {
            id: self.id,
            scope: RuleScope::from_seller(seller_id),
            product_code: ProductCode::new(self.product_code).map_err(decode_error)?,
            rate: Rate::new(self.rate).map_err(decode_error)?,
        })
    }
}

// -- Special products --------------------------------------------------------

/// Load every special product.
pub async fn load_special_products(pool: &PgPool) -> Result<Vec<SpecialProduct>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SpecialProductRow>(
        "SELECT product_code, product_name, rate, registered_at
         FROM special_products ORDER BY product_code",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SpecialProductRow::into_record).collect()
}

/// Insert or replace a special product.
pub async fn upsert_special_product(
    pool: &PgPool,
    product: &SpecialProduct,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO special_products (product_code, product_name, rate, registered_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (product_code) DO UPDATE
         SET product_name = EXCLUDED.product_name,
             rate = EXCLUDED.rate,
             registered_at = EXCLUDED.registered_at",
    )
    .bind(product.product_code.as_str())
    .bind(&product.product_name)
    .bind(product.rate.value())
    .bind(product.registered_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a special product. Returns `false` if none existed.
pub async fn delete_special_product(
    pool: &PgPool,
    product_code: &ProductCode,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM special_products WHERE product_code = $1")
        .bind(product_code.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct SpecialProductRow {
    product_code: String,
    product_name: String,
    rate: Decimal,
    registered_at: DateTime<Utc>,
}

impl SpecialProductRow {
    fn into_record(self) -> Result<SpecialProduct, sqlx::Error> {
        Ok(SpecialProduct {
            product_code: ProductCode::new(self.product_code).map_err(decode_error)?,
            product_name: self.product_name,
            rate: Rate::new(self.rate).map_err(decode_error)?,
            registered_at: self.registered_at,
        })
    }
}
