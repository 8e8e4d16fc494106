//! Seller persistence operations on the `sellers` table.
//!
//! The table is rewritten wholesale by every import (see
//! [`crate::db::sales::replace_period`]); operators only update flags.

use commission_core::SellerId;
use commission_engine::{Seller, SellerCategory};
use sqlx::{PgConnection, PgPool};

use super::decode_error;

/// Load every seller.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Seller>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SellerRow>(
        "SELECT id, name, category, is_cooperative, exclude_from_report
         FROM sellers ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SellerRow::into_record).collect()
}

/// Persist the operator-maintained fields of one seller.
///
/// Returns `false` if the seller row does not exist.
pub async fn update_flags(pool: &PgPool, seller: &Seller) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sellers SET category = $2, is_cooperative = $3, exclude_from_report = $4
         WHERE id = $1",
    )
    .bind(seller.id.get())
    .bind(seller.category.as_str())
    .bind(seller.is_cooperative)
    .bind(seller.exclude_from_report)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the whole table with `sellers`. Runs on the caller's transaction.
pub async fn replace_all(conn: &mut PgConnection, sellers: &[Seller]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sellers").execute(&mut *conn).await?;

    if sellers.is_empty() {
        return Ok(());
    }
    let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
        "INSERT INTO sellers (id, name, category, is_cooperative, exclude_from_report) ",
    );
    builder.push_values(sellers, |mut b, seller| {
        b.push_bind(seller.id.get())
            .push_bind(&seller.name)
            .push_bind(seller.category.as_str())
            .push_bind(seller.is_cooperative)
            .push_bind(seller.exclude_from_report);
    });
    builder.build().execute(&mut *conn).await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct SellerRow {
    id: i64,
    name: String,
    category: String,
    is_cooperative: bool,
    exclude_from_report: bool,
}

impl SellerRow {
    fn into_record(self) -> Result<Seller, sqlx::Error> {
        Ok(Seller {
            id: SellerId::new(self.id).map_err(decode_error)?,
            name: self.name,
            category: self.category.parse::<SellerCategory>().map_err(decode_error)?,
            is_cooperative: self.is_cooperative,
            exclude_from_report: self.exclude_from_report,
        })
    }
}
