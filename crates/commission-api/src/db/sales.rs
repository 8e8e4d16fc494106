//! Sales cache persistence on the `sales_cache` table.

use commission_core::{BranchId, ProductCode, SellerId};
use commission_engine::{PreparedImport, SalesLineItem};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{decode_error, period_columns, period_from_columns};

/// Rows per multi-row INSERT. Eleven binds each keeps a statement well
/// under the PostgreSQL limit of 65535 parameters.
const INSERT_CHUNK: usize = 1_000;

/// Load every cached row of every period.
pub async fn load_all(pool: &PgPool) -> Result<Vec<SalesLineItem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SalesRow>(
        "SELECT month, year, seller_id, seller_name, product_code, product_desc,
         branch_id, revenue, return_value, open_invoice_value, prior_surcharge_value
         FROM sales_cache ORDER BY year, month, id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SalesRow::into_record).collect()
}

/// Replace one period's rows and the seller table in a single transaction.
///
/// Either everything is written or nothing is.
pub async fn replace_period(pool: &PgPool, prepared: &PreparedImport) -> Result<(), sqlx::Error> {
    let (month, year) = period_columns(prepared.period());
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM sales_cache WHERE month = $1 AND year = $2")
        .bind(month)
        .bind(year)
        .execute(&mut *tx)
        .await?;

    for chunk in prepared.rows().chunks(INSERT_CHUNK) {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "INSERT INTO sales_cache (month, year, seller_id, seller_name, product_code,
             product_desc, branch_id, revenue, return_value, open_invoice_value,
             prior_surcharge_value) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(month)
                .push_bind(year)
                .push_bind(row.seller_id.get())
                .push_bind(&row.seller_name)
                .push_bind(row.product_code.as_str())
                .push_bind(&row.product_desc)
                .push_bind(row.branch_id.as_str())
                .push_bind(row.revenue)
                .push_bind(row.return_value)
                .push_bind(row.open_invoice_value)
                .push_bind(row.prior_surcharge_value);
        });
        builder.build().execute(&mut *tx).await?;
    }

    super::sellers::replace_all(&mut *tx, prepared.sellers()).await?;

    tx.commit().await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct SalesRow {
    month: i32,
    year: i32,
    seller_id: i64,
    seller_name: String,
    product_code: String,
    product_desc: String,
    branch_id: String,
    revenue: Decimal,
    return_value: Decimal,
    open_invoice_value: Decimal,
    prior_surcharge_value: Decimal,
}

impl SalesRow {
    fn into_record(self) -> Result<SalesLineItem, sqlx::Error> {
        Ok(SalesLineItem {
            period: period_from_columns(self.month, self.year)?,
            seller_id: SellerId::new(self.seller_id).map_err(decode_error)?,
            seller_name: self.seller_name,
            product_code: ProductCode::new(self.product_code).map_err(decode_error)?,
            product_desc: self.product_desc,
            branch_id: BranchId::new(self.branch_id).map_err(decode_error)?,
            revenue: self.revenue,
            return_value: self.return_value,
            open_invoice_value: self.open_invoice_value,
            prior_surcharge_value: self.prior_surcharge_value,
        })
    }
}
