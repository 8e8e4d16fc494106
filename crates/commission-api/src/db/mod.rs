//! # Database Persistence Layer
//!
//! PostgreSQL persistence via SQLx. The in-memory [`Ledger`] is the working
//! set; the database is the durable copy. Handlers write here first and only
//! then mutate the ledger, so a failed write never leaves memory ahead of
//! the database. On startup [`load_export`] reads every table back.
//!
//! ## Tables
//!
//! | Table | Module |
//! |-------|--------|
//! | `sellers` | [`sellers`] |
//! | `default_rates`, `product_rules`, `special_products` | [`rules`] |
//! | `sales_cache` | [`sales`] |
//! | `financial_adjustments`, `revenue_adjustments` | [`adjustments`] |
//!
//! When `DATABASE_URL` is not set the API runs in-memory only.
//!
//! [`Ledger`]: commission_engine::Ledger

pub mod adjustments;
pub mod rules;
pub mod sales;
pub mod sellers;

use commission_core::Period;
use commission_engine::LedgerExport;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory only mode).
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only mode. \
                 Imports, rules and adjustments will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Read every table into the ledger's flat form.
pub async fn load_export(pool: &PgPool) -> Result<LedgerExport, sqlx::Error> {
    Ok(LedgerExport {
        sellers: sellers::load_all(pool).await?,
        default_rates: rules::load_default_rates(pool).await?,
        product_rules: rules::load_product_rules(pool).await?,
        special_products: rules::load_special_products(pool).await?,
        sales: sales::load_all(pool).await?,
        financial_adjustments: adjustments::load_financial(pool).await?,
        revenue_adjustments: adjustments::load_revenue(pool).await?,
    })
}

/// Whether an error is a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Wrap a stored value that no longer passes domain validation.
pub(crate) fn decode_error<E>(err: E) -> sqlx::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    sqlx::Error::Decode(err.into())
}

/// Rebuild a period from its `month`/`year` columns.
pub(crate) fn period_from_columns(month: i32, year: i32) -> Result<Period, sqlx::Error> {
    let month = u32::try_from(month).map_err(decode_error)?;
    Period::new(month, year).map_err(decode_error)
}

/// Split a period into its `month`/`year` column values.
pub(crate) fn period_columns(period: Period) -> (i32, i32) {
    // Months are 1..=12, so the cast cannot truncate.
    (period.month() as i32, period.year())
}
