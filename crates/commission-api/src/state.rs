//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! - **Ledger**: the in-memory working set (sellers, rules, cached sales,
//!   adjustments). Cheap to clone; clones share state.
//! - **Database pool**: durable copy. `None` means in-memory only mode.
//! - **Upstream client**: the sales source used by imports. `None` makes the
//!   import endpoint answer 503; reports over cached data keep working.
//! - **Seller write lock**: held by an import from its prepare step through
//!   its commit, and by seller flag updates, so those writers never
//!   interleave in the database or the ledger.

use std::sync::Arc;

use commission_engine::Ledger;
use commission_upstream::UpstreamClient;
use sqlx::PgPool;
use tokio::sync::Mutex;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    /// Read `PORT` from the environment, defaulting to 8080.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        Self { port }
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub db_pool: Option<PgPool>,
    pub upstream: Option<UpstreamClient>,
    pub config: AppConfig,
    pub seller_writes: Arc<Mutex<()>>,
}

impl AppState {
    /// In-memory state with no upstream and default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None, None)
    }

    /// State with the given configuration, upstream client and pool.
    pub fn with_config(
        config: AppConfig,
        upstream: Option<UpstreamClient>,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            ledger: Ledger::new(),
            db_pool,
            upstream,
            config,
            seller_writes: Arc::new(Mutex::new(())),
        }
    }

    /// Load every table from the database into the ledger.
    ///
    /// A no-op in in-memory only mode. On failure the ledger is unchanged.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };

        let export = crate::db::load_export(pool)
            .await
            .map_err(|e| format!("failed to load ledger tables: {e}"))?;

        let sellers = export.sellers.len();
        let product_rules = export.product_rules.len();
        let sales_rows = export.sales.len();
        let adjustments = export.financial_adjustments.len() + export.revenue_adjustments.len();

        self.ledger
            .restore(export)
            .map_err(|e| format!("stored rules are inconsistent: {e}"))?;

        tracing::info!(
            sellers,
            product_rules,
            sales_rows,
            adjustments,
            periods = self.ledger.available_periods().len(),
            "Hydrated ledger from database"
        );
        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
