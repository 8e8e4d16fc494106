//! # commission-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment:
//! `PORT`, `DATABASE_URL`, `UPSTREAM_SALES_URL`, `UPSTREAM_API_TOKEN`,
//! `UPSTREAM_TIMEOUT_SECS` and `RUST_LOG`.

use commission_api::state::{AppConfig, AppState};
use commission_upstream::{UpstreamClient, UpstreamConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let port = config.port;

    // Absent DATABASE_URL means in-memory only.
    let db_pool = commission_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let upstream = match UpstreamConfig::from_env() {
        Ok(upstream_config) => {
            tracing::info!(base_url = %upstream_config.base_url, "Upstream sales source configured");
            match UpstreamClient::new(upstream_config) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::error!("Failed to create upstream client: {e}");
                    return Err(e.into());
                }
            }
        }
        Err(e) => {
            tracing::warn!(
                "Upstream sales source not configured: {e}. Imports will return 503; \
                 reports over cached periods keep working."
            );
            None
        }
    };

    let state = AppState::with_config(config, upstream, db_pool);

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = commission_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Commission API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
