//! # commission-api: HTTP Service for the Commission Stack
//!
//! Serves commission reports computed from cached sales, imports periods
//! from the upstream sales source, and maintains sellers, rate rules and
//! manual adjustments.
//!
//! ## API Surface
//!
//! | Prefix | Module | Domain |
//! |--------|--------|--------|
//! | `/v1/reports*`, `/v1/periods` | [`routes::reports`] | Reports |
//! | `/v1/imports` | [`routes::imports`] | Period import |
//! | `/v1/sellers*` | [`routes::sellers`] | Sellers |
//! | `/v1/rules/*` | [`routes::rules`] | Rate tables |
//! | `/v1/adjustments/*` | [`routes::adjustments`] | Adjustments |
//!
//! ## Persistence
//!
//! With `DATABASE_URL` set, every write goes to PostgreSQL first and then to
//! the in-memory [`commission_engine::Ledger`]; the ledger is hydrated from
//! the database at startup. Without it the service runs in-memory only.

pub mod db;
pub mod error;
pub mod extractors;
pub mod import;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::reports::router())
        .merge(routes::imports::router())
        .merge(routes::sellers::router())
        .merge(routes::rules::router())
        .merge(routes::adjustments::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
