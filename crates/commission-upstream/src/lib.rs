//! # commission-upstream: Upstream Sales Source
//!
//! The engine never talks to the sales system directly. Imports go through
//! the [`SalesSource`] interface; [`UpstreamClient`] is its HTTP
//! implementation:
//!
//! ```text
//! GET {UPSTREAM_SALES_URL}/api/v1/sales?month=M&year=Y
//! Authorization: Bearer {UPSTREAM_API_TOKEN}
//! ```
//!
//! The response is a JSON array of [`UpstreamSalesRow`]. Transport failures
//! are retried with backoff; non-2xx responses and undecodable bodies are
//! returned as [`UpstreamError`]. [`fetch_line_items`] converts a fetched
//! batch into engine line-items, failing the whole batch on the first
//! invalid row.

pub mod client;
pub mod config;
pub mod error;
pub(crate) mod retry;
pub mod rows;

pub use client::UpstreamClient;
pub use config::{ConfigError, UpstreamConfig};
pub use error::UpstreamError;
pub use rows::{into_line_items, UpstreamSalesRow};

use std::future::Future;

use commission_core::Period;
use commission_engine::SalesLineItem;

/// Bulk fetch of one period's sales rows.
pub trait SalesSource: Send + Sync {
    /// Fetch every row of `period`.
    fn fetch(
        &self,
        period: Period,
    ) -> impl Future<Output = Result<Vec<UpstreamSalesRow>, UpstreamError>> + Send;
}

/// Fetch a period and convert it into line-items.
pub async fn fetch_line_items<S: SalesSource>(
    source: &S,
    period: Period,
) -> Result<Vec<SalesLineItem>, UpstreamError> {
    let rows = source.fetch(period).await?;
    into_line_items(rows, period)
}
