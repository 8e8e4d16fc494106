//! Typed client for the upstream sales service.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/v1/sales?month=M&year=Y` | All sales rows of one period |

use std::time::Duration;

use commission_core::Period;
use url::Url;

use crate::config::{ConfigError, UpstreamConfig};
use crate::error::UpstreamError;
use crate::rows::UpstreamSalesRow;
use crate::SalesSource;

/// API path of the bulk sales endpoint, relative to the base URL.
const SALES_PATH: [&str; 3] = ["api", "v1", "sales"];

/// HTTP implementation of [`SalesSource`].
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    sales_url: Url,
}

impl UpstreamClient {
    /// Create a client from configuration.
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                        .map_err(|_| ConfigError::MissingToken)?,
                );
                headers
            })
            .build()
            .map_err(|e| UpstreamError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let mut sales_url = config.base_url.clone();
        sales_url
            .path_segments_mut()
            .map_err(|_| {
                ConfigError::InvalidUrl(config.base_url.to_string(), "cannot be a base".into())
            })?
            .pop_if_empty()
            .extend(SALES_PATH);

        Ok(Self { http, sales_url })
    }

    /// The resolved sales endpoint URL.
    pub fn sales_url(&self) -> &Url {
        &self.sales_url
    }

    /// Fetch every sales row of a period.
    pub async fn fetch_sales(&self, period: Period) -> Result<Vec<UpstreamSalesRow>, UpstreamError> {
        let endpoint = format!("GET /api/v1/sales?month={}&year={}", period.month(), period.year());
        let query = [
            ("month", period.month().to_string()),
            ("year", period.year().to_string()),
        ];

        let resp = crate::retry::retry_send(|| self.http.get(self.sales_url.clone()).query(&query).send())
            .await
            .map_err(|e| UpstreamError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(UpstreamError::Api {
                endpoint,
                status,
                body,
            });
        }

        let rows: Vec<UpstreamSalesRow> =
            resp.json()
                .await
                .map_err(|e| UpstreamError::Deserialization {
                    endpoint: endpoint.clone(),
                    source: e,
                })?;
        tracing::debug!(%endpoint, rows = rows.len(), "fetched upstream sales");
        Ok(rows)
    }
}

impl SalesSource for UpstreamClient {
    fn fetch(
        &self,
        period: Period,
    ) -> impl std::future::Future<Output = Result<Vec<UpstreamSalesRow>, UpstreamError>> + Send
    {
        self.fetch_sales(period)
    }
}
