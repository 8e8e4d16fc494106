//! Upstream sales source configuration.
//!
//! Read from the environment at startup. There is no default base URL: a
//! deployment without an upstream can still serve reports from its cache.

use url::Url;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the upstream sales source.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Base URL of the sales service. Requests go to
    /// `{base_url}/api/v1/sales`.
    pub base_url: Url,
    /// Bearer token for API authentication.
    pub api_token: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl UpstreamConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `UPSTREAM_SALES_URL` (required)
    /// - `UPSTREAM_API_TOKEN` (required)
    /// - `UPSTREAM_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = std::env::var("UPSTREAM_SALES_URL").map_err(|_| ConfigError::MissingUrl)?;
        let api_token =
            std::env::var("UPSTREAM_API_TOKEN").map_err(|_| ConfigError::MissingToken)?;

        Ok(Self {
            base_url: parse_base_url(&raw_url)?,
            api_token,
            timeout_secs: std::env::var("UPSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    pub fn local_mock(uri: &str, token: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(uri)?,
            api_token: token.to_string(),
            timeout_secs: 5,
        })
    }
}

/// Parse an http(s) base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(raw.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(
            raw.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("UPSTREAM_SALES_URL environment variable is required")]
    MissingUrl,
    #[error("UPSTREAM_API_TOKEN environment variable is required")]
    MissingToken,
    #[error("invalid upstream URL {0}: {1}")]
    InvalidUrl(String, String),
}
