//! Upstream client error types.

use crate::config::ConfigError;

/// Errors from fetching sales from the upstream.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The upstream returned a non-2xx status.
    #[error("upstream {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// A decoded row could not be turned into a line-item.
    #[error("invalid upstream row {index}: {reason}")]
    InvalidRow { index: usize, reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
