//! Retry with exponential backoff for upstream HTTP calls.
//!
//! Only transport errors (connection failures, timeouts) are retried. A
//! response with any status is returned to the caller as-is.

use std::time::Duration;

/// Retry attempts after the initial request.
const MAX_RETRIES: u32 = 2;

/// First backoff delay; doubles each attempt.
const BASE_DELAY_MS: u64 = 250;

/// Send a request, retrying transport failures with backoff.
pub(crate) async fn retry_send<F, Fut>(f: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "upstream request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    f().await
}
