//! Backoff for requests that fail with transient network errors.

use std::future::Future;
use std::time::Duration;

use super::transport::{ClientError, ClientResult};

/// Delays before each retry.
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Runs `operation`, retrying transient failures (200ms, 500ms, 1000ms).
///
/// Non-transient errors are returned immediately.
pub(crate) async fn with_retry<T, F, Fut>(label: &str, mut operation: F) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let mut result = operation().await;

    for (attempt, &delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match &result {
            Err(e) if e.is_transient() => {
                log::info!(
                    "[Retry] {} transient error ({}), attempt {}/{} in {}ms",
                    label,
                    e,
                    attempt + 2,
                    RETRY_DELAYS_MS.len() + 1,
                    delay_ms
                );
            }
            _ => return result,
        }
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        result = operation().await;
    }

    if let Err(ClientError::Http(e)) = &result {
        log::warn!("[Retry] {} giving up: {}", label, e);
    }
    result
}
