//! Retry loop: run an async operation until success or policy says stop.

use std::future::Future;

use super::classify::Classify;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `operation` until it succeeds or the retry policy says to stop.
///
/// Attempts are strictly sequential. On a retryable failure the `on_retry`
/// observer runs, then the task sleeps for the backoff duration. The last
/// observed error is returned unchanged.
pub async fn execute_with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + std::error::Error,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => match policy.decide(attempt, e.kind()) {
                RetryDecision::NoRetry => {
                    tracing::debug!(attempt, kind = ?e.kind(), "giving up: {}", e);
                    return Err(e);
                }
                RetryDecision::RetryAfter(delay) => {
                    if let Some(on_retry) = &policy.on_retry {
                        on_retry(attempt, &e);
                    }
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            },
        }
    }
}
