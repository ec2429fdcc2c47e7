//! Bounded retry for backend round trips.

use crate::error::Result;
use lattice_core::RetryPolicy;
use std::future::Future;

/// Run `operation` under a [`RetryPolicy`] with exponential backoff.
///
/// Only errors whose [`is_retryable`](crate::error::LlmError::is_retryable)
/// holds are retried. `max_retries` counts retries, not calls, so the
/// operation runs at most `max_retries + 1` times; once the budget is spent
/// the last error is returned.
pub(crate) async fn with_retries<T, F, Fut>(max_retries: u32, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let policy = RetryPolicy::new(max_retries as usize);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && policy.should_retry(attempt) => {
                let delay = policy.calculate_delay(attempt);
                tracing::warn!(
                    error = %err,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying backend request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
