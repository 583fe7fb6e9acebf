//! Fixed-interval polling for eventually-consistent remote state

use std::future::Future;
use std::time::Duration;

/// Poll `probe` until it yields a value or `max_attempts` run out
///
/// **Algorithm:**
/// 1. Sleep `interval`
/// 2. Run `probe`
/// 3. `Some(value)` → return it; `None` → log and go again
/// 4. After `max_attempts` probes return `None`
///
/// Transient probe failures are the probe's to swallow: it reports them
/// as `None`.
pub async fn poll_until<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    interval: Duration,
    mut probe: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=max_attempts {
        tokio::time::sleep(interval).await;

        if let Some(value) = probe().await {
            if attempt > 1 {
                tracing::debug!(operation = operation_name, attempt, "Poll succeeded");
            }
            return Some(value);
        }

        tracing::debug!(
            operation = operation_name,
            attempt,
            max_attempts,
            "Not ready, polling again"
        );
    }

    tracing::warn!(
        operation = operation_name,
        max_attempts,
        "Gave up polling"
    );
    None
}
