use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed-delay retry: up to `attempts` tries with `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// One retry after one second, as used for outbound delivery.
    pub const DELIVERY: RetryPolicy = RetryPolicy {
        attempts: 2,
        delay: Duration::from_secs(1),
    };

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Run `op` under `policy`. The error of the last attempt is returned; earlier
/// errors are only logged.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!(
                    error = %format_args!("{err:#}"),
                    attempt,
                    delay_ms = policy.delay.as_millis() as u64,
                    "attempt failed; retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
