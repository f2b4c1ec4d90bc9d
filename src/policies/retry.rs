//! # Bounded fixed-delay retry.
//!
//! [`RetryPolicy`] runs an async operation up to `max_attempts` times,
//! sleeping `delay` between attempts. Only errors whose
//! [`is_retryable`](crate::PlatformError::is_retryable) returns `true`
//! (registration/resolution conflicts) are retried; any other error is
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::error::PlatformError;

/// Fixed-count, fixed-delay retry policy for platform calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1, clamped).
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt bound and delay.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt bound is exhausted. Returns the last error on exhaustion.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, PlatformError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PlatformError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::debug!(
                        error = e.as_label(),
                        attempt,
                        max = self.max_attempts,
                        "retryable failure, sleeping before next attempt"
                    );
                    time::sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
