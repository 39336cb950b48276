//! Exponential backoff for transient store failures.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy applied to individual store operations.
///
/// A failure that survives every attempt is returned to the caller as a
/// degraded signal; callers log it and carry on rather than crash.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (zero-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let millis = (self.initial_backoff.as_millis() as f64
            * self.multiplier.powi(attempt as i32))
        .min(self.max_backoff.as_millis() as f64) as u64;
        Duration::from_millis(millis)
    }

    /// Runs `operation` until it succeeds or attempts are exhausted.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "store operation recovered");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        warn!(
                            attempts = attempt,
                            error = %err,
                            "store operation failed after retries"
                        );
                        return Err(err);
                    }
                    let backoff = self.backoff(attempt - 1);
                    warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "store operation failed, retrying"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}
