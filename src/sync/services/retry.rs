//! Bounded retry for rate-limited provider calls.

use crate::sync::ports::ProviderResult;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Number of extra attempts granted to a rate-limited call.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 1;

/// Retries a provider call after a fixed delay when it is rate limited.
///
/// Only [`ProviderError::RateLimited`](crate::sync::ports::ProviderError)
/// is retried, and only [`MAX_RATE_LIMIT_RETRIES`] times; every other error
/// is returned on first sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates the standard policy with the given delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            max_retries: MAX_RATE_LIMIT_RETRIES,
            delay,
        }
    }

    /// Returns the number of extra attempts granted.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the fixed delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `call`, retrying rate-limited failures within the budget.
    ///
    /// # Errors
    ///
    /// Returns the last error when the call fails with a non-retryable error
    /// or keeps being rate limited after the budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Err(err) if err.is_rate_limited() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
