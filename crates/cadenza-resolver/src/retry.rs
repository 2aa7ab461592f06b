//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use cadenza_core::ProviderError;
use tracing::{debug, warn};

/// Retry policy for a single (quality, provider) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

/// Outcome of a retried call and the number of calls it took.
#[derive(Debug)]
pub struct Retried<T> {
    pub result: Result<T, ProviderError>,
    pub tries: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(400);

    /// `max_attempts` is clamped to at least one call.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Sleep after the failed call at `attempt_index` (zero-based): `base * 2^index`.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt_index);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. There is no sleep after the last attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Retried<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            match op().await {
                Ok(value) => {
                    return Retried {
                        result: Ok(value),
                        tries,
                    }
                }
                Err(err) if !err.is_retryable() || tries >= self.max_attempts => {
                    return Retried {
                        result: Err(err),
                        tries,
                    }
                }
                Err(err) => {
                    let delay = self.delay_for(tries - 1);
                    warn!(
                        "{label}: attempt {tries}/{} failed: {err}; retrying in {delay:?}",
                        self.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    debug!("{label}: retry attempt {}", tries + 1);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
    }
}
