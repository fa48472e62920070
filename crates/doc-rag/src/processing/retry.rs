//! Bounded retry with exponential backoff and per-attempt timeouts

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::error::{Error, Result};

/// Retry settings for calls that leave the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each one after
    pub base_delay: Duration,
    /// Budget for a single attempt
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, base_delay: Duration, call_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            call_timeout,
        }
    }

    /// Delay slept after the given 0-based failed attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. Each attempt is bounded by `call_timeout`.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            let outcome = match timeout(self.call_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    operation: operation_name.to_string(),
                    secs: self.call_timeout.as_secs(),
                }),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= self.max_attempts || !err.is_retryable() {
                return Err(err);
            }

            let delay = self.backoff(attempt - 1);
            tracing::warn!(
                "{} failed (attempt {}/{}): {}; retrying in {:?}",
                operation_name,
                attempt,
                self.max_attempts,
                err,
                delay
            );
            sleep(delay).await;
        }
    }
}
