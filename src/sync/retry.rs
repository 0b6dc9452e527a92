//! Bounded retry with backoff for a single fallible unit of work.
//!
//! The policy retries unconditionally up to its attempt budget. Callers that
//! must not retry a given error kind (a 404 on delete, a permanent 4xx) decide
//! inside the operation and hand back a successful value instead.

use crate::config::RetryConfig;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

type BackoffFn = dyn Fn(u32) -> Duration + Send + Sync;

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Arc<BackoffFn>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// `backoff(n)` is the pause after failed attempt `n` (1-based).
    pub fn new<F>(max_attempts: u32, backoff: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Arc::new(backoff),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, |_| Duration::ZERO)
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, move |_| delay)
    }

    /// Doubling delay starting at `base`, capped at `max`.
    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self::new(max_attempts, move |attempt| {
            let shift = attempt.saturating_sub(1).min(16);
            base.saturating_mul(1u32 << shift).min(max)
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::exponential(config.max_attempts, config.base_delay(), config.max_delay())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent.
///
/// On exhaustion the last error is returned as-is so callers can still match
/// on its kind.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.max_attempts => {
                if policy.max_attempts > 1 {
                    tracing::warn!("Giving up after {} attempts: {}", attempt, err);
                }
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                tracing::debug!(
                    "Attempt {}/{} failed: {} (retrying in {:?})",
                    attempt,
                    policy.max_attempts,
                    err,
                    delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
