// Bounded exponential backoff for transient store failures

use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

use super::StoreError;
use crate::config::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Delays between attempts: one fewer than `max_attempts`, doubling from
    /// `base_delay` and capped at `max_delay`
    pub fn strategy(&self) -> impl Iterator<Item = Duration> + Send + 'static {
        // ExponentialBackoff yields factor * 2^n, so half the base gives base, 2*base, ...
        let half_base = (self.base_delay.as_millis() as u64 / 2).max(1);
        let with_jitter = self.jitter;
        ExponentialBackoff::from_millis(2)
            .factor(half_base)
            .max_delay(self.max_delay)
            .map(move |delay| if with_jitter { jitter(delay) } else { delay })
            .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// Only transient errors are retried.
    pub async fn run<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        RetryIf::spawn(self.strategy(), op, |err: &StoreError| {
            let transient = err.is_transient();
            if transient {
                warn!(operation = operation, error = %err, "Store operation failed, retrying");
            }
            transient
        })
        .await
    }
}
