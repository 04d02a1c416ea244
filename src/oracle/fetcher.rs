//! Rate Fetcher - Retry policy around a rate source

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{mean, spread, FetchError, RateSource};
use crate::types::PriceSnapshot;

/// Fixed-attempt retry policy with linear backoff and random jitter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `backoff * n`
    pub backoff: Duration,
    /// Upper bound of the random delay added to each wait
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Retry without waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.backoff * attempt + jitter
    }
}

/// Fetches the current rate, retrying failed attempts.
///
/// Never persists anything; the cache owns the store.
pub struct RateFetcher {
    source: Arc<dyn RateSource>,
    policy: RetryPolicy,
}

impl RateFetcher {
    pub fn new(source: Arc<dyn RateSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Average rate from the first successful attempt, or `None` once every
    /// attempt has failed.
    pub async fn fetch(&self) -> Option<f64> {
        let source = self.source.name();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.attempt().await {
                Ok(price) => {
                    info!(source = %source, attempt, price, "✅ Fetched USD/NGN rate");
                    return Some(price);
                }
                Err(e) => {
                    warn!(
                        source = %source,
                        attempt,
                        max_attempts,
                        kind = e.kind(),
                        error = %e,
                        "Fetch attempt failed"
                    );
                }
            }

            if attempt < max_attempts {
                let delay = self.policy.delay_after(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        error!(source = %source, attempts = max_attempts, "All fetch attempts failed");
        None
    }

    async fn attempt(&self) -> Result<f64, FetchError> {
        let samples = self.source.sample().await?;
        let price = mean(&samples).ok_or(FetchError::NoSamples)?;
        if !PriceSnapshot::is_valid_price(price) {
            return Err(FetchError::InvalidPrice(price));
        }

        debug!(
            samples = samples.len(),
            spread = spread(&samples),
            price,
            "Averaged price samples"
        );
        Ok(price)
    }
}
