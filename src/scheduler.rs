//! Periodic rate refresh, independent of chat traffic
//!
//! Failures are only logged: nobody is waiting on a scheduled refresh, and
//! user requests do their own stale fallback.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cache::RateCache;

/// Refresh immediately, then every `interval`, until `shutdown` flips
pub async fn run_refresh_loop(
    cache: Arc<RateCache>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = interval.as_secs(), "⏱️ Periodic rate refresh started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        match cache.refresh().await {
            Some(price) => info!(price, "Scheduled refresh stored new rate"),
            None => warn!("Scheduled refresh failed, keeping previous snapshot"),
        }
    }

    info!("Periodic rate refresh stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{FetchError, RateFetcher, RateSource, RetryPolicy};
    use crate::persistence::PriceStore;
    use crate::types::DEFAULT_STALENESS_WINDOW;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use temp_dir::TempDir;

    /// Fails every other attempt
    struct FlakySource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateSource for FlakySource {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn sample(&self) -> Result<Vec<f64>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 0 {
                Err(FetchError::NoSamples)
            } else {
                Ok(vec![1500.0 + call as f64])
            }
        }
    }

    #[tokio::test]
    async fn test_loop_survives_failures_and_stops_on_shutdown() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let dir = TempDir::new().unwrap();
        let store = PriceStore::new(dir.path().join("price_data.json"));
        let fetcher = RateFetcher::new(source.clone(), RetryPolicy::immediate(1));
        let cache = Arc::new(RateCache::new(
            store.clone(),
            fetcher,
            DEFAULT_STALENESS_WINDOW,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_refresh_loop(
            cache,
            Duration::from_millis(20),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresh loop did not stop")
            .unwrap();

        assert!(source.calls.load(Ordering::SeqCst) >= 3);
        assert!(store.load().await.is_some());
    }
}
