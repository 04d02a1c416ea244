//! Rate Cache - Serves the stored rate, refreshing it once it goes stale
//!
//! A refresh failure never turns into "no data" while any snapshot exists:
//! the last stored rate is served instead, however old.
//!
//! Refreshes are single-flight. Callers that arrive while a refresh is in
//! progress wait for it and reuse its outcome instead of starting their own
//! browser session.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::oracle::RateFetcher;
use crate::persistence::PriceStore;
use crate::types::PriceSnapshot;

/// Bookkeeping guarded by the single-flight lock
#[derive(Debug, Default)]
struct RefreshState {
    last_completed: Option<Instant>,
    /// Outcome of the last completed refresh, `None` if it failed
    last_result: Option<PriceSnapshot>,
}

impl RefreshState {
    /// Whether a refresh finished after `since`
    fn completed_since(&self, since: Instant) -> bool {
        self.last_completed.is_some_and(|t| t >= since)
    }
}

pub struct RateCache {
    store: PriceStore,
    fetcher: RateFetcher,
    staleness_window: Duration,
    refresh: Mutex<RefreshState>,
}

impl RateCache {
    pub fn new(store: PriceStore, fetcher: RateFetcher, staleness_window: Duration) -> Self {
        Self {
            store,
            fetcher,
            staleness_window,
            refresh: Mutex::new(RefreshState::default()),
        }
    }

    pub fn staleness_window(&self) -> Duration {
        self.staleness_window
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    /// The stored snapshot, whatever its age
    pub async fn cached(&self) -> Option<PriceSnapshot> {
        self.store.load().await
    }

    /// Current rate for a user request.
    ///
    /// Fresh snapshot: served as is. Missing or stale: refreshed, falling back
    /// to the stale value when the refresh fails. `None` only if nothing has
    /// ever been cached and the refresh failed too.
    pub async fn get_current_price(&self) -> Option<f64> {
        let requested_at = Instant::now();

        if let Some(snapshot) = self.fresh_snapshot().await {
            debug!(price = snapshot.price, "Serving cached rate");
            return Some(snapshot.price);
        }

        let mut state = self.refresh.lock().await;

        // Someone else may have refreshed while we waited for the lock
        let shared = state.completed_since(requested_at);
        if let Some(snapshot) = state.last_result.filter(|s| shared && self.is_fresh(s)) {
            debug!(price = snapshot.price, "Serving rate from the shared refresh");
            return Some(snapshot.price);
        }

        let previous = self.store.load().await;
        if let Some(snapshot) = previous.filter(|s| self.is_fresh(s)) {
            debug!(price = snapshot.price, "Serving rate refreshed by a concurrent request");
            return Some(snapshot.price);
        }

        let fetched = if shared {
            // That refresh failed
            None
        } else {
            self.refresh_locked(&mut state).await
        };

        match (fetched, previous) {
            (Some(snapshot), _) => Some(snapshot.price),
            (None, Some(stale)) => {
                warn!(
                    price = stale.price,
                    age_secs = stale.age(Utc::now()).as_secs(),
                    "Refresh failed, serving stale rate"
                );
                Some(stale.price)
            }
            (None, None) => {
                error!("No rate available: refresh failed and nothing is cached");
                None
            }
        }
    }

    /// Unconditional refresh for the periodic trigger.
    ///
    /// Returns the new rate, or `None` when the fetch failed. The stored
    /// snapshot is left untouched on failure.
    pub async fn refresh(&self) -> Option<f64> {
        let mut state = self.refresh.lock().await;
        self.refresh_locked(&mut state)
            .await
            .map(|snapshot| snapshot.price)
    }

    /// Fetch, persist and record the outcome for callers waiting on the lock
    async fn refresh_locked(&self, state: &mut RefreshState) -> Option<PriceSnapshot> {
        let fetched = self.fetch_and_store().await;
        state.last_completed = Some(Instant::now());
        state.last_result = fetched;
        fetched
    }

    async fn fresh_snapshot(&self) -> Option<PriceSnapshot> {
        self.store.load().await.filter(|s| self.is_fresh(s))
    }

    fn is_fresh(&self, snapshot: &PriceSnapshot) -> bool {
        snapshot.is_fresh(Utc::now(), self.staleness_window)
    }

    async fn fetch_and_store(&self) -> Option<PriceSnapshot> {
        let price = self.fetcher.fetch().await?;

        let snapshot = PriceSnapshot::new(price);
        match self.store.save(&snapshot).await {
            Ok(()) => info!(price, "Rate snapshot updated"),
            Err(e) => warn!(
                price,
                path = %self.store.path().display(),
                error = %e,
                "Failed to persist rate snapshot"
            ),
        }
        Some(snapshot)
    }
}
