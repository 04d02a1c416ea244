//! Core types used throughout the bot
//!
//! Defines the cached rate snapshot and its staleness rules.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default age after which a snapshot is refreshed before being served
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(60);

/// The single cached USD/NGN rate (NGN per 1 USD) and its capture time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSnapshot {
    pub price: f64,
    pub captured_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Snapshot captured now
    pub fn new(price: f64) -> Self {
        Self::at(price, Utc::now())
    }

    pub fn at(price: f64, captured_at: DateTime<Utc>) -> Self {
        Self { price, captured_at }
    }

    /// A usable rate is finite and strictly positive
    pub fn is_valid_price(price: f64) -> bool {
        price.is_finite() && price > 0.0
    }

    /// Age relative to `now`. Timestamps in the future count as age zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.captured_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the snapshot may be served without a refresh
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) <= window
    }
}
