//! Oracle module - USD/NGN rate acquisition
//!
//! Scrapes price samples from the rate page, averages them into a single
//! rate and retries failed attempts under a fixed policy.

mod aggregator;
mod error;
mod fetcher;
pub mod sources;

pub use aggregator::{mean, parse_price_text, spread};
pub use error::FetchError;
pub use fetcher::{RateFetcher, RetryPolicy};
pub use sources::RateSource;
