//! Rate source implementations (WebDriver-driven page scrape)

mod extraction;
mod webdriver;

pub use extraction::{
    CssPriceExtractor, PageExtractor, DEFAULT_MAX_SAMPLES, DEFAULT_PRICE_SELECTOR,
    DEFAULT_REVEAL_SELECTOR,
};
pub use webdriver::{WebDriverConfig, WebDriverSource};

use crate::oracle::FetchError;
use async_trait::async_trait;

/// Trait for rate sources.
///
/// One call to [`sample`](RateSource::sample) is one fetch attempt; retries
/// belong to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Scrape the raw price samples (NGN per USD) currently on offer
    async fn sample(&self) -> Result<Vec<f64>, FetchError>;
}
