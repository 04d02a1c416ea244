//! Page extraction strategies
//!
//! Everything that knows about the rate page's markup lives here, so a
//! redesign of the page only touches the strategy and never the retry or
//! cache logic.

use async_trait::async_trait;
use fantoccini::{Client, Locator};
use std::time::Duration;
use tracing::debug;

use crate::oracle::{parse_price_text, FetchError};

/// Button that must be clicked before the page renders its price list.
///
/// Coupled to the current page build; expect to update it when the page
/// changes.
pub const DEFAULT_REVEAL_SELECTOR: &str = "button.ant-btn.css-7o12g0.ant-btn-primary.ant-btn-custom.ant-btn-custom-middle.ant-btn-custom-primary.bds-theme-component-light";

/// Elements carrying one price label each
pub const DEFAULT_PRICE_SELECTOR: &str = "span.price-amount";

pub const DEFAULT_MAX_SAMPLES: usize = 10;

/// Reads price samples out of a loaded page
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, client: &Client) -> Result<Vec<f64>, FetchError>;
}

/// CSS-selector strategy: optionally click a reveal control, wait for the
/// price elements, parse the first `max_samples` of them.
#[derive(Debug, Clone)]
pub struct CssPriceExtractor {
    pub reveal_selector: Option<String>,
    pub price_selector: String,
    pub wait_timeout: Duration,
    pub max_samples: usize,
}

impl Default for CssPriceExtractor {
    fn default() -> Self {
        Self {
            reveal_selector: Some(DEFAULT_REVEAL_SELECTOR.to_string()),
            price_selector: DEFAULT_PRICE_SELECTOR.to_string(),
            wait_timeout: Duration::from_secs(60),
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl CssPriceExtractor {
    async fn reveal(&self, client: &Client, selector: &str) -> Result<(), FetchError> {
        let interaction_error = |e: fantoccini::error::CmdError| FetchError::Interaction {
            selector: selector.to_string(),
            reason: e.to_string(),
        };

        let control = client
            .wait()
            .at_most(self.wait_timeout)
            .for_element(Locator::Css(selector))
            .await
            .map_err(interaction_error)?;
        control.click().await.map_err(interaction_error)?;

        debug!(selector = %selector, "Clicked reveal control");
        Ok(())
    }
}

#[async_trait]
impl PageExtractor for CssPriceExtractor {
    async fn extract(&self, client: &Client) -> Result<Vec<f64>, FetchError> {
        if let Some(selector) = self.reveal_selector.as_deref() {
            self.reveal(client, selector).await?;
        }

        client
            .wait()
            .at_most(self.wait_timeout)
            .for_element(Locator::Css(&self.price_selector))
            .await
            .map_err(|_| FetchError::MissingElement {
                selector: self.price_selector.clone(),
                timeout: self.wait_timeout,
            })?;

        let elements = client
            .find_all(Locator::Css(&self.price_selector))
            .await?;

        let mut samples = Vec::with_capacity(elements.len().min(self.max_samples));
        for element in elements.into_iter().take(self.max_samples) {
            let text = element.text().await?;
            samples.push(parse_price_text(&text)?);
        }

        debug!(
            selector = %self.price_selector,
            samples = samples.len(),
            "Extracted price samples"
        );
        Ok(samples)
    }
}
