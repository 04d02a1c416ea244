//! WebDriver rate source
//!
//! Drives a headless browser through a WebDriver server (geckodriver by
//! default) to load the rate page and hand it to a [`PageExtractor`].

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{PageExtractor, RateSource};
use crate::oracle::FetchError;

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server endpoint, e.g. `http://localhost:4444`
    pub webdriver_url: String,
    /// Page carrying the rate
    pub page_url: String,
    pub headless: bool,
    pub navigation_timeout: Duration,
}

pub struct WebDriverSource {
    config: WebDriverConfig,
    extractor: Arc<dyn PageExtractor>,
}

impl WebDriverSource {
    pub fn new(config: WebDriverConfig, extractor: Arc<dyn PageExtractor>) -> Self {
        Self { config, extractor }
    }

    /// Session capabilities: fresh profile, certificate errors tolerated
    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("acceptInsecureCerts".to_string(), json!(true));
        caps.insert("pageLoadStrategy".to_string(), json!("normal"));
        caps.insert(
            "timeouts".to_string(),
            json!({ "pageLoad": self.config.navigation_timeout.as_millis() as u64 }),
        );
        if self.config.headless {
            caps.insert(
                "moz:firefoxOptions".to_string(),
                json!({ "args": ["-headless"] }),
            );
        }
        caps
    }

    async fn open_session(&self) -> Result<Client, FetchError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        builder
            .connect(&self.config.webdriver_url)
            .await
            .map_err(|e| FetchError::Session(e.to_string()))
    }

    async fn scrape(&self, client: &Client) -> Result<Vec<f64>, FetchError> {
        let url = &self.config.page_url;
        let timeout = self.config.navigation_timeout;

        match tokio::time::timeout(timeout, client.goto(url)).await {
            Err(_) => {
                return Err(FetchError::NavigationTimeout {
                    url: url.clone(),
                    timeout,
                })
            }
            Ok(Err(e)) => {
                return Err(FetchError::Navigation {
                    url: url.clone(),
                    reason: e.to_string(),
                })
            }
            Ok(Ok(())) => debug!(url = %url, "Rate page loaded"),
        }

        self.extractor.extract(client).await
    }
}

#[async_trait]
impl RateSource for WebDriverSource {
    fn name(&self) -> &'static str {
        "webdriver"
    }

    async fn sample(&self) -> Result<Vec<f64>, FetchError> {
        let client = self.open_session().await?;
        let result = self.scrape(&client).await;

        // Close on every path out of scrape, success or not
        if let Err(e) = client.close().await {
            warn!(source = %"webdriver", error = %e, "Failed to close browser session");
        }

        result
    }
}
