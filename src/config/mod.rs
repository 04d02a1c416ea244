//! Configuration management
//!
//! Loads from optional config files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::oracle::sources::{
    CssPriceExtractor, WebDriverConfig, DEFAULT_MAX_SAMPLES, DEFAULT_PRICE_SELECTOR,
    DEFAULT_REVEAL_SELECTOR,
};
use crate::oracle::RetryPolicy;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub scraper: ScraperConfig,
    pub cache: CacheConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Deserialize)]
pub struct BotConfig {
    /// Telegram bot API token
    pub token: String,
    /// Long-poll timeout for getUpdates in seconds
    pub poll_timeout_secs: u64,
    /// Pause after a failed poll in seconds
    pub error_backoff_secs: u64,
}

// Keeps the token out of debug output
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("error_backoff_secs", &self.error_backoff_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Page carrying the USD/NGN rate
    pub url: String,
    /// WebDriver server endpoint
    pub webdriver_url: String,
    /// Run the browser without a window
    pub headless: bool,
    /// Page load budget in seconds
    pub navigation_timeout_secs: u64,
    /// Budget for the price elements to appear, in seconds
    pub element_timeout_secs: u64,
    /// Control clicked to reveal prices; empty disables the click
    pub reveal_selector: String,
    /// Elements carrying one price each
    pub price_selector: String,
    /// Maximum elements averaged per attempt
    pub max_samples: usize,
    /// Attempts per fetch
    pub max_attempts: u32,
    /// Linear backoff unit between attempts in milliseconds
    pub backoff_ms: u64,
    /// Random jitter added to each backoff, in milliseconds
    pub max_jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Snapshot age after which requests trigger a refresh
    pub staleness_secs: u64,
    /// Period of the background refresh
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// JSON file holding the cached snapshot
    pub price_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of plain text
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (NGNBOT__*)
            .add_source(
                Environment::with_prefix("NGNBOT")
                    .separator("__")
                    .try_parsing(true),
            )
            // Plain variable names used by existing deployments
            .set_override_option("bot.token", std::env::var("BOTAPITOKEN").ok())?
            .set_override_option("scraper.url", std::env::var("URL").ok())?
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            // Bot defaults
            .set_default("bot.token", "")?
            .set_default("bot.poll_timeout_secs", 30)?
            .set_default("bot.error_backoff_secs", 5)?
            // Scraper defaults
            .set_default("scraper.url", "")?
            .set_default("scraper.webdriver_url", "http://localhost:4444")?
            .set_default("scraper.headless", true)?
            .set_default("scraper.navigation_timeout_secs", 60)?
            .set_default("scraper.element_timeout_secs", 60)?
            .set_default("scraper.reveal_selector", DEFAULT_REVEAL_SELECTOR)?
            .set_default("scraper.price_selector", DEFAULT_PRICE_SELECTOR)?
            .set_default("scraper.max_samples", DEFAULT_MAX_SAMPLES as u64)?
            .set_default("scraper.max_attempts", 3)?
            .set_default("scraper.backoff_ms", 2000)?
            .set_default("scraper.max_jitter_ms", 500)?
            // Cache defaults
            .set_default("cache.staleness_secs", 60)?
            .set_default("cache.refresh_interval_secs", 60)?
            // Persistence defaults
            .set_default("persistence.price_file", "price_data.json")?
            // Logging defaults
            .set_default("logging.json", false)?;
        Ok(builder)
    }

    /// Reject configurations the bot cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.bot.token.trim().is_empty() {
            bail!("Bot token is not set (BOTAPITOKEN or NGNBOT__BOT__TOKEN)");
        }
        if self.scraper.url.trim().is_empty() {
            bail!("Rate page URL is not set (URL or NGNBOT__SCRAPER__URL)");
        }
        if self.scraper.price_selector.trim().is_empty() {
            bail!("scraper.price_selector must not be empty");
        }
        if self.scraper.max_attempts == 0 {
            bail!("scraper.max_attempts must be at least 1");
        }
        if self.scraper.max_samples == 0 {
            bail!("scraper.max_samples must be at least 1");
        }
        if self.cache.staleness_secs == 0 {
            bail!("cache.staleness_secs must be positive");
        }
        if self.cache.refresh_interval_secs == 0 {
            bail!("cache.refresh_interval_secs must be positive");
        }
        if self.persistence.price_file.trim().is_empty() {
            bail!("persistence.price_file must not be empty");
        }
        Ok(())
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "url={} webdriver={} attempts={} staleness={}s refresh={}s store={}",
            self.scraper.url,
            self.scraper.webdriver_url,
            self.scraper.max_attempts,
            self.cache.staleness_secs,
            self.cache.refresh_interval_secs,
            self.persistence.price_file
        )
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digest())
    }
}

impl BotConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl ScraperConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
        }
    }

    pub fn webdriver(&self) -> WebDriverConfig {
        WebDriverConfig {
            webdriver_url: self.webdriver_url.clone(),
            page_url: self.url.clone(),
            headless: self.headless,
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
        }
    }

    pub fn extractor(&self) -> Arc<CssPriceExtractor> {
        let reveal = self.reveal_selector.trim();
        Arc::new(CssPriceExtractor {
            reveal_selector: (!reveal.is_empty()).then(|| reveal.to_string()),
            price_selector: self.price_selector.clone(),
            wait_timeout: Duration::from_secs(self.element_timeout_secs),
            max_samples: self.max_samples,
        })
    }
}

impl CacheConfig {
    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}
