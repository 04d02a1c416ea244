use std::time::Duration;
use thiserror::Error;

/// Failure of a single fetch attempt.
///
/// Attempts are retried by [`RateFetcher`](super::RateFetcher); running out of
/// attempts is reported as `None`, not as one of these.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to start browser session: {0}")]
    Session(String),

    #[error("Navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Interaction with `{selector}` failed: {reason}")]
    Interaction { selector: String, reason: String },

    #[error("No element matched `{selector}` within {timeout:?}")]
    MissingElement { selector: String, timeout: Duration },

    #[error("Could not parse a price from {text:?}")]
    Parse { text: String },

    #[error("Page yielded no price samples")]
    NoSamples,

    #[error("Averaged price {0} is not a valid rate")]
    InvalidPrice(f64),

    #[error("WebDriver command failed: {0}")]
    Webdriver(#[from] fantoccini::error::CmdError),
}

impl FetchError {
    /// Short classification used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Session(_) => "session",
            FetchError::NavigationTimeout { .. } => "navigation_timeout",
            FetchError::Navigation { .. } => "navigation",
            FetchError::Interaction { .. } => "interaction",
            FetchError::MissingElement { .. } => "missing_element",
            FetchError::Parse { .. } => "parse",
            FetchError::NoSamples => "no_samples",
            FetchError::InvalidPrice(_) => "invalid_price",
            FetchError::Webdriver(_) => "webdriver",
        }
    }
}
