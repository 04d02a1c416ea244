//! Chat frontend
//!
//! Maps chat commands to cache lookups and conversions and renders the reply
//! text. Transport lives in [`telegram`].

mod format;
pub mod telegram;

pub use format::{format_grouped, lagos_time};

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::cache::RateCache;
use crate::conversion::{to_ngn, to_usd};

pub const START_REPLY: &str =
    "Hello, welcome to dollar to naira rates bot\nUse /help to show commands list";

pub const HELP_REPLY: &str = "/start - Start bot\n\
/help - Show commands list\n\
\n\
/usd - Get current Dollar (USD) rate\n\
/ngnusd - Convert Naira (NGN) to Dollar (USD). Example /ngnusd 1000\n\
/usdngn - Convert Dollar (USD) to Naira (NGN). Example /usdngn 10";

pub const NO_DATA_REPLY: &str =
    "Sorry, I couldn't fetch the price at the moment. Please try again later.";

/// Largest amount accepted for conversion
pub const MAX_AMOUNT: f64 = 1e12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputFormatError {
    #[error("no amount given")]
    Missing,

    #[error("`{0}` is not a number")]
    Invalid(String),

    #[error("amount must be between 0 and 1,000,000,000,000")]
    OutOfRange,
}

/// A conversion command whose amount could not be used
#[derive(Debug, Clone, PartialEq, Error)]
#[error("/{command}: {error}")]
pub struct CommandError {
    pub command: &'static str,
    pub error: InputFormatError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Help,
    Usd,
    /// Dollars to convert into naira
    UsdToNgn(f64),
    /// Naira to convert into dollars
    NgnToUsd(f64),
}

impl Command {
    pub const START: &'static str = "start";
    pub const HELP: &'static str = "help";
    pub const USD: &'static str = "usd";
    pub const USD_NGN: &'static str = "usdngn";
    pub const NGN_USD: &'static str = "ngnusd";

    /// Parse a chat message.
    ///
    /// `None` for anything that is not one of our commands. Accepts the
    /// `/command@botname` form group chats produce, and an amount written
    /// straight after a conversion command (`/usdngn10`).
    pub fn parse(text: &str) -> Option<Result<Self, CommandError>> {
        let rest = text.trim().strip_prefix('/')?;
        let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        let (name, args) = match split_glued_amount(&name) {
            Some((command, amount)) => (command, format!("{amount} {args}")),
            None => (name.as_str(), args.to_string()),
        };

        let command = match name {
            Self::START => Command::Start,
            Self::HELP => Command::Help,
            Self::USD => Command::Usd,
            Self::USD_NGN => match parse_amount(&args) {
                Ok(amount) => Command::UsdToNgn(amount),
                Err(error) => {
                    return Some(Err(CommandError {
                        command: Self::USD_NGN,
                        error,
                    }))
                }
            },
            Self::NGN_USD => match parse_amount(&args) {
                Ok(amount) => Command::NgnToUsd(amount),
                Err(error) => {
                    return Some(Err(CommandError {
                        command: Self::NGN_USD,
                        error,
                    }))
                }
            },
            _ => return None,
        };

        Some(Ok(command))
    }
}

/// `usdngn10` splits into `usdngn` and `10`
fn split_glued_amount(name: &str) -> Option<(&'static str, &str)> {
    [Command::USD_NGN, Command::NGN_USD]
        .into_iter()
        .find_map(|command| {
            let amount = name.strip_prefix(command)?;
            amount
                .starts_with(|c: char| c.is_ascii_digit())
                .then_some((command, amount))
        })
}

/// Parse a user-supplied amount; a comma is read as the decimal separator
pub fn parse_amount(raw: &str) -> Result<f64, InputFormatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputFormatError::Missing);
    }

    let amount: f64 = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| InputFormatError::Invalid(trimmed.to_string()))?;

    if !amount.is_finite() || !(0.0..=MAX_AMOUNT).contains(&amount) {
        return Err(InputFormatError::OutOfRange);
    }
    Ok(amount)
}

/// Usage hint for a rejected conversion command
pub fn usage_reply(err: &CommandError) -> String {
    let example = match err.command {
        Command::USD_NGN => "/usdngn 10",
        _ => "/ngnusd 1000",
    };
    format!("Sorry, {}. Example: {}", err.error, example)
}

pub struct BotFrontend {
    cache: Arc<RateCache>,
}

impl BotFrontend {
    pub fn new(cache: Arc<RateCache>) -> Self {
        Self { cache }
    }

    /// Reply for an incoming message, `None` if the bot should stay silent
    pub async fn reply(&self, text: &str) -> Option<String> {
        let command = match Command::parse(text)? {
            Ok(command) => command,
            Err(e) => {
                debug!(error = %e, "Rejected command input");
                return Some(usage_reply(&e));
            }
        };

        let reply = match command {
            Command::Start => START_REPLY.to_string(),
            Command::Help => HELP_REPLY.to_string(),
            Command::Usd => match self.cache.get_current_price().await {
                Some(rate) => format::rate_reply(rate, chrono::Utc::now()),
                None => NO_DATA_REPLY.to_string(),
            },
            Command::UsdToNgn(usd) => match self.cache.get_current_price().await {
                Some(rate) => format!(
                    "${} is ₦{}",
                    format_grouped(usd, 2),
                    format_grouped(to_ngn(usd, rate), 2)
                ),
                None => NO_DATA_REPLY.to_string(),
            },
            Command::NgnToUsd(ngn) => match self.cache.get_current_price().await {
                Some(rate) => format!(
                    "₦{} is ${}",
                    format_grouped(ngn, 2),
                    format_grouped(to_usd(ngn, rate), 3)
                ),
                None => NO_DATA_REPLY.to_string(),
            },
        };

        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::sources::MockRateSource;
    use crate::oracle::{FetchError, RateFetcher, RetryPolicy};
    use crate::persistence::PriceStore;
    use crate::types::{PriceSnapshot, DEFAULT_STALENESS_WINDOW};
    use temp_dir::TempDir;

    // ============================================================================
    // Command parsing
    // ============================================================================

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("/start"), Some(Ok(Command::Start)));
        assert_eq!(Command::parse("/help"), Some(Ok(Command::Help)));
        assert_eq!(Command::parse("  /USD  "), Some(Ok(Command::Usd)));
        assert_eq!(Command::parse("/usd@NairaRatesBot"), Some(Ok(Command::Usd)));
    }

    #[test]
    fn test_parse_conversion_commands() {
        assert_eq!(
            Command::parse("/usdngn 10"),
            Some(Ok(Command::UsdToNgn(10.0)))
        );
        assert_eq!(
            Command::parse("/ngnusd 1000,5"),
            Some(Ok(Command::NgnToUsd(1000.5)))
        );
        assert_eq!(
            Command::parse("/ngnusd@NairaRatesBot   250"),
            Some(Ok(Command::NgnToUsd(250.0)))
        );
    }

    #[test]
    fn test_parse_amount_glued_to_command() {
        assert_eq!(
            Command::parse("/usdngn10"),
            Some(Ok(Command::UsdToNgn(10.0)))
        );
        assert_eq!(
            Command::parse("/NGNUSD2,5"),
            Some(Ok(Command::NgnToUsd(2.5)))
        );
        assert_eq!(
            Command::parse("/usdngn10 dollars"),
            Some(Err(CommandError {
                command: Command::USD_NGN,
                error: InputFormatError::Invalid("10 dollars".to_string()),
            }))
        );
    }

    #[test]
    fn test_parse_ignores_non_commands() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/price"), None);
        assert_eq!(Command::parse("/usdngnx"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_parse_rejects_bad_amounts() {
        assert_eq!(
            Command::parse("/usdngn"),
            Some(Err(CommandError {
                command: Command::USD_NGN,
                error: InputFormatError::Missing,
            }))
        );
        assert_eq!(
            Command::parse("/ngnusd ten"),
            Some(Err(CommandError {
                command: Command::NGN_USD,
                error: InputFormatError::Invalid("ten".to_string()),
            }))
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 10 "), Ok(10.0));
        assert_eq!(parse_amount("2,5"), Ok(2.5));
        assert_eq!(parse_amount("0"), Ok(0.0));
        assert_eq!(parse_amount(""), Err(InputFormatError::Missing));
        assert_eq!(
            parse_amount("1,000,000"),
            Err(InputFormatError::Invalid("1,000,000".to_string()))
        );
        assert_eq!(parse_amount("-5"), Err(InputFormatError::OutOfRange));
        assert_eq!(parse_amount("inf"), Err(InputFormatError::OutOfRange));
        assert_eq!(parse_amount("NaN"), Err(InputFormatError::OutOfRange));
        assert_eq!(parse_amount("1e12"), Ok(1e12));
        assert_eq!(parse_amount("1e308"), Err(InputFormatError::OutOfRange));
    }

    // ============================================================================
    // Replies
    // ============================================================================

    /// Frontend over a store in a fresh temp dir, removed with the frontend
    struct TestFrontend {
        bot: BotFrontend,
        _dir: TempDir,
    }

    impl std::ops::Deref for TestFrontend {
        type Target = BotFrontend;

        fn deref(&self) -> &BotFrontend {
            &self.bot
        }
    }

    fn frontend(source: MockRateSource) -> (TestFrontend, PriceStore) {
        let dir = TempDir::new().unwrap();
        let store = PriceStore::new(dir.path().join("price_data.json"));
        let fetcher = RateFetcher::new(Arc::new(source), RetryPolicy::immediate(3));
        let bot = BotFrontend::new(Arc::new(RateCache::new(
            store.clone(),
            fetcher,
            DEFAULT_STALENESS_WINDOW,
        )));
        (TestFrontend { bot, _dir: dir }, store)
    }

    async fn cached_frontend(rate: f64) -> TestFrontend {
        let mut source = MockRateSource::new();
        source.expect_name().return_const("mock");
        source.expect_sample().times(0);
        let (bot, store) = frontend(source);
        store.save(&PriceSnapshot::new(rate)).await.unwrap();
        bot
    }

    #[tokio::test]
    async fn test_static_replies() {
        let bot = cached_frontend(1500.0).await;

        assert_eq!(bot.reply("/start").await.as_deref(), Some(START_REPLY));
        assert_eq!(bot.reply("/help").await.as_deref(), Some(HELP_REPLY));
        assert_eq!(bot.reply("just chatting").await, None);
    }

    #[tokio::test]
    async fn test_usd_reply_shows_rate() {
        let bot = cached_frontend(1520.456).await;
        let reply = bot.reply("/usd").await.unwrap();

        assert!(reply.contains("USD-NGN"));
        assert!(reply.ends_with("1 USD => ₦1520.46"), "{reply}");
    }

    #[tokio::test]
    async fn test_conversion_replies() {
        let bot = cached_frontend(1500.0).await;

        assert_eq!(
            bot.reply("/usdngn 10").await.as_deref(),
            Some("$10.00 is ₦15,000.00")
        );
        assert_eq!(
            bot.reply("/ngnusd 15000").await.as_deref(),
            Some("₦15,000.00 is $10.000")
        );
        assert_eq!(
            bot.reply("/usdngn1000000000000").await.as_deref(),
            Some("$1,000,000,000,000.00 is ₦1,500,000,000,000,000.00")
        );
    }

    #[tokio::test]
    async fn test_invalid_amount_gets_usage_without_fetch() {
        let mut source = MockRateSource::new();
        source.expect_name().return_const("mock");
        source.expect_sample().times(0);
        let (bot, _) = frontend(source);

        let reply = bot.reply("/usdngn abc").await.unwrap();
        assert_eq!(reply, "Sorry, `abc` is not a number. Example: /usdngn 10");

        let reply = bot.reply("/usdngn 1e308").await.unwrap();
        assert_eq!(
            reply,
            "Sorry, amount must be between 0 and 1,000,000,000,000. Example: /usdngn 10"
        );
    }

    #[tokio::test]
    async fn test_no_data_reply() {
        let mut source = MockRateSource::new();
        source.expect_name().return_const("mock");
        source
            .expect_sample()
            .returning(|| Err(FetchError::NoSamples));
        let (bot, _) = frontend(source);

        assert_eq!(bot.reply("/usd").await.as_deref(), Some(NO_DATA_REPLY));
        assert_eq!(bot.reply("/ngnusd 100").await.as_deref(), Some(NO_DATA_REPLY));
    }
}
