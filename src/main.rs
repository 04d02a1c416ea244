use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use usdngn_bot::bot::telegram::TelegramBot;
use usdngn_bot::bot::BotFrontend;
use usdngn_bot::cache::RateCache;
use usdngn_bot::config::AppConfig;
use usdngn_bot::oracle::sources::WebDriverSource;
use usdngn_bot::oracle::RateFetcher;
use usdngn_bot::persistence::PriceStore;
use usdngn_bot::scheduler;

// Everything here is I/O-bound; one thread is plenty
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(config.logging.json);

    info!(config = %config, "🚀 Starting USD/NGN rate bot");

    let source = Arc::new(WebDriverSource::new(
        config.scraper.webdriver(),
        config.scraper.extractor(),
    ));
    let fetcher = RateFetcher::new(source, config.scraper.retry_policy());
    let cache = Arc::new(RateCache::new(
        PriceStore::new(&config.persistence.price_file),
        fetcher,
        config.cache.staleness_window(),
    ));

    let frontend = Arc::new(BotFrontend::new(Arc::clone(&cache)));
    let bot = TelegramBot::new(
        &config.bot.token,
        frontend,
        config.bot.poll_timeout(),
        config.bot.error_backoff(),
    );
    if let Err(e) = bot.register_commands().await {
        warn!(error = %e, "Continuing without command menu");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = tokio::spawn(scheduler::run_refresh_loop(
        Arc::clone(&cache),
        config.cache.refresh_interval(),
        shutdown_rx.clone(),
    ));

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
            // Holding the sender keeps the other tasks running
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    bot.run(shutdown_rx).await;

    if let Err(e) = refresher.await {
        error!(error = %e, "Refresh task ended abnormally");
    }

    info!("Bot stopped");
    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}
