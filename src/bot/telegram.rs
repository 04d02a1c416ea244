//! Telegram transport - long polling
//!
//! Every incoming message is answered on its own task, so a slow scrape
//! behind one `/usd` never holds up polling for everyone else.

use anyhow::{Context, Result};
use frankenstein::{
    AsyncApi, AsyncTelegramApi, BotCommand, GetUpdatesParams, SendMessageParams,
    SetMyCommandsParams, Update, UpdateContent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{BotFrontend, Command};

/// Command menu shown by Telegram clients
pub fn command_menu() -> Vec<BotCommand> {
    [
        (Command::START, "Start bot"),
        (Command::HELP, "Show commands list"),
        (Command::USD, "Get current Dollar (USD) rate"),
        (Command::USD_NGN, "Convert Dollar (USD) to Naira (NGN)"),
        (Command::NGN_USD, "Convert Naira (NGN) to Dollar (USD)"),
    ]
    .into_iter()
    .map(|(command, description)| {
        BotCommand::builder()
            .command(command)
            .description(description)
            .build()
    })
    .collect()
}

pub struct TelegramBot {
    api: Arc<AsyncApi>,
    frontend: Arc<BotFrontend>,
    poll_timeout: Duration,
    error_backoff: Duration,
}

impl TelegramBot {
    pub fn new(
        token: &str,
        frontend: Arc<BotFrontend>,
        poll_timeout: Duration,
        error_backoff: Duration,
    ) -> Self {
        Self {
            api: Arc::new(AsyncApi::new(token)),
            frontend,
            poll_timeout,
            error_backoff,
        }
    }

    /// Publish the command menu
    pub async fn register_commands(&self) -> Result<()> {
        let params = SetMyCommandsParams::builder()
            .commands(command_menu())
            .build();
        self.api
            .set_my_commands(&params)
            .await
            .context("Failed to register bot commands")?;
        Ok(())
    }

    /// Poll for updates until `shutdown` flips (or its sender is dropped)
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let timeout_secs = u32::try_from(self.poll_timeout.as_secs()).unwrap_or(u32::MAX);
        let mut params = GetUpdatesParams::builder().timeout(timeout_secs).build();

        info!(poll_timeout_secs = timeout_secs, "📡 Polling Telegram for updates");

        loop {
            let polled = tokio::select! {
                _ = shutdown.changed() => break,
                polled = self.api.get_updates(&params) => polled,
            };

            match polled {
                Ok(response) => {
                    for update in response.result {
                        params.offset = Some(i64::from(update.update_id) + 1);
                        self.dispatch(update);
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_secs = self.error_backoff.as_secs(),
                        "Failed to poll Telegram updates"
                    );
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.error_backoff) => {}
                    }
                }
            }
        }

        info!("Telegram polling stopped");
    }

    fn dispatch(&self, update: Update) {
        let UpdateContent::Message(message) = update.content else {
            return;
        };
        let Some(text) = message.text.clone() else {
            return;
        };
        let chat_id = message.chat.id;

        let api = Arc::clone(&self.api);
        let frontend = Arc::clone(&self.frontend);
        tokio::spawn(async move {
            let Some(reply) = frontend.reply(&text).await else {
                return;
            };

            let params = SendMessageParams::builder()
                .chat_id(chat_id)
                .text(reply)
                .build();
            match api.send_message(&params).await {
                Ok(_) => debug!(chat_id, command = %text, "Reply sent"),
                Err(e) => warn!(chat_id, error = %e, "Failed to send reply"),
            }
        });
    }
}
