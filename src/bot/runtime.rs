//! Bot runtime - Polling and Webhook runners.

use std::net::SocketAddr;

use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::info;
use url::Url;

use super::dispatcher::{BotDispatcher, ThrottledBot};
use crate::config::{BotMode, Config};

/// Run the bot with the configured mode.
pub async fn run(config: &Config, bot: ThrottledBot, mut dispatcher: BotDispatcher) {
    match config.bot_mode {
        BotMode::Polling => {
            info!("Starting bot in polling mode...");
            dispatcher.dispatch().await;
        }
        BotMode::Webhook => {
            info!("Starting bot in webhook mode...");
            run_webhook(config, bot, dispatcher).await;
        }
    }
}

/// Serve updates through teloxide's axum listener.
///
/// The listener registers the webhook with Telegram and removes it again
/// on shutdown.
///
/// # Panics
/// Panics if `WEBHOOK_URL` is invalid or the listener cannot be set up.
async fn run_webhook(config: &Config, bot: ThrottledBot, mut dispatcher: BotDispatcher) {
    let raw_url = config
        .webhook_url
        .as_deref()
        .expect("WEBHOOK_URL must be set when using webhook mode");
    let url = Url::parse(raw_url).expect("Invalid WEBHOOK_URL format");
    let address = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));

    let options = match &config.webhook_secret {
        Some(secret) => Options::new(address, url.clone()).secret_token(secret.clone()),
        None => Options::new(address, url.clone()),
    };
    info!("Webhook {} on {}", url, address);

    // setWebhook only needs the plain bot.
    let listener = webhooks::axum(bot.inner().clone(), options)
        .await
        .expect("Failed to setup webhook");

    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("Error from update listener"),
        )
        .await;
}
