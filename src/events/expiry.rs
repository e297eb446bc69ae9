//! Cleanup for expired proposals.
//!
//! The pending store reports every action that timed out; its prompt is
//! edited to say so and loses its buttons. Failures only get logged.

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bot::dispatcher::ThrottledBot;
use crate::game::PendingAction;
use crate::plugins::render::expired_text;

/// Consume expired actions until the pending store is dropped.
pub fn spawn_expiry_cleanup(
    bot: ThrottledBot,
    mut expired: mpsc::UnboundedReceiver<PendingAction>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(action) = expired.recv().await {
            debug!(
                "Pending {} {} of user {} expired after {}s",
                action.kind(),
                action.id,
                action.actor_id,
                (Utc::now() - action.created_at).num_seconds()
            );
            let Some(prompt) = action.prompt else {
                continue;
            };

            let result = bot
                .edit_message_text(
                    ChatId(prompt.chat_id),
                    MessageId(prompt.message_id),
                    expired_text(&action),
                )
                .parse_mode(ParseMode::Html)
                .await;
            if let Err(e) = result {
                warn!(
                    "Could not clear prompt {} in chat {}: {}",
                    prompt.message_id, prompt.chat_id, e
                );
            }
        }
        info!("Expiry cleanup stopped");
    })
}
