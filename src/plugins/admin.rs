//! Owner-only maintenance commands.

use teloxide::prelude::*;

use super::render::reply_error;
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::game::GameError;
use crate::utils::{mention, reply_html, target_from_msg};

/// Handle /kill - wipe a user's characters.
///
/// Usage: /kill (reply) or /kill <user id>
pub async fn kill_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !state.game.is_owner(user.id.0) {
        return reply_error(&bot, &msg, "kill", &GameError::Unauthorized).await;
    }

    let Some(target) = target_from_msg(&msg, args.split_whitespace().next()) else {
        reply_html(&bot, &msg, "Usage: reply with /kill or <code>/kill &lt;user id&gt;</code>")
            .await?;
        return Ok(());
    };

    match state.game.kill(user.id.0, target.id).await {
        Ok(()) => {
            let text = format!(
                "🗑 Wiped every character of {}.",
                mention(target.id, &target.name)
            );
            reply_html(&bot, &msg, text).await?;
        }
        Err(e) => reply_error(&bot, &msg, "kill", &e).await?,
    }
    Ok(())
}
