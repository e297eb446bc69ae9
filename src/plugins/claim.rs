//! /claim - the daily character.

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, ReplyParameters};
use tracing::warn;
use url::Url;

use super::render::{character_line, reply_error};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::utils::reply_html;

/// Handle /claim (and /hclaim).
pub async fn claim_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let outcome = match state.game.claim_daily(user.id.0, Utc::now()).await {
        Ok(outcome) => outcome,
        Err(e) => return reply_error(&bot, &msg, "claim", &e).await,
    };

    let mut text = format!(
        "🌸 Daily claim!\n\n{}\n\n🔥 Streak: <b>{}</b>",
        character_line(&outcome.character),
        outcome.streak
    );
    if outcome.bonus {
        text.push_str(&format!(
            "\n✨ Streak bonus: a {} character!",
            outcome.character.rarity
        ));
    }

    // The claim is already committed; a broken image only costs the picture.
    if let Ok(url) = Url::parse(&outcome.character.img_url) {
        let file = InputFile::url(url);
        let sent = if outcome.character.is_video {
            bot.send_video(msg.chat.id, file)
                .caption(text.clone())
                .parse_mode(ParseMode::Html)
                .reply_parameters(ReplyParameters::new(msg.id).allow_sending_without_reply())
                .await
        } else {
            bot.send_photo(msg.chat.id, file)
                .caption(text.clone())
                .parse_mode(ParseMode::Html)
                .reply_parameters(ReplyParameters::new(msg.id).allow_sending_without_reply())
                .await
        };
        match sent {
            Ok(_) => return Ok(()),
            Err(e) => warn!("Could not send image for {}: {}", outcome.character.id, e),
        }
    }

    reply_html(&bot, &msg, text).await?;
    Ok(())
}
