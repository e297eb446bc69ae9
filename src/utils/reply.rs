//! Reply helper utilities.

use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode, ReplyParameters};

use crate::bot::dispatcher::ThrottledBot;

/// Reply to `msg` with HTML `text`.
pub async fn reply_html(
    bot: &ThrottledBot,
    msg: &Message,
    text: impl Into<String>,
) -> anyhow::Result<Message> {
    let sent = bot
        .send_message(msg.chat.id, text.into())
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id).allow_sending_without_reply())
        .await?;
    Ok(sent)
}
