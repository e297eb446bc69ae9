//! /start and /help.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, ReplyParameters};
use teloxide::utils::command::BotCommands;
use url::Url;

use super::Command;
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::utils::html_escape;

/// Handle the /start command.
pub async fn start_handler(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.as_str())
        .unwrap_or("there");

    let text = format!(
        "<b>Hi {}!</b> 👋\n\n\
         Collect anime characters, trade them with friends and build your streak.\n\n\
         • /claim - your daily character\n\
         • /explore - look around for coins\n\
         • /gift - give a character away\n\n\
         Use /help for every command.",
        html_escape(name)
    );

    let mut request = bot.send_message(msg.chat.id, text).parse_mode(ParseMode::Html);

    // In groups, offer a private chat.
    if !msg.chat.is_private()
        && let Ok(url) = Url::parse(&format!("https://t.me/{}", state.bot_username))
    {
        request = request.reply_markup(InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::url("💬 Open in PM", url),
        ]]));
    }

    request.await?;
    Ok(())
}

/// Handle the /help command.
pub async fn help_handler(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let mut text = Command::descriptions().to_string();
    if msg.from.as_ref().is_some_and(|u| state.game.is_owner(u.id.0)) {
        text.push_str(
            "\n\nOwner:\n/transfer <source id> <dest id> - move a whole collection\n/kill - wipe a user's characters",
        );
    }

    bot.send_message(msg.chat.id, text)
        .reply_parameters(ReplyParameters::new(msg.id).allow_sending_without_reply())
        .await?;
    Ok(())
}
