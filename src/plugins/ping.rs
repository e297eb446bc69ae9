//! Ping command plugin.
//!
//! Measures and displays Telegram API latency.

use std::time::Instant;

use teloxide::prelude::*;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::utils::reply_html;

/// Handle the /ping command.
pub async fn ping_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let _ = bot.get_me().await;
    let ms = start.elapsed().as_millis();

    let emoji = if ms < 100 {
        "🟢"
    } else if ms < 300 {
        "🟡"
    } else {
        "🔴"
    };

    let text = format!(
        "{} Pong! <code>{}ms</code>\n⏳ Open prompts: <code>{}</code>",
        emoji,
        ms,
        state.game.pending().len()
    );
    reply_html(&bot, &msg, text).await?;
    Ok(())
}
