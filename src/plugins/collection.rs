//! /collection - list owned characters.

use teloxide::prelude::*;

use super::render::{character_line, reply_error};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::UserInventory;
use crate::utils::{mention, reply_html};

/// Entries shown before the list is cut off.
const MAX_LINES: usize = 40;

/// Render an inventory as one line per distinct character.
pub fn collection_text(owner_name: &str, inv: &UserInventory) -> String {
    if inv.characters.is_empty() {
        return format!(
            "🎴 {} has no characters yet. Try /claim!",
            mention(inv.id, owner_name)
        );
    }

    let groups = inv.grouped();
    let mut text = format!(
        "🎴 {}'s collection: <b>{}</b> character(s), {} unique\n",
        mention(inv.id, owner_name),
        inv.characters.len(),
        groups.len()
    );
    for (id, (character, count)) in groups.iter().take(MAX_LINES) {
        let star = match &inv.favorite {
            Some(fav) if fav.id == *id => " 💖",
            _ => "",
        };
        text.push('\n');
        text.push_str(&character_line(character));
        if *count > 1 {
            text.push_str(&format!(" ×{}", count));
        }
        text.push_str(star);
    }
    if groups.len() > MAX_LINES {
        text.push_str(&format!("\n\n…and {} more.", groups.len() - MAX_LINES));
    }
    text
}

/// Handle /collection.
pub async fn collection_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    match state.game.collection(user.id.0).await {
        Ok(inv) => {
            reply_html(&bot, &msg, collection_text(&user.first_name, &inv)).await?;
        }
        Err(e) => reply_error(&bot, &msg, "collection", &e).await?,
    }
    Ok(())
}
