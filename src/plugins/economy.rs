//! Coin commands: /balance, /pay and /explore.

use chrono::Utc;
use teloxide::prelude::*;
use tracing::info;

use super::render::{character_line, reply_error};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::game::economy::parse_amount;
use crate::utils::{format_coins, format_duration, mention, reply_html, target_from_msg};

/// Handle /balance.
pub async fn balance_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let profile = match state.game.profile(user.id.0, Utc::now()).await {
        Ok(profile) => profile,
        Err(e) => return reply_error(&bot, &msg, "balance", &e).await,
    };

    let mut text = format!(
        "👤 {}\n💰 Coins: <b>{}</b>\n🎴 Characters: <b>{}</b> ({} unique)\n🔥 Claim streak: <b>{}</b>",
        mention(user.id.0, &user.first_name),
        format_coins(profile.balance),
        profile.characters,
        profile.distinct,
        profile.streak
    );
    if let Some(fav) = &profile.favorite {
        text.push_str(&format!("\n💖 Favorite: {}", character_line(fav)));
    }
    if let Some(left) = profile.pay_ready_in {
        text.push_str(&format!("\n⏳ /pay again in {}", format_duration(left)));
    }
    if let Some(left) = profile.explore_ready_in {
        text.push_str(&format!("\n⏳ /explore again in {}", format_duration(left)));
    }

    reply_html(&bot, &msg, text).await?;
    Ok(())
}

/// Handle /pay <amount> (reply to the recipient).
pub async fn pay_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let amount = match parse_amount(&args) {
        Ok(amount) => amount,
        Err(e) => return reply_error(&bot, &msg, "pay", &e).await,
    };
    let target = target_from_msg(&msg, None);

    match state
        .game
        .pay(user.id.0, target.as_ref(), amount, Utc::now())
        .await
    {
        Ok(receipt) => {
            let mut text = format!(
                "💸 {} paid <b>{}</b> coins to {}.",
                mention(user.id.0, &user.first_name),
                format_coins(receipt.amount),
                mention(receipt.target_id, &receipt.target_name)
            );
            if let Some(balance) = receipt.balance_after {
                text.push_str(&format!("\nYour balance: <b>{}</b>", format_coins(balance)));
            }
            reply_html(&bot, &msg, text).await?;
        }
        Err(e) => reply_error(&bot, &msg, "pay", &e).await?,
    }
    Ok(())
}

/// Handle /explore.
pub async fn explore_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    match state.game.explore(user.id.0, Utc::now()).await {
        Ok(outcome) => {
            info!("User {} explored: {} coins", user.id.0, outcome.coins);
            let text = format!(
                "🧭 You wandered off and found a {} stash: <b>{}</b> coins!",
                outcome.tier,
                format_coins(outcome.coins)
            );
            reply_html(&bot, &msg, text).await?;
        }
        Err(e) => reply_error(&bot, &msg, "explore", &e).await?,
    }
    Ok(())
}
