//! Turns game results into chat text.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::error;

use crate::bot::dispatcher::ThrottledBot;
use crate::database::CharacterInstance;
use crate::game::{
    callback_data, ActionOutcome, ActionPayload, ActionTicket, Decision, GameError, PendingAction,
};
use crate::utils::{format_coins, format_duration, html_escape, mention, reply_html};

/// One-line character description.
pub fn character_line(c: &CharacterInstance) -> String {
    format!(
        "{} <b>{}</b> ({}) <code>{}</code>",
        c.rarity.emoji(),
        html_escape(&c.name),
        html_escape(&c.anime),
        html_escape(&c.id)
    )
}

/// Reply text for a failed operation.
pub fn error_text(err: &GameError) -> String {
    match err {
        GameError::NotFound("character") => "❌ You don't own a character with that id.".to_string(),
        GameError::NotFound(what) => format!("❌ {} not found.", html_escape(what)),
        GameError::AlreadyPending(kind) => format!(
            "⏳ You already have a {} waiting for confirmation. Confirm or cancel it first.",
            kind
        ),
        GameError::Unauthorized => "⛔ You're not allowed to do that.".to_string(),
        GameError::InsufficientFunds { needed, available } => format!(
            "💸 Not enough coins: you have <b>{}</b>, need <b>{}</b>.",
            format_coins(*available),
            format_coins(*needed)
        ),
        GameError::EmptyCatalog => "📭 No characters left to hand out right now.".to_string(),
        GameError::Expired => "⌛ This request has expired.".to_string(),
        GameError::Cooldown { remaining } => format!(
            "⏳ Slow down! Try again in <b>{}</b>.",
            format_duration(*remaining)
        ),
        GameError::NothingToTransfer => "📭 That user has no characters to transfer.".to_string(),
        GameError::RecipientUnavailable => {
            "❌ Reply to a user's message (not a bot) to choose who gets it.".to_string()
        }
        GameError::InvalidInput(reason) => format!("❌ {}", html_escape(reason)),
        GameError::TransientStoreFailure(_) => format!(
            "⚠️ Something went wrong, please try again later. <code>{}</code>",
            err.code()
        ),
    }
}

/// Plain-text variant for callback answers, which don't render HTML.
pub fn error_alert(err: &GameError) -> String {
    match err {
        GameError::Unauthorized => "Only the user who started this can answer it.".to_string(),
        GameError::TransientStoreFailure(_) => {
            format!("Something went wrong, try again. ({})", err.code())
        }
        other => other.to_string(),
    }
}

/// Log unexpected failures with context.
pub fn log_failure(context: &str, user_id: u64, err: &GameError) {
    if !err.is_user_facing() {
        error!("{} failed for user {} [{}]: {}", context, user_id, err.code(), err);
    }
}

/// Log `err` if unexpected and reply with its message.
pub async fn reply_error(
    bot: &ThrottledBot,
    msg: &Message,
    context: &str,
    err: &GameError,
) -> anyhow::Result<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or_default();
    log_failure(context, user_id, err);
    reply_html(bot, msg, error_text(err)).await?;
    Ok(())
}

/// Confirmation prompt for a fresh proposal.
pub fn prompt_text(action: &PendingAction, ttl_secs: u64) -> String {
    let body = match &action.payload {
        ActionPayload::Gift {
            target_id,
            target_name,
            character,
        } => format!(
            "🎁 Gift this character to {}?\n\n{}",
            mention(*target_id, target_name),
            character_line(character)
        ),
        ActionPayload::Transfer { source_id, dest_id } => format!(
            "📦 Move <b>every</b> character of <code>{}</code> to <code>{}</code>?",
            source_id, dest_id
        ),
        ActionPayload::Favorite { character } => {
            format!("💖 Make this your favorite?\n\n{}", character_line(character))
        }
    };
    format!("{}\n\n<i>Expires in {}s.</i>", body, ttl_secs)
}

pub fn confirm_keyboard(ticket: &ActionTicket) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Confirm", callback_data(ticket, Decision::Confirm)),
        InlineKeyboardButton::callback("❌ Cancel", callback_data(ticket, Decision::Cancel)),
    ]])
}

/// Text replacing the prompt once the action went through.
pub fn outcome_text(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Gift {
            target_id,
            target_name,
            result,
        } => {
            let mut text = match result.characters.first() {
                Some(c) => format!(
                    "🎁 Gifted {} to {}!",
                    character_line(c),
                    mention(*target_id, target_name)
                ),
                None => format!("🎁 Gift to {} done.", mention(*target_id, target_name)),
            };
            if result.needs_reconciliation {
                text.push_str("\n\n⚠️ The admins were notified to double-check this gift.");
            }
            text
        }
        ActionOutcome::Transfer {
            source_id,
            dest_id,
            result,
        } => {
            let mut text = format!(
                "📦 Moved <b>{}</b> character(s) from <code>{}</code> to <code>{}</code>.",
                result.moved, source_id, dest_id
            );
            if result.needs_reconciliation {
                text.push_str("\n\n⚠️ Some copies could not be removed from the source and were flagged.");
            }
            text
        }
        ActionOutcome::Favorite { character } => {
            format!("💖 {} is now your favorite!", character_line(character))
        }
    }
}

/// Text for a prompt nobody answered in time.
pub fn expired_text(action: &PendingAction) -> String {
    format!("⌛ This {} request has expired.", action.kind())
}

pub fn cancelled_text(action_kind: &str) -> String {
    format!("❎ {} cancelled.", capitalize(action_kind))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
