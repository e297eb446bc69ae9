//! Gift, favorite and transfer commands plus their confirm/cancel buttons.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters};
use tracing::{debug, warn};

use super::render::{
    cancelled_text, confirm_keyboard, error_alert, error_text, log_failure, outcome_text,
    prompt_text, reply_error,
};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::game::{parse_callback, Decision, GameError, GameResult, PendingAction, PromptRef};
use crate::utils::{parse_user_id, reply_html, target_from_msg};

/// Send the confirmation prompt for `proposal` and remember where it is.
async fn send_prompt(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    context: &str,
    proposal: GameResult<PendingAction>,
) -> anyhow::Result<()> {
    let action = match proposal {
        Ok(action) => action,
        Err(e) => return reply_error(bot, msg, context, &e).await,
    };
    let ticket = action.ticket();
    let ttl = state.game.settings().confirm_ttl.as_secs();

    let sent = bot
        .send_message(msg.chat.id, prompt_text(&action, ttl))
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id).allow_sending_without_reply())
        .reply_markup(confirm_keyboard(&ticket))
        .await;

    match sent {
        Ok(prompt) => {
            state.game.pending().attach_prompt(
                &ticket,
                PromptRef {
                    chat_id: prompt.chat.id.0,
                    message_id: prompt.id.0,
                },
            );
            Ok(())
        }
        Err(e) => {
            // Nobody can press buttons that never arrived.
            let _ = state.game.cancel(&ticket, ticket.actor_id);
            Err(e.into())
        }
    }
}

/// Handle /gift <character id> (reply to the recipient).
pub async fn gift_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let target = target_from_msg(&msg, None);
    let proposal = state
        .game
        .propose_gift(user.id.0, target.as_ref(), args.trim())
        .await;
    send_prompt(&bot, &msg, &state, "gift", proposal).await
}

/// Handle /fav <character id>.
pub async fn fav_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let proposal = state.game.propose_favorite(user.id.0, args.trim()).await;
    send_prompt(&bot, &msg, &state, "favorite", proposal).await
}

/// Handle /transfer <source id> <dest id>. Owners only.
pub async fn transfer_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !state.game.is_owner(user.id.0) {
        return reply_error(&bot, &msg, "transfer", &GameError::Unauthorized).await;
    }

    let ids: Vec<u64> = args.split_whitespace().filter_map(parse_user_id).collect();
    let [source_id, dest_id] = ids[..] else {
        reply_html(&bot, &msg, "Usage: <code>/transfer &lt;source id&gt; &lt;dest id&gt;</code>")
            .await?;
        return Ok(());
    };

    let proposal = state
        .game
        .propose_transfer(user.id.0, source_id, dest_id)
        .await;
    send_prompt(&bot, &msg, &state, "transfer", proposal).await
}

/// Handle presses on confirm/cancel buttons.
pub async fn pending_callback_handler(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let Some((decision, ticket)) = q.data.as_deref().and_then(parse_callback) else {
        bot.answer_callback_query(&q.id)
            .text("Invalid button.")
            .await?;
        return Ok(());
    };
    let requester = q.from.id.0;
    debug!("{:?} pressed on {:?} by {}", decision, ticket, requester);

    let new_text = match decision {
        Decision::Confirm => match state.game.confirm(&ticket, requester).await {
            Ok(outcome) => {
                bot.answer_callback_query(&q.id).text("Done!").await?;
                outcome_text(&outcome)
            }
            Err(GameError::Expired) => {
                bot.answer_callback_query(&q.id)
                    .text(error_alert(&GameError::Expired))
                    .await?;
                error_text(&GameError::Expired)
            }
            Err(e) => {
                // Anything else leaves the prompt as it is, still answerable.
                log_failure("confirm", requester, &e);
                bot.answer_callback_query(&q.id)
                    .text(error_alert(&e))
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
        },
        Decision::Cancel => match state.game.cancel(&ticket, requester) {
            Ok(true) => {
                bot.answer_callback_query(&q.id).text("Cancelled.").await?;
                cancelled_text(ticket.kind.as_str())
            }
            Ok(false) => {
                bot.answer_callback_query(&q.id)
                    .text(error_alert(&GameError::Expired))
                    .await?;
                error_text(&GameError::Expired)
            }
            Err(e) => {
                bot.answer_callback_query(&q.id)
                    .text(error_alert(&e))
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
        },
    };

    if let Some(prompt) = &q.message
        && let Err(e) = bot
            .edit_message_text(prompt.chat().id, prompt.id(), new_text)
            .parse_mode(ParseMode::Html)
            .await
    {
        warn!("Failed to update prompt for {:?}: {}", ticket, e);
    }

    Ok(())
}
