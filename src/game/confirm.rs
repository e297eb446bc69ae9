//! Confirm/cancel protocol for pending actions.
//!
//! ```text
//! PROPOSED --confirm + mutation ok--> CONFIRMED
//! PROPOSED --cancel-----------------> CANCELLED
//! PROPOSED --ttl--------------------> EXPIRED
//! ```
//!
//! A confirmation whose mutation fails leaves the action PROPOSED.

use std::future::Future;

use super::error::GameResult;
use super::pending::{ActionKind, ActionTicket, PendingAction, PendingStore};

/// Callback data prefix for pending-action buttons.
pub const CALLBACK_PREFIX: &str = "pa:";

/// Button pressed on a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Cancel,
}

impl Decision {
    fn as_str(&self) -> &'static str {
        match self {
            Decision::Confirm => "confirm",
            Decision::Cancel => "cancel",
        }
    }
}

/// Callback data for a prompt button: `pa:<decision>:<kind>:<actor>:<id>`.
pub fn callback_data(ticket: &ActionTicket, decision: Decision) -> String {
    format!(
        "{}{}:{}:{}:{}",
        CALLBACK_PREFIX,
        decision.as_str(),
        ticket.kind,
        ticket.actor_id,
        ticket.action_id
    )
}

/// Inverse of [`callback_data`].
pub fn parse_callback(data: &str) -> Option<(Decision, ActionTicket)> {
    let rest = data.strip_prefix(CALLBACK_PREFIX)?;
    let mut parts = rest.split(':');

    let decision = match parts.next()? {
        "confirm" => Decision::Confirm,
        "cancel" => Decision::Cancel,
        _ => return None,
    };
    let kind: ActionKind = parts.next()?.parse().ok()?;
    let actor_id = parts.next()?.parse().ok()?;
    let action_id = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some((
        decision,
        ActionTicket {
            actor_id,
            kind,
            action_id,
        },
    ))
}

/// Rolls the slot back unless disarmed, so a panicking or dropped
/// mutation future does not leave the action stuck in "applying".
struct ApplyGuard<'a> {
    store: &'a PendingStore,
    ticket: ActionTicket,
    armed: bool,
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.rollback(&self.ticket);
        }
    }
}

/// Confirm `ticket` on behalf of `requester` and run `apply` on it.
///
/// The action is removed only when `apply` succeeds. Otherwise the error
/// is returned and the action stays pending (or expires, if its deadline
/// passed meanwhile).
pub async fn confirm_with<T, F, Fut>(
    store: &PendingStore,
    ticket: &ActionTicket,
    requester: u64,
    apply: F,
) -> GameResult<(PendingAction, T)>
where
    F: FnOnce(PendingAction) -> Fut,
    Fut: Future<Output = GameResult<T>>,
{
    let action = store.begin(ticket, requester)?;
    let mut guard = ApplyGuard {
        store,
        ticket: *ticket,
        armed: true,
    };

    let value = apply(action.clone()).await?;

    guard.armed = false;
    store.finish(ticket);
    Ok((action, value))
}
