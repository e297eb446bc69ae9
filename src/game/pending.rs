//! Pending actions awaiting confirmation.
//!
//! One slot per (actor, kind). Each proposal gets a fresh instance id and
//! its own expiry timer; the timer only removes the slot if it still holds
//! that same instance and nobody is applying it, so a late timer can never
//! clobber a newer proposal or an in-flight confirmation.
//!
//! The store is process-local. Running several bot processes against one
//! database gives each its own slots.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::database::CharacterInstance;

use super::error::{GameError, GameResult};

/// What a pending action will do once confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Gift,
    Transfer,
    Favorite,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Gift => "gift",
            ActionKind::Transfer => "transfer",
            ActionKind::Favorite => "favorite",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gift" => Ok(ActionKind::Gift),
            "transfer" => Ok(ActionKind::Transfer),
            "favorite" => Ok(ActionKind::Favorite),
            _ => Err(()),
        }
    }
}

/// Data needed to carry out an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPayload {
    /// Move one instance from the actor to `target_id`.
    Gift {
        target_id: u64,
        target_name: String,
        character: CharacterInstance,
    },
    /// Move a whole inventory (owner tool).
    Transfer { source_id: u64, dest_id: u64 },
    /// Make `character` the actor's favorite.
    Favorite { character: CharacterInstance },
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::Gift { .. } => ActionKind::Gift,
            ActionPayload::Transfer { .. } => ActionKind::Transfer,
            ActionPayload::Favorite { .. } => ActionKind::Favorite,
        }
    }
}

/// Chat message showing the confirm/cancel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// An uncommitted proposal.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub id: u64,
    pub actor_id: u64,
    pub payload: ActionPayload,
    pub created_at: DateTime<Utc>,
    pub deadline: Instant,
    pub prompt: Option<PromptRef>,
}

impl PendingAction {
    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    pub fn ticket(&self) -> ActionTicket {
        ActionTicket {
            actor_id: self.actor_id,
            kind: self.kind(),
            action_id: self.id,
        }
    }
}

/// Reference to one specific proposal, as carried by its buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTicket {
    pub actor_id: u64,
    pub kind: ActionKind,
    pub action_id: u64,
}

impl ActionTicket {
    fn key(&self) -> SlotKey {
        (self.actor_id, self.kind)
    }
}

type SlotKey = (u64, ActionKind);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Proposed,
    /// Confirmed and the mutation is running.
    Applying,
}

struct Slot {
    action: PendingAction,
    state: SlotState,
    timer: Option<AbortHandle>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.state == SlotState::Applying || self.action.deadline > now
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Holder of pending actions.
///
/// Expired actions are sent to the receiver returned by [`PendingStore::new`]
/// so their prompts can be cleaned up.
#[derive(Clone)]
pub struct PendingStore {
    slots: Arc<DashMap<SlotKey, Slot>>,
    next_id: Arc<AtomicU64>,
    expired_tx: mpsc::UnboundedSender<PendingAction>,
}

impl PendingStore {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingAction>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let store = Self {
            slots: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            expired_tx,
        };
        (store, expired_rx)
    }

    /// Register a proposal that expires after `ttl`.
    ///
    /// Fails with [`GameError::AlreadyPending`] while the actor has a live
    /// action of the same kind. A slot whose deadline passed but whose timer
    /// has not run yet counts as free.
    pub fn propose(
        &self,
        actor_id: u64,
        payload: ActionPayload,
        ttl: Duration,
    ) -> GameResult<PendingAction> {
        let kind = payload.kind();
        let key = (actor_id, kind);
        let now = Instant::now();
        let action = PendingAction {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            actor_id,
            payload,
            created_at: Utc::now(),
            deadline: now + ttl,
            prompt: None,
        };
        let slot = Slot {
            action: action.clone(),
            state: SlotState::Proposed,
            timer: Some(self.spawn_timer(key, action.id, action.deadline)),
        };

        let stale = match self.slots.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    if let Some(timer) = &slot.timer {
                        timer.abort();
                    }
                    return Err(GameError::AlreadyPending(kind));
                }
                let mut old = occupied.insert(slot);
                old.stop_timer();
                Some(old.action)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                None
            }
        };

        if let Some(old) = stale {
            debug!("Replaced stale {} #{} of {}", kind, old.id, actor_id);
            let _ = self.expired_tx.send(old);
        }

        debug!("Proposed {} #{} for {}", kind, action.id, actor_id);
        Ok(action)
    }

    /// Remember which message shows the action's buttons.
    pub fn attach_prompt(&self, ticket: &ActionTicket, prompt: PromptRef) {
        if let Some(mut slot) = self.slots.get_mut(&ticket.key())
            && slot.action.id == ticket.action_id
        {
            slot.action.prompt = Some(prompt);
        }
    }

    /// Live action of `kind` for `actor_id`, if any.
    pub fn get(&self, actor_id: u64, kind: ActionKind) -> Option<PendingAction> {
        let now = Instant::now();
        self.slots
            .get(&(actor_id, kind))
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.action.clone())
    }

    /// Claim a proposal for confirmation.
    ///
    /// On success the slot is marked as applying: it can no longer expire
    /// or be cancelled, and must be released with [`Self::finish`] or
    /// [`Self::rollback`].
    pub fn begin(&self, ticket: &ActionTicket, requester: u64) -> GameResult<PendingAction> {
        if requester != ticket.actor_id {
            return Err(GameError::Unauthorized);
        }

        let key = ticket.key();
        let now = Instant::now();
        {
            let Some(mut slot) = self.slots.get_mut(&key) else {
                return Err(GameError::NotFound("pending action"));
            };
            if slot.action.id != ticket.action_id {
                return Err(GameError::NotFound("pending action"));
            }
            if slot.state == SlotState::Applying {
                return Err(GameError::AlreadyPending(ticket.kind));
            }
            if slot.action.deadline > now {
                slot.state = SlotState::Applying;
                return Ok(slot.action.clone());
            }
        }

        // Deadline passed but the timer has not fired yet.
        self.expire(key, ticket.action_id);
        Err(GameError::Expired)
    }

    /// Drop a proposal whose mutation succeeded.
    pub fn finish(&self, ticket: &ActionTicket) -> Option<PendingAction> {
        let (_, mut slot) = self
            .slots
            .remove_if(&ticket.key(), |_, slot| slot.action.id == ticket.action_id)?;
        slot.stop_timer();
        debug!("Resolved {} #{}", ticket.kind, ticket.action_id);
        Some(slot.action)
    }

    /// Hand a proposal back after its mutation failed.
    ///
    /// If the deadline passed while applying, the action expires now, since
    /// its timer already skipped it.
    pub fn rollback(&self, ticket: &ActionTicket) {
        let key = ticket.key();
        let overdue = {
            let Some(mut slot) = self.slots.get_mut(&key) else {
                return;
            };
            if slot.action.id != ticket.action_id {
                return;
            }
            slot.state = SlotState::Proposed;
            slot.action.deadline <= Instant::now()
        };

        if overdue {
            self.expire(key, ticket.action_id);
        }
    }

    /// Cancel a proposal. Cancelling something absent is not an error.
    pub fn cancel(&self, ticket: &ActionTicket, requester: u64) -> GameResult<bool> {
        if requester != ticket.actor_id {
            return Err(GameError::Unauthorized);
        }

        let removed = self.slots.remove_if(&ticket.key(), |_, slot| {
            slot.action.id == ticket.action_id && slot.state == SlotState::Proposed
        });

        Ok(match removed {
            Some((_, mut slot)) => {
                slot.stop_timer();
                debug!("Cancelled {} #{}", ticket.kind, ticket.action_id);
                true
            }
            None => false,
        })
    }

    /// Number of occupied slots, live or not yet reaped.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    fn spawn_timer(&self, key: SlotKey, action_id: u64, deadline: Instant) -> AbortHandle {
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            store.expire(key, action_id);
        })
        .abort_handle()
    }

    /// Remove the slot if it still holds `action_id` and is not applying.
    fn expire(&self, key: SlotKey, action_id: u64) {
        let removed = self.slots.remove_if(&key, |_, slot| {
            slot.action.id == action_id && slot.state == SlotState::Proposed
        });

        if let Some((_, slot)) = removed {
            debug!("Expired {} #{} of {}", key.1, action_id, key.0);
            let _ = self.expired_tx.send(slot.action);
        }
    }
}
