//! Gift, favorite and transfer flows.
//!
//! Each starts as a proposal and only mutates inventories once the actor
//! presses confirm.

use tracing::info;

use super::applier::{AppliedResult, InstanceSelector};
use super::audit::AuditEntry;
use super::confirm::confirm_with;
use super::error::{GameError, GameResult};
use super::pending::{ActionKind, ActionPayload, ActionTicket, PendingAction};
use super::Game;
use crate::database::CharacterInstance;

/// The other side of a gift or payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: u64,
    pub name: String,
    pub is_bot: bool,
}

/// Result of a confirmed action.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Gift {
        target_id: u64,
        target_name: String,
        result: AppliedResult,
    },
    Transfer {
        source_id: u64,
        dest_id: u64,
        result: AppliedResult,
    },
    Favorite {
        character: CharacterInstance,
    },
}

impl Game {
    fn ensure_not_pending(&self, actor_id: u64, kind: ActionKind) -> GameResult<()> {
        match self.pending.get(actor_id, kind) {
            Some(_) => Err(GameError::AlreadyPending(kind)),
            None => Ok(()),
        }
    }

    /// Owned instance of `character_id`, looked up fresh.
    async fn owned_character(
        &self,
        user_id: u64,
        character_id: &str,
    ) -> GameResult<CharacterInstance> {
        self.inventory
            .get(user_id)
            .await?
            .and_then(|inv| inv.find_character(character_id).cloned())
            .ok_or(GameError::NotFound("character"))
    }

    /// Propose giving one of the actor's characters to `target`.
    pub async fn propose_gift(
        &self,
        actor_id: u64,
        target: Option<&Participant>,
        character_id: &str,
    ) -> GameResult<PendingAction> {
        self.ensure_not_pending(actor_id, ActionKind::Gift)?;

        let target = target.ok_or(GameError::RecipientUnavailable)?;
        if target.is_bot {
            return Err(GameError::RecipientUnavailable);
        }
        if target.id == actor_id {
            return Err(GameError::InvalidInput(
                "You can't gift a character to yourself.".to_string(),
            ));
        }

        let character_id = character_id.trim();
        if character_id.is_empty() {
            return Err(GameError::InvalidInput(
                "Tell me which character: /gift <character id>".to_string(),
            ));
        }

        let character = self.owned_character(actor_id, character_id).await?;
        self.pending.propose(
            actor_id,
            ActionPayload::Gift {
                target_id: target.id,
                target_name: target.name.clone(),
                character,
            },
            self.settings.confirm_ttl,
        )
    }

    /// Propose making one of the actor's characters their favorite.
    pub async fn propose_favorite(
        &self,
        actor_id: u64,
        character_id: &str,
    ) -> GameResult<PendingAction> {
        self.ensure_not_pending(actor_id, ActionKind::Favorite)?;

        let character_id = character_id.trim();
        if character_id.is_empty() {
            return Err(GameError::InvalidInput(
                "Tell me which character: /fav <character id>".to_string(),
            ));
        }

        let character = self.owned_character(actor_id, character_id).await?;
        self.pending.propose(
            actor_id,
            ActionPayload::Favorite { character },
            self.settings.confirm_ttl,
        )
    }

    /// Propose moving a whole inventory. Owners only.
    pub async fn propose_transfer(
        &self,
        actor_id: u64,
        source_id: u64,
        dest_id: u64,
    ) -> GameResult<PendingAction> {
        if !self.is_owner(actor_id) {
            return Err(GameError::Unauthorized);
        }
        self.ensure_not_pending(actor_id, ActionKind::Transfer)?;

        if dest_id == 0 || source_id == dest_id {
            return Err(GameError::RecipientUnavailable);
        }

        let has_characters = self
            .inventory
            .get(source_id)
            .await?
            .is_some_and(|inv| !inv.characters.is_empty());
        if !has_characters {
            return Err(GameError::NothingToTransfer);
        }

        self.pending.propose(
            actor_id,
            ActionPayload::Transfer { source_id, dest_id },
            self.settings.confirm_ttl,
        )
    }

    /// Confirm a proposal and carry it out.
    pub async fn confirm(
        &self,
        ticket: &ActionTicket,
        requester: u64,
    ) -> GameResult<ActionOutcome> {
        let (_, outcome) =
            confirm_with(&self.pending, ticket, requester, |action| self.apply(action)).await?;
        Ok(outcome)
    }

    /// Cancel a proposal. Returns `false` if it was already gone.
    pub fn cancel(&self, ticket: &ActionTicket, requester: u64) -> GameResult<bool> {
        self.pending.cancel(ticket, requester)
    }

    async fn apply(&self, action: PendingAction) -> GameResult<ActionOutcome> {
        let actor_id = action.actor_id;
        match action.payload {
            ActionPayload::Gift {
                target_id,
                target_name,
                character,
            } => {
                let result = self
                    .applier
                    .apply_transfer(actor_id, target_id, &InstanceSelector::One(character.id.clone()))
                    .await?;
                self.audit.record(AuditEntry::Gift {
                    from: actor_id,
                    to: target_id,
                    character_id: character.id,
                    character_name: character.name,
                });
                Ok(ActionOutcome::Gift {
                    target_id,
                    target_name,
                    result,
                })
            }
            ActionPayload::Transfer { source_id, dest_id } => {
                if !self.is_owner(actor_id) {
                    return Err(GameError::Unauthorized);
                }
                let result = self
                    .applier
                    .apply_transfer(source_id, dest_id, &InstanceSelector::All)
                    .await?;
                self.audit.record(AuditEntry::Transfer {
                    by: actor_id,
                    from: source_id,
                    to: dest_id,
                    moved: result.moved,
                });
                Ok(ActionOutcome::Transfer {
                    source_id,
                    dest_id,
                    result,
                })
            }
            ActionPayload::Favorite { character } => {
                if !self.inventory.set_favorite(actor_id, &character).await? {
                    return Err(GameError::NotFound("character"));
                }
                info!("User {} set favorite {}", actor_id, character.id);
                self.audit.record(AuditEntry::Favorite {
                    user: actor_id,
                    character_id: character.id.clone(),
                });
                Ok(ActionOutcome::Favorite { character })
            }
        }
    }

    /// Wipe a user's characters (soft reset). Owners only.
    pub async fn kill(&self, actor_id: u64, target_id: u64) -> GameResult<()> {
        if !self.is_owner(actor_id) {
            return Err(GameError::Unauthorized);
        }
        if !self.inventory.reset_characters(target_id).await? {
            return Err(GameError::NotFound("user"));
        }
        info!("Owner {} reset characters of {}", actor_id, target_id);
        self.audit.record(AuditEntry::Reset {
            by: actor_id,
            target: target_id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::database::memory::character;
    use crate::database::{Rarity, UserInventory};
    use crate::game::testing::{harness, Harness, OWNER};
    use crate::database::InventoryStore;

    const ALICE: u64 = 1;
    const BOB: u64 = 2;

    fn bob() -> Participant {
        Participant {
            id: BOB,
            name: "Bob".to_string(),
            is_bot: false,
        }
    }

    fn with_alice_owning(ids: &[&str]) -> Harness {
        let h = harness(Vec::new());
        let mut inv = UserInventory::new(ALICE);
        inv.characters = ids.iter().map(|id| character(id, Rarity::Rare)).collect();
        h.inventory.insert(inv);
        h
    }

    fn count(h: &Harness, user: u64, id: &str) -> usize {
        h.inventory.snapshot(user).map(|i| i.count_of(id)).unwrap_or(0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_gift_twice_then_after_expiry() {
        let mut h = with_alice_owning(&["char123"]);

        h.game.propose_gift(ALICE, Some(&bob()), "char123").await.unwrap();
        let second = h.game.propose_gift(ALICE, Some(&bob()), "char123").await;
        assert!(matches!(second, Err(GameError::AlreadyPending(ActionKind::Gift))));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(h.expired.recv().await.is_some());

        assert!(h.game.propose_gift(ALICE, Some(&bob()), "char123").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_gift_conserves_instances() {
        let h = with_alice_owning(&["a", "a"]);
        let before = count(&h, ALICE, "a") + count(&h, BOB, "a");

        let action = h.game.propose_gift(ALICE, Some(&bob()), "a").await.unwrap();
        let outcome = h.game.confirm(&action.ticket(), ALICE).await.unwrap();

        assert!(matches!(outcome, ActionOutcome::Gift { target_id: BOB, .. }));
        assert_eq!(count(&h, ALICE, "a"), 1);
        assert_eq!(count(&h, BOB, "a"), 1);
        assert_eq!(count(&h, ALICE, "a") + count(&h, BOB, "a"), before);
        assert_eq!(h.game.pending().len(), 0);
        assert!(matches!(h.audit.entries()[0], AuditEntry::Gift { from: ALICE, to: BOB, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recipient_cannot_confirm() {
        let h = with_alice_owning(&["a"]);
        let action = h.game.propose_gift(ALICE, Some(&bob()), "a").await.unwrap();

        let err = h.game.confirm(&action.ticket(), BOB).await.unwrap_err();
        assert!(matches!(err, GameError::Unauthorized));
        assert_eq!(count(&h, ALICE, "a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gift_of_unowned_character() {
        let h = with_alice_owning(&["a"]);
        let err = h.game.propose_gift(ALICE, Some(&bob()), "zzz").await.unwrap_err();
        assert!(matches!(err, GameError::NotFound("character")));
        assert_eq!(h.game.pending().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gift_to_self_or_bot_rejected() {
        let h = with_alice_owning(&["a"]);
        let me = Participant {
            id: ALICE,
            name: "Alice".to_string(),
            is_bot: false,
        };
        let bot = Participant {
            id: 77,
            name: "SomeBot".to_string(),
            is_bot: true,
        };

        assert!(matches!(
            h.game.propose_gift(ALICE, Some(&me), "a").await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            h.game.propose_gift(ALICE, Some(&bot), "a").await,
            Err(GameError::RecipientUnavailable)
        ));
        assert!(matches!(
            h.game.propose_gift(ALICE, None, "a").await,
            Err(GameError::RecipientUnavailable)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_character_gone_before_confirm_keeps_proposal() {
        let h = with_alice_owning(&["a"]);
        let action = h.game.propose_gift(ALICE, Some(&bob()), "a").await.unwrap();

        // Lost the character some other way in the meantime.
        h.inventory.remove_character(ALICE, "a").await.unwrap();

        let err = h.game.confirm(&action.ticket(), ALICE).await.unwrap_err();
        assert!(matches!(err, GameError::NothingToTransfer));
        assert!(h.game.pending().get(ALICE, ActionKind::Gift).is_some());
        assert_eq!(count(&h, BOB, "a"), 0);

        assert!(h.game.cancel(&action.ticket(), ALICE).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_favorite_flow() {
        let h = with_alice_owning(&["a", "b"]);
        let action = h.game.propose_favorite(ALICE, "b").await.unwrap();
        let outcome = h.game.confirm(&action.ticket(), ALICE).await.unwrap();

        assert!(matches!(outcome, ActionOutcome::Favorite { .. }));
        assert_eq!(h.inventory.snapshot(ALICE).unwrap().favorite.unwrap().id, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_requires_owner() {
        let h = with_alice_owning(&["a"]);
        let err = h.game.propose_transfer(ALICE, ALICE, BOB).await.unwrap_err();
        assert!(matches!(err, GameError::Unauthorized));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_moves_everything() {
        let h = with_alice_owning(&["a", "b", "a"]);
        let action = h.game.propose_transfer(OWNER, ALICE, BOB).await.unwrap();
        let outcome = h.game.confirm(&action.ticket(), OWNER).await.unwrap();

        match outcome {
            ActionOutcome::Transfer { result, .. } => assert_eq!(result.moved, 3),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(h.inventory.snapshot(ALICE).unwrap().characters.is_empty());
        assert_eq!(count(&h, BOB, "a"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_of_empty_inventory() {
        let h = with_alice_owning(&[]);
        let err = h.game.propose_transfer(OWNER, ALICE, BOB).await.unwrap_err();
        assert!(matches!(err, GameError::NothingToTransfer));
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_resets_characters() {
        let h = with_alice_owning(&["a"]);

        assert!(matches!(h.game.kill(ALICE, ALICE).await, Err(GameError::Unauthorized)));
        h.game.kill(OWNER, ALICE).await.unwrap();

        assert!(h.inventory.snapshot(ALICE).unwrap().characters.is_empty());
        assert!(matches!(h.game.kill(OWNER, 12345).await, Err(GameError::NotFound("user"))));
    }
}
