//! Moves characters between inventories.
//!
//! The store only guarantees atomicity per document, so a move is two
//! updates: push to the destination, then remove from the source. Pushing
//! first means an interrupted move duplicates a character instead of
//! losing it. The removal is retried; if it still fails, an inconsistency
//! is audited. If the source lost the instance meanwhile, the pushed copy
//! is taken back.

use std::future::Future;
use std::slice;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::database::{CharacterInstance, InventoryStore, StoreResult};

use super::audit::{AuditEntry, AuditSink};
use super::error::{GameError, GameResult};

/// Which instances to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSelector {
    /// The oldest instance with this catalog id.
    One(String),
    /// Everything the source owns.
    All,
}

/// Outcome of a committed move.
#[derive(Debug, Clone)]
pub struct AppliedResult {
    pub moved: usize,
    pub characters: Vec<CharacterInstance>,
    /// Some instance is held twice; an inconsistency was audited.
    pub needs_reconciliation: bool,
}

#[derive(Clone)]
pub struct MutationApplier {
    inventory: Arc<dyn InventoryStore>,
    audit: Arc<dyn AuditSink>,
    attempts: u32,
    backoff: Duration,
}

impl MutationApplier {
    /// `attempts` bounds tries of the removal step; waits grow linearly
    /// by `backoff`.
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        audit: Arc<dyn AuditSink>,
        attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            inventory,
            audit,
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Run a store operation, retrying failures up to the attempt bound.
    pub async fn retry<T, F, Fut>(&self, what: &str, mut op: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts => {
                    warn!("{} failed (attempt {}/{}): {}", what, attempt, self.attempts, e);
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Move characters from `source_id` to `dest_id`.
    ///
    /// Ownership is checked again here; whatever was validated when the
    /// action was proposed may be stale.
    pub async fn apply_transfer(
        &self,
        source_id: u64,
        dest_id: u64,
        selector: &InstanceSelector,
    ) -> GameResult<AppliedResult> {
        if dest_id == 0 || dest_id == source_id {
            return Err(GameError::RecipientUnavailable);
        }

        let source = self
            .inventory
            .get(source_id)
            .await?
            .filter(|inv| !inv.characters.is_empty())
            .ok_or(GameError::NothingToTransfer)?;

        match selector {
            InstanceSelector::One(character_id) => {
                let character = source
                    .find_character(character_id)
                    .cloned()
                    .ok_or(GameError::NotFound("character"))?;
                self.move_one(source_id, dest_id, character).await
            }
            InstanceSelector::All => self.move_all(source_id, dest_id, source.characters).await,
        }
    }

    async fn move_one(
        &self,
        source_id: u64,
        dest_id: u64,
        character: CharacterInstance,
    ) -> GameResult<AppliedResult> {
        let id = character.id.as_str();

        // Nothing has changed yet if this fails.
        self.inventory
            .push_characters(dest_id, slice::from_ref(&character))
            .await?;

        let removed = self
            .retry("remove from source", || self.inventory.remove_character(source_id, id))
            .await;

        match removed {
            Ok(true) => {
                info!("Moved {} from {} to {}", id, source_id, dest_id);
                Ok(AppliedResult {
                    moved: 1,
                    characters: vec![character],
                    needs_reconciliation: false,
                })
            }
            Ok(false) => {
                // Someone else took it meanwhile.
                self.take_back(source_id, dest_id, id).await;
                Err(GameError::NotFound("character"))
            }
            Err(e) => {
                self.audit.record(AuditEntry::Inconsistency {
                    operation: "move".to_string(),
                    detail: format!(
                        "{} copied to {} but not removed from {}: {}",
                        id, dest_id, source_id, e
                    ),
                });
                Ok(AppliedResult {
                    moved: 1,
                    characters: vec![character],
                    needs_reconciliation: true,
                })
            }
        }
    }

    /// Every instance of the snapshot is removed from the source by id, so
    /// instances that arrived after the snapshot stay where they are.
    async fn move_all(
        &self,
        source_id: u64,
        dest_id: u64,
        characters: Vec<CharacterInstance>,
    ) -> GameResult<AppliedResult> {
        self.inventory.push_characters(dest_id, &characters).await?;

        let mut moved = Vec::with_capacity(characters.len());
        let mut stuck = Vec::new();
        let mut needs_reconciliation = false;

        for character in characters {
            let id = character.id.as_str();
            let removed = self
                .retry("remove from source", || self.inventory.remove_character(source_id, id))
                .await;

            match removed {
                Ok(true) => moved.push(character),
                Ok(false) => {
                    if !self.take_back(source_id, dest_id, id).await {
                        needs_reconciliation = true;
                    }
                }
                Err(e) => {
                    warn!("Could not remove {} from {}: {}", id, source_id, e);
                    stuck.push(character.id.clone());
                    moved.push(character);
                }
            }
        }

        if !stuck.is_empty() {
            self.audit.record(AuditEntry::Inconsistency {
                operation: "transfer".to_string(),
                detail: format!(
                    "copied to {} but not removed from {}: {}",
                    dest_id,
                    source_id,
                    stuck.join(", ")
                ),
            });
            needs_reconciliation = true;
        }

        if moved.is_empty() {
            return Err(GameError::NothingToTransfer);
        }

        info!(
            "Transferred {} character(s) from {} to {}",
            moved.len(),
            source_id,
            dest_id
        );
        Ok(AppliedResult {
            moved: moved.len(),
            characters: moved,
            needs_reconciliation,
        })
    }

    /// Remove the copy of `character_id` just pushed to `dest_id` after the
    /// source turned out not to hold it any more.
    ///
    /// Pushes append, so the copy is the latest instance. Returns `false`
    /// (after auditing) if the extra copy stays.
    async fn take_back(&self, source_id: u64, dest_id: u64, character_id: &str) -> bool {
        let undone = self
            .retry("undo push", || {
                self.inventory.remove_latest_character(dest_id, character_id)
            })
            .await;
        if matches!(undone, Ok(true)) {
            return true;
        }

        self.audit.record(AuditEntry::Inconsistency {
            operation: "move".to_string(),
            detail: format!(
                "{} left {} concurrently; extra copy remains with {}",
                character_id, source_id, dest_id
            ),
        });
        false
    }
}
