//! In-memory store used by the game tests.
//!
//! Mirrors the single-document semantics of the MongoDB repositories and
//! can be told to fail specific operations.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::models::{CharacterInstance, Rarity, UserInventory};
use super::store::{CharacterCatalog, InventoryStore, StoreError, StoreResult};

type Users = HashMap<u64, UserInventory>;

/// Runs against the stored records right before the next push lands.
type PushHook = Box<dyn FnOnce(&mut Users) + Send>;

#[derive(Default)]
pub struct MemoryInventory {
    users: Mutex<Users>,
    failing_removals: AtomicU32,
    failing_pushes: AtomicU32,
    failing_credits: AtomicU32,
    unreachable_user: Mutex<Option<u64>>,
    before_push: Mutex<Option<PushHook>>,
}

/// Network-level store failure.
pub fn outage(detail: &str) -> StoreError {
    StoreError::Database(io::Error::new(io::ErrorKind::ConnectionReset, detail.to_string()).into())
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, inventory: UserInventory) {
        self.users.lock().insert(inventory.id, inventory);
    }

    pub fn snapshot(&self, user_id: u64) -> Option<UserInventory> {
        self.users.lock().get(&user_id).cloned()
    }

    /// Fail the next `n` removal calls.
    pub fn fail_removals(&self, n: u32) {
        self.failing_removals.store(n, Ordering::SeqCst);
    }

    pub fn fail_pushes(&self, n: u32) {
        self.failing_pushes.store(n, Ordering::SeqCst);
    }

    pub fn fail_credits(&self, n: u32) {
        self.failing_credits.store(n, Ordering::SeqCst);
    }

    /// Every removal touching `user_id` fails from now on.
    pub fn fail_removals_for(&self, user_id: u64) {
        *self.unreachable_user.lock() = Some(user_id);
    }

    /// Change other users' records as if a concurrent request committed
    /// just before the next push.
    pub fn before_next_push(&self, hook: impl FnOnce(&mut Users) + Send + 'static) {
        *self.before_push.lock() = Some(Box::new(hook));
    }

    fn take_failure(counter: &AtomicU32) -> StoreResult<()> {
        let tripped = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(outage("injected failure"))
        } else {
            Ok(())
        }
    }

    fn check_removal(&self, user_id: u64) -> StoreResult<()> {
        Self::take_failure(&self.failing_removals)?;
        if *self.unreachable_user.lock() == Some(user_id) {
            return Err(outage("user shard down"));
        }
        Ok(())
    }

    fn remove_where(
        &self,
        user_id: u64,
        pick: impl FnOnce(&[CharacterInstance]) -> Option<usize>,
    ) -> StoreResult<bool> {
        self.check_removal(user_id)?;
        let mut users = self.users.lock();
        let Some(inv) = users.get_mut(&user_id) else {
            return Ok(false);
        };
        match pick(inv.characters.as_slice()) {
            Some(idx) => {
                inv.characters.remove(idx);
                Self::prune_favorite(inv);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn prune_favorite(inv: &mut UserInventory) {
        let keep = inv
            .favorite
            .as_ref()
            .map(|f| inv.characters.iter().any(|c| c.id == f.id))
            .unwrap_or(false);
        if !keep {
            inv.favorite = None;
        }
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn get(&self, user_id: u64) -> StoreResult<Option<UserInventory>> {
        Ok(self.snapshot(user_id))
    }

    async fn ensure(&self, user_id: u64) -> StoreResult<()> {
        self.users
            .lock()
            .entry(user_id)
            .or_insert_with(|| UserInventory::new(user_id));
        Ok(())
    }

    async fn owned_character_ids(&self, user_id: u64) -> StoreResult<Vec<String>> {
        Ok(self
            .snapshot(user_id)
            .map(|inv| inv.owned_ids())
            .unwrap_or_default())
    }

    async fn push_characters(
        &self,
        user_id: u64,
        characters: &[CharacterInstance],
    ) -> StoreResult<()> {
        Self::take_failure(&self.failing_pushes)?;
        let mut users = self.users.lock();
        if let Some(hook) = self.before_push.lock().take() {
            hook(&mut *users);
        }
        users
            .entry(user_id)
            .or_insert_with(|| UserInventory::new(user_id))
            .characters
            .extend_from_slice(characters);
        Ok(())
    }

    async fn remove_character(&self, user_id: u64, character_id: &str) -> StoreResult<bool> {
        self.remove_where(user_id, |chars| chars.iter().position(|c| c.id == character_id))
    }

    async fn remove_latest_character(
        &self,
        user_id: u64,
        character_id: &str,
    ) -> StoreResult<bool> {
        self.remove_where(user_id, |chars| chars.iter().rposition(|c| c.id == character_id))
    }

    async fn reset_characters(&self, user_id: u64) -> StoreResult<bool> {
        let mut users = self.users.lock();
        match users.get_mut(&user_id) {
            Some(inv) => {
                inv.characters.clear();
                inv.favorite = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn debit(&self, user_id: u64, amount: i64) -> StoreResult<bool> {
        let mut users = self.users.lock();
        match users.get_mut(&user_id) {
            Some(inv) if inv.balance >= amount => {
                inv.balance -= amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn credit(&self, user_id: u64, amount: i64) -> StoreResult<()> {
        Self::take_failure(&self.failing_credits)?;
        self.users
            .lock()
            .entry(user_id)
            .or_insert_with(|| UserInventory::new(user_id))
            .balance += amount;
        Ok(())
    }

    async fn set_favorite(
        &self,
        user_id: u64,
        character: &CharacterInstance,
    ) -> StoreResult<bool> {
        let mut users = self.users.lock();
        match users.get_mut(&user_id) {
            Some(inv) if inv.find_character(&character.id).is_some() => {
                inv.favorite = Some(character.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_claim(
        &self,
        user_id: u64,
        previous: Option<i64>,
        claimed_at: i64,
        streak: u32,
        character: &CharacterInstance,
    ) -> StoreResult<bool> {
        let mut users = self.users.lock();
        match users.get_mut(&user_id) {
            Some(inv) if inv.last_claim_at == previous => {
                inv.last_claim_at = Some(claimed_at);
                inv.claim_streak = streak;
                inv.characters.push(character.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

pub struct MemoryCatalog {
    characters: Vec<CharacterInstance>,
    rng: Mutex<StdRng>,
}

impl MemoryCatalog {
    pub fn new(characters: Vec<CharacterInstance>) -> Self {
        Self {
            characters,
            rng: Mutex::new(StdRng::seed_from_u64(7)),
        }
    }
}

#[async_trait]
impl CharacterCatalog for MemoryCatalog {
    async fn sample(
        &self,
        rarity: Option<Rarity>,
        exclude: &[String],
    ) -> StoreResult<Option<CharacterInstance>> {
        let eligible: Vec<&CharacterInstance> = self
            .characters
            .iter()
            .filter(|c| rarity.is_none_or(|r| c.rarity == r))
            .filter(|c| !exclude.contains(&c.id))
            .collect();
        let mut rng = self.rng.lock();
        Ok(eligible.choose(&mut *rng).map(|c| (*c).clone()))
    }
}

/// Catalog entry for tests.
pub fn character(id: &str, rarity: Rarity) -> CharacterInstance {
    CharacterInstance {
        id: id.to_string(),
        name: format!("Character {}", id),
        anime: "Test Anime".to_string(),
        rarity,
        img_url: format!("https://img.example/{}.jpg", id),
        is_video: false,
    }
}
