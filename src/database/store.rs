//! Storage seams used by the game layer.
//!
//! Every method maps to a single-document atomic operation in MongoDB.
//! Nothing here spans two documents; callers that touch two inventories
//! sequence the calls themselves.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{CharacterInstance, Rarity, UserInventory};

/// Failure talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("malformed document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("cannot encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Player inventories (`users` collection).
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Load a record.
    async fn get(&self, user_id: u64) -> StoreResult<Option<UserInventory>>;

    /// Create an empty record if none exists.
    async fn ensure(&self, user_id: u64) -> StoreResult<()>;

    /// Distinct catalog ids the user owns at least one instance of.
    async fn owned_character_ids(&self, user_id: u64) -> StoreResult<Vec<String>>;

    /// Append characters, creating the record if needed.
    async fn push_characters(
        &self,
        user_id: u64,
        characters: &[CharacterInstance],
    ) -> StoreResult<()>;

    /// Remove exactly one instance with the given catalog id, the oldest.
    /// Returns `false` if the user holds no such instance.
    async fn remove_character(&self, user_id: u64, character_id: &str) -> StoreResult<bool>;

    /// Like [`remove_character`](Self::remove_character), but drops the
    /// most recently added instance.
    async fn remove_latest_character(&self, user_id: u64, character_id: &str)
    -> StoreResult<bool>;

    /// Soft reset: empty the character list and clear the favorite.
    async fn reset_characters(&self, user_id: u64) -> StoreResult<bool>;

    /// Subtract `amount` only if the balance covers it.
    async fn debit(&self, user_id: u64, amount: i64) -> StoreResult<bool>;

    /// Add `amount`, creating the record if needed.
    async fn credit(&self, user_id: u64, amount: i64) -> StoreResult<()>;

    /// Set the favorite, only if the character is still owned.
    async fn set_favorite(&self, user_id: u64, character: &CharacterInstance)
    -> StoreResult<bool>;

    /// Commit a daily claim.
    ///
    /// Succeeds only if `last_claim_at` still equals `previous`, so two
    /// racing claims cannot both land. Pushes the character in the same
    /// update.
    async fn record_claim(
        &self,
        user_id: u64,
        previous: Option<i64>,
        claimed_at: i64,
        streak: u32,
        character: &CharacterInstance,
    ) -> StoreResult<bool>;
}

/// Master character catalog (`anime_characters` collection).
#[async_trait]
pub trait CharacterCatalog: Send + Sync {
    /// Pick one character uniformly at random.
    ///
    /// `rarity` restricts the tier (`None` means the whole catalog) and
    /// ids in `exclude` are never returned.
    async fn sample(
        &self,
        rarity: Option<Rarity>,
        exclude: &[String],
    ) -> StoreResult<Option<CharacterInstance>>;
}
