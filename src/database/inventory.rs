//! MongoDB-backed inventory repository.
//!
//! Every operation is one atomic single-document update. Array removals
//! that must drop exactly one instance use aggregation-pipeline updates,
//! since `$pull` would remove every matching element.

use async_trait::async_trait;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::{IndexOptions, UpdateOptions};
use mongodb::{Collection, IndexModel};
use tracing::debug;

use super::models::{CharacterInstance, UserInventory};
use super::store::{InventoryStore, StoreResult};
use super::Database;

/// Repository for the `users` collection.
#[derive(Clone)]
pub struct InventoryRepo {
    collection: Collection<UserInventory>,
}

impl InventoryRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    /// Create the unique index on `id`.
    ///
    /// Upserts rely on it to never produce two records for one user.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index).await?;
        debug!("Ensured unique index on users.id");
        Ok(())
    }

    fn upsert() -> UpdateOptions {
        UpdateOptions::builder().upsert(true).build()
    }

    /// Drop the element at `index` (an expression over the stored
    /// document) from a user holding `character_id`.
    async fn remove_at(&self, user_id: u64, character_id: &str, index: Bson) -> StoreResult<bool> {
        let filter = doc! { "id": user_id as i64, "characters.id": character_id };
        let pipeline = vec![remove_index_stage(index), prune_favorite_stage()];

        let result = self.collection.update_one(filter, pipeline).await?;
        debug!(
            "Remove {} from {}: matched={}",
            character_id, user_id, result.matched_count
        );
        Ok(result.matched_count > 0)
    }
}

/// Pipeline stage that drops the `characters` element at `index`.
fn remove_index_stage(index: Bson) -> Document {
    doc! {
        "$set": {
            "characters": {
                "$let": {
                    "vars": { "idx": index },
                    "in": {
                        "$map": {
                            "input": {
                                "$filter": {
                                    "input": { "$range": [0, { "$size": "$characters" }] },
                                    "as": "i",
                                    "cond": { "$ne": ["$$i", "$$idx"] },
                                }
                            },
                            "as": "i",
                            "in": { "$arrayElemAt": ["$characters", "$$i"] },
                        }
                    },
                }
            }
        }
    }
}

/// Pipeline stage that drops `favorite` once no owned instance matches it.
fn prune_favorite_stage() -> Document {
    doc! {
        "$set": {
            "favorite": {
                "$cond": [
                    { "$in": [
                        { "$ifNull": ["$favorite.id", Bson::Null] },
                        "$characters.id",
                    ] },
                    "$favorite",
                    "$$REMOVE",
                ]
            }
        }
    }
}

#[async_trait]
impl InventoryStore for InventoryRepo {
    async fn get(&self, user_id: u64) -> StoreResult<Option<UserInventory>> {
        let filter = doc! { "id": user_id as i64 };
        Ok(self.collection.find_one(filter).await?)
    }

    async fn ensure(&self, user_id: u64) -> StoreResult<()> {
        let filter = doc! { "id": user_id as i64 };
        let update = doc! {
            "$setOnInsert": { "balance": 0_i64, "characters": [], "claim_streak": 0_i32 }
        };
        self.collection
            .update_one(filter, update)
            .with_options(Self::upsert())
            .await?;
        Ok(())
    }

    async fn owned_character_ids(&self, user_id: u64) -> StoreResult<Vec<String>> {
        let filter = doc! { "id": user_id as i64 };
        let values = self.collection.distinct("characters.id", filter).await?;
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }

    async fn push_characters(
        &self,
        user_id: u64,
        characters: &[CharacterInstance],
    ) -> StoreResult<()> {
        if characters.is_empty() {
            return Ok(());
        }

        let filter = doc! { "id": user_id as i64 };
        let update = doc! {
            "$push": { "characters": { "$each": bson::to_bson(characters)? } }
        };
        self.collection
            .update_one(filter, update)
            .with_options(Self::upsert())
            .await?;

        debug!("Pushed {} character(s) to {}", characters.len(), user_id);
        Ok(())
    }

    async fn remove_character(&self, user_id: u64, character_id: &str) -> StoreResult<bool> {
        let first = doc! { "$indexOfArray": ["$characters.id", character_id] };
        self.remove_at(user_id, character_id, first.into()).await
    }

    async fn remove_latest_character(
        &self,
        user_id: u64,
        character_id: &str,
    ) -> StoreResult<bool> {
        let last = doc! {
            "$arrayElemAt": [
                {
                    "$filter": {
                        "input": { "$range": [0, { "$size": "$characters" }] },
                        "as": "i",
                        "cond": { "$eq": [
                            { "$arrayElemAt": ["$characters.id", "$$i"] },
                            character_id,
                        ] },
                    }
                },
                -1,
            ]
        };
        self.remove_at(user_id, character_id, last.into()).await
    }

    async fn reset_characters(&self, user_id: u64) -> StoreResult<bool> {
        let filter = doc! { "id": user_id as i64 };
        let update = doc! {
            "$set": { "characters": [] },
            "$unset": { "favorite": "" },
        };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.matched_count > 0)
    }

    async fn debit(&self, user_id: u64, amount: i64) -> StoreResult<bool> {
        let filter = doc! { "id": user_id as i64, "balance": { "$gte": amount } };
        let update = doc! { "$inc": { "balance": -amount } };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.modified_count > 0)
    }

    async fn credit(&self, user_id: u64, amount: i64) -> StoreResult<()> {
        let filter = doc! { "id": user_id as i64 };
        let update = doc! { "$inc": { "balance": amount } };
        self.collection
            .update_one(filter, update)
            .with_options(Self::upsert())
            .await?;
        Ok(())
    }

    async fn set_favorite(
        &self,
        user_id: u64,
        character: &CharacterInstance,
    ) -> StoreResult<bool> {
        let filter = doc! { "id": user_id as i64, "characters.id": &character.id };
        let update = doc! { "$set": { "favorite": bson::to_bson(character)? } };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.matched_count > 0)
    }

    async fn record_claim(
        &self,
        user_id: u64,
        previous: Option<i64>,
        claimed_at: i64,
        streak: u32,
        character: &CharacterInstance,
    ) -> StoreResult<bool> {
        let previous = previous.map(Bson::Int64).unwrap_or(Bson::Null);
        let filter = doc! { "id": user_id as i64, "last_claim_at": previous };
        let update = doc! {
            "$set": { "last_claim_at": claimed_at, "claim_streak": streak as i64 },
            "$push": { "characters": bson::to_bson(character)? },
        };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.matched_count > 0)
    }
}
