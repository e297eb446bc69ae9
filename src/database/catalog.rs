//! Character catalog repository.
//!
//! Rewards are drawn with a `$match` + `$sample` aggregation.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::Collection;
use tracing::debug;

use super::models::{CharacterInstance, Rarity};
use super::store::{CharacterCatalog, StoreResult};
use super::Database;

/// Repository for the `anime_characters` collection.
pub struct CatalogRepo {
    collection: Collection<CharacterInstance>,
}

impl CatalogRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("anime_characters"),
        }
    }
}

/// Build the `$match` stage for a sample query.
fn sample_filter(rarity: Option<Rarity>, exclude: &[String]) -> Document {
    let mut filter = Document::new();
    if let Some(rarity) = rarity {
        filter.insert("rarity", rarity.as_str());
    }
    if !exclude.is_empty() {
        filter.insert("id", doc! { "$nin": exclude.to_vec() });
    }
    filter
}

#[async_trait]
impl CharacterCatalog for CatalogRepo {
    async fn sample(
        &self,
        rarity: Option<Rarity>,
        exclude: &[String],
    ) -> StoreResult<Option<CharacterInstance>> {
        let pipeline = vec![
            doc! { "$match": sample_filter(rarity, exclude) },
            doc! { "$sample": { "size": 1 } },
        ];

        let mut cursor = self.collection.aggregate(pipeline).await?;
        let picked = match cursor.try_next().await? {
            Some(document) => Some(bson::from_document::<CharacterInstance>(document)?),
            None => None,
        };

        debug!(
            "Catalog sample rarity={:?} excluded={} -> {:?}",
            rarity,
            exclude.len(),
            picked.as_ref().map(|c| c.id.as_str())
        );
        Ok(picked)
    }
}
