//! User inventory record.
//!
//! One document per player in the `users` collection: currency balance,
//! owned characters in acquisition order, the favorite, and the daily
//! claim bookkeeping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::character::CharacterInstance;

/// Persistent per-user game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInventory {
    /// Telegram user ID.
    pub id: u64,

    /// Currency balance. Never negative; debits are conditional.
    #[serde(default)]
    pub balance: i64,

    /// Owned characters, oldest first. Duplicates are distinct instances.
    #[serde(default)]
    pub characters: Vec<CharacterInstance>,

    /// Copy of one entry of `characters`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<CharacterInstance>,

    /// Unix timestamp of the last daily claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_claim_at: Option<i64>,

    /// Consecutive daily claims.
    #[serde(default)]
    pub claim_streak: u32,
}

impl UserInventory {
    /// Fresh record with nothing in it.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            balance: 0,
            characters: Vec::new(),
            favorite: None,
            last_claim_at: None,
            claim_streak: 0,
        }
    }

    /// First owned instance with the given catalog id.
    pub fn find_character(&self, character_id: &str) -> Option<&CharacterInstance> {
        self.characters.iter().find(|c| c.id == character_id)
    }

    /// Number of owned instances with the given catalog id.
    #[cfg(test)]
    pub fn count_of(&self, character_id: &str) -> usize {
        self.characters.iter().filter(|c| c.id == character_id).count()
    }

    /// Distinct catalog ids owned, sorted.
    pub fn owned_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.characters.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Owned characters grouped by catalog id, with instance counts.
    pub fn grouped(&self) -> BTreeMap<&str, (&CharacterInstance, usize)> {
        let mut groups: BTreeMap<&str, (&CharacterInstance, usize)> = BTreeMap::new();
        for character in &self.characters {
            groups
                .entry(character.id.as_str())
                .and_modify(|(_, n)| *n += 1)
                .or_insert((character, 1));
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Rarity;

    fn character(id: &str) -> CharacterInstance {
        CharacterInstance {
            id: id.to_string(),
            name: format!("Name {}", id),
            anime: "Show".to_string(),
            rarity: Rarity::Common,
            img_url: "https://img".to_string(),
            is_video: false,
        }
    }

    #[test]
    fn test_owned_ids_are_distinct() {
        let mut inv = UserInventory::new(1);
        inv.characters = vec![character("b"), character("a"), character("b")];

        assert_eq!(inv.owned_ids(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(inv.count_of("b"), 2);
    }

    #[test]
    fn test_grouped_counts_instances() {
        let mut inv = UserInventory::new(1);
        inv.characters = vec![character("x"), character("x"), character("y")];

        let groups = inv.grouped();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["x"].1, 2);
        assert_eq!(groups["y"].1, 1);
    }

    #[test]
    fn test_missing_fields_default() {
        let doc = mongodb::bson::doc! { "id": 42_i64 };
        let inv: UserInventory = mongodb::bson::from_document(doc).unwrap();

        assert_eq!(inv.balance, 0);
        assert!(inv.characters.is_empty());
        assert!(inv.last_claim_at.is_none());
    }
}
