//! Character catalog model and owned character snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rarity tier of a character.
///
/// `Special` is never rolled directly; it is reached through the claim
/// streak bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
    Special,
}

impl Rarity {
    /// Value stored in the `rarity` field of catalog documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Legendary => "legendary",
            Rarity::Special => "special",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Rarity::Common => "⚪",
            Rarity::Rare => "🟣",
            Rarity::Legendary => "🟡",
            Rarity::Special => "💮",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
            Rarity::Special => "Special",
        };
        write!(f, "{} {}", self.emoji(), label)
    }
}

/// A character as stored in the master catalog, and as copied into a
/// user's inventory at grant time.
///
/// Inventory entries are snapshots: later catalog edits do not touch
/// characters users already own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInstance {
    /// Catalog id. Several instances with the same id may exist.
    pub id: String,
    pub name: String,
    pub anime: String,
    pub rarity: Rarity,
    pub img_url: String,
    #[serde(default)]
    pub is_video: bool,
}
