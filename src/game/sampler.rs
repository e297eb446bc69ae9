//! Rarity-weighted reward sampling.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use crate::database::{CharacterCatalog, CharacterInstance, InventoryStore, Rarity};

use super::error::{GameError, GameResult};

/// Dice ranges (inclusive, over 1..=100) mapped to tiers.
#[derive(Debug, Clone)]
pub struct TierTable {
    tiers: Vec<(u32, Rarity)>,
}

impl TierTable {
    /// Highest face of the die.
    pub const SIDES: u32 = 100;

    /// Build from `(upper_bound, tier)` pairs sorted by bound. The last
    /// bound must be [`Self::SIDES`].
    pub fn new(tiers: Vec<(u32, Rarity)>) -> Self {
        debug_assert!(tiers.windows(2).all(|w| w[0].0 < w[1].0));
        debug_assert_eq!(tiers.last().map(|t| t.0), Some(Self::SIDES));
        Self { tiers }
    }

    /// Tier for an already rolled value.
    pub fn tier_for(&self, roll: u32) -> Rarity {
        self.tiers
            .iter()
            .find(|(upper, _)| roll <= *upper)
            .map(|(_, tier)| *tier)
            .unwrap_or(Rarity::Common)
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Rarity {
        self.tier_for(rng.random_range(1..=Self::SIDES))
    }
}

impl Default for TierTable {
    /// 1-5 legendary, 6-25 rare, 26-100 common.
    fn default() -> Self {
        Self::new(vec![
            (5, Rarity::Legendary),
            (25, Rarity::Rare),
            (100, Rarity::Common),
        ])
    }
}

/// Picks a character to grant.
#[derive(Clone)]
pub struct RewardSampler {
    catalog: Arc<dyn CharacterCatalog>,
    inventory: Arc<dyn InventoryStore>,
    tiers: TierTable,
}

impl RewardSampler {
    pub fn new(
        catalog: Arc<dyn CharacterCatalog>,
        inventory: Arc<dyn InventoryStore>,
        tiers: TierTable,
    ) -> Self {
        Self {
            catalog,
            inventory,
            tiers,
        }
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Sample a character for `user_id`.
    ///
    /// Owned ids are avoided while possible. The search widens from "tier,
    /// unowned" to "tier, any" to "whole catalog" before giving up with
    /// [`GameError::EmptyCatalog`].
    pub async fn sample(
        &self,
        user_id: u64,
        force_tier: Option<Rarity>,
    ) -> GameResult<CharacterInstance> {
        // ThreadRng is !Send; keep it out of the awaits below.
        let tier = match force_tier {
            Some(tier) => tier,
            None => self.tiers.roll(&mut rand::rng()),
        };
        let owned = self.inventory.owned_character_ids(user_id).await?;

        if let Some(c) = self.catalog.sample(Some(tier), &owned).await? {
            debug!("Sampled {} ({}) for {}", c.id, tier.as_str(), user_id);
            return Ok(c);
        }
        if !owned.is_empty()
            && let Some(c) = self.catalog.sample(Some(tier), &[]).await?
        {
            debug!("User {} owns every {} character, repeating {}", user_id, tier.as_str(), c.id);
            return Ok(c);
        }
        if let Some(c) = self.catalog.sample(None, &[]).await? {
            debug!("Tier {} empty, sampled {} from whole catalog", tier.as_str(), c.id);
            return Ok(c);
        }

        warn!("Character catalog is empty");
        Err(GameError::EmptyCatalog)
    }
}
