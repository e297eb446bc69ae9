//! Daily claim with streaks.
//!
//! The claim timestamp lives in the inventory record, not in a process
//! cache, and is committed with a compare-and-set, so a user gets one
//! claim per window no matter how many processes or taps race.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use super::audit::AuditEntry;
use super::cooldown;
use super::error::{GameError, GameResult};
use super::Game;
use crate::database::{CharacterInstance, Rarity};

/// A successful daily claim.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub character: CharacterInstance,
    pub streak: u32,
    /// The streak bonus forced the `Special` tier.
    pub bonus: bool,
}

/// Streak after a claim at `now`.
///
/// Continues if the previous claim is younger than `window`, otherwise
/// starts over at 1.
pub fn next_streak(
    last: Option<DateTime<Utc>>,
    current: u32,
    now: DateTime<Utc>,
    window: Duration,
) -> u32 {
    match last {
        Some(last) if cooldown::remaining(last, now, window).is_some() => {
            current.saturating_add(1)
        }
        _ => 1,
    }
}

impl Game {
    /// Grant the daily character.
    pub async fn claim_daily(&self, actor_id: u64, now: DateTime<Utc>) -> GameResult<ClaimOutcome> {
        self.inventory.ensure(actor_id).await?;
        let record = self
            .inventory
            .get(actor_id)
            .await?
            .ok_or(GameError::NotFound("user"))?;

        let previous = record.last_claim_at;
        let last = previous.and_then(|ts| DateTime::from_timestamp(ts, 0));
        if let Some(last) = last
            && let Some(remaining) = cooldown::remaining(last, now, self.settings.claim_cooldown)
        {
            return Err(GameError::Cooldown { remaining });
        }

        let streak = next_streak(last, record.claim_streak, now, self.settings.streak_window);
        let every = self.settings.streak_bonus_every;
        let bonus = every > 0 && streak % every == 0;

        let character = self
            .sampler
            .sample(actor_id, bonus.then_some(Rarity::Special))
            .await?;

        let committed = self
            .inventory
            .record_claim(actor_id, previous, now.timestamp(), streak, &character)
            .await?;
        if !committed {
            // Another claim for this user landed first.
            return Err(GameError::Cooldown {
                remaining: self.settings.claim_cooldown,
            });
        }

        info!(
            "User {} claimed {} (streak {}, bonus {})",
            actor_id, character.id, streak, bonus
        );
        self.audit.record(AuditEntry::Claim {
            user: actor_id,
            character_id: character.id.clone(),
            rarity: character.rarity.as_str().to_string(),
            streak,
        });

        Ok(ClaimOutcome {
            character,
            streak,
            bonus,
        })
    }
}
