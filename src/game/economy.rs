//! Coins: balance, payments and exploring.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;

use super::audit::AuditEntry;
use super::error::{GameError, GameResult};
use super::gift::Participant;
use super::Game;
use crate::database::{CharacterInstance, Rarity, UserInventory};

/// A completed payment.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub amount: i64,
    pub target_id: u64,
    pub target_name: String,
    /// Payer's balance afterwards, if it could be read back.
    pub balance_after: Option<i64>,
}

/// Result of one exploration.
#[derive(Debug, Clone, Copy)]
pub struct ExploreOutcome {
    pub tier: Rarity,
    pub coins: i64,
}

/// Summary shown by /balance.
#[derive(Debug, Clone)]
pub struct Profile {
    pub balance: i64,
    pub characters: usize,
    pub distinct: usize,
    pub favorite: Option<CharacterInstance>,
    pub streak: u32,
    /// Cooldowns still running, if any.
    pub pay_ready_in: Option<Duration>,
    pub explore_ready_in: Option<Duration>,
}

/// Coins found while exploring, by rolled tier.
pub fn explore_reward<R: Rng + ?Sized>(tier: Rarity, rng: &mut R) -> i64 {
    match tier {
        Rarity::Common => rng.random_range(20..=60),
        Rarity::Rare => rng.random_range(100..=250),
        Rarity::Legendary | Rarity::Special => rng.random_range(500..=1000),
    }
}

/// Parse a user-supplied coin amount.
pub fn parse_amount(raw: &str) -> GameResult<i64> {
    match raw.trim().replace([',', '_'], "").parse::<i64>() {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(GameError::InvalidInput(
            "Amount must be a positive whole number.".to_string(),
        )),
    }
}

impl Game {
    /// Send coins to another player.
    ///
    /// The cooldown is taken before any store access and handed back if
    /// the payment does not go through.
    pub async fn pay(
        &self,
        actor_id: u64,
        target: Option<&Participant>,
        amount: i64,
        now: DateTime<Utc>,
    ) -> GameResult<PaymentReceipt> {
        let target = target.ok_or(GameError::RecipientUnavailable)?;
        if target.is_bot {
            return Err(GameError::RecipientUnavailable);
        }
        if target.id == actor_id {
            return Err(GameError::InvalidInput("You can't pay yourself.".to_string()));
        }
        if amount <= 0 {
            return Err(GameError::InvalidInput(
                "Amount must be a positive whole number.".to_string(),
            ));
        }

        self.pay_cooldown
            .try_acquire(actor_id, now)
            .map_err(|remaining| GameError::Cooldown { remaining })?;
        if let Err(e) = self.move_coins(actor_id, target.id, amount).await {
            self.pay_cooldown.release(actor_id, now);
            return Err(e);
        }

        info!("User {} paid {} coins to {}", actor_id, amount, target.id);
        self.audit.record(AuditEntry::Payment {
            from: actor_id,
            to: target.id,
            amount,
        });

        let balance_after = self
            .inventory
            .get(actor_id)
            .await
            .ok()
            .flatten()
            .map(|inv| inv.balance);

        Ok(PaymentReceipt {
            amount,
            target_id: target.id,
            target_name: target.name.clone(),
            balance_after,
        })
    }

    /// Debit `from`, then credit `to`; the debit is refunded if the
    /// credit cannot be made.
    async fn move_coins(&self, from: u64, to: u64, amount: i64) -> GameResult<()> {
        if !self.inventory.debit(from, amount).await? {
            let available = self
                .inventory
                .get(from)
                .await?
                .map(|inv| inv.balance)
                .unwrap_or(0);
            return Err(GameError::InsufficientFunds {
                needed: amount,
                available,
            });
        }

        let credited = self
            .applier
            .retry("credit recipient", || self.inventory.credit(to, amount))
            .await;
        let Err(e) = credited else {
            return Ok(());
        };

        let refunded = self
            .applier
            .retry("refund payer", || self.inventory.credit(from, amount))
            .await;
        if let Err(refund_err) = refunded {
            self.audit.record(AuditEntry::Inconsistency {
                operation: "pay".to_string(),
                detail: format!(
                    "{} coins left {} but reached neither {} nor the refund: {} / {}",
                    amount, from, to, e, refund_err
                ),
            });
        }
        Err(e.into())
    }

    /// Look around for coins.
    pub async fn explore(&self, actor_id: u64, now: DateTime<Utc>) -> GameResult<ExploreOutcome> {
        self.explore_cooldown
            .try_acquire(actor_id, now)
            .map_err(|remaining| GameError::Cooldown { remaining })?;

        let (tier, coins) = {
            let mut rng = rand::rng();
            let tier = self.sampler.tiers().roll(&mut rng);
            (tier, explore_reward(tier, &mut rng))
        };

        let credited = self
            .applier
            .retry("credit explore reward", || self.inventory.credit(actor_id, coins))
            .await;
        if let Err(e) = credited {
            self.explore_cooldown.release(actor_id, now);
            return Err(e.into());
        }

        self.audit.record(AuditEntry::Explore {
            user: actor_id,
            coins,
        });
        Ok(ExploreOutcome { tier, coins })
    }

    /// Balance and collection summary.
    pub async fn profile(&self, actor_id: u64, now: DateTime<Utc>) -> GameResult<Profile> {
        let inv = self.collection(actor_id).await?;
        Ok(Profile {
            balance: inv.balance,
            characters: inv.characters.len(),
            distinct: inv.owned_ids().len(),
            favorite: inv.favorite,
            streak: inv.claim_streak,
            pay_ready_in: self.pay_cooldown.check(actor_id, now),
            explore_ready_in: self.explore_cooldown.check(actor_id, now),
        })
    }

    /// Full inventory; an empty one for users never seen before.
    pub async fn collection(&self, actor_id: u64) -> GameResult<UserInventory> {
        Ok(self
            .inventory
            .get(actor_id)
            .await?
            .unwrap_or_else(|| UserInventory::new(actor_id)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::game::testing::harness;

    const A: u64 = 10;
    const B: u64 = 20;

    fn participant(id: u64) -> Participant {
        Participant {
            id,
            name: format!("User {}", id),
            is_bot: false,
        }
    }

    fn funded(id: u64, balance: i64) -> UserInventory {
        let mut inv = UserInventory::new(id);
        inv.balance = balance;
        inv
    }

    #[tokio::test]
    async fn test_pay_then_cooldown() {
        let h = harness(Vec::new());
        h.inventory.insert(funded(A, 1000));
        h.inventory.insert(funded(B, 70));
        let now = Utc::now();

        let receipt = h.game.pay(A, Some(&participant(B)), 500, now).await.unwrap();
        assert_eq!(receipt.balance_after, Some(500));
        assert_eq!(h.inventory.snapshot(A).unwrap().balance, 500);
        assert_eq!(h.inventory.snapshot(B).unwrap().balance, 570);

        let later = now + ChronoDuration::minutes(5);
        match h.game.pay(A, Some(&participant(B)), 500, later).await {
            Err(GameError::Cooldown { remaining }) => {
                assert!(remaining < Duration::from_secs(30 * 60));
                assert_eq!(remaining, Duration::from_secs(25 * 60));
            }
            other => panic!("expected cooldown, got {:?}", other.map(|r| r.amount)),
        }
        assert_eq!(h.inventory.snapshot(A).unwrap().balance, 500);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balances() {
        let h = harness(Vec::new());
        h.inventory.insert(funded(A, 100));

        let err = h
            .game
            .pay(A, Some(&participant(B)), 500, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GameError::InsufficientFunds { needed: 500, available: 100 }
        ));
        assert_eq!(h.inventory.snapshot(A).unwrap().balance, 100);
        assert!(h.inventory.snapshot(B).is_none());
        // No cooldown after a failed payment.
        h.inventory.insert(funded(A, 1000));
        assert!(h.game.pay(A, Some(&participant(B)), 500, Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_pay_validation() {
        let h = harness(Vec::new());
        h.inventory.insert(funded(A, 100));
        let now = Utc::now();

        assert!(matches!(
            h.game.pay(A, Some(&participant(A)), 10, now).await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            h.game.pay(A, Some(&participant(B)), 0, now).await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            h.game.pay(A, None, 10, now).await,
            Err(GameError::RecipientUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_failed_credit_refunds_payer() {
        let h = harness(Vec::new());
        h.inventory.insert(funded(A, 1000));
        // Every credit attempt for the recipient fails, the refund works.
        h.inventory.fail_credits(3);

        let err = h
            .game
            .pay(A, Some(&participant(B)), 400, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, GameError::TransientStoreFailure(_)));
        assert_eq!(h.inventory.snapshot(A).unwrap().balance, 1000);
        assert_eq!(h.audit.inconsistencies(), 0);
    }

    #[tokio::test]
    async fn test_lost_payment_is_audited() {
        let h = harness(Vec::new());
        h.inventory.insert(funded(A, 1000));
        h.inventory.fail_credits(100);

        assert!(h.game.pay(A, Some(&participant(B)), 400, Utc::now()).await.is_err());
        assert_eq!(h.audit.inconsistencies(), 1);
    }

    #[tokio::test]
    async fn test_explore_credits_and_cools_down() {
        let h = harness(Vec::new());
        let now = Utc::now();

        let outcome = h.game.explore(A, now).await.unwrap();
        assert!(outcome.coins >= 20);
        assert_eq!(h.inventory.snapshot(A).unwrap().balance, outcome.coins);

        assert!(matches!(
            h.game.explore(A, now + ChronoDuration::seconds(10)).await,
            Err(GameError::Cooldown { .. })
        ));
        assert!(h.game.explore(A, now + ChronoDuration::minutes(6)).await.is_ok());
    }

    #[test]
    fn test_explore_reward_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            assert!((20..=60).contains(&explore_reward(Rarity::Common, &mut rng)));
            assert!((100..=250).contains(&explore_reward(Rarity::Rare, &mut rng)));
            assert!((500..=1000).contains(&explore_reward(Rarity::Legendary, &mut rng)));
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,000").unwrap(), 1000);
        assert_eq!(parse_amount(" 42 ").unwrap(), 42);
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("lots").is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_payments_share_one_cooldown() {
        let h = harness(Vec::new());
        h.inventory.insert(funded(A, 1000));
        let now = Utc::now();

        let pay = |game: Game| async move {
            let target = participant(B);
            game.pay(A, Some(&target), 500, now).await
        };
        let (first, second) = tokio::join!(
            tokio::spawn(pay(h.game.clone())),
            tokio::spawn(pay(h.game.clone()))
        );
        let results = [first.unwrap(), second.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(GameError::Cooldown { .. })))
        );
        assert_eq!(h.inventory.snapshot(A).unwrap().balance, 500);
        assert_eq!(h.inventory.snapshot(B).unwrap().balance, 500);
    }

    #[tokio::test]
    async fn test_failed_explore_keeps_no_cooldown() {
        let h = harness(Vec::new());
        h.inventory.fail_credits(3);
        let now = Utc::now();

        assert!(matches!(
            h.game.explore(A, now).await,
            Err(GameError::TransientStoreFailure(_))
        ));
        assert!(h.game.explore(A, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_payment_keeps_no_cooldown() {
        let h = harness(Vec::new());
        h.inventory.insert(funded(A, 1000));
        h.inventory.fail_credits(3);
        let now = Utc::now();

        assert!(h.game.pay(A, Some(&participant(B)), 400, now).await.is_err());
        assert!(h.game.pay(A, Some(&participant(B)), 400, now).await.is_ok());
        assert_eq!(h.inventory.snapshot(B).unwrap().balance, 400);
    }

    #[tokio::test]
    async fn test_profile_of_new_user_is_empty() {
        let h = harness(Vec::new());
        let profile = h.game.profile(A, Utc::now()).await.unwrap();
        assert_eq!(profile.balance, 0);
        assert_eq!(profile.characters, 0);
        assert!(profile.favorite.is_none());
        assert!(profile.pay_ready_in.is_none());
    }

    #[tokio::test]
    async fn test_profile_shows_running_cooldowns() {
        let h = harness(Vec::new());
        let now = Utc::now();
        h.game.explore(A, now).await.unwrap();

        let profile = h.game.profile(A, now + ChronoDuration::minutes(1)).await.unwrap();
        assert_eq!(profile.explore_ready_in, Some(Duration::from_secs(4 * 60)));
        assert!(profile.pay_ready_in.is_none());
    }
}
