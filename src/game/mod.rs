//! Game rules.
//!
//! Everything here is transport-agnostic: services take user ids and
//! return structured outcomes or a [`GameError`]; the plugins render them.
//!
//! - `cooldown` - per-user cooldown gates
//! - `sampler` - rarity-weighted character rewards
//! - `pending` / `confirm` - proposals awaiting a confirm/cancel button
//! - `applier` - moves characters between inventories
//! - `audit` - trail of committed mutations
//! - `gift`, `claim`, `economy` - the services built on top

pub mod applier;
pub mod audit;
pub mod claim;
pub mod confirm;
pub mod cooldown;
pub mod economy;
pub mod error;
pub mod gift;
pub mod pending;
pub mod sampler;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::cache::CacheRegistry;
use crate::config::GameSettings;
use crate::database::{CharacterCatalog, InventoryStore};

use applier::MutationApplier;
use cooldown::CooldownTracker;
use pending::PendingStore;
use sampler::{RewardSampler, TierTable};

pub use audit::{AuditSink, TracingAudit};
pub use confirm::{Decision, callback_data, parse_callback};
pub use error::{GameError, GameResult};
pub use gift::{ActionOutcome, Participant};
pub use pending::{ActionPayload, ActionTicket, PendingAction, PromptRef};

/// Service facade holding every piece of game state.
///
/// Built once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct Game {
    inventory: Arc<dyn InventoryStore>,
    sampler: RewardSampler,
    pending: PendingStore,
    applier: MutationApplier,
    audit: Arc<dyn AuditSink>,
    pay_cooldown: CooldownTracker,
    explore_cooldown: CooldownTracker,
    settings: GameSettings,
    owner_ids: Arc<[u64]>,
}

impl Game {
    /// Build the game services.
    ///
    /// Also returns the stream of expired pending actions, whose prompts
    /// should be cleaned up by the caller.
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        catalog: Arc<dyn CharacterCatalog>,
        audit: Arc<dyn AuditSink>,
        cache: &CacheRegistry,
        settings: GameSettings,
        owner_ids: Vec<u64>,
    ) -> (Self, mpsc::UnboundedReceiver<PendingAction>) {
        let (pending, expired) = PendingStore::new();
        let sampler = RewardSampler::new(catalog, inventory.clone(), TierTable::default());
        let applier = MutationApplier::new(
            inventory.clone(),
            audit.clone(),
            settings.store_attempts,
            settings.retry_backoff,
        );
        let pay_cooldown = CooldownTracker::new("cooldown_pay", settings.pay_cooldown, cache);
        let explore_cooldown =
            CooldownTracker::new("cooldown_explore", settings.explore_cooldown, cache);

        let game = Self {
            inventory,
            sampler,
            pending,
            applier,
            audit,
            pay_cooldown,
            explore_cooldown,
            settings,
            owner_ids: owner_ids.into(),
        };
        (game, expired)
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_ids.contains(&user_id)
    }
}
