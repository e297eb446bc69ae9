//! Gachabot - collectible anime characters for Telegram.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB integration behind store traits
//! - `cache` - Moka caches backing the cooldowns
//! - `game` - Game rules: cooldowns, rewards, pending actions, transfers
//! - `bot` - Dispatcher, runners and the audit channel
//! - `plugins` - Command and button handlers
//! - `events` - Background cleanup of expired prompts
//! - `utils` - Formatting helpers

mod bot;
mod cache;
mod config;
mod database;
mod events;
mod game;
mod plugins;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bot::dispatcher::AppState;
use bot::ChannelAudit;
use cache::CacheRegistry;
use config::Config;
use database::{CatalogRepo, Database, InventoryRepo};
use game::{AuditSink, Game, TracingAudit};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Default to info for our crate if RUST_LOG is not set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gachabot=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting gachabot...");

    let config = Config::from_env();
    info!("Configuration loaded, bot mode: {:?}", config.bot_mode);

    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    let inventory = Arc::new(InventoryRepo::new(&db));
    inventory.ensure_indexes().await?;
    info!("Database connected");

    let cache = CacheRegistry::new();
    let catalog = Arc::new(CatalogRepo::new(&db));

    // Throttle respects Telegram's per-chat and global rate limits.
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    let bot_username = config
        .bot_username
        .clone()
        .unwrap_or_else(|| me.username().to_string());
    info!("Using bot username: @{}", bot_username);

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let audit: Arc<dyn AuditSink> = match config.log_channel_id {
        Some(channel) => {
            info!("Audit entries go to chat {}", channel);
            Arc::new(ChannelAudit::new(bot.clone(), channel))
        }
        None => Arc::new(TracingAudit),
    };

    let (game, expired) = Game::new(
        inventory,
        catalog,
        audit,
        &cache,
        config.game.clone(),
        config.owner_ids.clone(),
    );
    events::spawn_expiry_cleanup(bot.clone(), expired);
    info!("Caches: {:?}", cache.cache_names());

    let state = AppState::new(game, bot_username);
    let dispatcher = bot::build_dispatcher(bot.clone(), state);

    bot::run(&config, bot, dispatcher).await;

    Ok(())
}
