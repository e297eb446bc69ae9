//! Configuration module for the gacha bot.
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

/// Bot running mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// Game tunables.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Lifetime of a gift/favorite/transfer prompt.
    pub confirm_ttl: Duration,
    pub pay_cooldown: Duration,
    pub explore_cooldown: Duration,
    pub claim_cooldown: Duration,
    /// A claim older than this breaks the streak.
    pub streak_window: Duration,
    /// Every n-th consecutive claim is a `Special` one.
    pub streak_bonus_every: u32,
    /// Tries for a store write that must not be dropped.
    pub store_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            confirm_ttl: Duration::from_secs(60),
            pay_cooldown: Duration::from_secs(30 * 60),
            explore_cooldown: Duration::from_secs(5 * 60),
            claim_cooldown: Duration::from_secs(24 * 3600),
            streak_window: Duration::from_secs(48 * 3600),
            streak_bonus_every: 7,
            store_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Bot username (without @). Fetched via getMe if not set.
    pub bot_username: Option<String>,

    /// Owner user IDs (comma-separated). Owners may use /transfer and /kill.
    pub owner_ids: Vec<u64>,

    /// Chat receiving audit entries. Audit goes to the log only if unset.
    pub log_channel_id: Option<i64>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    pub game: GameSettings,
}

/// Parse a comma-separated id list, skipping anything that isn't a number.
fn parse_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect()
}

fn secs_var(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables are not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bot_mode = match env::var("BOT_MODE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = env::var("WEBHOOK_URL").ok();
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            panic!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        let bot_username = env::var("BOT_USERNAME")
            .ok()
            .map(|s| s.trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty());

        let defaults = GameSettings::default();
        let game = GameSettings {
            confirm_ttl: secs_var("CONFIRM_TTL_SECS", defaults.confirm_ttl),
            pay_cooldown: secs_var("PAY_COOLDOWN_SECS", defaults.pay_cooldown),
            explore_cooldown: secs_var("EXPLORE_COOLDOWN_SECS", defaults.explore_cooldown),
            ..defaults
        };

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            bot_mode,
            webhook_url,
            webhook_port: env::var("WEBHOOK_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8443),
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            bot_username,
            owner_ids: parse_ids(&env::var("OWNER_IDS").unwrap_or_default()),
            log_channel_id: env::var("LOG_CHANNEL_ID")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            mongodb_uri: env::var("MONGODB_URI").expect("MONGODB_URI must be set"),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "gachabot".to_string()),
            game,
        }
    }
}
