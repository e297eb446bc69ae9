//! Cache configuration.

use std::time::Duration;

/// Capacity and expiry of one cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries.
    pub max_capacity: u64,

    /// Entries are evicted this long after insertion.
    pub ttl: Option<Duration>,

    /// Entries are evicted if not read for this long.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(300)),
            tti: None,
        }
    }
}

impl CacheConfig {
    /// Per-user timestamps that only matter for `window`.
    ///
    /// Anything older than the window carries no information, so it is
    /// allowed to fall out.
    pub fn cooldown(window: Duration) -> Self {
        Self {
            max_capacity: 100_000,
            ttl: Some(window),
            tti: None,
        }
    }
}
