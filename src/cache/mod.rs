//! Named in-memory caches backed by Moka.
//!
//! - `CacheRegistry` hands out caches by name so one component can find a
//!   cache another one created.
//! - `TypedCache` is the cheap-to-clone handle.
//! - `CacheConfig` carries capacity and expiry.
//!
//! ```ignore
//! let last_used = registry.get_or_create::<u64, DateTime<Utc>>(
//!     "cooldown_pay",
//!     CacheConfig::cooldown(Duration::from_secs(1800)),
//! );
//! last_used.insert(user_id, Utc::now());
//! ```

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use typed::TypedCache;
