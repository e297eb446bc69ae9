//! Cache registry - one place that owns every named cache.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error};

use super::{CacheConfig, TypedCache};

/// Registry of named, typed caches.
///
/// Components ask for a cache by name; the first caller creates it with
/// its config, later callers get the same storage.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cache registered under `name`, creating it if absent.
    ///
    /// A name registered with different key/value types yields a fresh,
    /// unregistered cache and logs an error rather than aliasing storage.
    pub fn get_or_create<K, V>(&self, name: &str, config: CacheConfig) -> TypedCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if let Some(existing) = self.caches.read().get(name) {
            return Self::downcast(name, existing.as_ref(), config);
        }

        let mut caches = self.caches.write();
        if let Some(existing) = caches.get(name) {
            return Self::downcast(name, existing.as_ref(), config);
        }

        debug!("Creating cache: {}", name);
        let cache = TypedCache::<K, V>::new(name, config);
        caches.insert(name.to_string(), Box::new(cache.clone()));
        cache
    }

    fn downcast<K, V>(
        name: &str,
        existing: &(dyn Any + Send + Sync),
        config: CacheConfig,
    ) -> TypedCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match existing.downcast_ref::<TypedCache<K, V>>() {
            Some(cache) => cache.clone(),
            None => {
                error!(
                    "Cache '{}' already registered with other types than {}",
                    name,
                    std::any::type_name::<TypedCache<K, V>>()
                );
                TypedCache::new(name, config)
            }
        }
    }

    /// Names of all registered caches.
    pub fn cache_names(&self) -> Vec<String> {
        self.caches.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("cache_names", &self.cache_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_shares_cache() {
        let registry = CacheRegistry::new();
        let a: TypedCache<u64, i64> = registry.get_or_create("balances", CacheConfig::default());
        let b: TypedCache<u64, i64> = registry.get_or_create("balances", CacheConfig::default());

        a.insert(5, 10);
        assert_eq!(b.get(&5), Some(10));
        assert_eq!(registry.cache_names(), vec!["balances".to_string()]);
    }

    #[test]
    fn test_type_mismatch_gets_detached_cache() {
        let registry = CacheRegistry::new();
        let a: TypedCache<u64, i64> = registry.get_or_create("x", CacheConfig::default());
        let b: TypedCache<u64, String> = registry.get_or_create("x", CacheConfig::default());

        a.insert(1, 1);
        assert!(b.get(&1).is_none());
    }
}
