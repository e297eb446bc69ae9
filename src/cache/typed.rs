//! Typed handle over a Moka cache.

use std::hash::Hash;
use std::sync::Arc;

use moka::ops::compute::Op;
use moka::sync::Cache;

use super::CacheConfig;

/// Thread-safe, LRU-bounded cache with optional TTL/TTI.
///
/// Clones share the same underlying storage.
pub struct TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
    name: Arc<str>,
}

// Derive would require `K: Clone`.
impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: builder.build(),
            name: name.into(),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Value for `key` if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Read and update the entry for `key` in one step.
    ///
    /// `f` sees the current value and decides to keep it (`Op::Nop`),
    /// replace it (`Op::Put`) or drop it (`Op::Remove`). Other updates of
    /// the same key wait until it returns.
    pub fn compute<F>(&self, key: K, f: F)
    where
        F: FnOnce(Option<V>) -> Op<V>,
    {
        let _ = self
            .inner
            .entry(key)
            .and_compute_with(|entry| f(entry.map(|e| e.into_value())));
    }
}

impl<K, V> std::fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let cache: TypedCache<u64, String> = TypedCache::new("t", CacheConfig::default());
        let other = cache.clone();

        cache.insert(1, "one".to_string());
        assert_eq!(other.get(&1).as_deref(), Some("one"));

        other.compute(1, |_| Op::Remove);
        assert!(cache.get(&1).is_none());
    }

    #[test]
    fn test_compute_sees_current_value() {
        let cache: TypedCache<u64, u32> = TypedCache::new("t", CacheConfig::default());

        cache.compute(7, |current| {
            assert!(current.is_none());
            Op::Put(1)
        });
        cache.compute(7, |current| Op::Put(current.unwrap_or(0) + 1));
        cache.compute(7, |_| Op::Nop);
        assert_eq!(cache.get(&7), Some(2));
    }
}
