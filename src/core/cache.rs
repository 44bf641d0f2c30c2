//! Generic bounded cache with LRU eviction
//!
//! Structure: Mutex<LruCache<K, V>> + atomic statistics
//! - One lock guards all entry storage, so concurrent callers never see a
//!   half-applied mutation of an entry
//! - Capacity is explicit (`cache_capacity` setting); the least recently used
//!   entry is evicted when it is exceeded
//!
//! A miss is a normal outcome, never an error: an entry may vanish at any
//! time through eviction.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use lru::LruCache;

/// Default entry capacity
pub const DEFAULT_CAPACITY: usize = 64;

/// Cache statistics for monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

/// Key/value cache safe to share between threads (wrap in `Arc`).
#[derive(Debug)]
pub struct GenericCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, V>>,
    stats: CacheStats,
}

impl<K, V> Default for GenericCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<K, V> GenericCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create cache holding at most `capacity` entries (min 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        trace!("GenericCache created: capacity={}", capacity);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: CacheStats::new(),
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert(&self, value: V, key: K) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        // push() hands back either the replaced entry for `key` or the evicted LRU entry
        if let Some((old_key, _)) = entries.push(key.clone(), value) {
            if old_key != key {
                self.stats.record_eviction();
                trace!("Cache evicted {:?}", old_key);
            }
        }
        trace!("Cache insert {:?} ({} entries)", key, entries.len());
    }

    /// Stored value for `key`, or None if never inserted, removed or evicted.
    pub fn value(&self, key: &K) -> Option<V> {
        let result = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned();

        if result.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        result
    }

    /// Explicit invalidation. No-op if absent.
    pub fn remove_value(&self, key: &K) {
        let removed = self.entries.lock().unwrap_or_else(|e| e.into_inner()).pop(key);
        if removed.is_some() {
            trace!("Cache removed {:?}", key);
        }
    }

    /// Keys currently held, most recently used first
    pub fn keys(&self) -> Vec<K> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let count = entries.len();
        entries.clear();
        trace!("Cache invalidated ({} entries)", count);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).cap().get()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_insert_then_value() {
        let cache: GenericCache<String, Vec<u32>> = GenericCache::new(8);
        cache.insert(vec![1, 2, 3], "a".to_string());
        assert_eq!(cache.value(&"a".to_string()), Some(vec![1, 2, 3]));

        // Overwrite
        cache.insert(vec![9], "a".to_string());
        assert_eq!(cache.value(&"a".to_string()), Some(vec![9]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions(), 0);
    }

    #[test]
    fn test_miss_is_not_error() {
        let cache: GenericCache<u32, String> = GenericCache::new(4);
        assert_eq!(cache.value(&7), None);

        cache.insert("x".into(), 7);
        cache.remove_value(&7);
        assert_eq!(cache.value(&7), None);

        // Removing twice is fine
        cache.remove_value(&7);
        assert_eq!(cache.stats().misses(), 2);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache: GenericCache<u32, u32> = GenericCache::new(2);
        cache.insert(10, 1);
        cache.insert(20, 2);
        // Touch 1 so 2 becomes least recently used
        assert_eq!(cache.value(&1), Some(10));
        cache.insert(30, 3);

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache: GenericCache<u32, u32> = GenericCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(1, 1);
        assert_eq!(cache.value(&1), Some(1));
    }

    #[test]
    fn test_keys_and_invalidate_all() {
        let cache: GenericCache<&'static str, u8> = GenericCache::new(4);
        cache.insert(1, "one");
        cache.insert(2, "two");
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["one", "two"]);

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_statistics() {
        let cache: GenericCache<u8, u8> = GenericCache::new(4);
        cache.insert(1, 1);
        let _ = cache.value(&1);
        let _ = cache.value(&2);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hit_rate(), 0.5);

        cache.stats().reset();
        assert_eq!(cache.stats().hits(), 0);
    }

    #[test]
    fn test_concurrent_writers() {
        let cache: Arc<GenericCache<u32, u32>> = Arc::new(GenericCache::new(1024));
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100u32 {
                        let key = t * 1000 + i;
                        cache.insert(key * 2, key);
                        assert_eq!(cache.value(&key), Some(key * 2));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
