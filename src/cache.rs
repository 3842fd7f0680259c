//! Bounded lookup cache shared by request handlers.
//!
//! Maps a normalised query string to its resolved [`Location`]. The cache
//! is the only mutable state shared between lookups; a single mutex guards
//! it and is never held while a database is being read.

use crate::record::Location;
use lru::LruCache;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Default number of cached queries
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

type Cache = LruCache<String, Location, BuildHasherDefault<rustc_hash::FxHasher>>;

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to query a database
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate between 0.0 and 1.0
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of resolved locations
pub struct LookupCache {
    /// `None` when caching is disabled (capacity 0)
    inner: Option<Mutex<Cache>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl LookupCache {
    /// Create a cache holding at most `capacity` entries; 0 disables it
    pub fn new(capacity: usize) -> Self {
        let inner = NonZeroUsize::new(capacity).map(|cap| {
            Mutex::new(LruCache::with_hasher(
                cap,
                BuildHasherDefault::<rustc_hash::FxHasher>::default(),
            ))
        });
        Self {
            inner,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, Cache>> {
        // Entries are inserted whole; a poisoned lock still holds a usable map.
        self.inner
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Look up a cached value, marking it most recently used
    pub fn get(&self, key: &str) -> Option<Location> {
        let found = self.lock().and_then(|mut cache| cache.get(key).cloned());
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Insert a value, evicting the least recently used entry when full
    pub fn put(&self, key: impl Into<String>, value: Location) {
        if let Some(mut cache) = self.lock() {
            cache.put(key.into(), value);
        }
    }

    /// Return the cached value or compute and cache it.
    ///
    /// `compute` runs without the lock held; errors are returned and not
    /// cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: &str, compute: F) -> Result<Location, E>
    where
        F: FnOnce() -> Result<Location, E>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.put(key, value.clone());
        Ok(value)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries (0 when disabled)
    pub fn capacity(&self) -> usize {
        self.lock().map(|c| c.cap().get()).unwrap_or(0)
    }

    /// True if key is cached, without touching recency or counters
    pub fn contains(&self, key: &str) -> bool {
        self.lock().map(|c| c.contains(key)).unwrap_or(false)
    }

    /// Drop all entries
    pub fn clear(&self) {
        if let Some(mut cache) = self.lock() {
            cache.clear();
        }
    }

    /// Current hit/miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn loc(n: usize) -> Location {
        Location::new(format!("country{}", n), format!("area{}", n))
    }

    #[test]
    fn test_get_put() {
        let cache = LookupCache::new(10);
        assert!(cache.get("1.1.1.1").is_none());
        cache.put("1.1.1.1", loc(1));
        assert_eq!(cache.get("1.1.1.1"), Some(loc(1)));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        assert_eq!(cache.stats().hit_rate(), 0.5);
    }

    #[test]
    fn test_capacity_bound() {
        let cache = LookupCache::default();
        for i in 0..DEFAULT_CACHE_CAPACITY {
            cache.put(format!("key{}", i), loc(i));
        }
        assert_eq!(cache.len(), 1000);

        cache.put("key-new", loc(9999));
        assert_eq!(cache.len(), 1000);
        assert_eq!(cache.capacity(), 1000);
        assert!(cache.contains("key-new"));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LookupCache::new(2);
        cache.put("a", loc(1));
        cache.put("b", loc(2));
        // Touch "a" so "b" becomes the eviction candidate
        assert!(cache.get("a").is_some());
        cache.put("c", loc(3));
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_disabled() {
        let cache = LookupCache::new(0);
        cache.put("a", loc(1));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 0);
    }

    #[test]
    fn test_get_or_try_insert_with() {
        let cache = LookupCache::new(4);
        let first: Result<_, String> = cache.get_or_try_insert_with("k", || Ok(loc(1)));
        assert_eq!(first.unwrap(), loc(1));

        // Second call is served from cache; the closure would fail
        let second: Result<_, String> =
            cache.get_or_try_insert_with("k", || Err("not called".to_string()));
        assert_eq!(second.unwrap(), loc(1));

        let failed: Result<Location, String> =
            cache.get_or_try_insert_with("bad", || Err("boom".to_string()));
        assert!(failed.is_err());
        assert!(!cache.contains("bad"));
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(LookupCache::new(100));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.put(format!("{}-{}", t, i), loc(i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 100);
    }

    #[test]
    fn test_clear() {
        let cache = LookupCache::new(4);
        cache.put("a", loc(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
