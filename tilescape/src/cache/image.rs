//! Tile/image cache with high-water-mark eviction.
//!
//! [`ImageCache`] holds decoded tiles keyed by their cache key and trims
//! itself back toward a high-water mark when asked. Expiry respects a protect
//! set of keys the current frame still draws from: the sweep stops the moment
//! the oldest entry is protected, so occupancy can legitimately stay above
//! the mark for as long as every remaining entry is in use.

use std::collections::HashSet;
use std::hash::Hash;

use super::LruCache;

/// Default maximum occupancy before [`ImageCache::expire_cache`] trims.
pub const DEFAULT_HIGH_WATER_MARK: usize = 1000;

/// LRU cache of decoded tiles with a high-water-mark eviction policy.
#[derive(Debug, Clone)]
pub struct ImageCache<K, V> {
    cache: LruCache<K, V>,
    high_water_mark: usize,
}

impl<K: Eq + Hash + Clone, V> Default for ImageCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, V> ImageCache<K, V> {
    /// Create a cache with the default high-water mark.
    pub fn new() -> Self {
        Self::with_high_water_mark(DEFAULT_HIGH_WATER_MARK)
    }

    /// Create a cache that trims toward `high_water_mark` entries.
    pub fn with_high_water_mark(high_water_mark: usize) -> Self {
        Self {
            cache: LruCache::new(),
            high_water_mark,
        }
    }

    /// The configured high-water mark.
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Whether `key` is cached (does not affect recency).
    pub fn contains_key(&self, key: &K) -> bool {
        self.cache.contains_key(key)
    }

    /// Insert a newly decoded tile. See [`LruCache::set`].
    pub fn set(&mut self, key: K, value: V) {
        self.cache.set(key, value);
    }

    /// Look up a tile, promoting it on a hit. A miss means the caller should
    /// fetch and [`ImageCache::set`].
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.cache.get(key)
    }

    /// Mutable lookup, promoting on a hit.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.cache.get_mut(key)
    }

    /// Overwrite an existing tile, bumping its recency.
    pub fn replace(&mut self, key: K, value: V) {
        self.cache.replace(key, value);
    }

    /// Remove and return the least recently used tile.
    pub fn pop(&mut self) -> Option<V> {
        self.cache.pop()
    }

    /// Drop every tile.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Whether occupancy is above the high-water mark.
    pub fn can_expire_cache(&self) -> bool {
        self.cache.len() > self.high_water_mark
    }

    /// Trim oldest-first toward the high-water mark.
    ///
    /// `used_keys` protects entries the current frame still references. The
    /// sweep stops early the moment the oldest entry is protected, even if
    /// occupancy is still above the mark.
    pub fn expire_cache(&mut self, used_keys: Option<&HashSet<K>>) {
        let mut removed = 0usize;
        while self.can_expire_cache() {
            let protected = match self.cache.peek_oldest_key() {
                Some(key) => used_keys.is_some_and(|used| used.contains(key)),
                None => break,
            };
            if protected {
                break;
            }
            self.cache.pop();
            removed += 1;
        }
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = self.cache.len(),
                high_water_mark = self.high_water_mark,
                "expired cache entries"
            );
        }
    }

    /// Structural check of the underlying recency list; see
    /// [`LruCache::assert_list_valid`].
    pub fn assert_list_valid(&self) {
        self.cache.assert_list_valid();
    }
}
