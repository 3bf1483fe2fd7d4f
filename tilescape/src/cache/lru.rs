//! Generic least-recently-used cache.
//!
//! The recency list is an indexed intrusive doubly linked list: entries live
//! in a slot vector, links are slot indices, and freed slots are reused
//! through a free list. A `HashMap` maps keys to slots. Every operation is
//! O(1): `get` splices the hit entry out of the list and relinks it as the
//! newest, `pop` unlinks the oldest.
//!
//! # Invariant
//!
//! Walking `newest -> older` exactly `len()` times reaches the oldest entry,
//! and the symmetric reverse walk holds. [`LruCache::assert_list_valid`]
//! checks both walks and is exercised by the test suites of this module and
//! of callers.
//!
//! # Misses
//!
//! A lookup on an absent key is not an error. `get` returns `None` and the
//! caller decides the fallback, typically fetch-then-`set`.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    /// Slot index of the next more recently used entry.
    newer: Option<usize>,
    /// Slot index of the next less recently used entry.
    older: Option<usize>,
}

/// O(1) keyed cache with least-recently-used ordering.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    newest: Option<usize>,
    oldest: Option<usize>,
}

impl<K: Eq + Hash + Clone, V> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            newest: None,
            oldest: None,
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether `key` is present (does not affect recency).
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert a new entry as the most recently used.
    ///
    /// The key must not already be present; inserting a duplicate key is a
    /// caller bug and fails fast. Use [`LruCache::replace`] to overwrite.
    pub fn set(&mut self, key: K, value: V) {
        assert!(
            !self.index.contains_key(&key),
            "key is already in the cache, use replace() to overwrite"
        );
        let entry = Entry {
            key: key.clone(),
            value,
            newer: None,
            older: self.newest,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        if let Some(prev) = self.newest {
            if let Some(e) = self.slots[prev].as_mut() {
                e.newer = Some(slot);
            }
        }
        self.newest = Some(slot);
        if self.oldest.is_none() {
            self.oldest = Some(slot);
        }
        self.index.insert(key, slot);
    }

    /// Look up `key`, promoting the entry to most recently used on a hit.
    ///
    /// Returns `None` on a miss; a miss is an expected outcome, not an error.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.promote(slot);
        self.slots[slot].as_ref().map(|e| &e.value)
    }

    /// Mutable variant of [`LruCache::get`]; promotes on a hit.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = *self.index.get(key)?;
        self.promote(slot);
        self.slots[slot].as_mut().map(|e| &mut e.value)
    }

    /// Look up `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_ref().map(|e| &e.value)
    }

    /// The key that [`LruCache::pop`] would remove next.
    pub fn peek_oldest_key(&self) -> Option<&K> {
        self.oldest
            .and_then(|slot| self.slots[slot].as_ref())
            .map(|e| &e.key)
    }

    /// Remove and return the least recently used value.
    pub fn pop(&mut self) -> Option<V> {
        let slot = self.oldest?;
        let entry = self.slots[slot].take()?;
        self.oldest = entry.newer;
        match entry.newer {
            Some(newer) => {
                if let Some(e) = self.slots[newer].as_mut() {
                    e.older = None;
                }
            }
            None => self.newest = None,
        }
        self.index.remove(&entry.key);
        self.free.push(slot);
        Some(entry.value)
    }

    /// Overwrite the value of an existing entry, bumping its recency first.
    ///
    /// The key must be present; replacing an absent key fails fast.
    pub fn replace(&mut self, key: K, value: V) {
        assert!(
            self.index.contains_key(&key),
            "replace() requires the key to be present, use set() to insert"
        );
        // get() splices the entry to the newest position
        let _ = self.get(&key);
        if let Some(&slot) = self.index.get(&key) {
            if let Some(e) = self.slots[slot].as_mut() {
                e.value = value;
            }
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.newest = None;
        self.oldest = None;
    }

    /// Splice `slot` out of the recency list and relink it as the newest.
    /// No-op when it already is the newest.
    fn promote(&mut self, slot: usize) {
        if self.newest == Some(slot) {
            return;
        }
        let (newer, older) = match self.slots[slot].as_ref() {
            Some(e) => (e.newer, e.older),
            None => return,
        };
        if let Some(n) = newer {
            if let Some(e) = self.slots[n].as_mut() {
                e.older = older;
            }
        }
        if let Some(o) = older {
            if let Some(e) = self.slots[o].as_mut() {
                e.newer = newer;
            }
        }
        if self.oldest == Some(slot) {
            self.oldest = newer;
        }
        let prev_newest = self.newest;
        if let Some(n) = prev_newest {
            if let Some(e) = self.slots[n].as_mut() {
                e.newer = Some(slot);
            }
        }
        if let Some(e) = self.slots[slot].as_mut() {
            e.older = prev_newest;
            e.newer = None;
        }
        self.newest = Some(slot);
    }

    /// Panic unless the doubly linked recency list is structurally sound:
    /// both directed walks visit exactly `len()` entries and terminate at
    /// the opposite end.
    pub fn assert_list_valid(&self) {
        let count = self.len();
        if count == 0 {
            assert!(self.newest.is_none() && self.oldest.is_none());
            return;
        }

        let mut steps = 0;
        let mut cursor = self.newest;
        let mut last = None;
        while let Some(slot) = cursor {
            steps += 1;
            assert!(steps <= count, "forward walk exceeds entry count");
            last = Some(slot);
            cursor = self.slots[slot].as_ref().and_then(|e| e.older);
        }
        assert_eq!(steps, count, "forward walk visited {} of {} entries", steps, count);
        assert_eq!(last, self.oldest, "forward walk did not end at the oldest entry");

        let mut steps = 0;
        let mut cursor = self.oldest;
        let mut last = None;
        while let Some(slot) = cursor {
            steps += 1;
            assert!(steps <= count, "reverse walk exceeds entry count");
            last = Some(slot);
            cursor = self.slots[slot].as_ref().and_then(|e| e.newer);
        }
        assert_eq!(steps, count, "reverse walk visited {} of {} entries", steps, count);
        assert_eq!(last, self.newest, "reverse walk did not end at the newest entry");
    }
}
