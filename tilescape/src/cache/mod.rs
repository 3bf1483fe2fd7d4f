//! Capacity-bounded keyed caches for decoded tiles.
//!
//! [`LruCache`] is the generic O(1) recency cache; [`ImageCache`] layers the
//! tile-oriented high-water-mark eviction policy on top of it. Both are
//! mutated from a single logical execution context only; there is no internal
//! locking.

mod image;
mod lru;

pub use image::{ImageCache, DEFAULT_HIGH_WATER_MARK};
pub use lru::LruCache;
