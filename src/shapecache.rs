//! Fingerprint-keyed coverage-bitmap reuse: a fixed-slot, open-addressed
//! cache in front of the scanline engine (spec.md §4, "Shape cache entry").
//!
//! Grounded in `gradient.rs`'s lazily-primed LUT (a small, fixed-size,
//! index-addressed table owned by the containing struct rather than a
//! generic `HashMap`) and in `texture.rs`'s `Buffer` (plain owned byte
//! data, no interior mutability).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::constants::SHAPE_CACHE_SLOTS;

/// One cached rasterization: the coverage bitmap a `fill`/`stroke` produced
/// the last time this exact edge-list/size combination was seen (spec.md
/// §4: "`(hash, width, height, uses, data[])`").
struct ShapeCacheEntry {
    hash: u64,
    width: u32,
    height: u32,
    uses: u32,
    data: Vec<u8>,
}

/// A bounded table mapping an edge-list fingerprint (plus its bitmap's
/// dimensions) to a pre-rasterized 8-bit coverage bitmap. Fixed slot count,
/// open-addressed placement from the hash (spec.md §4: "fixed slot count
/// (default 160)... open-addressed placement from hash"). Disabled by
/// default; the embedder turns it on at runtime once it has observed that a
/// scene repeats the same shapes frame over frame.
pub struct ShapeCache {
    slots: Vec<Option<ShapeCacheEntry>>,
    enabled: bool,
    queries: u32,
    hits: u32,
}

impl ShapeCache {
    pub fn new() -> ShapeCache {
        ShapeCache::with_slots(SHAPE_CACHE_SLOTS)
    }

    pub fn with_slots(slots: usize) -> ShapeCache {
        let mut v = Vec::with_capacity(slots.max(1));
        v.resize_with(slots.max(1), || None);
        ShapeCache { slots: v, enabled: false, queries: 0, hits: 0 }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn home(&self, hash: u64) -> usize {
        (hash as usize) % self.slots.len()
    }

    /// Looks up a previously cached bitmap for `(hash, width, height)`.
    /// Probes linearly from the hash's home slot until it finds a match, an
    /// empty slot (miss), or has walked the whole table.
    ///
    /// The query/hit counters reset every 1000 queries with no
    /// synchronization (spec.md §9: "under threading it may over- or
    /// under-count. Not load-bearing") — they're a coarse hit-rate signal
    /// for a caller deciding whether to enable the cache, not a correctness
    /// mechanism.
    pub fn lookup(&mut self, hash: u64, width: u32, height: u32) -> Option<&[u8]> {
        if !self.enabled {
            return None;
        }
        self.bump_query_counter();
        let len = self.slots.len();
        let home = self.home(hash);
        for step in 0..len {
            let idx = (home + step) % len;
            match &mut self.slots[idx] {
                Some(entry) if entry.hash == hash && entry.width == width && entry.height == height => {
                    entry.uses += 1;
                    self.hits += 1;
                    return Some(&entry.data);
                }
                None => return None,
                Some(_) => continue,
            }
        }
        None
    }

    fn bump_query_counter(&mut self) {
        self.queries += 1;
        if self.queries >= 1000 {
            self.queries = 0;
            self.hits = 0;
        }
    }

    /// Fraction of queries since the last 1000-query reset that hit an
    /// existing entry.
    pub fn hit_rate(&self) -> f32 {
        if self.queries == 0 {
            0.0
        } else {
            self.hits as f32 / self.queries as f32
        }
    }

    /// Inserts (or replaces) the bitmap for `(hash, width, height)`.
    /// Probes for an empty slot or a stale entry with the same hash first;
    /// falls back to evicting the home slot outright, freeing its old
    /// buffer and reallocating fresh (spec.md §4: "eviction frees and
    /// reallocates when size changes").
    pub fn insert(&mut self, hash: u64, width: u32, height: u32, data: Vec<u8>) {
        if !self.enabled {
            return;
        }
        let len = self.slots.len();
        let home = self.home(hash);
        for step in 0..len {
            let idx = (home + step) % len;
            match &self.slots[idx] {
                None => {
                    self.slots[idx] = Some(ShapeCacheEntry { hash, width, height, uses: 0, data });
                    return;
                }
                Some(entry) if entry.hash == hash => {
                    self.slots[idx] = Some(ShapeCacheEntry { hash, width, height, uses: 0, data });
                    return;
                }
                Some(_) => continue,
            }
        }
        self.slots[home] = Some(ShapeCacheEntry { hash, width, height, uses: 0, data });
    }

    /// Drops every entry, e.g. when the embedder disables the cache or
    /// resizes the surface.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

impl Default for ShapeCache {
    fn default() -> Self {
        ShapeCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_cache_never_stores_or_returns_anything() {
        let mut cache = ShapeCache::with_slots(8);
        cache.insert(42, 4, 4, vec![1, 2, 3, 4]);
        assert!(cache.lookup(42, 4, 4).is_none());
    }

    #[test]
    fn enabled_cache_round_trips_an_entry() {
        let mut cache = ShapeCache::with_slots(8);
        cache.set_enabled(true);
        cache.insert(42, 4, 4, vec![1, 2, 3, 4]);
        assert_eq!(cache.lookup(42, 4, 4), Some([1, 2, 3, 4].as_slice()));
    }

    #[test]
    fn same_hash_different_size_is_a_miss() {
        let mut cache = ShapeCache::with_slots(8);
        cache.set_enabled(true);
        cache.insert(7, 4, 4, vec![9; 16]);
        assert!(cache.lookup(7, 8, 8).is_none());
    }

    #[test]
    fn colliding_hashes_probe_to_a_different_slot() {
        let mut cache = ShapeCache::with_slots(2);
        cache.set_enabled(true);
        // Both hashes land on slot 0 in a 2-slot table.
        cache.insert(0, 1, 1, vec![1]);
        cache.insert(2, 1, 1, vec![2]);
        assert_eq!(cache.lookup(0, 1, 1), Some([1].as_slice()));
        assert_eq!(cache.lookup(2, 1, 1), Some([2].as_slice()));
    }

    #[test]
    fn hit_rate_reflects_queries_since_last_reset() {
        let mut cache = ShapeCache::with_slots(8);
        cache.set_enabled(true);
        cache.insert(1, 1, 1, vec![1]);
        cache.lookup(1, 1, 1);
        cache.lookup(2, 1, 1);
        assert!((cache.hit_rate() - 0.5).abs() < 1e-6);
    }
}
