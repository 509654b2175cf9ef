//! Cache statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by the memory level.
    pub memory_hits: u64,
    /// Lookups answered by the persistent level.
    pub disk_hits: u64,
    /// Lookups answered by neither level.
    pub misses: u64,
    /// Entries copied from the persistent level into the memory level.
    pub promotions: u64,
    /// Entries evicted from the memory level.
    pub memory_evictions: u64,
    /// Entries evicted from the persistent level.
    pub disk_evictions: u64,
    /// Entries currently held in memory.
    pub memory_entries: u64,
    /// Entries currently held on disk.
    pub disk_entries: u64,
    /// Bytes currently held on disk.
    pub disk_bytes: u64,
}

impl CacheStats {
    /// Fraction of lookups answered by either level.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.disk_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory {} entries ({} hits, {} evicted), disk {} entries / {} bytes ({} hits, {} evicted), {} misses, {} promotions",
            self.memory_entries,
            self.memory_hits,
            self.memory_evictions,
            self.disk_entries,
            self.disk_bytes,
            self.disk_hits,
            self.disk_evictions,
            self.misses,
            self.promotions
        )
    }
}

/// Lock-free lookup counters owned by the two-level cache.
#[derive(Debug, Default)]
pub(crate) struct LookupCounters {
    pub memory_hits: AtomicU64,
    pub disk_hits: AtomicU64,
    pub misses: AtomicU64,
    pub promotions: AtomicU64,
}

impl LookupCounters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
