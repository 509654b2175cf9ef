//! Level-1 cache: bounded in-memory LRU keyed by job.
//!
//! The capacity is an entry count, normally derived from the size of the
//! rendering surface with [`MemoryTileCache::capacity_for_screen`]. When a
//! `put` overflows the capacity the least recently accessed entry goes first.
//! Entries that were never accessed after insertion are ordered by insertion,
//! oldest first.
//!
//! The `lru` crate keeps recency in a linked hash map. Access is serialized
//! behind a `parking_lot` mutex held only for the map operation itself.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::job::Job;

use super::bitmap::TileBitmap;

/// Extra tiles kept beyond the visible grid.
pub const CAPACITY_MARGIN: usize = 4;

/// Default overdraw factor for sizing the memory level.
pub const DEFAULT_OVERDRAW: f64 = 1.2;

/// In-memory tile cache with least-recently-used eviction.
pub struct MemoryTileCache {
    /// `None` when the capacity is zero: every put is dropped.
    entries: Mutex<Option<LruCache<Job, TileBitmap>>>,
    capacity: usize,
    evictions: AtomicU64,
}

impl MemoryTileCache {
    /// Create a memory cache holding at most `capacity` tiles.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(NonZeroUsize::new(capacity).map(LruCache::new)),
            capacity,
            evictions: AtomicU64::new(0),
        }
    }

    /// Number of tiles needed to cover a `width` x `height` surface.
    ///
    /// The surface is scaled by `overdraw`, rounded up to whole tiles plus one
    /// partial tile per axis, and padded with [`CAPACITY_MARGIN`].
    ///
    /// # Example
    ///
    /// ```
    /// use tileflow::cache::MemoryTileCache;
    ///
    /// // 1024x768 at 1.0 overdraw: (4+1) * (3+1) + 4
    /// assert_eq!(MemoryTileCache::capacity_for_screen(1024, 768, 256, 1.0), 24);
    /// ```
    pub fn capacity_for_screen(width: u32, height: u32, tile_size: u32, overdraw: f64) -> usize {
        let tile_size = tile_size.max(1) as f64;
        let overdraw = if overdraw.is_finite() && overdraw > 0.0 {
            overdraw
        } else {
            1.0
        };
        let columns = (width as f64 * overdraw / tile_size).ceil() as usize + 1;
        let rows = (height as f64 * overdraw / tile_size).ceil() as usize + 1;
        columns * rows + CAPACITY_MARGIN
    }

    /// Look up a tile, marking it as most recently used.
    pub fn get(&self, job: &Job) -> Option<TileBitmap> {
        self.entries.lock().as_mut()?.get(job).cloned()
    }

    /// Look up a tile without touching its recency.
    pub fn peek(&self, job: &Job) -> Option<TileBitmap> {
        self.entries.lock().as_ref()?.peek(job).cloned()
    }

    /// Whether a tile is present, without touching its recency.
    pub fn contains(&self, job: &Job) -> bool {
        self.entries
            .lock()
            .as_ref()
            .is_some_and(|entries| entries.contains(job))
    }

    /// Insert or replace a tile, evicting the least recently used on overflow.
    pub fn put(&self, job: Job, bitmap: TileBitmap) {
        let mut guard = self.entries.lock();
        let Some(entries) = guard.as_mut() else {
            return;
        };
        if let Some((evicted, _)) = entries.push(job.clone(), bitmap) {
            if evicted != job {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Remove a tile. Returns whether it was present.
    pub fn remove(&self, job: &Job) -> bool {
        self.entries
            .lock()
            .as_mut()
            .is_some_and(|entries| entries.pop(job).is_some())
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Some(entries) = self.entries.lock().as_mut() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().as_ref().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries evicted by capacity overflow.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for MemoryTileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTileCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("evictions", &self.evictions())
            .finish()
    }
}
