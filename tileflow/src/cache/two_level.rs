//! Two-level tile cache: memory in front of disk.
//!
//! ```text
//!            get(job)
//!               │
//!      ┌────────▼────────┐  hit
//!      │ MemoryTileCache │──────────────► bitmap
//!      └────────┬────────┘
//!               │ miss
//!      ┌────────▼────────┐  hit   promote into memory
//!      │  DiskTileCache  │──────────────► bitmap
//!      └────────┬────────┘
//!               │ miss
//!               ▼
//!             None
//! ```
//!
//! `put` writes through to both levels so they never disagree about a job.
//! Puts are serialized, so when writers race the last one to take the lock
//! wins in both levels.
//! Each level runs its own eviction. Lookups never block on production and
//! never report errors; disk failures surface as misses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::job::Job;

use super::bitmap::{is_stale, CachedTile, TileBitmap};
use super::disk::{DiskCacheConfig, DiskTileCache};
use super::error::CacheError;
use super::memory::MemoryTileCache;
use super::stats::{CacheStats, LookupCounters};

/// Memory level backed by a persistent level, with promotion on disk hits.
pub struct TwoLevelTileCache {
    memory: MemoryTileCache,
    disk: DiskTileCache,
    download_ttl: Duration,
    counters: LookupCounters,
    closed: AtomicBool,
    put_lock: Mutex<()>,
}

impl TwoLevelTileCache {
    /// Compose two already constructed levels.
    pub fn new(memory: MemoryTileCache, disk: DiskTileCache) -> Self {
        let download_ttl = disk.download_ttl();
        Self {
            memory,
            disk,
            download_ttl,
            counters: LookupCounters::default(),
            closed: AtomicBool::new(false),
            put_lock: Mutex::new(()),
        }
    }

    /// Build both levels from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the disk directory cannot be opened.
    pub fn open(memory_capacity: usize, disk: DiskCacheConfig) -> Result<Self, CacheError> {
        let disk = DiskTileCache::open(disk)?;
        info!(memory_capacity, "Two-level tile cache ready");
        Ok(Self::new(MemoryTileCache::new(memory_capacity), disk))
    }

    /// Look up a job's bitmap.
    ///
    /// A disk hit is copied into memory before it is returned. The result
    /// carries a stale flag when the bitmap should be produced again.
    pub fn get(&self, job: &Job) -> Option<CachedTile> {
        if self.is_closed() {
            return None;
        }

        if let Some(bitmap) = self.memory.get(job) {
            LookupCounters::bump(&self.counters.memory_hits);
            return Some(self.lookup_result(job, bitmap));
        }

        if let Some(bitmap) = self.disk.get(job) {
            LookupCounters::bump(&self.counters.disk_hits);
            self.memory.put(job.clone(), bitmap.clone());
            LookupCounters::bump(&self.counters.promotions);
            debug!(job = %job, "Promoted tile from disk to memory");
            return Some(self.lookup_result(job, bitmap));
        }

        LookupCounters::bump(&self.counters.misses);
        None
    }

    fn lookup_result(&self, job: &Job, bitmap: TileBitmap) -> CachedTile {
        let stale = is_stale(job, bitmap.stored_at(), self.download_ttl);
        CachedTile { bitmap, stale }
    }

    /// Store a bitmap in both levels.
    ///
    /// Jobs that are not cacheable (label-only renderings) are ignored.
    /// Puts are serialized across both levels: of two concurrent writers,
    /// the one that takes the lock last wins in memory and on disk alike.
    pub fn put(&self, job: &Job, bitmap: TileBitmap) {
        if self.is_closed() || !job.is_cacheable() {
            return;
        }
        let _guard = self.put_lock.lock();
        self.disk.put(job, &bitmap);
        self.memory.put(job.clone(), bitmap);
    }

    /// Whether either level holds the job. Never promotes.
    pub fn contains_key(&self, job: &Job) -> bool {
        !self.is_closed() && (self.memory.contains(job) || self.disk.contains(job))
    }

    /// Whether either level holds a bitmap for the job that is not stale.
    ///
    /// Never promotes and leaves the lookup counters alone.
    pub fn contains_fresh(&self, job: &Job) -> bool {
        if self.is_closed() {
            return false;
        }
        self.memory
            .peek(job)
            .or_else(|| self.disk.get(job))
            .is_some_and(|bitmap| !is_stale(job, bitmap.stored_at(), self.download_ttl))
    }

    /// Remove a job from both levels. Returns whether either held it.
    pub fn invalidate(&self, job: &Job) -> bool {
        let in_memory = self.memory.remove(job);
        let on_disk = self.disk.remove(job);
        in_memory || on_disk
    }

    /// Release both levels. Idempotent.
    ///
    /// Memory is freed and the disk index is closed; tile files remain for
    /// the next open.
    pub fn destroy(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.memory.clear();
        self.disk.destroy();
        info!("Two-level tile cache destroyed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The memory level.
    pub fn memory(&self) -> &MemoryTileCache {
        &self.memory
    }

    /// The persistent level.
    pub fn disk(&self) -> &DiskTileCache {
        &self.disk
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: LookupCounters::read(&self.counters.memory_hits),
            disk_hits: LookupCounters::read(&self.counters.disk_hits),
            misses: LookupCounters::read(&self.counters.misses),
            promotions: LookupCounters::read(&self.counters.promotions),
            memory_evictions: self.memory.evictions(),
            disk_evictions: self.disk.evictions(),
            memory_entries: self.memory.len() as u64,
            disk_entries: self.disk.len() as u64,
            disk_bytes: self.disk.total_bytes(),
        }
    }
}

impl Drop for TwoLevelTileCache {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{DisplayModel, DownloadJob, MapDataRef, RenderJob, ThemeRef, TileSource};
    use crate::tile::TileIdentity;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn job(x: u32) -> Job {
        let tile = TileIdentity::new(x, 0, 4, 256).unwrap();
        DownloadJob::new(tile, Arc::new(TileSource::openstreetmap()), false).into()
    }

    fn open(dir: &TempDir, memory_capacity: usize) -> TwoLevelTileCache {
        TwoLevelTileCache::open(memory_capacity, DiskCacheConfig::new(dir.path())).unwrap()
    }

    #[test]
    fn test_round_trip_is_bit_exact() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, 8);
        let payload: Vec<u8> = (0..=255).collect();

        cache.put(&job(1), TileBitmap::new(payload.clone(), false));

        let hit = cache.get(&job(1)).unwrap();
        assert_eq!(hit.bitmap.data().as_ref(), payload.as_slice());
        assert!(!hit.stale);
    }

    #[test]
    fn test_write_through_to_both_levels() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, 8);
        cache.put(&job(1), TileBitmap::new(vec![1], false));
        assert!(cache.memory().contains(&job(1)));
        assert!(cache.disk().contains(&job(1)));
    }

    #[test]
    fn test_disk_hit_promotes_into_memory() {
        let dir = TempDir::new().unwrap();
        {
            let cache = open(&dir, 8);
            cache.put(&job(1), TileBitmap::new(vec![42; 16], false));
        }

        // Fresh process: memory is empty, disk has the tile
        let cache = open(&dir, 8);
        assert!(!cache.memory().contains(&job(1)));

        let first = cache.get(&job(1)).unwrap();
        assert_eq!(first.bitmap.data().as_ref(), &[42; 16]);
        assert!(cache.memory().contains(&job(1)));

        cache.get(&job(1)).unwrap();
        let stats = cache.stats();
        assert_eq!(stats.disk_hits, 1);
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.promotions, 1);
    }

    #[test]
    fn test_miss_at_both_levels() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, 8);
        assert!(cache.get(&job(9)).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_contains_key_does_not_promote() {
        let dir = TempDir::new().unwrap();
        {
            open(&dir, 8).put(&job(1), TileBitmap::new(vec![1], false));
        }
        let cache = open(&dir, 8);
        assert!(cache.contains_key(&job(1)));
        assert!(!cache.memory().contains(&job(1)));
        assert_eq!(cache.stats().promotions, 0);
    }

    #[test]
    fn test_memory_eviction_falls_back_to_disk() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, 2);
        for x in 0..4 {
            cache.put(&job(x), TileBitmap::new(vec![x as u8], false));
        }
        assert!(!cache.memory().contains(&job(0)));
        assert_eq!(cache.get(&job(0)).unwrap().bitmap.data()[0], 0);
        assert_eq!(cache.stats().memory_evictions, 3);
    }

    #[test]
    fn test_invalidate_removes_from_both_levels() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, 8);
        cache.put(&job(1), TileBitmap::new(vec![1], false));
        assert!(cache.invalidate(&job(1)));
        assert!(!cache.contains_key(&job(1)));
        assert!(!cache.invalidate(&job(1)));
    }

    #[test]
    fn test_stale_download_reported() {
        let dir = TempDir::new().unwrap();
        let cache = TwoLevelTileCache::open(
            8,
            DiskCacheConfig::new(dir.path()).with_download_ttl(Duration::from_secs(60)),
        )
        .unwrap();
        let old = Utc::now() - chrono::Duration::hours(1);
        cache.put(&job(1), TileBitmap::with_timestamp(vec![1], false, old));
        assert!(cache.get(&job(1)).unwrap().stale);
    }

    #[test]
    fn test_contains_fresh_ignores_stale_entries() {
        let dir = TempDir::new().unwrap();
        let cache = TwoLevelTileCache::open(
            8,
            DiskCacheConfig::new(dir.path()).with_download_ttl(Duration::from_secs(60)),
        )
        .unwrap();
        let old = Utc::now() - chrono::Duration::hours(5);
        cache.put(&job(1), TileBitmap::with_timestamp(vec![1], false, old));
        cache.put(&job(2), TileBitmap::new(vec![2], false));

        assert!(cache.contains_key(&job(1)));
        assert!(!cache.contains_fresh(&job(1)));
        assert!(cache.contains_fresh(&job(2)));
        assert!(!cache.contains_fresh(&job(3)));
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_contains_fresh_reads_disk_without_promoting() {
        let dir = TempDir::new().unwrap();
        {
            open(&dir, 8).put(&job(1), TileBitmap::new(vec![1], false));
        }
        let cache = open(&dir, 8);
        assert!(cache.contains_fresh(&job(1)));
        assert!(!cache.memory().contains(&job(1)));
        assert_eq!(cache.stats().promotions, 0);
    }

    #[test]
    fn test_concurrent_puts_leave_levels_in_agreement() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(open(&dir, 8));

        for _ in 0..20 {
            let writers: Vec<_> = (0..4u8)
                .map(|n| {
                    let cache = Arc::clone(&cache);
                    std::thread::spawn(move || {
                        cache.put(&job(1), TileBitmap::new(vec![n; 64], false));
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }

            let in_memory = cache.memory().peek(&job(1)).unwrap();
            let on_disk = cache.disk().get(&job(1)).unwrap();
            assert_eq!(in_memory.data(), on_disk.data());
        }
    }

    #[test]
    fn test_labels_only_render_not_cached() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, 8);
        let tile = TileIdentity::new(0, 0, 0, 256).unwrap();
        let labels: Job = RenderJob::builder(tile)
            .map_data(Arc::new(MapDataRef::new("/maps/a.map", Utc::now())))
            .theme(ThemeRef::NoTheme)
            .display_model(Arc::new(DisplayModel::default()))
            .labels_only(true)
            .build()
            .unwrap()
            .into();

        cache.put(&labels, TileBitmap::new(vec![1], true));
        assert!(!cache.contains_key(&labels));
        assert!(cache.disk().is_empty());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, 8);
        cache.put(&job(1), TileBitmap::new(vec![1], false));
        cache.destroy();
        cache.destroy();
        assert!(cache.get(&job(1)).is_none());
        assert!(cache.memory().is_empty());
        assert!(cache.disk().is_closed());
    }
}
