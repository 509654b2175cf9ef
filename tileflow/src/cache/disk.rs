//! Level-2 cache: persistent tile store on the local filesystem.
//!
//! Every entry is one file named after the SHA-256 of the job's cache key:
//!
//! ```text
//! {directory}/{sha256(cache_key)}.tile
//! ```
//!
//! A file holds a bincode-encoded [`StoredTile`] carrying the full cache key,
//! the production time and a checksum of the payload. Reads verify all three
//! and treat any mismatch as a corrupt entry: the file is deleted, a warning
//! is logged and the lookup reports a miss.
//!
//! # Eviction
//!
//! The cache is bounded by entry count and by total bytes. An in-memory index
//! keeps entries in write order; when either bound is exceeded the oldest
//! writes are deleted first. Lookups do not refresh the order.
//!
//! # Restart
//!
//! Opening a directory that already holds tiles rebuilds the index from the
//! files, ordered by modification time, and enforces the bounds immediately.
//! Leftover temporary files from interrupted writes are removed.
//!
//! All methods do blocking file I/O. Async callers should go through
//! `tokio::task::spawn_blocking`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use chrono::{TimeZone, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::job::Job;

use super::bitmap::TileBitmap;
use super::error::CacheError;

/// File extension for tile entries.
const TILE_EXTENSION: &str = "tile";

/// File extension for in-progress writes.
const TEMP_EXTENSION: &str = "tmp";

/// Default maximum number of persisted tiles.
pub const DEFAULT_DISK_MAX_ENTRIES: usize = 4096;

/// Default maximum persisted size (512 MiB).
pub const DEFAULT_DISK_MAX_BYTES: u64 = 512 * 1024 * 1024;

/// Default lifetime of a downloaded tile (one week).
pub const DEFAULT_DOWNLOAD_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for [`DiskTileCache`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiskCacheConfig {
    /// Directory holding the tile files.
    pub directory: PathBuf,
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Maximum total size of entry files in bytes.
    pub max_bytes: u64,
    /// Age after which a downloaded tile is reported stale.
    pub download_ttl: Duration,
}

impl DiskCacheConfig {
    /// Configuration with default bounds rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_download_ttl(mut self, ttl: Duration) -> Self {
        self.download_ttl = ttl;
        self
    }
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            max_entries: DEFAULT_DISK_MAX_ENTRIES,
            max_bytes: DEFAULT_DISK_MAX_BYTES,
            download_ttl: DEFAULT_DOWNLOAD_TTL,
        }
    }
}

/// Platform cache directory for tiles, e.g. `~/.cache/tileflow/tiles`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tileflow")
        .join("tiles")
}

/// On-disk representation of one entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTile {
    key: String,
    stored_at_millis: i64,
    has_alpha: bool,
    checksum: [u8; 32],
    payload: Vec<u8>,
}

/// Write-ordered index of the files on disk.
struct DiskIndex {
    /// File stem to file size. Never read through `get`, so order is write order.
    files: LruCache<String, u64>,
    total_bytes: u64,
}

impl DiskIndex {
    fn new() -> Self {
        Self {
            files: LruCache::unbounded(),
            total_bytes: 0,
        }
    }

    fn insert(&mut self, stem: String, size: u64) {
        if let Some((_, old_size)) = self.files.push(stem, size) {
            self.total_bytes = self.total_bytes.saturating_sub(old_size);
        }
        self.total_bytes += size;
    }

    fn remove(&mut self, stem: &str) -> bool {
        match self.files.pop(stem) {
            Some(size) => {
                self.total_bytes = self.total_bytes.saturating_sub(size);
                true
            }
            None => false,
        }
    }

    fn pop_oldest(&mut self) -> Option<String> {
        let (stem, size) = self.files.pop_lru()?;
        self.total_bytes = self.total_bytes.saturating_sub(size);
        Some(stem)
    }
}

/// Persistent tile cache bounded by entry count and total size.
pub struct DiskTileCache {
    directory: PathBuf,
    max_entries: usize,
    max_bytes: u64,
    download_ttl: Duration,
    index: Mutex<DiskIndex>,
    evictions: AtomicU64,
    temp_counter: AtomicU64,
    closed: AtomicBool,
}

impl DiskTileCache {
    /// Open (or create) a cache directory and rebuild the index from it.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the directory cannot be created or listed.
    pub fn open(config: DiskCacheConfig) -> Result<Self, CacheError> {
        fs::create_dir_all(&config.directory)?;

        let cache = Self {
            directory: config.directory,
            max_entries: config.max_entries,
            max_bytes: config.max_bytes,
            download_ttl: config.download_ttl,
            index: Mutex::new(DiskIndex::new()),
            evictions: AtomicU64::new(0),
            temp_counter: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        };

        let found = cache.scan()?;
        let mut index = cache.index.lock();
        for (stem, size, _) in found {
            index.insert(stem, size);
        }
        let evicted = cache.enforce_bounds(&mut index);
        info!(
            dir = %cache.directory.display(),
            entries = index.files.len(),
            bytes = index.total_bytes,
            evicted,
            "Disk tile cache opened"
        );
        drop(index);

        Ok(cache)
    }

    /// List existing tile files sorted oldest first, deleting stray temp files.
    fn scan(&self) -> Result<Vec<(String, u64, SystemTime)>, CacheError> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str());

            if extension == Some(TEMP_EXTENSION) {
                if let Err(e) = fs::remove_file(&path) {
                    debug!(path = %path.display(), error = %e, "Failed to remove temp file");
                }
                continue;
            }
            if extension != Some(TILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((stem.to_string(), metadata.len(), modified));
        }
        // Stable: equal mtimes keep directory order
        found.sort_by_key(|(_, _, modified)| *modified);
        Ok(found)
    }

    /// Look up a tile.
    ///
    /// Unreadable or corrupt entries are deleted and reported as a miss.
    pub fn get(&self, job: &Job) -> Option<TileBitmap> {
        if self.is_closed() {
            return None;
        }
        let key = job.cache_key();
        let stem = file_stem(&key);
        if !self.index.lock().files.contains(&stem) {
            return None;
        }

        match self.read_entry(&key, &stem) {
            Ok(bitmap) => Some(bitmap),
            Err(CacheError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                self.index.lock().remove(&stem);
                None
            }
            Err(e) => {
                warn!(job = %job, error = %e, "Dropping unreadable disk cache entry");
                self.delete(&stem);
                None
            }
        }
    }

    fn read_entry(&self, key: &str, stem: &str) -> Result<TileBitmap, CacheError> {
        let file_name = format!("{}.{}", stem, TILE_EXTENSION);
        let bytes = fs::read(self.directory.join(&file_name))?;
        let stored: StoredTile = bincode::deserialize(&bytes)?;

        if stored.key != key {
            return Err(CacheError::corrupt(file_name, "cache key mismatch"));
        }
        let checksum: [u8; 32] = Sha256::digest(&stored.payload).into();
        if checksum != stored.checksum {
            return Err(CacheError::corrupt(file_name, "checksum mismatch"));
        }
        let stored_at = Utc
            .timestamp_millis_opt(stored.stored_at_millis)
            .single()
            .ok_or_else(|| CacheError::corrupt(file_name, "invalid timestamp"))?;

        Ok(TileBitmap::with_timestamp(
            stored.payload,
            stored.has_alpha,
            stored_at,
        ))
    }

    /// Whether a tile is indexed. Does not touch the file.
    pub fn contains(&self, job: &Job) -> bool {
        !self.is_closed() && self.index.lock().files.contains(&file_stem(&job.cache_key()))
    }

    /// Store a tile, evicting the oldest entries if a bound is exceeded.
    ///
    /// Write failures are logged and otherwise ignored.
    pub fn put(&self, job: &Job, bitmap: &TileBitmap) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.write_entry(job, bitmap) {
            warn!(job = %job, error = %e, "Failed to write disk cache entry");
        }
    }

    fn write_entry(&self, job: &Job, bitmap: &TileBitmap) -> Result<(), CacheError> {
        let key = job.cache_key();
        let stem = file_stem(&key);
        let stored = StoredTile {
            checksum: Sha256::digest(bitmap.data()).into(),
            key,
            stored_at_millis: bitmap.stored_at().timestamp_millis(),
            has_alpha: bitmap.has_alpha(),
            payload: bitmap.data().to_vec(),
        };
        let encoded = bincode::serialize(&stored)?;
        let size = encoded.len() as u64;

        // Unique temp name so concurrent writers of one key never share a file
        let temp_path = self.directory.join(format!(
            "{}.{}.{}.{}",
            stem,
            std::process::id(),
            self.temp_counter.fetch_add(1, Ordering::Relaxed),
            TEMP_EXTENSION
        ));
        fs::write(&temp_path, &encoded)?;

        let final_path = self.entry_path_for_stem(&stem);
        let mut index = self.index.lock();
        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        index.insert(stem, size);
        let evicted = self.enforce_bounds(&mut index);
        if evicted > 0 {
            debug!(evicted, entries = index.files.len(), "Disk tile cache trimmed");
        }
        Ok(())
    }

    /// Delete oldest entries until both bounds hold. Returns the number removed.
    fn enforce_bounds(&self, index: &mut DiskIndex) -> usize {
        let mut evicted = 0;
        while index.files.len() > self.max_entries || index.total_bytes > self.max_bytes {
            let Some(stem) = index.pop_oldest() else {
                break;
            };
            self.remove_file(&stem);
            evicted += 1;
        }
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        evicted
    }

    /// Remove a tile. Returns whether it was indexed.
    pub fn remove(&self, job: &Job) -> bool {
        if self.is_closed() {
            return false;
        }
        self.delete(&file_stem(&job.cache_key()))
    }

    fn delete(&self, stem: &str) -> bool {
        let mut index = self.index.lock();
        let removed = index.remove(stem);
        self.remove_file(stem);
        removed
    }

    fn remove_file(&self, stem: &str) {
        let path = self.entry_path_for_stem(stem);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete cache file"),
        }
    }

    /// Release the index. Files stay on disk for the next open.
    ///
    /// Idempotent. After this every lookup misses and every write is dropped.
    pub fn destroy(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut index = self.index.lock();
        index.files.clear();
        index.total_bytes = 0;
        debug!(dir = %self.directory.display(), "Disk tile cache closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Path of the file that holds (or would hold) a job's tile.
    pub fn entry_path(&self, job: &Job) -> PathBuf {
        self.entry_path_for_stem(&file_stem(&job.cache_key()))
    }

    fn entry_path_for_stem(&self, stem: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", stem, TILE_EXTENSION))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn download_ttl(&self) -> Duration {
        self.download_ttl
    }

    pub fn len(&self) -> usize {
        self.index.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of indexed entry files in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.index.lock().total_bytes
    }

    /// Total entries evicted by the bounds.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

impl Drop for DiskTileCache {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for DiskTileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskTileCache")
            .field("directory", &self.directory)
            .field("max_entries", &self.max_entries)
            .field("max_bytes", &self.max_bytes)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// File stem for a cache key: lowercase hex SHA-256.
fn file_stem(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{DownloadJob, TileSource};
    use crate::tile::TileIdentity;
    use filetime::{set_file_mtime, FileTime};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn job(x: u32) -> Job {
        let tile = TileIdentity::new(x, 1, 5, 256).unwrap();
        DownloadJob::new(tile, Arc::new(TileSource::openstreetmap()), false).into()
    }

    fn bitmap(bytes: &[u8]) -> TileBitmap {
        TileBitmap::new(bytes.to_vec(), false)
    }

    fn open(dir: &TempDir) -> DiskTileCache {
        DiskTileCache::open(DiskCacheConfig::new(dir.path())).unwrap()
    }

    #[test]
    fn test_put_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let payload = [0x89, b'P', b'N', b'G', 0, 255];

        cache.put(&job(1), &bitmap(&payload));

        let read = cache.get(&job(1)).unwrap();
        assert_eq!(read.data().as_ref(), &payload);
        assert!(cache.contains(&job(1)));
        assert!(cache.get(&job(2)).is_none());
        assert!(cache.entry_path(&job(1)).exists());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = open(&dir);
            cache.put(&job(1), &bitmap(b"first"));
            cache.put(&job(2), &bitmap(b"second"));
        }
        let cache = open(&dir);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&job(2)).unwrap().data().as_ref(), b"second");
    }

    #[test]
    fn test_entry_bound_evicts_oldest_write() {
        let dir = TempDir::new().unwrap();
        let cache = DiskTileCache::open(DiskCacheConfig::new(dir.path()).with_max_entries(2)).unwrap();

        cache.put(&job(1), &bitmap(b"a"));
        cache.put(&job(2), &bitmap(b"b"));
        // Reads do not refresh write order
        cache.get(&job(1));
        cache.put(&job(3), &bitmap(b"c"));

        assert!(!cache.contains(&job(1)));
        assert!(!cache.entry_path(&job(1)).exists());
        assert!(cache.contains(&job(2)));
        assert!(cache.contains(&job(3)));
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn test_byte_bound() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        cache.put(&job(1), &bitmap(&[0u8; 100]));
        let one_entry = cache.total_bytes();
        drop(cache);

        let cache = DiskTileCache::open(
            DiskCacheConfig::new(dir.path()).with_max_bytes(one_entry * 2 + one_entry / 2),
        )
        .unwrap();
        cache.put(&job(2), &bitmap(&[0u8; 100]));
        cache.put(&job(3), &bitmap(&[0u8; 100]));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&job(1)));
        assert!(cache.total_bytes() <= one_entry * 2 + one_entry / 2);
    }

    #[test]
    fn test_reopen_orders_by_modification_time() {
        let dir = TempDir::new().unwrap();
        {
            let cache = open(&dir);
            for x in 1..=3 {
                cache.put(&job(x), &bitmap(&[x as u8]));
            }
            // Make job 3 the oldest file and job 1 the newest
            set_file_mtime(cache.entry_path(&job(3)), FileTime::from_unix_time(1_000, 0)).unwrap();
            set_file_mtime(cache.entry_path(&job(2)), FileTime::from_unix_time(2_000, 0)).unwrap();
            set_file_mtime(cache.entry_path(&job(1)), FileTime::from_unix_time(3_000, 0)).unwrap();
        }

        let cache = DiskTileCache::open(DiskCacheConfig::new(dir.path()).with_max_entries(2)).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&job(3)));
        assert!(cache.contains(&job(1)));
        assert!(cache.contains(&job(2)));
    }

    #[test]
    fn test_corrupt_entry_is_miss_and_removed() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        cache.put(&job(1), &bitmap(b"good"));
        fs::write(cache.entry_path(&job(1)), b"not bincode at all").unwrap();

        assert!(cache.get(&job(1)).is_none());
        assert!(!cache.contains(&job(1)));
        assert!(!cache.entry_path(&job(1)).exists());
    }

    #[test]
    fn test_tampered_payload_fails_checksum() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        cache.put(&job(1), &bitmap(b"payload"));

        let path = cache.entry_path(&job(1));
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        assert!(cache.get(&job(1)).is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_stray_temp_files_removed_on_open() {
        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("abc.1.0.tmp");
        fs::write(&stray, b"partial").unwrap();
        let _cache = open(&dir);
        assert!(!stray.exists());
    }

    #[test]
    fn test_destroy_is_idempotent_and_keeps_files() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        cache.put(&job(1), &bitmap(b"keep"));
        let path = cache.entry_path(&job(1));

        cache.destroy();
        cache.destroy();

        assert!(cache.is_closed());
        assert!(cache.get(&job(1)).is_none());
        cache.put(&job(2), &bitmap(b"ignored"));
        assert!(!cache.entry_path(&job(2)).exists());
        assert!(path.exists());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        cache.put(&job(1), &bitmap(b"x"));
        assert!(cache.remove(&job(1)));
        assert!(!cache.remove(&job(1)));
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn test_concurrent_writers_same_key() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(open(&dir));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        cache.put(&job(1), &TileBitmap::new(vec![i; 64], false));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let read = cache.get(&job(1)).unwrap();
        assert_eq!(read.len(), 64);
        assert!(read.data().iter().all(|b| *b == read.data()[0]));
        assert_eq!(cache.len(), 1);
    }
}
