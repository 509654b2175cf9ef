//! Tile cache.
//!
//! Maps [`Job`](crate::job::Job)s to encoded bitmaps across two levels:
//!
//! | Level | Type               | Bound                  | Eviction             |
//! |-------|--------------------|------------------------|----------------------|
//! | 1     | [`MemoryTileCache`] | entries (screen sized) | least recently used  |
//! | 2     | [`DiskTileCache`]   | entries and bytes      | oldest write first   |
//!
//! [`TwoLevelTileCache`] composes them: reads fall through from memory to
//! disk and promote disk hits, writes go to both. Each level does its own
//! locking, so callers share the cache behind an `Arc` without extra locks.
//!
//! Runtime failures (unreadable files, full disks) are logged and turned into
//! misses. Nothing in this module returns an error from `get` or `put`.

mod bitmap;
mod disk;
mod error;
mod memory;
mod stats;
mod two_level;

pub use bitmap::{is_stale, CachedTile, TileBitmap};
pub use disk::{
    default_cache_dir, DiskCacheConfig, DiskTileCache, DEFAULT_DISK_MAX_BYTES,
    DEFAULT_DISK_MAX_ENTRIES, DEFAULT_DOWNLOAD_TTL,
};
pub use error::CacheError;
pub use memory::{MemoryTileCache, CAPACITY_MARGIN, DEFAULT_OVERDRAW};
pub use stats::CacheStats;
pub use two_level::TwoLevelTileCache;
