//! Top-level configuration for a tile service.

use std::time::Duration;

use crate::cache::{DiskCacheConfig, MemoryTileCache, DEFAULT_OVERDRAW};
use crate::scheduler::SchedulerConfig;

/// Default number of worker tasks.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Default surface used to size the memory level.
pub const DEFAULT_SCREEN_WIDTH: u32 = 1920;
pub const DEFAULT_SCREEN_HEIGHT: u32 = 1080;
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// How the memory level is sized.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryCapacity {
    /// A fixed number of tiles.
    Fixed(usize),
    /// Enough tiles to cover a drawing surface at an overdraw factor.
    Screen {
        width: u32,
        height: u32,
        tile_size: u32,
        overdraw: f64,
    },
}

impl MemoryCapacity {
    /// Number of tiles this resolves to.
    pub fn tiles(&self) -> usize {
        match *self {
            MemoryCapacity::Fixed(tiles) => tiles,
            MemoryCapacity::Screen {
                width,
                height,
                tile_size,
                overdraw,
            } => MemoryTileCache::capacity_for_screen(width, height, tile_size, overdraw),
        }
    }
}

impl Default for MemoryCapacity {
    fn default() -> Self {
        MemoryCapacity::Screen {
            width: DEFAULT_SCREEN_WIDTH,
            height: DEFAULT_SCREEN_HEIGHT,
            tile_size: DEFAULT_TILE_SIZE,
            overdraw: DEFAULT_OVERDRAW,
        }
    }
}

/// Configuration for [`TileService`](crate::service::TileService).
///
/// # Example
///
/// ```
/// use tileflow::config::TileServiceConfig;
///
/// let config = TileServiceConfig::default()
///     .with_memory_tiles(64)
///     .with_worker_count(4)
///     .with_disk_directory("/tmp/tiles");
/// assert_eq!(config.memory.tiles(), 64);
/// assert_eq!(config.worker_count, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TileServiceConfig {
    /// Memory level sizing.
    pub memory: MemoryCapacity,
    /// Persistent level settings.
    pub disk: DiskCacheConfig,
    /// Queue settings.
    pub scheduler: SchedulerConfig,
    /// Number of workers spawned by `start` when no count is given.
    pub worker_count: usize,
}

impl Default for TileServiceConfig {
    fn default() -> Self {
        Self {
            memory: MemoryCapacity::default(),
            disk: DiskCacheConfig::default(),
            scheduler: SchedulerConfig::default(),
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }
}

impl TileServiceConfig {
    /// Fixed memory capacity in tiles.
    pub fn with_memory_tiles(mut self, tiles: usize) -> Self {
        self.memory = MemoryCapacity::Fixed(tiles);
        self
    }

    /// Size the memory level from a drawing surface.
    pub fn with_screen(mut self, width: u32, height: u32, tile_size: u32, overdraw: f64) -> Self {
        self.memory = MemoryCapacity::Screen {
            width,
            height,
            tile_size,
            overdraw,
        };
        self
    }

    pub fn with_disk(mut self, disk: DiskCacheConfig) -> Self {
        self.disk = disk;
        self
    }

    pub fn with_disk_directory(mut self, directory: impl Into<std::path::PathBuf>) -> Self {
        self.disk.directory = directory.into();
        self
    }

    pub fn with_download_ttl(mut self, ttl: Duration) -> Self {
        self.disk.download_ttl = ttl;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}
