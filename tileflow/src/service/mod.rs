//! Tile service facade.
//!
//! [`TileService`] owns the pieces of the acquisition pipeline and exposes
//! the handful of calls a map view needs:
//!
//! ```text
//!   map view                         TileService
//!   ────────                         ───────────
//!   set_viewport / track_viewport ─► ViewportState + JobQueue::add
//!   enqueue(job) ──────────────────► JobQueue::add
//!   bitmap_for(job) ───────────────► TwoLevelTileCache::get   (never blocks on production)
//!   start(n) / stop() ─────────────► TileWorkerPool
//!   subscribe() ◄──────────────────  TileEvent broadcast
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::cache::{CacheError, CacheStats, TileBitmap, TwoLevelTileCache};
use crate::config::TileServiceConfig;
use crate::error::TileResult;
use crate::job::Job;
use crate::producer::Producers;
use crate::scheduler::{JobQueue, Viewport, ViewportState};
use crate::tile::TileIdentity;
use crate::tracker;
use crate::worker::{TileEvent, TileWorkerPool, WorkerStats};

/// Poll interval for [`TileService::wait_until_idle`].
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The tile acquisition pipeline behind one map view.
pub struct TileService {
    config: TileServiceConfig,
    viewport: Arc<ViewportState>,
    queue: Arc<JobQueue>,
    cache: Arc<TwoLevelTileCache>,
    pool: TileWorkerPool,
}

impl TileService {
    /// Build a service, opening the cache described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the disk cache directory cannot be opened.
    pub fn open(config: TileServiceConfig, producers: Producers) -> Result<Self, CacheError> {
        let cache = TwoLevelTileCache::open(config.memory.tiles(), config.disk.clone())?;
        Ok(Self::with_cache(config, Arc::new(cache), producers))
    }

    /// Build a service around an existing cache.
    pub fn with_cache(
        config: TileServiceConfig,
        cache: Arc<TwoLevelTileCache>,
        producers: Producers,
    ) -> Self {
        let viewport = Arc::new(ViewportState::default());
        let queue = Arc::new(JobQueue::new(
            Arc::clone(&viewport),
            config.scheduler.clone(),
        ));
        let pool = TileWorkerPool::new(Arc::clone(&queue), Arc::clone(&cache), producers);
        Self {
            config,
            viewport,
            queue,
            cache,
            pool,
        }
    }

    /// Queue a job for production. Returns `false` if an equal job is
    /// already pending or in production.
    pub fn enqueue(&self, job: Job) -> bool {
        self.queue.add(job)
    }

    /// Whatever bitmap is already available for `job`, stale or not.
    ///
    /// Never waits for production.
    pub fn bitmap_for(&self, job: &Job) -> Option<TileBitmap> {
        self.cache.get(job).map(|hit| hit.bitmap)
    }

    /// Update the viewport used for prioritization.
    pub fn set_viewport(&self, viewport: Viewport) {
        self.viewport.set(viewport);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    /// Move to `viewport` and enqueue a job for every visible tile that is
    /// not cached yet or whose cached bitmap is stale.
    ///
    /// `make_job` builds the job for a tile. Returns how many jobs were added.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidArgument` for an empty surface, a bad tile
    /// size, or an error from `make_job`.
    pub fn track_viewport<F>(
        &self,
        viewport: Viewport,
        width: u32,
        height: u32,
        tile_size: u32,
        make_job: F,
    ) -> TileResult<usize>
    where
        F: Fn(TileIdentity) -> TileResult<Job>,
    {
        let visible = tracker::visible_tiles(&viewport, width, height, tile_size)?;
        self.set_viewport(viewport);

        let mut added = 0;
        for visible_tile in visible {
            let job = make_job(visible_tile.tile)?;
            if !self.cache.contains_fresh(&job) && self.queue.add(job) {
                added += 1;
            }
        }
        debug!(added, zoom = viewport.zoom(), "Tracked viewport");
        Ok(added)
    }

    /// Start `worker_count` workers.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidArgument` for a zero count or when called
    /// outside a tokio runtime.
    pub fn start(&self, worker_count: usize) -> TileResult<()> {
        self.pool.start(worker_count)
    }

    /// Start the configured number of workers.
    pub fn start_default(&self) -> TileResult<()> {
        self.start(self.config.worker_count)
    }

    /// Stop the workers. In-flight jobs finish first. Idempotent.
    pub async fn stop(&self) {
        self.pool.stop().await;
    }

    /// Stop the workers and release the cache.
    pub async fn shutdown(&self) {
        self.stop().await;
        self.queue.clear();
        self.cache.destroy();
        info!("Tile service shut down");
    }

    /// Wait until no job is pending or in production.
    pub async fn wait_until_idle(&self) {
        while !self.queue.is_idle() {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TileEvent> {
        self.pool.subscribe()
    }

    /// Number of pending jobs.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn cache(&self) -> &Arc<TwoLevelTileCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn worker_stats(&self) -> WorkerStats {
        self.pool.stats()
    }

    pub fn config(&self) -> &TileServiceConfig {
        &self.config
    }
}
