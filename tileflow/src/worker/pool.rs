//! Worker pool draining the job queue into the cache.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CachedTile, TileBitmap, TwoLevelTileCache};
use crate::error::{TileError, TileResult};
use crate::job::Job;
use crate::producer::{ProducerError, Producers};
use crate::scheduler::JobQueue;

use super::event::{TileEvent, DEFAULT_EVENT_CAPACITY};

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of worker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Jobs answered from the cache without production.
    pub cache_hits: u64,
    /// Bitmaps produced successfully.
    pub produced: u64,
    /// Producer failures.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct WorkerCounters {
    cache_hits: AtomicU64,
    produced: AtomicU64,
    failed: AtomicU64,
}

// =============================================================================
// Worker context
// =============================================================================

/// Everything a worker task needs, shared by all workers of one pool.
struct WorkerContext {
    queue: Arc<JobQueue>,
    cache: Arc<TwoLevelTileCache>,
    producers: Producers,
    events: broadcast::Sender<TileEvent>,
    counters: WorkerCounters,
}

impl WorkerContext {
    async fn run(self: Arc<Self>, worker_id: usize, shutdown: CancellationToken) {
        debug!(worker_id, "Tile worker started");
        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = self.queue.remove() => job,
            };
            self.process(&job).await;
            self.queue.complete(&job);
        }
        debug!(worker_id, "Tile worker stopped");
    }

    /// Serve one job: cache first, producer on miss or staleness.
    async fn process(&self, job: &Job) {
        if let Some(hit) = self.cache_get(job).await {
            let stale = hit.stale;
            self.publish(TileEvent::Ready {
                job: job.clone(),
                bitmap: hit.bitmap,
                stale,
            });
            if !stale {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(job = %job, "Cache hit");
                return;
            }
            debug!(job = %job, "Refreshing stale tile");
        }

        // A panicking producer is a failed job; the worker and the queue slot survive
        let produced = AssertUnwindSafe(self.producers.produce(job))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ProducerError::from_panic(panic)));

        match produced {
            Ok(data) => {
                let bitmap = TileBitmap::new(data, job.has_alpha());
                if job.is_cacheable() {
                    self.cache_put(job, bitmap.clone()).await;
                }
                self.counters.produced.fetch_add(1, Ordering::Relaxed);
                debug!(job = %job, bytes = bitmap.len(), "Tile produced");
                self.publish(TileEvent::Ready {
                    job: job.clone(),
                    bitmap,
                    stale: false,
                });
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(job = %job, error = %e, "Tile production failed");
                self.publish(TileEvent::Failed {
                    job: job.clone(),
                    reason: e,
                });
            }
        }
    }

    async fn cache_get(&self, job: &Job) -> Option<CachedTile> {
        let cache = Arc::clone(&self.cache);
        let job = job.clone();
        match tokio::task::spawn_blocking(move || cache.get(&job)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "Cache lookup task failed");
                None
            }
        }
    }

    async fn cache_put(&self, job: &Job, bitmap: TileBitmap) {
        let cache = Arc::clone(&self.cache);
        let job = job.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || cache.put(&job, bitmap)).await {
            warn!(error = %e, "Cache write task failed");
        }
    }

    fn publish(&self, event: TileEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

// =============================================================================
// Pool
// =============================================================================

struct RunningWorkers {
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// A set of tokio tasks consuming one queue and filling one cache.
///
/// Every worker loops: take the most urgent job, look it up in the cache,
/// produce it on a miss, store it and publish a [`TileEvent`]. A failed job
/// is reported and dropped; the loop keeps going.
///
/// Jobs already taken when [`stop`](TileWorkerPool::stop) is called are
/// finished before the worker exits. Idle workers exit immediately.
pub struct TileWorkerPool {
    context: Arc<WorkerContext>,
    running: Mutex<Option<RunningWorkers>>,
}

impl TileWorkerPool {
    pub fn new(queue: Arc<JobQueue>, cache: Arc<TwoLevelTileCache>, producers: Producers) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            context: Arc::new(WorkerContext {
                queue,
                cache,
                producers,
                events,
                counters: WorkerCounters::default(),
            }),
            running: Mutex::new(None),
        }
    }

    /// Spawn `worker_count` workers on the current tokio runtime.
    ///
    /// Starting a pool that is already running does nothing.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidArgument` if `worker_count` is zero or no
    /// tokio runtime is active.
    pub fn start(&self, worker_count: usize) -> TileResult<()> {
        if worker_count == 0 {
            return Err(TileError::invalid("worker count must be at least 1"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TileError::invalid("workers must be started inside a tokio runtime"))?;

        let mut running = self.running.lock();
        if running.is_some() {
            debug!("Worker pool already running");
            return Ok(());
        }

        let shutdown = CancellationToken::new();
        let handles = (0..worker_count)
            .map(|worker_id| {
                let context = Arc::clone(&self.context);
                runtime.spawn(context.run(worker_id, shutdown.child_token()))
            })
            .collect();

        *running = Some(RunningWorkers { shutdown, handles });
        info!(workers = worker_count, "Tile worker pool started");
        Ok(())
    }

    /// Stop all workers and wait for them to exit. Idempotent.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.shutdown.cancel();
        for result in futures::future::join_all(running.handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Tile worker ended abnormally");
            }
        }
        info!("Tile worker pool stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Subscribe to job outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<TileEvent> {
        self.context.events.subscribe()
    }

    pub fn stats(&self) -> WorkerStats {
        let counters = &self.context.counters;
        WorkerStats {
            cache_hits: counters.cache_hits.load(Ordering::Relaxed),
            produced: counters.produced.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }
}
