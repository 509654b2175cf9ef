//! Integration tests for the tile pipeline.
//!
//! These tests drive the public surface end to end:
//! - enqueue → worker pool → producer → two-level cache → bitmap_for
//! - concurrent workers over many unique jobs
//! - cache contents surviving a service restart
//!
//! Run with: `cargo test --test pipeline_integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;

use tileflow::config::TileServiceConfig;
use tileflow::job::{DownloadJob, Job, TileSource};
use tileflow::producer::{BoxFuture, ProducerError, Producers, TileDownloader};
use tileflow::scheduler::Viewport;
use tileflow::worker::TileEvent;
use tileflow::{TileIdentity, TileResult, TileService};

// ============================================================================
// Helpers
// ============================================================================

/// Downloader returning a fixed payload and counting calls.
struct CountingDownloader {
    payload: Bytes,
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingDownloader {
    fn new(payload: &'static [u8]) -> Self {
        Self {
            payload: Bytes::from_static(payload),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TileDownloader for CountingDownloader {
    fn fetch<'a>(&'a self, _job: &'a DownloadJob) -> BoxFuture<'a, Result<Bytes, ProducerError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.payload.clone())
        })
    }
}

fn open_service(dir: &TempDir, downloader: Arc<CountingDownloader>) -> TileService {
    let config = TileServiceConfig::default()
        .with_memory_tiles(16)
        .with_disk_directory(dir.path());
    TileService::open(config, Producers::new().with_downloader(downloader)).unwrap()
}

fn download_job(source: &Arc<TileSource>, x: u32, y: u32, zoom: i32) -> Job {
    DownloadJob::new(TileIdentity::new(x, y, zoom, 256).unwrap(), Arc::clone(source), false).into()
}

async fn drain(service: &TileService) {
    tokio::time::timeout(Duration::from_secs(5), service.wait_until_idle())
        .await
        .expect("pipeline did not drain");
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_single_tile_end_to_end() {
    let dir = TempDir::new().unwrap();
    let downloader = Arc::new(CountingDownloader::new(b"tile-bytes"));
    let service = open_service(&dir, downloader.clone());
    let source = Arc::new(TileSource::openstreetmap());
    let job = download_job(&source, 0, 0, 0);

    let mut events = service.subscribe();
    assert!(service.enqueue(job.clone()));
    service.start(1).unwrap();
    drain(&service).await;

    let bitmap = service.bitmap_for(&job).expect("bitmap cached");
    assert_eq!(bitmap.data().as_ref(), b"tile-bytes");
    assert_eq!(service.pending(), 0);
    assert_eq!(downloader.calls(), 1);

    match events.recv().await.unwrap() {
        TileEvent::Ready { job: ready, stale, .. } => {
            assert_eq!(ready, job);
            assert!(!stale);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workers_produce_each_job_once() {
    let dir = TempDir::new().unwrap();
    let downloader =
        Arc::new(CountingDownloader::new(b"payload").with_delay(Duration::from_millis(2)));
    let config = TileServiceConfig::default()
        .with_memory_tiles(64)
        .with_disk_directory(dir.path());
    let service =
        TileService::open(config, Producers::new().with_downloader(downloader.clone())).unwrap();
    let source = Arc::new(TileSource::openstreetmap().with_parallel_requests_limit(0));

    let jobs: Vec<Job> = (0..50).map(|i| download_job(&source, i % 64, i / 64, 6)).collect();
    for job in &jobs {
        assert!(service.enqueue(job.clone()));
        // Duplicates are dropped while the original is pending
        assert!(!service.enqueue(job.clone()));
    }

    service.start(2).unwrap();
    drain(&service).await;

    assert_eq!(downloader.calls(), 50);
    assert_eq!(service.worker_stats().produced, 50);
    assert_eq!(service.cache().disk().len(), 50);
    for job in &jobs {
        assert!(service.cache().contains_key(job));
    }

    service.shutdown().await;
}

#[tokio::test]
async fn test_cached_tiles_survive_restart() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(TileSource::openstreetmap());
    let job = download_job(&source, 1, 1, 1);

    {
        let downloader = Arc::new(CountingDownloader::new(b"first"));
        let service = open_service(&dir, downloader);
        service.enqueue(job.clone());
        service.start(1).unwrap();
        drain(&service).await;
        service.shutdown().await;
    }

    let downloader = Arc::new(CountingDownloader::new(b"second"));
    let service = open_service(&dir, downloader.clone());

    // Served from disk and promoted without production
    let bitmap = service.bitmap_for(&job).unwrap();
    assert_eq!(bitmap.data().as_ref(), b"first");
    let stats = service.cache_stats();
    assert_eq!(stats.disk_hits, 1);
    assert_eq!(stats.promotions, 1);

    service.enqueue(job.clone());
    service.start(1).unwrap();
    drain(&service).await;
    assert_eq!(downloader.calls(), 0);
    assert_eq!(service.worker_stats().cache_hits, 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_track_viewport_fills_cache() {
    let dir = TempDir::new().unwrap();
    let downloader = Arc::new(CountingDownloader::new(b"tile"));
    let service = open_service(&dir, downloader.clone());
    let source = Arc::new(TileSource::openstreetmap());
    let viewport = Viewport::at(48.8566, 2.3522, 12).unwrap();

    let make_job = |tile: TileIdentity| -> TileResult<Job> {
        Ok(DownloadJob::new(tile, Arc::clone(&source), false).into())
    };
    let added = service.track_viewport(viewport, 800, 600, 256, make_job).unwrap();
    assert!(added >= 12);

    service.start(2).unwrap();
    drain(&service).await;
    assert_eq!(downloader.calls(), added);

    // Everything visible is cached now, so nothing new is queued
    let again = service.track_viewport(viewport, 800, 600, 256, make_job).unwrap();
    assert_eq!(again, 0);

    service.shutdown().await;
}
