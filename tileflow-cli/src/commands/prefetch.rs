//! Prefetch command: download every tile visible around a position.
//!
//! For each zoom level from `--zoom` to `--zoom + --depth`, the viewport is
//! moved to the position, the visible tiles are queued and the command waits
//! until the workers have drained the queue.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use tileflow::config::TileServiceConfig;
use tileflow::job::{DownloadJob, Job, TileSource};
use tileflow::producer::{HttpTileDownloader, Producers};
use tileflow::scheduler::Viewport;
use tileflow::worker::TileEvent;
use tileflow::{TileIdentity, TileResult, TileService};

use crate::error::CliError;

/// Arguments for `tileflow prefetch`.
#[derive(Debug, Args)]
pub struct PrefetchArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Zoom level to start at
    #[arg(long, default_value = "12")]
    pub zoom: i32,

    /// Additional zoom levels to fetch below the starting one
    #[arg(long, default_value = "0")]
    pub depth: i32,

    /// Surface width in pixels
    #[arg(long, default_value = "1920")]
    pub width: u32,

    /// Surface height in pixels
    #[arg(long, default_value = "1080")]
    pub height: u32,

    /// Tile size in pixels
    #[arg(long, default_value = "256")]
    pub tile_size: u32,

    /// Number of workers (overrides config)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Cache directory (overrides config)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Run the prefetch command.
pub async fn run(args: PrefetchArgs, mut config: TileServiceConfig) -> Result<(), CliError> {
    if let Some(dir) = args.cache_dir.clone() {
        config.disk.directory = dir;
    }
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    let zoom_levels = zoom_levels(args.zoom, args.depth)?;

    let downloader = Arc::new(HttpTileDownloader::new()?);
    let service = TileService::open(config, Producers::new().with_downloader(downloader))?;
    let source = Arc::new(TileSource::openstreetmap());
    service.start_default()?;

    let result = prefetch_levels(&service, &args, &source, &zoom_levels).await;

    service.shutdown().await;
    let stats = service.worker_stats();
    println!(
        "Done: {} downloaded, {} already cached, {} failed",
        stats.produced, stats.cache_hits, stats.failed
    );
    result
}

async fn prefetch_levels(
    service: &TileService,
    args: &PrefetchArgs,
    source: &Arc<TileSource>,
    zoom_levels: &[i32],
) -> Result<(), CliError> {
    let make_job = |tile: TileIdentity| -> TileResult<Job> {
        Ok(DownloadJob::new(tile, Arc::clone(source), false).into())
    };

    for &zoom in zoom_levels {
        let viewport = Viewport::at(args.lat, args.lon, zoom)?;
        let mut events = service.subscribe();
        let queued =
            service.track_viewport(viewport, args.width, args.height, args.tile_size, make_job)?;
        info!(zoom, queued, "Prefetching zoom level");

        let progress = ProgressBar::new(queued as u64).with_style(
            ProgressStyle::with_template("z{msg:>2} {bar:40} {pos:>5}/{len:5} {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message(zoom.to_string());

        // Jobs trimmed by the scheduler never report, so idleness also ends the level
        let mut done = 0;
        while done < queued {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    progress.abandon();
                    return Err(CliError::Interrupted);
                }
                _ = service.wait_until_idle() => break,
                event = events.recv() => match event {
                    Ok(event) if event.is_final() => {
                        if let TileEvent::Failed { job, reason } = &event {
                            progress.println(format!("failed {}: {}", job, reason));
                        }
                        done += 1;
                        progress.inc(1);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        done += skipped as usize;
                        progress.inc(skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        progress.finish();
    }
    Ok(())
}

/// Zoom levels `zoom..=zoom + depth`, validated.
fn zoom_levels(zoom: i32, depth: i32) -> Result<Vec<i32>, CliError> {
    if depth < 0 {
        let message = format!("depth {} is negative", depth);
        return Err(tileflow::TileError::InvalidArgument(message).into());
    }
    // Validates both ends of the range
    TileIdentity::new(0, 0, zoom, 256)?;
    TileIdentity::new(0, 0, zoom.saturating_add(depth), 256)?;
    Ok((zoom..=zoom + depth).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_levels_range() {
        assert_eq!(zoom_levels(10, 2).unwrap(), vec![10, 11, 12]);
        assert_eq!(zoom_levels(0, 0).unwrap(), vec![0]);
    }

    #[test]
    fn test_zoom_levels_rejects_bad_input() {
        assert!(zoom_levels(-1, 0).is_err());
        assert!(zoom_levels(10, -1).is_err());
        assert!(zoom_levels(29, 5).is_err());
    }
}
