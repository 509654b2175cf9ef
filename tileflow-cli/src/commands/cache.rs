//! Cache inspection CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use tileflow::cache::DiskTileCache;
use tileflow::config::{format_size, TileServiceConfig};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show disk cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(
    action: CacheAction,
    config: TileServiceConfig,
    cache_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut disk = config.disk;
    if let Some(dir) = cache_dir {
        disk.directory = dir;
    }

    match action {
        CacheAction::Stats => {
            let cache = DiskTileCache::open(disk)?;
            println!("Disk cache: {}", cache.directory().display());
            println!("  Tiles: {}", cache.len());
            println!("  Size:  {}", format_size(cache.total_bytes()));
            Ok(())
        }
    }
}
