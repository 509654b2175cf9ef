//! Tileflow - map tile acquisition core
//!
//! Turns "the user is looking at this part of the map" into bitmaps ready to
//! draw. Tiles are fetched from remote servers or rendered from local map
//! data by a pool of workers, prioritized by distance to the viewport, and
//! kept in a two-level (memory over disk) cache.
//!
//! ```text
//!   TileService::enqueue ──► JobQueue (dedup, viewport priority, bounded)
//!                                 │
//!                                 ▼
//!                          TileWorkerPool ──► Producers (download / render)
//!                                 │
//!                                 ▼
//!   TileService::bitmap_for ◄── TwoLevelTileCache (memory LRU over disk)
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod error;
pub mod job;
pub mod logging;
pub mod producer;
pub mod scheduler;
pub mod service;
pub mod tile;
pub mod tracker;
pub mod worker;

pub use error::{TileError, TileResult};
pub use job::{DownloadJob, Job, RenderJob};
pub use service::TileService;
pub use tile::TileIdentity;
