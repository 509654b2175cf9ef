//! Tile jobs.
//!
//! A [`Job`] describes how to produce the bitmap for one tile. It is either a
//! [`DownloadJob`] (fetch from an online [`TileSource`]) or a [`RenderJob`]
//! (draw from local map data plus a theme).
//!
//! Jobs are the key type of the whole pipeline: the cache maps jobs to
//! bitmaps and the queue deduplicates by job equality.
//!
//! ```text
//! Job ─┬─ Download(tile, source)               ─► download|hosts|template|z-z|tile
//!      └─ Render(tile, map, theme, text scale) ─► render|path|theme|scale|tile
//! ```
//!
//! Jobs of different kinds are never equal, even for the same tile. Equal
//! jobs hash equally and produce the same [`Job::cache_key`].

mod download;
mod render;
mod source;

pub use download::DownloadJob;
pub use render::{DisplayModel, EmbeddedTheme, MapDataRef, RenderJob, RenderJobBuilder, ThemeRef};
pub use source::{TileSource, DEFAULT_PARALLEL_REQUESTS_LIMIT};

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::tile::TileIdentity;

/// Kind of work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Download,
    Render,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Download => write!(f, "download"),
            JobKind::Render => write!(f, "render"),
        }
    }
}

/// A unit of tile production work.
#[derive(Debug, Clone)]
pub enum Job {
    Download(DownloadJob),
    Render(RenderJob),
}

impl Job {
    /// The tile this job produces.
    pub fn tile(&self) -> TileIdentity {
        match self {
            Job::Download(job) => job.tile(),
            Job::Render(job) => job.tile(),
        }
    }

    pub fn has_alpha(&self) -> bool {
        match self {
            Job::Download(job) => job.has_alpha(),
            Job::Render(job) => job.has_alpha(),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Job::Download(_) => JobKind::Download,
            Job::Render(_) => JobKind::Render,
        }
    }

    /// Whether results of this job may be stored in the cache.
    ///
    /// Label-only renderings are drawn over other tiles and never stored.
    pub fn is_cacheable(&self) -> bool {
        match self {
            Job::Download(_) => true,
            Job::Render(job) => !job.labels_only(),
        }
    }

    /// Stable text key identifying this job, identical for equal jobs.
    pub fn cache_key(&self) -> String {
        match self {
            Job::Download(job) => job.cache_key(),
            Job::Render(job) => job.cache_key(),
        }
    }

    /// Same job for a different tile.
    pub fn with_tile(&self, tile: TileIdentity) -> Self {
        match self {
            Job::Download(job) => Job::Download(job.with_tile(tile)),
            Job::Render(job) => Job::Render(job.with_tile(tile)),
        }
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Job::Download(a), Job::Download(b)) => a == b,
            (Job::Render(a), Job::Render(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Job {}

impl Hash for Job {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Job::Download(job) => job.hash(state),
            Job::Render(job) => job.hash(state),
        }
    }
}

impl From<DownloadJob> for Job {
    fn from(job: DownloadJob) -> Self {
        Job::Download(job)
    }
}

impl From<RenderJob> for Job {
    fn from(job: RenderJob) -> Self {
        Job::Render(job)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.tile())
    }
}
