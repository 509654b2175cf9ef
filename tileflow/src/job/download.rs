//! Remote download job.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::tile::TileIdentity;

use super::source::TileSource;

/// Describes how to obtain one tile from an online source.
///
/// Equality covers the tile and the source identity. The alpha flag and the
/// request limit do not distinguish jobs.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    tile: TileIdentity,
    has_alpha: bool,
    tile_source: Arc<TileSource>,
    parallel_requests_limit: usize,
}

impl DownloadJob {
    /// Creates a download job, inheriting the source's request limit.
    pub fn new(tile: TileIdentity, tile_source: Arc<TileSource>, has_alpha: bool) -> Self {
        let parallel_requests_limit = tile_source.parallel_requests_limit();
        Self {
            tile,
            has_alpha,
            tile_source,
            parallel_requests_limit,
        }
    }

    /// Override the number of simultaneous requests. Zero means unbounded.
    pub fn with_parallel_requests_limit(mut self, limit: usize) -> Self {
        self.parallel_requests_limit = limit;
        self
    }

    pub fn tile(&self) -> TileIdentity {
        self.tile
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn tile_source(&self) -> &Arc<TileSource> {
        &self.tile_source
    }

    pub fn parallel_requests_limit(&self) -> usize {
        self.parallel_requests_limit
    }

    /// Same job for a different tile.
    pub fn with_tile(&self, tile: TileIdentity) -> Self {
        Self {
            tile,
            ..self.clone()
        }
    }

    /// Stable serialization of the identity fields.
    pub fn cache_key(&self) -> String {
        format!("download|{}|{}", self.tile_source.identity_key(), self.tile)
    }
}

impl PartialEq for DownloadJob {
    fn eq(&self, other: &Self) -> bool {
        self.tile == other.tile && *self.tile_source == *other.tile_source
    }
}

impl Eq for DownloadJob {}

impl Hash for DownloadJob {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tile.hash(state);
        self.tile_source.hash(state);
    }
}
