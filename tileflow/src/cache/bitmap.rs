//! Cached bitmap payloads and the freshness rule.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::job::Job;

/// Encoded tile bitmap as produced by a downloader or renderer.
///
/// The payload is reference counted, so clones share the same bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct TileBitmap {
    data: Bytes,
    has_alpha: bool,
    stored_at: DateTime<Utc>,
}

impl TileBitmap {
    /// Wraps freshly produced bytes, stamped with the current time.
    pub fn new(data: impl Into<Bytes>, has_alpha: bool) -> Self {
        Self::with_timestamp(data, has_alpha, Utc::now())
    }

    /// Wraps bytes with an explicit production time.
    pub fn with_timestamp(data: impl Into<Bytes>, has_alpha: bool, stored_at: DateTime<Utc>) -> Self {
        Self {
            data: data.into(),
            has_alpha,
            stored_at,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// When the bitmap was produced.
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for TileBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileBitmap")
            .field("len", &self.data.len())
            .field("has_alpha", &self.has_alpha)
            .field("stored_at", &self.stored_at)
            .finish()
    }
}

/// A cache lookup result: the bitmap plus whether it should be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTile {
    pub bitmap: TileBitmap,
    /// The bitmap is usable but its source has moved on.
    pub stale: bool,
}

/// Decides whether a bitmap produced at `stored_at` is out of date for `job`.
///
/// Downloads expire after `download_ttl`. Renderings expire as soon as the
/// map data file is newer than the bitmap.
pub fn is_stale(job: &Job, stored_at: DateTime<Utc>, download_ttl: Duration) -> bool {
    match job {
        Job::Download(_) => {
            let ttl = chrono::Duration::from_std(download_ttl).unwrap_or(chrono::Duration::MAX);
            match stored_at.checked_add_signed(ttl) {
                Some(expires) => Utc::now() > expires,
                None => false,
            }
        }
        Job::Render(render) => render.map_data().last_modified() > stored_at,
    }
}
