//! Events published by the worker pool.

use crate::cache::TileBitmap;
use crate::job::Job;
use crate::producer::ProducerError;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Outcome of one job, broadcast to every subscriber.
#[derive(Debug, Clone)]
pub enum TileEvent {
    /// A bitmap for the job is available.
    ///
    /// `stale` is set when the bitmap came from the cache but is out of date;
    /// a fresh `Ready` for the same job follows once it has been produced.
    Ready {
        job: Job,
        bitmap: TileBitmap,
        stale: bool,
    },
    /// The producer failed. Nothing was cached.
    Failed { job: Job, reason: ProducerError },
}

impl TileEvent {
    pub fn job(&self) -> &Job {
        match self {
            TileEvent::Ready { job, .. } | TileEvent::Failed { job, .. } => job,
        }
    }

    /// Whether this event ends the processing of its job.
    ///
    /// A stale `Ready` is followed by another event for the same job.
    pub fn is_final(&self) -> bool {
        !matches!(self, TileEvent::Ready { stale: true, .. })
    }
}
