//! Job scheduling.
//!
//! The UI side updates a shared [`ViewportState`] and adds jobs to the
//! [`JobQueue`]; workers call [`JobQueue::remove`] and get the pending job
//! closest to what the user is looking at.
//!
//! ```text
//!  UI thread                      workers
//!  ─────────                      ───────
//!  ViewportState::set ──┐
//!                       ├──► JobQueue ──remove()──► Job
//!  JobQueue::add ───────┘       │
//!                               └─ scheduling pass: priority, stable sort, trim
//! ```

mod priority;
mod queue;
mod viewport;

pub use priority::{priority, DEFAULT_ZOOM_PENALTY};
pub use queue::{JobQueue, SchedulerConfig, DEFAULT_QUEUE_CAPACITY};
pub use viewport::{Viewport, ViewportState};
