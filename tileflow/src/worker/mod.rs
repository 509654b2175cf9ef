//! Worker pool.
//!
//! ```text
//!  JobQueue::remove ──► cache.get ──hit──────────────────────► Ready
//!                          │ miss / stale
//!                          ▼
//!                   Producers::produce ──ok──► cache.put ────► Ready
//!                          │ err
//!                          └─────────────────────────────────► Failed
//! ```
//!
//! Cache access happens on the blocking thread pool because the persistent
//! level does file I/O.

mod event;
mod pool;

pub use event::{TileEvent, DEFAULT_EVENT_CAPACITY};
pub use pool::{TileWorkerPool, WorkerStats};
