//! Producer error types.

use thiserror::Error;

/// Why a downloader or renderer could not produce a bitmap.
///
/// Producer failures are terminal for one attempt. The worker pool logs them,
/// broadcasts a failure event and moves on; nothing is retried until the
/// tile is enqueued again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The payload is not a recognizable image.
    #[error("decode error: {0}")]
    Decode(String),

    /// The renderer failed.
    #[error("render error: {0}")]
    Render(String),

    /// No producer can handle this job.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The producer panicked while handling the job.
    #[error("producer panicked: {0}")]
    Panicked(String),
}

impl ProducerError {
    /// Describe a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked(message)
    }
}
