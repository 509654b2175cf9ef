//! Cache error types.
//!
//! These never cross the public boundary of the tile service. The cache
//! logs them and reports a miss (on read) or does nothing (on write).

use thiserror::Error;

/// Errors raised inside the cache levels.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error while reading or writing a persistent entry.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persistent entry failed validation.
    #[error("corrupt cache entry {file}: {reason}")]
    Corrupt { file: String, reason: String },

    /// Failed to serialize or deserialize an entry.
    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    /// The cache has been destroyed.
    #[error("cache is closed")]
    Closed,
}

impl CacheError {
    pub(crate) fn corrupt(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            file: file.into(),
            reason: reason.into(),
        }
    }
}
