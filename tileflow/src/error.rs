//! Error type for the crate's public boundary.
//!
//! Runtime failures (producers, cache I/O) are absorbed inside the pipeline
//! and surface only as a tile that is not yet available. The one error that
//! callers ever see is a rejected construction.

use thiserror::Error;

use crate::coord::CoordError;

/// Result type for tile and job construction.
pub type TileResult<T> = Result<T, TileError>;

/// Errors returned synchronously to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    /// A constructor invariant was violated. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl TileError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        TileError::InvalidArgument(message.into())
    }
}

impl From<CoordError> for TileError {
    fn from(e: CoordError) -> Self {
        TileError::InvalidArgument(e.to_string())
    }
}
