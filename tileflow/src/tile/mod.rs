//! Tile addressing.
//!
//! A [`TileIdentity`] names one square of the slippy-map grid at one pixel
//! size. It is the leaf value type every job and cache key is built from.

mod identity;

pub use identity::{TileIdentity, MAX_TILE_SIZE};
