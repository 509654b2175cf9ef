//! Priority function: lower values are served first.

use crate::coord;
use crate::tile::TileIdentity;

use super::viewport::Viewport;

/// Default penalty per zoom level of difference, in pixels.
pub const DEFAULT_ZOOM_PENALTY: f64 = 1024.0;

/// Priority of `tile` relative to `viewport`.
///
/// The base value is the pixel distance from the tile center to the viewport
/// center, both projected at the tile's own zoom and tile size. Each level
/// of zoom difference adds `zoom_penalty`, so tiles at the viewport zoom win
/// over mismatched tiles until their distance exceeds the penalty.
pub fn priority(tile: &TileIdentity, viewport: &Viewport, zoom_penalty: f64) -> f64 {
    let reference = coord::to_pixel(&viewport.center(), tile.zoom(), tile.tile_size());
    let distance = tile.center().distance(&reference);
    let zoom_difference = (tile.zoom() as i32 - viewport.zoom() as i32).unsigned_abs();
    distance + zoom_penalty * zoom_difference as f64
}
