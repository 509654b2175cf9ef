//! Visible-tile computation.
//!
//! Given a viewport and the size of the drawing surface, lists the tiles that
//! cover the surface together with where each one lands on screen.

use crate::coord::{self, PixelPoint};
use crate::error::{TileError, TileResult};
use crate::scheduler::Viewport;
use crate::tile::{TileIdentity, MAX_TILE_SIZE};

/// A tile and the screen position of its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTile {
    pub tile: TileIdentity,
    /// Offset relative to the surface's top-left corner. May be negative.
    pub screen_offset: PixelPoint,
}

/// Tiles covering a `width` x `height` surface centered on the viewport.
///
/// Tiles are listed row by row, top to bottom, left to right. The range is
/// clamped to the grid, so at low zoom levels the list may cover less than
/// the whole surface.
///
/// # Errors
///
/// Returns `TileError::InvalidArgument` if the surface is empty or the tile
/// size is out of range.
pub fn visible_tiles(
    viewport: &Viewport,
    width: u32,
    height: u32,
    tile_size: u32,
) -> TileResult<Vec<VisibleTile>> {
    if width == 0 || height == 0 {
        return Err(TileError::invalid(format!(
            "surface {}x{} is empty",
            width, height
        )));
    }
    if tile_size == 0 || tile_size > MAX_TILE_SIZE {
        return Err(TileError::invalid(format!("invalid tile size {}", tile_size)));
    }

    let zoom = viewport.zoom();
    let center = coord::to_pixel(&viewport.center(), zoom, tile_size);
    let top_left = PixelPoint::new(
        center.x - width as f64 / 2.0,
        center.y - height as f64 / 2.0,
    );
    let bottom_right = PixelPoint::new(top_left.x + width as f64, top_left.y + height as f64);

    let left = coord::pixel_to_tile(top_left.x, zoom, tile_size);
    let top = coord::pixel_to_tile(top_left.y, zoom, tile_size);
    // The right and bottom edges are exclusive
    let right = coord::pixel_to_tile(bottom_right.x - 1.0, zoom, tile_size);
    let bottom = coord::pixel_to_tile(bottom_right.y - 1.0, zoom, tile_size);

    let mut tiles = Vec::with_capacity(((right - left + 1) * (bottom - top + 1)) as usize);
    for tile_y in top..=bottom {
        for tile_x in left..=right {
            let tile = TileIdentity::new(tile_x, tile_y, zoom as i32, tile_size)?;
            let origin = tile.origin();
            tiles.push(VisibleTile {
                tile,
                screen_offset: PixelPoint::new(origin.x - top_left.x, origin.y - top_left.y),
            });
        }
    }
    Ok(tiles)
}
