//! Tile identity value type.

use std::fmt;

use crate::coord::{self, PixelPoint};
use crate::error::{TileError, TileResult};

/// Largest accepted tile edge in pixels.
pub const MAX_TILE_SIZE: u32 = 4096;

/// Names a single tile: grid position, zoom level and pixel size.
///
/// Equality and hashing are structural over all four fields, so the same grid
/// square rendered at 256 px and at 512 px are two distinct tiles.
///
/// # Example
///
/// ```
/// use tileflow::tile::TileIdentity;
///
/// let tile = TileIdentity::new(3, 5, 4, 256).unwrap();
/// assert_eq!(tile.tile_x(), 3);
/// assert_eq!(tile.tile_y(), 5);
/// assert_eq!(tile.zoom(), 4);
/// assert!(TileIdentity::new(16, 0, 4, 256).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIdentity {
    /// Column (X index in the Web Mercator grid)
    tile_x: u32,
    /// Row (Y index, increasing southward)
    tile_y: u32,
    /// Zoom level
    zoom: u8,
    /// Edge length in pixels
    tile_size: u32,
}

impl TileIdentity {
    /// Creates a tile identity.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidArgument` if the zoom level is negative or
    /// above [`coord::MAX_ZOOM`], if either index is outside `[0, 2^zoom)`,
    /// or if the tile size is zero or above [`MAX_TILE_SIZE`].
    pub fn new(tile_x: u32, tile_y: u32, zoom: i32, tile_size: u32) -> TileResult<Self> {
        let zoom = coord::validate_zoom(zoom)?;

        if tile_size == 0 || tile_size > MAX_TILE_SIZE {
            return Err(TileError::invalid(format!(
                "tile size {} outside 1..={}",
                tile_size, MAX_TILE_SIZE
            )));
        }

        let limit = coord::tiles_per_axis(zoom);
        if tile_x as u64 >= limit || tile_y as u64 >= limit {
            return Err(TileError::invalid(format!(
                "tile {}/{} outside grid of {} tiles at zoom {}",
                tile_x, tile_y, limit, zoom
            )));
        }

        Ok(Self {
            tile_x,
            tile_y,
            zoom,
            tile_size,
        })
    }

    pub fn tile_x(&self) -> u32 {
        self.tile_x
    }

    pub fn tile_y(&self) -> u32 {
        self.tile_y
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// World pixel position of the tile's top-left corner.
    pub fn origin(&self) -> PixelPoint {
        let size = self.tile_size as f64;
        PixelPoint::new(self.tile_x as f64 * size, self.tile_y as f64 * size)
    }

    /// World pixel position of the tile's center.
    pub fn center(&self) -> PixelPoint {
        let half = self.tile_size as f64 / 2.0;
        let origin = self.origin();
        PixelPoint::new(origin.x + half, origin.y + half)
    }

    /// The tile one zoom level up that covers this one, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.zoom == 0 {
            return None;
        }
        Some(Self {
            tile_x: self.tile_x / 2,
            tile_y: self.tile_y / 2,
            zoom: self.zoom - 1,
            tile_size: self.tile_size,
        })
    }

    /// The four tiles one zoom level down that this one covers, in
    /// row-major order. `None` at the deepest zoom level.
    pub fn children(&self) -> Option<[Self; 4]> {
        if self.zoom >= coord::MAX_ZOOM {
            return None;
        }
        let (x, y) = (self.tile_x * 2, self.tile_y * 2);
        let child = |tile_x, tile_y| Self {
            tile_x,
            tile_y,
            zoom: self.zoom + 1,
            tile_size: self.tile_size,
        };
        Some([child(x, y), child(x + 1, y), child(x, y + 1), child(x + 1, y + 1)])
    }

    /// Number of raw bytes an uncompressed ARGB bitmap of this tile occupies.
    pub fn bitmap_size_bytes(&self) -> u64 {
        self.tile_size as u64 * self.tile_size as u64 * 4
    }
}

impl fmt::Display for TileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.zoom, self.tile_x, self.tile_y, self.tile_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new() {
        let tile = TileIdentity::new(100, 200, 10, 256).unwrap();
        assert_eq!(tile.tile_x(), 100);
        assert_eq!(tile.tile_y(), 200);
        assert_eq!(tile.zoom(), 10);
        assert_eq!(tile.tile_size(), 256);
    }

    #[test]
    fn test_zoom_zero_has_single_tile() {
        assert!(TileIdentity::new(0, 0, 0, 256).is_ok());
        assert!(TileIdentity::new(1, 0, 0, 256).is_err());
        assert!(TileIdentity::new(0, 1, 0, 256).is_err());
    }

    #[test]
    fn test_max_index_at_zoom_18() {
        // At zoom 18, max coordinate is 2^18 - 1 = 262143
        assert!(TileIdentity::new(262143, 262143, 18, 256).is_ok());
        assert!(TileIdentity::new(262144, 0, 18, 256).is_err());
    }

    #[test]
    fn test_negative_zoom_rejected() {
        let err = TileIdentity::new(0, 0, -1, 256).unwrap_err();
        assert!(matches!(err, TileError::InvalidArgument(_)));
    }

    #[test]
    fn test_tile_size_bounds() {
        assert!(TileIdentity::new(0, 0, 0, 0).is_err());
        assert!(TileIdentity::new(0, 0, 0, MAX_TILE_SIZE).is_ok());
        assert!(TileIdentity::new(0, 0, 0, MAX_TILE_SIZE + 1).is_err());
    }

    #[test]
    fn test_size_is_part_of_identity() {
        let small = TileIdentity::new(1, 1, 2, 256).unwrap();
        let large = TileIdentity::new(1, 1, 2, 512).unwrap();
        assert_ne!(small, large);

        let mut set = HashSet::new();
        set.insert(small);
        set.insert(large);
        set.insert(TileIdentity::new(1, 1, 2, 256).unwrap());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_center() {
        let tile = TileIdentity::new(1, 2, 3, 256).unwrap();
        assert_eq!(tile.origin(), PixelPoint::new(256.0, 512.0));
        assert_eq!(tile.center(), PixelPoint::new(384.0, 640.0));
    }

    #[test]
    fn test_parent() {
        let tile = TileIdentity::new(5, 7, 3, 256).unwrap();
        let parent = tile.parent().unwrap();
        assert_eq!((parent.tile_x(), parent.tile_y(), parent.zoom()), (2, 3, 2));
        assert!(TileIdentity::new(0, 0, 0, 256).unwrap().parent().is_none());
    }

    #[test]
    fn test_children() {
        let tile = TileIdentity::new(5, 7, 3, 512).unwrap();
        let children = tile.children().unwrap();
        let coords: Vec<_> = children
            .iter()
            .map(|c| (c.tile_x(), c.tile_y(), c.zoom(), c.tile_size()))
            .collect();
        assert_eq!(
            coords,
            vec![(10, 14, 4, 512), (11, 14, 4, 512), (10, 15, 4, 512), (11, 15, 4, 512)]
        );
        for child in children {
            assert_eq!(child.parent(), Some(tile));
            let rebuilt = TileIdentity::new(child.tile_x(), child.tile_y(), 4, 512).unwrap();
            assert_eq!(rebuilt, child);
        }

        let deepest = TileIdentity::new(0, 0, coord::MAX_ZOOM as i32, 256).unwrap();
        assert!(deepest.children().is_none());
    }

    #[test]
    fn test_display() {
        let tile = TileIdentity::new(3, 4, 5, 512).unwrap();
        assert_eq!(tile.to_string(), "5/3/4@512");
    }
}
