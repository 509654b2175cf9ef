//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! Web Mercator world pixels and tile grid indices. Pixel space depends on the
//! tile size in use, so every pixel conversion takes it explicitly.

use std::f64::consts::PI;

use thiserror::Error;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -MAX_LAT;

/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;

/// Highest supported zoom level.
///
/// Tile indices are `u32`, so the grid at this zoom (2^30 tiles per axis)
/// still fits with room to spare.
pub const MAX_ZOOM: u8 = 30;

/// Errors produced by coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("invalid latitude: {0} (must be within ±85.0511)")]
    InvalidLatitude(f64),

    #[error("invalid longitude: {0} (must be within ±180)")]
    InvalidLongitude(f64),

    #[error("invalid zoom level: {0} (must be within 0..=30)")]
    InvalidZoom(i32),
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point, validating both axes against the Web Mercator bounds.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A position in world pixel space at some zoom level and tile size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point in the same pixel space.
    #[inline]
    pub fn distance(&self, other: &PixelPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Validates a signed zoom level and narrows it to `u8`.
pub fn validate_zoom(zoom: i32) -> Result<u8, CoordError> {
    if zoom < 0 || zoom > MAX_ZOOM as i32 {
        return Err(CoordError::InvalidZoom(zoom));
    }
    Ok(zoom as u8)
}

/// Number of tiles along one axis of the grid at `zoom`.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << zoom
}

/// Width (and height) of the whole world in pixels.
#[inline]
pub fn map_size(zoom: u8, tile_size: u32) -> u64 {
    tile_size as u64 * tiles_per_axis(zoom)
}

/// Converts a longitude to a world pixel X coordinate.
#[inline]
pub fn longitude_to_pixel_x(longitude: f64, zoom: u8, tile_size: u32) -> f64 {
    let size = map_size(zoom, tile_size) as f64;
    (longitude + 180.0) / 360.0 * size
}

/// Converts a latitude to a world pixel Y coordinate using Web Mercator.
#[inline]
pub fn latitude_to_pixel_y(latitude: f64, zoom: u8, tile_size: u32) -> f64 {
    let size = map_size(zoom, tile_size) as f64;
    let sin_lat = (latitude * PI / 180.0).sin();
    let y = 0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI);
    (y * size).clamp(0.0, size)
}

/// Converts a world pixel X coordinate back to a longitude.
#[inline]
pub fn pixel_x_to_longitude(pixel_x: f64, zoom: u8, tile_size: u32) -> f64 {
    let size = map_size(zoom, tile_size) as f64;
    360.0 * (pixel_x / size) - 180.0
}

/// Converts a world pixel Y coordinate back to a latitude.
#[inline]
pub fn pixel_y_to_latitude(pixel_y: f64, zoom: u8, tile_size: u32) -> f64 {
    let size = map_size(zoom, tile_size) as f64;
    let y = 0.5 - pixel_y / size;
    90.0 - 360.0 * (-y * 2.0 * PI).exp().atan() / PI
}

/// Projects a geographic point into world pixel space.
pub fn to_pixel(point: &GeoPoint, zoom: u8, tile_size: u32) -> PixelPoint {
    PixelPoint {
        x: longitude_to_pixel_x(point.longitude, zoom, tile_size),
        y: latitude_to_pixel_y(point.latitude, zoom, tile_size),
    }
}

/// Converts a world pixel coordinate to a tile index, clamped to the grid.
#[inline]
pub fn pixel_to_tile(pixel: f64, zoom: u8, tile_size: u32) -> u32 {
    let max_index = tiles_per_axis(zoom) - 1;
    if pixel <= 0.0 {
        return 0;
    }
    ((pixel / tile_size as f64) as u64).min(max_index) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(0.0, 0.0).is_ok());
        assert_eq!(
            GeoPoint::new(86.0, 0.0),
            Err(CoordError::InvalidLatitude(86.0))
        );
        assert_eq!(
            GeoPoint::new(0.0, -180.5),
            Err(CoordError::InvalidLongitude(-180.5))
        );
    }

    #[test]
    fn test_validate_zoom() {
        assert_eq!(validate_zoom(0), Ok(0));
        assert_eq!(validate_zoom(30), Ok(30));
        assert_eq!(validate_zoom(-1), Err(CoordError::InvalidZoom(-1)));
        assert_eq!(validate_zoom(31), Err(CoordError::InvalidZoom(31)));
    }

    #[test]
    fn test_map_size() {
        assert_eq!(map_size(0, 256), 256);
        assert_eq!(map_size(1, 256), 512);
        assert_eq!(map_size(3, 512), 4096);
    }

    #[test]
    fn test_origin_projects_to_map_center() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let pixel = to_pixel(&origin, 1, 256);
        assert!((pixel.x - 256.0).abs() < 1e-9);
        assert!((pixel.y - 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_round_trip_new_york() {
        // New York City: 40.7128°N, 74.0060°W
        let zoom = 16;
        let x = longitude_to_pixel_x(-74.0060, zoom, 256);
        let y = latitude_to_pixel_y(40.7128, zoom, 256);
        assert!((pixel_x_to_longitude(x, zoom, 256) + 74.0060).abs() < 1e-9);
        assert!((pixel_y_to_latitude(y, zoom, 256) - 40.7128).abs() < 1e-9);
    }

    #[test]
    fn test_new_york_tile_indices_at_zoom_16() {
        let zoom = 16;
        let col = pixel_to_tile(longitude_to_pixel_x(-74.0060, zoom, 256), zoom, 256);
        let row = pixel_to_tile(latitude_to_pixel_y(40.7128, zoom, 256), zoom, 256);
        assert_eq!(col, 19295);
        assert_eq!(row, 24640);
    }

    #[test]
    fn test_pixel_to_tile_clamps_to_grid() {
        assert_eq!(pixel_to_tile(-10.0, 2, 256), 0);
        assert_eq!(pixel_to_tile(1024.0, 2, 256), 3);
        assert_eq!(pixel_to_tile(5000.0, 2, 256), 3);
    }

    #[test]
    fn test_pixel_distance() {
        let a = PixelPoint::new(0.0, 0.0);
        let b = PixelPoint::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
