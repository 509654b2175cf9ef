//! Viewport state shared between the UI side and the scheduler.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::coord::{self, GeoPoint};
use crate::error::TileResult;

/// Map center and zoom level the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    center: GeoPoint,
    zoom: u8,
}

impl Viewport {
    /// Creates a viewport.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidArgument` for an out-of-range zoom level.
    pub fn new(center: GeoPoint, zoom: i32) -> TileResult<Self> {
        let zoom = coord::validate_zoom(zoom)?;
        Ok(Self { center, zoom })
    }

    /// Convenience constructor from raw coordinates.
    pub fn at(latitude: f64, longitude: f64, zoom: i32) -> TileResult<Self> {
        Self::new(GeoPoint::new(latitude, longitude)?, zoom)
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: GeoPoint {
                latitude: 0.0,
                longitude: 0.0,
            },
            zoom: 0,
        }
    }
}

/// Current viewport plus a generation counter.
///
/// Written by one side (the UI), read by schedulers. Every `set` bumps the
/// generation so a reader can tell whether the viewport moved since it last
/// looked.
#[derive(Debug, Default)]
pub struct ViewportState {
    current: RwLock<Viewport>,
    generation: AtomicU64,
}

impl ViewportState {
    pub fn new(initial: Viewport) -> Self {
        Self {
            current: RwLock::new(initial),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the viewport.
    pub fn set(&self, viewport: Viewport) {
        let mut current = self.current.write();
        *current = viewport;
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Current viewport.
    pub fn get(&self) -> Viewport {
        *self.current.read()
    }

    /// Viewport together with the generation it belongs to.
    pub fn snapshot(&self) -> (Viewport, u64) {
        let current = self.current.read();
        (*current, self.generation.load(Ordering::Acquire))
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_validation() {
        assert!(Viewport::at(52.5, 13.4, 12).is_ok());
        assert!(Viewport::at(52.5, 13.4, -1).is_err());
        assert!(Viewport::at(91.0, 13.4, 3).is_err());
    }

    #[test]
    fn test_set_bumps_generation() {
        let state = ViewportState::default();
        assert_eq!(state.generation(), 0);

        let berlin = Viewport::at(52.52, 13.405, 10).unwrap();
        state.set(berlin);

        let (viewport, generation) = state.snapshot();
        assert_eq!(viewport, berlin);
        assert_eq!(generation, 1);
    }
}
