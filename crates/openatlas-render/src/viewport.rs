use openatlas_core::geometry::{Envelope, Point};

use crate::primitives::ScreenPoint;

/// The mapping between a geographic extent and a pixel canvas for one
/// frame. Built at the start of a render pass and immutable for its
/// duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub extent: Envelope,
}

impl Viewport {
    pub fn new(width: f64, height: f64, extent: Envelope) -> Self {
        Self {
            width,
            height,
            extent,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.extent.is_empty() || self.width <= 0.0 || self.height <= 0.0
    }

    /// Map a plane coordinate to a canvas pixel.
    ///
    /// Screen Y grows downward while plane Y grows northward, so the Y
    /// axis is flipped. A degenerate viewport maps everything to the
    /// origin rather than failing.
    pub fn to_screen(&self, point: Point) -> ScreenPoint {
        if self.is_degenerate() {
            return ScreenPoint::default();
        }

        let x = (point.x - self.extent.min_x) / self.extent.width() * self.width;
        let y = self.height - (point.y - self.extent.min_y) / self.extent.height() * self.height;
        ScreenPoint::new(x, y)
    }
}
