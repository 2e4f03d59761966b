use openatlas_core::style::Color;
use openatlas_tiles::TileImage;

/// A pixel coordinate on the host canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two corner points in either order.
    pub fn from_corners(a: ScreenPoint, b: ScreenPoint) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }
}

/// One drawing instruction for the host render sink.
///
/// A render pass emits these in back-to-front order; the host converts
/// them to pixels with whatever canvas API it owns.
#[derive(Debug, Clone)]
pub enum DrawPrimitive {
    /// Open stroked path through ordered screen points.
    Polyline {
        points: Vec<ScreenPoint>,
        stroke: Color,
        thickness: f64,
    },
    /// A decoded raster tile filling a screen rectangle.
    ImageRect {
        rect: ScreenRect,
        image: TileImage,
    },
    /// A circular point marker.
    Marker {
        position: ScreenPoint,
        fill: Color,
        outline: Color,
        radius: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_corners_normalizes() {
        let rect = ScreenRect::from_corners(ScreenPoint::new(10.0, 2.0), ScreenPoint::new(4.0, 8.0));
        assert_eq!(rect, ScreenRect::new(4.0, 2.0, 6.0, 6.0));
    }
}
