//! Slippy-map tile index math.
//!
//! Conversions between geographic coordinates and the standard web-map
//! pyramid addressing `(zoom, column, row)`, plus zoom selection from a
//! viewport's degree-per-pixel density.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use openatlas_core::geometry::Envelope;

/// Zoom chosen when the extent or canvas is degenerate.
const FALLBACK_ZOOM: i32 = 2;

/// A square raster tile address in the web-map pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    pub zoom: u8,
    pub x: i32,
    pub y: i32,
}

impl TileId {
    pub fn new(zoom: u8, x: i32, y: i32) -> Self {
        Self { zoom, x, y }
    }

    /// The cache-key contract: `"{z}_{x}_{y}"`.
    pub fn cache_key(&self) -> String {
        format!("{}_{}_{}", self.zoom, self.x, self.y)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.zoom, self.x, self.y)
    }
}

fn tiles_across(zoom: u8) -> f64 {
    2.0_f64.powi(zoom as i32)
}

pub fn lon_to_tile_x(lon: f64, zoom: u8) -> i32 {
    ((lon + 180.0) / 360.0 * tiles_across(zoom)).floor() as i32
}

pub fn lat_to_tile_y(lat: f64, zoom: u8) -> i32 {
    let rad = lat.to_radians();
    (((1.0 - (rad.tan() + 1.0 / rad.cos()).ln() / PI) / 2.0) * tiles_across(zoom)).floor() as i32
}

/// Longitude of the tile column's west (NW-corner) edge.
pub fn tile_x_to_lon(x: i32, zoom: u8) -> f64 {
    x as f64 / tiles_across(zoom) * 360.0 - 180.0
}

/// Latitude of the tile row's north (NW-corner) edge.
pub fn tile_y_to_lat(y: i32, zoom: u8) -> f64 {
    let n = PI - 2.0 * PI * y as f64 / tiles_across(zoom);
    (0.5 * (n.exp() - (-n).exp())).atan().to_degrees()
}

/// Pick the zoom whose tile density best matches the viewport.
///
/// `round(log2(360 / extent_width_deg * pixel_width / 256))`; degenerate
/// inputs fall back to zoom 2. Callers clamp to their layer's zoom bounds.
pub fn choose_zoom(extent_width_deg: f64, pixel_width: f64) -> i32 {
    if extent_width_deg <= 0.0 || pixel_width <= 0.0 {
        return FALLBACK_ZOOM;
    }
    let scale = 360.0 / extent_width_deg;
    (scale * pixel_width / 256.0).log2().round() as i32
}

/// The inclusive tile index range covering a geographic extent at a zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl TileRange {
    /// Every tile whose index falls within the extent, clamped to the
    /// valid pyramid range at this zoom. Tile rows grow southward, so the
    /// minimum row comes from the extent's maximum latitude.
    pub fn covering(extent: &Envelope, zoom: u8) -> Self {
        let last = (tiles_across(zoom) as i32) - 1;
        let clamp = |v: i32| v.clamp(0, last);
        Self {
            zoom,
            min_x: clamp(lon_to_tile_x(extent.min_x, zoom)),
            max_x: clamp(lon_to_tile_x(extent.max_x, zoom)),
            min_y: clamp(lat_to_tile_y(extent.max_y, zoom)),
            max_y: clamp(lat_to_tile_y(extent.min_y, zoom)),
        }
    }

    pub fn len(&self) -> usize {
        let cols = (self.max_x - self.min_x + 1).max(0) as usize;
        let rows = (self.max_y - self.min_y + 1).max(0) as usize;
        cols * rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = TileId> + '_ {
        let zoom = self.zoom;
        let (min_y, max_y) = (self.min_y, self.max_y);
        (self.min_x..=self.max_x)
            .flat_map(move |x| (min_y..=max_y).map(move |y| TileId::new(zoom, x, y)))
    }
}
