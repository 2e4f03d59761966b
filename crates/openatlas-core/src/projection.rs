//! Geodetic correction engine.
//!
//! Maps raw layer coordinates into plane coordinates through a configurable
//! correction model: a plain affine shift/scale in geographic mode, or a
//! simplified zone projection in 3°/6° zone modes. The zone math is an
//! equirectangular approximation, not a full conformal (Gauss-Krüger)
//! projection; that simplification is intentional and must not be replaced
//! with the exact transform.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// A reference geodetic datum shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub name: String,
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub fn new(name: &str, semi_major_axis: f64, inverse_flattening: f64) -> Self {
        Self {
            name: name.to_string(),
            semi_major_axis,
            inverse_flattening,
        }
    }

    pub fn wgs84() -> Self {
        Self::new("WGS84", 6_378_137.0, 298.257223563)
    }

    pub fn cgcs2000() -> Self {
        Self::new("CGCS2000", 6_378_137.0, 298.257222101)
    }
}

/// How raw coordinates are corrected into plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionMode {
    /// Longitude/latitude pass through as plane coordinates, shifted and
    /// scaled only.
    Geographic,
    /// 3°-wide projection zones.
    ThreeDegreeZone,
    /// 6°-wide projection zones.
    SixDegreeZone,
}

/// Configurable geodetic-to-plane transform settings.
///
/// Owned by the map view and read by [`ProjectionEngine::project`] on every
/// call; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionParameters {
    pub mode: CorrectionMode,
    pub central_meridian: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub scale_factor: f64,
    pub ellipsoid: Ellipsoid,
}

impl Default for CorrectionParameters {
    fn default() -> Self {
        Self {
            mode: CorrectionMode::Geographic,
            central_meridian: 0.0,
            false_easting: 0.0,
            false_northing: 0.0,
            scale_factor: 1.0,
            ellipsoid: Ellipsoid::cgcs2000(),
        }
    }
}

/// Threshold below which the central meridian counts as unset.
const MERIDIAN_EPSILON: f64 = 1e-7;

/// Pure coordinate transform from raw to plane coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionEngine;

impl ProjectionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Project a raw coordinate through the correction model.
    ///
    /// In the zone modes, a central meridian within `1e-7` of zero is
    /// auto-derived per point as the nearest multiple of the zone width to
    /// the point's longitude. Known footgun: with the meridian unset, two
    /// points of the same record can land in different zones and project
    /// inconsistently. Pin `central_meridian` to avoid that.
    pub fn project(&self, input: Point, params: &CorrectionParameters) -> Point {
        let x = input.x;
        let y = input.y;

        if params.mode == CorrectionMode::Geographic {
            return Point::new(
                (x + params.false_easting) * params.scale_factor,
                (y + params.false_northing) * params.scale_factor,
            );
        }

        let zone_width = match params.mode {
            CorrectionMode::ThreeDegreeZone => 3.0,
            _ => 6.0,
        };
        let mut central = params.central_meridian;
        if central.abs() < MERIDIAN_EPSILON {
            central = (x / zone_width).round() * zone_width;
            log::trace!("auto-derived zone meridian {central} for longitude {x}");
        }

        let radius = params.ellipsoid.semi_major_axis;
        let lon = x.to_radians();
        let lat = y.to_radians();
        let central_rad = central.to_radians();

        let delta = lon - central_rad;
        let projected_x = radius * delta * lat.cos();
        let projected_y = radius * lat;

        Point::new(
            (projected_x + params.false_easting) * params.scale_factor,
            (projected_y + params.false_northing) * params.scale_factor,
        )
    }
}
