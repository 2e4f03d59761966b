//! # OpenAtlas Shapefile I/O
//!
//! Reader for the ESRI `.shp` binary geometry format, covering the record
//! types a map canvas draws: Point, PolyLine, and Polygon. Everything else
//! is skipped by the record's declared length.

pub mod shapefile;

pub use shapefile::{ShapeGeometry, ShpError, ShpReader};
