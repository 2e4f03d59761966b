//! # OpenAtlas Core
//!
//! Geometry value types, the geodetic correction engine, spatial indexing
//! (R-tree), and display styling shared by every OpenAtlas crate.
//!
//! This crate is the heart of the OpenAtlas map kernel.

pub mod geometry;
pub mod projection;
pub mod spatial;
pub mod style;

pub use geometry::{Envelope, Point};
pub use projection::{CorrectionMode, CorrectionParameters, Ellipsoid, ProjectionEngine};
pub use spatial::SpatialIndex;
pub use style::{Color, DisplayOptions};
