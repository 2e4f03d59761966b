//! Map layer variants and the shared per-pass render context.
//!
//! Layers are a closed set of tagged variants rather than an open trait
//! hierarchy, so the render loop stays exhaustive: adding a layer kind
//! means the compiler points at every place that must handle it.

mod marker;
mod shapefile;
mod tile;

pub use marker::MarkerLayer;
pub use shapefile::ShapefileLayer;
pub use tile::TileLayer;

use openatlas_core::geometry::Envelope;
use openatlas_core::projection::{CorrectionParameters, ProjectionEngine};
use openatlas_core::style::DisplayOptions;

use crate::primitives::DrawPrimitive;
use crate::viewport::Viewport;

/// Everything a layer needs for one render pass, shared across layers.
pub struct RenderContext<'a> {
    pub viewport: &'a Viewport,
    pub projection: &'a ProjectionEngine,
    pub correction: &'a CorrectionParameters,
    pub options: &'a DisplayOptions,
}

/// A renderable map layer.
pub enum MapLayer {
    Tile(TileLayer),
    Shapefile(ShapefileLayer),
    Marker(MarkerLayer),
}

impl MapLayer {
    pub fn name(&self) -> &str {
        match self {
            MapLayer::Tile(layer) => layer.name(),
            MapLayer::Shapefile(layer) => layer.name(),
            MapLayer::Marker(layer) => layer.name(),
        }
    }

    pub fn visible(&self) -> bool {
        match self {
            MapLayer::Tile(layer) => layer.visible,
            MapLayer::Shapefile(layer) => layer.visible,
            MapLayer::Marker(layer) => layer.visible,
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        match self {
            MapLayer::Tile(layer) => layer.visible = visible,
            MapLayer::Shapefile(layer) => layer.visible = visible,
            MapLayer::Marker(layer) => layer.visible = visible,
        }
    }

    pub fn z_index(&self) -> i32 {
        match self {
            MapLayer::Tile(layer) => layer.z_index,
            MapLayer::Shapefile(layer) => layer.z_index,
            MapLayer::Marker(layer) => layer.z_index,
        }
    }

    pub fn set_z_index(&mut self, z_index: i32) {
        match self {
            MapLayer::Tile(layer) => layer.z_index = z_index,
            MapLayer::Shapefile(layer) => layer.z_index = z_index,
            MapLayer::Marker(layer) => layer.z_index = z_index,
        }
    }

    /// The layer's bounding envelope in raw coordinates; empty when the
    /// layer has nothing to contribute to a full-extent fit.
    pub fn envelope(&self) -> Envelope {
        match self {
            MapLayer::Tile(layer) => layer.envelope(),
            MapLayer::Shapefile(layer) => layer.envelope(),
            MapLayer::Marker(layer) => layer.envelope(),
        }
    }

    pub fn render(&self, ctx: &RenderContext<'_>) -> Vec<DrawPrimitive> {
        match self {
            MapLayer::Tile(layer) => layer.render(ctx),
            MapLayer::Shapefile(layer) => layer.render(ctx),
            MapLayer::Marker(layer) => layer.render(ctx),
        }
    }
}
