use openatlas_core::geometry::{Envelope, Point};

use crate::layer::RenderContext;
use crate::primitives::DrawPrimitive;

/// A layer of fixed point markers.
pub struct MarkerLayer {
    name: String,
    pub visible: bool,
    pub z_index: i32,
    points: Vec<Point>,
    envelope: Envelope,
}

impl MarkerLayer {
    pub fn new(name: &str, points: Vec<Point>) -> Self {
        let envelope = Envelope::from_points(&points).unwrap_or(Envelope::EMPTY);
        Self {
            name: name.to_string(),
            visible: true,
            z_index: 0,
            points,
            envelope,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    pub fn render(&self, ctx: &RenderContext<'_>) -> Vec<DrawPrimitive> {
        self.points
            .iter()
            .map(|point| {
                let projected = ctx.projection.project(*point, ctx.correction);
                DrawPrimitive::Marker {
                    position: ctx.viewport.to_screen(projected),
                    fill: ctx.options.marker_fill,
                    outline: ctx.options.marker_outline,
                    radius: ctx.options.marker_radius,
                }
            })
            .collect()
    }
}
