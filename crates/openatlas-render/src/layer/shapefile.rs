use std::io::{Read, Seek};

use openatlas_core::geometry::Envelope;
use openatlas_core::projection::CorrectionMode;
use openatlas_core::spatial::{PartEntry, SpatialIndex};
use openatlas_shp::{ShapeGeometry, ShpError, ShpReader};

use crate::layer::RenderContext;
use crate::primitives::DrawPrimitive;

/// A vector layer decoded from an ESRI shapefile.
///
/// Geometry is parsed once at construction and immutable thereafter; a
/// decode failure aborts construction and the layer simply never exists.
pub struct ShapefileLayer {
    name: String,
    pub visible: bool,
    pub z_index: i32,
    geometry: ShapeGeometry,
    index: SpatialIndex,
}

impl ShapefileLayer {
    /// Decode a `.shp` stream into a layer.
    pub fn from_reader<R: Read + Seek>(name: &str, reader: R) -> Result<Self, ShpError> {
        let geometry = ShpReader::new(reader).read()?;
        log::info!(
            "loaded shapefile layer '{name}': {} parts, {} points",
            geometry.part_count(),
            geometry.point_count()
        );

        let entries = geometry
            .parts
            .iter()
            .enumerate()
            .filter_map(|(part_index, part)| {
                Envelope::from_points(part).map(|envelope| PartEntry {
                    part_index,
                    envelope,
                })
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            visible: true,
            z_index: 0,
            geometry,
            index: SpatialIndex::build(entries),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn part_count(&self) -> usize {
        self.geometry.part_count()
    }

    pub fn envelope(&self) -> Envelope {
        self.geometry.envelope
    }

    pub fn render(&self, ctx: &RenderContext<'_>) -> Vec<DrawPrimitive> {
        let part_indices: Vec<usize> = match Self::raw_query_window(ctx) {
            Some(window) => self.index.parts_intersecting(&window),
            None => (0..self.geometry.parts.len()).collect(),
        };

        let mut primitives = Vec::new();
        for part_index in part_indices {
            let part = &self.geometry.parts[part_index];
            if part.len() < 2 {
                continue;
            }
            let points = part
                .iter()
                .map(|point| {
                    ctx.viewport
                        .to_screen(ctx.projection.project(*point, ctx.correction))
                })
                .collect();
            primitives.push(DrawPrimitive::Polyline {
                points,
                stroke: ctx.options.vector_stroke,
                thickness: ctx.options.stroke_thickness,
            });
        }
        primitives
    }

    /// The viewport extent mapped back into raw coordinates, for culling
    /// against the index of raw part envelopes.
    ///
    /// The geographic correction is a shift and a positive scale, so the
    /// extent's preimage is itself an envelope. The zone modes bend space
    /// per point; there every part is drawn (`None`).
    fn raw_query_window(ctx: &RenderContext<'_>) -> Option<Envelope> {
        if ctx.correction.mode != CorrectionMode::Geographic {
            return None;
        }
        let scale = ctx.correction.scale_factor;
        if scale <= 0.0 {
            return None;
        }
        let extent = &ctx.viewport.extent;
        Some(Envelope::new(
            extent.min_x / scale - ctx.correction.false_easting,
            extent.min_y / scale - ctx.correction.false_northing,
            extent.max_x / scale - ctx.correction.false_easting,
            extent.max_y / scale - ctx.correction.false_northing,
        ))
    }
}
