//! The map view: an ordered layer collection plus the view state the
//! host mutates between frames.

use openatlas_core::geometry::Envelope;
use openatlas_core::projection::{CorrectionParameters, ProjectionEngine};
use openatlas_core::style::DisplayOptions;
use uuid::Uuid;

use crate::layer::{MapLayer, RenderContext};
use crate::primitives::DrawPrimitive;
use crate::viewport::Viewport;

pub type LayerId = Uuid;

/// Default view extent covering the Chinese mainland, matching the
/// coverage of the bundled sample data.
const DEFAULT_EXTENT: Envelope = Envelope {
    min_x: 100.0,
    min_y: 20.0,
    max_x: 125.0,
    max_y: 45.0,
};

/// The composition root: holds the layer stack, the current extent and
/// correction, and a dirty flag the host polls to decide when to redraw.
///
/// All mutation goes through `&mut self`, so the host cannot reconfigure
/// the view in the middle of a render pass.
pub struct MapView {
    extent: Envelope,
    layers: Vec<(LayerId, MapLayer)>,
    correction: CorrectionParameters,
    options: DisplayOptions,
    projection: ProjectionEngine,
    dirty: bool,
}

impl MapView {
    pub fn new() -> Self {
        Self {
            extent: DEFAULT_EXTENT,
            layers: Vec::new(),
            correction: CorrectionParameters::default(),
            options: DisplayOptions::default(),
            projection: ProjectionEngine::new(),
            dirty: true,
        }
    }

    pub fn extent(&self) -> Envelope {
        self.extent
    }

    pub fn correction(&self) -> &CorrectionParameters {
        &self.correction
    }

    pub fn options(&self) -> &DisplayOptions {
        &self.options
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Appends a layer and returns the handle used for later mutation.
    pub fn add_layer(&mut self, layer: MapLayer) -> LayerId {
        let id = Uuid::new_v4();
        log::info!("adding layer '{}' as {}", layer.name(), id);
        self.layers.push((id, layer));
        self.dirty = true;
        id
    }

    /// Removes and returns the layer, or `None` for an unknown id.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<MapLayer> {
        let position = self.layers.iter().position(|(layer_id, _)| *layer_id == id)?;
        let (_, layer) = self.layers.remove(position);
        self.dirty = true;
        Some(layer)
    }

    pub fn layer(&self, id: LayerId) -> Option<&MapLayer> {
        self.layers
            .iter()
            .find(|(layer_id, _)| *layer_id == id)
            .map(|(_, layer)| layer)
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
        match self.layer_mut(id) {
            Some(layer) => {
                layer.set_visible(visible);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn set_layer_z_index(&mut self, id: LayerId, z_index: i32) -> bool {
        match self.layer_mut(id) {
            Some(layer) => {
                layer.set_z_index(z_index);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn set_extent(&mut self, extent: Envelope) {
        self.extent = extent;
        self.dirty = true;
    }

    pub fn set_correction(&mut self, correction: CorrectionParameters) {
        self.correction = correction;
        self.dirty = true;
    }

    pub fn set_display_options(&mut self, options: DisplayOptions) {
        self.options = options;
        self.dirty = true;
    }

    /// Reports whether anything changed since the last call, clearing the
    /// flag. Background tile completions count as changes, so the host can
    /// drive its redraw loop off this single poll.
    pub fn take_dirty(&mut self) -> bool {
        let mut dirty = std::mem::take(&mut self.dirty);
        for (_, layer) in &self.layers {
            if let MapLayer::Tile(tile) = layer {
                if !tile.take_completed().is_empty() {
                    dirty = true;
                }
            }
        }
        dirty
    }

    /// Fits the extent to the union of every layer's envelope. Views with
    /// no layer coverage keep their current extent.
    pub fn zoom_to_full_extent(&mut self) {
        let mut union = Envelope::EMPTY;
        for (_, layer) in &self.layers {
            union = Envelope::union(union, layer.envelope());
        }
        if !union.is_empty() {
            self.extent = union;
            self.dirty = true;
        }
    }

    /// Rescales the extent about its center. Factors below one zoom in,
    /// above one zoom out.
    pub fn zoom_by_factor(&mut self, factor: f64) {
        let center = self.extent.center();
        let half_width = self.extent.width() * factor / 2.0;
        let half_height = self.extent.height() * factor / 2.0;
        self.extent = Envelope::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        );
        self.dirty = true;
    }

    /// Shifts the extent by a screen-pixel delta. Screen Y grows downward
    /// while map Y grows upward, so the vertical delta is inverted.
    pub fn pan_by_pixels(&mut self, dx: f64, dy: f64, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let map_dx = dx * self.extent.width() / width;
        let map_dy = dy * self.extent.height() / height;
        self.extent = Envelope::new(
            self.extent.min_x - map_dx,
            self.extent.min_y + map_dy,
            self.extent.max_x - map_dx,
            self.extent.max_y + map_dy,
        );
        self.dirty = true;
    }

    /// Composes one frame: visible layers, sorted by ascending z-index
    /// with insertion order breaking ties, each contributing its
    /// primitives back to front.
    pub fn render(&mut self, width: f64, height: f64) -> Vec<DrawPrimitive> {
        let viewport = Viewport::new(width, height, self.extent);
        let ctx = RenderContext {
            viewport: &viewport,
            projection: &self.projection,
            correction: &self.correction,
            options: &self.options,
        };

        let mut visible: Vec<&MapLayer> = self
            .layers
            .iter()
            .filter(|(_, layer)| layer.visible())
            .map(|(_, layer)| layer)
            .collect();
        visible.sort_by_key(|layer| layer.z_index());

        let mut primitives = Vec::new();
        for layer in visible {
            primitives.extend(layer.render(&ctx));
        }
        primitives
    }

    fn layer_mut(&mut self, id: LayerId) -> Option<&mut MapLayer> {
        self.layers
            .iter_mut()
            .find(|(layer_id, _)| *layer_id == id)
            .map(|(_, layer)| layer)
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}
