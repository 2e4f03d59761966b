//! Serializable view settings for persisting a session between runs.

use openatlas_core::geometry::Envelope;
use openatlas_core::projection::CorrectionParameters;
use openatlas_core::style::DisplayOptions;
use serde::{Deserialize, Serialize};

use crate::map::MapView;

/// Everything about a map view that survives a restart: the extent, the
/// coordinate correction, and the display options. Layers hold live
/// resources and are rebuilt by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub extent: Envelope,
    pub correction: CorrectionParameters,
    pub display: DisplayOptions,
}

impl ViewSettings {
    /// Captures the current state of a view.
    pub fn capture(view: &MapView) -> Self {
        Self {
            extent: view.extent(),
            correction: view.correction().clone(),
            display: view.options().clone(),
        }
    }

    /// Applies the settings to a view wholesale, marking it dirty.
    pub fn apply(&self, view: &mut MapView) {
        view.set_extent(self.extent);
        view.set_correction(self.correction.clone());
        view.set_display_options(self.display.clone());
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            extent: MapView::new().extent(),
            correction: CorrectionParameters::default(),
            display: DisplayOptions::default(),
        }
    }
}
