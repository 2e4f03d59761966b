//! # OpenAtlas Render
//!
//! The per-frame composition layer: maps projected plane coordinates to
//! screen pixels and walks the ordered layer collection, producing draw
//! primitives the host canvas turns into pixels.
//!
//! The host owns the window, input events, and actual drawing; this crate
//! owns everything between a geographic extent and an ordered list of
//! [`DrawPrimitive`]s.

pub mod layer;
pub mod map;
pub mod primitives;
pub mod settings;
pub mod viewport;

pub use layer::{MapLayer, MarkerLayer, RenderContext, ShapefileLayer, TileLayer};
pub use map::{LayerId, MapView};
pub use primitives::{DrawPrimitive, ScreenPoint, ScreenRect};
pub use settings::ViewSettings;
pub use viewport::Viewport;
