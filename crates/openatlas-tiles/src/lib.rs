//! # OpenAtlas Tiles
//!
//! Slippy-map (Web Mercator) tile index math, a bounded in-memory image
//! cache with request coalescing, and an optional worker pool that takes
//! tile fetches off the render thread.
//!
//! Transport is the host's concern: the crate only consumes a
//! [`TileFetcher`] that turns a templated URL into bytes.

pub mod cache;
pub mod fetch;
pub mod index;
pub mod pool;

pub use cache::{TileCache, TileImage};
pub use fetch::{fill_template, TileError, TileFetcher};
pub use index::{choose_zoom, TileId, TileRange};
pub use pool::FetchPool;
