use std::sync::Arc;

use openatlas_core::geometry::{Envelope, Point};
use openatlas_tiles::{
    cache::{TileCache, TileImage, DEFAULT_CAPACITY},
    fetch::{fill_template, TileFetcher},
    index::{self, choose_zoom, TileId, TileRange},
    pool::FetchPool,
};

use crate::layer::RenderContext;
use crate::primitives::{DrawPrimitive, ScreenRect};

/// A raster basemap layer addressed by the slippy-map pyramid scheme.
///
/// Without a fetch pool, missing tiles are fetched blocking inside the
/// render pass (the simple mode); with one, the pass requests misses and
/// draws whatever the cache already holds, and the pool signals a redraw
/// as tiles arrive.
pub struct TileLayer {
    name: String,
    pub visible: bool,
    pub z_index: i32,
    pub url_template: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Fixed zoom; 0 derives the zoom from the viewport each pass.
    pub current_zoom: u8,
    cache: Arc<TileCache>,
    fetcher: Arc<dyn TileFetcher>,
    pool: Option<FetchPool>,
}

impl TileLayer {
    pub fn new(name: &str, url_template: &str, fetcher: Arc<dyn TileFetcher>) -> Self {
        Self {
            name: name.to_string(),
            visible: true,
            z_index: 0,
            url_template: url_template.to_string(),
            min_zoom: 1,
            max_zoom: 18,
            current_zoom: 0,
            cache: Arc::new(TileCache::new(DEFAULT_CAPACITY)),
            fetcher,
            pool: None,
        }
    }

    pub fn with_zoom_bounds(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_fixed_zoom(mut self, zoom: u8) -> Self {
        self.current_zoom = zoom;
        self
    }

    /// Attach a background fetch pool with the given worker count,
    /// typically `DisplayOptions::max_tile_concurrency`.
    pub fn with_fetch_pool(mut self, workers: usize) -> Self {
        self.pool = Some(FetchPool::new(
            workers,
            Arc::clone(&self.cache),
            Arc::clone(&self.fetcher),
        ));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// The whole Web Mercator world.
    pub fn envelope(&self) -> Envelope {
        Envelope::new(-180.0, -85.0, 180.0, 85.0)
    }

    /// Tiles completed in the background since the last call; a non-empty
    /// result means the frame is stale.
    pub fn take_completed(&self) -> Vec<TileId> {
        self.pool
            .as_ref()
            .map(FetchPool::poll_completed)
            .unwrap_or_default()
    }

    fn effective_zoom(&self, extent_width: f64, pixel_width: f64) -> u8 {
        let zoom = if self.current_zoom == 0 {
            choose_zoom(extent_width, pixel_width)
        } else {
            self.current_zoom as i32
        };
        zoom.clamp(self.min_zoom as i32, self.max_zoom as i32) as u8
    }

    fn resolve(&self, id: TileId) -> Option<TileImage> {
        match &self.pool {
            Some(pool) => {
                let image = self.cache.get(id);
                if image.is_none() {
                    pool.request(id, fill_template(&self.url_template, id));
                }
                image
            }
            None => self
                .cache
                .get_or_fetch(id, &fill_template(&self.url_template, id), self.fetcher.as_ref()),
        }
    }

    pub fn render(&self, ctx: &RenderContext<'_>) -> Vec<DrawPrimitive> {
        if self.url_template.trim().is_empty() {
            return Vec::new();
        }

        let extent = ctx.viewport.extent;
        let zoom = self.effective_zoom(extent.width(), ctx.viewport.width);
        let range = TileRange::covering(&extent, zoom);
        log::debug!(
            "tile layer '{}' rendering {} tiles at zoom {zoom}",
            self.name,
            range.len()
        );

        if let Some(pool) = &self.pool {
            pool.begin_frame();
        }

        let mut primitives = Vec::new();
        for id in range.iter() {
            let Some(image) = self.resolve(id) else {
                // Unavailable this frame; the map renders with a gap.
                continue;
            };

            let top_left = ctx.viewport.to_screen(Point::new(
                index::tile_x_to_lon(id.x, zoom),
                index::tile_y_to_lat(id.y, zoom),
            ));
            let bottom_right = ctx.viewport.to_screen(Point::new(
                index::tile_x_to_lon(id.x + 1, zoom),
                index::tile_y_to_lat(id.y + 1, zoom),
            ));
            primitives.push(DrawPrimitive::ImageRect {
                rect: ScreenRect::from_corners(top_left, bottom_right),
                image,
            });
        }
        primitives
    }
}
