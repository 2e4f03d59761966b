use thiserror::Error;

use crate::index::TileId;

#[derive(Error, Debug, Clone)]
pub enum TileError {
    #[error("tile fetch failed: {0}")]
    Fetch(String),

    #[error("tile image decode failed: {0}")]
    Decode(String),
}

/// The host's transport collaborator: `fetch(url) -> bytes | failure`.
///
/// Implementations block until the response body is available; the cache
/// and pool decide where that blocking happens.
pub trait TileFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TileError>;
}

/// Substitute `{z}`, `{x}`, `{y}` placeholders with decimal tile indices.
pub fn fill_template(template: &str, id: TileId) -> String {
    template
        .replace("{z}", &id.zoom.to_string())
        .replace("{x}", &id.x.to_string())
        .replace("{y}", &id.y.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template() {
        let url = fill_template("https://tiles.example/{z}/{x}/{y}.png", TileId::new(7, 105, 48));
        assert_eq!(url, "https://tiles.example/7/105/48.png");
    }

    #[test]
    fn test_fill_template_repeated_placeholders() {
        let url = fill_template("{z}/{z}/{x}_{y}", TileId::new(3, 1, 2));
        assert_eq!(url, "3/3/1_2");
    }
}
