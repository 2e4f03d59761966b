use serde::{Deserialize, Serialize};

/// RGBA color used by the host render sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const DARK_SLATE_GRAY: Color = Color::rgb(47, 79, 79);
    pub const LIGHT_BLUE: Color = Color::rgb(173, 216, 230);
    pub const ORANGE_RED: Color = Color::rgb(255, 69, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Display styling and advisory rendering limits for a map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    pub background: Color,
    pub vector_stroke: Color,
    pub vector_fill: Color,
    pub marker_fill: Color,
    pub marker_outline: Color,
    pub stroke_thickness: f64,
    pub marker_radius: f64,
    /// Upper bound on concurrent tile fetches; advisory unless a fetch
    /// pool is attached to the tile layer.
    pub max_tile_concurrency: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            vector_stroke: Color::DARK_SLATE_GRAY,
            vector_fill: Color::LIGHT_BLUE,
            marker_fill: Color::ORANGE_RED,
            marker_outline: Color::WHITE,
            stroke_thickness: 1.0,
            marker_radius: 5.0,
            max_tile_concurrency: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DisplayOptions::default();
        assert_eq!(options.background, Color::WHITE);
        assert_eq!(options.vector_stroke, Color::DARK_SLATE_GRAY);
        assert_eq!(options.max_tile_concurrency, 4);
        assert!((options.stroke_thickness - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_color_to_f32() {
        let c = Color::rgba(255, 0, 51, 128);
        let arr = c.to_f32_array();
        assert!((arr[0] - 1.0).abs() < 1e-6);
        assert!((arr[1] - 0.0).abs() < 1e-6);
        assert!((arr[2] - 0.2).abs() < 1e-6);
    }
}
