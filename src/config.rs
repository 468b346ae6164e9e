//! Render options and the [`RendererBuilder`].

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XlsnapError};
use crate::grid::{LoadOptions, DEFAULT_MAX_CELLS};
use crate::render::{FontRegistry, Renderer};
use crate::style::{Rgb, DEFAULT_FONT_SIZE};

/// Supersampling factor applied when none is configured.
pub const DEFAULT_SCALE: f64 = 2.0;

/// User-facing knobs for loading and rendering. Every field has a default,
/// so a JSON options file may set any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Linear supersampling factor.
    pub scale: f64,
    /// Row x column ceiling; `None` or 0 disables it.
    pub max_cells: Option<u64>,
    /// Base grid line color, `RRGGBB`.
    pub grid_color: String,
    /// Canvas background, `RRGGBB`.
    pub background: String,
    /// Font size in points for styles that carry none.
    pub default_font_size: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            max_cells: Some(DEFAULT_MAX_CELLS),
            grid_color: Rgb::GRID.to_hex(),
            background: Rgb::WHITE.to_hex(),
            default_font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl RenderOptions {
    /// # Errors
    /// [`XlsnapError::Io`] if the file cannot be read and
    /// [`XlsnapError::Config`] if it is not valid options JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            max_cells: self.max_cells,
            default_font_size: self.default_font_size,
        }
    }
}

fn parse_color(field: &str, value: &str) -> Result<Rgb> {
    Rgb::from_hex(value)
        .ok_or_else(|| XlsnapError::InvalidInput(format!("{field}: not a hex color: {value:?}")))
}

/// Fluent construction of a [`Renderer`], validated on [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct RendererBuilder {
    options: RenderOptions,
    fonts: Option<Arc<FontRegistry>>,
}

impl RendererBuilder {
    /// Replace all options at once.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.options.scale = scale;
        self
    }

    #[must_use]
    pub fn with_max_cells(mut self, max_cells: Option<u64>) -> Self {
        self.options.max_cells = max_cells;
        self
    }

    #[must_use]
    pub fn with_grid_color(mut self, hex: &str) -> Self {
        self.options.grid_color = hex.to_string();
        self
    }

    #[must_use]
    pub fn with_background(mut self, hex: &str) -> Self {
        self.options.background = hex.to_string();
        self
    }

    #[must_use]
    pub fn with_default_font_size(mut self, size: f64) -> Self {
        self.options.default_font_size = size;
        self
    }

    /// Fonts to draw text with. Without this the renderer has none and
    /// skips text.
    #[must_use]
    pub fn with_fonts(mut self, fonts: Arc<FontRegistry>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    /// # Errors
    /// [`XlsnapError::InvalidInput`] for a non-positive or non-finite scale or
    /// font size, or an unparseable color.
    pub fn build(self) -> Result<Renderer> {
        let options = self.options;
        if !options.scale.is_finite() || options.scale <= 0.0 {
            return Err(XlsnapError::InvalidInput(format!(
                "scale must be a positive number, got {}",
                options.scale
            )));
        }
        if !options.default_font_size.is_finite() || options.default_font_size <= 0.0 {
            return Err(XlsnapError::InvalidInput(format!(
                "default_font_size must be a positive number, got {}",
                options.default_font_size
            )));
        }
        let grid = parse_color("grid_color", &options.grid_color)?;
        let background = parse_color("background", &options.background)?;
        let fonts = self
            .fonts
            .unwrap_or_else(|| Arc::new(FontRegistry::empty()));
        Ok(Renderer::from_parts(options, fonts, grid, background))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert_eq!(options.scale, 2.0);
        assert_eq!(options.max_cells, Some(4_000_000));
        assert_eq!(options.grid_color, "C8C8C8");
        assert_eq!(options.background, "FFFFFF");
        assert_eq!(options.load_options(), LoadOptions::default());
    }

    #[test]
    fn test_partial_json() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"scale": 1.5, "max_cells": null}"#).unwrap();
        assert_eq!(options.scale, 1.5);
        assert_eq!(options.max_cells, None);
        assert_eq!(options.grid_color, "C8C8C8");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opts.json");
        std::fs::write(&path, r#"{"grid_color": "000000"}"#).unwrap();
        let options = RenderOptions::from_json_file(&path).unwrap();
        assert_eq!(options.grid_color, "000000");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            RenderOptions::from_json_file(&path),
            Err(XlsnapError::Config(_))
        ));
        assert!(matches!(
            RenderOptions::from_json_file(dir.path().join("missing.json")),
            Err(XlsnapError::Io(_))
        ));
    }

    #[test]
    fn test_builder_applies_options() {
        let renderer = RendererBuilder::default()
            .with_scale(3.0)
            .with_max_cells(None)
            .with_grid_color("#102030")
            .build()
            .unwrap();
        assert_eq!(renderer.scale(), 3.0);
        assert_eq!(renderer.grid_color(), Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(renderer.load_options().max_cells, None);
        assert!(renderer.fonts().is_empty());
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-1.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    fn test_builder_rejects_bad_scale(scale: f64) {
        let err = Renderer::builder().with_scale(scale).build().unwrap_err();
        assert!(matches!(err, XlsnapError::InvalidInput(_)));
    }

    #[test]
    fn test_builder_rejects_bad_color() {
        let err = Renderer::builder()
            .with_background("not-a-color")
            .build()
            .unwrap_err();
        assert!(matches!(err, XlsnapError::InvalidInput(_)));
    }
}
