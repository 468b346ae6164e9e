//! Rasterizer: turns a loaded [`Sheet`] into a supersampled bitmap.
//!
//! Rendering builds a display list with [`Renderer::plan`] and then paints it
//! onto a `tiny_skia` pixmap. A [`Renderer`] holds no mutable state, so one
//! value can render many sheets from many threads.

mod fonts;
mod painter;
mod plan;
mod text;

use std::path::Path;
use std::sync::Arc;

use tiny_skia::Pixmap;

pub use fonts::{suggests_cjk, FontFace, FontRegistry, FontRegistryBuilder};
pub use painter::TEXT_PADDING;
pub use plan::PaintCommand;
pub use text::{FaceSet, LineMetrics};

use crate::config::{RenderOptions, RendererBuilder};
use crate::error::{Result, XlsnapError};
use crate::grid::{LoadOptions, Sheet};
use crate::layout::SheetLayout;
use crate::style::Rgb;

/// A finished raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixmap: Pixmap,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight (non-premultiplied) RGBA at `(x, y)`, `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    pub fn as_pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// # Errors
    /// [`XlsnapError::Encode`] when the PNG encoder fails.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| XlsnapError::Encode(e.to_string()))
    }

    /// Encode and write to `path`.
    ///
    /// # Errors
    /// [`XlsnapError::Encode`] or [`XlsnapError::Io`].
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Renders sheets with a fixed set of options and fonts.
#[derive(Debug, Clone)]
pub struct Renderer {
    options: RenderOptions,
    fonts: Arc<FontRegistry>,
    grid_color: Rgb,
    background: Rgb,
}

impl Renderer {
    pub fn builder() -> RendererBuilder {
        RendererBuilder::default()
    }

    /// Default options with the given fonts.
    pub fn new(fonts: Arc<FontRegistry>) -> Self {
        let options = RenderOptions::default();
        Self {
            grid_color: Rgb::parse_or_black(&options.grid_color),
            background: Rgb::parse_or_black(&options.background),
            options,
            fonts,
        }
    }

    /// Colors must already be validated.
    pub(crate) fn from_parts(
        options: RenderOptions,
        fonts: Arc<FontRegistry>,
        grid_color: Rgb,
        background: Rgb,
    ) -> Self {
        Self {
            options,
            fonts,
            grid_color,
            background,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn scale(&self) -> f64 {
        self.options.scale
    }

    pub fn grid_color(&self) -> Rgb {
        self.grid_color
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    /// Load options matching these render options.
    pub fn load_options(&self) -> LoadOptions {
        self.options.load_options()
    }

    /// The display list for `sheet`, in paint order.
    pub fn plan(&self, sheet: &Sheet, layout: &SheetLayout) -> Vec<PaintCommand> {
        plan::build_plan(sheet, layout, self.grid_color, self.options.scale)
    }

    /// Render `sheet` to a bitmap.
    ///
    /// # Errors
    /// [`XlsnapError::InvalidInput`] for a sheet with no cells and
    /// [`XlsnapError::Render`] when the canvas cannot be allocated.
    pub fn render(&self, sheet: &Sheet) -> Result<RasterImage> {
        if sheet.is_empty() {
            return Err(XlsnapError::InvalidInput("empty sheet".to_string()));
        }
        let layout = SheetLayout::from_sheet(sheet);
        let (width, height) = layout.canvas_size(self.options.scale);
        if width == 0 || height == 0 {
            return Err(XlsnapError::Render(format!(
                "{}: zero-sized canvas {width}x{height}",
                sheet.name()
            )));
        }
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            XlsnapError::Render(format!(
                "{}: cannot allocate {width}x{height} canvas",
                sheet.name()
            ))
        })?;
        pixmap.fill(self.background.to_skia());

        let commands = self.plan(sheet, &layout);
        painter::Painter::new(
            &self.fonts,
            sheet.images(),
            self.options.scale,
            self.grid_color,
        )
        .paint(&mut pixmap, &commands);

        log::info!(
            "rendered {}: {width}x{height} px, {} paint commands",
            sheet.name(),
            commands.len()
        );
        Ok(RasterImage { pixmap })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;
    use crate::workbook::MemoryWorkbook;

    fn renderer() -> Renderer {
        Renderer::new(Arc::new(FontRegistry::empty()))
    }

    #[test]
    fn test_empty_sheet_is_invalid_input() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("Empty");
        let sheet = Sheet::load(&wb, "Empty", &LoadOptions::default()).unwrap();
        let err = renderer().render(&sheet).unwrap_err();
        assert!(matches!(err, XlsnapError::InvalidInput(_)));
    }

    #[test]
    fn test_background_and_grid() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").set("A1", "").set("B2", "");
        let sheet = Sheet::load(&wb, "S", &LoadOptions::default()).unwrap();
        let image = renderer().render(&sheet).unwrap();
        let layout = SheetLayout::from_sheet(&sheet);
        assert_eq!((image.width(), image.height()), layout.canvas_size(2.0));

        // Interior of A1 stays background white.
        assert_eq!(image.pixel(20, 15), Some([255, 255, 255, 255]));
        // The A|B boundary carries grid color.
        let x = (layout.col_positions[1] * 2.0).round() as u32;
        let [r, g, b, _] = image.pixel(x, 15).unwrap();
        assert!(r < 255 && g < 255 && b < 255);
        assert!(image.pixel(image.width(), 0).is_none());
    }

    #[test]
    fn test_pixel_does_not_wrap_rows() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").set("A1", "").set("C3", "");
        let sheet = Sheet::load(&wb, "S", &LoadOptions::default()).unwrap();
        let image = renderer().render(&sheet).unwrap();
        let (w, h) = (image.width(), image.height());

        assert!(image.pixel(w, 0).is_none());
        assert!(image.pixel(w + 3, 1).is_none());
        assert!(image.pixel(0, h).is_none());
        assert!(image.pixel(w - 1, h - 1).is_some());
    }

    #[test]
    fn test_encode_png_signature() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").set("A1", "x");
        let sheet = Sheet::load(&wb, "S", &LoadOptions::default()).unwrap();
        let png = renderer().render(&sheet).unwrap().encode_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
