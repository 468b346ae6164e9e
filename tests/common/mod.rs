//! Common test utilities and assertion helpers.
//!
//! Loading helpers that go from fixture bytes to a `Sheet`, plus assertions
//! over cells, rectangles and rendered pixels.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless
)]

use std::sync::Arc;

use xlsnap::{
    FontRegistry, LayoutRect, LoadOptions, PaintCommand, RasterImage, Renderer, Sheet,
    SheetLayout, Workbook, XlsxWorkbook,
};

// Re-export fixtures for convenience
pub use super::fixtures::*;

// ============================================================================
// Loading Helpers
// ============================================================================

/// Open XLSX bytes, panicking on failure.
#[must_use]
pub fn open_xlsx(data: &[u8]) -> XlsxWorkbook {
    XlsxWorkbook::from_bytes(data).expect("Failed to open XLSX")
}

/// Load one sheet with default options.
#[must_use]
pub fn load_sheet(workbook: &dyn Workbook, name: &str) -> Sheet {
    Sheet::load(workbook, name, &LoadOptions::default())
        .unwrap_or_else(|e| panic!("Failed to load sheet {name:?}: {e}"))
}

/// Build XLSX bytes and load the named sheet from them.
#[must_use]
pub fn load_xlsx_sheet(data: &[u8], name: &str) -> Sheet {
    load_sheet(&open_xlsx(data), name)
}

/// Renderer with default options and no fonts, so pixel output does not
/// depend on the machine's font set.
#[must_use]
pub fn renderer_without_fonts() -> Renderer {
    Renderer::new(Arc::new(FontRegistry::empty()))
}

/// Fonts from `XLSNAP_FONT_DIR` and the system directories. May be empty.
#[must_use]
pub fn system_fonts() -> Arc<FontRegistry> {
    Arc::new(FontRegistry::system())
}

/// Render with the font-less renderer.
#[must_use]
pub fn render(sheet: &Sheet) -> RasterImage {
    renderer_without_fonts()
        .render(sheet)
        .expect("Failed to render")
}

/// Display list with the font-less renderer.
#[must_use]
pub fn plan(sheet: &Sheet) -> Vec<PaintCommand> {
    renderer_without_fonts().plan(sheet, &SheetLayout::from_sheet(sheet))
}

/// A solid-color PNG of the given size.
#[must_use]
pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png)
        .expect("Failed to encode PNG");
    out.into_inner()
}

// ============================================================================
// Assertions
// ============================================================================

pub fn assert_approx(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "{what}: expected {expected}, got {actual}"
    );
}

/// Assert the value of a cell by A1 address.
pub fn assert_cell_value(sheet: &Sheet, addr: &str, expected: &str) {
    let cell = sheet
        .cell_at(addr)
        .unwrap_or_else(|| panic!("Cell {addr} not in grid"));
    assert_eq!(cell.value, expected, "Cell {addr} value mismatch");
}

pub fn assert_rect(actual: LayoutRect, x: f64, y: f64, width: f64, height: f64) {
    assert_approx(actual.x, x, "rect.x");
    assert_approx(actual.y, y, "rect.y");
    assert_approx(actual.width, width, "rect.width");
    assert_approx(actual.height, height, "rect.height");
}

/// Assert a raster pixel's RGB, ignoring alpha.
pub fn assert_pixel_rgb(image: &RasterImage, x: u32, y: u32, rgb: [u8; 3]) {
    let [r, g, b, _] = image
        .pixel(x, y)
        .unwrap_or_else(|| panic!("Pixel ({x}, {y}) out of bounds"));
    assert_eq!([r, g, b], rgb, "Pixel ({x}, {y}) color mismatch");
}

/// Assert a raster pixel's RGB within `tolerance` per channel, for pixels
/// produced by anti-aliased strokes or filtered images.
pub fn assert_pixel_near(image: &RasterImage, x: u32, y: u32, rgb: [u8; 3], tolerance: u8) {
    let [r, g, b, _] = image
        .pixel(x, y)
        .unwrap_or_else(|| panic!("Pixel ({x}, {y}) out of bounds"));
    let close = [r, g, b]
        .iter()
        .zip(rgb.iter())
        .all(|(a, e)| a.abs_diff(*e) <= tolerance);
    assert!(close, "Pixel ({x}, {y}): expected about {rgb:?}, got {:?}", [r, g, b]);
}

/// Commands that paint for the given cell.
#[must_use]
pub fn commands_for(commands: &[PaintCommand], row: u32, col: u32) -> Vec<&PaintCommand> {
    commands
        .iter()
        .filter(|c| c.cell() == Some((row, col)))
        .collect()
}

/// Device-pixel center of a cell's rectangle at `scale`.
#[must_use]
pub fn device_center(layout: &SheetLayout, row: u32, col: u32, scale: f64) -> (u32, u32) {
    let rect = layout.cell_rect(row, col).expect("Cell outside layout");
    (
        ((rect.x + rect.width / 2.0) * scale) as u32,
        ((rect.y + rect.height / 2.0) * scale) as u32,
    )
}
