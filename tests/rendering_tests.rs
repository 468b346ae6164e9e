//! End-to-end rendering: pass order, fills, border overrides, pictures and
//! the encoded PNG.
//!
//! Most tests render without fonts so pixels do not depend on the fonts
//! installed on the machine. Text drawing is checked separately and only
//! when system fonts are found.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

mod common;
mod fixtures;

use std::sync::Arc;

use common::{
    assert_pixel_near, assert_pixel_rgb, commands_for, device_center, load_sheet, load_xlsx_sheet,
    plan, png_bytes, render, renderer_without_fonts, system_fonts,
};
use fixtures::{PictureEntry, SheetBuilder, StyleBuilder, XlsxBuilder};
use xlsnap::workbook::{BorderSide, Picture, RawBorder, RawFill, RawStyle};
use xlsnap::{MemoryWorkbook, PaintCommand, Renderer, SheetLayout, XlsnapError};

const WHITE: [u8; 3] = [255, 255, 255];

fn solid(hex: &str) -> RawStyle {
    RawStyle {
        fill: RawFill {
            pattern: "solid".to_string(),
            colors: vec![hex.to_string()],
        },
        ..RawStyle::default()
    }
}

fn boxed(hex: &str) -> RawStyle {
    RawStyle {
        borders: BorderSide::ALL
            .iter()
            .map(|&side| RawBorder {
                side,
                style: "thin".to_string(),
                color: hex.to_string(),
            })
            .collect(),
        ..RawStyle::default()
    }
}

fn picture(png: Vec<u8>, width: u32, height: u32) -> Picture {
    Picture {
        name: "Picture 1".to_string(),
        bytes: png,
        format: "png".to_string(),
        offset_x: 0,
        offset_y: 0,
        width,
        height,
    }
}

// ============================================================================
// PASS ORDER
// ============================================================================

#[test]
fn test_passes_run_in_order() {
    let mut wb = MemoryWorkbook::new();
    let filled = wb.add_style(solid("FFFFFF00"));
    let framed = wb.add_style(boxed("FF0000FF"));
    wb.sheet("Data")
        .set("A1", "x")
        .style("A1", filled)
        .set("B2", "y")
        .style("B2", framed)
        .picture("A1", picture(png_bytes(4, 4, [255, 0, 0, 255]), 0, 0));
    let sheet = load_sheet(&wb, "Data");

    let rank = |c: &PaintCommand| match c {
        PaintCommand::GridLine { .. } => 0,
        PaintCommand::Fill { .. } | PaintCommand::Text { .. } => 1,
        PaintCommand::Border { .. } => 2,
        PaintCommand::Image { .. } => 3,
    };
    let ranks: Vec<u8> = plan(&sheet).iter().map(rank).collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "passes interleaved: {ranks:?}");
    for pass in 0..=3 {
        assert!(ranks.contains(&pass), "pass {pass} missing");
    }
}

#[test]
fn test_fill_precedes_text_for_same_cell() {
    let mut wb = MemoryWorkbook::new();
    let filled = wb.add_style(solid("FF00FF00"));
    wb.sheet("Data").set("A1", "x").style("A1", filled);
    let sheet = load_sheet(&wb, "Data");
    let commands = plan(&sheet);

    let own = commands_for(&commands, 1, 1);
    assert!(matches!(own[0], PaintCommand::Fill { .. }));
    assert!(matches!(own[1], PaintCommand::Text { .. }));
}

#[test]
fn test_empty_values_emit_no_text() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("A1", "x").set_empty("B1");
    let sheet = load_sheet(&wb, "Data");
    let commands = plan(&sheet);

    assert!(commands_for(&commands, 1, 2).is_empty());
}

// ============================================================================
// BORDERS
// ============================================================================

/// Without an explicit border style nothing is drawn over the base grid.
#[test]
fn test_no_border_without_style() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("A1", "a").set("B2", "b");
    let sheet = load_sheet(&wb, "Data");

    assert!(plan(&sheet)
        .iter()
        .all(|c| !matches!(c, PaintCommand::Border { .. })));
}

#[test]
fn test_border_style_without_color_draws_nothing() {
    let mut wb = MemoryWorkbook::new();
    let plain = wb.add_style(boxed(""));
    wb.sheet("Data").set("A1", "a").style("A1", plain);
    let sheet = load_sheet(&wb, "Data");

    assert!(plan(&sheet)
        .iter()
        .all(|c| !matches!(c, PaintCommand::Border { .. })));
}

#[test]
fn test_border_pixels() {
    let mut wb = MemoryWorkbook::new();
    let framed = wb.add_style(boxed("FFFF0000"));
    wb.sheet("Data").set("C3", "z").style("B2", framed);
    let sheet = load_sheet(&wb, "Data");
    let layout = SheetLayout::from_sheet(&sheet);
    let image = render(&sheet);

    let (cx, cy) = device_center(&layout, 2, 2, 2.0);
    let left = (layout.col_positions[1] * 2.0) as u32;
    assert_pixel_near(&image, left, cy, [255, 0, 0], 8);

    // Interior stays background
    assert_pixel_rgb(&image, cx, cy, WHITE);
}

// ============================================================================
// FILLS AND BACKGROUND
// ============================================================================

#[test]
fn test_fill_and_background_pixels() {
    let mut wb = MemoryWorkbook::new();
    let blue = wb.add_style(solid("FF0000FF"));
    wb.sheet("Data").style("A1", blue).set("B1", "x");
    let sheet = load_sheet(&wb, "Data");
    let layout = SheetLayout::from_sheet(&sheet);
    let image = render(&sheet);

    let (x, y) = device_center(&layout, 1, 1, 2.0);
    assert_pixel_rgb(&image, x, y, [0, 0, 255]);
    let (x, y) = device_center(&layout, 1, 2, 2.0);
    assert_pixel_rgb(&image, x, y, WHITE);
}

#[test]
fn test_custom_background_and_grid_color() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("B2", "x");
    let sheet = load_sheet(&wb, "Data");
    let layout = SheetLayout::from_sheet(&sheet);

    let renderer = Renderer::builder()
        .with_background("FFFF00")
        .with_grid_color("0000FF")
        .build()
        .unwrap();
    let image = renderer.render(&sheet).unwrap();

    let (cx, cy) = device_center(&layout, 1, 1, 2.0);
    assert_pixel_rgb(&image, cx, cy, [255, 255, 0]);
    let boundary = (layout.col_positions[1] * 2.0) as u32;
    assert_pixel_near(&image, boundary, cy, [0, 0, 255], 8);
}

#[test]
fn test_scale_changes_canvas() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("B2", "x");
    let sheet = load_sheet(&wb, "Data");
    let layout = SheetLayout::from_sheet(&sheet);

    let renderer = Renderer::builder().with_scale(1.0).build().unwrap();
    let image = renderer.render(&sheet).unwrap();
    assert_eq!((image.width(), image.height()), layout.canvas_size(1.0));
}

// ============================================================================
// PICTURES
// ============================================================================

#[test]
fn test_picture_at_natural_size() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data")
        .set("C3", "x")
        .picture("B2", picture(png_bytes(10, 10, [255, 0, 0, 255]), 0, 0));
    let sheet = load_sheet(&wb, "Data");
    let layout = SheetLayout::from_sheet(&sheet);
    assert_eq!(sheet.images().len(), 1);

    let commands = plan(&sheet);
    let (x, y, w, h) = commands
        .iter()
        .find_map(|c| match c {
            PaintCommand::Image {
                x, y, width, height, ..
            } => Some((*x, *y, *width, *height)),
            _ => None,
        })
        .expect("image command");
    let anchor = layout.cell_rect(2, 2).unwrap();
    assert_eq!(x, (anchor.x * 2.0).round());
    assert_eq!(y, (anchor.y * 2.0).round());
    assert_eq!((w, h), (20.0, 20.0));

    let image = render(&sheet);
    assert_pixel_near(&image, (x + 10.0) as u32, (y + 10.0) as u32, [255, 0, 0], 2);
}

#[test]
fn test_picture_explicit_size_and_offset() {
    let mut wb = MemoryWorkbook::new();
    let mut pic = picture(png_bytes(10, 10, [0, 255, 0, 255]), 5, 4);
    pic.offset_x = 12_500;
    pic.offset_y = 25_000;
    wb.sheet("Data").set("B2", "x").picture("A1", pic);
    let sheet = load_sheet(&wb, "Data");

    let commands = plan(&sheet);
    let found = commands.iter().find_map(|c| match c {
        PaintCommand::Image {
            x, y, width, height, ..
        } => Some((*x, *y, *width, *height)),
        _ => None,
    });
    // 12500 EMU x 0.0008 = 10 px, 25000 EMU = 20 px, both doubled
    assert_eq!(found, Some((20.0, 40.0, 10.0, 8.0)));
}

#[test]
fn test_pictures_draw_over_fills() {
    let mut wb = MemoryWorkbook::new();
    let yellow = wb.add_style(solid("FFFFFF00"));
    wb.sheet("Data")
        .set("A1", "x")
        .style("A1", yellow)
        .picture("A1", picture(png_bytes(6, 6, [0, 0, 255, 255]), 0, 0));
    let sheet = load_sheet(&wb, "Data");
    let image = render(&sheet);

    assert_pixel_near(&image, 6, 6, [0, 0, 255], 2);
    assert_pixel_rgb(&image, 60, 20, [255, 255, 0]);
}

#[test]
fn test_undecodable_picture_is_skipped() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data")
        .set("A1", "x")
        .picture("A1", picture(b"not an image".to_vec(), 0, 0));
    let sheet = load_sheet(&wb, "Data");

    assert!(sheet.images().is_empty());
    assert!(renderer_without_fonts().render(&sheet).is_ok());
}

#[test]
fn test_xlsx_picture_renders() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .cell("D4", "x", None)
                .picture(PictureEntry {
                    row: 2,
                    col: 2,
                    col_off: 0,
                    row_off: 0,
                    extent: Some((95_250, 95_250)),
                    png: png_bytes(3, 3, [255, 0, 255, 255]),
                }),
        )
        .build();
    let sheet = load_xlsx_sheet(&xlsx, "Sheet1");
    assert_eq!(sheet.images().len(), 1);
    assert_eq!(sheet.images()[0].display_size(), (10, 10));

    let layout = SheetLayout::from_sheet(&sheet);
    let image = render(&sheet);
    let x = (layout.col_positions[1] * 2.0).round() as u32 + 10;
    let y = (layout.row_positions[1] * 2.0).round() as u32 + 10;
    assert_pixel_near(&image, x, y, [255, 0, 255], 2);
}

// ============================================================================
// OUTPUT
// ============================================================================

#[test]
fn test_empty_sheet_is_invalid_input() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Blank");
    let sheet = load_sheet(&wb, "Blank");

    let err = renderer_without_fonts().render(&sheet).unwrap_err();
    assert!(matches!(err, XlsnapError::InvalidInput(_)));
}

#[test]
fn test_rendering_is_deterministic() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .cell("A1", "Header", Some(StyleBuilder::new().bold().bg_color("FFCCCCCC")))
                .cell("B2", 12.5, Some(StyleBuilder::new().border_all("thin", Some("FF000000"))))
                .merge("A3:C4"),
        )
        .build();
    let sheet = load_xlsx_sheet(&xlsx, "Sheet1");
    let renderer = Renderer::new(system_fonts());

    let first = renderer.render(&sheet).unwrap();
    let second = renderer.render(&sheet).unwrap();
    assert_eq!(first.as_pixmap().data(), second.as_pixmap().data());
}

#[test]
fn test_png_encoding() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("B2", "x");
    let sheet = load_sheet(&wb, "Data");
    let raster = render(&sheet);

    let png = raster.encode_png().unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (raster.width(), raster.height()));
    assert_eq!(decoded.get_pixel(5, 5).0, raster.pixel(5, 5).unwrap());
}

#[test]
fn test_save_png_writes_file() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("A1", "x");
    let sheet = load_sheet(&wb, "Data");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");

    render(&sheet).save_png(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}

// ============================================================================
// TEXT
// ============================================================================

fn dark_pixels(image: &xlsnap::RasterImage, x0: u32, y0: u32, x1: u32, y1: u32) -> usize {
    let mut count = 0;
    for y in y0..y1 {
        for x in x0..x1 {
            if let Some([r, g, b, _]) = image.pixel(x, y) {
                if r < 128 && g < 128 && b < 128 {
                    count += 1;
                }
            }
        }
    }
    count
}

#[test]
fn test_text_needs_fonts() {
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("A1", "Hello");
    let sheet = load_sheet(&wb, "Data");
    let image = render(&sheet);

    assert_eq!(dark_pixels(&image, 4, 4, image.width() - 4, image.height() - 4), 0);
}

#[test]
fn test_text_drawn_with_system_fonts() {
    let fonts = system_fonts();
    if fonts.is_empty() {
        eprintln!("no system fonts; skipping");
        return;
    }
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("A1", "Hello");
    let sheet = load_sheet(&wb, "Data");
    let image = Renderer::new(Arc::clone(&fonts)).render(&sheet).unwrap();

    assert!(dark_pixels(&image, 2, 2, image.width() - 2, image.height() - 2) > 0);
}

#[test]
fn test_right_aligned_text_sits_right() {
    let fonts = system_fonts();
    if fonts.is_empty() {
        eprintln!("no system fonts; skipping");
        return;
    }
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("A1", "1").column_width("A", 30.0);
    let sheet = load_sheet(&wb, "Data");
    let image = Renderer::new(fonts).render(&sheet).unwrap();

    let half = image.width() / 2;
    let left = dark_pixels(&image, 2, 2, half, image.height() - 2);
    let right = dark_pixels(&image, half, 2, image.width() - 2, image.height() - 2);
    assert_eq!(left, 0);
    assert!(right > 0);
}

#[test]
fn test_centered_text_ink_is_vertically_centered() {
    let fonts = system_fonts();
    if fonts.is_empty() {
        eprintln!("no system fonts; skipping");
        return;
    }
    let mut wb = MemoryWorkbook::new();
    wb.sheet("Data").set("A1", "HHH").row_height(1, 60.0);
    let sheet = load_sheet(&wb, "Data");
    let image = Renderer::new(fonts).render(&sheet).unwrap();

    // Unaligned text centers vertically in the 120px device row
    let inked: Vec<u32> = (3..117)
        .filter(|&y| dark_pixels(&image, 3, y, image.width() - 3, y + 1) > 0)
        .collect();
    assert!(!inked.is_empty());
    let middle = (inked[0] + inked[inked.len() - 1]) as f32 / 2.0;
    assert!(
        (middle - 60.0).abs() <= 6.0,
        "ink rows {}..={} not centered",
        inked[0],
        inked[inked.len() - 1]
    );
}
