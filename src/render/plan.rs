//! Display list: what each paint pass draws, before any pixel is touched.
//!
//! Passes run strictly in order over the whole sheet: base grid, then fill
//! and text per drawn cell, then border overrides, then images. Grid, fill,
//! text and border geometry is in logical pixels; image placement is already
//! in device pixels.

use crate::grid::Sheet;
use crate::layout::{LayoutRect, SheetLayout};
use crate::style::{FontSpec, HAlign, Rgb, VAlign};
use crate::workbook::BorderSide;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    /// One base-grid segment in the grid color.
    GridLine { x1: f64, y1: f64, x2: f64, y2: f64 },
    Fill {
        row: u32,
        col: u32,
        rect: LayoutRect,
        color: Rgb,
    },
    Text {
        row: u32,
        col: u32,
        rect: LayoutRect,
        /// Value split at explicit line breaks.
        lines: Vec<String>,
        font: FontSpec,
        /// Never [`HAlign::General`]; settled against the value.
        h_align: HAlign,
        v_align: VAlign,
        /// Whether lines may be broken further to fit the cell width.
        wrap: bool,
    },
    Border {
        row: u32,
        col: u32,
        side: BorderSide,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f32,
        color: Rgb,
    },
    Image {
        /// Index into [`Sheet::images`].
        index: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl PaintCommand {
    /// The cell a fill, text or border command paints for.
    pub fn cell(&self) -> Option<(u32, u32)> {
        match self {
            Self::Fill { row, col, .. }
            | Self::Text { row, col, .. }
            | Self::Border { row, col, .. } => Some((*row, *col)),
            Self::GridLine { .. } | Self::Image { .. } => None,
        }
    }
}

/// Split at `\n`, `\r\n` or `\r`.
fn split_lines(value: &str) -> Vec<String> {
    value
        .replace("\r\n", "\n")
        .split(['\n', '\r'])
        .map(ToString::to_string)
        .collect()
}

fn border_segment(side: BorderSide, rect: &LayoutRect) -> (f64, f64, f64, f64) {
    let (left, top, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
    match side {
        BorderSide::Left => (left, top, left, bottom),
        BorderSide::Top => (left, top, right, top),
        BorderSide::Right => (right, top, right, bottom),
        BorderSide::Bottom => (left, bottom, right, bottom),
    }
}

fn grid_pass(layout: &SheetLayout, out: &mut Vec<PaintCommand>) {
    for (boundary, &x) in (0u32..).zip(&layout.col_positions) {
        for (y1, y2) in layout.vertical_segments(boundary) {
            out.push(PaintCommand::GridLine { x1: x, y1, x2: x, y2 });
        }
    }
    for (boundary, &y) in (0u32..).zip(&layout.row_positions) {
        for (x1, x2) in layout.horizontal_segments(boundary) {
            out.push(PaintCommand::GridLine { x1, y1: y, x2, y2: y });
        }
    }
}

fn cell_pass(sheet: &Sheet, layout: &SheetLayout, out: &mut Vec<PaintCommand>) {
    for cell in sheet.cells().filter(|c| c.is_drawn()) {
        let Some(rect) = layout.cell_rect(cell.row, cell.col).filter(|r| !r.is_empty()) else {
            continue;
        };
        let style = sheet.style_of(cell);
        if let Some(color) = style.fill {
            out.push(PaintCommand::Fill {
                row: cell.row,
                col: cell.col,
                rect,
                color,
            });
        }
        if !cell.value.is_empty() {
            out.push(PaintCommand::Text {
                row: cell.row,
                col: cell.col,
                rect,
                lines: split_lines(&cell.value),
                font: style.font.clone(),
                h_align: style.h_align.resolve_for(&cell.value),
                v_align: if style.has_alignment {
                    style.v_align
                } else {
                    VAlign::Center
                },
                wrap: style.wraps(),
            });
        }
    }
}

fn border_pass(sheet: &Sheet, layout: &SheetLayout, grid: Rgb, out: &mut Vec<PaintCommand>) {
    for cell in sheet.cells().filter(|c| c.is_drawn()) {
        let Some(rect) = layout.cell_rect(cell.row, cell.col) else {
            continue;
        };
        let style = sheet.style_of(cell);
        for side in BorderSide::ALL {
            if let Some((line, color)) = style.border_override(side, grid) {
                let (x1, y1, x2, y2) = border_segment(side, &rect);
                out.push(PaintCommand::Border {
                    row: cell.row,
                    col: cell.col,
                    side,
                    x1,
                    y1,
                    x2,
                    y2,
                    width: line.width,
                    color,
                });
            }
        }
    }
}

fn image_pass(sheet: &Sheet, layout: &SheetLayout, scale: f64, out: &mut Vec<PaintCommand>) {
    for (index, image) in sheet.images().iter().enumerate() {
        let Some(anchor) = layout.cell_rect(image.row, image.col) else {
            log::warn!(
                "{}: image {:?} anchored outside the sheet at {}",
                sheet.name(),
                image.name,
                crate::cell_ref::cell_name(image.row, image.col)
            );
            continue;
        };
        let (dx, dy) = image.offset_pixels();
        let (width, height) = image.display_size();
        out.push(PaintCommand::Image {
            index,
            x: ((anchor.x + dx) * scale).round(),
            y: ((anchor.y + dy) * scale).round(),
            width: f64::from(width) * scale,
            height: f64::from(height) * scale,
        });
    }
}

/// Build the full display list for `sheet`.
pub fn build_plan(
    sheet: &Sheet,
    layout: &SheetLayout,
    grid: Rgb,
    scale: f64,
) -> Vec<PaintCommand> {
    let mut commands = Vec::new();
    grid_pass(layout, &mut commands);
    cell_pass(sheet, layout, &mut commands);
    border_pass(sheet, layout, grid, &mut commands);
    image_pass(sheet, layout, scale, &mut commands);
    commands
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

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a"), vec!["a"]);
        assert_eq!(split_lines("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_border_segments() {
        let rect = LayoutRect {
            x: 1.0,
            y: 2.0,
            width: 10.0,
            height: 5.0,
        };
        assert_eq!(border_segment(BorderSide::Left, &rect), (1.0, 2.0, 1.0, 7.0));
        assert_eq!(border_segment(BorderSide::Bottom, &rect), (1.0, 7.0, 11.0, 7.0));
    }
}
