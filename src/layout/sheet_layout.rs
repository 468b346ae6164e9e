//! Pre-computed pixel geometry for a loaded sheet.
//!
//! Column and row sizes are converted to pixels once and prefix-summed, so
//! every cell rectangle is two lookups. Positions are 1-based like the
//! grid: `col_positions[0]` is the left edge of the sheet and
//! `col_positions[c]` the right edge of column `c`.

use std::collections::HashMap;

use super::estimate::{COL_UNIT_TO_PIXEL, POINT_TO_PIXEL};
use crate::grid::Sheet;

/// Cell bounds in logical (pre-scale) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutRect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Pixel geometry of a sheet.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    /// Cumulative column edges, `cols + 1` entries.
    pub col_positions: Vec<f64>,
    /// Cumulative row edges, `rows + 1` entries.
    pub row_positions: Vec<f64>,
    /// Merge owner -> bottom-right corner.
    pub merge_spans: HashMap<(u32, u32), (u32, u32)>,
    /// Per column boundary, the row-edge intervals a vertical grid line
    /// must not cross. Intervals index `row_positions`.
    pub merge_vline_skips: Vec<Vec<(u32, u32)>>,
    /// Per row boundary, the column-edge intervals a horizontal grid line
    /// must not cross. Intervals index `col_positions`.
    pub merge_hline_skips: Vec<Vec<(u32, u32)>>,
    pub rows: u32,
    pub cols: u32,
}

fn prefix_sums(sizes: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut positions = vec![0.0];
    let mut acc = 0.0;
    for size in sizes {
        acc += size;
        positions.push(acc);
    }
    positions
}

impl SheetLayout {
    /// Build the layout from a sheet's resolved sizes and merges.
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let col_widths: Vec<f64> = (1..=sheet.cols())
            .map(|c| sheet.column_width(c) * COL_UNIT_TO_PIXEL)
            .collect();
        let row_heights: Vec<f64> = (1..=sheet.rows())
            .map(|r| sheet.row_height(r) * POINT_TO_PIXEL)
            .collect();
        let merges: Vec<(u32, u32, u32, u32)> = sheet
            .merges()
            .iter()
            .map(|m| {
                let r = m.range();
                (r.start_row, r.start_col, r.end_row, r.end_col)
            })
            .collect();
        Self::new(&col_widths, &row_heights, &merges)
    }

    /// Build from pixel sizes (index 0 is column/row 1) and merge ranges as
    /// `(start_row, start_col, end_row, end_col)`.
    pub fn new(
        col_widths: &[f64],
        row_heights: &[f64],
        merge_ranges: &[(u32, u32, u32, u32)],
    ) -> Self {
        let col_positions = prefix_sums(col_widths.iter().copied());
        let row_positions = prefix_sums(row_heights.iter().copied());
        let cols = u32::try_from(col_widths.len()).unwrap_or(u32::MAX);
        let rows = u32::try_from(row_heights.len()).unwrap_or(u32::MAX);

        let mut merge_spans = HashMap::new();
        let mut merge_vline_skips: Vec<Vec<(u32, u32)>> = vec![Vec::new(); col_positions.len()];
        let mut merge_hline_skips: Vec<Vec<(u32, u32)>> = vec![Vec::new(); row_positions.len()];

        for &(start_row, start_col, end_row, end_col) in merge_ranges {
            merge_spans.insert((start_row, start_col), (end_row, end_col));
            for boundary in start_col..end_col {
                if let Some(list) = merge_vline_skips.get_mut(boundary as usize) {
                    list.push((start_row.saturating_sub(1), end_row));
                }
            }
            for boundary in start_row..end_row {
                if let Some(list) = merge_hline_skips.get_mut(boundary as usize) {
                    list.push((start_col.saturating_sub(1), end_col));
                }
            }
        }

        for ranges in &mut merge_vline_skips {
            merge_skip_ranges(ranges);
        }
        for ranges in &mut merge_hline_skips {
            merge_skip_ranges(ranges);
        }

        Self {
            col_positions,
            row_positions,
            merge_spans,
            merge_vline_skips,
            merge_hline_skips,
            rows,
            cols,
        }
    }

    fn col_edge(&self, idx: u32) -> Option<f64> {
        self.col_positions.get(idx as usize).copied()
    }

    fn row_edge(&self, idx: u32) -> Option<f64> {
        self.row_positions.get(idx as usize).copied()
    }

    /// Rectangle of a 1-based cell. Merge owners span their whole region;
    /// other merged cells keep their own single-cell rectangle.
    pub fn cell_rect(&self, row: u32, col: u32) -> Option<LayoutRect> {
        if row == 0 || col == 0 || row > self.rows || col > self.cols {
            return None;
        }
        let (end_row, end_col) = self
            .merge_spans
            .get(&(row, col))
            .copied()
            .unwrap_or((row, col));
        let x = self.col_edge(col - 1)?;
        let y = self.row_edge(row - 1)?;
        let right = self.col_edge(end_col).or_else(|| self.col_positions.last().copied())?;
        let bottom = self.row_edge(end_row).or_else(|| self.row_positions.last().copied())?;
        Some(LayoutRect {
            x,
            y,
            width: right - x,
            height: bottom - y,
        })
    }

    pub fn total_width(&self) -> f64 {
        self.col_positions.last().copied().unwrap_or(0.0)
    }

    pub fn total_height(&self) -> f64 {
        self.row_positions.last().copied().unwrap_or(0.0)
    }

    pub fn col_width(&self, col: u32) -> f64 {
        match (self.col_edge(col.saturating_sub(1)), self.col_edge(col)) {
            (Some(a), Some(b)) if col > 0 => b - a,
            _ => 0.0,
        }
    }

    pub fn row_height(&self, row: u32) -> f64 {
        match (self.row_edge(row.saturating_sub(1)), self.row_edge(row)) {
            (Some(a), Some(b)) if row > 0 => b - a,
            _ => 0.0,
        }
    }

    /// Device canvas size: each total scaled and floored.
    // Floored and clamped to the u32 range before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn canvas_size(&self, scale: f64) -> (u32, u32) {
        let to_px = |v: f64| (v * scale).floor().clamp(0.0, f64::from(u32::MAX)) as u32;
        (to_px(self.total_width()), to_px(self.total_height()))
    }

    /// Drawn spans `(y0, y1)` of the vertical grid line at column boundary
    /// `boundary` (0 = left edge), with merge interiors cut out.
    pub fn vertical_segments(&self, boundary: u32) -> Vec<(f64, f64)> {
        let skips = self
            .merge_vline_skips
            .get(boundary as usize)
            .map_or(&[][..], Vec::as_slice);
        segments(&self.row_positions, skips)
    }

    /// Drawn spans `(x0, x1)` of the horizontal grid line at row boundary
    /// `boundary` (0 = top edge).
    pub fn horizontal_segments(&self, boundary: u32) -> Vec<(f64, f64)> {
        let skips = self
            .merge_hline_skips
            .get(boundary as usize)
            .map_or(&[][..], Vec::as_slice);
        segments(&self.col_positions, skips)
    }
}

/// Full extent of `positions` minus the sorted, disjoint `skips`.
fn segments(positions: &[f64], skips: &[(u32, u32)]) -> Vec<(f64, f64)> {
    let start = positions.first().copied().unwrap_or(0.0);
    let end = positions.last().copied().unwrap_or(0.0);
    let edge = |i: u32| positions.get(i as usize).copied().unwrap_or(end);

    let mut out = Vec::new();
    let mut cursor = start;
    for &(a, b) in skips {
        let (skip_start, skip_end) = (edge(a), edge(b));
        if skip_start > cursor {
            out.push((cursor, skip_start));
        }
        cursor = cursor.max(skip_end);
    }
    if end > cursor {
        out.push((cursor, end));
    }
    out
}

fn merge_skip_ranges(ranges: &mut Vec<(u32, u32)>) {
    if ranges.len() <= 1 {
        return;
    }

    ranges.sort_by_key(|r| r.0);
    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges.drain(..) {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                if end > last.1 {
                    last.1 = end;
                }
                continue;
            }
        }
        merged.push((start, end));
    }
    *ranges = merged;
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

    fn grid(cols: usize, rows: usize, merges: &[(u32, u32, u32, u32)]) -> SheetLayout {
        SheetLayout::new(&vec![10.0; cols], &vec![5.0; rows], merges)
    }

    #[test]
    fn test_basic_layout() {
        let layout = grid(4, 3, &[]);
        assert_eq!((layout.rows, layout.cols), (3, 4));
        assert_eq!(layout.total_width(), 40.0);
        assert_eq!(layout.total_height(), 15.0);
        assert_eq!(layout.col_width(2), 10.0);
        assert_eq!(layout.row_height(3), 5.0);
        assert_eq!(layout.col_width(0), 0.0);
        assert_eq!(layout.col_width(9), 0.0);
    }

    #[test]
    fn test_cell_rect() {
        let layout = SheetLayout::new(&[10.0, 20.0, 30.0], &[5.0, 7.0], &[]);
        let rect = layout.cell_rect(2, 3).unwrap();
        assert_eq!(
            rect,
            LayoutRect {
                x: 30.0,
                y: 5.0,
                width: 30.0,
                height: 7.0
            }
        );
        assert!(layout.cell_rect(0, 1).is_none());
        assert!(layout.cell_rect(3, 1).is_none());
    }

    #[test]
    fn test_merged_cells() {
        // A1:B2
        let layout = grid(4, 4, &[(1, 1, 2, 2)]);
        let owner = layout.cell_rect(1, 1).unwrap();
        assert_eq!((owner.width, owner.height), (20.0, 10.0));

        // Covered cells keep a single-cell rectangle
        let covered = layout.cell_rect(2, 2).unwrap();
        assert_eq!((covered.x, covered.y, covered.width), (10.0, 5.0, 10.0));
    }

    #[test]
    fn test_grid_segments_skip_merge_interior() {
        // B2:C3 in a 4x4 grid
        let layout = grid(4, 4, &[(2, 2, 3, 3)]);

        // Boundary between B and C is cut over rows 2..=3
        assert_eq!(layout.vertical_segments(2), vec![(0.0, 5.0), (15.0, 20.0)]);
        // Left edge of B is the merge's outline and stays whole
        assert_eq!(layout.vertical_segments(1), vec![(0.0, 20.0)]);
        // Row boundary 2 runs through the merge over columns B..C
        assert_eq!(layout.horizontal_segments(2), vec![(0.0, 10.0), (30.0, 40.0)]);
        assert_eq!(layout.horizontal_segments(0), vec![(0.0, 40.0)]);
    }

    #[test]
    fn test_adjacent_merges_coalesce() {
        let layout = grid(3, 4, &[(1, 1, 2, 2), (3, 1, 4, 2)]);
        assert_eq!(layout.merge_vline_skips[1], vec![(0, 4)]);
        assert!(layout.vertical_segments(1).is_empty());
    }

    #[test]
    fn test_canvas_size_floors() {
        let layout = SheetLayout::new(&[63.984_375], &[19.95], &[]);
        assert_eq!(layout.canvas_size(2.0), (127, 39));
    }

    #[test]
    fn test_merge_skip_ranges() {
        let mut ranges = vec![(5, 7), (0, 2), (1, 3)];
        merge_skip_ranges(&mut ranges);
        assert_eq!(ranges, vec![(0, 3), (5, 7)]);
    }
}
