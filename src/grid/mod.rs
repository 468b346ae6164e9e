//! Cell grid construction.
//!
//! [`Sheet::load`] reconciles the row-major view, the column-major view, the
//! declared dimension and the merge list of one worksheet into a dense grid:
//! every address in `1..=rows` x `1..=cols` has exactly one [`Cell`]. Styles
//! are bound and resolved eagerly, so a loaded sheet is immutable and can be
//! shared across threads.

pub mod images;

pub use images::ExcelImage;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cell_ref::{cell_name, column_name, parse_cell_range, parse_cell_ref, CellRange};
use crate::error::{Result, XlsnapError};
use crate::layout::estimate::{
    clamp_row_height, estimate_row_height, fit_column_width, is_default_col_width,
    is_default_row_height, RowCellMetrics,
};
use crate::style::{ResolvedStyle, StyleCache, StyleResolver, DEFAULT_FONT_SIZE};
use crate::workbook::{Workbook, DEFAULT_COL_WIDTH};

/// Default ceiling on `rows x cols` for one sheet.
pub const DEFAULT_MAX_CELLS: u64 = 4_000_000;

/// Knobs for [`Sheet::load`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Reject sheets whose used range exceeds this many cells. `None` or 0
    /// disables the check.
    pub max_cells: Option<u64>,
    /// Font size for styles that carry none.
    pub default_font_size: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_cells: Some(DEFAULT_MAX_CELLS),
            default_font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl LoadOptions {
    fn limit(&self) -> Option<u64> {
        self.max_cells.filter(|&n| n > 0)
    }
}

/// A merge region. Every cell inside holds the same `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRange {
    range: CellRange,
    addresses: Vec<(u32, u32)>,
}

impl MergedRange {
    pub fn new(range: CellRange) -> Self {
        Self {
            addresses: range.addresses(),
            range,
        }
    }

    pub fn range(&self) -> CellRange {
        self.range
    }

    /// Addresses in row-major order.
    pub fn addresses(&self) -> &[(u32, u32)] {
        &self.addresses
    }

    /// Top-left address; the only one that is painted.
    pub fn owner(&self) -> (u32, u32) {
        (self.range.start_row, self.range.start_col)
    }

    pub fn end(&self) -> (u32, u32) {
        (self.range.end_row, self.range.end_col)
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.range.contains(row, col)
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: String,
    pub style_id: i32,
    pub merge: Option<Arc<MergedRange>>,
}

impl Cell {
    fn new(row: u32, col: u32, value: String) -> Self {
        Self {
            row,
            col,
            value,
            style_id: 0,
            merge: None,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merge.is_some()
    }

    /// True for the top-left cell of a merge region.
    pub fn is_merge_owner(&self) -> bool {
        self.merge
            .as_ref()
            .is_some_and(|m| m.owner() == (self.row, self.col))
    }

    /// Whether this cell receives paint: unmerged cells and merge owners.
    pub fn is_drawn(&self) -> bool {
        self.merge.is_none() || self.is_merge_owner()
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }

    pub fn address(&self) -> String {
        cell_name(self.row, self.col)
    }
}

/// One worksheet's dense, styled grid plus its sizing and pictures.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    index: usize,
    rows: u32,
    cols: u32,
    cells: HashMap<(u32, u32), Cell>,
    styles: StyleCache,
    /// Points, one entry per row.
    row_heights: BTreeMap<u32, f64>,
    /// Column-width units, one entry per column.
    col_widths: BTreeMap<u32, f64>,
    images: Vec<ExcelImage>,
    merges: Vec<Arc<MergedRange>>,
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Parse declared merges, dropping malformed ones.
fn parse_merges(declared: &[(String, String)]) -> Vec<CellRange> {
    declared
        .iter()
        .filter_map(|(start, end)| match (parse_cell_ref(start), parse_cell_ref(end)) {
            (Some(a), Some(b)) => Some(CellRange::from_corners(a, b)),
            _ => {
                let err = XlsnapError::MalformedRange(format!("{start}:{end}"));
                log::debug!("skipping merge: {err}");
                None
            }
        })
        .collect()
}

/// Keep merges in declaration order, dropping any that overlap an earlier one.
fn non_overlapping(parsed: Vec<CellRange>) -> Vec<CellRange> {
    let mut accepted: Vec<CellRange> = Vec::new();
    for range in parsed {
        let overlaps = accepted.iter().any(|other| {
            range.start_row <= other.end_row
                && other.start_row <= range.end_row
                && range.start_col <= other.end_col
                && other.start_col <= range.end_col
        });
        if overlaps {
            log::debug!(
                "skipping merge {}:{}: overlaps an earlier merge",
                cell_name(range.start_row, range.start_col),
                cell_name(range.end_row, range.end_col)
            );
            continue;
        }
        accepted.push(range);
    }
    accepted
}

impl Sheet {
    /// Build the grid for sheet `name`.
    ///
    /// # Errors
    /// [`XlsnapError::NotFound`] for an unknown sheet,
    /// [`XlsnapError::TooLarge`] when the used range exceeds
    /// [`LoadOptions::max_cells`], and whatever the workbook reports for the
    /// sheet-level views.
    #[allow(clippy::too_many_lines)]
    pub fn load(workbook: &dyn Workbook, name: &str, options: &LoadOptions) -> Result<Self> {
        let index = workbook
            .sheet_index(name)
            .ok_or_else(|| XlsnapError::NotFound(name.to_string()))?;

        let mut cells: HashMap<(u32, u32), Cell> = HashMap::new();
        let mut max_row = 0u32;
        let mut max_col = 0u32;

        // Row-major view: every value present, empty strings included
        for (r_idx, row) in workbook.rows(name)?.into_iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let r = to_u32(r_idx + 1);
            max_row = max_row.max(r);
            max_col = max_col.max(to_u32(row.len()));
            for (c_idx, value) in row.into_iter().enumerate() {
                let c = to_u32(c_idx + 1);
                cells.insert((r, c), Cell::new(r, c, value));
            }
        }

        // Column-major view keeps explicit empties the row view trims
        for (c_idx, column) in workbook.columns(name)?.into_iter().enumerate() {
            let c = to_u32(c_idx + 1);
            if !column.is_empty() {
                max_col = max_col.max(c);
                max_row = max_row.max(to_u32(column.len()));
            }
            for (r_idx, value) in column.into_iter().enumerate() {
                let r = to_u32(r_idx + 1);
                cells.entry((r, c)).or_insert_with(|| Cell::new(r, c, value));
            }
        }

        let dimension = workbook.dimension(name)?;
        if !dimension.trim().is_empty() {
            match parse_cell_range(&dimension) {
                Some(range) => {
                    max_row = max_row.max(range.end_row);
                    max_col = max_col.max(range.end_col);
                }
                None => {
                    let err = XlsnapError::MalformedRange(dimension.clone());
                    log::debug!("{name}: ignoring dimension: {err}");
                }
            }
        }

        // Every declared merge widens the used range, even one dropped below
        let parsed = parse_merges(&workbook.merge_ranges(name)?);
        for range in &parsed {
            max_row = max_row.max(range.end_row);
            max_col = max_col.max(range.end_col);
        }
        let merge_ranges = non_overlapping(parsed);

        if let Some(limit) = options.limit() {
            if u64::from(max_row) * u64::from(max_col) > limit {
                return Err(XlsnapError::TooLarge {
                    rows: max_row,
                    cols: max_col,
                    limit,
                });
            }
        }

        for r in 1..=max_row {
            for c in 1..=max_col {
                cells
                    .entry((r, c))
                    .or_insert_with(|| Cell::new(r, c, String::new()));
            }
        }

        let resolver =
            StyleResolver::new(workbook).with_default_font_size(options.default_font_size);
        let mut styles = StyleCache::new(resolver.default_style());
        let mut style_binds = 0usize;
        for cell in cells.values_mut() {
            cell.style_id = match workbook.style_id(name, &cell.address()) {
                Ok(id) => id,
                Err(e) => {
                    log::debug!("{name}!{}: style id lookup failed: {e}", cell.address());
                    0
                }
            };
            styles.get_or_resolve(cell.style_id, &resolver);
            style_binds += 1;
        }

        let mut merges = Vec::with_capacity(merge_ranges.len());
        for range in merge_ranges {
            let merged = Arc::new(MergedRange::new(range));
            for &(r, c) in merged.addresses() {
                if let Some(cell) = cells.get_mut(&(r, c)) {
                    cell.merge = Some(Arc::clone(&merged));
                }
            }
            merges.push(merged);
        }

        let mut sheet = Self {
            name: name.to_string(),
            index,
            rows: max_row,
            cols: max_col,
            cells,
            styles,
            row_heights: BTreeMap::new(),
            col_widths: BTreeMap::new(),
            images: Vec::new(),
            merges,
        };
        sheet.compute_sizes(workbook)?;
        sheet.load_images(workbook);

        log::info!(
            "loaded sheet {:?}: {} rows x {} cols, {} cells, {} style binds, {} style cache misses, {} merges, {} images",
            sheet.name,
            sheet.rows,
            sheet.cols,
            sheet.cells.len(),
            style_binds,
            sheet.styles.misses(),
            sheet.merges.len(),
            sheet.images.len()
        );
        Ok(sheet)
    }

    /// Load every sheet of a workbook, in workbook order.
    ///
    /// # Errors
    /// The first error any sheet produces.
    pub fn load_all(workbook: &dyn Workbook, options: &LoadOptions) -> Result<Vec<Self>> {
        workbook
            .sheet_names()
            .iter()
            .map(|name| Self::load(workbook, name, options))
            .collect()
    }

    /// Row heights first (against declared column widths), then column
    /// widths.
    fn compute_sizes(&mut self, workbook: &dyn Workbook) -> Result<()> {
        let mut declared_widths = Vec::with_capacity(self.cols as usize);
        for c in 1..=self.cols {
            declared_widths.push(workbook.column_width(&self.name, &column_name(c))?);
        }
        let declared_width = |c: u32| {
            declared_widths
                .get(c.saturating_sub(1) as usize)
                .copied()
                .filter(|w| *w > 0.0)
                .unwrap_or(DEFAULT_COL_WIDTH)
        };

        for r in 1..=self.rows {
            let declared = workbook.row_height(&self.name, r)?;
            let height = if is_default_row_height(declared) {
                estimate_row_height((1..=self.cols).filter_map(|c| {
                    let cell = self.cells.get(&(r, c))?;
                    let style = self.styles.get(cell.style_id);
                    Some(RowCellMetrics {
                        value: &cell.value,
                        font_size: style.font.size,
                        col_width: declared_width(c),
                        wraps: style.wraps(),
                    })
                }))
            } else {
                clamp_row_height(declared)
            };
            self.row_heights.insert(r, height);
        }

        for c in 1..=self.cols {
            let declared = declared_widths
                .get(c.saturating_sub(1) as usize)
                .copied()
                .unwrap_or(DEFAULT_COL_WIDTH);
            let width = if is_default_col_width(declared) {
                fit_column_width(
                    declared,
                    (1..=self.rows)
                        .filter_map(|r| self.cells.get(&(r, c)).map(|cell| cell.value.as_str())),
                )
            } else {
                declared
            };
            self.col_widths.insert(c, width);
        }
        Ok(())
    }

    fn load_images(&mut self, workbook: &dyn Workbook) {
        for r in 1..=self.rows {
            for c in 1..=self.cols {
                let addr = cell_name(r, c);
                let pictures = match workbook.pictures(&self.name, &addr) {
                    Ok(p) => p,
                    Err(e) => {
                        log::debug!("{}!{addr}: picture lookup failed: {e}", self.name);
                        continue;
                    }
                };
                for picture in &pictures {
                    match ExcelImage::from_picture(r, c, picture) {
                        Ok(image) => self.images.push(image),
                        Err(e) => log::warn!(
                            "{}!{addr}: skipping picture {:?}: {e}",
                            self.name,
                            picture.name
                        ),
                    }
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the workbook's sheet list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Look up a cell by A1 address.
    pub fn cell_at(&self, addr: &str) -> Option<&Cell> {
        let (row, col) = parse_cell_ref(addr)?;
        self.cell(row, col)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        (1..=self.rows)
            .flat_map(move |r| (1..=self.cols).filter_map(move |c| self.cells.get(&(r, c))))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Letters of the last column, empty for an empty sheet.
    pub fn max_col_name(&self) -> String {
        column_name(self.cols)
    }

    /// Resolved width of a 1-based column in column-width units.
    pub fn column_width(&self, col: u32) -> f64 {
        self.col_widths
            .get(&col)
            .copied()
            .unwrap_or(DEFAULT_COL_WIDTH)
    }

    /// Resolved height of a 1-based row in points.
    pub fn row_height(&self, row: u32) -> f64 {
        self.row_heights
            .get(&row)
            .copied()
            .unwrap_or(crate::layout::estimate::MIN_ROW_HEIGHT)
    }

    pub fn style_of(&self, cell: &Cell) -> &ResolvedStyle {
        self.styles.get(cell.style_id)
    }

    pub fn styles(&self) -> &StyleCache {
        &self.styles
    }

    pub fn merges(&self) -> &[Arc<MergedRange>] {
        &self.merges
    }

    pub fn images(&self) -> &[ExcelImage] {
        &self.images
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
    use crate::workbook::{MemoryWorkbook, Picture, RawAlignment, RawFont, RawStyle};

    fn load(wb: &MemoryWorkbook, name: &str) -> Sheet {
        Sheet::load(wb, name, &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_unknown_sheet() {
        let wb = MemoryWorkbook::new();
        let err = Sheet::load(&wb, "Nope", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, XlsnapError::NotFound(ref n) if n == "Nope"));
    }

    #[test]
    fn test_empty_sheet_loads() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("Blank");
        let sheet = load(&wb, "Blank");
        assert!(sheet.is_empty());
        assert_eq!(sheet.cell_count(), 0);
        assert_eq!(sheet.max_col_name(), "");
    }

    #[test]
    fn test_views_reconcile_into_dense_grid() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S")
            .set("A1", "a")
            .set("C2", "c")
            .set_empty("B4")
            .dimension("A1:D3");
        let sheet = load(&wb, "S");

        // B4 only shows up in the column view, D comes from the dimension
        assert_eq!((sheet.rows(), sheet.cols()), (4, 4));
        assert_eq!(sheet.cell_count(), 16);
        assert_eq!(sheet.cell_at("C2").unwrap().value, "c");
        assert!(sheet.cell_at("B4").unwrap().is_empty());
        assert!(sheet.cell_at("D4").is_some());
    }

    #[test]
    fn test_single_address_dimension() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").dimension("C2");
        let sheet = load(&wb, "S");
        assert_eq!((sheet.rows(), sheet.cols()), (2, 3));
        assert_eq!(sheet.cell_count(), 6);
    }

    #[test]
    fn test_malformed_dimension_and_merge_are_skipped() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S")
            .set("A1", "x")
            .dimension("not a range")
            .merge("A1:??");
        let sheet = load(&wb, "S");
        assert_eq!((sheet.rows(), sheet.cols()), (1, 1));
        assert!(sheet.merges().is_empty());
    }

    #[test]
    fn test_merge_shares_one_region() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").set("A1", "Title").merge("A1:C2");
        let sheet = load(&wb, "S");

        assert_eq!((sheet.rows(), sheet.cols()), (2, 3));
        let owner = sheet.cell(1, 1).unwrap();
        assert!(owner.is_merge_owner());
        let region = owner.merge.as_ref().unwrap();
        for &(r, c) in region.addresses() {
            let cell = sheet.cell(r, c).unwrap();
            assert!(cell.is_merged());
            assert!(Arc::ptr_eq(cell.merge.as_ref().unwrap(), region));
            assert_eq!(cell.is_drawn(), (r, c) == (1, 1));
        }
    }

    #[test]
    fn test_overlapping_merge_keeps_first() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").set("A1", "x").merge("A1:B2").merge("B2:C3");
        let sheet = load(&wb, "S");
        assert_eq!(sheet.merges().len(), 1);
        assert_eq!((sheet.rows(), sheet.cols()), (3, 3));
        assert!(!sheet.cell(3, 3).unwrap().is_merged());
    }

    #[test]
    fn test_too_large() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").dimension("A1:J10");
        let options = LoadOptions {
            max_cells: Some(50),
            ..LoadOptions::default()
        };
        let err = Sheet::load(&wb, "S", &options).unwrap_err();
        assert!(matches!(
            err,
            XlsnapError::TooLarge {
                rows: 10,
                cols: 10,
                limit: 50
            }
        ));

        let unlimited = LoadOptions {
            max_cells: Some(0),
            ..LoadOptions::default()
        };
        assert_eq!(Sheet::load(&wb, "S", &unlimited).unwrap().cell_count(), 100);
    }

    #[test]
    fn test_styles_bound_once_per_id() {
        let mut wb = MemoryWorkbook::new();
        let big = wb.add_style(RawStyle {
            font: Some(RawFont {
                size: 20.0,
                ..RawFont::default()
            }),
            ..RawStyle::default()
        });
        wb.sheet("S")
            .set("A1", "x")
            .set("B1", "y")
            .style("A1", big)
            .style("B1", big)
            .set("A2", "z")
            .style("A2", 999);
        let sheet = load(&wb, "S");

        assert_eq!(sheet.styles().misses(), 3);
        let a1 = sheet.cell(1, 1).unwrap();
        assert_eq!(sheet.style_of(a1).font.size, 20.0);
        let a2 = sheet.cell(2, 1).unwrap();
        assert_eq!(a2.style_id, 999);
        assert_eq!(sheet.style_of(a2).font.size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_row_height_estimation() {
        let mut wb = MemoryWorkbook::new();
        let no_wrap = wb.add_style(RawStyle {
            alignment: Some(RawAlignment::default()),
            ..RawStyle::default()
        });
        let long = "abcdefghijklmnopqrstuvwxy";
        wb.sheet("S")
            .set("A1", long)
            .set("A2", long)
            .style("A2", no_wrap)
            .set("A3", "x")
            .row_height(3, 42.0)
            .set("A4", "x")
            .row_height(4, 500.0)
            .column_width("A", 30.0);
        let sheet = load(&wb, "S");

        // Estimation divides by the declared 30-unit width: one line, clamped up
        assert_eq!(sheet.row_height(1), 15.0);
        assert_eq!(sheet.row_height(2), 15.0);
        assert_eq!(sheet.row_height(3), 42.0);
        assert_eq!(sheet.row_height(4), 150.0);
        assert_eq!(sheet.column_width(1), 30.0);
    }

    #[test]
    fn test_wrapped_row_and_column_fit() {
        let mut wb = MemoryWorkbook::new();
        let long = "abcdefghijklmnopqrstuvwxy";
        wb.sheet("S").set("A1", long).set("B1", "ok");
        let sheet = load(&wb, "S");

        // Three lines against the default width, then A is widened
        assert!((sheet.row_height(1) - 3.0 * 11.0 * 1.33).abs() < 1e-9);
        assert!((sheet.column_width(1) - 20.0 * 1.4).abs() < 1e-9);
        assert_eq!(sheet.column_width(2), DEFAULT_COL_WIDTH);
    }

    #[test]
    fn test_cell_conveniences() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").set("B3", " 42 ").set("A1", "1.5");
        let sheet = load(&wb, "S");
        let b3 = sheet.cell_at("B3").unwrap();
        assert_eq!(b3.address(), "B3");
        assert_eq!(b3.as_i64(), Some(42));
        assert_eq!(sheet.cell_at("A1").unwrap().as_f64(), Some(1.5));
        assert_eq!(sheet.cell_at("A1").unwrap().as_i64(), None);
        assert!(!b3.is_merge_owner());
        assert!(b3.is_drawn());
        assert_eq!(sheet.max_col_name(), "B");
        assert_eq!(sheet.cells().count(), 6);
        assert_eq!(sheet.cells().next().unwrap().address(), "A1");
    }

    #[test]
    fn test_bad_picture_is_skipped() {
        let mut wb = MemoryWorkbook::new();
        let good = images::tests::png_bytes(2, 2, [0, 0, 255, 255]);
        wb.sheet("S")
            .set("A1", "x")
            .picture(
                "A1",
                Picture {
                    name: "broken".into(),
                    bytes: b"garbage".to_vec(),
                    format: "png".into(),
                    ..Picture::default()
                },
            )
            .picture(
                "A1",
                Picture {
                    name: "ok".into(),
                    bytes: good,
                    format: "png".into(),
                    ..Picture::default()
                },
            );
        let sheet = load(&wb, "S");
        assert_eq!(sheet.images().len(), 1);
        assert_eq!(sheet.images()[0].name, "ok");
        assert_eq!((sheet.images()[0].row, sheet.images()[0].col), (1, 1));
    }
}
