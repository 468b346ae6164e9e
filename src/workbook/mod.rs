//! Workbook collaborators: the read-only surface the grid builder pulls from.
//!
//! [`Workbook`] is what sheet loading consumes. Two implementations ship with
//! the crate: [`MemoryWorkbook`] for data already in memory and
//! [`XlsxWorkbook`] which reads an `.xlsx` package.

mod memory;
pub mod xlsx;

pub use memory::{MemoryWorkbook, SheetData};
pub use xlsx::XlsxWorkbook;

use std::collections::BTreeMap;

use crate::error::Result;

/// Row height (points) reported for rows the author never sized.
pub const DEFAULT_ROW_HEIGHT: f64 = 15.0;
/// Column width (character units) reported for columns the author never sized.
pub const DEFAULT_COL_WIDTH: f64 = 9.140625;
/// Tolerance when comparing widths/heights against the sentinels above.
pub const SENTINEL_EPS: f64 = 1e-6;

/// Read-only access to the sheets, values and styles of a workbook.
///
/// Sheet-scoped methods return [`crate::XlsnapError::NotFound`] for unknown
/// sheet names. Addresses are A1 strings and column arguments are letters.
pub trait Workbook: Sync {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Row-major values. Each row is dense up to its last non-empty value;
    /// rows past the last populated one are omitted.
    fn rows(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    /// Column-major values. Unlike [`Workbook::rows`] this keeps cells that
    /// were explicitly written as empty strings.
    fn columns(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    /// Declared used range, either `"B2"` or `"A1:D10"`. Empty if unknown.
    fn dimension(&self, sheet: &str) -> Result<String>;

    /// Height of a 1-based row in points. [`DEFAULT_ROW_HEIGHT`] if unset.
    fn row_height(&self, sheet: &str, row: u32) -> Result<f64>;

    /// Width of a column in character units. [`DEFAULT_COL_WIDTH`] if unset.
    fn column_width(&self, sheet: &str, col: &str) -> Result<f64>;

    /// Declared merge ranges as `(start, end)` address pairs.
    fn merge_ranges(&self, sheet: &str) -> Result<Vec<(String, String)>>;

    /// Style id bound to an address. 0 is the workbook default style.
    fn style_id(&self, sheet: &str, addr: &str) -> Result<i32>;

    /// Raw style record for an id.
    fn resolve_style(&self, style_id: i32) -> Result<RawStyle>;

    /// Pictures anchored at an address.
    fn pictures(&self, sheet: &str, addr: &str) -> Result<Vec<Picture>>;

    /// Position of a sheet in [`Workbook::sheet_names`].
    fn sheet_index(&self, sheet: &str) -> Option<usize> {
        self.sheet_names().iter().position(|n| n == sheet)
    }
}

/// Style record as the workbook stores it, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStyle {
    pub font: Option<RawFont>,
    pub fill: RawFill,
    pub borders: Vec<RawBorder>,
    /// `None` when the style carries no alignment record at all.
    pub alignment: Option<RawAlignment>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFont {
    pub family: String,
    /// Points; 0 means unset.
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    /// `"single"`, `"double"`, ... or empty.
    pub underline: String,
    /// Hex color, empty if unset.
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFill {
    /// Pattern name such as `"solid"` or `"none"`.
    pub pattern: String,
    /// Hex colors; the first one is the visible fill.
    pub colors: Vec<String>,
}

/// One side of a cell border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderSide {
    Left,
    Top,
    Right,
    Bottom,
}

impl BorderSide {
    pub const ALL: [Self; 4] = [Self::Left, Self::Top, Self::Right, Self::Bottom];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Self::Left),
            "top" => Some(Self::Top),
            "right" | "end" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBorder {
    pub side: BorderSide,
    /// Line style name, e.g. `"thin"`, `"medium"`, `"double"`.
    pub style: String,
    /// Hex color, empty if the side has no explicit color.
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAlignment {
    pub horizontal: String,
    pub vertical: String,
    pub wrap_text: bool,
}

/// Picture anchored at a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Picture {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Extension-like tag (`"png"`, `"jpeg"`, ...); may be empty.
    pub format: String,
    /// Offset from the anchor cell's top-left corner, in EMU.
    pub offset_x: i64,
    pub offset_y: i64,
    /// Explicit size in pixels, 0 when the natural size should be used.
    pub width: u32,
    pub height: u32,
}

/// Row-major view over explicitly written cells keyed by `(row, col)`.
///
/// Only non-empty values extend a row or the row count, so trailing empty
/// cells vanish from this view.
pub(crate) fn rows_view(values: &BTreeMap<(u32, u32), String>) -> Vec<Vec<String>> {
    let mut last_in_row: BTreeMap<u32, u32> = BTreeMap::new();
    for (&(r, c), v) in values {
        if !v.is_empty() {
            let last = last_in_row.entry(r).or_insert(0);
            *last = (*last).max(c);
        }
    }
    let max_row = last_in_row.keys().next_back().copied().unwrap_or(0);
    (1..=max_row)
        .map(|r| {
            let width = last_in_row.get(&r).copied().unwrap_or(0);
            (1..=width)
                .map(|c| values.get(&(r, c)).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Column-major view; every written cell counts, empty or not.
pub(crate) fn columns_view(values: &BTreeMap<(u32, u32), String>) -> Vec<Vec<String>> {
    let mut last_in_col: BTreeMap<u32, u32> = BTreeMap::new();
    for &(r, c) in values.keys() {
        let last = last_in_col.entry(c).or_insert(0);
        *last = (*last).max(r);
    }
    let max_col = last_in_col.keys().next_back().copied().unwrap_or(0);
    (1..=max_col)
        .map(|c| {
            let height = last_in_col.get(&c).copied().unwrap_or(0);
            (1..=height)
                .map(|r| values.get(&(r, c)).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}
