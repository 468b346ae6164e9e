//! In-memory workbook for callers that already hold decoded cell data.

use std::collections::{BTreeMap, HashMap};

use super::{
    columns_view, rows_view, Picture, RawStyle, Workbook, DEFAULT_COL_WIDTH, DEFAULT_ROW_HEIGHT,
};
use crate::cell_ref::{column_number, parse_cell_ref};
use crate::error::{Result, XlsnapError};

/// Workbook assembled through a builder API.
///
/// ```
/// use xlsnap::workbook::{MemoryWorkbook, RawStyle, Workbook};
///
/// let mut wb = MemoryWorkbook::new();
/// let bold = wb.add_style(RawStyle::default());
/// wb.sheet("Sheet1")
///     .set("A1", "Title")
///     .style("A1", bold)
///     .merge("A1:C1");
/// assert_eq!(wb.sheet_names(), vec!["Sheet1".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryWorkbook {
    order: Vec<String>,
    data: HashMap<String, SheetData>,
    /// Index 0 is the default style.
    styles: Vec<RawStyle>,
}

/// Contents of one sheet in a [`MemoryWorkbook`].
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    /// Explicitly written cells keyed by `(row, col)`, including empty strings.
    values: BTreeMap<(u32, u32), String>,
    styles: HashMap<(u32, u32), i32>,
    merges: Vec<(String, String)>,
    row_heights: HashMap<u32, f64>,
    col_widths: HashMap<u32, f64>,
    dimension: Option<String>,
    pictures: HashMap<(u32, u32), Vec<Picture>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            data: HashMap::new(),
            styles: vec![RawStyle::default()],
        }
    }

    /// Get a sheet for editing, appending it if it does not exist yet.
    pub fn sheet(&mut self, name: &str) -> &mut SheetData {
        if !self.data.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.data.entry(name.to_string()).or_default()
    }

    /// Register a style and return its id.
    pub fn add_style(&mut self, style: RawStyle) -> i32 {
        self.styles.push(style);
        i32::try_from(self.styles.len() - 1).unwrap_or(i32::MAX)
    }

    /// Replace the default style (id 0).
    pub fn set_default_style(&mut self, style: RawStyle) {
        if let Some(slot) = self.styles.first_mut() {
            *slot = style;
        }
    }

    fn sheet_data(&self, sheet: &str) -> Result<&SheetData> {
        self.data
            .get(sheet)
            .ok_or_else(|| XlsnapError::NotFound(sheet.to_string()))
    }
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetData {
    /// Write a value. Invalid addresses are ignored.
    pub fn set(&mut self, addr: &str, value: impl Into<String>) -> &mut Self {
        match parse_cell_ref(addr) {
            Some(key) => {
                self.values.insert(key, value.into());
            }
            None => log::debug!("ignoring value at invalid address {addr:?}"),
        }
        self
    }

    /// Write an explicit empty string, which only the column view reports.
    pub fn set_empty(&mut self, addr: &str) -> &mut Self {
        self.set(addr, "")
    }

    pub fn style(&mut self, addr: &str, style_id: i32) -> &mut Self {
        if let Some(key) = parse_cell_ref(addr) {
            self.styles.insert(key, style_id);
        }
        self
    }

    /// Declare a merge like `"A1:C1"`. Stored verbatim; validation happens on load.
    pub fn merge(&mut self, range: &str) -> &mut Self {
        let (start, end) = range.split_once(':').unwrap_or((range, range));
        self.merges.push((start.to_string(), end.to_string()));
        self
    }

    pub fn row_height(&mut self, row: u32, height: f64) -> &mut Self {
        self.row_heights.insert(row, height);
        self
    }

    /// Set a column width by letters (`"B"`).
    pub fn column_width(&mut self, col: &str, width: f64) -> &mut Self {
        if let Some(c) = column_number(col) {
            self.col_widths.insert(c, width);
        }
        self
    }

    pub fn dimension(&mut self, dim: &str) -> &mut Self {
        self.dimension = Some(dim.to_string());
        self
    }

    pub fn picture(&mut self, addr: &str, picture: Picture) -> &mut Self {
        if let Some(key) = parse_cell_ref(addr) {
            self.pictures.entry(key).or_default().push(picture);
        }
        self
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(rows_view(&self.sheet_data(sheet)?.values))
    }

    fn columns(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(columns_view(&self.sheet_data(sheet)?.values))
    }

    fn dimension(&self, sheet: &str) -> Result<String> {
        Ok(self.sheet_data(sheet)?.dimension.clone().unwrap_or_default())
    }

    fn row_height(&self, sheet: &str, row: u32) -> Result<f64> {
        Ok(self
            .sheet_data(sheet)?
            .row_heights
            .get(&row)
            .copied()
            .unwrap_or(DEFAULT_ROW_HEIGHT))
    }

    fn column_width(&self, sheet: &str, col: &str) -> Result<f64> {
        let data = self.sheet_data(sheet)?;
        Ok(column_number(col)
            .and_then(|c| data.col_widths.get(&c).copied())
            .unwrap_or(DEFAULT_COL_WIDTH))
    }

    fn merge_ranges(&self, sheet: &str) -> Result<Vec<(String, String)>> {
        Ok(self.sheet_data(sheet)?.merges.clone())
    }

    fn style_id(&self, sheet: &str, addr: &str) -> Result<i32> {
        let data = self.sheet_data(sheet)?;
        Ok(parse_cell_ref(addr)
            .and_then(|key| data.styles.get(&key).copied())
            .unwrap_or(0))
    }

    fn resolve_style(&self, style_id: i32) -> Result<RawStyle> {
        usize::try_from(style_id)
            .ok()
            .and_then(|idx| self.styles.get(idx))
            .cloned()
            .ok_or_else(|| XlsnapError::StyleResolution(format!("unknown style id {style_id}")))
    }

    fn pictures(&self, sheet: &str, addr: &str) -> Result<Vec<Picture>> {
        let data = self.sheet_data(sheet)?;
        Ok(parse_cell_ref(addr)
            .and_then(|key| data.pictures.get(&key).cloned())
            .unwrap_or_default())
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

    fn sample() -> MemoryWorkbook {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("Data")
            .set("A1", "a")
            .set("C1", "c")
            .set_empty("D1")
            .set("B3", "b3")
            .set_empty("E5");
        wb
    }

    #[test]
    fn test_rows_trim_trailing_empties() {
        let wb = sample();
        let rows = wb.rows("Data").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["a", "", "c"]);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["", "b3"]);
    }

    #[test]
    fn test_columns_keep_explicit_empties() {
        let wb = sample();
        let cols = wb.columns("Data").unwrap();
        assert_eq!(cols.len(), 5);
        assert_eq!(cols[3], vec![""]);
        assert_eq!(cols[4].len(), 5);
        assert_eq!(cols[1], vec!["", "", "b3"]);
    }

    #[test]
    fn test_unknown_sheet_is_not_found() {
        let wb = sample();
        assert!(matches!(wb.rows("Nope"), Err(XlsnapError::NotFound(_))));
        assert!(matches!(
            wb.row_height("Nope", 1),
            Err(XlsnapError::NotFound(_))
        ));
    }

    #[test]
    fn test_defaults_and_overrides() {
        let mut wb = sample();
        wb.sheet("Data").row_height(2, 40.0).column_width("B", 20.0);
        assert_eq!(wb.row_height("Data", 1).unwrap(), DEFAULT_ROW_HEIGHT);
        assert_eq!(wb.row_height("Data", 2).unwrap(), 40.0);
        assert_eq!(wb.column_width("Data", "A").unwrap(), DEFAULT_COL_WIDTH);
        assert_eq!(wb.column_width("Data", "B").unwrap(), 20.0);
    }

    #[test]
    fn test_styles() {
        let mut wb = MemoryWorkbook::new();
        let id = wb.add_style(RawStyle::default());
        wb.sheet("S").set("A1", "x").style("A1", id);
        assert_eq!(id, 1);
        assert_eq!(wb.style_id("S", "A1").unwrap(), 1);
        assert_eq!(wb.style_id("S", "B1").unwrap(), 0);
        assert!(wb.resolve_style(0).is_ok());
        assert!(matches!(
            wb.resolve_style(-1),
            Err(XlsnapError::StyleResolution(_))
        ));
        assert!(wb.resolve_style(99).is_err());
    }

    #[test]
    fn test_sheet_reuse_and_order() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("First").set("A1", "1");
        wb.sheet("Second").set("A1", "2");
        wb.sheet("First").set("A2", "3");
        assert_eq!(wb.sheet_names(), vec!["First", "Second"]);
        assert_eq!(wb.sheet_index("Second"), Some(1));
        assert_eq!(wb.rows("First").unwrap().len(), 2);
    }

    #[test]
    fn test_merge_and_dimension() {
        let mut wb = MemoryWorkbook::new();
        wb.sheet("S").merge("A1:C1").merge("D4").dimension("A1:F9");
        let merges = wb.merge_ranges("S").unwrap();
        assert_eq!(merges[0], ("A1".to_string(), "C1".to_string()));
        assert_eq!(merges[1], ("D4".to_string(), "D4".to_string()));
        assert_eq!(wb.dimension("S").unwrap(), "A1:F9");
    }
}
