//! Worksheet part parsing: values, sizes, styles, merges and the drawing link.

use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::cell_ref::parse_cell_ref_bytes;
use crate::error::Result;
use crate::workbook::{DEFAULT_COL_WIDTH, DEFAULT_ROW_HEIGHT};
use crate::xml_helpers::{attr_bool, attr_f64, attr_i32, attr_string, attr_string_local, attr_u32};

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CellType {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    Number,
}

fn parse_cell_type(value: Option<&str>) -> CellType {
    match value {
        Some("s") => CellType::Shared,
        Some("inlineStr") => CellType::Inline,
        Some("str") => CellType::Str,
        Some("b") => CellType::Bool,
        Some("e") => CellType::Error,
        _ => CellType::Number,
    }
}

/// `<col min max width style>` span.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ColSpan {
    pub min: u32,
    pub max: u32,
    pub width: Option<f64>,
    pub style: Option<i32>,
}

/// Everything the workbook surface needs from one worksheet part.
#[derive(Debug, Default)]
pub(super) struct ParsedSheet {
    /// Display values of every `<c>` element, keyed by `(row, col)`.
    pub values: BTreeMap<(u32, u32), String>,
    pub cell_styles: HashMap<(u32, u32), i32>,
    pub row_styles: HashMap<u32, i32>,
    pub row_heights: HashMap<u32, f64>,
    pub cols: Vec<ColSpan>,
    pub default_row_height: Option<f64>,
    pub default_col_width: Option<f64>,
    pub dimension: String,
    pub merges: Vec<(String, String)>,
    /// Relationship id of the `<drawing>` element, if any.
    pub drawing_rid: Option<String>,
}

impl ParsedSheet {
    pub fn row_height(&self, row: u32) -> f64 {
        self.row_heights
            .get(&row)
            .copied()
            .or(self.default_row_height)
            .unwrap_or(DEFAULT_ROW_HEIGHT)
    }

    pub fn column_width(&self, col: u32) -> f64 {
        self.col_span(col)
            .and_then(|span| span.width)
            .or(self.default_col_width)
            .unwrap_or(DEFAULT_COL_WIDTH)
    }

    /// Style of a cell: its own `s`, else the row style, else the column style.
    pub fn style_id(&self, row: u32, col: u32) -> i32 {
        self.cell_styles
            .get(&(row, col))
            .or_else(|| self.row_styles.get(&row))
            .copied()
            .or_else(|| self.col_span(col).and_then(|span| span.style))
            .unwrap_or(0)
    }

    fn col_span(&self, col: u32) -> Option<&ColSpan> {
        self.cols.iter().find(|span| (span.min..=span.max).contains(&col))
    }
}

/// Format a number the way Excel's "General" format displays it.
///
/// Integers print without a fraction; other values keep up to 11
/// significant digits with trailing zeros removed. Very large or very small
/// magnitudes switch to scientific notation.
pub(crate) fn format_general(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let abs = v.abs();
    if abs < f64::MIN_POSITIVE {
        return "0".to_string();
    }
    if v.fract().abs() < f64::EPSILON && abs < 1e15 {
        return format!("{v:.0}");
    }
    if !(1e-9..1e11).contains(&abs) {
        let sci = format!("{v:.5e}");
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let mantissa = trim_fraction(mantissa);
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{mantissa}E{sign}{:02}", exp.abs());
    }
    #[allow(clippy::cast_possible_truncation)]
    let magnitude = abs.log10().floor() as i32;
    let decimals = usize::try_from((10 - magnitude).clamp(0, 15)).unwrap_or(0);
    trim_fraction(&format!("{v:.decimals$}"))
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// In-flight `<c>` element.
struct PendingCell {
    key: Option<(u32, u32)>,
    kind: CellType,
    raw: String,
    style: Option<i32>,
}

impl PendingCell {
    fn display(&self, shared_strings: &[String]) -> String {
        match self.kind {
            CellType::Shared => self
                .raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i))
                .cloned()
                .unwrap_or_default(),
            CellType::Bool => match self.raw.trim() {
                "1" | "true" | "TRUE" => "TRUE".to_string(),
                "" => String::new(),
                _ => "FALSE".to_string(),
            },
            CellType::Number => match self.raw.trim().parse::<f64>() {
                Ok(v) => format_general(v),
                Err(_) => self.raw.clone(),
            },
            CellType::Inline | CellType::Str | CellType::Error => self.raw.clone(),
        }
    }
}

fn cell_key(e: &BytesStart, row: u32, next_col: u32) -> Option<(u32, u32)> {
    match e.attributes().flatten().find(|a| a.key.as_ref() == b"r") {
        Some(attr) => parse_cell_ref_bytes(&attr.value),
        // Cells without `r` follow the previous one in the row.
        None => (row > 0).then_some((row, next_col)),
    }
}

/// Parse one worksheet part.
#[allow(clippy::too_many_lines)]
pub(super) fn parse_worksheet<R: BufRead>(
    reader: R,
    shared_strings: &[String],
) -> Result<ParsedSheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut sheet = ParsedSheet::default();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 1;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_inline_text = false;

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            ref event @ (Event::Start(ref e) | Event::Empty(ref e)) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"dimension" => {
                        sheet.dimension = attr_string(e, b"ref").unwrap_or_default();
                    }
                    b"sheetFormatPr" => {
                        // Without customHeight the default is only Excel's font-derived guess
                        if attr_bool(e, b"customHeight").unwrap_or(false) {
                            sheet.default_row_height = attr_f64(e, b"defaultRowHeight");
                        }
                        sheet.default_col_width = attr_f64(e, b"defaultColWidth");
                    }
                    b"col" => {
                        if let (Some(min), Some(max)) = (attr_u32(e, b"min"), attr_u32(e, b"max")) {
                            sheet.cols.push(ColSpan {
                                min,
                                max,
                                width: attr_f64(e, b"width"),
                                style: attr_i32(e, b"style"),
                            });
                        }
                    }
                    b"row" => {
                        current_row = attr_u32(e, b"r").unwrap_or(current_row + 1);
                        next_col = 1;
                        if let Some(ht) = attr_f64(e, b"ht") {
                            sheet.row_heights.insert(current_row, ht);
                        }
                        if attr_bool(e, b"customFormat").unwrap_or(false) {
                            if let Some(s) = attr_i32(e, b"s") {
                                sheet.row_styles.insert(current_row, s);
                            }
                        }
                    }
                    b"c" => {
                        let key = cell_key(e, current_row, next_col);
                        if let Some((_, c)) = key {
                            next_col = c + 1;
                        }
                        let pending = PendingCell {
                            key,
                            kind: parse_cell_type(attr_string(e, b"t").as_deref()),
                            raw: String::new(),
                            style: attr_i32(e, b"s"),
                        };
                        if is_empty {
                            finish_cell(&mut sheet, &pending, shared_strings);
                        } else {
                            cell = Some(pending);
                        }
                    }
                    b"v" if cell.is_some() => in_value = !is_empty,
                    b"t" if cell.is_some() => in_inline_text = !is_empty,
                    b"mergeCell" => {
                        if let Some(r) = attr_string(e, b"ref") {
                            let (start, end) = r.split_once(':').unwrap_or((&r, &r));
                            sheet.merges.push((start.to_string(), end.to_string()));
                        }
                    }
                    b"drawing" => sheet.drawing_rid = attr_string_local(e, b"id"),
                    _ => {}
                }
            }
            Event::Text(ref t) if in_value || in_inline_text => {
                if let Some(pending) = cell.as_mut() {
                    pending.raw.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref t) if in_value || in_inline_text => {
                if let Some(pending) = cell.as_mut() {
                    pending.raw.push_str(&String::from_utf8_lossy(t));
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        finish_cell(&mut sheet, &pending, shared_strings);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheet)
}

fn finish_cell(sheet: &mut ParsedSheet, cell: &PendingCell, shared_strings: &[String]) {
    let Some(key) = cell.key else {
        log::debug!("skipping cell with unparseable reference");
        return;
    };
    sheet.values.insert(key, cell.display(shared_strings));
    if let Some(s) = cell.style {
        sheet.cell_styles.insert(key, s);
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

    #[test_case(0.0, "0")]
    #[test_case(42.0, "42")]
    #[test_case(-7.0, "-7")]
    #[test_case(3.5, "3.5")]
    #[test_case(0.1 + 0.2, "0.3")]
    #[test_case(1.0 / 3.0, "0.33333333333")]
    #[test_case(123_456.789, "123456.789")]
    #[test_case(1.5e20, "1.5E+20")]
    #[test_case(1.234_567e-12, "1.23457E-12")]
    fn test_format_general(v: f64, expected: &str) {
        assert_eq!(format_general(v), expected);
    }

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
           xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <dimension ref="A1:D4"/>
  <sheetFormatPr defaultRowHeight="15"/>
  <cols><col min="2" max="3" width="20" customWidth="1" style="4"/></cols>
  <sheetData>
    <row r="1" ht="30" customHeight="1">
      <c r="A1" t="s" s="1"><v>0</v></c>
      <c r="B1"><v>12.50</v></c>
      <c r="C1" t="b"><v>1</v></c>
      <c r="D1" t="inlineStr"><is><t>inline &amp; text</t></is></c>
    </row>
    <row r="2" s="2" customFormat="1">
      <c r="A2" t="str"><f>A1</f><v>Hello</v></c>
      <c r="C2" s="3"/>
    </row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A3:B4"/></mergeCells>
  <drawing r:id="rId7"/>
</worksheet>"#;

    #[test]
    fn test_parse_worksheet() {
        let shared = vec!["Hello".to_string()];
        let sheet = parse_worksheet(SHEET.as_bytes(), &shared).unwrap();

        assert_eq!(sheet.dimension, "A1:D4");
        assert_eq!(sheet.values[&(1, 1)], "Hello");
        assert_eq!(sheet.values[&(1, 2)], "12.5");
        assert_eq!(sheet.values[&(1, 3)], "TRUE");
        assert_eq!(sheet.values[&(1, 4)], "inline & text");
        assert_eq!(sheet.values[&(2, 1)], "Hello");
        assert_eq!(sheet.values[&(2, 3)], "");
        assert!(!sheet.values.contains_key(&(2, 2)));

        assert_eq!(sheet.merges, vec![("A3".to_string(), "B4".to_string())]);
        assert_eq!(sheet.drawing_rid.as_deref(), Some("rId7"));
    }

    #[test]
    fn test_sizes_and_styles() {
        let sheet = parse_worksheet(SHEET.as_bytes(), &[]).unwrap();
        assert_eq!(sheet.row_height(1), 30.0);
        assert_eq!(sheet.row_height(2), DEFAULT_ROW_HEIGHT);
        assert_eq!(sheet.column_width(1), DEFAULT_COL_WIDTH);
        assert_eq!(sheet.column_width(3), 20.0);

        assert_eq!(sheet.style_id(1, 1), 1);
        // Row style beats column style
        assert_eq!(sheet.style_id(2, 2), 2);
        assert_eq!(sheet.style_id(2, 3), 3);
        // Column style when nothing else applies
        assert_eq!(sheet.style_id(1, 2), 4);
        assert_eq!(sheet.style_id(9, 9), 0);
    }

    fn sheet_with_format(format: &str) -> ParsedSheet {
        let xml = format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{format}<sheetData/></worksheet>"#
        );
        parse_worksheet(xml.as_bytes(), &[]).unwrap()
    }

    #[test]
    fn test_default_row_height_requires_custom_height() {
        let implied = sheet_with_format(r#"<sheetFormatPr defaultRowHeight="14.4"/>"#);
        assert_eq!(implied.row_height(1), DEFAULT_ROW_HEIGHT);

        let custom =
            sheet_with_format(r#"<sheetFormatPr defaultRowHeight="24" customHeight="1"/>"#);
        assert_eq!(custom.row_height(1), 24.0);
    }
}
