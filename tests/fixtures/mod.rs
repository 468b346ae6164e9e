//! Test fixtures for generating valid XLSX files in memory.
//!
//! Builders for XLSX packages with known contents, for exercising
//! `XlsxWorkbook` and the full load/render pipeline.
//!
//! # Example
//!
//! ```rust
//! use fixtures::{XlsxBuilder, StyleBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .add_sheet("Sheet1")
//!     .add_cell("A1", "Hello", Some(StyleBuilder::new().bold().build()))
//!     .add_cell("B1", 42.0, None)
//!     .build();
//!
//! let workbook = xlsnap::XlsxWorkbook::from_bytes(&xlsx).unwrap();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_lossless
)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

// ============================================================================
// Style Builder
// ============================================================================

/// Builder for creating cell styles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleBuilder {
    // Font properties
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,

    // Fill properties
    pub bg_color: Option<String>,
    pub pattern_type: Option<String>,

    // Border properties
    pub border_top: Option<BorderSide>,
    pub border_right: Option<BorderSide>,
    pub border_bottom: Option<BorderSide>,
    pub border_left: Option<BorderSide>,

    // Alignment properties
    pub align_horizontal: Option<String>,
    pub align_vertical: Option<String>,
    pub wrap_text: bool,
}

/// A border side definition.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderSide {
    pub style: String,
    pub color: Option<String>,
}

impl BorderSide {
    /// Create a new border side with the given style.
    #[must_use]
    pub fn new(style: &str) -> Self {
        Self {
            style: style.to_string(),
            color: None,
        }
    }

    /// Set the border color.
    #[must_use]
    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(normalize_color(color));
        self
    }
}

impl StyleBuilder {
    /// Create a new empty style builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Font methods

    #[must_use]
    pub fn font_name(mut self, name: &str) -> Self {
        self.font_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Set the font color as #RRGGBB or AARRGGBB.
    #[must_use]
    pub fn font_color(mut self, color: &str) -> Self {
        self.font_color = Some(normalize_color(color));
        self
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    #[must_use]
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    // Fill methods

    /// Set the background fill color (solid fill).
    #[must_use]
    pub fn bg_color(mut self, color: &str) -> Self {
        self.bg_color = Some(normalize_color(color));
        self.pattern_type = Some("solid".to_string());
        self
    }

    /// Set the fill pattern type.
    #[must_use]
    pub fn pattern(mut self, pattern_type: &str) -> Self {
        self.pattern_type = Some(pattern_type.to_string());
        self
    }

    // Border methods

    /// Set all borders to the same style.
    #[must_use]
    pub fn border_all(mut self, style: &str, color: Option<&str>) -> Self {
        let side = BorderSide {
            style: style.to_string(),
            color: color.map(normalize_color),
        };
        self.border_top = Some(side.clone());
        self.border_right = Some(side.clone());
        self.border_bottom = Some(side.clone());
        self.border_left = Some(side);
        self
    }

    #[must_use]
    pub fn border_top(mut self, side: BorderSide) -> Self {
        self.border_top = Some(side);
        self
    }

    #[must_use]
    pub fn border_right(mut self, side: BorderSide) -> Self {
        self.border_right = Some(side);
        self
    }

    #[must_use]
    pub fn border_bottom(mut self, side: BorderSide) -> Self {
        self.border_bottom = Some(side);
        self
    }

    #[must_use]
    pub fn border_left(mut self, side: BorderSide) -> Self {
        self.border_left = Some(side);
        self
    }

    // Alignment methods

    /// Set horizontal alignment (left, center, right, justify, fill, general).
    #[must_use]
    pub fn align_horizontal(mut self, align: &str) -> Self {
        self.align_horizontal = Some(align.to_string());
        self
    }

    /// Set vertical alignment (top, center, bottom).
    #[must_use]
    pub fn align_vertical(mut self, align: &str) -> Self {
        self.align_vertical = Some(align.to_string());
        self
    }

    #[must_use]
    pub fn wrap_text(mut self) -> Self {
        self.wrap_text = true;
        self
    }

    /// Build the style (returns self for use in cell creation).
    #[must_use]
    pub fn build(self) -> Self {
        self
    }
}

// ============================================================================
// Cell Value
// ============================================================================

/// Represents a cell value that can be added to a sheet.
#[derive(Debug, Clone)]
pub enum CellValue {
    /// A shared string.
    String(String),
    Number(f64),
    Boolean(bool),
    /// An error value (e.g., "#DIV/0!").
    Error(String),
    /// An inline string (not shared).
    InlineString(String),
    /// An empty cell (style only).
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// ============================================================================
// Sheet Builder
// ============================================================================

/// A cell in the sheet.
#[derive(Debug, Clone)]
pub struct CellEntry {
    pub cell_ref: String,
    pub value: CellValue,
    pub style: Option<StyleBuilder>,
}

/// A column width definition.
#[derive(Debug, Clone)]
pub struct ColumnWidth {
    pub min: u32,
    pub max: u32,
    pub width: f64,
}

/// A picture anchored in the sheet's drawing part.
#[derive(Debug, Clone)]
pub struct PictureEntry {
    /// 1-based anchor cell.
    pub row: u32,
    pub col: u32,
    /// Offsets inside the anchor cell, in EMU.
    pub col_off: i64,
    pub row_off: i64,
    /// `Some((cx, cy))` in EMU writes a one-cell anchor with an extent;
    /// `None` writes a two-cell anchor.
    pub extent: Option<(i64, i64)>,
    pub png: Vec<u8>,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    pub cells: Vec<CellEntry>,
    pub merges: Vec<String>,
    pub col_widths: Vec<ColumnWidth>,
    pub row_heights: Vec<(u32, f64)>,
    pub dimension: Option<String>,
    pub default_col_width: Option<f64>,
    pub pictures: Vec<PictureEntry>,
}

impl SheetBuilder {
    /// Create a new sheet builder with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Add a cell with a value and optional style.
    #[must_use]
    pub fn cell<V: Into<CellValue>>(
        mut self,
        cell_ref: &str,
        value: V,
        style: Option<StyleBuilder>,
    ) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: value.into(),
            style,
        });
        self
    }

    /// Add an empty cell with only a style.
    #[must_use]
    pub fn styled_cell(mut self, cell_ref: &str, style: StyleBuilder) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Empty,
            style: Some(style),
        });
        self
    }

    /// Add a merge range (e.g., "A1:B2").
    #[must_use]
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    /// Set column width for a range of columns.
    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        self.col_widths.push(ColumnWidth { min, max, width });
        self
    }

    #[must_use]
    pub fn default_col_width(mut self, width: f64) -> Self {
        self.default_col_width = Some(width);
        self
    }

    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        self.row_heights.push((row, height));
        self
    }

    /// Set the declared `<dimension ref>`.
    #[must_use]
    pub fn dimension(mut self, range: &str) -> Self {
        self.dimension = Some(range.to_string());
        self
    }

    #[must_use]
    pub fn picture(mut self, picture: PictureEntry) -> Self {
        self.pictures.push(picture);
        self
    }
}

// ============================================================================
// XLSX Builder
// ============================================================================

/// Builder for creating complete XLSX files.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
}

impl XlsxBuilder {
    /// Create a new XLSX builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finished sheet.
    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Add a simple sheet by name (returns a builder for chaining).
    #[must_use]
    pub fn add_sheet(self, name: &str) -> XlsxSheetAdder {
        XlsxSheetAdder {
            builder: self,
            sheet: SheetBuilder::new(name),
        }
    }

    /// Build the XLSX file as bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        // Collect all unique styles and shared strings
        let mut styles_collector = StylesCollector::new();
        let mut shared_strings: Vec<String> = Vec::new();

        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let Some(ref style) = cell.style {
                    styles_collector.add_style(style);
                }
                if let CellValue::String(ref s) = cell.value {
                    if !shared_strings.contains(s) {
                        shared_strings.push(s.clone());
                    }
                }
            }
        }

        let _ = zip.start_file("[Content_Types].xml", options);
        let _ = zip.write_all(generate_content_types(self.sheets.len()).as_bytes());

        let _ = zip.start_file("_rels/.rels", options);
        let _ = zip.write_all(generate_rels().as_bytes());

        let _ = zip.start_file("xl/_rels/workbook.xml.rels", options);
        let _ = zip.write_all(generate_workbook_rels(self.sheets.len()).as_bytes());

        let _ = zip.start_file("xl/workbook.xml", options);
        let _ = zip.write_all(generate_workbook(&self.sheets).as_bytes());

        let _ = zip.start_file("xl/styles.xml", options);
        let _ = zip.write_all(styles_collector.generate_styles_xml().as_bytes());

        if !shared_strings.is_empty() {
            let _ = zip.start_file("xl/sharedStrings.xml", options);
            let _ = zip.write_all(generate_shared_strings(&shared_strings).as_bytes());
        }

        let mut media = 0usize;
        for (i, sheet) in self.sheets.iter().enumerate() {
            let n = i + 1;
            let _ = zip.start_file(format!("xl/worksheets/sheet{n}.xml"), options);
            let _ = zip.write_all(
                generate_sheet_xml(sheet, &shared_strings, &styles_collector).as_bytes(),
            );

            if sheet.pictures.is_empty() {
                continue;
            }
            let _ = zip.start_file(format!("xl/worksheets/_rels/sheet{n}.xml.rels"), options);
            let _ = zip.write_all(generate_sheet_rels(n).as_bytes());

            let first_media = media + 1;
            for picture in &sheet.pictures {
                media += 1;
                let _ = zip.start_file(format!("xl/media/image{media}.png"), options);
                let _ = zip.write_all(&picture.png);
            }
            let _ = zip.start_file(format!("xl/drawings/drawing{n}.xml"), options);
            let _ = zip.write_all(generate_drawing(&sheet.pictures).as_bytes());
            let _ = zip.start_file(format!("xl/drawings/_rels/drawing{n}.xml.rels"), options);
            let _ = zip.write_all(generate_drawing_rels(first_media, sheet.pictures.len()).as_bytes());
        }

        let cursor = zip.finish().expect("Failed to finish ZIP");
        cursor.into_inner()
    }
}

/// Helper for fluent sheet building within `XlsxBuilder`.
pub struct XlsxSheetAdder {
    builder: XlsxBuilder,
    sheet: SheetBuilder,
}

impl XlsxSheetAdder {
    /// Add a cell to the current sheet.
    #[must_use]
    pub fn add_cell<V: Into<CellValue>>(
        mut self,
        cell_ref: &str,
        value: V,
        style: Option<StyleBuilder>,
    ) -> Self {
        self.sheet = self.sheet.cell(cell_ref, value, style);
        self
    }

    /// Add a merge range to the current sheet.
    #[must_use]
    pub fn add_merge(mut self, range: &str) -> Self {
        self.sheet = self.sheet.merge(range);
        self
    }

    /// Finish the current sheet and return the builder.
    #[must_use]
    pub fn done(mut self) -> XlsxBuilder {
        self.builder.sheets.push(self.sheet);
        self.builder
    }

    /// Build the XLSX directly (finishes the current sheet automatically).
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.done().build()
    }
}

// ============================================================================
// Styles Collector
// ============================================================================

/// Collects and deduplicates styles for the XLSX file.
#[derive(Debug, Default)]
struct StylesCollector {
    fonts: Vec<FontDef>,
    fills: Vec<FillDef>,
    borders: Vec<BorderDef>,
    cell_xfs: Vec<CellXfDef>,
    style_map: Vec<(StyleBuilder, u32)>, // Maps style to xf index
}

#[derive(Debug, Clone, PartialEq)]
struct FontDef {
    name: String,
    size: f64,
    color: Option<String>,
    bold: bool,
    italic: bool,
    underline: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct FillDef {
    pattern_type: String,
    fg_color: Option<String>,
}

type BorderDef = [Option<BorderSide>; 4];

#[derive(Debug, Clone)]
struct CellXfDef {
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    alignment: Option<(Option<String>, Option<String>, bool)>,
}

fn intern<T: PartialEq>(list: &mut Vec<T>, item: T) -> u32 {
    if let Some(i) = list.iter().position(|x| x == &item) {
        return i as u32;
    }
    list.push(item);
    (list.len() - 1) as u32
}

impl StylesCollector {
    fn new() -> Self {
        let mut collector = Self::default();

        // Default font, the two required fills, an empty border and xf 0
        collector.fonts.push(FontDef {
            name: "Calibri".to_string(),
            size: 11.0,
            color: None,
            bold: false,
            italic: false,
            underline: false,
        });
        collector.fills.push(FillDef {
            pattern_type: "none".to_string(),
            fg_color: None,
        });
        collector.fills.push(FillDef {
            pattern_type: "gray125".to_string(),
            fg_color: None,
        });
        collector.borders.push([None, None, None, None]);
        collector.cell_xfs.push(CellXfDef {
            font_id: 0,
            fill_id: 0,
            border_id: 0,
            alignment: None,
        });

        collector
    }

    fn add_style(&mut self, style: &StyleBuilder) -> u32 {
        if let Some(idx) = self.style_index(style) {
            return idx;
        }

        let font_id = intern(
            &mut self.fonts,
            FontDef {
                name: style
                    .font_name
                    .clone()
                    .unwrap_or_else(|| "Calibri".to_string()),
                size: style.font_size.unwrap_or(11.0),
                color: style.font_color.clone(),
                bold: style.bold,
                italic: style.italic,
                underline: style.underline,
            },
        );
        let fill_id = if style.bg_color.is_none() && style.pattern_type.is_none() {
            0
        } else {
            intern(
                &mut self.fills,
                FillDef {
                    pattern_type: style
                        .pattern_type
                        .clone()
                        .unwrap_or_else(|| "solid".to_string()),
                    fg_color: style.bg_color.clone(),
                },
            )
        };
        let border_id = intern(
            &mut self.borders,
            [
                style.border_left.clone(),
                style.border_right.clone(),
                style.border_top.clone(),
                style.border_bottom.clone(),
            ],
        );
        let alignment = (style.align_horizontal.is_some()
            || style.align_vertical.is_some()
            || style.wrap_text)
            .then(|| {
                (
                    style.align_horizontal.clone(),
                    style.align_vertical.clone(),
                    style.wrap_text,
                )
            });

        let idx = self.cell_xfs.len() as u32;
        self.cell_xfs.push(CellXfDef {
            font_id,
            fill_id,
            border_id,
            alignment,
        });
        self.style_map.push((style.clone(), idx));
        idx
    }

    fn style_index(&self, style: &StyleBuilder) -> Option<u32> {
        self.style_map
            .iter()
            .find(|(existing, _)| existing == style)
            .map(|(_, idx)| *idx)
    }

    fn generate_styles_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        xml.push_str(&format!(r#"<fonts count="{}">"#, self.fonts.len()));
        for font in &self.fonts {
            xml.push_str("<font>");
            if font.bold {
                xml.push_str("<b/>");
            }
            if font.italic {
                xml.push_str("<i/>");
            }
            if font.underline {
                xml.push_str("<u/>");
            }
            xml.push_str(&format!(r#"<sz val="{}"/>"#, font.size));
            if let Some(ref color) = font.color {
                xml.push_str(&format!(r#"<color rgb="{}"/>"#, color));
            }
            xml.push_str(&format!(r#"<name val="{}"/>"#, escape_xml(&font.name)));
            xml.push_str("</font>");
        }
        xml.push_str("</fonts>");

        xml.push_str(&format!(r#"<fills count="{}">"#, self.fills.len()));
        for fill in &self.fills {
            xml.push_str(&format!(
                r#"<fill><patternFill patternType="{}">"#,
                fill.pattern_type
            ));
            if let Some(ref color) = fill.fg_color {
                xml.push_str(&format!(r#"<fgColor rgb="{}"/>"#, color));
            }
            xml.push_str("</patternFill></fill>");
        }
        xml.push_str("</fills>");

        xml.push_str(&format!(r#"<borders count="{}">"#, self.borders.len()));
        for [left, right, top, bottom] in &self.borders {
            xml.push_str("<border>");
            xml.push_str(&format_border_side("left", left));
            xml.push_str(&format_border_side("right", right));
            xml.push_str(&format_border_side("top", top));
            xml.push_str(&format_border_side("bottom", bottom));
            xml.push_str("<diagonal/>");
            xml.push_str("</border>");
        }
        xml.push_str("</borders>");

        xml.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);

        xml.push_str(&format!(r#"<cellXfs count="{}">"#, self.cell_xfs.len()));
        for xf in &self.cell_xfs {
            let attrs = format!(
                r#"numFmtId="0" fontId="{}" fillId="{}" borderId="{}" xfId="0""#,
                xf.font_id, xf.fill_id, xf.border_id
            );
            match &xf.alignment {
                Some((horizontal, vertical, wrap)) => {
                    let mut align_attrs = String::new();
                    if let Some(h) = horizontal {
                        align_attrs.push_str(&format!(r#" horizontal="{}""#, h));
                    }
                    if let Some(v) = vertical {
                        align_attrs.push_str(&format!(r#" vertical="{}""#, v));
                    }
                    if *wrap {
                        align_attrs.push_str(r#" wrapText="1""#);
                    }
                    xml.push_str(&format!(
                        r#"<xf {} applyAlignment="1"><alignment{}/></xf>"#,
                        attrs, align_attrs
                    ));
                }
                None => xml.push_str(&format!("<xf {}/>", attrs)),
            }
        }
        xml.push_str("</cellXfs>");

        xml.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
        xml.push_str("</styleSheet>");
        xml
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Normalize color to ARGB format (without #).
fn normalize_color(color: &str) -> String {
    let color = color.trim_start_matches('#');
    if color.len() == 8 {
        color.to_uppercase()
    } else {
        format!("FF{}", color.to_uppercase())
    }
}

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Format a border side element.
fn format_border_side(name: &str, side: &Option<BorderSide>) -> String {
    match side {
        Some(BorderSide { style, color }) => {
            let mut xml = format!(r#"<{} style="{}">"#, name, style);
            if let Some(c) = color {
                xml.push_str(&format!(r#"<color rgb="{}"/>"#, c));
            }
            xml.push_str(&format!("</{}>", name));
            xml
        }
        None => format!("<{}/>", name),
    }
}

/// Generate [Content_Types].xml
fn generate_content_types(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Default Extension="png" ContentType="image/png"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);

    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i
        ));
    }

    xml.push_str("</Types>");
    xml
}

/// Generate _rels/.rels
fn generate_rels() -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    xml.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#);
    xml.push_str("</Relationships>");
    xml
}

/// Generate xl/_rels/workbook.xml.rels
fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );

    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i, i
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    ));
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        sheet_count + 2
    ));

    xml.push_str("</Relationships>");
    xml
}

/// Generate xl/workbook.xml
fn generate_workbook(sheets: &[SheetBuilder]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    xml.push_str("<sheets>");

    for (i, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_xml(&sheet.name),
            i + 1,
            i + 1
        ));
    }

    xml.push_str("</sheets>");
    xml.push_str("</workbook>");
    xml
}

/// Generate xl/sharedStrings.xml
fn generate_shared_strings(strings: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
        strings.len(),
        strings.len()
    ));

    for s in strings {
        xml.push_str(&format!(
            r#"<si><t xml:space="preserve">{}</t></si>"#,
            escape_xml(s)
        ));
    }

    xml.push_str("</sst>");
    xml
}

/// Generate xl/worksheets/_rels/sheetN.xml.rels pointing at the drawing.
fn generate_sheet_rels(n: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing{n}.xml"/></Relationships>"#
    )
}

/// Generate xl/drawings/_rels/drawingN.xml.rels, one image per picture.
fn generate_drawing_rels(first_media: usize, count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 0..count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{}.png"/>"#,
            i + 1,
            first_media + i
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Generate xl/drawings/drawingN.xml
fn generate_drawing(pictures: &[PictureEntry]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);

    for (i, p) in pictures.iter().enumerate() {
        let anchor = if p.extent.is_some() {
            "oneCellAnchor"
        } else {
            "twoCellAnchor"
        };
        xml.push_str(&format!("<xdr:{anchor}>"));
        xml.push_str(&format!(
            "<xdr:from><xdr:col>{}</xdr:col><xdr:colOff>{}</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>{}</xdr:rowOff></xdr:from>",
            p.col - 1,
            p.col_off,
            p.row - 1,
            p.row_off
        ));
        match p.extent {
            Some((cx, cy)) => xml.push_str(&format!(r#"<xdr:ext cx="{cx}" cy="{cy}"/>"#)),
            None => xml.push_str(&format!(
                "<xdr:to><xdr:col>{}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>",
                p.col + 1,
                p.row + 1
            )),
        }
        xml.push_str(&format!(
            r#"<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{}" name="Picture {}"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rId{}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="952500" cy="952500"/></a:xfrm><a:prstGeom prst="rect"/></xdr:spPr></xdr:pic>"#,
            i + 2,
            i + 1,
            i + 1
        ));
        xml.push_str(&format!("<xdr:clientData/></xdr:{anchor}>"));
    }

    xml.push_str("</xdr:wsDr>");
    xml
}

/// Generate a sheet XML file
fn generate_sheet_xml(
    sheet: &SheetBuilder,
    shared_strings: &[String],
    styles: &StylesCollector,
) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);

    if let Some(ref dim) = sheet.dimension {
        xml.push_str(&format!(r#"<dimension ref="{}"/>"#, dim));
    }
    if let Some(width) = sheet.default_col_width {
        xml.push_str(&format!(
            r#"<sheetFormatPr defaultRowHeight="15" defaultColWidth="{}"/>"#,
            width
        ));
    }

    if !sheet.col_widths.is_empty() {
        xml.push_str("<cols>");
        for col in &sheet.col_widths {
            xml.push_str(&format!(
                r#"<col min="{}" max="{}" width="{}" customWidth="1"/>"#,
                col.min, col.max, col.width
            ));
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");

    // Group cells by row; rows with only a height still get an element
    let mut rows: BTreeMap<u32, Vec<&CellEntry>> = BTreeMap::new();
    for cell in &sheet.cells {
        rows.entry(row_of(&cell.cell_ref)).or_default().push(cell);
    }
    for (row, _) in &sheet.row_heights {
        rows.entry(*row).or_default();
    }
    let heights: BTreeMap<u32, f64> = sheet.row_heights.iter().copied().collect();

    for (row_num, cells) in rows {
        let mut row_attrs = format!(r#"r="{}""#, row_num);
        if let Some(ht) = heights.get(&row_num) {
            row_attrs.push_str(&format!(r#" ht="{}" customHeight="1""#, ht));
        }
        xml.push_str(&format!("<row {}>", row_attrs));

        for cell in cells {
            let mut cell_attrs = format!(r#"r="{}""#, cell.cell_ref);
            if let Some(idx) = cell.style.as_ref().and_then(|s| styles.style_index(s)) {
                if idx > 0 {
                    cell_attrs.push_str(&format!(r#" s="{}""#, idx));
                }
            }

            match &cell.value {
                CellValue::String(s) => {
                    let idx = shared_strings.iter().position(|x| x == s).unwrap_or(0);
                    xml.push_str(&format!(r#"<c {} t="s"><v>{}</v></c>"#, cell_attrs, idx));
                }
                CellValue::Number(n) => {
                    xml.push_str(&format!(r#"<c {}><v>{}</v></c>"#, cell_attrs, n));
                }
                CellValue::Boolean(b) => {
                    let v = if *b { "1" } else { "0" };
                    xml.push_str(&format!(r#"<c {} t="b"><v>{}</v></c>"#, cell_attrs, v));
                }
                CellValue::Error(e) => {
                    xml.push_str(&format!(
                        r#"<c {} t="e"><v>{}</v></c>"#,
                        cell_attrs,
                        escape_xml(e)
                    ));
                }
                CellValue::InlineString(s) => {
                    xml.push_str(&format!(
                        r#"<c {} t="inlineStr"><is><t>{}</t></is></c>"#,
                        cell_attrs,
                        escape_xml(s)
                    ));
                }
                CellValue::Empty => {
                    xml.push_str(&format!(r#"<c {}/>"#, cell_attrs));
                }
            }
        }

        xml.push_str("</row>");
    }

    xml.push_str("</sheetData>");

    if !sheet.merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, sheet.merges.len()));
        for merge in &sheet.merges {
            xml.push_str(&format!(r#"<mergeCell ref="{}"/>"#, merge));
        }
        xml.push_str("</mergeCells>");
    }

    if !sheet.pictures.is_empty() {
        xml.push_str(r#"<drawing r:id="rId1"/>"#);
    }

    xml.push_str("</worksheet>");
    xml
}

/// Row number of an A1 reference.
fn row_of(cell_ref: &str) -> u32 {
    cell_ref
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .unwrap_or(1)
}

// ============================================================================
// Convenience Functions
// ============================================================================

/// Create a minimal valid XLSX with a single empty sheet.
#[must_use]
pub fn minimal_xlsx() -> Vec<u8> {
    XlsxBuilder::new().add_sheet("Sheet1").build()
}

/// Create an XLSX with a single cell containing text.
#[must_use]
pub fn xlsx_with_text(text: &str) -> Vec<u8> {
    XlsxBuilder::new()
        .add_sheet("Sheet1")
        .add_cell("A1", text, None)
        .build()
}

/// Create an XLSX with a single cell containing a number.
#[must_use]
pub fn xlsx_with_number(value: f64) -> Vec<u8> {
    XlsxBuilder::new()
        .add_sheet("Sheet1")
        .add_cell("A1", value, None)
        .build()
}

/// Create an XLSX with a styled cell.
#[must_use]
pub fn xlsx_with_styled_cell<V: Into<CellValue>>(value: V, style: StyleBuilder) -> Vec<u8> {
    XlsxBuilder::new()
        .add_sheet("Sheet1")
        .add_cell("A1", value, Some(style))
        .build()
}
