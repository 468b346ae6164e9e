//! `.xlsx` package reader implementing [`Workbook`].
//!
//! The whole package is parsed up front: relationships, theme, styles,
//! shared strings, every worksheet and its anchored pictures. After
//! [`XlsxWorkbook::open`] returns, all trait methods are in-memory lookups.

mod color;
mod drawings;
mod package;
mod styles;
mod worksheet;

pub use color::{Palette, DEFAULT_THEME_COLORS, INDEXED_COLORS};
pub use drawings::EMU_PER_PIXEL;
pub(crate) use worksheet::format_general;

use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use self::package::{
    read_relationships, read_shared_strings, read_sheet_list, read_theme_colors, Relationship,
};
use self::worksheet::{parse_worksheet, ParsedSheet};
use super::{columns_view, rows_view, Picture, RawStyle, Workbook};
use crate::cell_ref::{column_number, parse_cell_ref};
use crate::error::{Result, XlsnapError};

const WORKBOOK_PART: &str = "xl/workbook.xml";

struct LoadedSheet {
    name: String,
    parsed: ParsedSheet,
    pictures: HashMap<(u32, u32), Vec<Picture>>,
}

/// A workbook read from an Office Open XML spreadsheet package.
pub struct XlsxWorkbook {
    sheets: Vec<LoadedSheet>,
    styles: Vec<RawStyle>,
}

impl std::fmt::Debug for XlsxWorkbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxWorkbook")
            .field("sheets", &self.sheet_names())
            .field("styles", &self.styles.len())
            .finish()
    }
}

fn find_rel<'a>(rels: &'a HashMap<String, Relationship>, suffix: &str) -> Option<&'a str> {
    rels.values()
        .find(|rel| rel.rel_type.ends_with(suffix))
        .map(|rel| rel.target.as_str())
}

/// Lowercase file extension used as the picture format tag.
fn format_from_path(path: &str) -> String {
    match path.rsplit_once('.') {
        Some((_, ext)) => match ext.to_ascii_lowercase().as_str() {
            "jpg" => "jpeg".to_string(),
            other => other.to_string(),
        },
        None => String::new(),
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Option<Vec<u8>> {
    let mut file = archive.by_name(path.trim_start_matches('/')).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).ok()?;
    (!data.is_empty()).then_some(data)
}

/// Pictures of one worksheet, following sheet rels -> drawing -> drawing rels -> media.
fn read_sheet_pictures<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
    drawing_rid: &str,
) -> HashMap<(u32, u32), Vec<Picture>> {
    let mut pictures: HashMap<(u32, u32), Vec<Picture>> = HashMap::new();

    let sheet_rels = read_relationships(archive, sheet_path);
    let Some(drawing_path) = sheet_rels.get(drawing_rid).map(|rel| rel.target.clone()) else {
        log::debug!("{sheet_path}: drawing {drawing_rid} has no relationship");
        return pictures;
    };
    let anchors = match archive.by_name(&drawing_path) {
        Ok(file) => drawings::parse_drawing(BufReader::new(file)),
        Err(e) => {
            log::debug!("{sheet_path}: missing drawing part {drawing_path}: {e}");
            return pictures;
        }
    };
    let anchors = match anchors {
        Ok(anchors) => anchors,
        Err(e) => {
            log::warn!("{drawing_path}: skipping unreadable drawing: {e}");
            return pictures;
        }
    };

    let drawing_rels = read_relationships(archive, &drawing_path);
    for anchor in anchors {
        let Some(media_path) = drawing_rels.get(&anchor.embed).map(|rel| rel.target.clone())
        else {
            continue;
        };
        let Some(bytes) = read_part(archive, &media_path) else {
            log::debug!("{drawing_path}: media {media_path} missing or empty");
            continue;
        };
        pictures
            .entry((anchor.row, anchor.col))
            .or_default()
            .push(Picture {
                name: anchor.name,
                bytes,
                format: format_from_path(&media_path),
                offset_x: anchor.offset_x,
                offset_y: anchor.offset_y,
                width: anchor.width,
                height: anchor.height,
            });
    }
    pictures
}

impl XlsxWorkbook {
    /// Open and fully parse an `.xlsx` file.
    ///
    /// # Errors
    /// I/O, ZIP and XML errors from reading the package.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parse an `.xlsx` package held in memory.
    ///
    /// # Errors
    /// ZIP and XML errors from reading the package.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let rels = read_relationships(&mut archive, WORKBOOK_PART);
        let theme = match find_rel(&rels, "/theme") {
            Some(path) => read_theme_colors(&mut archive, path),
            None => DEFAULT_THEME_COLORS.iter().map(ToString::to_string).collect(),
        };

        let styles = match find_rel(&rels, "/styles")
            .map(ToString::to_string)
            .map(|path| archive.by_name(&path).map(BufReader::new))
        {
            Some(Ok(file)) => styles::parse_styles(file, &theme)?,
            Some(Err(e)) => {
                log::debug!("styles part listed but missing: {e}");
                Vec::new()
            }
            None => Vec::new(),
        };

        let shared_strings = match find_rel(&rels, "/sharedStrings").map(ToString::to_string) {
            Some(path) => read_shared_strings(&mut archive, &path)?,
            None => Vec::new(),
        };

        let mut sheets = Vec::new();
        for entry in read_sheet_list(&mut archive, &rels)? {
            let parsed = match archive.by_name(&entry.path) {
                Ok(file) => parse_worksheet(BufReader::new(file), &shared_strings)?,
                Err(e) => {
                    log::warn!("sheet {:?}: part {} missing: {e}", entry.name, entry.path);
                    ParsedSheet::default()
                }
            };
            let pictures = match parsed.drawing_rid.as_deref() {
                Some(rid) => read_sheet_pictures(&mut archive, &entry.path, rid),
                None => HashMap::new(),
            };
            log::debug!(
                "loaded sheet {:?}: {} cells, {} merges, {} picture anchors",
                entry.name,
                parsed.values.len(),
                parsed.merges.len(),
                pictures.len()
            );
            sheets.push(LoadedSheet {
                name: entry.name,
                parsed,
                pictures,
            });
        }

        Ok(Self { sheets, styles })
    }

    fn sheet(&self, name: &str) -> Result<&LoadedSheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| XlsnapError::NotFound(name.to_string()))
    }
}

impl Workbook for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(rows_view(&self.sheet(sheet)?.parsed.values))
    }

    fn columns(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(columns_view(&self.sheet(sheet)?.parsed.values))
    }

    fn dimension(&self, sheet: &str) -> Result<String> {
        Ok(self.sheet(sheet)?.parsed.dimension.clone())
    }

    fn row_height(&self, sheet: &str, row: u32) -> Result<f64> {
        Ok(self.sheet(sheet)?.parsed.row_height(row))
    }

    fn column_width(&self, sheet: &str, col: &str) -> Result<f64> {
        let parsed = &self.sheet(sheet)?.parsed;
        let col = column_number(col).ok_or_else(|| {
            XlsnapError::InvalidInput(format!("not a column name: {col:?}"))
        })?;
        Ok(parsed.column_width(col))
    }

    fn merge_ranges(&self, sheet: &str) -> Result<Vec<(String, String)>> {
        Ok(self.sheet(sheet)?.parsed.merges.clone())
    }

    fn style_id(&self, sheet: &str, addr: &str) -> Result<i32> {
        let parsed = &self.sheet(sheet)?.parsed;
        Ok(parse_cell_ref(addr).map_or(0, |(row, col)| parsed.style_id(row, col)))
    }

    fn resolve_style(&self, style_id: i32) -> Result<RawStyle> {
        if style_id == 0 && self.styles.is_empty() {
            return Ok(RawStyle::default());
        }
        usize::try_from(style_id)
            .ok()
            .and_then(|idx| self.styles.get(idx))
            .cloned()
            .ok_or_else(|| XlsnapError::StyleResolution(format!("unknown style id {style_id}")))
    }

    fn pictures(&self, sheet: &str, addr: &str) -> Result<Vec<Picture>> {
        let loaded = self.sheet(sheet)?;
        Ok(parse_cell_ref(addr)
            .and_then(|key| loaded.pictures.get(&key).cloned())
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

    #[test]
    fn test_format_from_path() {
        assert_eq!(format_from_path("xl/media/image1.PNG"), "png");
        assert_eq!(format_from_path("xl/media/photo.jpg"), "jpeg");
        assert_eq!(format_from_path("xl/media/blob"), "");
    }

    #[test]
    fn test_not_a_zip() {
        let err = XlsxWorkbook::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, XlsnapError::Zip(_)));
    }
}
