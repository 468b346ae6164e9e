//! Package-level parts: relationships, sheet list, shared strings and theme.

use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::color::DEFAULT_THEME_COLORS;
use crate::error::Result;
use crate::xml_helpers::{attr_string, attr_string_local};

/// One `<Relationship>` entry with its target resolved to a package path.
#[derive(Debug, Clone)]
pub(super) struct Relationship {
    pub rel_type: String,
    pub target: String,
}

/// A sheet as listed in `xl/workbook.xml`.
#[derive(Debug, Clone)]
pub(super) struct SheetEntry {
    pub name: String,
    pub path: String,
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
pub(super) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve `relative` against the directory `base_dir`, handling `..`.
pub(super) fn resolve_relative_path(base_dir: &str, relative: &str) -> String {
    if let Some(stripped) = relative.strip_prefix('/') {
        return stripped.to_string();
    }
    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in relative.split('/') {
        match part {
            ".." => {
                components.pop();
            }
            "." | "" => {}
            _ => components.push(part),
        }
    }
    components.join("/")
}

/// Read the relationships of `part`, keyed by `Id`. Missing rels yield an empty map.
pub(super) fn read_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> HashMap<String, Relationship> {
    let mut rels = HashMap::new();
    let base_dir = part.rsplit_once('/').map_or("", |(dir, _)| dir);

    let Ok(file) = archive.by_name(&rels_path_for(part)) else {
        return rels;
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attr_string(e, b"Id").unwrap_or_default();
                let target = attr_string(e, b"Target").unwrap_or_default();
                if !id.is_empty() && !target.is_empty() {
                    rels.insert(
                        id,
                        Relationship {
                            rel_type: attr_string(e, b"Type").unwrap_or_default(),
                            target: resolve_relative_path(base_dir, &target),
                        },
                    );
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::debug!("stopping at malformed relationships for {part}: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    rels
}

/// Sheet names and part paths from `xl/workbook.xml`, in workbook order.
pub(super) fn read_sheet_list<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    rels: &HashMap<String, Relationship>,
) -> Result<Vec<SheetEntry>> {
    let file = archive.by_name("xl/workbook.xml")?;
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_string(e, b"name").unwrap_or_default();
                if !name.is_empty() {
                    let path = attr_string_local(e, b"id")
                        .and_then(|rid| rels.get(&rid))
                        .map(|rel| rel.target.clone())
                        .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", sheets.len() + 1));
                    sheets.push(SheetEntry { name, path });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Shared string table. Rich-text runs are concatenated; phonetic runs are skipped.
pub(super) fn read_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<String>> {
    let Ok(file) = archive.by_name(path) else {
        return Ok(Vec::new());
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref e) if in_t => current.push_str(&e.unescape()?),
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Theme color scheme as `RRGGBB` strings in SpreadsheetML index order.
///
/// Slots are assigned by element name, so `theme="0"` is always lt1 even
/// though the part lists dk1 first.
pub(super) fn read_theme_colors<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Vec<String> {
    let mut colors: Vec<String> = DEFAULT_THEME_COLORS.iter().map(ToString::to_string).collect();
    let Ok(file) = archive.by_name(path) else {
        return colors;
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let order = [
        "lt1", "dk1", "lt2", "dk2", "accent1", "accent2", "accent3", "accent4", "accent5",
        "accent6", "hlink", "folHlink",
    ];
    let mut in_scheme = false;
    let mut slot: Option<usize> = None;
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                let local = e.local_name();
                let name = std::str::from_utf8(local.as_ref()).unwrap_or("");
                if name == "clrScheme" {
                    in_scheme = true;
                } else if in_scheme {
                    if let Some(pos) = order.iter().position(|n| *n == name) {
                        slot = Some(pos);
                    } else if name == "srgbClr" || name == "sysClr" {
                        let value = if name == "sysClr" {
                            attr_string(e, b"lastClr")
                        } else {
                            attr_string(e, b"val")
                        };
                        if let (Some(idx), Some(v)) = (slot, value) {
                            if let Some(entry) = colors.get_mut(idx) {
                                *entry = v.to_ascii_uppercase();
                            }
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"clrScheme" => break,
            Ok(Event::Eof) => break,
            Err(e) => {
                log::debug!("theme parse stopped early: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    colors
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
    fn test_rels_path_for() {
        assert_eq!(
            rels_path_for("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(rels_path_for("workbook.xml"), "_rels/workbook.xml.rels");
    }

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(
            resolve_relative_path("xl/drawings", "../media/image1.png"),
            "xl/media/image1.png"
        );
        assert_eq!(
            resolve_relative_path("xl", "worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
        assert_eq!(
            resolve_relative_path("xl", "/xl/styles.xml"),
            "xl/styles.xml"
        );
    }
}
