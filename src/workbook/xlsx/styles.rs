//! Parsing of `xl/styles.xml` into flat per-xf style records.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::color::Palette;
use crate::error::Result;
use crate::workbook::{BorderSide, RawAlignment, RawBorder, RawFill, RawFont, RawStyle};
use crate::xml_helpers::{
    attr_string, attr_u32, attr_val, attr_val_f64, parse_color_attrs, toggle_val, ColorAttrs,
};

#[derive(Debug, Default)]
struct FontRecord {
    name: String,
    size: f64,
    bold: bool,
    italic: bool,
    underline: String,
    color: Option<ColorAttrs>,
}

#[derive(Debug, Default)]
struct FillRecord {
    pattern: String,
    colors: Vec<ColorAttrs>,
}

#[derive(Debug, Default)]
struct BorderRecord {
    sides: Vec<(BorderSide, String, Option<ColorAttrs>)>,
}

#[derive(Debug, Default)]
struct XfRecord {
    font_id: Option<u32>,
    fill_id: Option<u32>,
    border_id: Option<u32>,
    alignment: Option<RawAlignment>,
}

/// Parse a stylesheet into one [`RawStyle`] per `<cellXfs>` entry.
///
/// `theme` supplies the theme colors; a custom `<indexedColors>` palette in
/// the stylesheet overrides the built-in one.
#[allow(clippy::too_many_lines)]
pub(super) fn parse_styles<R: BufRead>(reader: R, theme: &[String]) -> Result<Vec<RawStyle>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut fonts: Vec<FontRecord> = Vec::new();
    let mut fills: Vec<FillRecord> = Vec::new();
    let mut borders: Vec<BorderRecord> = Vec::new();
    let mut xfs: Vec<XfRecord> = Vec::new();
    let mut indexed: Vec<String> = Vec::new();

    let mut in_fonts = false;
    let mut in_fills = false;
    let mut in_borders = false;
    let mut in_cell_xfs = false;
    let mut in_indexed_colors = false;

    let mut font: Option<FontRecord> = None;
    let mut fill: Option<FillRecord> = None;
    let mut border: Option<BorderRecord> = None;
    let mut side: Option<BorderSide> = None;
    let mut xf: Option<XfRecord> = None;
    let mut in_stop = false;

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            ref event @ (Event::Start(ref e) | Event::Empty(ref e)) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"fonts" => in_fonts = !is_empty,
                    b"fills" => in_fills = !is_empty,
                    b"borders" => in_borders = !is_empty,
                    b"cellXfs" => in_cell_xfs = !is_empty,
                    b"indexedColors" => in_indexed_colors = !is_empty,
                    b"rgbColor" if in_indexed_colors => {
                        let rgb = attr_string(e, b"rgb").unwrap_or_default();
                        let rgb = rgb.get(rgb.len().saturating_sub(6)..).unwrap_or("");
                        indexed.push(rgb.to_string());
                    }

                    b"font" if in_fonts => {
                        if is_empty {
                            fonts.push(FontRecord::default());
                        } else {
                            font = Some(FontRecord::default());
                        }
                    }
                    b"name" => {
                        if let Some(f) = font.as_mut() {
                            f.name = attr_val(e).unwrap_or_default();
                        }
                    }
                    b"sz" => {
                        if let Some(f) = font.as_mut() {
                            f.size = attr_val_f64(e).unwrap_or(0.0);
                        }
                    }
                    b"b" => {
                        if let Some(f) = font.as_mut() {
                            f.bold = toggle_val(e);
                        }
                    }
                    b"i" => {
                        if let Some(f) = font.as_mut() {
                            f.italic = toggle_val(e);
                        }
                    }
                    b"u" => {
                        if let Some(f) = font.as_mut() {
                            let val = attr_val(e).unwrap_or_else(|| "single".to_string());
                            f.underline = if val == "none" { String::new() } else { val };
                        }
                    }

                    b"fill" if in_fills => {
                        if is_empty {
                            fills.push(FillRecord::default());
                        } else {
                            fill = Some(FillRecord::default());
                        }
                    }
                    b"patternFill" => {
                        if let Some(f) = fill.as_mut() {
                            f.pattern =
                                attr_string(e, b"patternType").unwrap_or_else(|| "none".into());
                        }
                    }
                    b"gradientFill" => {
                        if let Some(f) = fill.as_mut() {
                            f.pattern = "gradient".to_string();
                        }
                    }
                    b"stop" => in_stop = !is_empty,
                    b"fgColor" | b"bgColor" => {
                        if let Some(f) = fill.as_mut() {
                            f.colors.push(parse_color_attrs(e));
                        }
                    }

                    b"border" if in_borders => {
                        if is_empty {
                            borders.push(BorderRecord::default());
                        } else {
                            border = Some(BorderRecord::default());
                        }
                    }
                    name @ (b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end") => {
                        if let Some(b) = border.as_mut() {
                            let style = attr_string(e, b"style").unwrap_or_default();
                            let parsed = std::str::from_utf8(name)
                                .ok()
                                .and_then(BorderSide::from_name);
                            if let Some(s) = parsed {
                                if !style.is_empty() && style != "none" {
                                    b.sides.push((s, style, None));
                                }
                                side = (!is_empty).then_some(s);
                            }
                        }
                    }

                    b"color" => {
                        let color = parse_color_attrs(e);
                        if let Some(f) = font.as_mut() {
                            f.color = Some(color);
                        } else if let (Some(b), Some(s)) = (border.as_mut(), side) {
                            if let Some(entry) = b.sides.iter_mut().rev().find(|(x, _, _)| *x == s)
                            {
                                entry.2 = Some(color);
                            }
                        } else if in_stop {
                            if let Some(f) = fill.as_mut() {
                                f.colors.push(color);
                            }
                        }
                    }

                    b"xf" if in_cell_xfs => {
                        let record = XfRecord {
                            font_id: attr_u32(e, b"fontId"),
                            fill_id: attr_u32(e, b"fillId"),
                            border_id: attr_u32(e, b"borderId"),
                            alignment: None,
                        };
                        if is_empty {
                            xfs.push(record);
                        } else {
                            xf = Some(record);
                        }
                    }
                    b"alignment" => {
                        if let Some(x) = xf.as_mut() {
                            x.alignment = Some(RawAlignment {
                                horizontal: attr_string(e, b"horizontal").unwrap_or_default(),
                                vertical: attr_string(e, b"vertical").unwrap_or_default(),
                                wrap_text: matches!(
                                    attr_string(e, b"wrapText").as_deref(),
                                    Some("1" | "true")
                                ),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"fonts" => in_fonts = false,
                b"fills" => in_fills = false,
                b"borders" => in_borders = false,
                b"cellXfs" => in_cell_xfs = false,
                b"indexedColors" => in_indexed_colors = false,
                b"font" => fonts.extend(font.take()),
                b"fill" => fills.extend(fill.take()),
                b"border" => borders.extend(border.take()),
                b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end" => side = None,
                b"stop" => in_stop = false,
                b"xf" => xfs.extend(xf.take()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let palette = Palette {
        theme: theme.to_vec(),
        indexed,
    };

    Ok(xfs
        .iter()
        .map(|x| build_style(x, &fonts, &fills, &borders, &palette))
        .collect())
}

fn lookup<T>(items: &[T], id: Option<u32>) -> Option<&T> {
    id.and_then(|i| usize::try_from(i).ok())
        .and_then(|i| items.get(i))
}

fn build_style(
    xf: &XfRecord,
    fonts: &[FontRecord],
    fills: &[FillRecord],
    borders: &[BorderRecord],
    palette: &Palette,
) -> RawStyle {
    let font = lookup(fonts, xf.font_id).map(|f| RawFont {
        family: f.name.clone(),
        size: f.size,
        bold: f.bold,
        italic: f.italic,
        underline: f.underline.clone(),
        color: f
            .color
            .as_ref()
            .and_then(|c| palette.resolve(c))
            .unwrap_or_default(),
    });

    let fill = lookup(fills, xf.fill_id)
        .map(|f| RawFill {
            pattern: f.pattern.clone(),
            colors: f.colors.iter().filter_map(|c| palette.resolve(c)).collect(),
        })
        .unwrap_or_default();

    let borders = lookup(borders, xf.border_id)
        .map(|b| {
            b.sides
                .iter()
                .map(|(side, style, color)| RawBorder {
                    side: *side,
                    style: style.clone(),
                    // A styled side without a color element is drawn in black
                    color: color
                        .as_ref()
                        .and_then(|c| palette.resolve(c))
                        .unwrap_or_else(|| "000000".to_string()),
                })
                .collect()
        })
        .unwrap_or_default();

    RawStyle {
        font,
        fill,
        borders,
        alignment: xf.alignment.clone(),
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
    use crate::workbook::xlsx::color::DEFAULT_THEME_COLORS;

    fn theme() -> Vec<String> {
        DEFAULT_THEME_COLORS.iter().map(ToString::to_string).collect()
    }

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><i/><u/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border>
      <left style="thin"><color rgb="FF0000FF"/></left>
      <right style="medium"/>
      <top/>
      <bottom style="thick"><color indexed="10"/></bottom>
    </border>
  </borders>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1" applyAlignment="1">
      <alignment horizontal="center" vertical="top" wrapText="1"/>
    </xf>
    <xf numFmtId="0" fontId="9" fillId="9" borderId="9"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_parse_styles() {
        let styles = parse_styles(STYLES.as_bytes(), &theme()).unwrap();
        assert_eq!(styles.len(), 3);

        let plain = &styles[0];
        assert_eq!(plain.font.as_ref().unwrap().family, "Calibri");
        assert_eq!(plain.font.as_ref().unwrap().color, "000000");
        assert_eq!(plain.fill.pattern, "none");
        assert!(plain.borders.is_empty());
        assert!(plain.alignment.is_none());

        let fancy = &styles[1];
        let font = fancy.font.as_ref().unwrap();
        assert!(font.bold && font.italic);
        assert_eq!(font.underline, "single");
        assert_eq!(font.size, 14.0);
        assert_eq!(font.color, "FF0000");
        assert_eq!(fancy.fill.pattern, "solid");
        assert_eq!(fancy.fill.colors[0], "FFFF00");
        let align = fancy.alignment.as_ref().unwrap();
        assert_eq!(align.horizontal, "center");
        assert_eq!(align.vertical, "top");
        assert!(align.wrap_text);

        assert_eq!(fancy.borders.len(), 3);
        let left = fancy.borders.iter().find(|b| b.side == BorderSide::Left).unwrap();
        assert_eq!((left.style.as_str(), left.color.as_str()), ("thin", "0000FF"));
        let right = fancy.borders.iter().find(|b| b.side == BorderSide::Right).unwrap();
        assert_eq!(right.color, "000000");
        let bottom = fancy.borders.iter().find(|b| b.side == BorderSide::Bottom).unwrap();
        assert_eq!(bottom.color, "FF0000");
    }

    #[test]
    fn test_dangling_ids_degrade() {
        let styles = parse_styles(STYLES.as_bytes(), &theme()).unwrap();
        let broken = &styles[2];
        assert!(broken.font.is_none());
        assert_eq!(broken.fill, RawFill::default());
        assert!(broken.borders.is_empty());
    }
}
