//! Picture anchors from DrawingML drawing parts.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::xml_helpers::{attr_i64, attr_string, attr_string_local};

/// EMU per pixel at 96 DPI.
pub const EMU_PER_PIXEL: i64 = 9525;

/// A picture anchored to a cell, before its image bytes are fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct PictureAnchor {
    /// 1-based anchor cell.
    pub row: u32,
    pub col: u32,
    pub offset_x: i64,
    pub offset_y: i64,
    /// Pixel size from a one-cell anchor's extent, 0 otherwise.
    pub width: u32,
    pub height: u32,
    pub name: String,
    /// Relationship id of the `<a:blip r:embed>` target.
    pub embed: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FromField {
    Col,
    ColOff,
    Row,
    RowOff,
}

fn emu_to_pixels(emu: i64) -> u32 {
    u32::try_from(emu.max(0) / EMU_PER_PIXEL).unwrap_or(u32::MAX)
}

/// Collect picture anchors. Anchors that hold charts or shapes are ignored.
pub(super) fn parse_drawing<R: BufRead>(reader: R) -> Result<Vec<PictureAnchor>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut anchors = Vec::new();
    let mut current: Option<PictureAnchor> = None;
    let mut one_cell = false;
    let mut in_from = false;
    let mut in_pic = false;
    let mut field: Option<FromField> = None;

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                name @ (b"oneCellAnchor" | b"twoCellAnchor") => {
                    one_cell = name == b"oneCellAnchor";
                    current = Some(PictureAnchor::default());
                }
                b"from" if current.is_some() => in_from = true,
                b"col" if in_from => field = Some(FromField::Col),
                b"colOff" if in_from => field = Some(FromField::ColOff),
                b"row" if in_from => field = Some(FromField::Row),
                b"rowOff" if in_from => field = Some(FromField::RowOff),
                b"ext" if one_cell && !in_pic => {
                    if let Some(anchor) = current.as_mut() {
                        anchor.width = attr_i64(e, b"cx").map_or(0, emu_to_pixels);
                        anchor.height = attr_i64(e, b"cy").map_or(0, emu_to_pixels);
                    }
                }
                b"pic" => in_pic = true,
                b"cNvPr" if in_pic => {
                    if let Some(anchor) = current.as_mut() {
                        anchor.name = attr_string(e, b"name").unwrap_or_default();
                    }
                }
                b"blip" => {
                    if let Some(anchor) = current.as_mut() {
                        anchor.embed = attr_string_local(e, b"embed").unwrap_or_default();
                    }
                }
                _ => {}
            },
            Event::Text(ref t) => {
                if let (Some(f), Some(anchor)) = (field, current.as_mut()) {
                    let value: i64 = t.unescape()?.trim().parse().unwrap_or(0);
                    // Anchor cells are 0-based in DrawingML
                    let cell = u32::try_from(value.max(0)).unwrap_or(0).saturating_add(1);
                    match f {
                        FromField::Col => anchor.col = cell,
                        FromField::Row => anchor.row = cell,
                        FromField::ColOff => anchor.offset_x = value,
                        FromField::RowOff => anchor.offset_y = value,
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"from" => in_from = false,
                b"col" | b"colOff" | b"row" | b"rowOff" => field = None,
                b"pic" => in_pic = false,
                b"oneCellAnchor" | b"twoCellAnchor" => {
                    if let Some(anchor) = current.take() {
                        if !anchor.embed.is_empty() && anchor.row > 0 && anchor.col > 0 {
                            anchors.push(anchor);
                        }
                    }
                    one_cell = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(anchors)
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

    const DRAWING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing"
          xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <xdr:oneCellAnchor>
    <xdr:from><xdr:col>1</xdr:col><xdr:colOff>19050</xdr:colOff><xdr:row>2</xdr:row><xdr:rowOff>9525</xdr:rowOff></xdr:from>
    <xdr:ext cx="952500" cy="476250"/>
    <xdr:pic>
      <xdr:nvPicPr><xdr:cNvPr id="2" name="Logo"/><xdr:cNvPicPr/></xdr:nvPicPr>
      <xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill>
      <xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="1" cy="1"/></a:xfrm></xdr:spPr>
    </xdr:pic>
    <xdr:clientData/>
  </xdr:oneCellAnchor>
  <xdr:twoCellAnchor>
    <xdr:from><xdr:col>0</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>0</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:to><xdr:col>3</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>5</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
    <xdr:pic>
      <xdr:nvPicPr><xdr:cNvPr id="3" name="Photo"/></xdr:nvPicPr>
      <xdr:blipFill><a:blip r:embed="rId2"/></xdr:blipFill>
    </xdr:pic>
  </xdr:twoCellAnchor>
  <xdr:twoCellAnchor>
    <xdr:from><xdr:col>4</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>4</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:graphicFrame><a:graphic/></xdr:graphicFrame>
  </xdr:twoCellAnchor>
</xdr:wsDr>"#;

    #[test]
    fn test_parse_drawing() {
        let anchors = parse_drawing(DRAWING.as_bytes()).unwrap();
        assert_eq!(anchors.len(), 2);

        let logo = &anchors[0];
        assert_eq!((logo.row, logo.col), (3, 2));
        assert_eq!((logo.offset_x, logo.offset_y), (19050, 9525));
        assert_eq!((logo.width, logo.height), (100, 50));
        assert_eq!(logo.name, "Logo");
        assert_eq!(logo.embed, "rId1");

        let photo = &anchors[1];
        assert_eq!((photo.row, photo.col), (1, 1));
        assert_eq!((photo.width, photo.height), (0, 0));
        assert_eq!(photo.embed, "rId2");
    }
}
