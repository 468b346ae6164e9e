//! Embedded pictures decoded into premultiplied bitmaps.

use tiny_skia::Pixmap;

use crate::error::{Result, XlsnapError};
use crate::workbook::Picture;

/// EMU to pixel factor used for picture offsets.
pub const EMU_TO_PIXEL: f64 = 0.0008;

/// A decoded picture anchored at a cell.
#[derive(Debug, Clone)]
pub struct ExcelImage {
    pub name: String,
    /// Format tag reported by the workbook, e.g. `"png"`.
    pub format: String,
    pub bytes: Vec<u8>,
    pub bitmap: Pixmap,
    /// 1-based anchor cell.
    pub row: u32,
    pub col: u32,
    /// Offset from the anchor's top-left corner, in EMU.
    pub offset_x: i64,
    pub offset_y: i64,
    /// Requested size in pixels; 0 means natural size.
    pub width: u32,
    pub height: u32,
}

impl ExcelImage {
    /// Decode `picture` and anchor it at `(row, col)`.
    ///
    /// # Errors
    /// [`XlsnapError::ImageDecode`] when the bytes are not a supported image.
    pub fn from_picture(row: u32, col: u32, picture: &Picture) -> Result<Self> {
        let bitmap = decode_bitmap(&picture.bytes, &picture.format)?;
        Ok(Self {
            name: picture.name.clone(),
            format: picture.format.clone(),
            bytes: picture.bytes.clone(),
            bitmap,
            row,
            col,
            offset_x: picture.offset_x,
            offset_y: picture.offset_y,
            width: picture.width,
            height: picture.height,
        })
    }

    pub fn natural_width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.bitmap.height()
    }

    /// Size to draw at before scaling: the explicit one when both sides are
    /// set, the decoded one otherwise.
    pub fn display_size(&self) -> (u32, u32) {
        if self.width > 0 && self.height > 0 {
            (self.width, self.height)
        } else {
            (self.natural_width(), self.natural_height())
        }
    }

    /// Offset from the anchor corner in logical pixels.
    #[allow(clippy::cast_precision_loss)]
    pub fn offset_pixels(&self) -> (f64, f64) {
        (
            self.offset_x as f64 * EMU_TO_PIXEL,
            self.offset_y as f64 * EMU_TO_PIXEL,
        )
    }
}

fn format_hint(tag: &str) -> Option<image::ImageFormat> {
    match tag.to_ascii_lowercase().as_str() {
        "png" => Some(image::ImageFormat::Png),
        "jpeg" | "jpg" => Some(image::ImageFormat::Jpeg),
        "gif" => Some(image::ImageFormat::Gif),
        _ => None,
    }
}

/// Decode image bytes into a premultiplied RGBA pixmap.
///
/// Magic bytes win over the format tag; the tag is only consulted when the
/// content cannot be sniffed.
///
/// # Errors
/// [`XlsnapError::ImageDecode`] for empty, unknown or corrupt data.
pub fn decode_bitmap(data: &[u8], format: &str) -> Result<Pixmap> {
    if data.is_empty() {
        return Err(XlsnapError::ImageDecode("empty picture data".to_string()));
    }
    let fmt = image::guess_format(data)
        .ok()
        .or_else(|| format_hint(format))
        .ok_or_else(|| XlsnapError::ImageDecode(format!("unrecognised format {format:?}")))?;
    let decoded = image::load_from_memory_with_format(data, fmt)
        .map_err(|e| XlsnapError::ImageDecode(e.to_string()))?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| XlsnapError::ImageDecode(format!("bad dimensions {width}x{height}")))?;
    for (src, dst) in rgba
        .as_raw()
        .chunks_exact(4)
        .zip(pixmap.data_mut().chunks_exact_mut(4))
    {
        if let ([r, g, b, a], [dr, dg, db, da]) = (src, dst) {
            *dr = premultiply(*r, *a);
            *dg = premultiply(*g, *a);
            *db = premultiply(*b, *a);
            *da = *a;
        }
    }
    Ok(pixmap)
}

// Result fits in u8 since channel * alpha / 255 <= 255.
#[allow(clippy::cast_possible_truncation)]
fn premultiply(channel: u8, alpha: u8) -> u8 {
    let prod = u16::from(channel) * u16::from(alpha) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// A solid-color PNG of the given size.
    pub(crate) fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let pixmap = decode_bitmap(&png_bytes(3, 2, [255, 0, 0, 255]), "png").unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (3, 2));
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (255, 0, 0, 255));
    }

    #[test]
    fn test_decode_premultiplies() {
        let pixmap = decode_bitmap(&png_bytes(1, 1, [255, 255, 255, 128]), "").unwrap();
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 128);
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_bitmap(b"definitely not an image", "png").unwrap_err();
        assert!(matches!(err, XlsnapError::ImageDecode(_)));
        assert!(err.is_recoverable());
        assert!(decode_bitmap(&[], "png").is_err());
    }

    #[test]
    fn test_display_size() {
        let picture = Picture {
            name: "p".into(),
            bytes: png_bytes(4, 5, [0, 0, 0, 255]),
            format: "png".into(),
            offset_x: 12_500,
            offset_y: 0,
            width: 0,
            height: 0,
        };
        let mut img = ExcelImage::from_picture(2, 3, &picture).unwrap();
        assert_eq!(img.display_size(), (4, 5));
        let (dx, dy) = img.offset_pixels();
        assert!((dx - 10.0).abs() < 1e-9);
        assert_eq!(dy, 0.0);

        img.width = 40;
        img.height = 50;
        assert_eq!(img.display_size(), (40, 50));
    }
}
