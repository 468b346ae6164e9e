//! RGB color handling for the style resolver and painter.

/// Opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Light gray used for the base grid.
    pub const GRID: Self = Self::new(200, 200, 200);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB` or Excel's `AARRGGBB`, with or without a leading `#`.
    ///
    /// The alpha byte of the 8-digit form is ignored; colors are always opaque.
    pub fn from_hex(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let rgb = match hex.len() {
            6 => hex,
            8 => hex.get(2..)?,
            _ => return None,
        };
        let r = u8::from_str_radix(rgb.get(0..2)?, 16).ok()?;
        let g = u8::from_str_radix(rgb.get(2..4)?, 16).ok()?;
        let b = u8::from_str_radix(rgb.get(4..6)?, 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Like [`Rgb::from_hex`] but invalid input yields black.
    pub fn parse_or_black(s: &str) -> Self {
        Self::from_hex(s).unwrap_or_else(|| {
            log::debug!("unparseable color {s:?}, using black");
            Self::BLACK
        })
    }

    /// `RRGGBB` without a prefix, the form workbook style records use.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Blend toward white. 0.0 leaves the color alone, 1.0 is pure white.
    pub fn lighten(self, factor: f64) -> Self {
        Self {
            r: Self::blend_component(self.r, 255, factor),
            g: Self::blend_component(self.g, 255, factor),
            b: Self::blend_component(self.b, 255, factor),
        }
    }

    /// Blend toward black. 0.0 leaves the color alone, 1.0 is pure black.
    pub fn darken(self, factor: f64) -> Self {
        Self {
            r: Self::blend_component(self.r, 0, factor),
            g: Self::blend_component(self.g, 0, factor),
            b: Self::blend_component(self.b, 0, factor),
        }
    }

    /// Apply a SpreadsheetML tint in `[-1, 1]`: negative shades, positive tints.
    pub fn tinted(self, tint: f64) -> Self {
        if tint < 0.0 {
            self.darken(-tint)
        } else {
            self.lighten(tint)
        }
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, 255)
    }

    // Clamped to [0, 255] before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn blend_component(from: u8, to: u8, factor: f64) -> u8 {
        let from = f64::from(from);
        let to = f64::from(to);
        let blended = from + (to - from) * factor.clamp(0.0, 1.0);
        blended.clamp(0.0, 255.0).round() as u8
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

    #[test_case("FF0000", Some(Rgb::new(255, 0, 0)))]
    #[test_case("#00ff80", Some(Rgb::new(0, 255, 128)))]
    #[test_case("FF336699", Some(Rgb::new(0x33, 0x66, 0x99)))]
    #[test_case("00336699", Some(Rgb::new(0x33, 0x66, 0x99)); "alpha ignored")]
    #[test_case("FFF", None)]
    #[test_case("GG0000", None)]
    #[test_case("", None)]
    fn test_from_hex(input: &str, expected: Option<Rgb>) {
        assert_eq!(Rgb::from_hex(input), expected);
    }

    #[test]
    fn test_parse_or_black() {
        assert_eq!(Rgb::parse_or_black("nonsense"), Rgb::BLACK);
        assert_eq!(Rgb::parse_or_black("C8C8C8"), Rgb::GRID);
    }

    #[test]
    fn test_hex_roundtrip_format() {
        assert_eq!(Rgb::new(0x0A, 0xBC, 0xFF).to_hex(), "0ABCFF");
    }

    #[test]
    fn test_lighten_darken() {
        let c = Rgb::new(100, 100, 100);
        assert_eq!(c.lighten(1.0), Rgb::WHITE);
        assert_eq!(c.darken(1.0), Rgb::BLACK);
        assert_eq!(c.lighten(0.0), c);
        assert_eq!(c.tinted(-0.5), Rgb::new(50, 50, 50));
        assert_eq!(c.tinted(0.5), Rgb::new(178, 178, 178));
    }
}
