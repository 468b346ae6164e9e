//! Theme, indexed and explicit color resolution for SpreadsheetML.

use crate::style::Rgb;
use crate::xml_helpers::ColorAttrs;

/// Excel's legacy 64-entry indexed palette.
pub const INDEXED_COLORS: [&str; 64] = [
    "000000", "FFFFFF", "FF0000", "00FF00", "0000FF", "FFFF00", "FF00FF", "00FFFF",
    "000000", "FFFFFF", "FF0000", "00FF00", "0000FF", "FFFF00", "FF00FF", "00FFFF",
    "800000", "008000", "000080", "808000", "800080", "008080", "C0C0C0", "808080",
    "9999FF", "993366", "FFFFCC", "CCFFFF", "660066", "FF8080", "0066CC", "CCCCFF",
    "000080", "FF00FF", "FFFF00", "00FFFF", "800080", "800000", "008080", "0000FF",
    "00CCFF", "CCFFFF", "CCFFCC", "FFFF99", "99CCFF", "FF99CC", "CC99FF", "FFCC99",
    "3366FF", "33CCCC", "99CC00", "FFCC00", "FF9900", "FF6600", "666699", "969696",
    "003366", "339966", "003300", "333300", "993300", "993366", "333399", "333333",
];

/// Office theme colors in SpreadsheetML index order
/// (lt1, dk1, lt2, dk2, accent1..accent6, hlink, folHlink).
pub const DEFAULT_THEME_COLORS: [&str; 12] = [
    "FFFFFF", "000000", "E7E6E6", "44546A", "4472C4", "ED7D31", "A5A5A5", "FFC000", "5B9BD5",
    "70AD47", "0563C1", "954F72",
];

/// Palette context for resolving color references.
#[derive(Debug, Clone)]
pub struct Palette {
    /// Theme colors as `RRGGBB`, indexed like [`DEFAULT_THEME_COLORS`].
    pub theme: Vec<String>,
    /// Custom indexed palette from `<indexedColors>`, empty if absent.
    pub indexed: Vec<String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME_COLORS.iter().map(ToString::to_string).collect(),
            indexed: Vec::new(),
        }
    }
}

impl Palette {
    /// Resolve a color reference to `RRGGBB`.
    ///
    /// Priority is rgb, then theme, then indexed, then auto. Tint applies to
    /// whichever base color was picked.
    pub fn resolve(&self, color: &ColorAttrs) -> Option<String> {
        let base = if let Some(rgb) = &color.rgb {
            Rgb::from_hex(rgb)
        } else if let Some(theme) = color.theme {
            let idx = usize::try_from(theme).ok()?;
            self.theme
                .get(idx)
                .map(String::as_str)
                .or_else(|| DEFAULT_THEME_COLORS.get(idx).copied())
                .and_then(Rgb::from_hex)
        } else if let Some(indexed) = color.indexed {
            // 64 is the system foreground
            if indexed == 64 {
                Some(Rgb::BLACK)
            } else {
                let idx = usize::try_from(indexed).ok()?;
                self.indexed
                    .get(idx)
                    .map(String::as_str)
                    .or_else(|| INDEXED_COLORS.get(idx).copied())
                    .and_then(Rgb::from_hex)
            }
        } else if color.auto {
            Some(Rgb::BLACK)
        } else {
            None
        }?;

        let tinted = match color.tint {
            Some(tint) if tint.abs() > f64::EPSILON => base.tinted(tint),
            _ => base,
        };
        Some(tinted.to_hex())
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

    fn attrs() -> ColorAttrs {
        ColorAttrs::default()
    }

    #[test]
    fn test_rgb_strips_alpha() {
        let c = ColorAttrs {
            rgb: Some("FF112233".into()),
            ..attrs()
        };
        assert_eq!(Palette::default().resolve(&c).unwrap(), "112233");
    }

    #[test]
    fn test_theme_and_tint() {
        let palette = Palette::default();
        let accent1 = ColorAttrs {
            theme: Some(4),
            ..attrs()
        };
        assert_eq!(palette.resolve(&accent1).unwrap(), "4472C4");

        let lighter = ColorAttrs {
            theme: Some(1),
            tint: Some(0.5),
            ..attrs()
        };
        assert_eq!(palette.resolve(&lighter).unwrap(), "808080");
    }

    #[test]
    fn test_indexed() {
        let mut palette = Palette::default();
        let red = ColorAttrs {
            indexed: Some(10),
            ..attrs()
        };
        assert_eq!(palette.resolve(&red).unwrap(), "FF0000");

        let system = ColorAttrs {
            indexed: Some(64),
            ..attrs()
        };
        assert_eq!(palette.resolve(&system).unwrap(), "000000");

        palette.indexed = vec!["ABCDEF".into()];
        let custom = ColorAttrs {
            indexed: Some(0),
            ..attrs()
        };
        assert_eq!(palette.resolve(&custom).unwrap(), "ABCDEF");
    }

    #[test]
    fn test_unset() {
        assert!(Palette::default().resolve(&attrs()).is_none());
        let auto = ColorAttrs {
            auto: true,
            ..attrs()
        };
        assert_eq!(Palette::default().resolve(&auto).unwrap(), "000000");
    }
}
