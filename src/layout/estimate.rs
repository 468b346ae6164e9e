//! Content-based size estimates for rows and columns left at their defaults.
//!
//! These are empirical heuristics, not font metrics: a wide (non-ASCII)
//! character counts as two units, an ASCII one as one, and the total is
//! scaled into column-width units.

use crate::workbook::{DEFAULT_COL_WIDTH, DEFAULT_ROW_HEIGHT, SENTINEL_EPS};

/// Weight of a character above U+007F.
pub const WIDE_CHAR_UNITS: f64 = 2.0;
/// Weight of an ASCII character.
pub const NARROW_CHAR_UNITS: f64 = 1.0;
/// Character units to column-width units.
pub const TEXT_WIDTH_FACTOR: f64 = 0.8;
/// Slack added when a column is widened to fit its content.
pub const WIDTH_BUFFER: f64 = 1.4;
/// Points to pixels, also the line-height multiplier of a font size.
pub const POINT_TO_PIXEL: f64 = 1.33;
/// Column-width units to pixels.
pub const COL_UNIT_TO_PIXEL: f64 = 7.0;
pub const MIN_ROW_HEIGHT: f64 = 15.0;
pub const MAX_ROW_HEIGHT: f64 = 150.0;

pub fn is_default_row_height(height: f64) -> bool {
    (height - DEFAULT_ROW_HEIGHT).abs() < SENTINEL_EPS
}

pub fn is_default_col_width(width: f64) -> bool {
    (width - DEFAULT_COL_WIDTH).abs() < SENTINEL_EPS
}

/// Estimated width of `text` in column-width units.
pub fn text_width(text: &str) -> f64 {
    let units: f64 = text
        .chars()
        .map(|c| {
            if u32::from(c) > 127 {
                WIDE_CHAR_UNITS
            } else {
                NARROW_CHAR_UNITS
            }
        })
        .sum();
    units * TEXT_WIDTH_FACTOR
}

// `ceil` of a finite non-negative ratio; large values saturate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lines_needed(width: f64, col_width: f64) -> u32 {
    let lines = (width / col_width).ceil();
    if lines.is_finite() {
        (lines.clamp(1.0, f64::from(u32::MAX))) as u32
    } else {
        1
    }
}

/// Number of lines `value` occupies in a column `col_width` units wide.
///
/// Explicit `\n`/`\r` breaks are always honoured, each segment estimated on
/// its own. Without breaks the value only spans several lines if `wraps`.
pub fn line_count(value: &str, col_width: f64, wraps: bool) -> u32 {
    let col_width = if col_width > 0.0 {
        col_width
    } else {
        DEFAULT_COL_WIDTH
    };
    if value.contains(['\n', '\r']) {
        let total: u32 = value
            .split(['\n', '\r'])
            .filter(|seg| !seg.is_empty())
            .map(|seg| lines_needed(text_width(seg), col_width))
            .fold(0, u32::saturating_add);
        total.max(1)
    } else if wraps {
        lines_needed(text_width(value), col_width)
    } else {
        1
    }
}

/// Height in points one cell asks for.
pub fn cell_height(value: &str, font_size: f64, col_width: f64, wraps: bool) -> f64 {
    font_size * POINT_TO_PIXEL * f64::from(line_count(value, col_width, wraps))
}

pub fn clamp_row_height(height: f64) -> f64 {
    if height.is_finite() {
        height.clamp(MIN_ROW_HEIGHT, MAX_ROW_HEIGHT)
    } else {
        MIN_ROW_HEIGHT
    }
}

/// One non-empty cell's contribution to its row's height.
#[derive(Debug, Clone, Copy)]
pub struct RowCellMetrics<'a> {
    pub value: &'a str,
    pub font_size: f64,
    pub col_width: f64,
    pub wraps: bool,
}

/// Tallest cell in a row, clamped to the row bounds.
pub fn estimate_row_height<'a>(cells: impl IntoIterator<Item = RowCellMetrics<'a>>) -> f64 {
    let tallest = cells
        .into_iter()
        .filter(|cell| !cell.value.is_empty())
        .map(|cell| cell_height(cell.value, cell.font_size, cell.col_width, cell.wraps))
        .fold(MIN_ROW_HEIGHT, f64::max);
    clamp_row_height(tallest)
}

/// Widen a default-width column to fit its widest value.
///
/// Returns `current` unless the widest estimate exceeds it.
pub fn fit_column_width<'a>(current: f64, values: impl IntoIterator<Item = &'a str>) -> f64 {
    let widest = values.into_iter().map(text_width).fold(0.0, f64::max);
    if widest > current {
        widest * WIDTH_BUFFER
    } else {
        current
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

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test_case("", 0.0)]
    #[test_case("Hello", 4.0)]
    #[test_case("牛奶", 3.2)]
    #[test_case("a牛", 2.4)]
    fn test_text_width(text: &str, expected: f64) {
        assert!(approx(text_width(text), expected), "{text:?}");
    }

    #[test_case("short", 9.140625, true, 1; "fits")]
    #[test_case("short", 9.140625, false, 1; "no wrap")]
    #[test_case("abcdefghijklmnopqrstuvwxy", 9.140625, true, 3; "wraps to three")]
    #[test_case("abcdefghijklmnopqrstuvwxy", 9.140625, false, 1; "long but unwrapped")]
    #[test_case("a\nb\nc", 9.140625, false, 3; "explicit breaks ignore wrap flag")]
    #[test_case("a\r\nb", 9.140625, false, 2; "crlf counts once")]
    #[test_case("\n", 9.140625, true, 1; "only breaks")]
    #[test_case("abcdefghijklmnopqrstuvwxy", 0.0, true, 3; "non-positive width uses default")]
    fn test_line_count(value: &str, width: f64, wraps: bool, expected: u32) {
        assert_eq!(line_count(value, width, wraps), expected);
    }

    #[test]
    fn test_row_height_defaults_and_bounds() {
        assert_eq!(estimate_row_height(Vec::new()), MIN_ROW_HEIGHT);

        let one_line = RowCellMetrics {
            value: "x",
            font_size: 11.0,
            col_width: DEFAULT_COL_WIDTH,
            wraps: true,
        };
        // 14.63pt of content still clamps up to the minimum
        assert_eq!(estimate_row_height([one_line]), MIN_ROW_HEIGHT);

        let huge = RowCellMetrics {
            value: "x",
            font_size: 400.0,
            ..one_line
        };
        assert_eq!(estimate_row_height([one_line, huge]), MAX_ROW_HEIGHT);

        let empty_big = RowCellMetrics {
            value: "",
            font_size: 72.0,
            ..one_line
        };
        assert_eq!(estimate_row_height([empty_big]), MIN_ROW_HEIGHT);
    }

    #[test]
    fn test_fit_column_width() {
        assert_eq!(fit_column_width(DEFAULT_COL_WIDTH, ["Hello"]), DEFAULT_COL_WIDTH);
        let long = "a fairly long header value";
        let width = fit_column_width(DEFAULT_COL_WIDTH, ["x", long]);
        assert!(approx(width, text_width(long) * WIDTH_BUFFER));
    }

    #[test]
    fn test_sentinels() {
        assert!(is_default_row_height(15.0));
        assert!(!is_default_row_height(15.5));
        assert!(is_default_col_width(9.140625));
        assert!(!is_default_col_width(20.0));
    }

    #[test]
    fn test_clamp_non_finite() {
        assert_eq!(clamp_row_height(f64::NAN), MIN_ROW_HEIGHT);
        assert_eq!(clamp_row_height(3.0), MIN_ROW_HEIGHT);
        assert_eq!(clamp_row_height(40.0), 40.0);
    }
}
