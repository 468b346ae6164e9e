//! Utilities for parsing Excel-style cell references and ranges.
//!
//! Everything here is 1-based: `A1` is `(row 1, col 1)`. Coordinates are
//! returned as `(row, col)` pairs.

/// Largest column Excel accepts (`XFD`).
pub const MAX_COL: u32 = 16_384;
/// Largest row Excel accepts.
pub const MAX_ROW: u32 = 1_048_576;

/// A rectangular block of cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl CellRange {
    /// Build a range from two corners given in any order.
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Self {
        Self {
            start_row: a.0.min(b.0),
            start_col: a.1.min(b.1),
            end_row: a.0.max(b.0),
            end_col: a.1.max(b.1),
        }
    }

    /// Number of cells covered.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.end_row - self.start_row + 1) * u64::from(self.end_col - self.start_col + 1)
    }

    /// All addresses in row-major order; the first one is the top-left corner.
    pub fn addresses(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::with_capacity(usize::try_from(self.cell_count()).unwrap_or(0));
        for r in self.start_row..=self.end_row {
            for c in self.start_col..=self.end_col {
                out.push((r, c));
            }
        }
        out
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.start_row..=self.end_row).contains(&row)
            && (self.start_col..=self.end_col).contains(&col)
    }
}

/// Parse a cell reference like "B3" (or "$B$3") into `(row, col)`.
///
/// Returns `None` for anything that is not letters followed by digits, or
/// that falls outside Excel's sheet bounds.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    parse_cell_ref_bytes(cell_ref.trim().as_bytes())
}

/// Parse a cell reference from raw bytes (ASCII) into `(row, col)`.
///
/// This is the bytes equivalent of [`parse_cell_ref`] for use when working with
/// raw XML attribute values (e.g., `attr.value` from quick-xml).
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() {
            if saw_row {
                return None;
            }
            let upper = b.to_ascii_uppercase();
            col = col.checked_mul(26)?.checked_add(u32::from(upper - b'A') + 1)?;
            saw_col = true;
        } else if b.is_ascii_digit() {
            row = row.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 || row > MAX_ROW || col > MAX_COL {
        return None;
    }

    Some((row, col))
}

/// Parse a range like "A1:C3" or a single address "B2".
///
/// A single address yields a one-cell range. Corners may be given in any
/// order; the result is normalized.
pub fn parse_cell_range(range: &str) -> Option<CellRange> {
    let range = range.trim();
    if let Some((start, end)) = range.split_once(':') {
        let a = parse_cell_ref(start)?;
        let b = parse_cell_ref(end)?;
        Some(CellRange::from_corners(a, b))
    } else {
        let a = parse_cell_ref(range)?;
        Some(CellRange::from_corners(a, a))
    }
}

/// Convert a 1-based column number to letters (1 -> "A", 27 -> "AA").
pub fn column_name(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col;
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + u8::try_from(n % 26).unwrap_or(0)));
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Convert column letters to a 1-based number ("A" -> 1, "aa" -> 27).
pub fn column_number(letters: &str) -> Option<u32> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1)?;
    }
    (col <= MAX_COL).then_some(col)
}

/// Format `(row, col)` as an A1 address.
pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", column_name(col), row)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("A1", Some((1, 1)))]
    #[test_case("b3", Some((3, 2)))]
    #[test_case("$C$10", Some((10, 3)))]
    #[test_case("AA100", Some((100, 27)))]
    #[test_case("XFD1048576", Some((1_048_576, 16_384)))]
    #[test_case("XFE1", None)]
    #[test_case("A0", None)]
    #[test_case("1A", None)]
    #[test_case("A1B", None)]
    #[test_case("", None)]
    #[test_case("A", None)]
    #[test_case("A-1", None)]
    fn test_parse_cell_ref(input: &str, expected: Option<(u32, u32)>) {
        assert_eq!(parse_cell_ref(input), expected);
    }

    #[test]
    fn test_parse_range() {
        let r = parse_cell_range("A1:C2").unwrap();
        assert_eq!((r.start_row, r.start_col, r.end_row, r.end_col), (1, 1, 2, 3));
        assert_eq!(r.cell_count(), 6);

        // Reversed corners are normalized
        let r = parse_cell_range("C2:A1").unwrap();
        assert_eq!((r.start_row, r.start_col, r.end_row, r.end_col), (1, 1, 2, 3));

        let single = parse_cell_range("D4").unwrap();
        assert_eq!(single.cell_count(), 1);

        assert!(parse_cell_range("A1:").is_none());
        assert!(parse_cell_range("junk").is_none());
    }

    #[test]
    fn test_addresses_row_major() {
        let r = parse_cell_range("A1:B2").unwrap();
        assert_eq!(r.addresses(), vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
        assert!(r.contains(2, 2));
        assert!(!r.contains(3, 1));
    }

    #[test_case(1, "A")]
    #[test_case(26, "Z")]
    #[test_case(27, "AA")]
    #[test_case(702, "ZZ")]
    #[test_case(703, "AAA")]
    fn test_column_name(col: u32, name: &str) {
        assert_eq!(column_name(col), name);
        assert_eq!(column_number(name), Some(col));
    }

    #[test]
    fn test_cell_name() {
        assert_eq!(cell_name(1, 1), "A1");
        assert_eq!(cell_name(12, 28), "AB12");
        assert_eq!(column_number("a1"), None);
        assert_eq!(column_number(""), None);
    }
}
