//! Shared XML attribute helpers for the XLSX reader.
//!
//! All lookups tolerate namespace prefixes where noted and treat invalid
//! UTF-8 as a missing attribute.

use quick_xml::events::BytesStart;

/// Color reference as it appears on `<color>`, `<fgColor>`, `<bgColor>` and friends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorAttrs {
    pub rgb: Option<String>,
    pub theme: Option<u32>,
    pub tint: Option<f64>,
    pub indexed: Option<u32>,
    pub auto: bool,
}

impl ColorAttrs {
    pub fn is_unset(&self) -> bool {
        self.rgb.is_none() && self.theme.is_none() && self.indexed.is_none() && !self.auto
    }
}

/// Extract a string attribute value by key.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| std::str::from_utf8(&attr.value).ok().map(str::to_string))
}

/// Extract a string attribute by local name, ignoring any `r:` style prefix.
pub fn attr_string_local(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| std::str::from_utf8(&attr.value).ok().map(str::to_string))
}

pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

pub fn attr_i32(e: &BytesStart, key: &[u8]) -> Option<i32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

pub fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Recognizes `"1"` and `"true"` as true, anything else present as false.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// The `val` attribute, ubiquitous in SpreadsheetML.
pub fn attr_val(e: &BytesStart) -> Option<String> {
    attr_string(e, b"val")
}

pub fn attr_val_f64(e: &BytesStart) -> Option<f64> {
    attr_f64(e, b"val")
}

/// Boolean toggle elements like `<b/>` or `<i val="0"/>`: present means on
/// unless `val` says otherwise.
pub fn toggle_val(e: &BytesStart) -> bool {
    attr_bool(e, b"val").unwrap_or(true)
}

/// Parse the color attributes of a color element.
pub fn parse_color_attrs(e: &BytesStart) -> ColorAttrs {
    ColorAttrs {
        rgb: attr_string(e, b"rgb"),
        theme: attr_u32(e, b"theme"),
        tint: attr_f64(e, b"tint"),
        indexed: attr_u32(e, b"indexed"),
        auto: attr_bool(e, b"auto").unwrap_or(false),
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
pub(crate) fn make_start(xml: &str) -> BytesStart<'_> {
    let content = xml
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/')
        .trim_end();
    BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
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
    fn test_attr_string() {
        let e = make_start(r#"<sheet name="Data" r:id="rId3" />"#);
        assert_eq!(attr_string(&e, b"name"), Some("Data".to_string()));
        assert_eq!(attr_string(&e, b"id"), None);
        assert_eq!(attr_string_local(&e, b"id"), Some("rId3".to_string()));
    }

    #[test]
    fn test_numeric_attrs() {
        let e = make_start(r#"<row r="12" ht="30.5" s="-1" />"#);
        assert_eq!(attr_u32(&e, b"r"), Some(12));
        assert_eq!(attr_i32(&e, b"s"), Some(-1));
        assert_eq!(attr_u32(&e, b"s"), None);
        assert!((attr_f64(&e, b"ht").unwrap() - 30.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_toggle_val() {
        assert!(toggle_val(&make_start("<b/>")));
        assert!(!toggle_val(&make_start(r#"<i val="0"/>"#)));
        assert!(toggle_val(&make_start(r#"<u val="true"/>"#)));
    }

    #[test]
    fn test_parse_color_attrs() {
        let e = make_start(r#"<color theme="4" tint="-0.25" />"#);
        let color = parse_color_attrs(&e);
        assert_eq!(color.theme, Some(4));
        assert!((color.tint.unwrap() + 0.25).abs() < f64::EPSILON);
        assert!(color.rgb.is_none());
        assert!(!color.is_unset());

        let empty = parse_color_attrs(&make_start("<color/>"));
        assert!(empty.is_unset());
    }
}
