//! Style resolution: workbook style ids to paint-ready attributes.
//!
//! [`StyleResolver`] never fails. Unknown ids, negative ids and unusable
//! records degrade to [`ResolvedStyle::default`] with a debug log line.
//! [`StyleCache`] memoizes one [`ResolvedStyle`] per distinct id per sheet.

mod color;

pub use color::Rgb;

use std::collections::HashMap;
use std::sync::Arc;

use crate::workbook::{BorderSide, RawAlignment, RawBorder, RawFont, RawStyle, Workbook};

/// Font family used when a style names none.
pub const DEFAULT_FONT_FAMILY: &str = "Calibri";
/// Font size in points used when a style names none.
pub const DEFAULT_FONT_SIZE: f64 = 11.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    /// Points.
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Rgb,
}

impl FontSpec {
    pub fn with_size(size: f64) -> Self {
        Self {
            family: DEFAULT_FONT_FAMILY.to_string(),
            size,
            bold: false,
            italic: false,
            underline: false,
            color: Rgb::BLACK,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::with_size(DEFAULT_FONT_SIZE)
    }
}

/// A drawn border side.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderLine {
    /// Style name as the workbook reported it.
    pub style: String,
    /// Stroke width in logical pixels.
    pub width: f32,
    /// `None` when the side has a style but no explicit color.
    pub color: Option<Rgb>,
}

impl BorderLine {
    /// Map a border style name to a stroke width.
    pub fn width_for(style: &str) -> f32 {
        match style {
            "medium" | "mediumDashed" | "mediumDashDot" | "mediumDashDotDot" | "slantDashDot" => {
                2.0
            }
            "thick" | "double" => 3.0,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    /// Right for numbers, left for everything else.
    #[default]
    General,
    Left,
    Center,
    Right,
}

impl HAlign {
    pub fn from_name(name: &str) -> Self {
        match name {
            "left" | "fill" | "justify" | "distributed" => Self::Left,
            "center" | "centerContinuous" => Self::Center,
            "right" => Self::Right,
            _ => Self::General,
        }
    }

    /// Settle `General` against the text that will be drawn.
    pub fn resolve_for(self, text: &str) -> Self {
        match self {
            Self::General if looks_numeric(text) => Self::Right,
            Self::General => Self::Left,
            other => other,
        }
    }
}

/// True when `text` parses as a number once surrounding whitespace is trimmed.
pub fn looks_numeric(text: &str) -> bool {
    text.trim().parse::<f64>().is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    Center,
    #[default]
    Bottom,
}

impl VAlign {
    pub fn from_name(name: &str) -> Self {
        match name {
            "top" => Self::Top,
            "center" | "justify" | "distributed" => Self::Center,
            _ => Self::Bottom,
        }
    }
}

/// Paint attributes for one style id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedStyle {
    pub font: FontSpec,
    pub fill: Option<Rgb>,
    pub left: Option<BorderLine>,
    pub top: Option<BorderLine>,
    pub right: Option<BorderLine>,
    pub bottom: Option<BorderLine>,
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub wrap_text: bool,
    /// Whether the workbook supplied an alignment record at all.
    pub has_alignment: bool,
}

impl ResolvedStyle {
    pub fn border(&self, side: BorderSide) -> Option<&BorderLine> {
        match side {
            BorderSide::Left => self.left.as_ref(),
            BorderSide::Top => self.top.as_ref(),
            BorderSide::Right => self.right.as_ref(),
            BorderSide::Bottom => self.bottom.as_ref(),
        }
    }

    /// The border to draw over the base grid on `side`, if any.
    ///
    /// Only sides with an explicit color different from `grid` qualify.
    pub fn border_override(&self, side: BorderSide, grid: Rgb) -> Option<(&BorderLine, Rgb)> {
        let line = self.border(side)?;
        match line.color {
            Some(color) if color != grid => Some((line, color)),
            _ => None,
        }
    }

    /// Whether text may break across lines. Styles without an alignment
    /// record wrap.
    pub fn wraps(&self) -> bool {
        !self.has_alignment || self.wrap_text
    }

    fn set_border(&mut self, side: BorderSide, line: BorderLine) {
        let slot = match side {
            BorderSide::Left => &mut self.left,
            BorderSide::Top => &mut self.top,
            BorderSide::Right => &mut self.right,
            BorderSide::Bottom => &mut self.bottom,
        };
        *slot = Some(line);
    }
}

fn resolve_font(raw: &RawFont, default_size: f64) -> FontSpec {
    FontSpec {
        family: if raw.family.trim().is_empty() {
            DEFAULT_FONT_FAMILY.to_string()
        } else {
            raw.family.trim().to_string()
        },
        size: if raw.size.is_finite() && raw.size > 0.0 {
            raw.size
        } else {
            default_size
        },
        bold: raw.bold,
        italic: raw.italic,
        underline: !raw.underline.is_empty() && raw.underline != "none",
        color: if raw.color.is_empty() {
            Rgb::BLACK
        } else {
            Rgb::parse_or_black(&raw.color)
        },
    }
}

fn resolve_border(raw: &RawBorder) -> Option<BorderLine> {
    if raw.style.is_empty() || raw.style == "none" {
        return None;
    }
    Some(BorderLine {
        style: raw.style.clone(),
        width: BorderLine::width_for(&raw.style),
        color: (!raw.color.is_empty()).then(|| Rgb::parse_or_black(&raw.color)),
    })
}

fn apply_alignment(style: &mut ResolvedStyle, raw: &RawAlignment) {
    style.h_align = HAlign::from_name(&raw.horizontal);
    style.v_align = VAlign::from_name(&raw.vertical);
    style.wrap_text = raw.wrap_text;
    style.has_alignment = true;
}

/// Turn a raw record into paint attributes. Missing pieces take defaults.
pub fn resolve_raw(raw: &RawStyle, default_font_size: f64) -> ResolvedStyle {
    let mut style = ResolvedStyle {
        font: raw.font.as_ref().map_or_else(
            || FontSpec::with_size(default_font_size),
            |f| resolve_font(f, default_font_size),
        ),
        ..ResolvedStyle::default()
    };

    if raw.fill.pattern != "none" {
        if let Some(first) = raw.fill.colors.first() {
            style.fill = Some(Rgb::parse_or_black(first));
        }
    }

    for border in &raw.borders {
        if let Some(line) = resolve_border(border) {
            style.set_border(border.side, line);
        }
    }

    if let Some(alignment) = &raw.alignment {
        apply_alignment(&mut style, alignment);
    }
    style
}

/// Resolves style ids against a workbook's style table.
pub struct StyleResolver<'a> {
    workbook: &'a dyn Workbook,
    default_font_size: f64,
}

impl<'a> StyleResolver<'a> {
    pub fn new(workbook: &'a dyn Workbook) -> Self {
        Self {
            workbook,
            default_font_size: DEFAULT_FONT_SIZE,
        }
    }

    #[must_use]
    pub fn with_default_font_size(mut self, size: f64) -> Self {
        if size.is_finite() && size > 0.0 {
            self.default_font_size = size;
        }
        self
    }

    /// The style every failed lookup falls back to.
    pub fn default_style(&self) -> ResolvedStyle {
        ResolvedStyle {
            font: FontSpec::with_size(self.default_font_size),
            ..ResolvedStyle::default()
        }
    }

    pub fn resolve(&self, style_id: i32) -> ResolvedStyle {
        if style_id < 0 {
            log::debug!("negative style id {style_id}, using defaults");
            return self.default_style();
        }
        match self.workbook.resolve_style(style_id) {
            Ok(raw) => resolve_raw(&raw, self.default_font_size),
            Err(e) => {
                log::debug!("style {style_id}: {e}; using defaults");
                self.default_style()
            }
        }
    }
}

/// Per-sheet memo of resolved styles, filled once per distinct id.
#[derive(Debug, Clone)]
pub struct StyleCache {
    entries: HashMap<i32, Arc<ResolvedStyle>>,
    default: Arc<ResolvedStyle>,
    misses: usize,
}

impl StyleCache {
    pub fn new(default: ResolvedStyle) -> Self {
        Self {
            entries: HashMap::new(),
            default: Arc::new(default),
            misses: 0,
        }
    }

    /// Return the cached style for `style_id`, resolving it on first use.
    pub fn get_or_resolve(
        &mut self,
        style_id: i32,
        resolver: &StyleResolver<'_>,
    ) -> Arc<ResolvedStyle> {
        if let Some(style) = self.entries.get(&style_id) {
            return Arc::clone(style);
        }
        self.misses += 1;
        let style = Arc::new(resolver.resolve(style_id));
        self.entries.insert(style_id, Arc::clone(&style));
        style
    }

    /// Cached style, or the default for ids never bound.
    pub fn get(&self, style_id: i32) -> &Arc<ResolvedStyle> {
        self.entries.get(&style_id).unwrap_or(&self.default)
    }

    pub fn default_style(&self) -> &Arc<ResolvedStyle> {
        &self.default
    }

    pub fn contains(&self, style_id: i32) -> bool {
        self.entries.contains_key(&style_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of resolver calls made so far.
    pub fn misses(&self) -> usize {
        self.misses
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
    use crate::workbook::{MemoryWorkbook, RawFill};
    use test_case::test_case;

    fn styled_workbook() -> (MemoryWorkbook, i32) {
        let mut wb = MemoryWorkbook::new();
        let id = wb.add_style(RawStyle {
            font: Some(RawFont {
                family: "Arial".into(),
                size: 14.0,
                bold: true,
                italic: false,
                underline: "single".into(),
                color: "FFFF0000".into(),
            }),
            fill: RawFill {
                pattern: "solid".into(),
                colors: vec!["FFFF00".into()],
            },
            borders: vec![
                RawBorder {
                    side: BorderSide::Bottom,
                    style: "thick".into(),
                    color: "0000FF".into(),
                },
                RawBorder {
                    side: BorderSide::Top,
                    style: "thin".into(),
                    color: String::new(),
                },
            ],
            alignment: Some(RawAlignment {
                horizontal: "center".into(),
                vertical: "top".into(),
                wrap_text: false,
            }),
        });
        (wb, id)
    }

    #[test]
    fn test_resolve_full_record() {
        let (wb, id) = styled_workbook();
        let style = StyleResolver::new(&wb).resolve(id);
        assert_eq!(style.font.family, "Arial");
        assert_eq!(style.font.size, 14.0);
        assert!(style.font.bold);
        assert!(style.font.underline);
        assert_eq!(style.font.color, Rgb::new(255, 0, 0));
        assert_eq!(style.fill, Some(Rgb::new(255, 255, 0)));
        assert_eq!(style.h_align, HAlign::Center);
        assert_eq!(style.v_align, VAlign::Top);
        assert!(!style.wraps());

        let bottom = style.bottom.as_ref().unwrap();
        assert_eq!(bottom.width, 3.0);
        assert_eq!(bottom.color, Some(Rgb::new(0, 0, 255)));
        assert!(style.left.is_none());
    }

    #[test]
    fn test_unknown_and_negative_ids_fall_back() {
        let wb = MemoryWorkbook::new();
        let resolver = StyleResolver::new(&wb);
        for id in [-1, 42] {
            let style = resolver.resolve(id);
            assert_eq!(style, ResolvedStyle::default());
            assert_eq!(style.font.family, DEFAULT_FONT_FAMILY);
            assert_eq!(style.font.size, DEFAULT_FONT_SIZE);
            assert_eq!(style.v_align, VAlign::Bottom);
            assert!(style.fill.is_none());
        }
    }

    #[test]
    fn test_default_font_size_override() {
        let wb = MemoryWorkbook::new();
        let resolver = StyleResolver::new(&wb).with_default_font_size(9.0);
        assert_eq!(resolver.resolve(99).font.size, 9.0);
        assert_eq!(resolver.resolve(0).font.size, 9.0);
    }

    #[test]
    fn test_border_override_rules() {
        let (wb, id) = styled_workbook();
        let style = StyleResolver::new(&wb).resolve(id);
        assert!(style.border_override(BorderSide::Bottom, Rgb::GRID).is_some());
        // Styled but uncolored side
        assert!(style.border_override(BorderSide::Top, Rgb::GRID).is_none());
        // Unset side
        assert!(style.border_override(BorderSide::Left, Rgb::GRID).is_none());
        // Same color as the grid
        assert!(style
            .border_override(BorderSide::Bottom, Rgb::new(0, 0, 255))
            .is_none());
    }

    #[test]
    fn test_fill_none_pattern_ignored() {
        let raw = RawStyle {
            fill: RawFill {
                pattern: "none".into(),
                colors: vec!["FF0000".into()],
            },
            ..RawStyle::default()
        };
        assert!(resolve_raw(&raw, DEFAULT_FONT_SIZE).fill.is_none());
    }

    #[test]
    fn test_invalid_colors_become_black() {
        let raw = RawStyle {
            font: Some(RawFont {
                color: "zzzzzz".into(),
                ..RawFont::default()
            }),
            fill: RawFill {
                pattern: "solid".into(),
                colors: vec!["nope".into()],
            },
            ..RawStyle::default()
        };
        let style = resolve_raw(&raw, DEFAULT_FONT_SIZE);
        assert_eq!(style.font.color, Rgb::BLACK);
        assert_eq!(style.fill, Some(Rgb::BLACK));
    }

    #[test_case("thin", 1.0)]
    #[test_case("hair", 1.0)]
    #[test_case("dotted", 1.0)]
    #[test_case("medium", 2.0)]
    #[test_case("mediumDashed", 2.0)]
    #[test_case("thick", 3.0)]
    #[test_case("double", 3.0)]
    fn test_border_widths(style: &str, width: f32) {
        assert_eq!(BorderLine::width_for(style), width);
    }

    #[test_case(HAlign::General, "123", HAlign::Right)]
    #[test_case(HAlign::General, " -4.5e3 ", HAlign::Right)]
    #[test_case(HAlign::General, "abc", HAlign::Left)]
    #[test_case(HAlign::General, "", HAlign::Left)]
    #[test_case(HAlign::Center, "123", HAlign::Center)]
    #[test_case(HAlign::Left, "123", HAlign::Left)]
    fn test_general_alignment(align: HAlign, text: &str, expected: HAlign) {
        assert_eq!(align.resolve_for(text), expected);
    }

    #[test]
    fn test_wrap_defaults_without_alignment_record() {
        assert!(ResolvedStyle::default().wraps());
        let raw = RawStyle {
            alignment: Some(RawAlignment::default()),
            ..RawStyle::default()
        };
        assert!(!resolve_raw(&raw, DEFAULT_FONT_SIZE).wraps());
    }

    #[test]
    fn test_cache_memoizes() {
        let (wb, id) = styled_workbook();
        let resolver = StyleResolver::new(&wb);
        let mut cache = StyleCache::new(resolver.default_style());

        let a = cache.get_or_resolve(id, &resolver);
        let b = cache.get_or_resolve(id, &resolver);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.misses(), 1);

        cache.get_or_resolve(0, &resolver);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 2);

        assert!(Arc::ptr_eq(cache.get(77), cache.default_style()));
    }
}
