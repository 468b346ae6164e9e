//! Glyph outlines to pixels: measuring, wrapping and drawing text runs.

use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::fonts::FontRegistry;
use crate::style::{FontSpec, Rgb};

/// Horizontal skew applied to synthesise italics.
const ITALIC_SKEW: f32 = -0.2;
/// Outline stroke width, relative to the font size, for synthetic bold.
const BOLD_STROKE: f32 = 0.04;
/// Line height relative to the font size when a face has no metrics.
const FALLBACK_LINE_HEIGHT: f32 = 1.2;

/// Vertical metrics of a face at a pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_height: f32,
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }

    // Font units are y-up; the canvas is y-down.
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// The face chosen for a font spec plus the registry default for glyphs it
/// lacks.
pub struct FaceSet<'a> {
    primary: Face<'a>,
    fallback: Option<Face<'a>>,
}

impl<'a> FaceSet<'a> {
    /// `None` when the registry has no usable face at all.
    ///
    /// A matched face that no longer parses gives way to the default face.
    pub fn for_font(registry: &'a FontRegistry, font: &FontSpec) -> Option<Self> {
        let fallback = registry.default_face().and_then(|f| f.face());
        let matched = registry.resolve(&font.family);
        let primary = match matched.and_then(|f| f.face()) {
            Some(face) => face,
            None => {
                if let Some(face) = matched {
                    log::warn!(
                        "font {:?} ({}): face failed to parse",
                        face.family,
                        face.file_name
                    );
                }
                let Some(face) = fallback.clone() else {
                    if !registry.is_empty() {
                        log::warn!("no usable face for font {:?}; text skipped", font.family);
                    }
                    return None;
                };
                face
            }
        };
        Some(Self { primary, fallback })
    }

    fn glyph(&self, c: char) -> Option<(&Face<'a>, GlyphId)> {
        if let Some(id) = self.primary.glyph_index(c) {
            return Some((&self.primary, id));
        }
        let fallback = self.fallback.as_ref()?;
        fallback.glyph_index(c).map(|id| (fallback, id))
    }

    fn px_scale(face: &Face<'_>, size: f32) -> f32 {
        size / f32::from(face.units_per_em().max(1))
    }

    fn advance(&self, c: char, size: f32) -> f32 {
        match self.glyph(c) {
            Some((face, id)) => {
                f32::from(face.glyph_hor_advance(id).unwrap_or(0)) * Self::px_scale(face, size)
            }
            None => size * 0.5,
        }
    }

    pub fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.advance(c, size)).sum()
    }

    pub fn metrics(&self, size: f32) -> LineMetrics {
        let face = &self.primary;
        let scale = Self::px_scale(face, size);
        let ascent = f32::from(face.ascender()) * scale;
        let descent = f32::from(face.descender()) * scale;
        let line_height = ascent - descent + f32::from(face.line_gap()) * scale;
        if line_height.is_finite() && line_height > 0.0 {
            LineMetrics {
                ascent,
                descent,
                line_height,
            }
        } else {
            LineMetrics {
                ascent: size * 0.8,
                descent: -size * 0.2,
                line_height: size * FALLBACK_LINE_HEIGHT,
            }
        }
    }

    /// Break `text` so no line exceeds `max_width`. Words longer than a line
    /// are split between characters, which also covers scripts without
    /// spaces.
    pub fn wrap(&self, text: &str, size: f32, max_width: f32) -> Vec<String> {
        if max_width <= 0.0 || self.measure(text, size) <= max_width {
            return vec![text.to_string()];
        }
        let space = self.advance(' ', size);
        let mut lines = Vec::new();
        let mut line = String::new();
        let mut line_width = 0.0f32;

        for word in text.split(' ') {
            let word_width = self.measure(word, size);
            let needed = if line.is_empty() {
                word_width
            } else {
                line_width + space + word_width
            };
            if needed <= max_width {
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(word);
                line_width = needed;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
            }
            if word_width <= max_width {
                line.push_str(word);
                line_width = word_width;
                continue;
            }
            for c in word.chars() {
                let w = self.advance(c, size);
                if line_width + w > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                }
                line.push(c);
                line_width += w;
            }
        }
        if !line.is_empty() || lines.is_empty() {
            lines.push(line);
        }
        lines
    }

    /// Draw one line with its baseline at `(x, baseline)` in device pixels.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        font: &FontSpec,
        color: Rgb,
    ) {
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = true;

        let skew = if font.italic {
            Transform::from_row(1.0, 0.0, ITALIC_SKEW, 1.0, -ITALIC_SKEW * baseline, 0.0)
        } else {
            Transform::identity()
        };
        let bold_stroke = font.bold.then(|| Stroke {
            width: (size * BOLD_STROKE).max(0.5),
            ..Stroke::default()
        });

        let mut pen_x = x;
        for c in text.chars() {
            let Some((face, id)) = self.glyph(c) else {
                pen_x += size * 0.5;
                continue;
            };
            let scale = Self::px_scale(face, size);
            let mut builder = GlyphPathBuilder::new(pen_x, baseline, scale);
            if face.outline_glyph(id, &mut builder).is_some() {
                if let Some(path) = builder.finish() {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, skew, None);
                    if let Some(stroke) = &bold_stroke {
                        pixmap.stroke_path(&path, &paint, stroke, skew, None);
                    }
                }
            }
            pen_x += f32::from(face.glyph_hor_advance(id).unwrap_or(0)) * scale;
        }

        if font.underline {
            let thickness = (size / 14.0).max(1.0);
            let y = baseline + thickness * 1.5;
            if let Some(rect) = Rect::from_xywh(x, y, pen_x - x, thickness) {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
    }
}
