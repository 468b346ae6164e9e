//! Executes a display list on a pixmap.

use std::sync::atomic::{AtomicBool, Ordering};

use tiny_skia::{Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform};

use super::fonts::FontRegistry;
use super::plan::PaintCommand;
use super::text::{FaceSet, LineMetrics};
use crate::grid::ExcelImage;
use crate::layout::LayoutRect;
use crate::style::{FontSpec, HAlign, Rgb, VAlign};

/// Gap between cell edge and text, in device pixels.
pub const TEXT_PADDING: f32 = 4.0;

/// Stroke width of base grid lines, in logical pixels.
const GRID_LINE_WIDTH: f32 = 1.0;

static WARNED_NO_FONTS: AtomicBool = AtomicBool::new(false);

fn paint_for(color: Rgb) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

// Device geometry fits comfortably in f32.
#[allow(clippy::cast_possible_truncation)]
fn f32_of(v: f64) -> f32 {
    v as f32
}

fn skia_rect(rect: &LayoutRect) -> Option<Rect> {
    Rect::from_xywh(
        f32_of(rect.x),
        f32_of(rect.y),
        f32_of(rect.width),
        f32_of(rect.height),
    )
}

/// Baselines of `count` lines placed between `top` and `bottom`.
///
/// The aligned box runs from the first line's ascent to the last line's
/// descent, so centered text is centered on its glyph extents rather than
/// on the line gap.
#[allow(clippy::cast_precision_loss)]
fn line_baselines(
    metrics: &LineMetrics,
    count: usize,
    top: f32,
    bottom: f32,
    v_align: VAlign,
) -> Vec<f32> {
    if count == 0 {
        return Vec::new();
    }
    let leading = (count - 1) as f32 * metrics.line_height;
    let ink = leading + metrics.ascent - metrics.descent;
    let first_top = match v_align {
        VAlign::Top => top.round() + TEXT_PADDING,
        VAlign::Center => ((top + bottom) / 2.0).round() - ink / 2.0,
        VAlign::Bottom => bottom.round() - TEXT_PADDING - ink,
    };
    (0..count)
        .map(|i| first_top + metrics.ascent + i as f32 * metrics.line_height)
        .collect()
}

/// A text run with its layout inputs.
struct TextRun<'c> {
    rect: &'c LayoutRect,
    lines: &'c [String],
    font: &'c FontSpec,
    h_align: HAlign,
    v_align: VAlign,
    wrap: bool,
}

pub struct Painter<'a> {
    fonts: &'a FontRegistry,
    images: &'a [ExcelImage],
    scale: f32,
    grid_color: Rgb,
}

impl<'a> Painter<'a> {
    pub fn new(fonts: &'a FontRegistry, images: &'a [ExcelImage], scale: f64, grid_color: Rgb) -> Self {
        if fonts.is_empty() && !WARNED_NO_FONTS.swap(true, Ordering::Relaxed) {
            log::warn!("no fonts available; cell text will not be drawn");
        }
        Self {
            fonts,
            images,
            scale: f32_of(scale),
            grid_color,
        }
    }

    fn logical(&self) -> Transform {
        Transform::from_scale(self.scale, self.scale)
    }

    pub fn paint(&self, pixmap: &mut Pixmap, commands: &[PaintCommand]) {
        let mut grid = PathBuilder::new();
        let mut grid_flushed = false;

        for command in commands {
            if !matches!(command, PaintCommand::GridLine { .. }) && !grid_flushed {
                self.stroke_grid(pixmap, std::mem::take(&mut grid));
                grid_flushed = true;
            }
            match command {
                PaintCommand::GridLine { x1, y1, x2, y2 } => {
                    grid.move_to(f32_of(*x1), f32_of(*y1));
                    grid.line_to(f32_of(*x2), f32_of(*y2));
                }
                PaintCommand::Fill { rect, color, .. } => self.fill(pixmap, rect, *color),
                PaintCommand::Text {
                    rect,
                    lines,
                    font,
                    h_align,
                    v_align,
                    wrap,
                    ..
                } => self.text(
                    pixmap,
                    &TextRun {
                        rect,
                        lines,
                        font,
                        h_align: *h_align,
                        v_align: *v_align,
                        wrap: *wrap,
                    },
                ),
                PaintCommand::Border {
                    x1,
                    y1,
                    x2,
                    y2,
                    width,
                    color,
                    ..
                } => self.line(pixmap, (*x1, *y1, *x2, *y2), *width, *color),
                PaintCommand::Image {
                    index,
                    x,
                    y,
                    width,
                    height,
                } => self.image(pixmap, *index, (*x, *y, *width, *height)),
            }
        }
        if !grid_flushed {
            self.stroke_grid(pixmap, grid);
        }
    }

    fn stroke_grid(&self, pixmap: &mut Pixmap, grid: PathBuilder) {
        let Some(path) = grid.finish() else {
            return;
        };
        let stroke = Stroke {
            width: GRID_LINE_WIDTH,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint_for(self.grid_color), &stroke, self.logical(), None);
    }

    fn fill(&self, pixmap: &mut Pixmap, rect: &LayoutRect, color: Rgb) {
        if let Some(r) = skia_rect(rect) {
            pixmap.fill_rect(r, &paint_for(color), self.logical(), None);
        }
    }

    fn line(&self, pixmap: &mut Pixmap, (x1, y1, x2, y2): (f64, f64, f64, f64), width: f32, color: Rgb) {
        let mut pb = PathBuilder::new();
        pb.move_to(f32_of(x1), f32_of(y1));
        pb.line_to(f32_of(x2), f32_of(y2));
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint_for(color), &stroke, self.logical(), None);
    }

    fn image(&self, pixmap: &mut Pixmap, index: usize, (x, y, width, height): (f64, f64, f64, f64)) {
        let Some(image) = self.images.get(index) else {
            return;
        };
        let (nw, nh) = (image.natural_width(), image.natural_height());
        if nw == 0 || nh == 0 || width <= 0.0 || height <= 0.0 {
            return;
        }
        let sx = f32_of(width) / nw as f32;
        let sy = f32_of(height) / nh as f32;
        let transform = Transform::from_row(sx, 0.0, 0.0, sy, f32_of(x), f32_of(y));
        let paint = PixmapPaint {
            quality: tiny_skia::FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(0, 0, image.bitmap.as_ref(), &paint, transform, None);
    }

    fn text(&self, pixmap: &mut Pixmap, run: &TextRun<'_>) {
        let Some(faces) = FaceSet::for_font(self.fonts, run.font) else {
            return;
        };
        let size = f32_of(run.font.size) * self.scale;
        if size <= 0.0 {
            return;
        }
        let metrics = faces.metrics(size);

        let left = f32_of(run.rect.x) * self.scale;
        let right = f32_of(run.rect.right()) * self.scale;
        let top = f32_of(run.rect.y) * self.scale;
        let bottom = f32_of(run.rect.bottom()) * self.scale;
        let available = right - left - 2.0 * TEXT_PADDING;

        let lines: Vec<String> = if run.wrap {
            run.lines
                .iter()
                .flat_map(|l| faces.wrap(l, size, available))
                .collect()
        } else {
            run.lines.to_vec()
        };
        let baselines = line_baselines(&metrics, lines.len(), top, bottom, run.v_align);

        for (line, baseline) in lines.iter().zip(baselines) {
            if line.is_empty() {
                continue;
            }
            let width = faces.measure(line, size);
            let x = match run.h_align {
                HAlign::Right => right.round() - TEXT_PADDING - width,
                HAlign::Center => ((left + right) / 2.0).round() - width / 2.0,
                HAlign::Left | HAlign::General => left.round() + TEXT_PADDING,
            };
            faces.draw_line(pixmap, line, x, baseline, size, run.font, run.font.color);
        }
    }
}
