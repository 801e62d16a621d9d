//! tiny-skia 软件光栅表面。

use emf_core::color::ColorRef;
use emf_core::object::{HatchStyle, LineCap, LineJoin};
use emf_engine::context::rop;
use emf_engine::errors::SurfaceError;
use emf_engine::{
    Background, Bitmap, ClipLayer, ClipMode, ClipRegion, ClipShape, DevicePath, DrawIntent,
    DrawingSurface, Fill, FillRule, PathSegment, Stroke,
};
use emf_core::geometry::Bounds2D;
use glam::DAffine2;
use tiny_skia::{
    BlendMode, Color, FilterQuality, Mask, Paint, Path, PathBuilder, Pattern, Pixmap, PixmapPaint,
    Rect, Shader, SpreadMode, Transform,
};
use tracing::{debug, trace};

const HATCH_TILE: u32 = 8;

struct Canvas {
    pixmap: Pixmap,
    /// 有效裁剪的覆盖率；`None` 表示不裁剪。
    mask: Option<Mask>,
}

/// 把绘制意图光栅化到内存像素。
#[derive(Default)]
pub struct RasterSurface {
    canvas: Option<Canvas>,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.canvas
            .as_ref()
            .map(|canvas| (canvas.pixmap.width(), canvas.pixmap.height()))
    }

    fn canvas(&mut self) -> Result<&mut Canvas, SurfaceError> {
        self.canvas.as_mut().ok_or(SurfaceError::NotStarted)
    }
}

impl DrawingSurface for RasterSurface {
    fn begin(
        &mut self,
        width: u32,
        height: u32,
        background: Background,
    ) -> Result<(), SurfaceError> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(SurfaceError::InvalidSize { width, height })?;
        let [b, g, r, a] = background.bgra();
        pixmap.fill(Color::from_rgba8(r, g, b, a));
        debug!(width, height, ?background, "创建光栅画布");
        self.canvas = Some(Canvas { pixmap, mask: None });
        Ok(())
    }

    fn draw(&mut self, intent: &DrawIntent) -> Result<(), SurfaceError> {
        let canvas = self.canvas()?;
        trace!(kind = intent.kind_name(), "光栅化");
        match intent {
            DrawIntent::Rectangle { rect, fill, stroke } => {
                if let Some(path) = rect_path(rect) {
                    canvas.paint(&path, FillRule::NonZero, fill.as_ref(), stroke.as_ref());
                }
            }
            DrawIntent::Ellipse { rect, fill, stroke } => {
                if let Some(path) = to_rect(rect).and_then(PathBuilder::from_oval) {
                    canvas.paint(&path, FillRule::NonZero, fill.as_ref(), stroke.as_ref());
                }
            }
            DrawIntent::Path {
                path,
                fill_rule,
                fill,
                stroke,
            } => {
                if let Some(path) = build_path(path) {
                    canvas.paint(&path, *fill_rule, fill.as_ref(), stroke.as_ref());
                }
            }
            DrawIntent::Text(run) => {
                debug!(text = %run.text, x = run.origin.x, y = run.origin.y, "光栅后端不绘制文本");
            }
            DrawIntent::Bitmap(blit) => canvas.blit(&blit.bitmap, &blit.transform, blit.rop)?,
            DrawIntent::Pixel { at, color } => {
                if let Some(rect) = Rect::from_xywh(at.x.floor() as f32, at.y.floor() as f32, 1.0, 1.0)
                {
                    let mut paint = Paint::default();
                    paint.set_color(to_color(*color));
                    canvas
                        .pixmap
                        .fill_rect(rect, &paint, Transform::identity(), canvas.mask.as_ref());
                }
            }
            DrawIntent::Clip(region) => canvas.set_clip(region),
        }
        Ok(())
    }

    fn export(&self) -> Option<Bitmap> {
        let canvas = self.canvas.as_ref()?;
        let mut pixels = Vec::with_capacity(canvas.pixmap.data().len());
        for pixel in canvas.pixmap.pixels() {
            let color = pixel.demultiply();
            pixels.extend_from_slice(&[color.blue(), color.green(), color.red(), color.alpha()]);
        }
        Bitmap::new(canvas.pixmap.width(), canvas.pixmap.height(), pixels).ok()
    }
}

impl Canvas {
    fn paint(&mut self, path: &Path, rule: FillRule, fill: Option<&Fill>, stroke: Option<&Stroke>) {
        if let Some(fill) = fill {
            self.fill(path, rule, fill);
        }
        if let Some(stroke) = stroke {
            self.stroke(path, stroke);
        }
    }

    fn fill(&mut self, path: &Path, rule: FillRule, fill: &Fill) {
        let rule = to_fill_rule(rule);
        let identity = Transform::identity();
        match fill {
            Fill::Solid(color) => {
                let mut paint = Paint::default();
                paint.set_color(to_color(*color));
                self.pixmap
                    .fill_path(path, &paint, rule, identity, self.mask.as_ref());
            }
            Fill::Hatch {
                style,
                color,
                background,
            } => {
                if let Some(background) = background {
                    let mut paint = Paint::default();
                    paint.set_color(to_color(*background));
                    self.pixmap
                        .fill_path(path, &paint, rule, identity, self.mask.as_ref());
                }
                let Some(tile) = hatch_tile(*style, *color) else {
                    return;
                };
                let paint = Paint {
                    shader: tile_shader(&tile),
                    ..Paint::default()
                };
                self.pixmap
                    .fill_path(path, &paint, rule, identity, self.mask.as_ref());
            }
            Fill::Pattern(bitmap) => {
                let Some(tile) = to_pixmap(bitmap) else {
                    debug!("图案位图无法转换，跳过填充");
                    return;
                };
                let paint = Paint {
                    shader: tile_shader(&tile),
                    ..Paint::default()
                };
                self.pixmap
                    .fill_path(path, &paint, rule, identity, self.mask.as_ref());
            }
        }
    }

    fn stroke(&mut self, path: &Path, stroke: &Stroke) {
        let mut paint = Paint::default();
        paint.set_color(to_color(stroke.color));
        let style = tiny_skia::Stroke {
            width: stroke.width.max(0.0) as f32,
            miter_limit: stroke.miter_limit.max(1.0) as f32,
            line_cap: match stroke.cap {
                LineCap::Flat => tiny_skia::LineCap::Butt,
                LineCap::Round => tiny_skia::LineCap::Round,
                LineCap::Square => tiny_skia::LineCap::Square,
            },
            line_join: match stroke.join {
                LineJoin::Miter => tiny_skia::LineJoin::Miter,
                LineJoin::Round => tiny_skia::LineJoin::Round,
                LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
            },
            dash: dash_pattern(&stroke.dash),
        };
        self.pixmap.stroke_path(
            path,
            &paint,
            &style,
            Transform::identity(),
            self.mask.as_ref(),
        );
    }

    fn blit(&mut self, bitmap: &Bitmap, transform: &DAffine2, raster: u32) -> Result<(), SurfaceError> {
        let source = to_pixmap(bitmap)
            .ok_or_else(|| SurfaceError::Backend("bitmap cannot be converted".to_string()))?;
        let blend_mode = match raster {
            rop::SRCCOPY => BlendMode::SourceOver,
            rop::SRCAND => BlendMode::Multiply,
            rop::SRCPAINT => BlendMode::Screen,
            rop::SRCINVERT => BlendMode::Difference,
            other => {
                debug!(rop = other, "光栅操作按 SRCCOPY 近似");
                BlendMode::SourceOver
            }
        };
        let paint = PixmapPaint {
            opacity: 1.0,
            blend_mode,
            quality: FilterQuality::Nearest,
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            to_transform(transform),
            self.mask.as_ref(),
        );
        Ok(())
    }

    /// 按层重建覆盖率掩码，各层之间求交。
    fn set_clip(&mut self, region: &ClipRegion) {
        if region.is_unclipped() {
            self.mask = None;
            return;
        }
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let Some(mut combined) = full_mask(width, height) else {
            return;
        };
        for layer in region.layers() {
            let Some(layer_mask) = layer_mask(layer, width, height) else {
                continue;
            };
            for (out, value) in combined.data_mut().iter_mut().zip(layer_mask.data()) {
                *out = multiply(*out, *value);
            }
        }
        self.mask = Some(combined);
    }
}

fn full_mask(width: u32, height: u32) -> Option<Mask> {
    let mut mask = Mask::new(width, height)?;
    mask.data_mut().fill(255);
    Some(mask)
}

fn layer_mask(layer: &ClipLayer, width: u32, height: u32) -> Option<Mask> {
    let mut coverage = full_mask(width, height)?;
    for op in &layer.ops {
        let shape = shape_mask(&op.shape, width, height)?;
        let target = coverage.data_mut();
        for (out, value) in target.iter_mut().zip(shape.data()) {
            *out = match op.mode {
                ClipMode::And => multiply(*out, *value),
                ClipMode::Or => (*out).max(*value),
                ClipMode::Xor => out.abs_diff(*value),
                ClipMode::Diff => multiply(*out, 255 - *value),
                ClipMode::Copy => *value,
            };
        }
    }
    Some(coverage)
}

fn shape_mask(shape: &ClipShape, width: u32, height: u32) -> Option<Mask> {
    let mut mask = Mask::new(width, height)?;
    match shape {
        ClipShape::Rects(rects) => {
            for rect in rects {
                if let Some(path) = rect_path(rect) {
                    mask.fill_path(&path, tiny_skia::FillRule::Winding, true, Transform::identity());
                }
            }
        }
        ClipShape::Path(path, rule) => {
            if let Some(path) = build_path(path) {
                mask.fill_path(&path, to_fill_rule(*rule), true, Transform::identity());
            }
        }
    }
    Some(mask)
}

#[inline]
fn multiply(a: u8, b: u8) -> u8 {
    ((a as u16 * b as u16 + 127) / 255) as u8
}

fn to_color(color: ColorRef) -> Color {
    Color::from_rgba8(color.red, color.green, color.blue, 255)
}

fn to_fill_rule(rule: FillRule) -> tiny_skia::FillRule {
    match rule {
        FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
        FillRule::NonZero => tiny_skia::FillRule::Winding,
    }
}

fn to_transform(transform: &DAffine2) -> Transform {
    let m = transform.matrix2;
    let t = transform.translation;
    Transform::from_row(
        m.x_axis.x as f32,
        m.x_axis.y as f32,
        m.y_axis.x as f32,
        m.y_axis.y as f32,
        t.x as f32,
        t.y as f32,
    )
}

fn to_rect(bounds: &Bounds2D) -> Option<Rect> {
    if bounds.is_empty() {
        return None;
    }
    let (min, max) = (bounds.min(), bounds.max());
    Rect::from_ltrb(min.x() as f32, min.y() as f32, max.x() as f32, max.y() as f32)
}

fn rect_path(bounds: &Bounds2D) -> Option<Path> {
    to_rect(bounds).map(PathBuilder::from_rect)
}

fn build_path(path: &DevicePath) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for segment in path.segments() {
        match *segment {
            PathSegment::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathSegment::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathSegment::CubicTo(a, b, c) => builder.cubic_to(
                a.x as f32, a.y as f32, b.x as f32, b.y as f32, c.x as f32, c.y as f32,
            ),
            PathSegment::Close => builder.close(),
        }
    }
    builder.finish()
}

/// 奇数个元素的虚线数组重复一次，与 SVG 的约定一致。
fn dash_pattern(dash: &[f64]) -> Option<tiny_skia::StrokeDash> {
    if dash.is_empty() || dash.iter().any(|len| !len.is_finite() || *len < 0.0) {
        return None;
    }
    let mut array: Vec<f32> = dash.iter().map(|len| *len as f32).collect();
    if array.len() % 2 == 1 {
        array.extend_from_within(..);
    }
    tiny_skia::StrokeDash::new(array, 0.0)
}

/// BGRA（非预乘）转为 tiny-skia 的预乘 RGBA。
fn to_pixmap(bitmap: &Bitmap) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(bitmap.width(), bitmap.height())?;
    for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(bitmap.pixels().chunks_exact(4)) {
        let alpha = src[3];
        dst[0] = multiply(src[2], alpha);
        dst[1] = multiply(src[1], alpha);
        dst[2] = multiply(src[0], alpha);
        dst[3] = alpha;
    }
    Some(pixmap)
}

fn tile_shader(tile: &Pixmap) -> Shader<'_> {
    Pattern::new(
        tile.as_ref(),
        SpreadMode::Repeat,
        FilterQuality::Nearest,
        1.0,
        Transform::identity(),
    )
}

/// 8x8 阴影线图块，背景透明。
fn hatch_tile(style: HatchStyle, color: ColorRef) -> Option<Pixmap> {
    let mut tile = Pixmap::new(HATCH_TILE, HATCH_TILE)?;
    let last = HATCH_TILE - 1;
    for y in 0..HATCH_TILE {
        for x in 0..HATCH_TILE {
            let horizontal = y == last / 2;
            let vertical = x == last / 2;
            let forward = x == y;
            let backward = x + y == last;
            let on = match style {
                HatchStyle::Horizontal => horizontal,
                HatchStyle::Vertical => vertical,
                HatchStyle::ForwardDiagonal => forward,
                HatchStyle::BackwardDiagonal => backward,
                HatchStyle::Cross => horizontal || vertical,
                HatchStyle::DiagonalCross => forward || backward,
            };
            if on {
                let offset = ((y * HATCH_TILE + x) * 4) as usize;
                tile.data_mut()[offset..offset + 4]
                    .copy_from_slice(&[color.red, color.green, color.blue, 255]);
            }
        }
    }
    Some(tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emf_core::geometry::Point2;
    use emf_engine::{ClipOp, Stroke as IntentStroke};

    fn bounds(l: f64, t: f64, r: f64, b: f64) -> Bounds2D {
        Bounds2D::new(Point2::new(l, t), Point2::new(r, b))
    }

    fn started(width: u32, height: u32, background: Background) -> RasterSurface {
        let mut surface = RasterSurface::new();
        surface.begin(width, height, background).expect("begin");
        surface
    }

    fn pixel(bitmap: &Bitmap, x: u32, y: u32) -> [u8; 4] {
        bitmap.pixel(x, y).expect("pixel in range")
    }

    #[test]
    fn drawing_before_begin_fails() {
        let mut surface = RasterSurface::new();
        let result = surface.draw(&DrawIntent::Pixel {
            at: glam::DVec2::ZERO,
            color: ColorRef::BLACK,
        });
        assert!(matches!(result, Err(SurfaceError::NotStarted)));
        assert!(surface.export().is_none());
    }

    #[test]
    fn solid_rectangle_fills_pixels() {
        let mut surface = started(20, 20, Background::White);
        surface
            .draw(&DrawIntent::Rectangle {
                rect: bounds(5.0, 5.0, 15.0, 15.0),
                fill: Some(Fill::Solid(ColorRef::rgb(255, 0, 0))),
                stroke: None,
            })
            .expect("draw");
        let image = surface.export().expect("export");
        assert_eq!(pixel(&image, 10, 10), [0, 0, 255, 255]);
        assert_eq!(pixel(&image, 1, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn transparent_background_starts_clear() {
        let surface = started(4, 4, Background::Transparent);
        let image = surface.export().expect("export");
        assert_eq!(pixel(&image, 0, 0)[3], 0);
    }

    #[test]
    fn clip_restricts_fill_and_reset_restores() {
        let mut surface = started(20, 20, Background::White);
        let clip = ClipRegion {
            meta: Vec::new(),
            current: ClipLayer {
                ops: vec![ClipOp {
                    mode: ClipMode::And,
                    shape: ClipShape::Rects(vec![bounds(0.0, 0.0, 10.0, 20.0)]),
                }],
            },
        };
        let black = DrawIntent::Rectangle {
            rect: bounds(0.0, 0.0, 20.0, 20.0),
            fill: Some(Fill::Solid(ColorRef::BLACK)),
            stroke: None,
        };
        surface.draw(&DrawIntent::Clip(clip)).expect("clip");
        surface.draw(&black).expect("draw");
        let image = surface.export().expect("export");
        assert_eq!(pixel(&image, 5, 10), [0, 0, 0, 255]);
        assert_eq!(pixel(&image, 15, 10), [255, 255, 255, 255]);

        surface.draw(&DrawIntent::Clip(ClipRegion::default())).expect("reset");
        surface.draw(&black).expect("draw");
        let image = surface.export().expect("export");
        assert_eq!(pixel(&image, 15, 10), [0, 0, 0, 255]);
    }

    #[test]
    fn excluded_rectangle_is_left_untouched() {
        let mut surface = started(20, 20, Background::White);
        let clip = ClipRegion {
            meta: Vec::new(),
            current: ClipLayer {
                ops: vec![ClipOp {
                    mode: ClipMode::Diff,
                    shape: ClipShape::Rects(vec![bounds(5.0, 5.0, 15.0, 15.0)]),
                }],
            },
        };
        surface.draw(&DrawIntent::Clip(clip)).expect("clip");
        surface
            .draw(&DrawIntent::Rectangle {
                rect: bounds(0.0, 0.0, 20.0, 20.0),
                fill: Some(Fill::Solid(ColorRef::BLACK)),
                stroke: None,
            })
            .expect("draw");
        let image = surface.export().expect("export");
        assert_eq!(pixel(&image, 10, 10), [255, 255, 255, 255]);
        assert_eq!(pixel(&image, 2, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn bitmap_blit_follows_affine() {
        let mut surface = started(10, 10, Background::White);
        let bitmap = Bitmap::filled(2, 2, [0, 255, 0, 255]);
        surface
            .draw(&DrawIntent::Bitmap(emf_engine::BitmapBlit {
                bitmap: std::sync::Arc::new(bitmap),
                transform: DAffine2::from_scale_angle_translation(
                    glam::DVec2::splat(2.0),
                    0.0,
                    glam::DVec2::new(4.0, 4.0),
                ),
                bounds: bounds(4.0, 4.0, 8.0, 8.0),
                rop: rop::SRCCOPY,
            }))
            .expect("blit");
        let image = surface.export().expect("export");
        assert_eq!(pixel(&image, 6, 6), [0, 255, 0, 255]);
        assert_eq!(pixel(&image, 2, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn dashed_stroke_leaves_gaps() {
        let mut surface = started(40, 5, Background::White);
        let mut path = DevicePath::new();
        path.move_to(glam::DVec2::new(0.0, 2.5));
        path.line_to(glam::DVec2::new(40.0, 2.5));
        let stroke = IntentStroke {
            dash: vec![10.0, 10.0],
            cap: LineCap::Flat,
            ..IntentStroke::solid(ColorRef::BLACK, 3.0)
        };
        surface
            .draw(&DrawIntent::Path {
                path,
                fill_rule: FillRule::NonZero,
                fill: None,
                stroke: Some(stroke),
            })
            .expect("draw");
        let image = surface.export().expect("export");
        assert_eq!(pixel(&image, 5, 2), [0, 0, 0, 255]);
        assert_eq!(pixel(&image, 15, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn hatch_tile_marks_expected_cells() {
        let tile = hatch_tile(HatchStyle::Cross, ColorRef::rgb(0, 0, 255)).expect("tile");
        let at = |x: u32, y: u32| tile.pixel(x, y).expect("pixel").alpha();
        assert_eq!(at(3, 0), 255);
        assert_eq!(at(0, 3), 255);
        assert_eq!(at(0, 0), 0);
    }

    #[test]
    fn odd_dash_arrays_are_doubled() {
        assert!(dash_pattern(&[4.0, 2.0, 1.0]).is_some());
        assert!(dash_pattern(&[]).is_none());
    }
}
