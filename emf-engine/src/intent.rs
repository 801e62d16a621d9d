//! 设备上下文交给绘图后端的已解析绘制意图。坐标一律为设备像素。

use std::sync::Arc;

use emf_core::color::ColorRef;
use emf_core::geometry::{Bounds2D, Point2};
use emf_core::object::{HatchStyle, LineCap, LineJoin};
use glam::{DAffine2, DVec2};

use crate::errors::EngineError;

/// 自上而下存放、每像素 4 字节 BGRA 的位图。
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, EngineError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(EngineError::InvalidBitmap(format!(
                "{width}x{height} bitmap needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let pixels = bgra.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 4;
        let mut bgra = [0u8; 4];
        bgra.copy_from_slice(&self.pixels[at..at + 4]);
        Some(bgra)
    }

    /// 截取子区域；越界部分被裁掉，完全落在外面时返回 `None`。
    pub fn crop(&self, x: i64, y: i64, width: i64, height: i64) -> Option<Bitmap> {
        let left = x.max(0);
        let top = y.max(0);
        let right = (x + width).min(self.width as i64);
        let bottom = (y + height).min(self.height as i64);
        if right <= left || bottom <= top {
            return None;
        }
        if left == 0 && top == 0 && right == self.width as i64 && bottom == self.height as i64 {
            return Some(self.clone());
        }
        let row_bytes = (right - left) as usize * 4;
        let mut pixels = Vec::with_capacity(row_bytes * (bottom - top) as usize);
        for row in top..bottom {
            let start = (row as usize * self.width as usize + left as usize) * 4;
            pixels.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }
        Some(Bitmap {
            width: (right - left) as u32,
            height: (bottom - top) as u32,
            pixels,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    /// ALTERNATE
    EvenOdd,
    /// WINDING
    NonZero,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(ColorRef),
    /// 背景色只在 OPAQUE 背景模式下给出。
    Hatch {
        style: HatchStyle,
        color: ColorRef,
        background: Option<ColorRef>,
    },
    Pattern(Arc<Bitmap>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: ColorRef,
    /// 设备像素宽度。
    pub width: f64,
    /// 交替的实线/间隔长度，空表示实线。
    pub dash: Vec<f64>,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f64,
}

impl Stroke {
    pub fn solid(color: ColorRef, width: f64) -> Self {
        Self {
            color,
            width,
            dash: Vec::new(),
            cap: LineCap::Round,
            join: LineJoin::Round,
            miter_limit: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(DVec2),
    LineTo(DVec2),
    CubicTo(DVec2, DVec2, DVec2),
    Close,
}

/// 设备空间路径。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DevicePath {
    segments: Vec<PathSegment>,
}

impl DevicePath {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn move_to(&mut self, point: DVec2) {
        self.segments.push(PathSegment::MoveTo(point));
    }

    /// 当前没有打开的图形时先以 `start` 开始一个新图形。
    pub fn ensure_figure(&mut self, start: DVec2) {
        if matches!(self.segments.last(), None | Some(PathSegment::Close)) {
            self.move_to(start);
        }
    }

    pub fn line_to(&mut self, point: DVec2) {
        self.segments.push(PathSegment::LineTo(point));
    }

    pub fn cubic_to(&mut self, c1: DVec2, c2: DVec2, end: DVec2) {
        self.segments.push(PathSegment::CubicTo(c1, c2, end));
    }

    pub fn close(&mut self) {
        if !matches!(self.segments.last(), None | Some(PathSegment::Close)) {
            self.segments.push(PathSegment::Close);
        }
    }

    pub fn append(&mut self, other: DevicePath) {
        self.segments.extend(other.segments);
    }

    /// 接续当前图形：`other` 开头的 MoveTo 只在没有打开的图形时生效。
    pub fn connect(&mut self, other: DevicePath) {
        let mut segments = other.segments.into_iter().peekable();
        if let Some(&PathSegment::MoveTo(start)) = segments.peek() {
            self.ensure_figure(start);
            segments.next();
        }
        self.segments.extend(segments);
    }

    /// 路径的最后一个落点。
    pub fn last_point(&self) -> Option<DVec2> {
        self.segments.iter().rev().find_map(|segment| match *segment {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) | PathSegment::CubicTo(_, _, p) => {
                Some(p)
            }
            PathSegment::Close => None,
        })
    }

    pub fn transformed(&self, transform: &DAffine2) -> DevicePath {
        let map = |p: DVec2| transform.transform_point2(p);
        DevicePath {
            segments: self
                .segments
                .iter()
                .map(|segment| match *segment {
                    PathSegment::MoveTo(p) => PathSegment::MoveTo(map(p)),
                    PathSegment::LineTo(p) => PathSegment::LineTo(map(p)),
                    PathSegment::CubicTo(a, b, c) => PathSegment::CubicTo(map(a), map(b), map(c)),
                    PathSegment::Close => PathSegment::Close,
                })
                .collect(),
        }
    }

    /// 控制点包围盒。
    pub fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        let mut include = |p: DVec2| bounds.include_point(Point2::from_vec(p));
        for segment in &self.segments {
            match *segment {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => include(p),
                PathSegment::CubicTo(a, b, c) => {
                    include(a);
                    include(b);
                    include(c);
                }
                PathSegment::Close => {}
            }
        }
        bounds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Baseline,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    /// 设备像素字号。
    pub size: f64,
    pub weight: i32,
    pub italic: bool,
    pub underline: bool,
    pub strike_out: bool,
    /// 屏幕上逆时针旋转的角度（度）。
    pub rotation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub origin: DVec2,
    pub text: String,
    /// 每个字符的设备步进；为空时由后端自行排版。
    pub advances: Vec<f64>,
    pub font: FontSpec,
    pub color: ColorRef,
    pub background: Option<ColorRef>,
    pub align: (HorizontalAlign, VerticalAlign),
    pub clip: Option<Bounds2D>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitmapBlit {
    pub bitmap: Arc<Bitmap>,
    /// 位图像素坐标到设备坐标的仿射映射。
    pub transform: DAffine2,
    pub bounds: Bounds2D,
    pub rop: u32,
}

/// 区域组合方式，取值与 RGN_* 一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMode {
    And,
    Or,
    Xor,
    Diff,
    Copy,
}

impl ClipMode {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(ClipMode::And),
            2 => Some(ClipMode::Or),
            3 => Some(ClipMode::Xor),
            4 => Some(ClipMode::Diff),
            5 => Some(ClipMode::Copy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClipShape {
    Rects(Vec<Bounds2D>),
    Path(DevicePath, FillRule),
}

impl ClipShape {
    pub fn translated(&self, offset: DVec2) -> ClipShape {
        match self {
            ClipShape::Rects(rects) => {
                ClipShape::Rects(rects.iter().map(|rect| rect.translate(offset)).collect())
            }
            ClipShape::Path(path, rule) => ClipShape::Path(
                path.transformed(&DAffine2::from_translation(offset)),
                *rule,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipOp {
    pub mode: ClipMode,
    pub shape: ClipShape,
}

/// 一层裁剪：从整张画布出发依次应用各操作。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipLayer {
    pub ops: Vec<ClipOp>,
}

impl ClipLayer {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// 有效裁剪区域：各元区域层与当前裁剪层的交集。全部为空表示不裁剪。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipRegion {
    pub meta: Vec<ClipLayer>,
    pub current: ClipLayer,
}

impl ClipRegion {
    pub fn is_unclipped(&self) -> bool {
        self.current.is_empty() && self.meta.iter().all(ClipLayer::is_empty)
    }

    /// 按求交顺序列出全部非空层。
    pub fn layers(&self) -> impl Iterator<Item = &ClipLayer> + '_ {
        self.meta
            .iter()
            .chain(std::iter::once(&self.current))
            .filter(|layer| !layer.is_empty())
    }

    pub(crate) fn combine(&mut self, op: ClipOp) {
        if op.mode == ClipMode::Copy {
            self.current.ops.clear();
        }
        self.current.ops.push(op);
    }

    pub(crate) fn reset(&mut self) {
        self.current.ops.clear();
    }

    pub(crate) fn offset(&mut self, delta: DVec2) {
        for op in &mut self.current.ops {
            op.shape = op.shape.translated(delta);
        }
    }

    pub(crate) fn fold_into_meta(&mut self) {
        if !self.current.is_empty() {
            self.meta.push(std::mem::take(&mut self.current));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawIntent {
    Rectangle {
        rect: Bounds2D,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    Ellipse {
        rect: Bounds2D,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    Path {
        path: DevicePath,
        fill_rule: FillRule,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    Text(TextRun),
    Bitmap(BitmapBlit),
    Pixel {
        at: DVec2,
        color: ColorRef,
    },
    Clip(ClipRegion),
}

impl DrawIntent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DrawIntent::Rectangle { .. } => "rectangle",
            DrawIntent::Ellipse { .. } => "ellipse",
            DrawIntent::Path { .. } => "path",
            DrawIntent::Text(_) => "text",
            DrawIntent::Bitmap(_) => "bitmap",
            DrawIntent::Pixel { .. } => "pixel",
            DrawIntent::Clip(_) => "clip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_crop_clamps_to_image() {
        let mut pixels = Vec::new();
        for value in 0u8..6 {
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
        let bitmap = Bitmap::new(3, 2, pixels).expect("bitmap");
        let cropped = bitmap.crop(1, 0, 5, 1).expect("inside");
        assert_eq!((cropped.width(), cropped.height()), (2, 1));
        assert_eq!(cropped.pixel(0, 0), Some([1, 1, 1, 255]));
        assert!(bitmap.crop(3, 0, 2, 2).is_none());
        assert!(Bitmap::new(2, 2, vec![0; 3]).is_err());
    }

    #[test]
    fn figures_restart_after_close() {
        let mut path = DevicePath::new();
        path.ensure_figure(DVec2::ZERO);
        path.line_to(DVec2::new(4.0, 0.0));
        path.ensure_figure(DVec2::new(9.0, 9.0));
        path.close();
        path.close();
        path.ensure_figure(DVec2::new(1.0, 1.0));
        assert_eq!(
            path.segments(),
            &[
                PathSegment::MoveTo(DVec2::ZERO),
                PathSegment::LineTo(DVec2::new(4.0, 0.0)),
                PathSegment::Close,
                PathSegment::MoveTo(DVec2::new(1.0, 1.0)),
            ]
        );
        assert_eq!(path.last_point(), Some(DVec2::new(1.0, 1.0)));
    }

    #[test]
    fn copy_replaces_current_clip_only() {
        let rect = |x: f64| {
            ClipShape::Rects(vec![Bounds2D::new(
                Point2::new(x, x),
                Point2::new(x + 1.0, x + 1.0),
            )])
        };
        let mut region = ClipRegion::default();
        region.combine(ClipOp {
            mode: ClipMode::And,
            shape: rect(0.0),
        });
        region.fold_into_meta();
        region.combine(ClipOp {
            mode: ClipMode::Diff,
            shape: rect(1.0),
        });
        region.combine(ClipOp {
            mode: ClipMode::Copy,
            shape: rect(2.0),
        });
        assert_eq!(region.meta.len(), 1);
        assert_eq!(region.current.ops.len(), 1);
        assert_eq!(region.layers().count(), 2);
        region.reset();
        assert!(!region.is_unclipped());
    }
}
