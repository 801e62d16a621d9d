pub mod bitmap;
pub mod record;

pub mod geometry {
    use glam::{DAffine2, DMat2, DVec2};
    use serde::{Deserialize, Serialize};

    /// 线格式中的 32 位有符号点（POINTL）。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PointL {
        pub x: i32,
        pub y: i32,
    }

    impl PointL {
        #[inline]
        pub const fn new(x: i32, y: i32) -> Self {
            Self { x, y }
        }

        #[inline]
        pub fn as_dvec2(self) -> DVec2 {
            DVec2::new(self.x as f64, self.y as f64)
        }
    }

    /// 16 位点（POINTS），解码时会拓宽为 [`PointL`]。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct PointS {
        pub x: i16,
        pub y: i16,
    }

    impl From<PointS> for PointL {
        #[inline]
        fn from(value: PointS) -> Self {
            PointL::new(value.x as i32, value.y as i32)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct SizeL {
        pub cx: i32,
        pub cy: i32,
    }

    impl SizeL {
        #[inline]
        pub const fn new(cx: i32, cy: i32) -> Self {
            Self { cx, cy }
        }
    }

    /// 包含边界的整数矩形（RECTL）。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct RectL {
        pub left: i32,
        pub top: i32,
        pub right: i32,
        pub bottom: i32,
    }

    impl RectL {
        #[inline]
        pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
            Self {
                left,
                top,
                right,
                bottom,
            }
        }

        /// 按 64 位计算，任意两个 32 位坐标之差都不会溢出。
        #[inline]
        pub fn width(&self) -> i64 {
            self.right as i64 - self.left as i64
        }

        #[inline]
        pub fn height(&self) -> i64 {
            self.bottom as i64 - self.top as i64
        }

        /// 左右、上下颠倒时交换，得到规范化矩形。
        pub fn normalized(&self) -> Self {
            Self {
                left: self.left.min(self.right),
                top: self.top.min(self.bottom),
                right: self.left.max(self.right),
                bottom: self.top.max(self.bottom),
            }
        }

        #[inline]
        pub fn center(&self) -> DVec2 {
            DVec2::new(
                (self.left as f64 + self.right as f64) * 0.5,
                (self.top as f64 + self.bottom as f64) * 0.5,
            )
        }

        /// 按左上、右上、右下、左下顺序返回四个角点。
        pub fn corners(&self) -> [PointL; 4] {
            [
                PointL::new(self.left, self.top),
                PointL::new(self.right, self.top),
                PointL::new(self.right, self.bottom),
                PointL::new(self.left, self.bottom),
            ]
        }
    }

    /// 二维仿射变换（XFORM），`x' = x*m11 + y*m21 + dx`，`y' = x*m12 + y*m22 + dy`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct XForm {
        pub m11: f32,
        pub m12: f32,
        pub m21: f32,
        pub m22: f32,
        pub dx: f32,
        pub dy: f32,
    }

    impl XForm {
        pub const IDENTITY: XForm = XForm {
            m11: 1.0,
            m12: 0.0,
            m21: 0.0,
            m22: 1.0,
            dx: 0.0,
            dy: 0.0,
        };

        pub fn to_affine(&self) -> DAffine2 {
            DAffine2::from_mat2_translation(
                DMat2::from_cols(
                    DVec2::new(self.m11 as f64, self.m12 as f64),
                    DVec2::new(self.m21 as f64, self.m22 as f64),
                ),
                DVec2::new(self.dx as f64, self.dy as f64),
            )
        }

        pub fn from_affine(affine: &DAffine2) -> Self {
            Self {
                m11: affine.matrix2.x_axis.x as f32,
                m12: affine.matrix2.x_axis.y as f32,
                m21: affine.matrix2.y_axis.x as f32,
                m22: affine.matrix2.y_axis.y as f32,
                dx: affine.translation.x as f32,
                dy: affine.translation.y as f32,
            }
        }
    }

    impl Default for XForm {
        fn default() -> Self {
            Self::IDENTITY
        }
    }

    /// 设备空间中的浮点坐标。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Point2(DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(&self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(&self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(&self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn translate(&self, offset: DVec2) -> Self {
            Self(self.0 + offset)
        }
    }

    /// 设备空间的轴对齐范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Default for Bounds2D {
        fn default() -> Self {
            Self::empty()
        }
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            let mut bounds = Self::empty();
            bounds.include_point(min);
            bounds.include_point(max);
            bounds
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        pub fn from_points(points: impl IntoIterator<Item = Point2>) -> Self {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(point);
            }
            bounds
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        pub fn translate(&self, offset: DVec2) -> Self {
            if self.is_empty() {
                return *self;
            }
            Self {
                min: self.min.translate(offset),
                max: self.max.translate(offset),
            }
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn xform_maps_points_like_gdi() {
            let xform = XForm {
                m11: 2.0,
                m12: 0.5,
                m21: -1.0,
                m22: 3.0,
                dx: 10.0,
                dy: 20.0,
            };
            let mapped = xform.to_affine().transform_point2(DVec2::new(1.0, 2.0));
            assert!((mapped.x - (1.0 * 2.0 + 2.0 * -1.0 + 10.0)).abs() < 1e-9);
            assert!((mapped.y - (1.0 * 0.5 + 2.0 * 3.0 + 20.0)).abs() < 1e-9);
            assert_eq!(XForm::from_affine(&xform.to_affine()), xform);
        }

        #[test]
        fn bounds_grow_with_points() {
            let mut bounds = Bounds2D::empty();
            assert!(bounds.is_empty());
            bounds.include_point(Point2::new(4.0, -1.0));
            bounds.include_point(Point2::new(-2.0, 3.0));
            assert_eq!(bounds.min(), Point2::new(-2.0, -1.0));
            assert_eq!(bounds.max(), Point2::new(4.0, 3.0));
            assert!((bounds.width() - 6.0).abs() < 1e-9);
            assert_eq!(bounds.center(), Point2::new(1.0, 1.0));
        }

        #[test]
        fn rect_normalization_swaps_edges() {
            let rect = RectL::new(50, 40, 10, 5).normalized();
            assert_eq!(rect, RectL::new(10, 5, 50, 40));
            assert_eq!(rect.width(), 40);
            assert_eq!(rect.height(), 35);
        }

        #[test]
        fn full_range_rect_extent_does_not_wrap() {
            let rect = RectL::new(i32::MIN, 0, i32::MAX, 10);
            assert_eq!(rect.width(), u32::MAX as i64);
            assert_eq!(RectL::new(i32::MAX, 0, i32::MIN, 0).width(), -(u32::MAX as i64));
        }
    }
}

pub mod color {
    use serde::{Deserialize, Serialize};

    /// COLORREF：按 red、green、blue、reserved 顺序存放的四个字节。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ColorRef {
        pub red: u8,
        pub green: u8,
        pub blue: u8,
        pub reserved: u8,
    }

    impl ColorRef {
        pub const BLACK: ColorRef = ColorRef::rgb(0, 0, 0);
        pub const WHITE: ColorRef = ColorRef::rgb(0xFF, 0xFF, 0xFF);

        #[inline]
        pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
            Self {
                red,
                green,
                blue,
                reserved: 0,
            }
        }

        #[inline]
        pub const fn from_u32(raw: u32) -> Self {
            Self {
                red: (raw & 0xFF) as u8,
                green: ((raw >> 8) & 0xFF) as u8,
                blue: ((raw >> 16) & 0xFF) as u8,
                reserved: (raw >> 24) as u8,
            }
        }

        #[inline]
        pub const fn to_u32(self) -> u32 {
            (self.red as u32)
                | ((self.green as u32) << 8)
                | ((self.blue as u32) << 16)
                | ((self.reserved as u32) << 24)
        }

        /// 去掉保留字节后的纯 RGB 值。
        #[inline]
        pub const fn opaque(self) -> Self {
            Self::rgb(self.red, self.green, self.blue)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn colorref_byte_order_is_red_first() {
            let color = ColorRef::from_u32(0x00C0_8040);
            assert_eq!((color.red, color.green, color.blue), (0x40, 0x80, 0xC0));
            assert_eq!(color.to_u32(), 0x00C0_8040);
        }
    }
}

pub mod object {
    use std::collections::HashMap;
    use std::sync::Arc;

    use once_cell::sync::Lazy;
    use serde::{Deserialize, Serialize};

    use crate::bitmap::Dib;
    use crate::color::ColorRef;

    pub mod pen_style {
        pub const SOLID: u32 = 0;
        pub const DASH: u32 = 1;
        pub const DOT: u32 = 2;
        pub const DASHDOT: u32 = 3;
        pub const DASHDOTDOT: u32 = 4;
        pub const NULL: u32 = 5;
        pub const INSIDEFRAME: u32 = 6;
        pub const USERSTYLE: u32 = 7;
        pub const ALTERNATE: u32 = 8;
        pub const STYLE_MASK: u32 = 0x0000_000F;

        pub const ENDCAP_ROUND: u32 = 0x0000_0000;
        pub const ENDCAP_SQUARE: u32 = 0x0000_0100;
        pub const ENDCAP_FLAT: u32 = 0x0000_0200;
        pub const ENDCAP_MASK: u32 = 0x0000_0F00;

        pub const JOIN_ROUND: u32 = 0x0000_0000;
        pub const JOIN_BEVEL: u32 = 0x0000_1000;
        pub const JOIN_MITER: u32 = 0x0000_2000;
        pub const JOIN_MASK: u32 = 0x0000_F000;

        pub const COSMETIC: u32 = 0x0000_0000;
        pub const GEOMETRIC: u32 = 0x0001_0000;
        pub const TYPE_MASK: u32 = 0x000F_0000;
    }

    pub mod brush_style {
        pub const SOLID: u32 = 0;
        pub const NULL: u32 = 1;
        pub const HATCHED: u32 = 2;
        pub const PATTERN: u32 = 3;
        pub const INDEXED: u32 = 4;
        pub const DIBPATTERN: u32 = 5;
        pub const DIBPATTERNPT: u32 = 6;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum LineStyle {
        Solid,
        Dash,
        Dot,
        DashDot,
        DashDotDot,
        Null,
        InsideFrame,
        UserStyle,
        Alternate,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum LineCap {
        Round,
        Square,
        Flat,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum LineJoin {
        Round,
        Bevel,
        Miter,
    }

    /// 画笔。`CreatePen` 与 `ExtCreatePen` 都归一到这一结构。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Pen {
        pub style: u32,
        pub width: u32,
        pub color: ColorRef,
        pub brush_style: u32,
        pub hatch: u32,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub style_entries: Vec<u32>,
    }

    impl Pen {
        pub fn cosmetic(color: ColorRef) -> Self {
            Self {
                style: pen_style::COSMETIC | pen_style::SOLID,
                width: 1,
                color,
                brush_style: brush_style::SOLID,
                hatch: 0,
                style_entries: Vec::new(),
            }
        }

        pub fn null() -> Self {
            Self {
                style: pen_style::NULL,
                width: 0,
                color: ColorRef::BLACK,
                brush_style: brush_style::NULL,
                hatch: 0,
                style_entries: Vec::new(),
            }
        }

        pub fn line_style(&self) -> LineStyle {
            match self.style & pen_style::STYLE_MASK {
                pen_style::DASH => LineStyle::Dash,
                pen_style::DOT => LineStyle::Dot,
                pen_style::DASHDOT => LineStyle::DashDot,
                pen_style::DASHDOTDOT => LineStyle::DashDotDot,
                pen_style::NULL => LineStyle::Null,
                pen_style::INSIDEFRAME => LineStyle::InsideFrame,
                pen_style::USERSTYLE => LineStyle::UserStyle,
                pen_style::ALTERNATE => LineStyle::Alternate,
                _ => LineStyle::Solid,
            }
        }

        #[inline]
        pub fn is_null(&self) -> bool {
            self.line_style() == LineStyle::Null
        }

        #[inline]
        pub fn is_geometric(&self) -> bool {
            self.style & pen_style::TYPE_MASK == pen_style::GEOMETRIC
        }

        pub fn end_cap(&self) -> LineCap {
            match self.style & pen_style::ENDCAP_MASK {
                pen_style::ENDCAP_SQUARE => LineCap::Square,
                pen_style::ENDCAP_FLAT => LineCap::Flat,
                _ => LineCap::Round,
            }
        }

        pub fn join(&self) -> LineJoin {
            match self.style & pen_style::JOIN_MASK {
                pen_style::JOIN_BEVEL => LineJoin::Bevel,
                pen_style::JOIN_MITER => LineJoin::Miter,
                _ => LineJoin::Round,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum HatchStyle {
        Horizontal,
        Vertical,
        ForwardDiagonal,
        BackwardDiagonal,
        Cross,
        DiagonalCross,
    }

    impl HatchStyle {
        pub fn from_u32(raw: u32) -> Option<Self> {
            match raw {
                0 => Some(HatchStyle::Horizontal),
                1 => Some(HatchStyle::Vertical),
                2 => Some(HatchStyle::ForwardDiagonal),
                3 => Some(HatchStyle::BackwardDiagonal),
                4 => Some(HatchStyle::Cross),
                5 => Some(HatchStyle::DiagonalCross),
                _ => None,
            }
        }
    }

    /// 画刷。图案画刷保留原始 DIB，待选入填充时再归一化像素。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Brush {
        Solid(ColorRef),
        Null,
        Hatched { hatch: HatchStyle, color: ColorRef },
        Pattern { bitmap: Arc<Dib>, usage: u32 },
        /// 单色图案：0 位取文本色，1 位取背景色。
        Monochrome { bitmap: Arc<Dib> },
    }

    impl Brush {
        /// 由 LOGBRUSH 三元组构造；无法识别的样式退化为实色。
        pub fn from_log(style: u32, color: ColorRef, hatch: u32) -> Self {
            match style {
                brush_style::NULL => Brush::Null,
                brush_style::HATCHED => match HatchStyle::from_u32(hatch) {
                    Some(hatch) => Brush::Hatched { hatch, color },
                    None => Brush::Solid(color),
                },
                _ => Brush::Solid(color),
            }
        }

        #[inline]
        pub fn is_null(&self) -> bool {
            matches!(self, Brush::Null)
        }
    }

    /// 逻辑字体（LOGFONT 及其扩展名称字段）。
    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    pub struct Font {
        pub height: i32,
        pub width: i32,
        pub escapement: i32,
        pub orientation: i32,
        pub weight: i32,
        pub italic: bool,
        pub underline: bool,
        pub strike_out: bool,
        pub charset: u8,
        pub out_precision: u8,
        pub clip_precision: u8,
        pub quality: u8,
        pub pitch_and_family: u8,
        pub face_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub full_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub style: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub script: Option<String>,
    }

    impl Font {
        pub fn with_height(height: i32) -> Self {
            Self {
                height,
                weight: 400,
                ..Self::default()
            }
        }
    }

    /// 调色板条目：线格式顺序为 flags、blue、green、red。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct PaletteEntry {
        pub flags: u8,
        pub blue: u8,
        pub green: u8,
        pub red: u8,
    }

    impl PaletteEntry {
        #[inline]
        pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
            Self {
                flags: 0,
                blue,
                green,
                red,
            }
        }

        #[inline]
        pub fn color(&self) -> ColorRef {
            ColorRef::rgb(self.red, self.green, self.blue)
        }
    }

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    pub struct Palette {
        pub entries: Vec<PaletteEntry>,
    }

    /// 句柄表中可以存放的全部对象种类。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum GraphicsObject {
        Pen(Pen),
        Brush(Brush),
        Font(Font),
        Palette(Palette),
    }

    impl GraphicsObject {
        pub fn kind_name(&self) -> &'static str {
            match self {
                GraphicsObject::Pen(_) => "pen",
                GraphicsObject::Brush(_) => "brush",
                GraphicsObject::Font(_) => "font",
                GraphicsObject::Palette(_) => "palette",
            }
        }
    }

    pub mod stock {
        pub const WHITE_BRUSH: u32 = 0x8000_0000;
        pub const LTGRAY_BRUSH: u32 = 0x8000_0001;
        pub const GRAY_BRUSH: u32 = 0x8000_0002;
        pub const DKGRAY_BRUSH: u32 = 0x8000_0003;
        pub const BLACK_BRUSH: u32 = 0x8000_0004;
        pub const NULL_BRUSH: u32 = 0x8000_0005;
        pub const WHITE_PEN: u32 = 0x8000_0006;
        pub const BLACK_PEN: u32 = 0x8000_0007;
        pub const NULL_PEN: u32 = 0x8000_0008;
        pub const OEM_FIXED_FONT: u32 = 0x8000_000A;
        pub const ANSI_FIXED_FONT: u32 = 0x8000_000B;
        pub const ANSI_VAR_FONT: u32 = 0x8000_000C;
        pub const SYSTEM_FONT: u32 = 0x8000_000D;
        pub const DEVICE_DEFAULT_FONT: u32 = 0x8000_000E;
        pub const DEFAULT_PALETTE: u32 = 0x8000_000F;
        pub const SYSTEM_FIXED_FONT: u32 = 0x8000_0010;
        pub const DEFAULT_GUI_FONT: u32 = 0x8000_0011;
        pub const DC_BRUSH: u32 = 0x8000_0012;
        pub const DC_PEN: u32 = 0x8000_0013;

        #[inline]
        pub fn is_stock(handle: u32) -> bool {
            handle & 0x8000_0000 != 0
        }
    }

    const ANSI_CHARSET: u8 = 0;
    const OEM_CHARSET: u8 = 255;
    const FIXED_PITCH: u8 = 1;
    const VARIABLE_PITCH: u8 = 2;

    /// 20 个静态系统颜色。
    const DEFAULT_PALETTE_RGB: [(u8, u8, u8); 20] = [
        (0, 0, 0),
        (128, 0, 0),
        (0, 128, 0),
        (128, 128, 0),
        (0, 0, 128),
        (128, 0, 128),
        (0, 128, 128),
        (192, 192, 192),
        (192, 220, 192),
        (166, 202, 240),
        (255, 251, 240),
        (160, 160, 164),
        (128, 128, 128),
        (255, 0, 0),
        (0, 255, 0),
        (255, 255, 0),
        (0, 0, 255),
        (255, 0, 255),
        (0, 255, 255),
        (255, 255, 255),
    ];

    static STOCK_OBJECTS: Lazy<StockObjects> = Lazy::new(StockObjects::build);

    /// 进程级只读的库存对象表，构造一次后注入每次回放的句柄解析器。
    #[derive(Debug)]
    pub struct StockObjects {
        objects: HashMap<u32, GraphicsObject>,
    }

    impl StockObjects {
        #[inline]
        pub fn shared() -> &'static StockObjects {
            &STOCK_OBJECTS
        }

        #[inline]
        pub fn get(&self, handle: u32) -> Option<&GraphicsObject> {
            self.objects.get(&handle)
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.objects.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.objects.is_empty()
        }

        pub fn default_palette() -> Palette {
            Palette {
                entries: DEFAULT_PALETTE_RGB
                    .iter()
                    .map(|&(r, g, b)| PaletteEntry::rgb(r, g, b))
                    .collect(),
            }
        }

        fn build() -> Self {
            let solid = |raw: u32| GraphicsObject::Brush(Brush::Solid(ColorRef::from_u32(raw)));
            let font = |charset: u8, pitch: u8, height: i32| {
                GraphicsObject::Font(Font {
                    charset,
                    pitch_and_family: pitch,
                    ..Font::with_height(height)
                })
            };

            let mut objects = HashMap::new();
            objects.insert(stock::WHITE_BRUSH, solid(0x00FF_FFFF));
            objects.insert(stock::LTGRAY_BRUSH, solid(0x00C0_C0C0));
            objects.insert(stock::GRAY_BRUSH, solid(0x0080_8080));
            objects.insert(stock::DKGRAY_BRUSH, solid(0x0040_4040));
            objects.insert(stock::BLACK_BRUSH, solid(0x0000_0000));
            objects.insert(stock::NULL_BRUSH, GraphicsObject::Brush(Brush::Null));
            objects.insert(
                stock::WHITE_PEN,
                GraphicsObject::Pen(Pen::cosmetic(ColorRef::WHITE)),
            );
            objects.insert(
                stock::BLACK_PEN,
                GraphicsObject::Pen(Pen::cosmetic(ColorRef::BLACK)),
            );
            objects.insert(stock::NULL_PEN, GraphicsObject::Pen(Pen::null()));
            objects.insert(stock::OEM_FIXED_FONT, font(OEM_CHARSET, FIXED_PITCH, 0));
            objects.insert(stock::ANSI_FIXED_FONT, font(ANSI_CHARSET, FIXED_PITCH, 0));
            objects.insert(stock::ANSI_VAR_FONT, font(ANSI_CHARSET, VARIABLE_PITCH, 0));
            objects.insert(stock::SYSTEM_FONT, font(ANSI_CHARSET, 0, 11));
            objects.insert(stock::DEVICE_DEFAULT_FONT, font(ANSI_CHARSET, 0, 11));
            objects.insert(stock::SYSTEM_FIXED_FONT, font(ANSI_CHARSET, 0, 11));
            objects.insert(stock::DEFAULT_GUI_FONT, font(ANSI_CHARSET, 0, 11));
            objects.insert(
                stock::DEFAULT_PALETTE,
                GraphicsObject::Palette(Self::default_palette()),
            );
            objects.insert(stock::DC_BRUSH, solid(0x00FF_FFFF));
            objects.insert(
                stock::DC_PEN,
                GraphicsObject::Pen(Pen::cosmetic(ColorRef::BLACK)),
            );
            Self { objects }
        }
    }

}
