//! 设备上下文状态机：逐条应用记录、维护 GDI 状态，并产出已解析到设备像素的绘制意图。

use std::sync::Arc;

use emf_core::color::ColorRef;
use emf_core::geometry::{Bounds2D, Point2, PointL, RectL, SizeL, XForm};
use emf_core::object::{
    Brush, Font, GraphicsObject, LineStyle, Palette, PaletteEntry, Pen, StockObjects, stock,
};
use emf_core::record::{
    ArcBox, Blt, ExtTextOut, Header, MaskBlt, PatternBrush, PolyPoly, Record, Region,
    SetDiBitsToDevice, StretchDiBits, text_options,
};
use glam::{DAffine2, DVec2};
use tracing::{debug, trace, warn};

use crate::dib::{self, ColorSource};
use crate::errors::EngineError;
use crate::intent::{
    Bitmap, BitmapBlit, ClipMode, ClipOp, ClipRegion, ClipShape, DevicePath, DrawIntent, Fill,
    FillRule, FontSpec, HorizontalAlign, Stroke, TextRun, VerticalAlign,
};
use crate::mapping::{self, DeviceMetrics, Mapping};
use crate::objects::HandleTable;
use crate::path::{self, ArcDirection, EllipseArc};

pub mod rop {
    pub const SRCCOPY: u32 = 0x00CC_0020;
    pub const SRCPAINT: u32 = 0x00EE_0086;
    pub const SRCAND: u32 = 0x0088_00C6;
    pub const SRCINVERT: u32 = 0x0066_0046;
    pub const PATCOPY: u32 = 0x00F0_0021;
    pub const BLACKNESS: u32 = 0x0000_0042;
    pub const WHITENESS: u32 = 0x00FF_0062;

    /// 三元光栅操作码中“保留目标”的索引。
    pub const KEEP_DESTINATION: u32 = 0xAA;
}

pub mod bk_mode {
    pub const TRANSPARENT: u32 = 1;
    pub const OPAQUE: u32 = 2;
}

pub mod poly_fill_mode {
    pub const ALTERNATE: u32 = 1;
    pub const WINDING: u32 = 2;
}

pub mod text_align {
    pub const TA_UPDATECP: u32 = 0x0001;
    pub const TA_RIGHT: u32 = 0x0002;
    pub const TA_CENTER: u32 = 0x0006;
    pub const TA_BOTTOM: u32 = 0x0008;
    pub const TA_BASELINE: u32 = 0x0018;
    pub const HORIZONTAL_MASK: u32 = 0x0006;
    pub const VERTICAL_MASK: u32 = 0x0018;
}

mod world_mode {
    pub const MWT_IDENTITY: u32 = 1;
    pub const MWT_LEFTMULTIPLY: u32 = 2;
    pub const MWT_RIGHTMULTIPLY: u32 = 3;
    pub const MWT_SET: u32 = 4;
}

const R2_COPYPEN: u32 = 13;
const BLACKONWHITE: u32 = 1;
const DEFAULT_MITER_LIMIT: f64 = 10.0;
const DEFAULT_FONT_HEIGHT: f64 = 12.0;
const MAX_PALETTE_ENTRIES: u32 = 1 << 16;
const AXIS_EPSILON: f64 = 1e-12;

/// 固定虚线样式（设备像素，装饰画笔）。
const DASH: &[f64] = &[18.0, 6.0];
const DOT: &[f64] = &[3.0, 3.0];
const DASH_DOT: &[f64] = &[9.0, 6.0, 3.0, 6.0];
const DASH_DOT_DOT: &[f64] = &[9.0, 3.0, 3.0, 3.0, 3.0, 3.0];

/// SaveDC 保存、RestoreDC 恢复的全部可变状态。
#[derive(Debug, Clone, PartialEq)]
pub struct DcState {
    pub mapping: Mapping,
    pub world: DAffine2,
    pub pen: Pen,
    pub brush: Brush,
    pub font: Font,
    pub palette: Palette,
    /// 当前调色板的来源句柄，用于同步 SetPaletteEntries 的修改。
    pub palette_handle: u32,
    pub text_color: ColorRef,
    pub bk_color: ColorRef,
    pub bk_mode: u32,
    pub poly_fill_mode: u32,
    pub text_align: u32,
    pub rop2: u32,
    pub stretch_mode: u32,
    pub arc_direction: ArcDirection,
    pub miter_limit: f64,
    pub brush_origin: PointL,
    /// 逻辑坐标下的当前位置。
    pub position: DVec2,
    pub clip: ClipRegion,
    pub mapper_flags: u32,
    pub layout: u32,
    pub icm_mode: u32,
    pub text_justification: (i32, i32),
}

impl DcState {
    pub fn from_stock(stock: &StockObjects) -> Self {
        let pen = match stock.get(stock::BLACK_PEN) {
            Some(GraphicsObject::Pen(pen)) => pen.clone(),
            _ => Pen::cosmetic(ColorRef::BLACK),
        };
        let brush = match stock.get(stock::WHITE_BRUSH) {
            Some(GraphicsObject::Brush(brush)) => brush.clone(),
            _ => Brush::Solid(ColorRef::WHITE),
        };
        let font = match stock.get(stock::SYSTEM_FONT) {
            Some(GraphicsObject::Font(font)) => font.clone(),
            _ => Font::with_height(11),
        };
        let palette = match stock.get(stock::DEFAULT_PALETTE) {
            Some(GraphicsObject::Palette(palette)) => palette.clone(),
            _ => StockObjects::default_palette(),
        };
        Self {
            mapping: Mapping::default(),
            world: DAffine2::IDENTITY,
            pen,
            brush,
            font,
            palette,
            palette_handle: stock::DEFAULT_PALETTE,
            text_color: ColorRef::BLACK,
            bk_color: ColorRef::WHITE,
            bk_mode: bk_mode::OPAQUE,
            poly_fill_mode: poly_fill_mode::ALTERNATE,
            text_align: 0,
            rop2: R2_COPYPEN,
            stretch_mode: BLACKONWHITE,
            arc_direction: ArcDirection::CounterClockwise,
            miter_limit: DEFAULT_MITER_LIMIT,
            brush_origin: PointL::default(),
            position: DVec2::ZERO,
            clip: ClipRegion::default(),
            mapper_flags: 0,
            layout: 0,
            icm_mode: 0,
            text_justification: (0, 0),
        }
    }
}

impl Default for DcState {
    fn default() -> Self {
        Self::from_stock(StockObjects::shared())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
enum PathState {
    #[default]
    Idle,
    Open(DevicePath),
    Closed(DevicePath),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArcKind {
    Arc,
    ArcTo,
    Chord,
    Pie,
}

/// 一次回放独占的解释器状态。
#[derive(Debug)]
pub struct DeviceContext {
    handles: HandleTable,
    state: DcState,
    saved: Vec<DcState>,
    path: PathState,
    canvas: DAffine2,
    metrics: DeviceMetrics,
}

impl DeviceContext {
    /// 以头部范围建立画布映射；`scale` 为渲染倍率。
    pub fn new(header: &Header, scale: f64) -> Self {
        Self::with_stock(StockObjects::shared(), header, scale)
    }

    pub fn with_stock(stock: &'static StockObjects, header: &Header, scale: f64) -> Self {
        Self {
            handles: HandleTable::with_stock(stock),
            state: DcState::from_stock(stock),
            saved: Vec::new(),
            path: PathState::Idle,
            canvas: mapping::canvas_transform(header, scale),
            metrics: DeviceMetrics::from_header(header),
        }
    }

    #[inline]
    pub fn state(&self) -> &DcState {
        &self.state
    }

    /// SaveDC 栈深度。
    #[inline]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    #[inline]
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// 逻辑坐标到画布像素的完整变换：`canvas * page * world`。
    pub fn transform(&self) -> DAffine2 {
        self.canvas * self.state.mapping.page_transform(&self.metrics) * self.state.world
    }

    pub fn to_device(&self, point: PointL) -> DVec2 {
        self.transform().transform_point2(point.as_dvec2())
    }

    /// 应用一条记录。返回的错误只影响这一条记录。
    pub fn apply(&mut self, record: &Record) -> Result<Vec<DrawIntent>, EngineError> {
        trace!(record = record.name(), "应用记录");
        let mut out = Vec::new();
        match record {
            Record::Header(_) | Record::Eof(_) => {}

            Record::Rectangle { bounds } => {
                self.boxed_shape(bounds, path::rect_outline(bounds), false, &mut out)?
            }
            Record::Ellipse { bounds } => {
                self.boxed_shape(bounds, path::ellipse_outline(bounds), true, &mut out)?
            }
            Record::RoundRect { bounds, corner } => {
                self.closed_figure(path::round_rect_outline(bounds, *corner), &mut out)?
            }
            Record::Arc(arc) => self.arc(arc, ArcKind::Arc, &mut out)?,
            Record::ArcTo(arc) => self.arc(arc, ArcKind::ArcTo, &mut out)?,
            Record::Chord(arc) => self.arc(arc, ArcKind::Chord, &mut out)?,
            Record::Pie(arc) => self.arc(arc, ArcKind::Pie, &mut out)?,
            Record::AngleArc {
                center,
                radius,
                start_angle,
                sweep_angle,
            } => {
                let geometry = EllipseArc::angle_arc(
                    center.as_dvec2(),
                    *radius as f64,
                    *start_angle as f64,
                    *sweep_angle as f64,
                )
                .ok_or_else(|| {
                    EngineError::InvalidArgument(format!(
                        "AngleArc angles {start_angle}/{sweep_angle} are not finite"
                    ))
                })?;
                let mut figure = DevicePath::new();
                figure.move_to(self.state.position);
                figure.line_to(geometry.start_point());
                geometry.extend(&mut figure);
                self.state.position = geometry.end_point();
                self.open_figure(figure, true, &mut out);
            }
            Record::MoveToEx { point } => {
                self.state.position = point.as_dvec2();
                let device = self.to_device(*point);
                if let PathState::Open(path) = &mut self.path {
                    path.move_to(device);
                }
            }
            Record::LineTo { point } => {
                let mut figure = DevicePath::new();
                figure.move_to(self.state.position);
                figure.line_to(point.as_dvec2());
                self.state.position = point.as_dvec2();
                self.open_figure(figure, true, &mut out);
            }
            Record::SetPixelV { point, color } => out.push(DrawIntent::Pixel {
                at: self.to_device(*point),
                color: color.opaque(),
            }),

            Record::Polygon(poly) | Record::Polygon16(poly) => {
                let outline = path::polyline(&logical(&poly.points), true);
                self.closed_figure(outline, &mut out)?
            }
            Record::Polyline(poly) | Record::Polyline16(poly) => {
                let outline = path::polyline(&logical(&poly.points), false);
                self.open_figure(outline, false, &mut out)
            }
            Record::PolyBezier(poly) | Record::PolyBezier16(poly) => {
                let outline = path::bezier(&logical(&poly.points));
                self.open_figure(outline, false, &mut out)
            }
            Record::PolylineTo(poly) | Record::PolylineTo16(poly) => {
                self.poly_to(&poly.points, false, &mut out)
            }
            Record::PolyBezierTo(poly) | Record::PolyBezierTo16(poly) => {
                self.poly_to(&poly.points, true, &mut out)
            }
            Record::PolyPolygon(poly) | Record::PolyPolygon16(poly) => {
                self.closed_figure(poly_poly(poly, true), &mut out)?
            }
            Record::PolyPolyline(poly) | Record::PolyPolyline16(poly) => {
                self.open_figure(poly_poly(poly, false), false, &mut out)
            }

            Record::BeginPath => {
                if matches!(self.path, PathState::Open(_)) {
                    debug!("BeginPath 丢弃未结束的路径");
                }
                self.path = PathState::Open(DevicePath::new());
            }
            Record::EndPath => {
                self.path = match std::mem::take(&mut self.path) {
                    PathState::Open(path) => PathState::Closed(path),
                    other => {
                        debug!("EndPath 之前没有打开的路径");
                        other
                    }
                };
            }
            Record::CloseFigure => {
                if let PathState::Open(path) = &mut self.path {
                    path.close();
                }
            }
            Record::FillPath { .. } => self.paint_path(true, false, &mut out)?,
            Record::StrokePath { .. } => self.paint_path(false, true, &mut out)?,
            Record::StrokeAndFillPath { .. } => self.paint_path(true, true, &mut out)?,
            Record::FlattenPath | Record::WidenPath => {
                debug!(record = record.name(), "路径保持原有曲线");
            }
            Record::AbortPath => self.path = PathState::Idle,
            Record::SelectClipPath { mode } => {
                let mode = clip_mode(*mode)?;
                let path = self.take_path()?;
                let rule = self.fill_rule();
                self.state.clip.combine(ClipOp {
                    mode,
                    shape: ClipShape::Path(path, rule),
                });
                self.emit_clip(&mut out);
            }

            Record::IntersectClipRect { clip } => self.clip_rect(ClipMode::And, clip, &mut out),
            Record::ExcludeClipRect { clip } => self.clip_rect(ClipMode::Diff, clip, &mut out),
            Record::ExtSelectClipRgn { mode, region } => {
                self.select_clip_region(*mode, region.as_ref(), &mut out)?
            }
            Record::OffsetClipRgn { offset } => {
                let delta = self.transform().transform_vector2(offset.as_dvec2());
                if !self.state.clip.current.is_empty() {
                    self.state.clip.offset(delta);
                    self.emit_clip(&mut out);
                }
            }
            Record::SetMetaRgn => self.state.clip.fold_into_meta(),

            Record::SaveDc => {
                self.saved.push(self.state.clone());
                trace!(depth = self.saved.len(), "保存设备上下文");
            }
            Record::RestoreDc { saved_dc } => self.restore(*saved_dc, &mut out),

            Record::SetMapMode { mode } => self.state.mapping.mode = *mode,
            Record::SetWindowExtEx { extent } => {
                self.state.mapping.window_ext = DVec2::new(extent.cx as f64, extent.cy as f64)
            }
            Record::SetWindowOrgEx { origin } => self.state.mapping.window_org = origin.as_dvec2(),
            Record::SetViewportExtEx { extent } => {
                self.state.mapping.viewport_ext = DVec2::new(extent.cx as f64, extent.cy as f64)
            }
            Record::SetViewportOrgEx { origin } => {
                self.state.mapping.viewport_org = origin.as_dvec2()
            }
            Record::ScaleWindowExtEx(factor) => self.state.mapping.scale_window_ext(factor)?,
            Record::ScaleViewportExtEx(factor) => self.state.mapping.scale_viewport_ext(factor)?,
            Record::SetWorldTransform { xform } => self.state.world = xform.to_affine(),
            Record::ModifyWorldTransform { xform, mode } => self.modify_world(xform, *mode)?,

            Record::SetBkMode { mode } => self.state.bk_mode = *mode,
            Record::SetPolyFillMode { mode } => self.state.poly_fill_mode = *mode,
            Record::SetRop2 { mode } => self.state.rop2 = *mode,
            Record::SetStretchBltMode { mode } => self.state.stretch_mode = *mode,
            Record::SetTextAlign { mode } => self.state.text_align = *mode,
            Record::SetTextColor { color } => self.state.text_color = *color,
            Record::SetBkColor { color } => self.state.bk_color = *color,
            Record::SetIcmMode { mode } => self.state.icm_mode = *mode,
            Record::SetMapperFlags { flags } => self.state.mapper_flags = *flags,
            Record::SetLayout { layout } => self.state.layout = *layout,
            Record::SetMiterLimit { limit } => self.state.miter_limit = *limit as f64,
            Record::SetBrushOrgEx { origin } => self.state.brush_origin = *origin,
            Record::SetTextJustification {
                break_extra,
                break_count,
            } => self.state.text_justification = (*break_extra, *break_count),
            Record::SetArcDirection { direction } => {
                self.state.arc_direction = ArcDirection::from_u32(*direction).ok_or_else(|| {
                    EngineError::InvalidArgument(format!("arc direction {direction}"))
                })?
            }

            Record::CreatePen { handle, pen } => {
                self.handles.create(*handle, GraphicsObject::Pen(pen.clone()))
            }
            Record::ExtCreatePen {
                handle,
                pen,
                bitmap,
            } => {
                if bitmap.is_some() {
                    debug!(handle, "画笔位图图案按画笔颜色描边");
                }
                self.handles.create(*handle, GraphicsObject::Pen(pen.clone()))
            }
            Record::CreateBrushIndirect { handle, brush } => {
                let brush = Brush::from_log(brush.style, brush.color, brush.hatch);
                self.handles.create(*handle, GraphicsObject::Brush(brush))
            }
            Record::CreateMonoBrush(brush) => self.create_pattern_brush(brush, true),
            Record::CreateDibPatternBrushPt(brush) => self.create_pattern_brush(brush, false),
            Record::CreatePalette {
                handle, entries, ..
            } => self.handles.create(
                *handle,
                GraphicsObject::Palette(Palette {
                    entries: entries.clone(),
                }),
            ),
            Record::SetPaletteEntries {
                handle,
                start,
                entries,
            } => self.set_palette_entries(*handle, *start, entries)?,
            Record::ResizePalette { handle, entries } => self.resize_palette(*handle, *entries)?,
            Record::ExtCreateFontIndirectW { handle, font } => {
                self.handles.create(*handle, GraphicsObject::Font(font.clone()))
            }
            Record::SelectObject { handle } => self.select_object(*handle)?,
            Record::SelectPalette { handle } => match self.handles.resolve(*handle)? {
                GraphicsObject::Palette(palette) => {
                    self.state.palette = palette.clone();
                    self.state.palette_handle = *handle;
                }
                other => {
                    return Err(EngineError::UnexpectedObjectKind {
                        handle: *handle,
                        expected: "palette",
                        found: other.kind_name(),
                    });
                }
            },
            Record::DeleteObject { handle } => {
                self.handles.delete(*handle);
            }
            Record::RealizePalette => trace!("RealizePalette 无需处理"),

            Record::FillRgn { brush, region, .. } => {
                let brush = self.resolve_brush(*brush)?;
                let fill = self.brush_fill(&brush)?;
                self.fill_region(region, fill, &mut out);
            }
            Record::FrameRgn {
                brush,
                width,
                height,
                region,
                ..
            } => self.frame_region(*brush, *width, *height, region, &mut out)?,
            Record::PaintRgn { region, .. } => {
                let fill = self.current_fill()?;
                self.fill_region(region, fill, &mut out);
            }
            Record::InvertRgn { region, .. } => {
                debug!(rects = region.rects.len(), "InvertRgn 无法表示为绘制意图，跳过");
            }

            Record::BitBlt(blt) | Record::StretchBlt(blt) => self.blt(blt, None, &mut out)?,
            Record::MaskBlt(mask) => self.blt(&mask.blt, Some(mask), &mut out)?,
            Record::SetDiBitsToDevice(blt) => self.set_dibits(blt, &mut out)?,
            Record::StretchDiBits(blt) => self.stretch_dibits(blt, &mut out)?,

            Record::ExtTextOutA(text) | Record::ExtTextOutW(text) => {
                self.text_out(text, &mut out)?
            }

            Record::Comment { data } => trace!(bytes = data.len(), "忽略注释记录"),
            Record::Opaque { record_type, size } => {
                debug!(record_type, size, "不透明记录没有回放效果");
            }
        }
        Ok(out)
    }

    fn restore(&mut self, saved_dc: i32, out: &mut Vec<DrawIntent>) {
        let depth = self.saved.len();
        let requested = saved_dc.unsigned_abs() as usize;
        let index = match saved_dc {
            n if n < 0 && requested <= depth => Some(depth - requested),
            n if n > 0 && requested <= depth => Some(requested - 1),
            _ => None,
        };
        let Some(index) = index else {
            debug!(saved_dc, depth, "RestoreDC 指向不存在的保存层，忽略");
            return;
        };
        self.saved.truncate(index + 1);
        let Some(state) = self.saved.pop() else {
            return;
        };
        let clip_changed = state.clip != self.state.clip;
        self.state = state;
        trace!(saved_dc, depth = self.saved.len(), "恢复设备上下文");
        if clip_changed {
            self.emit_clip(out);
        }
    }

    fn modify_world(&mut self, xform: &XForm, mode: u32) -> Result<(), EngineError> {
        use world_mode::*;

        let given = xform.to_affine();
        self.state.world = match mode {
            MWT_IDENTITY => DAffine2::IDENTITY,
            // 先应用给定变换，再应用原有变换。
            MWT_LEFTMULTIPLY => self.state.world * given,
            MWT_RIGHTMULTIPLY => given * self.state.world,
            MWT_SET => given,
            other => {
                return Err(EngineError::InvalidArgument(format!(
                    "world transform mode {other}"
                )));
            }
        };
        Ok(())
    }

    fn select_object(&mut self, handle: u32) -> Result<(), EngineError> {
        match self.handles.resolve(handle)? {
            GraphicsObject::Pen(pen) => self.state.pen = pen.clone(),
            GraphicsObject::Brush(brush) => self.state.brush = brush.clone(),
            GraphicsObject::Font(font) => self.state.font = font.clone(),
            GraphicsObject::Palette(palette) => {
                self.state.palette = palette.clone();
                self.state.palette_handle = handle;
            }
        }
        Ok(())
    }

    fn resolve_brush(&self, handle: u32) -> Result<Brush, EngineError> {
        match self.handles.resolve(handle)? {
            GraphicsObject::Brush(brush) => Ok(brush.clone()),
            other => Err(EngineError::UnexpectedObjectKind {
                handle,
                expected: "brush",
                found: other.kind_name(),
            }),
        }
    }

    fn palette_mut(&mut self, handle: u32) -> Result<&mut Palette, EngineError> {
        match self.handles.resolve_mut(handle)? {
            GraphicsObject::Palette(palette) => Ok(palette),
            other => Err(EngineError::UnexpectedObjectKind {
                handle,
                expected: "palette",
                found: other.kind_name(),
            }),
        }
    }

    fn set_palette_entries(
        &mut self,
        handle: u32,
        start: u32,
        entries: &[PaletteEntry],
    ) -> Result<(), EngineError> {
        let palette = self.palette_mut(handle)?;
        let start = start as usize;
        let available = palette.entries.len().saturating_sub(start);
        if entries.len() > available {
            debug!(handle, start, count = entries.len(), "调色板条目超出范围，多余部分忽略");
        }
        for (slot, entry) in palette.entries.iter_mut().skip(start).zip(entries) {
            *slot = *entry;
        }
        let updated = palette.clone();
        if self.state.palette_handle == handle {
            self.state.palette = updated;
        }
        Ok(())
    }

    fn resize_palette(&mut self, handle: u32, entries: u32) -> Result<(), EngineError> {
        if entries > MAX_PALETTE_ENTRIES {
            return Err(EngineError::InvalidArgument(format!(
                "palette size {entries} exceeds {MAX_PALETTE_ENTRIES}"
            )));
        }
        let palette = self.palette_mut(handle)?;
        palette.entries.resize(entries as usize, PaletteEntry::default());
        let updated = palette.clone();
        if self.state.palette_handle == handle {
            self.state.palette = updated;
        }
        Ok(())
    }

    fn create_pattern_brush(&mut self, brush: &PatternBrush, monochrome: bool) {
        let object = match &brush.bitmap {
            Some(bitmap) if monochrome => Brush::Monochrome {
                bitmap: Arc::new(bitmap.clone()),
            },
            Some(bitmap) => Brush::Pattern {
                bitmap: Arc::new(bitmap.clone()),
                usage: brush.usage,
            },
            None => {
                debug!(handle = brush.handle, "图案画刷没有位图，按空画刷处理");
                Brush::Null
            }
        };
        self.handles
            .create(brush.handle, GraphicsObject::Brush(object));
    }

    fn fill_rule(&self) -> FillRule {
        if self.state.poly_fill_mode == poly_fill_mode::WINDING {
            FillRule::NonZero
        } else {
            FillRule::EvenOdd
        }
    }

    fn current_fill(&self) -> Result<Option<Fill>, EngineError> {
        self.brush_fill(&self.state.brush)
    }

    fn brush_fill(&self, brush: &Brush) -> Result<Option<Fill>, EngineError> {
        let fill = match brush {
            Brush::Null => return Ok(None),
            Brush::Solid(color) => Fill::Solid(color.opaque()),
            Brush::Hatched { hatch, color } => Fill::Hatch {
                style: *hatch,
                color: color.opaque(),
                background: (self.state.bk_mode == bk_mode::OPAQUE)
                    .then_some(self.state.bk_color.opaque()),
            },
            Brush::Pattern { bitmap, usage } => {
                let source = ColorSource::Table {
                    usage: *usage,
                    palette: &self.state.palette,
                };
                Fill::Pattern(Arc::new(dib::normalize(bitmap, source)?))
            }
            Brush::Monochrome { bitmap } => {
                let source = ColorSource::Monochrome {
                    foreground: self.state.text_color.opaque(),
                    background: self.state.bk_color.opaque(),
                };
                Fill::Pattern(Arc::new(dib::normalize(bitmap, source)?))
            }
        };
        Ok(Some(fill))
    }

    fn current_stroke(&self) -> Option<Stroke> {
        let pen = &self.state.pen;
        if pen.is_null() {
            return None;
        }
        // 几何画笔和宽度大于 1 的 LOGPEN 画笔按逻辑单位缩放，其余为 1 像素。
        let scaled = pen.width > 0 && (pen.is_geometric() || pen.width > 1);
        let scale = self.transform().matrix2.determinant().abs().sqrt();
        let width = if scaled { pen.width as f64 * scale } else { 1.0 };
        let unit = if scaled { width / 3.0 } else { 1.0 };
        let pattern = |base: &[f64]| base.iter().map(|len| len * unit).collect::<Vec<_>>();
        let dash = match pen.line_style() {
            LineStyle::Dash => pattern(DASH),
            LineStyle::Dot => pattern(DOT),
            LineStyle::DashDot => pattern(DASH_DOT),
            LineStyle::DashDotDot => pattern(DASH_DOT_DOT),
            LineStyle::Alternate => vec![1.0, 1.0],
            LineStyle::UserStyle => {
                let factor = if scaled { scale } else { 1.0 };
                pen.style_entries
                    .iter()
                    .map(|&len| len as f64 * factor)
                    .collect()
            }
            LineStyle::Solid | LineStyle::InsideFrame | LineStyle::Null => Vec::new(),
        };
        Some(Stroke {
            color: pen.color.opaque(),
            width,
            dash,
            cap: pen.end_cap(),
            join: pen.join(),
            miter_limit: self.state.miter_limit,
        })
    }

    fn device_bounds(&self, rect: &RectL) -> Bounds2D {
        let transform = self.transform();
        Bounds2D::from_points(
            rect.corners()
                .iter()
                .map(|p| Point2::from_vec(transform.transform_point2(p.as_dvec2()))),
        )
    }

    /// 在打开的路径中记录图形；没有打开的路径时返回原图形。
    fn record_in_path(&mut self, outline: DevicePath, connect: bool) -> Option<DevicePath> {
        let transform = self.transform();
        match &mut self.path {
            PathState::Open(path) => {
                let device = outline.transformed(&transform);
                if connect {
                    path.connect(device);
                } else {
                    path.append(device);
                }
                None
            }
            _ => Some(outline),
        }
    }

    /// 矩形与椭圆：坐标轴保持对齐时输出专用意图，否则退化为路径。
    fn boxed_shape(
        &mut self,
        bounds: &RectL,
        outline: DevicePath,
        ellipse: bool,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let Some(outline) = self.record_in_path(outline, false) else {
            return Ok(());
        };
        let fill = self.current_fill()?;
        let stroke = self.current_stroke();
        self.emit_box(bounds, outline, ellipse, fill, stroke, out);
        Ok(())
    }

    fn emit_box(
        &self,
        bounds: &RectL,
        outline: DevicePath,
        ellipse: bool,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
        out: &mut Vec<DrawIntent>,
    ) {
        if fill.is_none() && stroke.is_none() {
            return;
        }
        let transform = self.transform();
        let aligned = transform.matrix2.x_axis.y.abs() < AXIS_EPSILON
            && transform.matrix2.y_axis.x.abs() < AXIS_EPSILON;
        let intent = match (aligned, ellipse) {
            (true, false) => DrawIntent::Rectangle {
                rect: self.device_bounds(bounds),
                fill,
                stroke,
            },
            (true, true) => DrawIntent::Ellipse {
                rect: self.device_bounds(bounds),
                fill,
                stroke,
            },
            (false, _) => DrawIntent::Path {
                path: outline.transformed(&transform),
                fill_rule: FillRule::NonZero,
                fill,
                stroke,
            },
        };
        out.push(intent);
    }

    fn closed_figure(
        &mut self,
        outline: DevicePath,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let Some(outline) = self.record_in_path(outline, false) else {
            return Ok(());
        };
        let fill = self.current_fill()?;
        let stroke = self.current_stroke();
        if outline.is_empty() || (fill.is_none() && stroke.is_none()) {
            return Ok(());
        }
        out.push(DrawIntent::Path {
            path: outline.transformed(&self.transform()),
            fill_rule: self.fill_rule(),
            fill,
            stroke,
        });
        Ok(())
    }

    fn open_figure(&mut self, outline: DevicePath, connect: bool, out: &mut Vec<DrawIntent>) {
        let Some(outline) = self.record_in_path(outline, connect) else {
            return;
        };
        let Some(stroke) = self.current_stroke() else {
            return;
        };
        if outline.is_empty() {
            return;
        }
        out.push(DrawIntent::Path {
            path: outline.transformed(&self.transform()),
            fill_rule: self.fill_rule(),
            fill: None,
            stroke: Some(stroke),
        });
    }

    fn poly_to(&mut self, points: &[PointL], bezier: bool, out: &mut Vec<DrawIntent>) {
        let points = logical(points);
        let mut figure = DevicePath::new();
        figure.move_to(self.state.position);
        if bezier {
            path::append_beziers(&mut figure, &points);
        } else {
            for point in &points {
                figure.line_to(*point);
            }
        }
        if let Some(last) = figure.last_point() {
            self.state.position = last;
        }
        self.open_figure(figure, true, out);
    }

    fn arc(&mut self, arc: &ArcBox, kind: ArcKind, out: &mut Vec<DrawIntent>) -> Result<(), EngineError> {
        let geometry = EllipseArc::from_box(
            &arc.bounds,
            arc.start.as_dvec2(),
            arc.end.as_dvec2(),
            self.state.arc_direction,
        );
        let mut figure = DevicePath::new();
        match kind {
            ArcKind::ArcTo => {
                figure.move_to(self.state.position);
                figure.line_to(geometry.start_point());
            }
            ArcKind::Pie => {
                figure.move_to(geometry.center);
                figure.line_to(geometry.start_point());
            }
            ArcKind::Arc | ArcKind::Chord => figure.move_to(geometry.start_point()),
        }
        geometry.extend(&mut figure);
        match kind {
            ArcKind::Arc => self.open_figure(figure, false, out),
            ArcKind::ArcTo => {
                self.state.position = geometry.end_point();
                self.open_figure(figure, true, out);
            }
            ArcKind::Chord | ArcKind::Pie => {
                figure.close();
                self.closed_figure(figure, out)?;
            }
        }
        Ok(())
    }

    fn take_path(&mut self) -> Result<DevicePath, EngineError> {
        match std::mem::take(&mut self.path) {
            PathState::Closed(path) => Ok(path),
            PathState::Open(path) => {
                warn!("路径没有以 EndPath 结束，隐式结束");
                Ok(path)
            }
            PathState::Idle => Err(EngineError::InvalidArgument(
                "no path has been defined".to_string(),
            )),
        }
    }

    fn paint_path(
        &mut self,
        fill: bool,
        stroke: bool,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let path = self.take_path()?;
        let fill = if fill { self.current_fill()? } else { None };
        let stroke = if stroke { self.current_stroke() } else { None };
        if path.is_empty() || (fill.is_none() && stroke.is_none()) {
            return Ok(());
        }
        out.push(DrawIntent::Path {
            path,
            fill_rule: self.fill_rule(),
            fill,
            stroke,
        });
        Ok(())
    }

    fn emit_clip(&self, out: &mut Vec<DrawIntent>) {
        out.push(DrawIntent::Clip(self.state.clip.clone()));
    }

    fn clip_rect(&mut self, mode: ClipMode, rect: &RectL, out: &mut Vec<DrawIntent>) {
        let transform = self.transform();
        let aligned = transform.matrix2.x_axis.y.abs() < AXIS_EPSILON
            && transform.matrix2.y_axis.x.abs() < AXIS_EPSILON;
        let shape = if aligned {
            ClipShape::Rects(vec![self.device_bounds(rect)])
        } else {
            ClipShape::Path(
                path::rect_outline(rect).transformed(&transform),
                FillRule::NonZero,
            )
        };
        self.state.clip.combine(ClipOp { mode, shape });
        self.emit_clip(out);
    }

    /// 区域矩形为设备单位，只经过画布映射。
    fn region_rects(&self, region: &Region) -> Vec<Bounds2D> {
        region
            .rects
            .iter()
            .map(|rect| {
                Bounds2D::new(
                    Point2::from_vec(self.canvas.transform_point2(DVec2::new(
                        rect.left as f64,
                        rect.top as f64,
                    ))),
                    Point2::from_vec(self.canvas.transform_point2(DVec2::new(
                        rect.right as f64,
                        rect.bottom as f64,
                    ))),
                )
            })
            .collect()
    }

    fn region_path(&self, region: &Region) -> DevicePath {
        let mut path = DevicePath::new();
        for rect in &region.rects {
            path.append(path::rect_outline(rect).transformed(&self.canvas));
        }
        path
    }

    fn select_clip_region(
        &mut self,
        mode: u32,
        region: Option<&Region>,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let mode = clip_mode(mode)?;
        match (mode, region) {
            // RGN_COPY 的区域数据不参与，一律回到无裁剪。
            (ClipMode::Copy, _) => self.state.clip.reset(),
            (mode, Some(region)) => {
                let shape = ClipShape::Rects(self.region_rects(region));
                self.state.clip.combine(ClipOp { mode, shape });
            }
            (_, None) => {
                return Err(EngineError::InvalidArgument(
                    "only RGN_COPY accepts an empty region".to_string(),
                ));
            }
        }
        self.emit_clip(out);
        Ok(())
    }

    fn fill_region(&self, region: &Region, fill: Option<Fill>, out: &mut Vec<DrawIntent>) {
        let Some(fill) = fill else {
            return;
        };
        if region.rects.is_empty() {
            return;
        }
        out.push(DrawIntent::Path {
            path: self.region_path(region),
            fill_rule: FillRule::NonZero,
            fill: Some(fill),
            stroke: None,
        });
    }

    fn frame_region(
        &self,
        brush: u32,
        width: i32,
        height: i32,
        region: &Region,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let color = match self.resolve_brush(brush)? {
            Brush::Solid(color) | Brush::Hatched { color, .. } => color.opaque(),
            Brush::Null => return Ok(()),
            Brush::Pattern { .. } | Brush::Monochrome { .. } => {
                debug!(handle = brush, "图案画刷描边按文本色近似");
                self.state.text_color.opaque()
            }
        };
        if region.rects.is_empty() {
            return Ok(());
        }
        let scale = self.transform().matrix2.determinant().abs().sqrt();
        let width = (width.max(height).max(1) as f64 * scale).max(1.0);
        out.push(DrawIntent::Path {
            path: self.region_path(region),
            fill_rule: FillRule::NonZero,
            fill: None,
            stroke: Some(Stroke::solid(color, width)),
        });
        Ok(())
    }

    /// 没有源位图的块传输只支持纯填充类光栅操作。
    fn pattern_blt(
        &self,
        dest: &RectL,
        raster: u32,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let fill = match raster {
            rop::PATCOPY => self.current_fill()?,
            rop::BLACKNESS => Some(Fill::Solid(ColorRef::BLACK)),
            rop::WHITENESS => Some(Fill::Solid(ColorRef::WHITE)),
            other => {
                debug!(rop = other, "不支持的无位图光栅操作，跳过");
                return Ok(());
            }
        };
        self.emit_box(dest, path::rect_outline(dest), false, fill, None, out);
        Ok(())
    }

    fn colors(&self, usage: u32) -> ColorSource<'_> {
        ColorSource::Table {
            usage,
            palette: &self.state.palette,
        }
    }

    fn blt(
        &mut self,
        blt: &Blt,
        mask: Option<&MaskBlt>,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let dest = dest_rect(blt.dest, blt.dest_size)?;
        let Some(dib) = &blt.bitmap else {
            return self.pattern_blt(&dest, blt.rop, out);
        };
        let mut bitmap = dib::normalize(dib, self.colors(blt.usage))?;
        if let Some(mask) = mask {
            self.apply_mask(&mut bitmap, mask)?;
        }
        // 源坐标先经源设备的变换得到位图像素。
        let source = blt.src_xform.to_affine();
        let origin = source.transform_point2(blt.src.as_dvec2());
        let extent = source.transform_vector2(DVec2::new(
            blt.src_size.cx as f64,
            blt.src_size.cy as f64,
        ));
        let rop = if mask.is_some() {
            blt.rop & 0x00FF_FFFF
        } else {
            blt.rop
        };
        self.place_bitmap(
            &bitmap,
            [origin.x, origin.y, extent.x, extent.y],
            &dest,
            rop,
            out,
        )
    }

    /// 背景操作保留目标时，掩码为 0 的像素变为透明。
    fn apply_mask(&self, bitmap: &mut Bitmap, mask: &MaskBlt) -> Result<(), EngineError> {
        let Some(mask_dib) = &mask.mask else {
            return Ok(());
        };
        let background = mask.blt.rop >> 24;
        let foreground = (mask.blt.rop >> 16) & 0xFF;
        if background == foreground {
            return Ok(());
        }
        if background != rop::KEEP_DESTINATION {
            debug!(rop = mask.blt.rop, "掩码背景操作无法表示，忽略掩码");
            return Ok(());
        }
        let bits = dib::mask_bits(mask_dib)?;
        let mask_width = mask_dib.header.abs_width() as i64;
        let mask_height = mask_dib.header.abs_height() as i64;
        let offset_x = mask.mask_origin.x as i64 - mask.blt.src.x as i64;
        let offset_y = mask.mask_origin.y as i64 - mask.blt.src.y as i64;
        let width = bitmap.width() as usize;
        for (index, pixel) in bitmap.pixels_mut().chunks_exact_mut(4).enumerate() {
            let mx = (index % width) as i64 + offset_x;
            let my = (index / width) as i64 + offset_y;
            let visible = mx >= 0
                && my >= 0
                && mx < mask_width
                && my < mask_height
                && bits[(my * mask_width + mx) as usize];
            if !visible {
                pixel.copy_from_slice(&[0, 0, 0, 0]);
            }
        }
        Ok(())
    }

    fn set_dibits(
        &mut self,
        blt: &SetDiBitsToDevice,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let Some(dib) = &blt.bitmap else {
            debug!("SetDIBitsToDevice 没有位图，跳过");
            return Ok(());
        };
        let dest = dest_rect(blt.dest, blt.src_size)?;
        let bitmap =
            dib::normalize_band(dib, self.colors(blt.usage), blt.start_scan, blt.scan_count)?;
        let src_y = dib_source_y(dib.header.is_top_down(), &bitmap, blt.src.y, blt.src_size.cy);
        self.place_bitmap(
            &bitmap,
            [
                blt.src.x as f64,
                src_y,
                blt.src_size.cx as f64,
                blt.src_size.cy as f64,
            ],
            &dest,
            rop::SRCCOPY,
            out,
        )
    }

    fn stretch_dibits(
        &mut self,
        blt: &StretchDiBits,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let dest = dest_rect(blt.dest, blt.dest_size)?;
        let Some(dib) = &blt.bitmap else {
            return self.pattern_blt(&dest, blt.rop, out);
        };
        let bitmap = dib::normalize(dib, self.colors(blt.usage))?;
        let src_y = dib_source_y(dib.header.is_top_down(), &bitmap, blt.src.y, blt.src_size.cy);
        self.place_bitmap(
            &bitmap,
            [
                blt.src.x as f64,
                src_y,
                blt.src_size.cx as f64,
                blt.src_size.cy as f64,
            ],
            &dest,
            blt.rop,
            out,
        )
    }

    /// 裁出源矩形 `[x, y, w, h]`（位图像素），映射到逻辑目标矩形。
    fn place_bitmap(
        &self,
        bitmap: &Bitmap,
        source: [f64; 4],
        dest: &RectL,
        raster: u32,
        out: &mut Vec<DrawIntent>,
    ) -> Result<(), EngineError> {
        let [mut sx, mut sy, mut sw, mut sh] = source.map(f64::round);
        let mut dx = dest.left as f64;
        let mut dy = dest.top as f64;
        let mut dw = dest.width() as f64;
        let mut dh = dest.height() as f64;
        if sw == 0.0 || sh == 0.0 || dw == 0.0 || dh == 0.0 {
            return Err(EngineError::InvalidArgument(
                "bitmap transfer with an empty rectangle".to_string(),
            ));
        }
        // 源范围为负时翻转为正，同时镜像目标。
        if sw < 0.0 {
            sx += sw;
            sw = -sw;
            dx += dw;
            dw = -dw;
        }
        if sh < 0.0 {
            sy += sh;
            sh = -sh;
            dy += dh;
            dh = -dh;
        }
        let cropped = bitmap
            .crop(sx as i64, sy as i64, sw as i64, sh as i64)
            .ok_or_else(|| {
                EngineError::InvalidArgument("source rectangle lies outside the bitmap".to_string())
            })?;
        let scale = DVec2::new(dw / sw, dh / sh);
        let skipped = DVec2::new(sx.max(0.0) - sx, sy.max(0.0) - sy);
        let transform = self.transform()
            * DAffine2::from_translation(DVec2::new(dx, dy) + skipped * scale)
            * DAffine2::from_scale(scale);
        let (w, h) = (cropped.width() as f64, cropped.height() as f64);
        let bounds = Bounds2D::from_points(
            [
                DVec2::ZERO,
                DVec2::new(w, 0.0),
                DVec2::new(w, h),
                DVec2::new(0.0, h),
            ]
            .map(|corner| Point2::from_vec(transform.transform_point2(corner))),
        );
        out.push(DrawIntent::Bitmap(BitmapBlit {
            bitmap: Arc::new(cropped),
            transform,
            bounds,
            rop: raster,
        }));
        Ok(())
    }

    fn font_spec(&self, transform: &DAffine2) -> FontSpec {
        let font = &self.state.font;
        let height = match font.height {
            0 => DEFAULT_FONT_HEIGHT,
            h => h.unsigned_abs() as f64,
        };
        let x_axis = transform.transform_vector2(DVec2::X);
        // 屏幕 y 轴向下，逆时针角取 -y。
        let world_rotation = (-x_axis.y).atan2(x_axis.x).to_degrees();
        FontSpec {
            family: font.face_name.clone(),
            size: transform.transform_vector2(DVec2::new(0.0, height)).length(),
            weight: if font.weight == 0 { 400 } else { font.weight },
            italic: font.italic,
            underline: font.underline,
            strike_out: font.strike_out,
            rotation: font.escapement as f64 / 10.0 + world_rotation,
        }
    }

    fn text_out(&mut self, text: &ExtTextOut, out: &mut Vec<DrawIntent>) -> Result<(), EngineError> {
        let content = text.text();
        if content.trim().is_empty() {
            trace!(chars = text.chars.len(), "空白文本不绘制");
            return Ok(());
        }
        let transform = self.transform();
        let update_cp = self.state.text_align & text_align::TA_UPDATECP != 0;
        let reference = if update_cp {
            self.state.position
        } else {
            text.reference.as_dvec2()
        };

        if text.options & text_options::ETO_OPAQUE != 0 {
            if let Some(rect) = &text.rectangle {
                let fill = Some(Fill::Solid(self.state.bk_color.opaque()));
                self.emit_box(rect, path::rect_outline(rect), false, fill, None, out);
            }
        }
        let clip = if text.options & text_options::ETO_CLIPPED != 0 {
            text.rectangle.as_ref().map(|rect| self.device_bounds(rect))
        } else {
            None
        };

        let logical_advances = text.advances();
        let unit = transform.transform_vector2(DVec2::X).length();
        let advances = logical_advances.iter().map(|&dx| dx as f64 * unit).collect();
        if update_cp {
            let total: i64 = logical_advances.iter().map(|&dx| dx as i64).sum();
            self.state.position.x += total as f64;
        }

        let horizontal = match self.state.text_align & text_align::HORIZONTAL_MASK {
            text_align::TA_CENTER => HorizontalAlign::Center,
            text_align::TA_RIGHT => HorizontalAlign::Right,
            _ => HorizontalAlign::Left,
        };
        let vertical = match self.state.text_align & text_align::VERTICAL_MASK {
            text_align::TA_BASELINE => VerticalAlign::Baseline,
            text_align::TA_BOTTOM => VerticalAlign::Bottom,
            _ => VerticalAlign::Top,
        };
        out.push(DrawIntent::Text(TextRun {
            origin: transform.transform_point2(reference),
            text: content,
            advances,
            font: self.font_spec(&transform),
            color: self.state.text_color.opaque(),
            background: (self.state.bk_mode == bk_mode::OPAQUE)
                .then_some(self.state.bk_color.opaque()),
            align: (horizontal, vertical),
            clip,
        }));
        Ok(())
    }
}

fn clip_mode(raw: u32) -> Result<ClipMode, EngineError> {
    ClipMode::from_u32(raw)
        .ok_or_else(|| EngineError::InvalidArgument(format!("region mode {raw}")))
}

fn logical(points: &[PointL]) -> Vec<DVec2> {
    points.iter().map(|p| p.as_dvec2()).collect()
}

fn poly_poly(poly: &PolyPoly, closed: bool) -> DevicePath {
    let mut outline = DevicePath::new();
    for figure in poly.figures() {
        outline.append(path::polyline(&logical(figure), closed));
    }
    outline
}

/// 目标原点加尺寸得到的逻辑矩形；越出 32 位坐标范围的记录无法表示。
fn dest_rect(origin: PointL, size: SizeL) -> Result<RectL, EngineError> {
    match (origin.x.checked_add(size.cx), origin.y.checked_add(size.cy)) {
        (Some(right), Some(bottom)) => Ok(RectL::new(origin.x, origin.y, right, bottom)),
        _ => Err(EngineError::InvalidArgument(format!(
            "destination {}x{} at ({}, {}) overflows logical coordinates",
            size.cx, size.cy, origin.x, origin.y
        ))),
    }
}

/// 自下而上的 DIB 中源矩形的 y 从底边量起，换算为自上而下的行号。
fn dib_source_y(top_down: bool, bitmap: &Bitmap, src_y: i32, src_height: i32) -> f64 {
    if top_down {
        src_y as f64
    } else {
        bitmap.height() as f64 - src_y as f64 - src_height as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emf_core::record::{EMF_SIGNATURE, LogBrush};

    fn header(bounds: RectL) -> Header {
        Header {
            bounds,
            frame: RectL::default(),
            signature: EMF_SIGNATURE,
            version: 0x0001_0000,
            bytes: 0,
            records: 0,
            handles: 1,
            reserved: 0,
            description_len: 0,
            description_offset: 0,
            palette_entries: 0,
            device: SizeL::new(1024, 768),
            millimeters: SizeL::new(320, 240),
            pixel_format: None,
            micrometers: None,
            description: None,
            header_size: 88,
        }
    }

    fn context() -> DeviceContext {
        DeviceContext::new(&header(RectL::new(0, 0, 99, 99)), 1.0)
    }

    fn apply(dc: &mut DeviceContext, record: Record) -> Vec<DrawIntent> {
        dc.apply(&record).expect("apply")
    }

    #[test]
    fn defaults_follow_gdi() {
        let dc = context();
        let state = dc.state();
        assert_eq!(state.brush, Brush::Solid(ColorRef::WHITE));
        assert_eq!(state.pen, Pen::cosmetic(ColorRef::BLACK));
        assert_eq!(state.font.height, 11);
        assert_eq!(state.palette.entries.len(), 20);
        assert_eq!(state.bk_mode, bk_mode::OPAQUE);
        assert_eq!(state.arc_direction, ArcDirection::CounterClockwise);
        assert!((state.miter_limit - 10.0).abs() < 1e-9);
        assert!(state.clip.is_unclipped());
    }

    #[test]
    fn canvas_offsets_bounds_origin() {
        let mut dc = DeviceContext::new(&header(RectL::new(-50, 20, 49, 119)), 2.0);
        let p = dc.to_device(PointL::new(-50, 20));
        assert!(p.length() < 1e-9);
        apply(&mut dc, Record::SetViewportOrgEx {
            origin: PointL::new(10, 0),
        });
        let q = dc.to_device(PointL::new(-50, 20));
        assert!((q - DVec2::new(20.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn restore_with_negative_depth_pops_frames() {
        let mut dc = context();
        apply(&mut dc, Record::SaveDc);
        apply(&mut dc, Record::SetTextColor {
            color: ColorRef::rgb(1, 2, 3),
        });
        apply(&mut dc, Record::SaveDc);
        apply(&mut dc, Record::SetBkMode {
            mode: bk_mode::TRANSPARENT,
        });
        apply(&mut dc, Record::SaveDc);
        apply(&mut dc, Record::RestoreDc { saved_dc: -2 });
        assert_eq!(dc.depth(), 1);
        assert_eq!(dc.state().text_color, ColorRef::rgb(1, 2, 3));
        assert_eq!(dc.state().bk_mode, bk_mode::OPAQUE);
    }

    #[test]
    fn restore_to_unsaved_depth_is_ignored() {
        let mut dc = context();
        apply(&mut dc, Record::SaveDc);
        apply(&mut dc, Record::SetPolyFillMode {
            mode: poly_fill_mode::WINDING,
        });
        assert!(apply(&mut dc, Record::RestoreDc { saved_dc: 0 }).is_empty());
        apply(&mut dc, Record::RestoreDc { saved_dc: 2 });
        apply(&mut dc, Record::RestoreDc { saved_dc: -3 });
        assert_eq!(dc.depth(), 1);
        assert_eq!(dc.state().poly_fill_mode, poly_fill_mode::WINDING);
    }

    #[test]
    fn restore_reemits_changed_clip() {
        let mut dc = context();
        apply(&mut dc, Record::SaveDc);
        let clip = apply(&mut dc, Record::IntersectClipRect {
            clip: RectL::new(10, 10, 20, 20),
        });
        assert_eq!(clip.len(), 1);
        let restored = apply(&mut dc, Record::RestoreDc { saved_dc: -1 });
        assert_eq!(restored, vec![DrawIntent::Clip(ClipRegion::default())]);
    }

    #[test]
    fn selected_brush_survives_deletion() {
        let mut dc = context();
        let red = ColorRef::rgb(255, 0, 0);
        apply(&mut dc, Record::CreateBrushIndirect {
            handle: 1,
            brush: LogBrush {
                style: 0,
                color: red,
                hatch: 0,
            },
        });
        apply(&mut dc, Record::SelectObject { handle: 1 });
        apply(&mut dc, Record::DeleteObject { handle: 1 });
        assert_eq!(dc.state().brush, Brush::Solid(red));
        assert_eq!(
            dc.apply(&Record::SelectObject { handle: 1 }),
            Err(EngineError::UnresolvedHandle { handle: 1 })
        );
        assert_eq!(dc.state().brush, Brush::Solid(red));
    }

    #[test]
    fn select_palette_rejects_other_kinds() {
        let mut dc = context();
        assert!(matches!(
            dc.apply(&Record::SelectPalette {
                handle: stock::BLACK_PEN
            }),
            Err(EngineError::UnexpectedObjectKind {
                expected: "palette",
                found: "pen",
                ..
            })
        ));
    }

    #[test]
    fn palette_edits_reach_selected_palette() {
        let mut dc = context();
        apply(&mut dc, Record::CreatePalette {
            handle: 2,
            version: 0x300,
            entries: vec![PaletteEntry::rgb(0, 0, 0); 4],
        });
        apply(&mut dc, Record::SelectPalette { handle: 2 });
        apply(&mut dc, Record::SetPaletteEntries {
            handle: 2,
            start: 3,
            entries: vec![PaletteEntry::rgb(9, 9, 9), PaletteEntry::rgb(8, 8, 8)],
        });
        assert_eq!(dc.state().palette.entries[3], PaletteEntry::rgb(9, 9, 9));
        assert_eq!(dc.state().palette.entries.len(), 4);
        apply(&mut dc, Record::ResizePalette {
            handle: 2,
            entries: 6,
        });
        assert_eq!(dc.state().palette.entries.len(), 6);
    }

    #[test]
    fn shapes_inside_path_bracket_do_not_draw() {
        let mut dc = context();
        apply(&mut dc, Record::BeginPath);
        assert!(apply(&mut dc, Record::Rectangle {
            bounds: RectL::new(0, 0, 10, 10)
        })
        .is_empty());
        assert!(apply(&mut dc, Record::MoveToEx {
            point: PointL::new(20, 20)
        })
        .is_empty());
        assert!(apply(&mut dc, Record::LineTo {
            point: PointL::new(30, 20)
        })
        .is_empty());
        apply(&mut dc, Record::EndPath);
        let drawn = apply(&mut dc, Record::StrokeAndFillPath {
            bounds: RectL::default(),
        });
        match drawn.as_slice() {
            [DrawIntent::Path { path, fill, stroke, .. }] => {
                assert_eq!(path.segments().len(), 7);
                assert!(fill.is_some());
                assert!(stroke.is_some());
            }
            other => panic!("unexpected intents: {other:?}"),
        }
        assert!(dc.apply(&Record::FillPath {
            bounds: RectL::default()
        })
        .is_err());
    }

    #[test]
    fn rotated_world_turns_rectangles_into_paths() {
        let mut dc = context();
        let angle = std::f32::consts::FRAC_PI_4;
        apply(&mut dc, Record::SetWorldTransform {
            xform: XForm {
                m11: angle.cos(),
                m12: angle.sin(),
                m21: -angle.sin(),
                m22: angle.cos(),
                dx: 50.0,
                dy: 50.0,
            },
        });
        let drawn = apply(&mut dc, Record::Ellipse {
            bounds: RectL::new(-10, -5, 10, 5),
        });
        assert!(matches!(drawn.as_slice(), [DrawIntent::Path { .. }]));
    }

    #[test]
    fn geometric_pen_scales_with_mapping() {
        let mut dc = context();
        apply(&mut dc, Record::CreatePen {
            handle: 1,
            pen: Pen {
                style: emf_core::object::pen_style::DASH,
                width: 4,
                color: ColorRef::BLACK,
                brush_style: 0,
                hatch: 0,
                style_entries: Vec::new(),
            },
        });
        apply(&mut dc, Record::SelectObject { handle: 1 });
        apply(&mut dc, Record::SetMapMode {
            mode: mapping::map_mode::MM_ANISOTROPIC,
        });
        apply(&mut dc, Record::SetWindowExtEx {
            extent: SizeL::new(10, 10),
        });
        apply(&mut dc, Record::SetViewportExtEx {
            extent: SizeL::new(20, 20),
        });
        let stroke = dc.current_stroke().expect("stroke");
        assert!((stroke.width - 8.0).abs() < 1e-9);
        assert_eq!(stroke.dash.len(), 2);

        apply(&mut dc, Record::SelectObject {
            handle: stock::NULL_PEN,
        });
        assert!(dc.current_stroke().is_none());
        apply(&mut dc, Record::SelectObject {
            handle: stock::BLACK_PEN,
        });
        assert!((dc.current_stroke().expect("stroke").width - 1.0).abs() < 1e-9);
    }

    #[test]
    fn text_updates_current_position() {
        let mut dc = context();
        apply(&mut dc, Record::SetTextAlign {
            mode: text_align::TA_UPDATECP | text_align::TA_BASELINE,
        });
        apply(&mut dc, Record::MoveToEx {
            point: PointL::new(5, 40),
        });
        let text = ExtTextOut {
            bounds: RectL::default(),
            graphics_mode: 1,
            ex_scale: 0.0,
            ey_scale: 0.0,
            reference: PointL::new(0, 0),
            options: 0,
            rectangle: None,
            chars: "ab".encode_utf16().collect(),
            dx: vec![7, 8],
        };
        let drawn = apply(&mut dc, Record::ExtTextOutW(text.clone()));
        match drawn.as_slice() {
            [DrawIntent::Text(run)] => {
                assert!((run.origin - DVec2::new(5.0, 40.0)).length() < 1e-9);
                assert_eq!(run.align, (HorizontalAlign::Left, VerticalAlign::Baseline));
                assert_eq!(run.background, Some(ColorRef::WHITE));
            }
            other => panic!("unexpected intents: {other:?}"),
        }
        assert!((dc.state().position - DVec2::new(20.0, 40.0)).length() < 1e-9);

        let blank = ExtTextOut {
            chars: "  ".encode_utf16().collect(),
            ..text
        };
        assert!(apply(&mut dc, Record::ExtTextOutW(blank)).is_empty());
    }

    #[test]
    fn pattern_blits_follow_raster_operation() {
        let mut dc = context();
        let blt = |rop: u32| Blt {
            bounds: RectL::default(),
            dest: PointL::new(0, 0),
            dest_size: SizeL::new(10, 10),
            rop,
            src: PointL::new(0, 0),
            src_size: SizeL::new(10, 10),
            src_xform: XForm::IDENTITY,
            bk_color: ColorRef::WHITE,
            usage: 0,
            bitmap: None,
        };
        let black = apply(&mut dc, Record::BitBlt(blt(rop::BLACKNESS)));
        assert!(matches!(
            black.as_slice(),
            [DrawIntent::Rectangle {
                fill: Some(Fill::Solid(ColorRef::BLACK)),
                stroke: None,
                ..
            }]
        ));
        assert!(apply(&mut dc, Record::BitBlt(blt(0x0055_0009))).is_empty());
    }

    #[test]
    fn overflowing_blit_destination_is_rejected() {
        let mut dc = context();
        let stretch = StretchDiBits {
            bounds: RectL::default(),
            dest: PointL::new(i32::MAX, 0),
            src: PointL::new(0, 0),
            src_size: SizeL::new(10, 10),
            usage: 0,
            rop: rop::PATCOPY,
            dest_size: SizeL::new(10, 10),
            bitmap: None,
        };
        assert!(matches!(
            dc.apply(&Record::StretchDiBits(stretch.clone())),
            Err(EngineError::InvalidArgument(_))
        ));
        let set = SetDiBitsToDevice {
            bounds: RectL::default(),
            dest: PointL::new(0, i32::MAX),
            src: PointL::new(0, 0),
            src_size: SizeL::new(1, 1),
            usage: 0,
            start_scan: 0,
            scan_count: 1,
            bitmap: Some(emf_core::bitmap::Dib {
                header: emf_core::bitmap::BitmapInfoHeader {
                    header_size: emf_core::bitmap::INFO_HEADER_SIZE,
                    width: 1,
                    height: 1,
                    planes: 1,
                    bit_count: 24,
                    ..Default::default()
                },
                color_data: Vec::new(),
                bits: vec![0; 4],
            }),
        };
        assert!(matches!(
            dc.apply(&Record::SetDiBitsToDevice(set)),
            Err(EngineError::InvalidArgument(_))
        ));
        let fits = StretchDiBits {
            dest: PointL::new(i32::MAX - 10, 0),
            ..stretch
        };
        assert_eq!(apply(&mut dc, Record::StretchDiBits(fits)).len(), 1);
    }

    #[test]
    fn angle_arc_with_unbounded_sweep_is_contained() {
        let mut dc = context();
        let huge = apply(&mut dc, Record::AngleArc {
            center: PointL::new(50, 50),
            radius: 10,
            start_angle: 0.0,
            sweep_angle: f32::MAX,
        });
        match huge.as_slice() {
            [DrawIntent::Path { path, .. }] => assert!(path.segments().len() <= 10),
            other => panic!("unexpected intents: {other:?}"),
        }
        let before = dc.state().position;
        assert!(matches!(
            dc.apply(&Record::AngleArc {
                center: PointL::new(50, 50),
                radius: 10,
                start_angle: 0.0,
                sweep_angle: f32::INFINITY,
            }),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(dc.state().position, before);
    }

    #[test]
    fn copy_clip_region_resets() {
        let mut dc = context();
        apply(&mut dc, Record::ExcludeClipRect {
            clip: RectL::new(0, 0, 5, 5),
        });
        apply(&mut dc, Record::SetMetaRgn);
        apply(&mut dc, Record::IntersectClipRect {
            clip: RectL::new(0, 0, 50, 50),
        });
        let reset = apply(&mut dc, Record::ExtSelectClipRgn {
            mode: 5,
            region: None,
        });
        match reset.as_slice() {
            [DrawIntent::Clip(region)] => {
                assert!(region.current.is_empty());
                assert_eq!(region.meta.len(), 1);
            }
            other => panic!("unexpected intents: {other:?}"),
        }
        apply(&mut dc, Record::IntersectClipRect {
            clip: RectL::new(0, 0, 50, 50),
        });
        let with_region = apply(&mut dc, Record::ExtSelectClipRgn {
            mode: 5,
            region: Some(Region {
                bounds: RectL::new(0, 0, 10, 10),
                rects: vec![RectL::new(0, 0, 10, 10)],
            }),
        });
        match with_region.as_slice() {
            [DrawIntent::Clip(region)] => assert!(region.current.is_empty()),
            other => panic!("unexpected intents: {other:?}"),
        }
        assert!(dc.apply(&Record::ExtSelectClipRgn {
            mode: 1,
            region: None
        })
        .is_err());
    }
}
