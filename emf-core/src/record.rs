//! EMF 记录的数据模型：每个变体只携带线格式为该记录定义的字段。

use serde::{Deserialize, Serialize};

use crate::bitmap::Dib;
use crate::color::ColorRef;
use crate::geometry::{PointL, RectL, SizeL, XForm};
use crate::object::{Font, PaletteEntry, Pen};

pub mod record_type {
    pub const HEADER: u32 = 0x01;
    pub const POLYBEZIER: u32 = 0x02;
    pub const POLYGON: u32 = 0x03;
    pub const POLYLINE: u32 = 0x04;
    pub const POLYBEZIERTO: u32 = 0x05;
    pub const POLYLINETO: u32 = 0x06;
    pub const POLYPOLYLINE: u32 = 0x07;
    pub const POLYPOLYGON: u32 = 0x08;
    pub const SETWINDOWEXTEX: u32 = 0x09;
    pub const SETWINDOWORGEX: u32 = 0x0A;
    pub const SETVIEWPORTEXTEX: u32 = 0x0B;
    pub const SETVIEWPORTORGEX: u32 = 0x0C;
    pub const SETBRUSHORGEX: u32 = 0x0D;
    pub const EOF: u32 = 0x0E;
    pub const SETPIXELV: u32 = 0x0F;
    pub const SETMAPPERFLAGS: u32 = 0x10;
    pub const SETMAPMODE: u32 = 0x11;
    pub const SETBKMODE: u32 = 0x12;
    pub const SETPOLYFILLMODE: u32 = 0x13;
    pub const SETROP2: u32 = 0x14;
    pub const SETSTRETCHBLTMODE: u32 = 0x15;
    pub const SETTEXTALIGN: u32 = 0x16;
    pub const SETCOLORADJUSTMENT: u32 = 0x17;
    pub const SETTEXTCOLOR: u32 = 0x18;
    pub const SETBKCOLOR: u32 = 0x19;
    pub const OFFSETCLIPRGN: u32 = 0x1A;
    pub const MOVETOEX: u32 = 0x1B;
    pub const SETMETARGN: u32 = 0x1C;
    pub const EXCLUDECLIPRECT: u32 = 0x1D;
    pub const INTERSECTCLIPRECT: u32 = 0x1E;
    pub const SCALEVIEWPORTEXTEX: u32 = 0x1F;
    pub const SCALEWINDOWEXTEX: u32 = 0x20;
    pub const SAVEDC: u32 = 0x21;
    pub const RESTOREDC: u32 = 0x22;
    pub const SETWORLDTRANSFORM: u32 = 0x23;
    pub const MODIFYWORLDTRANSFORM: u32 = 0x24;
    pub const SELECTOBJECT: u32 = 0x25;
    pub const CREATEPEN: u32 = 0x26;
    pub const CREATEBRUSHINDIRECT: u32 = 0x27;
    pub const DELETEOBJECT: u32 = 0x28;
    pub const ANGLEARC: u32 = 0x29;
    pub const ELLIPSE: u32 = 0x2A;
    pub const RECTANGLE: u32 = 0x2B;
    pub const ROUNDRECT: u32 = 0x2C;
    pub const ARC: u32 = 0x2D;
    pub const CHORD: u32 = 0x2E;
    pub const PIE: u32 = 0x2F;
    pub const SELECTPALETTE: u32 = 0x30;
    pub const CREATEPALETTE: u32 = 0x31;
    pub const SETPALETTEENTRIES: u32 = 0x32;
    pub const RESIZEPALETTE: u32 = 0x33;
    pub const REALIZEPALETTE: u32 = 0x34;
    pub const EXTFLOODFILL: u32 = 0x35;
    pub const LINETO: u32 = 0x36;
    pub const ARCTO: u32 = 0x37;
    pub const POLYDRAW: u32 = 0x38;
    pub const SETARCDIRECTION: u32 = 0x39;
    pub const SETMITERLIMIT: u32 = 0x3A;
    pub const BEGINPATH: u32 = 0x3B;
    pub const ENDPATH: u32 = 0x3C;
    pub const CLOSEFIGURE: u32 = 0x3D;
    pub const FILLPATH: u32 = 0x3E;
    pub const STROKEANDFILLPATH: u32 = 0x3F;
    pub const STROKEPATH: u32 = 0x40;
    pub const FLATTENPATH: u32 = 0x41;
    pub const WIDENPATH: u32 = 0x42;
    pub const SELECTCLIPPATH: u32 = 0x43;
    pub const ABORTPATH: u32 = 0x44;
    pub const GDICOMMENT: u32 = 0x46;
    pub const FILLRGN: u32 = 0x47;
    pub const FRAMERGN: u32 = 0x48;
    pub const INVERTRGN: u32 = 0x49;
    pub const PAINTRGN: u32 = 0x4A;
    pub const EXTSELECTCLIPRGN: u32 = 0x4B;
    pub const BITBLT: u32 = 0x4C;
    pub const STRETCHBLT: u32 = 0x4D;
    pub const MASKBLT: u32 = 0x4E;
    pub const PLGBLT: u32 = 0x4F;
    pub const SETDIBITSTODEVICE: u32 = 0x50;
    pub const STRETCHDIBITS: u32 = 0x51;
    pub const EXTCREATEFONTINDIRECTW: u32 = 0x52;
    pub const EXTTEXTOUTA: u32 = 0x53;
    pub const EXTTEXTOUTW: u32 = 0x54;
    pub const POLYBEZIER16: u32 = 0x55;
    pub const POLYGON16: u32 = 0x56;
    pub const POLYLINE16: u32 = 0x57;
    pub const POLYBEZIERTO16: u32 = 0x58;
    pub const POLYLINETO16: u32 = 0x59;
    pub const POLYPOLYLINE16: u32 = 0x5A;
    pub const POLYPOLYGON16: u32 = 0x5B;
    pub const POLYDRAW16: u32 = 0x5C;
    pub const CREATEMONOBRUSH: u32 = 0x5D;
    pub const CREATEDIBPATTERNBRUSHPT: u32 = 0x5E;
    pub const EXTCREATEPEN: u32 = 0x5F;
    pub const POLYTEXTOUTA: u32 = 0x60;
    pub const POLYTEXTOUTW: u32 = 0x61;
    pub const SETICMMODE: u32 = 0x62;
    pub const CREATECOLORSPACE: u32 = 0x63;
    pub const SETCOLORSPACE: u32 = 0x64;
    pub const DELETECOLORSPACE: u32 = 0x65;
    pub const GLSRECORD: u32 = 0x66;
    pub const GLSBOUNDEDRECORD: u32 = 0x67;
    pub const PIXELFORMAT: u32 = 0x68;
    pub const DRAWESCAPE: u32 = 0x69;
    pub const EXTESCAPE: u32 = 0x6A;
    pub const SMALLTEXTOUT: u32 = 0x6C;
    pub const FORCEUFIMAPPING: u32 = 0x6D;
    pub const NAMEDESCAPE: u32 = 0x6E;
    pub const COLORCORRECTPALETTE: u32 = 0x6F;
    pub const SETICMPROFILEA: u32 = 0x70;
    pub const SETICMPROFILEW: u32 = 0x71;
    pub const ALPHABLEND: u32 = 0x72;
    pub const SETLAYOUT: u32 = 0x73;
    pub const TRANSPARENTBLT: u32 = 0x74;
    pub const GRADIENTFILL: u32 = 0x76;
    pub const SETLINKEDUFIS: u32 = 0x77;
    pub const SETTEXTJUSTIFICATION: u32 = 0x78;
    pub const COLORMATCHTOTARGETW: u32 = 0x79;
    pub const CREATECOLORSPACEW: u32 = 0x7A;

    /// 记录类型的规范名称，未知类型返回 `EMR_UNKNOWN`。
    pub fn name(record_type: u32) -> &'static str {
        known_name(record_type).unwrap_or("EMR_UNKNOWN")
    }

    /// 是否为格式定义过的记录类型，无论本库能否解码。
    pub fn is_known(record_type: u32) -> bool {
        known_name(record_type).is_some()
    }

    fn known_name(record_type: u32) -> Option<&'static str> {
        match record_type {
            HEADER => Some("EMR_HEADER"),
            POLYBEZIER => Some("EMR_POLYBEZIER"),
            POLYGON => Some("EMR_POLYGON"),
            POLYLINE => Some("EMR_POLYLINE"),
            POLYBEZIERTO => Some("EMR_POLYBEZIERTO"),
            POLYLINETO => Some("EMR_POLYLINETO"),
            POLYPOLYLINE => Some("EMR_POLYPOLYLINE"),
            POLYPOLYGON => Some("EMR_POLYPOLYGON"),
            SETWINDOWEXTEX => Some("EMR_SETWINDOWEXTEX"),
            SETWINDOWORGEX => Some("EMR_SETWINDOWORGEX"),
            SETVIEWPORTEXTEX => Some("EMR_SETVIEWPORTEXTEX"),
            SETVIEWPORTORGEX => Some("EMR_SETVIEWPORTORGEX"),
            SETBRUSHORGEX => Some("EMR_SETBRUSHORGEX"),
            EOF => Some("EMR_EOF"),
            SETPIXELV => Some("EMR_SETPIXELV"),
            SETMAPPERFLAGS => Some("EMR_SETMAPPERFLAGS"),
            SETMAPMODE => Some("EMR_SETMAPMODE"),
            SETBKMODE => Some("EMR_SETBKMODE"),
            SETPOLYFILLMODE => Some("EMR_SETPOLYFILLMODE"),
            SETROP2 => Some("EMR_SETROP2"),
            SETSTRETCHBLTMODE => Some("EMR_SETSTRETCHBLTMODE"),
            SETTEXTALIGN => Some("EMR_SETTEXTALIGN"),
            SETCOLORADJUSTMENT => Some("EMR_SETCOLORADJUSTMENT"),
            SETTEXTCOLOR => Some("EMR_SETTEXTCOLOR"),
            SETBKCOLOR => Some("EMR_SETBKCOLOR"),
            OFFSETCLIPRGN => Some("EMR_OFFSETCLIPRGN"),
            MOVETOEX => Some("EMR_MOVETOEX"),
            SETMETARGN => Some("EMR_SETMETARGN"),
            EXCLUDECLIPRECT => Some("EMR_EXCLUDECLIPRECT"),
            INTERSECTCLIPRECT => Some("EMR_INTERSECTCLIPRECT"),
            SCALEVIEWPORTEXTEX => Some("EMR_SCALEVIEWPORTEXTEX"),
            SCALEWINDOWEXTEX => Some("EMR_SCALEWINDOWEXTEX"),
            SAVEDC => Some("EMR_SAVEDC"),
            RESTOREDC => Some("EMR_RESTOREDC"),
            SETWORLDTRANSFORM => Some("EMR_SETWORLDTRANSFORM"),
            MODIFYWORLDTRANSFORM => Some("EMR_MODIFYWORLDTRANSFORM"),
            SELECTOBJECT => Some("EMR_SELECTOBJECT"),
            CREATEPEN => Some("EMR_CREATEPEN"),
            CREATEBRUSHINDIRECT => Some("EMR_CREATEBRUSHINDIRECT"),
            DELETEOBJECT => Some("EMR_DELETEOBJECT"),
            ANGLEARC => Some("EMR_ANGLEARC"),
            ELLIPSE => Some("EMR_ELLIPSE"),
            RECTANGLE => Some("EMR_RECTANGLE"),
            ROUNDRECT => Some("EMR_ROUNDRECT"),
            ARC => Some("EMR_ARC"),
            CHORD => Some("EMR_CHORD"),
            PIE => Some("EMR_PIE"),
            SELECTPALETTE => Some("EMR_SELECTPALETTE"),
            CREATEPALETTE => Some("EMR_CREATEPALETTE"),
            SETPALETTEENTRIES => Some("EMR_SETPALETTEENTRIES"),
            RESIZEPALETTE => Some("EMR_RESIZEPALETTE"),
            REALIZEPALETTE => Some("EMR_REALIZEPALETTE"),
            EXTFLOODFILL => Some("EMR_EXTFLOODFILL"),
            LINETO => Some("EMR_LINETO"),
            ARCTO => Some("EMR_ARCTO"),
            POLYDRAW => Some("EMR_POLYDRAW"),
            SETARCDIRECTION => Some("EMR_SETARCDIRECTION"),
            SETMITERLIMIT => Some("EMR_SETMITERLIMIT"),
            BEGINPATH => Some("EMR_BEGINPATH"),
            ENDPATH => Some("EMR_ENDPATH"),
            CLOSEFIGURE => Some("EMR_CLOSEFIGURE"),
            FILLPATH => Some("EMR_FILLPATH"),
            STROKEANDFILLPATH => Some("EMR_STROKEANDFILLPATH"),
            STROKEPATH => Some("EMR_STROKEPATH"),
            FLATTENPATH => Some("EMR_FLATTENPATH"),
            WIDENPATH => Some("EMR_WIDENPATH"),
            SELECTCLIPPATH => Some("EMR_SELECTCLIPPATH"),
            ABORTPATH => Some("EMR_ABORTPATH"),
            GDICOMMENT => Some("EMR_GDICOMMENT"),
            FILLRGN => Some("EMR_FILLRGN"),
            FRAMERGN => Some("EMR_FRAMERGN"),
            INVERTRGN => Some("EMR_INVERTRGN"),
            PAINTRGN => Some("EMR_PAINTRGN"),
            EXTSELECTCLIPRGN => Some("EMR_EXTSELECTCLIPRGN"),
            BITBLT => Some("EMR_BITBLT"),
            STRETCHBLT => Some("EMR_STRETCHBLT"),
            MASKBLT => Some("EMR_MASKBLT"),
            PLGBLT => Some("EMR_PLGBLT"),
            SETDIBITSTODEVICE => Some("EMR_SETDIBITSTODEVICE"),
            STRETCHDIBITS => Some("EMR_STRETCHDIBITS"),
            EXTCREATEFONTINDIRECTW => Some("EMR_EXTCREATEFONTINDIRECTW"),
            EXTTEXTOUTA => Some("EMR_EXTTEXTOUTA"),
            EXTTEXTOUTW => Some("EMR_EXTTEXTOUTW"),
            POLYBEZIER16 => Some("EMR_POLYBEZIER16"),
            POLYGON16 => Some("EMR_POLYGON16"),
            POLYLINE16 => Some("EMR_POLYLINE16"),
            POLYBEZIERTO16 => Some("EMR_POLYBEZIERTO16"),
            POLYLINETO16 => Some("EMR_POLYLINETO16"),
            POLYPOLYLINE16 => Some("EMR_POLYPOLYLINE16"),
            POLYPOLYGON16 => Some("EMR_POLYPOLYGON16"),
            POLYDRAW16 => Some("EMR_POLYDRAW16"),
            CREATEMONOBRUSH => Some("EMR_CREATEMONOBRUSH"),
            CREATEDIBPATTERNBRUSHPT => Some("EMR_CREATEDIBPATTERNBRUSHPT"),
            EXTCREATEPEN => Some("EMR_EXTCREATEPEN"),
            POLYTEXTOUTA => Some("EMR_POLYTEXTOUTA"),
            POLYTEXTOUTW => Some("EMR_POLYTEXTOUTW"),
            SETICMMODE => Some("EMR_SETICMMODE"),
            CREATECOLORSPACE => Some("EMR_CREATECOLORSPACE"),
            SETCOLORSPACE => Some("EMR_SETCOLORSPACE"),
            DELETECOLORSPACE => Some("EMR_DELETECOLORSPACE"),
            GLSRECORD => Some("EMR_GLSRECORD"),
            GLSBOUNDEDRECORD => Some("EMR_GLSBOUNDEDRECORD"),
            PIXELFORMAT => Some("EMR_PIXELFORMAT"),
            DRAWESCAPE => Some("EMR_DRAWESCAPE"),
            EXTESCAPE => Some("EMR_EXTESCAPE"),
            SMALLTEXTOUT => Some("EMR_SMALLTEXTOUT"),
            FORCEUFIMAPPING => Some("EMR_FORCEUFIMAPPING"),
            NAMEDESCAPE => Some("EMR_NAMEDESCAPE"),
            COLORCORRECTPALETTE => Some("EMR_COLORCORRECTPALETTE"),
            SETICMPROFILEA => Some("EMR_SETICMPROFILEA"),
            SETICMPROFILEW => Some("EMR_SETICMPROFILEW"),
            ALPHABLEND => Some("EMR_ALPHABLEND"),
            SETLAYOUT => Some("EMR_SETLAYOUT"),
            TRANSPARENTBLT => Some("EMR_TRANSPARENTBLT"),
            GRADIENTFILL => Some("EMR_GRADIENTFILL"),
            SETLINKEDUFIS => Some("EMR_SETLINKEDUFIS"),
            SETTEXTJUSTIFICATION => Some("EMR_SETTEXTJUSTIFICATION"),
            COLORMATCHTOTARGETW => Some("EMR_COLORMATCHTOTARGETW"),
            CREATECOLORSPACEW => Some("EMR_CREATECOLORSPACEW"),
            _ => Some("EMR_UNKNOWN"),
        }
    }
}

/// 头部签名 " EMF"。
pub const EMF_SIGNATURE: u32 = 0x464D_4520;

/// 头部扩展 1：像素格式描述块的位置与 OpenGL 标志。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelFormatInfo {
    pub size: u32,
    pub offset: u32,
    pub opengl: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// 设备单位下的图像范围（含边界）。
    pub bounds: RectL,
    /// 0.01 毫米单位下的图像范围。
    pub frame: RectL,
    pub signature: u32,
    pub version: u32,
    pub bytes: u32,
    pub records: u32,
    pub handles: u16,
    pub reserved: u16,
    pub description_len: u32,
    pub description_offset: u32,
    pub palette_entries: u32,
    pub device: SizeL,
    pub millimeters: SizeL,
    pub pixel_format: Option<PixelFormatInfo>,
    pub micrometers: Option<SizeL>,
    pub description: Option<String>,
    /// 根据偏移推导出的实际头部长度。
    pub header_size: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Eof {
    pub palette: Vec<PaletteEntry>,
    pub size_last: u32,
}

/// 点序列类记录：包围盒 + 点数组。16 位变体在解码时已拓宽。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poly {
    pub bounds: RectL,
    pub points: Vec<PointL>,
}

/// 多折线/多多边形：每个图形的点数 + 连续存放的全部点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyPoly {
    pub bounds: RectL,
    pub counts: Vec<u32>,
    pub points: Vec<PointL>,
}

impl PolyPoly {
    /// 按 `counts` 切分出每个图形的点；点不足时截断。
    pub fn figures(&self) -> impl Iterator<Item = &[PointL]> + '_ {
        let mut start = 0usize;
        self.counts.iter().map(move |&count| {
            let begin = start.min(self.points.len());
            let end = (start + count as usize).min(self.points.len());
            start += count as usize;
            &self.points[begin..end]
        })
    }
}

/// `ScaleWindowExtEx` / `ScaleViewportExtEx` 的有理缩放因子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleExt {
    pub x_num: i32,
    pub x_denom: i32,
    pub y_num: i32,
    pub y_denom: i32,
}

/// `Arc`/`ArcTo`/`Chord`/`Pie` 共用的外接框与径向端点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcBox {
    pub bounds: RectL,
    pub start: PointL,
    pub end: PointL,
}

/// RGNDATA：包围盒 + 矩形列表。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    pub bounds: RectL,
    pub rects: Vec<RectL>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBrush {
    pub style: u32,
    pub color: ColorRef,
    pub hatch: u32,
}

/// `BitBlt` 与 `StretchBlt` 的共同字段；`BitBlt` 的源尺寸等于目标尺寸。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blt {
    pub bounds: RectL,
    pub dest: PointL,
    pub dest_size: SizeL,
    pub rop: u32,
    pub src: PointL,
    pub src_size: SizeL,
    pub src_xform: XForm,
    pub bk_color: ColorRef,
    pub usage: u32,
    pub bitmap: Option<Dib>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskBlt {
    pub blt: Blt,
    pub mask_origin: PointL,
    pub mask_usage: u32,
    pub mask: Option<Dib>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDiBitsToDevice {
    pub bounds: RectL,
    pub dest: PointL,
    pub src: PointL,
    pub src_size: SizeL,
    pub usage: u32,
    pub start_scan: u32,
    pub scan_count: u32,
    pub bitmap: Option<Dib>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StretchDiBits {
    pub bounds: RectL,
    pub dest: PointL,
    pub src: PointL,
    pub src_size: SizeL,
    pub usage: u32,
    pub rop: u32,
    pub dest_size: SizeL,
    pub bitmap: Option<Dib>,
}

pub mod text_options {
    pub const ETO_OPAQUE: u32 = 0x0002;
    pub const ETO_CLIPPED: u32 = 0x0004;
    pub const ETO_GLYPH_INDEX: u32 = 0x0010;
    pub const ETO_NO_RECT: u32 = 0x0100;
    pub const ETO_PDY: u32 = 0x2000;
}

/// `ExtTextOutA/W`：字符以 16 位码元保存，A 变体按字节拓宽。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtTextOut {
    pub bounds: RectL,
    pub graphics_mode: u32,
    pub ex_scale: f32,
    pub ey_scale: f32,
    pub reference: PointL,
    pub options: u32,
    pub rectangle: Option<RectL>,
    pub chars: Vec<u16>,
    pub dx: Vec<i32>,
}

impl ExtTextOut {
    pub fn text(&self) -> String {
        String::from_utf16_lossy(&self.chars)
    }

    /// 每个字符的水平步进；`ETO_PDY` 时步进数组为 (dx, dy) 交替存放。
    pub fn advances(&self) -> Vec<i32> {
        if self.options & text_options::ETO_PDY != 0 {
            self.dx.iter().step_by(2).copied().collect()
        } else {
            self.dx.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternBrush {
    pub handle: u32,
    pub usage: u32,
    pub bitmap: Option<Dib>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Header(Box<Header>),
    Eof(Eof),

    PolyBezier(Poly),
    Polygon(Poly),
    Polyline(Poly),
    PolyBezierTo(Poly),
    PolylineTo(Poly),
    PolyPolyline(PolyPoly),
    PolyPolygon(PolyPoly),
    PolyBezier16(Poly),
    Polygon16(Poly),
    Polyline16(Poly),
    PolyBezierTo16(Poly),
    PolylineTo16(Poly),
    PolyPolyline16(PolyPoly),
    PolyPolygon16(PolyPoly),

    SetWindowExtEx { extent: SizeL },
    SetWindowOrgEx { origin: PointL },
    SetViewportExtEx { extent: SizeL },
    SetViewportOrgEx { origin: PointL },
    SetBrushOrgEx { origin: PointL },
    ScaleViewportExtEx(ScaleExt),
    ScaleWindowExtEx(ScaleExt),
    SetMapMode { mode: u32 },

    SetPixelV { point: PointL, color: ColorRef },
    SetMapperFlags { flags: u32 },
    SetBkMode { mode: u32 },
    SetPolyFillMode { mode: u32 },
    SetRop2 { mode: u32 },
    SetStretchBltMode { mode: u32 },
    SetTextAlign { mode: u32 },
    SetTextColor { color: ColorRef },
    SetBkColor { color: ColorRef },
    SetIcmMode { mode: u32 },
    SetArcDirection { direction: u32 },
    SetLayout { layout: u32 },
    SetMiterLimit { limit: u32 },
    SetTextJustification { break_extra: i32, break_count: i32 },

    OffsetClipRgn { offset: PointL },
    SetMetaRgn,
    ExcludeClipRect { clip: RectL },
    IntersectClipRect { clip: RectL },
    ExtSelectClipRgn { mode: u32, region: Option<Region> },
    SelectClipPath { mode: u32 },

    SaveDc,
    RestoreDc { saved_dc: i32 },
    SetWorldTransform { xform: XForm },
    ModifyWorldTransform { xform: XForm, mode: u32 },

    SelectObject { handle: u32 },
    DeleteObject { handle: u32 },
    SelectPalette { handle: u32 },
    RealizePalette,
    CreatePen { handle: u32, pen: Pen },
    ExtCreatePen { handle: u32, pen: Pen, bitmap: Option<Dib> },
    CreateBrushIndirect { handle: u32, brush: LogBrush },
    CreateMonoBrush(PatternBrush),
    CreateDibPatternBrushPt(PatternBrush),
    CreatePalette { handle: u32, version: u16, entries: Vec<PaletteEntry> },
    SetPaletteEntries { handle: u32, start: u32, entries: Vec<PaletteEntry> },
    ResizePalette { handle: u32, entries: u32 },
    ExtCreateFontIndirectW { handle: u32, font: Font },

    MoveToEx { point: PointL },
    LineTo { point: PointL },
    AngleArc { center: PointL, radius: u32, start_angle: f32, sweep_angle: f32 },
    Ellipse { bounds: RectL },
    Rectangle { bounds: RectL },
    RoundRect { bounds: RectL, corner: SizeL },
    Arc(ArcBox),
    ArcTo(ArcBox),
    Chord(ArcBox),
    Pie(ArcBox),

    BeginPath,
    EndPath,
    CloseFigure,
    FillPath { bounds: RectL },
    StrokeAndFillPath { bounds: RectL },
    StrokePath { bounds: RectL },
    FlattenPath,
    WidenPath,
    AbortPath,

    FillRgn { bounds: RectL, brush: u32, region: Region },
    FrameRgn { bounds: RectL, brush: u32, width: i32, height: i32, region: Region },
    InvertRgn { bounds: RectL, region: Region },
    PaintRgn { bounds: RectL, region: Region },

    BitBlt(Blt),
    StretchBlt(Blt),
    MaskBlt(MaskBlt),
    SetDiBitsToDevice(SetDiBitsToDevice),
    StretchDiBits(StretchDiBits),

    ExtTextOutA(ExtTextOut),
    ExtTextOutW(ExtTextOut),

    Comment { data: Vec<u8> },

    /// 未知或未实现的记录：只保留类型与声明长度。
    Opaque { record_type: u32, size: u32 },
}

impl Record {
    pub fn record_type(&self) -> u32 {
        use record_type as rt;
        match self {
            Record::Header(_) => rt::HEADER,
            Record::Eof(_) => rt::EOF,
            Record::PolyBezier(_) => rt::POLYBEZIER,
            Record::Polygon(_) => rt::POLYGON,
            Record::Polyline(_) => rt::POLYLINE,
            Record::PolyBezierTo(_) => rt::POLYBEZIERTO,
            Record::PolylineTo(_) => rt::POLYLINETO,
            Record::PolyPolyline(_) => rt::POLYPOLYLINE,
            Record::PolyPolygon(_) => rt::POLYPOLYGON,
            Record::PolyBezier16(_) => rt::POLYBEZIER16,
            Record::Polygon16(_) => rt::POLYGON16,
            Record::Polyline16(_) => rt::POLYLINE16,
            Record::PolyBezierTo16(_) => rt::POLYBEZIERTO16,
            Record::PolylineTo16(_) => rt::POLYLINETO16,
            Record::PolyPolyline16(_) => rt::POLYPOLYLINE16,
            Record::PolyPolygon16(_) => rt::POLYPOLYGON16,
            Record::SetWindowExtEx { .. } => rt::SETWINDOWEXTEX,
            Record::SetWindowOrgEx { .. } => rt::SETWINDOWORGEX,
            Record::SetViewportExtEx { .. } => rt::SETVIEWPORTEXTEX,
            Record::SetViewportOrgEx { .. } => rt::SETVIEWPORTORGEX,
            Record::SetBrushOrgEx { .. } => rt::SETBRUSHORGEX,
            Record::ScaleViewportExtEx(_) => rt::SCALEVIEWPORTEXTEX,
            Record::ScaleWindowExtEx(_) => rt::SCALEWINDOWEXTEX,
            Record::SetMapMode { .. } => rt::SETMAPMODE,
            Record::SetPixelV { .. } => rt::SETPIXELV,
            Record::SetMapperFlags { .. } => rt::SETMAPPERFLAGS,
            Record::SetBkMode { .. } => rt::SETBKMODE,
            Record::SetPolyFillMode { .. } => rt::SETPOLYFILLMODE,
            Record::SetRop2 { .. } => rt::SETROP2,
            Record::SetStretchBltMode { .. } => rt::SETSTRETCHBLTMODE,
            Record::SetTextAlign { .. } => rt::SETTEXTALIGN,
            Record::SetTextColor { .. } => rt::SETTEXTCOLOR,
            Record::SetBkColor { .. } => rt::SETBKCOLOR,
            Record::SetIcmMode { .. } => rt::SETICMMODE,
            Record::SetArcDirection { .. } => rt::SETARCDIRECTION,
            Record::SetLayout { .. } => rt::SETLAYOUT,
            Record::SetMiterLimit { .. } => rt::SETMITERLIMIT,
            Record::SetTextJustification { .. } => rt::SETTEXTJUSTIFICATION,
            Record::OffsetClipRgn { .. } => rt::OFFSETCLIPRGN,
            Record::SetMetaRgn => rt::SETMETARGN,
            Record::ExcludeClipRect { .. } => rt::EXCLUDECLIPRECT,
            Record::IntersectClipRect { .. } => rt::INTERSECTCLIPRECT,
            Record::ExtSelectClipRgn { .. } => rt::EXTSELECTCLIPRGN,
            Record::SelectClipPath { .. } => rt::SELECTCLIPPATH,
            Record::SaveDc => rt::SAVEDC,
            Record::RestoreDc { .. } => rt::RESTOREDC,
            Record::SetWorldTransform { .. } => rt::SETWORLDTRANSFORM,
            Record::ModifyWorldTransform { .. } => rt::MODIFYWORLDTRANSFORM,
            Record::SelectObject { .. } => rt::SELECTOBJECT,
            Record::DeleteObject { .. } => rt::DELETEOBJECT,
            Record::SelectPalette { .. } => rt::SELECTPALETTE,
            Record::RealizePalette => rt::REALIZEPALETTE,
            Record::CreatePen { .. } => rt::CREATEPEN,
            Record::ExtCreatePen { .. } => rt::EXTCREATEPEN,
            Record::CreateBrushIndirect { .. } => rt::CREATEBRUSHINDIRECT,
            Record::CreateMonoBrush(_) => rt::CREATEMONOBRUSH,
            Record::CreateDibPatternBrushPt(_) => rt::CREATEDIBPATTERNBRUSHPT,
            Record::CreatePalette { .. } => rt::CREATEPALETTE,
            Record::SetPaletteEntries { .. } => rt::SETPALETTEENTRIES,
            Record::ResizePalette { .. } => rt::RESIZEPALETTE,
            Record::ExtCreateFontIndirectW { .. } => rt::EXTCREATEFONTINDIRECTW,
            Record::MoveToEx { .. } => rt::MOVETOEX,
            Record::LineTo { .. } => rt::LINETO,
            Record::AngleArc { .. } => rt::ANGLEARC,
            Record::Ellipse { .. } => rt::ELLIPSE,
            Record::Rectangle { .. } => rt::RECTANGLE,
            Record::RoundRect { .. } => rt::ROUNDRECT,
            Record::Arc(_) => rt::ARC,
            Record::ArcTo(_) => rt::ARCTO,
            Record::Chord(_) => rt::CHORD,
            Record::Pie(_) => rt::PIE,
            Record::BeginPath => rt::BEGINPATH,
            Record::EndPath => rt::ENDPATH,
            Record::CloseFigure => rt::CLOSEFIGURE,
            Record::FillPath { .. } => rt::FILLPATH,
            Record::StrokeAndFillPath { .. } => rt::STROKEANDFILLPATH,
            Record::StrokePath { .. } => rt::STROKEPATH,
            Record::FlattenPath => rt::FLATTENPATH,
            Record::WidenPath => rt::WIDENPATH,
            Record::AbortPath => rt::ABORTPATH,
            Record::FillRgn { .. } => rt::FILLRGN,
            Record::FrameRgn { .. } => rt::FRAMERGN,
            Record::InvertRgn { .. } => rt::INVERTRGN,
            Record::PaintRgn { .. } => rt::PAINTRGN,
            Record::BitBlt(_) => rt::BITBLT,
            Record::StretchBlt(_) => rt::STRETCHBLT,
            Record::MaskBlt(_) => rt::MASKBLT,
            Record::SetDiBitsToDevice(_) => rt::SETDIBITSTODEVICE,
            Record::StretchDiBits(_) => rt::STRETCHDIBITS,
            Record::ExtTextOutA(_) => rt::EXTTEXTOUTA,
            Record::ExtTextOutW(_) => rt::EXTTEXTOUTW,
            Record::Comment { .. } => rt::GDICOMMENT,
            Record::Opaque { record_type, .. } => *record_type,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        record_type::name(self.record_type())
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        matches!(self, Record::Opaque { .. })
    }
}

/// 解码后的完整图元文件：头部、回放序列（不含头部与 EOF）以及可选的 EOF。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metafile {
    header: Header,
    records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eof: Option<Eof>,
}

impl Metafile {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            records: Vec::new(),
            eof: None,
        }
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[inline]
    pub fn eof(&self) -> Option<&Eof> {
        self.eof.as_ref()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn set_eof(&mut self, eof: Eof) {
        self.eof = Some(eof);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按记录名统计数量，按名称排序。
    pub fn record_histogram(&self) -> Vec<(&'static str, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.name()).or_insert(0usize) += 1;
        }
        counts.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poly_poly_figures_split_by_counts() {
        let poly = PolyPoly {
            bounds: RectL::default(),
            counts: vec![2, 3],
            points: (0..5).map(|i| PointL::new(i, i)).collect(),
        };
        let figures: Vec<_> = poly.figures().collect();
        assert_eq!(figures.len(), 2);
        assert_eq!(figures[0], &[PointL::new(0, 0), PointL::new(1, 1)]);
        assert_eq!(figures[1].len(), 3);
    }

    #[test]
    fn text_advances_skip_dy_entries() {
        let text = ExtTextOut {
            bounds: RectL::default(),
            graphics_mode: 1,
            ex_scale: 0.0,
            ey_scale: 0.0,
            reference: PointL::new(0, 0),
            options: text_options::ETO_PDY,
            rectangle: None,
            chars: "ab".encode_utf16().collect(),
            dx: vec![7, 0, 9, 1],
        };
        assert_eq!(text.text(), "ab");
        assert_eq!(text.advances(), vec![7, 9]);
    }

    #[test]
    fn opaque_records_keep_their_type() {
        let record = Record::Opaque {
            record_type: 0x75,
            size: 16,
        };
        assert_eq!(record.record_type(), 0x75);
        assert_eq!(record.name(), "EMR_UNKNOWN");
        assert!(!record_type::is_known(0x75));
        assert!(record_type::is_known(record_type::SAVEDC));
        assert!(record_type::is_known(record_type::CREATECOLORSPACEW));
        assert!(record.is_opaque());
        assert_eq!(Record::SaveDc.name(), "EMR_SAVEDC");
    }

    #[test]
    fn records_serialize_with_variant_tags() {
        let record = Record::Rectangle {
            bounds: RectL::new(10, 10, 50, 50),
        };
        let value = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(
            value,
            serde_json::json!({
                "Rectangle": {
                    "bounds": {"left": 10, "top": 10, "right": 50, "bottom": 50}
                }
            })
        );
    }
}
