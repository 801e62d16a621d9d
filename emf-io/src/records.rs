//! 记录类型到解码函数的分派表，以及各类记录体的解码。
//!
//! 每个解码函数进入时游标位于记录头之后（偏移 8），只读取该记录定义的字段；
//! 记录末尾的剩余字节由外层统一跳过。

use emf_core::object::{Font, Pen, brush_style};
use emf_core::record::{
    ArcBox, Blt, ExtTextOut, LogBrush, MaskBlt, Poly, PolyPoly, PatternBrush, Record, Region,
    ScaleExt, SetDiBitsToDevice, StretchDiBits, record_type as rt, text_options,
};

use crate::dib::{DibLocation, read_dib};
use crate::header::decode_eof;
use crate::reader::{RecordError, RecordReader};

pub(crate) type DecodeFn = fn(u32, &mut RecordReader<'_>) -> Result<Record, RecordError>;

/// 返回 `None` 的类型按不透明记录跳过。
pub(crate) fn decoder_for(record_type: u32) -> Option<DecodeFn> {
    let decode: DecodeFn = match record_type {
        rt::EOF => decode_eof,
        rt::POLYBEZIER | rt::POLYGON | rt::POLYLINE | rt::POLYBEZIERTO | rt::POLYLINETO => {
            decode_poly
        }
        rt::POLYBEZIER16
        | rt::POLYGON16
        | rt::POLYLINE16
        | rt::POLYBEZIERTO16
        | rt::POLYLINETO16 => decode_poly16,
        rt::POLYPOLYLINE | rt::POLYPOLYGON => decode_poly_poly,
        rt::POLYPOLYLINE16 | rt::POLYPOLYGON16 => decode_poly_poly16,
        rt::SETWINDOWEXTEX | rt::SETVIEWPORTEXTEX => decode_extent,
        rt::SETWINDOWORGEX
        | rt::SETVIEWPORTORGEX
        | rt::SETBRUSHORGEX
        | rt::OFFSETCLIPRGN
        | rt::MOVETOEX
        | rt::LINETO => decode_point,
        rt::SCALEVIEWPORTEXTEX | rt::SCALEWINDOWEXTEX => decode_scale_ext,
        rt::SETMAPMODE
        | rt::SETMAPPERFLAGS
        | rt::SETBKMODE
        | rt::SETPOLYFILLMODE
        | rt::SETROP2
        | rt::SETSTRETCHBLTMODE
        | rt::SETTEXTALIGN
        | rt::SETICMMODE
        | rt::SETARCDIRECTION
        | rt::SETLAYOUT
        | rt::SETMITERLIMIT
        | rt::SELECTOBJECT
        | rt::DELETEOBJECT
        | rt::SELECTPALETTE
        | rt::SELECTCLIPPATH
        | rt::RESTOREDC => decode_scalar,
        rt::SETTEXTCOLOR | rt::SETBKCOLOR => decode_color,
        rt::SETPIXELV => decode_set_pixel,
        rt::SETTEXTJUSTIFICATION => decode_text_justification,
        rt::SETMETARGN
        | rt::SAVEDC
        | rt::REALIZEPALETTE
        | rt::BEGINPATH
        | rt::ENDPATH
        | rt::CLOSEFIGURE
        | rt::FLATTENPATH
        | rt::WIDENPATH
        | rt::ABORTPATH => decode_marker,
        rt::EXCLUDECLIPRECT
        | rt::INTERSECTCLIPRECT
        | rt::ELLIPSE
        | rt::RECTANGLE
        | rt::FILLPATH
        | rt::STROKEANDFILLPATH
        | rt::STROKEPATH => decode_rect,
        rt::EXTSELECTCLIPRGN => decode_ext_select_clip_rgn,
        rt::SETWORLDTRANSFORM | rt::MODIFYWORLDTRANSFORM => decode_world_transform,
        rt::CREATEPEN => decode_create_pen,
        rt::EXTCREATEPEN => decode_ext_create_pen,
        rt::CREATEBRUSHINDIRECT => decode_create_brush,
        rt::CREATEMONOBRUSH | rt::CREATEDIBPATTERNBRUSHPT => decode_pattern_brush,
        rt::CREATEPALETTE => decode_create_palette,
        rt::SETPALETTEENTRIES => decode_set_palette_entries,
        rt::RESIZEPALETTE => decode_resize_palette,
        rt::EXTCREATEFONTINDIRECTW => decode_font,
        rt::ANGLEARC => decode_angle_arc,
        rt::ROUNDRECT => decode_round_rect,
        rt::ARC | rt::ARCTO | rt::CHORD | rt::PIE => decode_arc_box,
        rt::GDICOMMENT => decode_comment,
        rt::FILLRGN | rt::FRAMERGN | rt::INVERTRGN | rt::PAINTRGN => decode_region_paint,
        rt::BITBLT | rt::STRETCHBLT => decode_blt,
        rt::MASKBLT => decode_mask_blt,
        rt::SETDIBITSTODEVICE => decode_set_dibits,
        rt::STRETCHDIBITS => decode_stretch_dibits,
        rt::EXTTEXTOUTA | rt::EXTTEXTOUTW => decode_text_out,
        _ => return None,
    };
    Some(decode)
}

fn unexpected(record_type: u32) -> RecordError {
    RecordError::invalid(format!(
        "decoder invoked for unrelated type 0x{record_type:02X}"
    ))
}

fn decode_poly(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let bounds = r.rect_l()?;
    let count = r.u32()?;
    let points = r.array_here("aptl", count, 8, |r| r.point_l())?;
    let poly = Poly { bounds, points };
    Ok(match record_type {
        rt::POLYBEZIER => Record::PolyBezier(poly),
        rt::POLYGON => Record::Polygon(poly),
        rt::POLYLINE => Record::Polyline(poly),
        rt::POLYBEZIERTO => Record::PolyBezierTo(poly),
        rt::POLYLINETO => Record::PolylineTo(poly),
        other => return Err(unexpected(other)),
    })
}

fn decode_poly16(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let bounds = r.rect_l()?;
    let count = r.u32()?;
    let points = r.array_here("apts", count, 4, |r| r.point_s())?;
    let poly = Poly { bounds, points };
    Ok(match record_type {
        rt::POLYBEZIER16 => Record::PolyBezier16(poly),
        rt::POLYGON16 => Record::Polygon16(poly),
        rt::POLYLINE16 => Record::Polyline16(poly),
        rt::POLYBEZIERTO16 => Record::PolyBezierTo16(poly),
        rt::POLYLINETO16 => Record::PolylineTo16(poly),
        other => return Err(unexpected(other)),
    })
}

fn read_poly_poly(r: &mut RecordReader<'_>, point_size: u64) -> Result<PolyPoly, RecordError> {
    let bounds = r.rect_l()?;
    let figures = r.u32()?;
    let total = r.u32()?;
    let counts = r.array_here("aPolyCounts", figures, 4, |r| r.u32())?;
    let declared: u64 = counts.iter().map(|&count| u64::from(count)).sum();
    if declared != u64::from(total) {
        return Err(RecordError::invalid(format!(
            "figure counts sum to {declared} but {total} points are declared"
        )));
    }
    let points = if point_size == 8 {
        r.array_here("aptl", total, 8, |r| r.point_l())?
    } else {
        r.array_here("apts", total, 4, |r| r.point_s())?
    };
    Ok(PolyPoly {
        bounds,
        counts,
        points,
    })
}

fn decode_poly_poly(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let poly = read_poly_poly(r, 8)?;
    Ok(match record_type {
        rt::POLYPOLYLINE => Record::PolyPolyline(poly),
        rt::POLYPOLYGON => Record::PolyPolygon(poly),
        other => return Err(unexpected(other)),
    })
}

fn decode_poly_poly16(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let poly = read_poly_poly(r, 4)?;
    Ok(match record_type {
        rt::POLYPOLYLINE16 => Record::PolyPolyline16(poly),
        rt::POLYPOLYGON16 => Record::PolyPolygon16(poly),
        other => return Err(unexpected(other)),
    })
}

fn decode_extent(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let extent = r.size_l()?;
    Ok(match record_type {
        rt::SETWINDOWEXTEX => Record::SetWindowExtEx { extent },
        rt::SETVIEWPORTEXTEX => Record::SetViewportExtEx { extent },
        other => return Err(unexpected(other)),
    })
}

fn decode_point(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let point = r.point_l()?;
    Ok(match record_type {
        rt::SETWINDOWORGEX => Record::SetWindowOrgEx { origin: point },
        rt::SETVIEWPORTORGEX => Record::SetViewportOrgEx { origin: point },
        rt::SETBRUSHORGEX => Record::SetBrushOrgEx { origin: point },
        rt::OFFSETCLIPRGN => Record::OffsetClipRgn { offset: point },
        rt::MOVETOEX => Record::MoveToEx { point },
        rt::LINETO => Record::LineTo { point },
        other => return Err(unexpected(other)),
    })
}

fn decode_scale_ext(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let scale = ScaleExt {
        x_num: r.i32()?,
        x_denom: r.i32()?,
        y_num: r.i32()?,
        y_denom: r.i32()?,
    };
    Ok(match record_type {
        rt::SCALEVIEWPORTEXTEX => Record::ScaleViewportExtEx(scale),
        rt::SCALEWINDOWEXTEX => Record::ScaleWindowExtEx(scale),
        other => return Err(unexpected(other)),
    })
}

fn decode_scalar(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    if record_type == rt::RESTOREDC {
        return Ok(Record::RestoreDc {
            saved_dc: r.i32()?,
        });
    }
    let value = r.u32()?;
    Ok(match record_type {
        rt::SETMAPMODE => Record::SetMapMode { mode: value },
        rt::SETMAPPERFLAGS => Record::SetMapperFlags { flags: value },
        rt::SETBKMODE => Record::SetBkMode { mode: value },
        rt::SETPOLYFILLMODE => Record::SetPolyFillMode { mode: value },
        rt::SETROP2 => Record::SetRop2 { mode: value },
        rt::SETSTRETCHBLTMODE => Record::SetStretchBltMode { mode: value },
        rt::SETTEXTALIGN => Record::SetTextAlign { mode: value },
        rt::SETICMMODE => Record::SetIcmMode { mode: value },
        rt::SETARCDIRECTION => Record::SetArcDirection { direction: value },
        rt::SETLAYOUT => Record::SetLayout { layout: value },
        rt::SETMITERLIMIT => Record::SetMiterLimit { limit: value },
        rt::SELECTOBJECT => Record::SelectObject { handle: value },
        rt::DELETEOBJECT => Record::DeleteObject { handle: value },
        rt::SELECTPALETTE => Record::SelectPalette { handle: value },
        rt::SELECTCLIPPATH => Record::SelectClipPath { mode: value },
        other => return Err(unexpected(other)),
    })
}

fn decode_color(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let color = r.color()?;
    Ok(match record_type {
        rt::SETTEXTCOLOR => Record::SetTextColor { color },
        rt::SETBKCOLOR => Record::SetBkColor { color },
        other => return Err(unexpected(other)),
    })
}

fn decode_set_pixel(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    Ok(Record::SetPixelV {
        point: r.point_l()?,
        color: r.color()?,
    })
}

fn decode_text_justification(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    Ok(Record::SetTextJustification {
        break_extra: r.i32()?,
        break_count: r.i32()?,
    })
}

fn decode_marker(record_type: u32, _: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    Ok(match record_type {
        rt::SETMETARGN => Record::SetMetaRgn,
        rt::SAVEDC => Record::SaveDc,
        rt::REALIZEPALETTE => Record::RealizePalette,
        rt::BEGINPATH => Record::BeginPath,
        rt::ENDPATH => Record::EndPath,
        rt::CLOSEFIGURE => Record::CloseFigure,
        rt::FLATTENPATH => Record::FlattenPath,
        rt::WIDENPATH => Record::WidenPath,
        rt::ABORTPATH => Record::AbortPath,
        other => return Err(unexpected(other)),
    })
}

fn decode_rect(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let rect = r.rect_l()?;
    Ok(match record_type {
        rt::EXCLUDECLIPRECT => Record::ExcludeClipRect { clip: rect },
        rt::INTERSECTCLIPRECT => Record::IntersectClipRect { clip: rect },
        rt::ELLIPSE => Record::Ellipse { bounds: rect },
        rt::RECTANGLE => Record::Rectangle { bounds: rect },
        rt::FILLPATH => Record::FillPath { bounds: rect },
        rt::STROKEANDFILLPATH => Record::StrokeAndFillPath { bounds: rect },
        rt::STROKEPATH => Record::StrokePath { bounds: rect },
        other => return Err(unexpected(other)),
    })
}

/// RGNDATA：32 字节头部后接矩形数组。
fn read_region(r: &mut RecordReader<'_>, declared: u32) -> Result<Region, RecordError> {
    const RGNDATA_HEADER_SIZE: u32 = 32;
    if declared < RGNDATA_HEADER_SIZE || u64::from(declared) > r.remaining() {
        return Err(RecordError::MalformedOffset {
            field: "RgnData",
            offset: r.position(),
            length: u64::from(declared),
            len: r.len(),
        });
    }
    let _header_size = r.u32()?;
    let _region_type = r.u32()?;
    let count = r.u32()?;
    let _rects_size = r.u32()?;
    let bounds = r.rect_l()?;
    if u64::from(count) * 16 > u64::from(declared - RGNDATA_HEADER_SIZE) {
        return Err(RecordError::invalid(format!(
            "region declares {count} rectangles in {declared} bytes"
        )));
    }
    let rects = r.array_here("Buffer", count, 16, |r| r.rect_l())?;
    Ok(Region { bounds, rects })
}

fn decode_ext_select_clip_rgn(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    const RGN_COPY: u32 = 5;
    let size = r.u32()?;
    let mode = r.u32()?;
    let region = if mode == RGN_COPY || size == 0 {
        // COPY 只重置裁剪，区域数据不参与。
        r.skip_rest();
        None
    } else {
        Some(read_region(r, size)?)
    };
    Ok(Record::ExtSelectClipRgn { mode, region })
}

fn decode_world_transform(
    record_type: u32,
    r: &mut RecordReader<'_>,
) -> Result<Record, RecordError> {
    let xform = r.xform()?;
    Ok(match record_type {
        rt::SETWORLDTRANSFORM => Record::SetWorldTransform { xform },
        rt::MODIFYWORLDTRANSFORM => Record::ModifyWorldTransform {
            xform,
            mode: r.u32()?,
        },
        other => return Err(unexpected(other)),
    })
}

fn decode_create_pen(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let handle = r.u32()?;
    let style = r.u32()?;
    // LOGPEN 的宽度是 POINTL，只有 x 有意义。
    let width = r.point_l()?;
    let color = r.color()?;
    Ok(Record::CreatePen {
        handle,
        pen: Pen {
            style,
            width: width.x.unsigned_abs(),
            color,
            brush_style: brush_style::SOLID,
            hatch: 0,
            style_entries: Vec::new(),
        },
    })
}

fn decode_ext_create_pen(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    const FIXED_PREFIX: u32 = 52;
    let handle = r.u32()?;
    let location = DibLocation::read(r)?;
    let style = r.u32()?;
    let width = r.u32()?;
    let brush_style = r.u32()?;
    let color = r.color()?;
    let hatch = r.u32()?;
    let entry_count = r.u32()?;
    let style_entries = r.array_here("StyleEntry", entry_count, 4, |r| r.u32())?;
    r.end_prefix();
    let bitmap = if location.off_bmi < FIXED_PREFIX {
        None
    } else {
        read_dib(r, location)?
    };
    Ok(Record::ExtCreatePen {
        handle,
        pen: Pen {
            style,
            width,
            color,
            brush_style,
            hatch,
            style_entries,
        },
        bitmap,
    })
}

fn decode_create_brush(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    Ok(Record::CreateBrushIndirect {
        handle: r.u32()?,
        brush: LogBrush {
            style: r.u32()?,
            color: r.color()?,
            hatch: r.u32()?,
        },
    })
}

fn decode_pattern_brush(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let handle = r.u32()?;
    let usage = r.u32()?;
    let location = DibLocation::read(r)?;
    r.end_prefix();
    let brush = PatternBrush {
        handle,
        usage,
        bitmap: read_dib(r, location)?,
    };
    Ok(match record_type {
        rt::CREATEMONOBRUSH => Record::CreateMonoBrush(brush),
        rt::CREATEDIBPATTERNBRUSHPT => Record::CreateDibPatternBrushPt(brush),
        other => return Err(unexpected(other)),
    })
}

fn decode_create_palette(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let handle = r.u32()?;
    let version = r.u16()?;
    let count = r.u16()?;
    let entries = r.array_here("palPalEntry", u32::from(count), 4, |r| r.palette_entry())?;
    Ok(Record::CreatePalette {
        handle,
        version,
        entries,
    })
}

fn decode_set_palette_entries(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let handle = r.u32()?;
    let start = r.u32()?;
    let count = r.u32()?;
    let entries = r.array_here("aPalEntries", count, 4, |r| r.palette_entry())?;
    Ok(Record::SetPaletteEntries {
        handle,
        start,
        entries,
    })
}

fn decode_resize_palette(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    Ok(Record::ResizePalette {
        handle: r.u32()?,
        entries: r.u32()?,
    })
}

const LOGFONT_SIZE: u64 = 92;
/// LOGFONTPANOSE 与 LOGFONTEXDV 共同的前缀长度：LOGFONT + 全名 + 样式 + 脚本（或 PANOSE 区域）。
const ELF_PREFIX_SIZE: u64 = 320;
const FULL_NAME_UNITS: usize = 64;
const STYLE_UNITS: usize = 32;
const SCRIPT_UNITS: usize = 32;

fn decode_font(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let handle = r.u32()?;
    let available = r.remaining();
    if available < LOGFONT_SIZE {
        return Err(RecordError::invalid(format!(
            "font record holds {available} bytes, LOGFONT needs {LOGFONT_SIZE}"
        )));
    }
    let mut font = Font {
        height: r.i32()?,
        width: r.i32()?,
        escapement: r.i32()?,
        orientation: r.i32()?,
        weight: r.i32()?,
        italic: r.u8()? != 0,
        underline: r.u8()? != 0,
        strike_out: r.u8()? != 0,
        charset: r.u8()?,
        out_precision: r.u8()?,
        clip_precision: r.u8()?,
        quality: r.u8()?,
        pitch_and_family: r.u8()?,
        face_name: r.utf16_fixed(32)?,
        ..Font::default()
    };
    if available > ELF_PREFIX_SIZE {
        // LOGFONTEXDV：全名、样式、脚本后接设计向量，设计向量不参与渲染。
        font.full_name = Some(r.utf16_fixed(FULL_NAME_UNITS)?);
        font.style = Some(r.utf16_fixed(STYLE_UNITS)?);
        font.script = Some(r.utf16_fixed(SCRIPT_UNITS)?);
    } else if available > LOGFONT_SIZE
        && r.remaining() >= 2 * (FULL_NAME_UNITS + STYLE_UNITS) as u64
    {
        font.full_name = Some(r.utf16_fixed(FULL_NAME_UNITS)?);
        font.style = Some(r.utf16_fixed(STYLE_UNITS)?);
    }
    r.skip_rest();
    Ok(Record::ExtCreateFontIndirectW { handle, font })
}

fn decode_angle_arc(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    Ok(Record::AngleArc {
        center: r.point_l()?,
        radius: r.u32()?,
        start_angle: r.f32()?,
        sweep_angle: r.f32()?,
    })
}

fn decode_round_rect(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    Ok(Record::RoundRect {
        bounds: r.rect_l()?,
        corner: r.size_l()?,
    })
}

fn decode_arc_box(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let arc = ArcBox {
        bounds: r.rect_l()?,
        start: r.point_l()?,
        end: r.point_l()?,
    };
    Ok(match record_type {
        rt::ARC => Record::Arc(arc),
        rt::ARCTO => Record::ArcTo(arc),
        rt::CHORD => Record::Chord(arc),
        rt::PIE => Record::Pie(arc),
        other => return Err(unexpected(other)),
    })
}

fn decode_comment(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let size = r.u32()?;
    let data = r.array_here("PrivateData", size, 1, |r| r.u8())?;
    r.skip_rest();
    Ok(Record::Comment { data })
}

fn decode_region_paint(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let bounds = r.rect_l()?;
    let size = r.u32()?;
    Ok(match record_type {
        rt::FILLRGN => {
            let brush = r.u32()?;
            Record::FillRgn {
                bounds,
                brush,
                region: read_region(r, size)?,
            }
        }
        rt::FRAMERGN => {
            let brush = r.u32()?;
            let width = r.i32()?;
            let height = r.i32()?;
            Record::FrameRgn {
                bounds,
                brush,
                width,
                height,
                region: read_region(r, size)?,
            }
        }
        rt::INVERTRGN => Record::InvertRgn {
            bounds,
            region: read_region(r, size)?,
        },
        rt::PAINTRGN => Record::PaintRgn {
            bounds,
            region: read_region(r, size)?,
        },
        other => return Err(unexpected(other)),
    })
}

fn decode_blt(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let bounds = r.rect_l()?;
    let dest = r.point_l()?;
    let dest_size = r.size_l()?;
    let rop = r.u32()?;
    let src = r.point_l()?;
    let src_xform = r.xform()?;
    let bk_color = r.color()?;
    let usage = r.u32()?;
    let location = DibLocation::read(r)?;
    let src_size = if record_type == rt::STRETCHBLT {
        r.size_l()?
    } else {
        dest_size
    };
    r.end_prefix();
    let blt = Blt {
        bounds,
        dest,
        dest_size,
        rop,
        src,
        src_size,
        src_xform,
        bk_color,
        usage,
        bitmap: read_dib(r, location)?,
    };
    Ok(match record_type {
        rt::BITBLT => Record::BitBlt(blt),
        rt::STRETCHBLT => Record::StretchBlt(blt),
        other => return Err(unexpected(other)),
    })
}

fn decode_mask_blt(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let bounds = r.rect_l()?;
    let dest = r.point_l()?;
    let dest_size = r.size_l()?;
    let rop = r.u32()?;
    let src = r.point_l()?;
    let src_xform = r.xform()?;
    let bk_color = r.color()?;
    let usage = r.u32()?;
    let location = DibLocation::read(r)?;
    let mask_origin = r.point_l()?;
    let mask_usage = r.u32()?;
    let mask_location = DibLocation::read(r)?;
    r.end_prefix();
    let bitmap = read_dib(r, location)?;
    let mask = read_dib(r, mask_location)?;
    Ok(Record::MaskBlt(MaskBlt {
        blt: Blt {
            bounds,
            dest,
            dest_size,
            rop,
            src,
            src_size: dest_size,
            src_xform,
            bk_color,
            usage,
            bitmap,
        },
        mask_origin,
        mask_usage,
        mask,
    }))
}

fn decode_set_dibits(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let bounds = r.rect_l()?;
    let dest = r.point_l()?;
    let src = r.point_l()?;
    let src_size = r.size_l()?;
    let location = DibLocation::read(r)?;
    let usage = r.u32()?;
    let start_scan = r.u32()?;
    let scan_count = r.u32()?;
    r.end_prefix();
    Ok(Record::SetDiBitsToDevice(SetDiBitsToDevice {
        bounds,
        dest,
        src,
        src_size,
        usage,
        start_scan,
        scan_count,
        bitmap: read_dib(r, location)?,
    }))
}

fn decode_stretch_dibits(_: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let bounds = r.rect_l()?;
    let dest = r.point_l()?;
    let src = r.point_l()?;
    let src_size = r.size_l()?;
    let location = DibLocation::read(r)?;
    let usage = r.u32()?;
    let rop = r.u32()?;
    let dest_size = r.size_l()?;
    r.end_prefix();
    Ok(Record::StretchDiBits(StretchDiBits {
        bounds,
        dest,
        src,
        src_size,
        usage,
        rop,
        dest_size,
        bitmap: read_dib(r, location)?,
    }))
}

fn decode_text_out(record_type: u32, r: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let bounds = r.rect_l()?;
    let graphics_mode = r.u32()?;
    let ex_scale = r.f32()?;
    let ey_scale = r.f32()?;
    let reference = r.point_l()?;
    let char_count = r.u32()?;
    let string_offset = r.u32()?;
    let options = r.u32()?;
    let rectangle = if options & text_options::ETO_NO_RECT == 0 {
        Some(r.rect_l()?)
    } else {
        None
    };
    let dx_offset = r.u32()?;
    r.end_prefix();

    let chars = match record_type {
        _ if char_count == 0 => Vec::new(),
        rt::EXTTEXTOUTW => r.array_at("offString", string_offset, char_count, 2, |r| r.u16())?,
        rt::EXTTEXTOUTA => r.array_at("offString", string_offset, char_count, 1, |r| {
            r.u8().map(u16::from)
        })?,
        other => return Err(unexpected(other)),
    };
    let dx = if dx_offset == 0 || char_count == 0 {
        Vec::new()
    } else {
        let per_char = if options & text_options::ETO_PDY != 0 { 2 } else { 1 };
        let count = char_count.checked_mul(per_char).ok_or_else(|| {
            RecordError::invalid(format!("character count {char_count} overflows"))
        })?;
        r.array_at("offDx", dx_offset, count, 4, |r| r.i32())?
    };

    let text = ExtTextOut {
        bounds,
        graphics_mode,
        ex_scale,
        ey_scale,
        reference,
        options,
        rectangle,
        chars,
        dx,
    };
    Ok(if record_type == rt::EXTTEXTOUTW {
        Record::ExtTextOutW(text)
    } else {
        Record::ExtTextOutA(text)
    })
}
