//! 头部与 EOF 记录。头部的扩展字段是否存在由描述串与像素格式块的偏移推断。

use emf_core::record::{EMF_SIGNATURE, Eof, Header, PixelFormatInfo, Record};

use crate::DecodeError;
use crate::reader::{RecordError, RecordReader};

/// 基础头部长度。
pub(crate) const BASE_HEADER_SIZE: u32 = 88;
const EXTENSION1_SIZE: u32 = 100;
const EXTENSION2_SIZE: u32 = 108;

pub(crate) fn decode_header(reader: &mut RecordReader<'_>) -> Result<Header, DecodeError> {
    let size = reader.len() as u32;
    if size < BASE_HEADER_SIZE {
        return Err(DecodeError::HeaderTooSmall { size });
    }
    let header = read_header(reader, size).map_err(|_| DecodeError::HeaderTooSmall { size })?;
    if header.signature != EMF_SIGNATURE {
        return Err(DecodeError::HeaderSignatureMismatch {
            found: header.signature,
        });
    }
    Ok(header)
}

fn read_header(reader: &mut RecordReader<'_>, size: u32) -> Result<Header, RecordError> {
    reader.seek_to("Bounds", 8, u64::from(BASE_HEADER_SIZE - 8))?;
    let bounds = reader.rect_l()?;
    let frame = reader.rect_l()?;
    let signature = reader.u32()?;
    let version = reader.u32()?;
    let bytes = reader.u32()?;
    let records = reader.u32()?;
    let handles = reader.u16()?;
    let reserved = reader.u16()?;
    let description_len = reader.u32()?;
    let description_offset = reader.u32()?;
    let palette_entries = reader.u32()?;
    let device = reader.size_l()?;
    let millimeters = reader.size_l()?;

    let size64 = u64::from(size);
    let description_fits = description_offset >= BASE_HEADER_SIZE
        && u64::from(description_offset) + 2 * u64::from(description_len) <= size64;

    let mut header_size = size;
    if description_fits {
        header_size = description_offset;
    }

    let mut pixel_format = None;
    if header_size >= EXTENSION1_SIZE {
        let info = PixelFormatInfo {
            size: reader.u32()?,
            offset: reader.u32()?,
            opengl: reader.u32()? != 0,
        };
        if info.offset >= EXTENSION1_SIZE
            && u64::from(info.offset) + u64::from(info.size) <= size64
            && info.offset < header_size
        {
            header_size = info.offset;
        }
        pixel_format = Some(info);
    }

    let micrometers = if header_size >= EXTENSION2_SIZE {
        Some(reader.size_l()?)
    } else {
        None
    };

    reader.end_prefix();
    let description = if description_fits && description_len > 0 {
        let units = reader.array_at(
            "offDescription",
            description_offset,
            description_len,
            2,
            |r| r.u16(),
        )?;
        Some(description_text(&units))
    } else {
        None
    };
    reader.skip_rest();

    Ok(Header {
        bounds,
        frame,
        signature,
        version,
        bytes,
        records,
        handles,
        reserved,
        description_len,
        description_offset,
        palette_entries,
        device,
        millimeters,
        pixel_format,
        micrometers,
        description,
        header_size,
    })
}

/// 描述串由以 NUL 分隔的应用名与图像名组成。
fn description_text(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
        .split('\0')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

pub(crate) fn decode_eof(_: u32, reader: &mut RecordReader<'_>) -> Result<Record, RecordError> {
    let palette_len = reader.u32()?;
    let palette_offset = reader.u32()?;
    reader.end_prefix();
    let palette = if palette_len > 0 {
        reader.array_at("offPalEntries", palette_offset, palette_len, 4, |r| {
            r.palette_entry()
        })?
    } else {
        Vec::new()
    };
    let size = reader.len() as u32;
    let size_last = match size.checked_sub(4) {
        Some(offset) if u64::from(offset) >= reader.position() => {
            reader.seek_to("SizeLast", offset, 4)?;
            reader.u32()?
        }
        _ => return Err(RecordError::invalid("EOF record too small for SizeLast")),
    };
    Ok(Record::Eof(Eof { palette, size_last }))
}
