//! 记录内嵌 DIB 的定位与头部解析。

use emf_core::bitmap::{BitmapInfoHeader, CORE_HEADER_SIZE, Dib, INFO_HEADER_SIZE};

use crate::reader::{RecordError, RecordReader};

/// 位图信息块与像素块在记录中的位置。
#[derive(Debug, Clone, Copy)]
pub(crate) struct DibLocation {
    pub off_bmi: u32,
    pub cb_bmi: u32,
    pub off_bits: u32,
    pub cb_bits: u32,
}

impl DibLocation {
    pub(crate) fn read(reader: &mut RecordReader<'_>) -> Result<Self, RecordError> {
        Ok(Self {
            off_bmi: reader.u32()?,
            cb_bmi: reader.u32()?,
            off_bits: reader.u32()?,
            cb_bits: reader.u32()?,
        })
    }

    #[inline]
    fn is_absent(&self) -> bool {
        self.off_bmi == 0 || self.cb_bmi == 0
    }
}

/// 读取 DIB；信息块为空时返回 `None`。
pub(crate) fn read_dib(
    reader: &mut RecordReader<'_>,
    location: DibLocation,
) -> Result<Option<Dib>, RecordError> {
    if location.is_absent() {
        return Ok(None);
    }
    reader.seek_to("offBmi", location.off_bmi, u64::from(location.cb_bmi))?;
    let header_size = reader.u32()?;
    if header_size > location.cb_bmi {
        return Err(RecordError::invalid(format!(
            "bitmap header of {header_size} bytes exceeds cbBmi {}",
            location.cb_bmi
        )));
    }
    let header = if header_size == CORE_HEADER_SIZE {
        BitmapInfoHeader {
            header_size,
            width: i32::from(reader.u16()?),
            height: i32::from(reader.u16()?),
            planes: reader.u16()?,
            bit_count: reader.u16()?,
            ..BitmapInfoHeader::default()
        }
    } else if header_size >= INFO_HEADER_SIZE {
        BitmapInfoHeader {
            header_size,
            width: reader.i32()?,
            height: reader.i32()?,
            planes: reader.u16()?,
            bit_count: reader.u16()?,
            compression: reader.u32()?,
            image_size: reader.u32()?,
            x_pels_per_meter: reader.i32()?,
            y_pels_per_meter: reader.i32()?,
            colors_used: reader.u32()?,
            colors_important: reader.u32()?,
        }
    } else {
        return Err(RecordError::invalid(format!(
            "unsupported bitmap header size {header_size}"
        )));
    };

    // V4/V5 头部的掩码字段与颜色表一起留在 color_data 中。
    let consumed = header_size.min(INFO_HEADER_SIZE);
    let color_data = reader.bytes(u64::from(location.cb_bmi - consumed))?;

    let bits = if location.cb_bits == 0 {
        Vec::new()
    } else {
        reader.bytes_at("offBits", location.off_bits, location.cb_bits)?
    };

    Ok(Some(Dib {
        header,
        color_data,
        bits,
    }))
}
