//! 记录内嵌的设备无关位图（DIB）。这里只保存解码后的头部与原始字节，像素归一化在引擎层完成。

use serde::{Deserialize, Serialize};

pub mod compression {
    pub const BI_RGB: u32 = 0;
    pub const BI_RLE8: u32 = 1;
    pub const BI_RLE4: u32 = 2;
    pub const BI_BITFIELDS: u32 = 3;
    pub const BI_JPEG: u32 = 4;
    pub const BI_PNG: u32 = 5;
}

pub mod usage {
    pub const DIB_RGB_COLORS: u32 = 0;
    pub const DIB_PAL_COLORS: u32 = 1;
}

/// BITMAPCOREHEADER 的字节长度，其颜色表条目为 3 字节。
pub const CORE_HEADER_SIZE: u32 = 12;
/// BITMAPINFOHEADER 的字节长度。
pub const INFO_HEADER_SIZE: u32 = 40;

/// 统一后的位图信息头；BITMAPCOREHEADER 的 16 位字段在解码时拓宽。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitmapInfoHeader {
    pub header_size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub image_size: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

impl BitmapInfoHeader {
    #[inline]
    pub fn is_core(&self) -> bool {
        self.header_size == CORE_HEADER_SIZE
    }

    /// 高度为负表示自上而下存放扫描行。
    #[inline]
    pub fn is_top_down(&self) -> bool {
        self.height < 0
    }

    #[inline]
    pub fn abs_height(&self) -> u32 {
        self.height.unsigned_abs()
    }

    #[inline]
    pub fn abs_width(&self) -> u32 {
        self.width.unsigned_abs()
    }

    /// 每行字节数，按 4 字节对齐。
    pub fn stride(&self) -> usize {
        let bits = self.abs_width() as usize * self.bit_count as usize;
        bits.div_ceil(32) * 4
    }

    /// 颜色表条目数：8 位及以下默认为 `2^bit_count`。
    pub fn color_table_len(&self) -> usize {
        if self.bit_count <= 8 {
            if self.colors_used == 0 || self.is_core() {
                1usize << self.bit_count
            } else {
                self.colors_used as usize
            }
        } else {
            self.colors_used as usize
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dib {
    pub header: BitmapInfoHeader,
    /// 位图信息块中紧随头部的字节：颜色表或 BI_BITFIELDS 掩码。
    pub color_data: Vec<u8>,
    pub bits: Vec<u8>,
}
