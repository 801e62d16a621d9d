//! DIB 像素归一化：各种位深与颜色表统一展开为自上而下的 BGRA。

use emf_core::bitmap::{Dib, INFO_HEADER_SIZE, compression, usage};
use emf_core::color::ColorRef;
use emf_core::object::Palette;
use tracing::debug;

use crate::errors::EngineError;
use crate::intent::Bitmap;

/// 单张位图允许的最大像素数。
const MAX_PIXELS: u64 = 1 << 28;

/// 颜色表的来源。
#[derive(Debug, Clone, Copy)]
pub enum ColorSource<'a> {
    /// 按 `usage` 解释 DIB 自带的颜色表；`DIB_PAL_COLORS` 经所选调色板转换。
    Table { usage: u32, palette: &'a Palette },
    /// 单色图案画刷：0 取前景色，1 取背景色。
    Monochrome {
        foreground: ColorRef,
        background: ColorRef,
    },
}

pub fn normalize(dib: &Dib, colors: ColorSource<'_>) -> Result<Bitmap, EngineError> {
    normalize_band(dib, colors, 0, u32::MAX)
}

/// 只有部分扫描行可用时的归一化：`first_scan` 起共 `scan_count` 行（按存储顺序计）。
/// 缺失的行保持全透明。
pub fn normalize_band(
    dib: &Dib,
    colors: ColorSource<'_>,
    first_scan: u32,
    scan_count: u32,
) -> Result<Bitmap, EngineError> {
    let header = &dib.header;
    match header.compression {
        compression::BI_RGB | compression::BI_BITFIELDS => {}
        compression::BI_RLE8 => return Err(unsupported("RLE8 compression")),
        compression::BI_RLE4 => return Err(unsupported("RLE4 compression")),
        compression::BI_JPEG => return Err(unsupported("JPEG compression")),
        compression::BI_PNG => return Err(unsupported("PNG compression")),
        other => return Err(unsupported(&format!("compression {other}"))),
    }
    let width = header.abs_width();
    let height = header.abs_height();
    if width == 0 || height == 0 {
        return Err(EngineError::InvalidBitmap(format!(
            "empty {width}x{height} bitmap"
        )));
    }
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(EngineError::InvalidBitmap(format!(
            "{width}x{height} bitmap exceeds the pixel limit"
        )));
    }

    let format = PixelFormat::resolve(dib, colors)?;
    let stride = header.stride();
    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    let rows_available = (dib.bits.len() / stride) as u32;
    let rows = rows_available.min(scan_count).min(height.saturating_sub(first_scan));
    if rows < height {
        debug!(width, height, rows, "位图扫描行不完整");
    }
    for stored in 0..rows {
        let scan = first_scan + stored;
        let y = if header.is_top_down() {
            scan
        } else {
            height - 1 - scan
        };
        let src = &dib.bits[stored as usize * stride..(stored as usize + 1) * stride];
        let dst_start = y as usize * width as usize * 4;
        let dst = &mut pixels[dst_start..dst_start + width as usize * 4];
        format.expand_row(src, dst, header.bit_count);
    }
    Bitmap::new(width, height, pixels)
}

/// MaskBlt 掩码：返回每像素是否为 1（自上而下）。只接受 1 bpp。
pub fn mask_bits(dib: &Dib) -> Result<Vec<bool>, EngineError> {
    let header = &dib.header;
    if header.bit_count != 1 || header.compression != compression::BI_RGB {
        return Err(unsupported("mask must be an uncompressed 1 bpp bitmap"));
    }
    let width = header.abs_width() as usize;
    let height = header.abs_height() as usize;
    let stride = header.stride();
    if width == 0 || height == 0 || dib.bits.len() < stride * height {
        return Err(EngineError::InvalidBitmap(
            "mask bits shorter than its header declares".to_string(),
        ));
    }
    let mut mask = vec![false; width * height];
    for scan in 0..height {
        let y = if header.is_top_down() {
            scan
        } else {
            height - 1 - scan
        };
        let row = &dib.bits[scan * stride..];
        for x in 0..width {
            mask[y * width + x] = row[x / 8] & (0x80 >> (x % 8)) != 0;
        }
    }
    Ok(mask)
}

fn unsupported(what: &str) -> EngineError {
    EngineError::UnsupportedBitmap(what.to_string())
}

enum PixelFormat {
    Indexed(Vec<[u8; 4]>),
    Masked { red: u32, green: u32, blue: u32 },
    Rgb24,
    Rgb32,
}

impl PixelFormat {
    fn resolve(dib: &Dib, colors: ColorSource<'_>) -> Result<Self, EngineError> {
        let header = &dib.header;
        match header.bit_count {
            1 | 4 | 8 => Ok(PixelFormat::Indexed(color_table(dib, colors))),
            16 | 32 if header.compression == compression::BI_BITFIELDS => {
                let data = &dib.color_data;
                if data.len() < 12 {
                    return Err(EngineError::InvalidBitmap(
                        "BI_BITFIELDS without channel masks".to_string(),
                    ));
                }
                let mask = |i: usize| {
                    u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
                };
                Ok(PixelFormat::Masked {
                    red: mask(0),
                    green: mask(4),
                    blue: mask(8),
                })
            }
            16 => Ok(PixelFormat::Masked {
                red: 0x7C00,
                green: 0x03E0,
                blue: 0x001F,
            }),
            24 => Ok(PixelFormat::Rgb24),
            32 => Ok(PixelFormat::Rgb32),
            other => Err(unsupported(&format!("{other} bits per pixel"))),
        }
    }

    fn expand_row(&self, src: &[u8], dst: &mut [u8], bit_count: u16) {
        for (x, out) in dst.chunks_exact_mut(4).enumerate() {
            let bgra = match self {
                PixelFormat::Indexed(table) => {
                    let index = match bit_count {
                        1 => (src[x / 8] >> (7 - x % 8)) & 0x01,
                        4 => (src[x / 2] >> (4 - 4 * (x % 2))) & 0x0F,
                        _ => src[x],
                    };
                    table.get(index as usize).copied().unwrap_or([0, 0, 0, 255])
                }
                PixelFormat::Masked { red, green, blue } => {
                    let value = if bit_count == 16 {
                        u16::from_le_bytes([src[x * 2], src[x * 2 + 1]]) as u32
                    } else {
                        u32::from_le_bytes([
                            src[x * 4],
                            src[x * 4 + 1],
                            src[x * 4 + 2],
                            src[x * 4 + 3],
                        ])
                    };
                    [
                        channel(value, *blue),
                        channel(value, *green),
                        channel(value, *red),
                        255,
                    ]
                }
                PixelFormat::Rgb24 => [src[x * 3], src[x * 3 + 1], src[x * 3 + 2], 255],
                PixelFormat::Rgb32 => [src[x * 4], src[x * 4 + 1], src[x * 4 + 2], 255],
            };
            out.copy_from_slice(&bgra);
        }
    }
}

/// 取掩码覆盖的位并拉伸到 8 位。
fn channel(value: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let max = (mask >> shift) as u64;
    let raw = ((value & mask) >> shift) as u64;
    (raw * 255 / max) as u8
}

fn color_table(dib: &Dib, colors: ColorSource<'_>) -> Vec<[u8; 4]> {
    let header = &dib.header;
    let len = header.color_table_len().min(1 << header.bit_count);
    let (usage, palette) = match colors {
        ColorSource::Monochrome {
            foreground,
            background,
        } => {
            return [foreground, background]
                .into_iter()
                .map(|c| [c.blue, c.green, c.red, 255])
                .collect();
        }
        ColorSource::Table { usage, palette } => (usage, palette),
    };

    let (entry_size, start) = if header.is_core() {
        (3usize, 0usize)
    } else {
        // V4/V5 头部超出 40 字节的部分位于颜色表之前。
        (4usize, header.header_size.saturating_sub(INFO_HEADER_SIZE) as usize)
    };
    let data = dib.color_data.get(start..).unwrap_or(&[]);

    if usage == usage::DIB_PAL_COLORS {
        return data
            .chunks_exact(2)
            .take(len)
            .map(|pair| {
                let index = u16::from_le_bytes([pair[0], pair[1]]) as usize;
                let color = palette
                    .entries
                    .get(index)
                    .map(|entry| entry.color())
                    .unwrap_or(ColorRef::BLACK);
                [color.blue, color.green, color.red, 255]
            })
            .collect();
    }
    data.chunks_exact(entry_size)
        .take(len)
        .map(|entry| [entry[0], entry[1], entry[2], 255])
        .collect()
}
