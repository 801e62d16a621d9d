//! 回放驱动：按文件顺序把记录送入设备上下文，再把意图交给绘图表面。

use emf_core::record::{Metafile, Record};
use tracing::{info, trace, warn};

use crate::context::DeviceContext;
use crate::errors::EngineError;
use crate::mapping;
use crate::surface::{Background, DrawingSurface};

pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    pub background: Background,
    /// 渲染倍率，作用于头部范围。
    pub scale: f64,
    /// 画布任一边的像素上限，超出时整体缩小。
    pub max_dimension: u32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            background: Background::White,
            scale: 1.0,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// 被跳过效果的记录。
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// 在回放序列中的下标（不含头部）。
    pub index: usize,
    pub record_type: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackReport {
    pub width: u32,
    pub height: u32,
    /// 实际使用的渲染倍率。
    pub scale: f64,
    pub records: usize,
    pub intents: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl PlaybackReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// 回放整个图元文件。
///
/// 只有画布尺寸无效或表面无法开始时返回错误；单条记录的失败记入报告并继续。
pub fn play<S>(
    metafile: &Metafile,
    surface: &mut S,
    options: &PlaybackOptions,
) -> Result<PlaybackReport, EngineError>
where
    S: DrawingSurface + ?Sized,
{
    let header = metafile.header();
    let (width, height, scale) = canvas_size(header, options)?;
    surface.begin(width, height, options.background)?;
    info!(width, height, scale, records = metafile.len(), "开始回放");

    let mut dc = DeviceContext::new(header, scale);
    let mut report = PlaybackReport {
        width,
        height,
        scale,
        ..PlaybackReport::default()
    };
    for (index, record) in metafile.records().iter().enumerate() {
        if matches!(record, Record::Eof(_)) {
            break;
        }
        report.records += 1;
        let intents = match dc.apply(record) {
            Ok(intents) => intents,
            Err(err) => {
                warn!(index, record_type = record.record_type(), error = %err, "跳过记录");
                report.skipped.push(SkippedRecord {
                    index,
                    record_type: record.record_type(),
                    reason: err.to_string(),
                });
                continue;
            }
        };
        for intent in &intents {
            trace!(index, kind = intent.kind_name(), "绘制意图");
            match surface.draw(intent) {
                Ok(()) => report.intents += 1,
                Err(err) => {
                    warn!(index, kind = intent.kind_name(), error = %err, "表面拒绝绘制意图");
                }
            }
        }
    }

    info!(
        records = report.records,
        intents = report.intents,
        skipped = report.skipped.len(),
        "回放完成"
    );
    Ok(report)
}

/// 计算画布像素尺寸与最终倍率。
pub fn canvas_size(
    header: &emf_core::record::Header,
    options: &PlaybackOptions,
) -> Result<(u32, u32, f64), EngineError> {
    if !options.scale.is_finite() || options.scale <= 0.0 {
        return Err(EngineError::InvalidArgument(format!(
            "render scale {} must be positive",
            options.scale
        )));
    }
    let (extent_x, extent_y) = mapping::canvas_extent(header);
    let longest = extent_x.max(extent_y);
    let mut scale = options.scale;
    let limit = options.max_dimension.max(1) as f64;
    if longest * scale > limit {
        let fitted = limit / longest;
        warn!(requested = scale, fitted, "画布超出尺寸上限，按比例缩小");
        scale = fitted;
    }
    let width = (extent_x * scale).round().clamp(1.0, limit) as u32;
    let height = (extent_y * scale).round().clamp(1.0, limit) as u32;
    Ok((width, height, scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use emf_core::geometry::{RectL, SizeL};
    use emf_core::record::{EMF_SIGNATURE, Header};

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

    #[test]
    fn canvas_is_inclusive_and_scaled() {
        let options = PlaybackOptions {
            scale: 2.0,
            ..PlaybackOptions::default()
        };
        let (w, h, scale) = canvas_size(&header(RectL::new(0, 0, 99, 49)), &options).expect("size");
        assert_eq!((w, h), (200, 100));
        assert!((scale - 2.0).abs() < 1e-9);
    }

    #[test]
    fn oversized_canvas_is_fitted() {
        let options = PlaybackOptions {
            max_dimension: 100,
            ..PlaybackOptions::default()
        };
        let (w, h, scale) =
            canvas_size(&header(RectL::new(0, 0, 399, 199)), &options).expect("size");
        assert_eq!((w, h), (100, 50));
        assert!((scale - 0.25).abs() < 1e-9);
    }

    #[test]
    fn full_range_bounds_fit_instead_of_wrapping() {
        let bounds = RectL::new(i32::MIN, 0, i32::MAX, 10);
        let (extent_x, extent_y) = mapping::canvas_extent(&header(bounds));
        assert!((extent_x - (u32::MAX as f64 + 1.0)).abs() < 1e-3);
        assert!((extent_y - 11.0).abs() < 1e-9);
        let (w, h, scale) = canvas_size(&header(bounds), &PlaybackOptions::default()).expect("size");
        assert_eq!((w, h), (DEFAULT_MAX_DIMENSION, 1));
        assert!(scale > 0.0 && scale < 1e-5);
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let options = PlaybackOptions {
            scale: 0.0,
            ..PlaybackOptions::default()
        };
        assert!(canvas_size(&header(RectL::new(0, 0, 9, 9)), &options).is_err());
    }
}
