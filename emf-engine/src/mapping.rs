//! 窗口到视口的页面映射与映射模式。

use emf_core::record::{Header, ScaleExt};
use glam::{DAffine2, DVec2};
use tracing::debug;

use crate::errors::EngineError;

pub mod map_mode {
    pub const MM_TEXT: u32 = 1;
    pub const MM_LOMETRIC: u32 = 2;
    pub const MM_HIMETRIC: u32 = 3;
    pub const MM_LOENGLISH: u32 = 4;
    pub const MM_HIENGLISH: u32 = 5;
    pub const MM_TWIPS: u32 = 6;
    pub const MM_ISOTROPIC: u32 = 7;
    pub const MM_ANISOTROPIC: u32 = 8;
}

const DEFAULT_DPI: f64 = 96.0;
const MM_PER_INCH: f64 = 25.4;

/// 参考设备的像素密度，取自头部的设备尺寸与毫米尺寸。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceMetrics {
    pub px_per_mm: DVec2,
}

impl DeviceMetrics {
    pub fn from_header(header: &Header) -> Self {
        let axis = |pixels: i32, millimeters: i32| {
            if pixels > 0 && millimeters > 0 {
                pixels as f64 / millimeters as f64
            } else {
                DEFAULT_DPI / MM_PER_INCH
            }
        };
        Self {
            px_per_mm: DVec2::new(
                axis(header.device.cx, header.millimeters.cx),
                axis(header.device.cy, header.millimeters.cy),
            ),
        }
    }
}

impl Default for DeviceMetrics {
    fn default() -> Self {
        Self {
            px_per_mm: DVec2::splat(DEFAULT_DPI / MM_PER_INCH),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    pub mode: u32,
    pub window_org: DVec2,
    pub window_ext: DVec2,
    pub viewport_org: DVec2,
    pub viewport_ext: DVec2,
}

impl Default for Mapping {
    fn default() -> Self {
        Self {
            mode: map_mode::MM_TEXT,
            window_org: DVec2::ZERO,
            window_ext: DVec2::ONE,
            viewport_org: DVec2::ZERO,
            viewport_ext: DVec2::ONE,
        }
    }
}

impl Mapping {
    /// 逻辑坐标到设备坐标：`viewport_org + (p - window_org) * scale`。
    pub fn page_transform(&self, metrics: &DeviceMetrics) -> DAffine2 {
        DAffine2::from_translation(self.viewport_org)
            * DAffine2::from_scale(self.scale(metrics))
            * DAffine2::from_translation(-self.window_org)
    }

    pub fn scale(&self, metrics: &DeviceMetrics) -> DVec2 {
        use map_mode::*;

        // 固定比例模式：每逻辑单位的毫米数，y 轴向上。
        let metric = |mm_per_unit: f64| {
            let scale = metrics.px_per_mm * mm_per_unit;
            DVec2::new(scale.x, -scale.y)
        };
        match self.mode {
            MM_LOMETRIC => metric(0.1),
            MM_HIMETRIC => metric(0.01),
            MM_LOENGLISH => metric(0.254),
            MM_HIENGLISH => metric(0.0254),
            MM_TWIPS => metric(MM_PER_INCH / 1440.0),
            MM_ISOTROPIC => {
                let ratio = self.ratio();
                let magnitude = ratio.x.abs().min(ratio.y.abs());
                DVec2::new(
                    magnitude.copysign(ratio.x),
                    magnitude.copysign(ratio.y),
                )
            }
            MM_ANISOTROPIC => self.ratio(),
            _ => DVec2::ONE,
        }
    }

    fn ratio(&self) -> DVec2 {
        let axis = |viewport: f64, window: f64| {
            if window == 0.0 { 1.0 } else { viewport / window }
        };
        DVec2::new(
            axis(self.viewport_ext.x, self.window_ext.x),
            axis(self.viewport_ext.y, self.window_ext.y),
        )
    }

    pub fn scale_window_ext(&mut self, factor: &ScaleExt) -> Result<(), EngineError> {
        self.window_ext = scaled(self.window_ext, factor)?;
        Ok(())
    }

    pub fn scale_viewport_ext(&mut self, factor: &ScaleExt) -> Result<(), EngineError> {
        self.viewport_ext = scaled(self.viewport_ext, factor)?;
        Ok(())
    }
}

fn scaled(extent: DVec2, factor: &ScaleExt) -> Result<DVec2, EngineError> {
    if factor.x_denom == 0 || factor.y_denom == 0 {
        debug!(?factor, "范围缩放分母为零");
        return Err(EngineError::InvalidArgument(
            "extent scale denominator is zero".to_string(),
        ));
    }
    Ok(DVec2::new(
        extent.x * factor.x_num as f64 / factor.x_denom as f64,
        extent.y * factor.y_num as f64 / factor.y_denom as f64,
    ))
}

/// 画布映射：把头部范围的左上角移到像素原点，再乘以渲染倍率。
pub fn canvas_transform(header: &Header, scale: f64) -> DAffine2 {
    let bounds = header.bounds.normalized();
    DAffine2::from_scale(DVec2::splat(scale))
        * DAffine2::from_translation(-DVec2::new(bounds.left as f64, bounds.top as f64))
}

/// 头部范围对应的像素尺寸（边界包含在内）。
pub fn canvas_extent(header: &Header) -> (f64, f64) {
    let bounds = header.bounds.normalized();
    (
        (bounds.width() as f64 + 1.0).max(1.0),
        (bounds.height() as f64 + 1.0).max(1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::map_mode::*;
    use super::*;

    fn approx(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn text_mode_ignores_extents() {
        let mapping = Mapping {
            window_ext: DVec2::new(10.0, 10.0),
            viewport_ext: DVec2::new(50.0, 20.0),
            window_org: DVec2::new(5.0, 5.0),
            ..Mapping::default()
        };
        let page = mapping.page_transform(&DeviceMetrics::default());
        assert!(approx(
            page.transform_point2(DVec2::new(6.0, 7.0)),
            DVec2::new(1.0, 2.0)
        ));
    }

    #[test]
    fn anisotropic_and_isotropic_scale() {
        let mut mapping = Mapping {
            mode: MM_ANISOTROPIC,
            window_ext: DVec2::new(10.0, 10.0),
            viewport_ext: DVec2::new(50.0, -20.0),
            viewport_org: DVec2::new(100.0, 100.0),
            ..Mapping::default()
        };
        let metrics = DeviceMetrics::default();
        assert!(approx(mapping.scale(&metrics), DVec2::new(5.0, -2.0)));
        let p = mapping.page_transform(&metrics).transform_point2(DVec2::new(1.0, 1.0));
        assert!(approx(p, DVec2::new(105.0, 98.0)));

        mapping.mode = MM_ISOTROPIC;
        assert!(approx(mapping.scale(&metrics), DVec2::new(2.0, -2.0)));

        mapping.window_ext = DVec2::new(0.0, 10.0);
        mapping.mode = MM_ANISOTROPIC;
        assert!(approx(mapping.scale(&metrics), DVec2::new(1.0, -2.0)));
    }

    #[test]
    fn metric_modes_flip_y() {
        let metrics = DeviceMetrics {
            px_per_mm: DVec2::new(4.0, 4.0),
        };
        let mapping = Mapping {
            mode: MM_LOMETRIC,
            ..Mapping::default()
        };
        assert!(approx(mapping.scale(&metrics), DVec2::new(0.4, -0.4)));
        let twips = Mapping {
            mode: MM_TWIPS,
            ..Mapping::default()
        };
        let scale = twips.scale(&metrics);
        assert!((scale.x - 4.0 * 25.4 / 1440.0).abs() < 1e-12);
        assert!(scale.y < 0.0);
    }

    #[test]
    fn zero_denominator_is_rejected() {
        let mut mapping = Mapping::default();
        let factor = ScaleExt {
            x_num: 2,
            x_denom: 0,
            y_num: 1,
            y_denom: 1,
        };
        assert!(mapping.scale_window_ext(&factor).is_err());
        let halve = ScaleExt {
            x_num: 1,
            x_denom: 2,
            y_num: 3,
            y_denom: 1,
        };
        mapping.window_ext = DVec2::new(10.0, 10.0);
        mapping.scale_window_ext(&halve).expect("scale");
        assert!(approx(mapping.window_ext, DVec2::new(5.0, 30.0)));
    }
}
