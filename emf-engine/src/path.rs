//! 逻辑坐标下的图形轮廓构造。结果再经设备变换写入 [`DevicePath`]。

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use emf_core::geometry::{RectL, SizeL};
use glam::DVec2;

use crate::intent::DevicePath;

/// 圆弧方向，取值与 AD_* 一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    CounterClockwise,
    Clockwise,
}

impl ArcDirection {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(ArcDirection::CounterClockwise),
            2 => Some(ArcDirection::Clockwise),
            _ => None,
        }
    }
}

/// 参数化椭圆：`center + (rx cos t, ry sin t)`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseArc {
    pub center: DVec2,
    pub radii: DVec2,
    pub start: f64,
    pub sweep: f64,
}

impl EllipseArc {
    /// 由外接框与两个径向点构造；两点方向重合时为整圆。
    pub fn from_box(bounds: &RectL, start: DVec2, end: DVec2, direction: ArcDirection) -> Self {
        let center = bounds.center();
        let radii = DVec2::new(bounds.width() as f64 * 0.5, bounds.height() as f64 * 0.5);
        let angle_of = |p: DVec2| {
            let d = p - center;
            let nx = if radii.x == 0.0 { d.x } else { d.x / radii.x };
            let ny = if radii.y == 0.0 { d.y } else { d.y / radii.y };
            ny.atan2(nx)
        };
        let a = angle_of(start);
        let b = angle_of(end);
        // y 轴向下时参数增大即屏幕上的顺时针。
        let sweep = match direction {
            ArcDirection::Clockwise => {
                let s = (b - a).rem_euclid(TAU);
                if s == 0.0 { TAU } else { s }
            }
            ArcDirection::CounterClockwise => {
                let s = (a - b).rem_euclid(TAU);
                if s == 0.0 { -TAU } else { -s }
            }
        };
        Self {
            center,
            radii,
            start: a,
            sweep,
        }
    }

    /// `AngleArc`：角度以度为单位、逆时针为正。角度不是有限值时返回 `None`。
    ///
    /// 超过一整圈的扫掠只多画一圈以内的余量，终点仍在 `start + sweep`。
    pub fn angle_arc(center: DVec2, radius: f64, start_deg: f64, sweep_deg: f64) -> Option<Self> {
        let start = start_deg.to_radians();
        let mut sweep = sweep_deg.to_radians();
        if !start.is_finite() || !sweep.is_finite() {
            return None;
        }
        if sweep.abs() > TAU {
            sweep = sweep.signum() * (TAU + sweep.abs().rem_euclid(TAU));
        }
        Some(Self {
            center,
            radii: DVec2::new(radius, -radius),
            start: start.rem_euclid(TAU),
            sweep,
        })
    }

    pub fn point_at(&self, t: f64) -> DVec2 {
        self.center + DVec2::new(self.radii.x * t.cos(), self.radii.y * t.sin())
    }

    #[inline]
    pub fn start_point(&self) -> DVec2 {
        self.point_at(self.start)
    }

    #[inline]
    pub fn end_point(&self) -> DVec2 {
        self.point_at(self.start + self.sweep)
    }

    fn tangent_at(&self, t: f64) -> DVec2 {
        DVec2::new(-self.radii.x * t.sin(), self.radii.y * t.cos())
    }

    /// 不超过 90° 一段的三次贝塞尔近似，每项为 (c1, c2, end)。
    pub fn cubics(&self) -> Vec<[DVec2; 3]> {
        if self.sweep == 0.0 {
            return Vec::new();
        }
        let segments = (self.sweep.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = self.sweep / segments as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        (0..segments)
            .map(|i| {
                let a = self.start + step * i as f64;
                let b = a + step;
                let p0 = self.point_at(a);
                let p3 = self.point_at(b);
                [p0 + self.tangent_at(a) * k, p3 - self.tangent_at(b) * k, p3]
            })
            .collect()
    }

    /// 把弧段追加到已开始的图形上。
    pub fn extend(&self, path: &mut DevicePath) {
        for [c1, c2, end] in self.cubics() {
            path.cubic_to(c1, c2, end);
        }
    }
}

pub fn rect_outline(bounds: &RectL) -> DevicePath {
    let mut path = DevicePath::new();
    let [a, b, c, d] = bounds.corners().map(|p| p.as_dvec2());
    path.move_to(a);
    path.line_to(b);
    path.line_to(c);
    path.line_to(d);
    path.close();
    path
}

pub fn ellipse_outline(bounds: &RectL) -> DevicePath {
    let center = bounds.center();
    let arc = EllipseArc {
        center,
        radii: DVec2::new(bounds.width() as f64 * 0.5, bounds.height() as f64 * 0.5),
        start: 0.0,
        sweep: TAU,
    };
    let mut path = DevicePath::new();
    path.move_to(arc.start_point());
    arc.extend(&mut path);
    path.close();
    path
}

/// 圆角矩形；`corner` 为圆角椭圆的宽高。
pub fn round_rect_outline(bounds: &RectL, corner: SizeL) -> DevicePath {
    let rect = bounds.normalized();
    let (left, top) = (rect.left as f64, rect.top as f64);
    let (right, bottom) = (rect.right as f64, rect.bottom as f64);
    let rx = (corner.cx.unsigned_abs() as f64 * 0.5).min((right - left) * 0.5);
    let ry = (corner.cy.unsigned_abs() as f64 * 0.5).min((bottom - top) * 0.5);
    if rx <= 0.0 || ry <= 0.0 {
        return rect_outline(&rect);
    }
    let quarter = |center: DVec2, start: f64| EllipseArc {
        center,
        radii: DVec2::new(rx, ry),
        start,
        sweep: FRAC_PI_2,
    };

    let mut path = DevicePath::new();
    path.move_to(DVec2::new(left + rx, top));
    path.line_to(DVec2::new(right - rx, top));
    quarter(DVec2::new(right - rx, top + ry), -FRAC_PI_2).extend(&mut path);
    path.line_to(DVec2::new(right, bottom - ry));
    quarter(DVec2::new(right - rx, bottom - ry), 0.0).extend(&mut path);
    path.line_to(DVec2::new(left + rx, bottom));
    quarter(DVec2::new(left + rx, bottom - ry), FRAC_PI_2).extend(&mut path);
    path.line_to(DVec2::new(left, top + ry));
    quarter(DVec2::new(left + rx, top + ry), PI).extend(&mut path);
    path.close();
    path
}

/// 折线或多边形轮廓。
pub fn polyline(points: &[DVec2], closed: bool) -> DevicePath {
    let mut path = DevicePath::new();
    let mut iter = points.iter().copied();
    if let Some(first) = iter.next() {
        path.move_to(first);
        for point in iter {
            path.line_to(point);
        }
        if closed {
            path.close();
        }
    }
    path
}

/// 以第一个点为起点、其后每三个点构成一段三次贝塞尔；不足三个的尾部被忽略。
pub fn bezier(points: &[DVec2]) -> DevicePath {
    let mut path = DevicePath::new();
    if let Some((&first, rest)) = points.split_first() {
        path.move_to(first);
        append_beziers(&mut path, rest);
    }
    path
}

pub fn append_beziers(path: &mut DevicePath, points: &[DVec2]) {
    for chunk in points.chunks_exact(3) {
        path.cubic_to(chunk[0], chunk[1], chunk[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::PathSegment;

    fn close(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-6
    }

    #[test]
    fn quarter_arc_uses_one_cubic() {
        let bounds = RectL::new(-10, -10, 10, 10);
        let arc = EllipseArc::from_box(
            &bounds,
            DVec2::new(10.0, 0.0),
            DVec2::new(0.0, 10.0),
            ArcDirection::Clockwise,
        );
        assert!((arc.sweep - FRAC_PI_2).abs() < 1e-9);
        let cubics = arc.cubics();
        assert_eq!(cubics.len(), 1);
        assert!(close(cubics[0][2], DVec2::new(0.0, 10.0)));
        // 中点误差不超过半径的千分之一。
        let [c1, c2, end] = cubics[0];
        let p0 = arc.start_point();
        let mid = (p0 + c1 * 3.0 + c2 * 3.0 + end) / 8.0;
        assert!((mid.length() - 10.0).abs() < 0.01);
    }

    #[test]
    fn counter_clockwise_goes_the_long_way() {
        let bounds = RectL::new(-10, -10, 10, 10);
        let arc = EllipseArc::from_box(
            &bounds,
            DVec2::new(10.0, 0.0),
            DVec2::new(0.0, 10.0),
            ArcDirection::CounterClockwise,
        );
        assert!((arc.sweep + 3.0 * FRAC_PI_2).abs() < 1e-9);
        assert_eq!(arc.cubics().len(), 3);
        assert!(close(arc.end_point(), DVec2::new(0.0, 10.0)));

        let full = EllipseArc::from_box(
            &bounds,
            DVec2::new(10.0, 0.0),
            DVec2::new(20.0, 0.0),
            ArcDirection::CounterClockwise,
        );
        assert!((full.sweep + TAU).abs() < 1e-9);
        assert_eq!(full.cubics().len(), 4);
    }

    #[test]
    fn angle_arc_runs_counter_clockwise_on_screen() {
        let arc = EllipseArc::angle_arc(DVec2::ZERO, 10.0, 0.0, 90.0).expect("finite");
        assert!(close(arc.start_point(), DVec2::new(10.0, 0.0)));
        assert!(close(arc.end_point(), DVec2::new(0.0, -10.0)));
    }

    #[test]
    fn angle_arc_sweep_beyond_a_turn_stays_bounded() {
        let arc = EllipseArc::angle_arc(DVec2::ZERO, 10.0, 0.0, 3.0 * 360.0 + 90.0)
            .expect("finite");
        assert!(arc.cubics().len() <= 8);
        assert!(close(arc.end_point(), DVec2::new(0.0, -10.0)));
        let last = arc.cubics().last().map(|[_, _, end]| *end).expect("segments");
        assert!(close(last, arc.end_point()));

        let huge = EllipseArc::angle_arc(DVec2::ZERO, 10.0, 0.0, f32::MAX as f64)
            .expect("finite");
        assert!(huge.cubics().len() <= 8);
        assert!(EllipseArc::angle_arc(DVec2::ZERO, 10.0, 0.0, f64::INFINITY).is_none());
        assert!(EllipseArc::angle_arc(DVec2::ZERO, 10.0, f64::NAN, 90.0).is_none());
    }

    #[test]
    fn round_rect_degenerates_to_rect() {
        let bounds = RectL::new(0, 0, 20, 10);
        assert_eq!(
            round_rect_outline(&bounds, SizeL::new(0, 0)),
            rect_outline(&bounds)
        );
        let rounded = round_rect_outline(&bounds, SizeL::new(4, 4));
        let cubics = rounded
            .segments()
            .iter()
            .filter(|s| matches!(s, PathSegment::CubicTo(..)))
            .count();
        assert_eq!(cubics, 4);
    }

    #[test]
    fn bezier_ignores_incomplete_tail() {
        let points: Vec<DVec2> = (0..6).map(|i| DVec2::splat(i as f64)).collect();
        let path = bezier(&points);
        assert_eq!(path.segments().len(), 2);
    }
}
