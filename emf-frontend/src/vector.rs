//! SVG 矢量表面：每个绘制意图对应一个 SVG 元素，裁剪区域转为嵌套的 clipPath 分组。

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use emf_core::color::ColorRef;
use emf_core::geometry::Bounds2D;
use emf_core::object::{HatchStyle, LineCap, LineJoin};
use emf_engine::errors::SurfaceError;
use emf_engine::{
    Background, Bitmap, ClipMode, ClipRegion, ClipShape, DevicePath, DrawIntent, DrawingSurface,
    Fill, FillRule, HorizontalAlign, PathSegment, Stroke, TextRun, VerticalAlign,
};
use glam::DAffine2;
use svg::Document;
use svg::node::Text as TextNode;
use svg::node::element::{
    ClipPath, Definitions, Element, Ellipse, Group, Image, Line, Path, Pattern, Rectangle, Text,
};
use tracing::{debug, trace};

use crate::encode::encode_png;

/// 共用同一裁剪区域的一段连续元素。
struct Segment {
    clip: ClipRegion,
    elements: Vec<Element>,
}

#[derive(Default)]
pub struct SvgSurface {
    size: Option<(u32, u32)>,
    background: Background,
    definitions: Vec<Element>,
    segments: Vec<Segment>,
    next_id: usize,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成完整文档；尚未开始时返回 `None`。
    pub fn document(&self) -> Option<Document> {
        let (width, height) = self.size?;
        let mut document = Document::new()
            .set("width", width)
            .set("height", height)
            .set("viewBox", format!("0 0 {width} {height}"));
        if self.background == Background::White {
            document = document.add(
                Rectangle::new()
                    .set("width", width)
                    .set("height", height)
                    .set("fill", "#ffffff"),
            );
        }

        let mut definitions = Definitions::new();
        for element in &self.definitions {
            definitions = definitions.add(element.clone());
        }
        let mut ids = 0usize;
        let mut groups = Vec::new();
        for segment in &self.segments {
            let mut node = Group::new();
            for element in &segment.elements {
                node = node.add(element.clone());
            }
            // 由内向外逐层包裹，每个 clipPath 求交一次。
            for shapes in clip_stack(&segment.clip).into_iter().rev() {
                let id = format!("clip{ids}");
                ids += 1;
                let mut clip_path = ClipPath::new().set("id", id.clone());
                for shape in shapes {
                    clip_path = clip_path.add(clip_element(shape));
                }
                definitions = definitions.add(clip_path);
                node = Group::new()
                    .set("clip-path", format!("url(#{id})"))
                    .add(node);
            }
            groups.push(node);
        }
        document = document.add(definitions);
        for group in groups {
            document = document.add(group);
        }
        Some(document)
    }

    pub fn render(&self) -> Option<String> {
        self.document().map(|document| document.to_string())
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, element: impl Into<Element>) {
        if let Some(segment) = self.segments.last_mut() {
            segment.elements.push(element.into());
        }
    }

    fn fill_value(&mut self, fill: Option<&Fill>) -> Result<String, SurfaceError> {
        let Some(fill) = fill else {
            return Ok("none".to_string());
        };
        match fill {
            Fill::Solid(color) => Ok(hex(*color)),
            Fill::Hatch {
                style,
                color,
                background,
            } => {
                let id = self.fresh_id("hatch");
                let mut pattern = Pattern::new()
                    .set("id", id.clone())
                    .set("width", 8)
                    .set("height", 8)
                    .set("patternUnits", "userSpaceOnUse");
                if let Some(background) = background {
                    pattern = pattern.add(
                        Rectangle::new()
                            .set("width", 8)
                            .set("height", 8)
                            .set("fill", hex(*background)),
                    );
                }
                for (x1, y1, x2, y2) in hatch_lines(*style) {
                    pattern = pattern.add(
                        Line::new()
                            .set("x1", x1)
                            .set("y1", y1)
                            .set("x2", x2)
                            .set("y2", y2)
                            .set("stroke", hex(*color))
                            .set("stroke-width", 1),
                    );
                }
                self.definitions.push(pattern.into());
                Ok(format!("url(#{id})"))
            }
            Fill::Pattern(bitmap) => {
                let id = self.fresh_id("pattern");
                let pattern = Pattern::new()
                    .set("id", id.clone())
                    .set("width", bitmap.width())
                    .set("height", bitmap.height())
                    .set("patternUnits", "userSpaceOnUse")
                    .add(image_element(bitmap)?);
                self.definitions.push(pattern.into());
                Ok(format!("url(#{id})"))
            }
        }
    }

    fn paint<T: Styled>(
        &mut self,
        element: T,
        fill: Option<&Fill>,
        stroke: Option<&Stroke>,
    ) -> Result<T, SurfaceError> {
        let element = element.style("fill", self.fill_value(fill)?);
        Ok(match stroke {
            Some(stroke) => apply_stroke(element, stroke),
            None => element.style("stroke", "none".to_string()),
        })
    }

    fn text(&mut self, run: &TextRun) {
        if run.background.is_some() {
            trace!("文本背景不单独绘制");
        }
        let anchor = match run.align.0 {
            HorizontalAlign::Left => "start",
            HorizontalAlign::Center => "middle",
            HorizontalAlign::Right => "end",
        };
        let baseline = match run.align.1 {
            VerticalAlign::Top => "text-before-edge",
            VerticalAlign::Baseline => "alphabetic",
            VerticalAlign::Bottom => "text-after-edge",
        };
        let mut decoration = Vec::new();
        if run.font.underline {
            decoration.push("underline");
        }
        if run.font.strike_out {
            decoration.push("line-through");
        }
        let (x, y) = (run.origin.x, run.origin.y);
        let mut text = Text::new()
            .set("x", x)
            .set("y", y)
            .set("font-family", run.font.family.clone())
            .set("font-size", run.font.size)
            .set("font-weight", run.font.weight)
            .set("fill", hex(run.color))
            .set("text-anchor", anchor)
            .set("dominant-baseline", baseline)
            .set("xml:space", "preserve");
        if run.font.italic {
            text = text.set("font-style", "italic");
        }
        if !decoration.is_empty() {
            text = text.set("text-decoration", decoration.join(" "));
        }
        if run.font.rotation.abs() > f64::EPSILON {
            // 屏幕逆时针为正，SVG 顺时针为正。
            text = text.set("transform", format!("rotate({} {x} {y})", -run.font.rotation));
        }
        if !run.advances.is_empty() && run.align.0 == HorizontalAlign::Left {
            let mut cursor = x;
            let positions: Vec<String> = run
                .advances
                .iter()
                .map(|advance| {
                    let at = cursor;
                    cursor += advance;
                    format!("{at}")
                })
                .collect();
            text = text.set("x", positions.join(" "));
        }
        let text = text.add(TextNode::new(run.text.clone()));
        match &run.clip {
            Some(bounds) => {
                let id = self.fresh_id("textclip");
                self.definitions.push(
                    ClipPath::new()
                        .set("id", id.clone())
                        .add(rect_element(bounds))
                        .into(),
                );
                self.push(Group::new().set("clip-path", format!("url(#{id})")).add(text));
            }
            None => self.push(text),
        }
    }
}

impl DrawingSurface for SvgSurface {
    fn begin(
        &mut self,
        width: u32,
        height: u32,
        background: Background,
    ) -> Result<(), SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::InvalidSize { width, height });
        }
        *self = Self {
            size: Some((width, height)),
            background,
            segments: vec![Segment {
                clip: ClipRegion::default(),
                elements: Vec::new(),
            }],
            ..Self::default()
        };
        debug!(width, height, "创建 SVG 画布");
        Ok(())
    }

    fn draw(&mut self, intent: &DrawIntent) -> Result<(), SurfaceError> {
        if self.size.is_none() {
            return Err(SurfaceError::NotStarted);
        }
        match intent {
            DrawIntent::Rectangle { rect, fill, stroke } => {
                let element = self.paint(rect_element(rect), fill.as_ref(), stroke.as_ref())?;
                self.push(element);
            }
            DrawIntent::Ellipse { rect, fill, stroke } => {
                let center = rect.center();
                let ellipse = Ellipse::new()
                    .set("cx", center.x())
                    .set("cy", center.y())
                    .set("rx", rect.width() * 0.5)
                    .set("ry", rect.height() * 0.5);
                let element = self.paint(ellipse, fill.as_ref(), stroke.as_ref())?;
                self.push(element);
            }
            DrawIntent::Path {
                path,
                fill_rule,
                fill,
                stroke,
            } => {
                let Some(element) = path_element(path, *fill_rule) else {
                    return Ok(());
                };
                let element = self.paint(element, fill.as_ref(), stroke.as_ref())?;
                self.push(element);
            }
            DrawIntent::Text(run) => self.text(run),
            DrawIntent::Bitmap(blit) => {
                let image = image_element(&blit.bitmap)?
                    .set("transform", matrix(&blit.transform));
                self.push(image);
            }
            DrawIntent::Pixel { at, color } => self.push(
                Rectangle::new()
                    .set("x", at.x.floor())
                    .set("y", at.y.floor())
                    .set("width", 1)
                    .set("height", 1)
                    .set("fill", hex(*color)),
            ),
            DrawIntent::Clip(region) => self.segments.push(Segment {
                clip: region.clone(),
                elements: Vec::new(),
            }),
        }
        Ok(())
    }

    /// 矢量后端不产生像素。
    fn export(&self) -> Option<Bitmap> {
        None
    }
}

/// 统一设置填充与描边属性。
trait Styled: Sized {
    fn style(self, name: &str, value: String) -> Self;
}

macro_rules! styled {
    ($($ty:ty),*) => {
        $(impl Styled for $ty {
            fn style(self, name: &str, value: String) -> Self {
                self.set(name, value)
            }
        })*
    };
}

styled!(Rectangle, Ellipse, Path);

fn apply_stroke<T: Styled>(element: T, stroke: &Stroke) -> T {
    let cap = match stroke.cap {
        LineCap::Flat => "butt",
        LineCap::Round => "round",
        LineCap::Square => "square",
    };
    let join = match stroke.join {
        LineJoin::Miter => "miter",
        LineJoin::Round => "round",
        LineJoin::Bevel => "bevel",
    };
    let mut element = element
        .style("stroke", hex(stroke.color))
        .style("stroke-width", stroke.width.to_string())
        .style("stroke-linecap", cap.to_string())
        .style("stroke-linejoin", join.to_string())
        .style("stroke-miterlimit", stroke.miter_limit.to_string());
    if !stroke.dash.is_empty() {
        let dash: Vec<String> = stroke.dash.iter().map(f64::to_string).collect();
        element = element.style("stroke-dasharray", dash.join(" "));
    }
    element
}

/// 把一层层裁剪展开为需要求交的 clipPath 列表；每个 clipPath 内的形状求并。
/// 空列表表示不裁剪。
fn clip_stack(region: &ClipRegion) -> Vec<Vec<&ClipShape>> {
    let mut stack = Vec::new();
    for layer in region.layers() {
        let mut clips: Vec<Vec<&ClipShape>> = Vec::new();
        for op in &layer.ops {
            match op.mode {
                ClipMode::Copy => clips = vec![vec![&op.shape]],
                ClipMode::And => clips.push(vec![&op.shape]),
                ClipMode::Or => {
                    // 与整张画布求并仍是整张画布。
                    if let Some(last) = clips.last_mut() {
                        last.push(&op.shape);
                    }
                }
                ClipMode::Xor | ClipMode::Diff => {
                    debug!(mode = ?op.mode, "SVG 无法表示该裁剪组合，忽略");
                }
            }
        }
        stack.extend(clips);
    }
    stack
}

fn clip_element(shape: &ClipShape) -> Element {
    match shape {
        ClipShape::Rects(rects) => {
            // clipPath 内不允许 g，多个矩形合并为一条路径。
            let data: Vec<String> = rects
                .iter()
                .map(|rect| {
                    let (min, max) = (rect.min(), rect.max());
                    format!(
                        "M{} {} H{} V{} H{} Z",
                        min.x(),
                        min.y(),
                        max.x(),
                        max.y(),
                        min.x()
                    )
                })
                .collect();
            Path::new()
                .set("d", data.join(" "))
                .set("clip-rule", "nonzero")
                .into()
        }
        ClipShape::Path(path, rule) => match path_element(path, *rule) {
            Some(element) => element.set("clip-rule", rule_name(*rule)).into(),
            None => Path::new().set("d", "").into(),
        },
    }
}

fn rect_element(bounds: &Bounds2D) -> Rectangle {
    let min = bounds.min();
    Rectangle::new()
        .set("x", min.x())
        .set("y", min.y())
        .set("width", bounds.width())
        .set("height", bounds.height())
}

fn path_element(path: &DevicePath, rule: FillRule) -> Option<Path> {
    if path.is_empty() {
        return None;
    }
    let data: Vec<String> = path
        .segments()
        .iter()
        .map(|segment| match *segment {
            PathSegment::MoveTo(p) => format!("M{} {}", p.x, p.y),
            PathSegment::LineTo(p) => format!("L{} {}", p.x, p.y),
            PathSegment::CubicTo(a, b, c) => {
                format!("C{} {} {} {} {} {}", a.x, a.y, b.x, b.y, c.x, c.y)
            }
            PathSegment::Close => "Z".to_string(),
        })
        .collect();
    Some(Path::new().set("d", data.join(" ")).set("fill-rule", rule_name(rule)))
}

fn rule_name(rule: FillRule) -> &'static str {
    match rule {
        FillRule::EvenOdd => "evenodd",
        FillRule::NonZero => "nonzero",
    }
}

fn image_element(bitmap: &Bitmap) -> Result<Image, SurfaceError> {
    let png = encode_png(bitmap).map_err(|err| SurfaceError::Backend(err.to_string()))?;
    Ok(Image::new()
        .set("width", bitmap.width())
        .set("height", bitmap.height())
        .set("preserveAspectRatio", "none")
        .set("href", format!("data:image/png;base64,{}", STANDARD.encode(png))))
}

fn matrix(transform: &DAffine2) -> String {
    let m = transform.matrix2;
    let t = transform.translation;
    format!(
        "matrix({} {} {} {} {} {})",
        m.x_axis.x, m.x_axis.y, m.y_axis.x, m.y_axis.y, t.x, t.y
    )
}

fn hex(color: ColorRef) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

fn hatch_lines(style: HatchStyle) -> Vec<(f64, f64, f64, f64)> {
    let horizontal = (0.0, 3.5, 8.0, 3.5);
    let vertical = (3.5, 0.0, 3.5, 8.0);
    let forward = (0.0, 0.0, 8.0, 8.0);
    let backward = (0.0, 8.0, 8.0, 0.0);
    match style {
        HatchStyle::Horizontal => vec![horizontal],
        HatchStyle::Vertical => vec![vertical],
        HatchStyle::ForwardDiagonal => vec![forward],
        HatchStyle::BackwardDiagonal => vec![backward],
        HatchStyle::Cross => vec![horizontal, vertical],
        HatchStyle::DiagonalCross => vec![forward, backward],
    }
}
