use crate::errors::SurfaceError;
use crate::intent::{Bitmap, DrawIntent};

/// 画布的初始填充。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    White,
    Transparent,
}

impl Background {
    /// BGRA 字节。
    pub fn bgra(self) -> [u8; 4] {
        match self {
            Background::White => [255, 255, 255, 255],
            Background::Transparent => [0, 0, 0, 0],
        }
    }
}

/// 回放驱动唯一依赖的绘图能力。
pub trait DrawingSurface {
    /// 以给定尺寸和背景开始一张新画布。
    fn begin(&mut self, width: u32, height: u32, background: Background)
    -> Result<(), SurfaceError>;

    fn draw(&mut self, intent: &DrawIntent) -> Result<(), SurfaceError>;

    /// 导出像素；不产生像素的后端返回 `None`。
    fn export(&self) -> Option<Bitmap>;
}

/// 按顺序记录所有意图，不做任何绘制。
#[derive(Debug, Default)]
pub struct RecordingSurface {
    size: Option<(u32, u32)>,
    background: Background,
    intents: Vec<DrawIntent>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    #[inline]
    pub fn background(&self) -> Background {
        self.background
    }

    #[inline]
    pub fn intents(&self) -> &[DrawIntent] {
        &self.intents
    }

    pub fn into_intents(self) -> Vec<DrawIntent> {
        self.intents
    }
}

impl DrawingSurface for RecordingSurface {
    fn begin(
        &mut self,
        width: u32,
        height: u32,
        background: Background,
    ) -> Result<(), SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::InvalidSize { width, height });
        }
        self.size = Some((width, height));
        self.background = background;
        self.intents.clear();
        Ok(())
    }

    fn draw(&mut self, intent: &DrawIntent) -> Result<(), SurfaceError> {
        if self.size.is_none() {
            return Err(SurfaceError::NotStarted);
        }
        self.intents.push(intent.clone());
        Ok(())
    }

    fn export(&self) -> Option<Bitmap> {
        None
    }
}
