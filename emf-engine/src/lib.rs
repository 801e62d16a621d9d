pub mod context;
pub mod dib;
pub mod intent;
pub mod mapping;
pub mod objects;
pub mod path;
pub mod playback;
pub mod surface;

pub use context::{DcState, DeviceContext};
pub use intent::{
    Bitmap, BitmapBlit, ClipLayer, ClipMode, ClipOp, ClipRegion, ClipShape, DevicePath,
    DrawIntent, Fill, FillRule, FontSpec, HorizontalAlign, PathSegment, Stroke, TextRun,
    VerticalAlign,
};
pub use objects::HandleTable;
pub use playback::{PlaybackOptions, PlaybackReport, SkippedRecord, play};
pub use surface::{Background, DrawingSurface, RecordingSurface};

pub mod errors {
    use thiserror::Error;

    /// 单条记录回放失败的原因；回放驱动记录后跳过该记录继续。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum EngineError {
        #[error("handle {handle:#x} is not present in the stock or dynamic table")]
        UnresolvedHandle { handle: u32 },
        #[error("handle {handle:#x} refers to a {found}, expected a {expected}")]
        UnexpectedObjectKind {
            handle: u32,
            expected: &'static str,
            found: &'static str,
        },
        #[error("unsupported bitmap: {0}")]
        UnsupportedBitmap(String),
        #[error("invalid bitmap: {0}")]
        InvalidBitmap(String),
        #[error("invalid argument: {0}")]
        InvalidArgument(String),
        #[error(transparent)]
        Surface(#[from] SurfaceError),
    }

    /// 绘图后端的错误。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum SurfaceError {
        #[error("surface size {width}x{height} is not usable")]
        InvalidSize { width: u32, height: u32 },
        #[error("surface has not been started")]
        NotStarted,
        #[error("backend failure: {0}")]
        Backend(String),
    }
}
