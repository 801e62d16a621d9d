pub mod encode;
pub mod errors;
pub mod loader;
pub mod summary;

#[cfg(feature = "raster")]
pub mod raster;
#[cfg(feature = "vector")]
pub mod vector;

use std::fs;
use std::path::Path;

use emf_config::{AppConfig, BackgroundMode, OutputFormat};
use emf_core::record::Metafile;
use emf_engine::{Background, PlaybackOptions, PlaybackReport};
use errors::FrontendError;
use tracing::info;

/// 一次转换的渲染与输出选项。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    pub playback: PlaybackOptions,
    /// 输出扩展名无法识别时使用的格式。
    pub default_format: OutputFormat,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            playback: PlaybackOptions::default(),
            default_format: OutputFormat::Png,
        }
    }
}

impl ConvertOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let background = match config.render.background {
            BackgroundMode::White => Background::White,
            BackgroundMode::Transparent => Background::Transparent,
        };
        Self {
            playback: PlaybackOptions {
                background,
                scale: config.render.scale,
                max_dimension: config.render.max_dimension,
            },
            default_format: config.output.default_format,
        }
    }

    /// 按扩展名选择输出格式。
    pub fn format_for(&self, output: &Path) -> OutputFormat {
        OutputFormat::from_extension(output).unwrap_or(self.default_format)
    }
}

/// 光栅化并编码为 PNG。
pub fn render_png(
    metafile: &Metafile,
    options: &PlaybackOptions,
) -> Result<(Vec<u8>, PlaybackReport), FrontendError> {
    #[cfg(feature = "raster")]
    {
        let mut surface = raster::RasterSurface::new();
        let report = emf_engine::play(metafile, &mut surface, options)?;
        let bitmap = emf_engine::DrawingSurface::export(&surface).ok_or_else(|| {
            FrontendError::Encode {
                format: "png",
                message: "raster surface produced no pixels".to_string(),
            }
        })?;
        Ok((encode::encode_png(&bitmap)?, report))
    }
    #[cfg(not(feature = "raster"))]
    {
        let _ = (metafile, options);
        Err(FrontendError::BackendDisabled { backend: "raster" })
    }
}

/// 回放为 SVG 文档文本。
pub fn render_svg(
    metafile: &Metafile,
    options: &PlaybackOptions,
) -> Result<(String, PlaybackReport), FrontendError> {
    #[cfg(feature = "vector")]
    {
        let mut surface = vector::SvgSurface::new();
        let report = emf_engine::play(metafile, &mut surface, options)?;
        let document = surface.render().ok_or_else(|| FrontendError::Encode {
            format: "svg",
            message: "vector surface was never started".to_string(),
        })?;
        Ok((document, report))
    }
    #[cfg(not(feature = "vector"))]
    {
        let _ = (metafile, options);
        Err(FrontendError::BackendDisabled { backend: "vector" })
    }
}

/// 读取 `input`，按 `output` 的扩展名渲染并写出。
pub fn convert(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<PlaybackReport, FrontendError> {
    let loaded = loader::load_metafile(input)?;
    let metafile = &loaded.outcome.metafile;
    let format = options.format_for(output);
    let (bytes, report) = match format {
        OutputFormat::Png => render_png(metafile, &options.playback)?,
        OutputFormat::Svg => {
            let (document, report) = render_svg(metafile, &options.playback)?;
            (document.into_bytes(), report)
        }
    };
    fs::write(output, bytes).map_err(|source| FrontendError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    info!(
        output = %output.display(),
        format = ?format,
        width = report.width,
        height = report.height,
        skipped = report.skipped.len(),
        "转换完成"
    );
    Ok(report)
}
