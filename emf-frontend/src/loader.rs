use std::path::{Path, PathBuf};

use emf_io::{DecodeOutcome, EmfFacade, MetafileLoader};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 加载后的图元文件及其来源。
#[derive(Debug)]
pub struct LoadedMetafile {
    pub path: PathBuf,
    pub outcome: DecodeOutcome,
}

/// 读取并解码 EMF 文件。诊断与中断只记录日志，已恢复的记录照常返回。
pub fn load_metafile(path: &Path) -> Result<LoadedMetafile, FrontendError> {
    load_with(&EmfFacade::new(), path)
}

pub fn load_with(
    loader: &dyn MetafileLoader,
    path: &Path,
) -> Result<LoadedMetafile, FrontendError> {
    let outcome = loader.load(path)?;
    for diagnostic in &outcome.diagnostics {
        warn!(
            path = %path.display(),
            offset = diagnostic.offset,
            index = ?diagnostic.index,
            record_type = ?diagnostic.record_type,
            "{}",
            diagnostic.kind
        );
    }
    if let Some(fatal) = &outcome.fatal {
        warn!(path = %path.display(), error = %fatal, "解码中断，使用已恢复的记录");
    }
    info!(
        path = %path.display(),
        records = outcome.metafile.len(),
        diagnostics = outcome.diagnostics.len(),
        "加载 EMF 文档完成"
    );
    Ok(LoadedMetafile {
        path: path.to_path_buf(),
        outcome,
    })
}
