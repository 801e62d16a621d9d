use std::path::PathBuf;

use emf_engine::errors::EngineError;
use emf_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Load(#[from] IoError),
    #[error("playback failed: {0}")]
    Playback(#[from] EngineError),
    #[error("failed to encode {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{backend} output is disabled, rebuild with `--features {backend}`")]
    BackendDisabled { backend: &'static str },
}
