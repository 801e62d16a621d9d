use std::fs;
use std::path::Path;

use emf_core::record::Metafile;
use thiserror::Error;
use tracing::info;

mod decoder;
mod diagnostics;
mod dib;
mod header;
mod reader;
mod records;

pub use decoder::{
    DecodedRecord, RECORD_HEADER_SIZE, RecordDecoder, decode_metafile, decode_record,
};
pub use diagnostics::{Diagnostic, DiagnosticKind};

/// 使解码无法继续的错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("stream truncated at offset {offset}: record needs {declared} bytes, {available} available")]
    StreamTruncated {
        offset: u64,
        declared: u64,
        available: u64,
    },
    #[error("record at offset {offset} declares invalid size {size}")]
    InvalidRecordSize { offset: u64, size: u32 },
    #[error("header signature mismatch: found {found:#010x}")]
    HeaderSignatureMismatch { found: u32 },
    #[error("stream does not start with a header record (found type {record_type:#x})")]
    MissingHeader { record_type: u32 },
    #[error("header record too small: {size} bytes")]
    HeaderTooSmall { size: u32 },
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid metafile {path:?}: {source}")]
    Decode {
        path: std::path::PathBuf,
        #[source]
        source: DecodeError,
    },
}

/// 一次解码的完整结果：可能不完整的图元文件、非致命诊断以及中断原因。
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    pub metafile: Metafile,
    pub diagnostics: Vec<Diagnostic>,
    pub fatal: Option<DecodeError>,
}

impl DecodeOutcome {
    /// 记录流完整读到 EOF 且没有中断。
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none() && self.metafile.eof().is_some()
    }
}

pub trait MetafileLoader {
    fn load(&self, path: &Path) -> Result<DecodeOutcome, IoError>;
}

pub struct EmfFacade;

impl EmfFacade {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DecodeOutcome, DecodeError> {
        decode_metafile(bytes)
    }
}

impl Default for EmfFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl MetafileLoader for EmfFacade {
    fn load(&self, path: &Path) -> Result<DecodeOutcome, IoError> {
        let data = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), bytes = data.len(), "读取 EMF 文件");
        self.decode(&data).map_err(|source| IoError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}
