use std::fmt;

use emf_core::record::record_type;
use serde::Serialize;
use thiserror::Error;

/// 非致命的解码问题：记录被跳过或降级为不透明记录，解码继续。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    #[error("unknown record type")]
    UnknownRecordType,
    #[error("{field} at offset {offset} ({length} bytes) falls outside the {size}-byte record")]
    MalformedOffset {
        field: &'static str,
        offset: u64,
        length: u64,
        size: u64,
    },
    #[error("malformed record: {message}")]
    MalformedRecord { message: String },
    #[error("decoder consumed {consumed} of {declared} declared bytes")]
    SizeMismatch { consumed: u64, declared: u64 },
    #[error("stream ended without an EOF record")]
    MissingEof,
    #[error("{bytes} bytes follow the EOF record")]
    TrailingData { bytes: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 问题记录在流中的字节偏移。
    pub offset: u64,
    /// 记录在回放序列中的下标；头部、EOF 与流级问题没有下标。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<u32>,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn stream(offset: u64, kind: DiagnosticKind) -> Self {
        Self {
            offset,
            index: None,
            record_type: None,
            kind,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record_type {
            Some(ty) => write!(
                f,
                "{} (0x{ty:02X}) at offset {}: {}",
                record_type::name(ty),
                self.offset,
                self.kind
            ),
            None => write!(f, "offset {}: {}", self.offset, self.kind),
        }
    }
}
