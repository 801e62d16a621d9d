//! 记录流的分帧与顶层解码循环。

use byteorder::{ByteOrder, LittleEndian};
use emf_core::record::{Header, Metafile, Record, record_type};
use tracing::{debug, trace, warn};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::header::decode_header;
use crate::reader::RecordReader;
use crate::records::decoder_for;
use crate::{DecodeError, DecodeOutcome};

/// 每条记录的 type + size 前缀。
pub const RECORD_HEADER_SIZE: usize = 8;
/// 记录体之后不足一个字的余量视为对齐填充。
const ALIGNMENT_SLACK: u64 = 4;

/// 流中一条记录的解码结果。
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub offset: u64,
    pub size: u32,
    pub record: Record,
    /// 记录被降级或部分解码时的原因。
    pub issue: Option<DiagnosticKind>,
}

fn frame(bytes: &[u8], offset: usize) -> Result<(u32, u32), DecodeError> {
    let available = bytes.len().saturating_sub(offset);
    if available < RECORD_HEADER_SIZE {
        return Err(DecodeError::StreamTruncated {
            offset: offset as u64,
            declared: RECORD_HEADER_SIZE as u64,
            available: available as u64,
        });
    }
    let record_type = LittleEndian::read_u32(&bytes[offset..]);
    let size = LittleEndian::read_u32(&bytes[offset + 4..]);
    if (size as usize) < RECORD_HEADER_SIZE {
        return Err(DecodeError::InvalidRecordSize {
            offset: offset as u64,
            size,
        });
    }
    if size as usize > available {
        return Err(DecodeError::StreamTruncated {
            offset: offset as u64,
            declared: u64::from(size),
            available: available as u64,
        });
    }
    Ok((record_type, size))
}

/// 解码一条非头部记录；失败时退化为不透明记录并给出原因。
fn decode_body(record_type: u32, bytes: &[u8]) -> (Record, Option<DiagnosticKind>) {
    let declared = bytes.len() as u64;
    let opaque = Record::Opaque {
        record_type,
        size: declared as u32,
    };
    let Some(decode) = decoder_for(record_type) else {
        if !record_type::is_known(record_type) {
            return (opaque, Some(DiagnosticKind::UnknownRecordType));
        }
        trace!(record = record_type::name(record_type), "记录按不透明数据跳过");
        return (opaque, None);
    };

    let mut reader = RecordReader::new(bytes);
    let result = reader
        .seek_to("Type", RECORD_HEADER_SIZE as u32, 0)
        .and_then(|()| decode(record_type, &mut reader));
    match result {
        Ok(record) => {
            let consumed = reader.consumed();
            let issue = (declared - consumed >= ALIGNMENT_SLACK)
                .then_some(DiagnosticKind::SizeMismatch { consumed, declared });
            (record, issue)
        }
        Err(err) => (opaque, Some(err.into())),
    }
}

/// 解码 `bytes` 开头的一条记录，返回记录与消费的字节数。
///
/// 消费量总是记录声明的长度，与解码函数实际读取了多少无关。
pub fn decode_record(bytes: &[u8]) -> Result<(Record, usize), DecodeError> {
    let (record_type, size) = frame(bytes, 0)?;
    let body = &bytes[..size as usize];
    if record_type == record_type::HEADER {
        let header = decode_header(&mut RecordReader::new(body))?;
        return Ok((Record::Header(Box::new(header)), size as usize));
    }
    let (record, _) = decode_body(record_type, body);
    Ok((record, size as usize))
}

/// 逐条产出记录的流式解码器。分帧错误之后不再产出任何记录。
pub struct RecordDecoder<'a> {
    bytes: &'a [u8],
    position: usize,
    failed: bool,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            failed: false,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.position)
    }

    /// 读取流首的头部记录；首条记录不是头部时报错。
    pub fn read_header(&mut self) -> Result<Header, DecodeError> {
        let (kind, size) = match frame(self.bytes, self.position) {
            Ok(frame) => frame,
            Err(err) => {
                self.failed = true;
                return Err(err);
            }
        };
        if kind != record_type::HEADER {
            self.failed = true;
            return Err(DecodeError::MissingHeader { record_type: kind });
        }
        let end = self.position + size as usize;
        let header = decode_header(&mut RecordReader::new(&self.bytes[self.position..end]));
        if header.is_err() {
            self.failed = true;
        }
        self.position = end;
        header
    }
}

impl Iterator for RecordDecoder<'_> {
    type Item = Result<DecodedRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining() == 0 {
            return None;
        }
        let offset = self.position;
        let (kind, size) = match frame(self.bytes, offset) {
            Ok(frame) => frame,
            Err(err) => {
                self.failed = true;
                return Some(Err(err));
            }
        };
        let body = &self.bytes[offset..offset + size as usize];
        let (record, issue) = if kind == record_type::HEADER {
            (
                Record::Opaque {
                    record_type: kind,
                    size,
                },
                Some(DiagnosticKind::MalformedRecord {
                    message: "header record after the start of the stream".to_string(),
                }),
            )
        } else {
            decode_body(kind, body)
        };
        trace!(offset, size, record = record.name(), "解码记录");
        self.position = offset + size as usize;
        Some(Ok(DecodedRecord {
            offset: offset as u64,
            size,
            record,
            issue,
        }))
    }
}

/// 解码整个图元文件。
///
/// 头部错误直接返回；头部之后的分帧错误记入 [`DecodeOutcome::fatal`]，
/// 已解码的记录保留。
pub fn decode_metafile(bytes: &[u8]) -> Result<DecodeOutcome, DecodeError> {
    let mut decoder = RecordDecoder::new(bytes);
    let header = decoder.read_header()?;
    debug!(
        bounds = ?header.bounds,
        declared_records = header.records,
        handles = header.handles,
        "解析 EMF 头部"
    );

    let mut metafile = Metafile::new(header);
    let mut diagnostics = Vec::new();
    let mut fatal = None;
    let mut reached_eof = false;

    for next in decoder.by_ref() {
        let decoded = match next {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, "记录流中断，保留已解码的记录");
                fatal = Some(err);
                break;
            }
        };
        let is_eof = matches!(decoded.record, Record::Eof(_));
        if let Some(kind) = decoded.issue {
            let diagnostic = Diagnostic {
                offset: decoded.offset,
                index: (!is_eof).then_some(metafile.len()),
                record_type: Some(decoded.record.record_type()),
                kind,
            };
            match diagnostic.kind {
                DiagnosticKind::SizeMismatch { .. } => debug!(%diagnostic, "记录未完全消费"),
                _ => warn!(%diagnostic, "记录降级"),
            }
            diagnostics.push(diagnostic);
        }
        match decoded.record {
            Record::Eof(eof) => {
                metafile.set_eof(eof);
                reached_eof = true;
                break;
            }
            record => metafile.push(record),
        }
    }

    if fatal.is_none() {
        let offset = decoder.position() as u64;
        if !reached_eof {
            warn!(offset, "记录流缺少 EOF");
            diagnostics.push(Diagnostic::stream(offset, DiagnosticKind::MissingEof));
        } else if decoder.remaining() > 0 {
            let bytes = decoder.remaining() as u64;
            debug!(offset, bytes, "EOF 之后存在多余数据");
            diagnostics.push(Diagnostic::stream(offset, DiagnosticKind::TrailingData { bytes }));
        }
    }

    debug!(
        records = metafile.len(),
        diagnostics = diagnostics.len(),
        "EMF 解码完成"
    );
    Ok(DecodeOutcome {
        metafile,
        diagnostics,
        fatal,
    })
}
