#![allow(dead_code)]

use emf_core::record::{EMF_SIGNATURE, record_type};

/// 按字段拼装一条记录，`build` 时补齐 4 字节对齐并写入 type/size。
pub struct RecordBuilder {
    record_type: u32,
    body: Vec<u8>,
}

impl RecordBuilder {
    pub fn new(record_type: u32) -> Self {
        Self {
            record_type,
            body: Vec::new(),
        }
    }

    /// 当前记录长度（含 8 字节记录头）。
    pub fn len(&self) -> u32 {
        8 + self.body.len() as u32
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.body.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.body.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i16(mut self, value: i16) -> Self {
        self.body.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.body.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.body.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn f32(mut self, value: f32) -> Self {
        self.body.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn point(self, x: i32, y: i32) -> Self {
        self.i32(x).i32(y)
    }

    pub fn rect(self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.i32(left).i32(top).i32(right).i32(bottom)
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn utf16(mut self, text: &str) -> Self {
        for unit in text.encode_utf16() {
            self.body.extend_from_slice(&unit.to_le_bytes());
        }
        self
    }

    /// 用零字节补到指定的记录长度。
    pub fn pad_to(mut self, len: u32) -> Self {
        while self.len() < len {
            self.body.push(0);
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut body = self.body;
        while body.len() % 4 != 0 {
            body.push(0);
        }
        let size = 8 + body.len() as u32;
        let mut bytes = Vec::with_capacity(size as usize);
        bytes.extend_from_slice(&self.record_type.to_le_bytes());
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(&body);
        bytes
    }
}

/// 88 字节的基础头部字段。
pub fn header_fields(bounds: [i32; 4], signature: u32) -> RecordBuilder {
    described_header_fields(bounds, signature, 0, 0)
}

pub fn described_header_fields(
    bounds: [i32; 4],
    signature: u32,
    description_len: u32,
    description_offset: u32,
) -> RecordBuilder {
    RecordBuilder::new(record_type::HEADER)
        .rect(bounds[0], bounds[1], bounds[2], bounds[3])
        .rect(0, 0, 2646, 2646)
        .u32(signature)
        .u32(0x0001_0000)
        .u32(0)
        .u32(0)
        .u16(1)
        .u16(0)
        .u32(description_len)
        .u32(description_offset)
        .u32(0)
        .point(1024, 768)
        .point(320, 240)
}

pub fn header_record(bounds: [i32; 4]) -> Vec<u8> {
    header_fields(bounds, EMF_SIGNATURE).build()
}

pub fn eof_record() -> Vec<u8> {
    RecordBuilder::new(record_type::EOF)
        .u32(0)
        .u32(16)
        .u32(20)
        .build()
}

pub fn stream(records: &[Vec<u8>]) -> Vec<u8> {
    records.concat()
}

pub fn rectangle(left: i32, top: i32, right: i32, bottom: i32) -> Vec<u8> {
    RecordBuilder::new(record_type::RECTANGLE)
        .rect(left, top, right, bottom)
        .build()
}

/// 40 字节 BITMAPINFOHEADER。
pub fn info_header(width: i32, height: i32, bit_count: u16) -> Vec<u8> {
    RecordBuilder::new(0)
        .u32(40)
        .i32(width)
        .i32(height)
        .u16(1)
        .u16(bit_count)
        .u32(0)
        .u32(0)
        .i32(0)
        .i32(0)
        .u32(0)
        .u32(0)
        .build()[8..]
        .to_vec()
}
