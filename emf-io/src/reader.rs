//! 单条记录范围内的小端读取器。偏移一律相对记录起始，读取不会越过记录声明的长度。

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use emf_core::color::ColorRef;
use emf_core::geometry::{PointL, PointS, RectL, SizeL, XForm};
use emf_core::object::PaletteEntry;

use crate::diagnostics::DiagnosticKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordError {
    OutOfBounds {
        position: u64,
        needed: u64,
        len: u64,
    },
    MalformedOffset {
        field: &'static str,
        offset: u64,
        length: u64,
        len: u64,
    },
    Invalid {
        message: String,
    },
}

impl RecordError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl From<RecordError> for DiagnosticKind {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::OutOfBounds {
                position,
                needed,
                len,
            } => DiagnosticKind::MalformedRecord {
                message: format!("read of {needed} bytes at {position} overruns record of {len} bytes"),
            },
            RecordError::MalformedOffset {
                field,
                offset,
                length,
                len,
            } => DiagnosticKind::MalformedOffset {
                field,
                offset,
                length,
                size: len,
            },
            RecordError::Invalid { message } => DiagnosticKind::MalformedRecord { message },
        }
    }
}

pub(crate) struct RecordReader<'a> {
    cursor: Cursor<&'a [u8]>,
    /// 固定前缀的结束位置，偏移字段不得指回其中。
    floor: u64,
    furthest: u64,
}

impl<'a> RecordReader<'a> {
    /// `bytes` 为整条记录（含 8 字节记录头）。
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            floor: 0,
            furthest: 0,
        }
    }

    #[inline]
    pub(crate) fn position(&self) -> u64 {
        self.cursor.position()
    }

    #[inline]
    pub(crate) fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    #[inline]
    pub(crate) fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    /// 解码过程中到达过的最远位置；偏移字段可能让游标回跳。
    #[inline]
    pub(crate) fn consumed(&self) -> u64 {
        self.furthest.max(self.position())
    }

    /// 标记固定前缀结束，此后的偏移定位只能落在当前位置之后。
    pub(crate) fn end_prefix(&mut self) {
        self.floor = self.position();
    }

    /// 消费记录剩余的全部字节。
    pub(crate) fn skip_rest(&mut self) {
        let len = self.len();
        self.cursor.set_position(len);
        self.furthest = len;
    }

    fn read<T>(
        &mut self,
        needed: u64,
        read: impl FnOnce(&mut Cursor<&'a [u8]>) -> io::Result<T>,
    ) -> Result<T, RecordError> {
        let position = self.position();
        let len = self.len();
        if self.remaining() < needed {
            return Err(RecordError::OutOfBounds {
                position,
                needed,
                len,
            });
        }
        let value = read(&mut self.cursor).map_err(|_| RecordError::OutOfBounds {
            position,
            needed,
            len,
        })?;
        self.furthest = self.furthest.max(self.position());
        Ok(value)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, RecordError> {
        self.read(1, |c| c.read_u8())
    }

    pub(crate) fn u16(&mut self) -> Result<u16, RecordError> {
        self.read(2, |c| c.read_u16::<LittleEndian>())
    }

    pub(crate) fn i16(&mut self) -> Result<i16, RecordError> {
        self.read(2, |c| c.read_i16::<LittleEndian>())
    }

    pub(crate) fn u32(&mut self) -> Result<u32, RecordError> {
        self.read(4, |c| c.read_u32::<LittleEndian>())
    }

    pub(crate) fn i32(&mut self) -> Result<i32, RecordError> {
        self.read(4, |c| c.read_i32::<LittleEndian>())
    }

    pub(crate) fn f32(&mut self) -> Result<f32, RecordError> {
        self.read(4, |c| c.read_f32::<LittleEndian>())
    }

    pub(crate) fn point_l(&mut self) -> Result<PointL, RecordError> {
        Ok(PointL::new(self.i32()?, self.i32()?))
    }

    pub(crate) fn point_s(&mut self) -> Result<PointL, RecordError> {
        let x = self.i16()?;
        let y = self.i16()?;
        Ok(PointS { x, y }.into())
    }

    pub(crate) fn size_l(&mut self) -> Result<SizeL, RecordError> {
        Ok(SizeL::new(self.i32()?, self.i32()?))
    }

    pub(crate) fn rect_l(&mut self) -> Result<RectL, RecordError> {
        Ok(RectL::new(self.i32()?, self.i32()?, self.i32()?, self.i32()?))
    }

    pub(crate) fn color(&mut self) -> Result<ColorRef, RecordError> {
        self.u32().map(ColorRef::from_u32)
    }

    pub(crate) fn palette_entry(&mut self) -> Result<PaletteEntry, RecordError> {
        let raw = self.read(4, |c| {
            let mut buf = [0u8; 4];
            c.read_exact(&mut buf)?;
            Ok(buf)
        })?;
        Ok(PaletteEntry {
            flags: raw[0],
            blue: raw[1],
            green: raw[2],
            red: raw[3],
        })
    }

    pub(crate) fn xform(&mut self) -> Result<XForm, RecordError> {
        Ok(XForm {
            m11: self.f32()?,
            m12: self.f32()?,
            m21: self.f32()?,
            m22: self.f32()?,
            dx: self.f32()?,
            dy: self.f32()?,
        })
    }

    pub(crate) fn bytes(&mut self, length: u64) -> Result<Vec<u8>, RecordError> {
        self.read(length, |c| {
            let mut buf = vec![0u8; length as usize];
            c.read_exact(&mut buf)?;
            Ok(buf)
        })
    }

    /// 读取定长 UTF-16 字段，截断到第一个 NUL。
    pub(crate) fn utf16_fixed(&mut self, units: usize) -> Result<String, RecordError> {
        let mut buf = Vec::with_capacity(units);
        for _ in 0..units {
            buf.push(self.u16()?);
        }
        let end = buf.iter().position(|&unit| unit == 0).unwrap_or(buf.len());
        Ok(String::from_utf16_lossy(&buf[..end]))
    }

    /// 跳到偏移处，跨过其间未定义的填充。
    pub(crate) fn seek_to(
        &mut self,
        field: &'static str,
        offset: u32,
        length: u64,
    ) -> Result<(), RecordError> {
        let offset = u64::from(offset);
        let len = self.len();
        let fits = offset
            .checked_add(length)
            .is_some_and(|end| end <= len);
        if offset < self.floor || !fits {
            return Err(RecordError::MalformedOffset {
                field,
                offset,
                length,
                len,
            });
        }
        self.cursor.set_position(offset);
        Ok(())
    }

    /// 按偏移读取 `count` 个定长元素；先校验整块范围，再分配。
    pub(crate) fn array_at<T>(
        &mut self,
        field: &'static str,
        offset: u32,
        count: u32,
        element_size: u64,
        mut read: impl FnMut(&mut Self) -> Result<T, RecordError>,
    ) -> Result<Vec<T>, RecordError> {
        self.seek_to(field, offset, u64::from(count) * element_size)?;
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    /// 紧随当前位置的数组。
    pub(crate) fn array_here<T>(
        &mut self,
        field: &'static str,
        count: u32,
        element_size: u64,
        mut read: impl FnMut(&mut Self) -> Result<T, RecordError>,
    ) -> Result<Vec<T>, RecordError> {
        let position = self.position();
        let needed = u64::from(count) * element_size;
        if needed > self.remaining() {
            return Err(RecordError::MalformedOffset {
                field,
                offset: position,
                length: needed,
                len: self.len(),
            });
        }
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    pub(crate) fn bytes_at(
        &mut self,
        field: &'static str,
        offset: u32,
        length: u32,
    ) -> Result<Vec<u8>, RecordError> {
        self.seek_to(field, offset, u64::from(length))?;
        self.bytes(u64::from(length))
    }
}
