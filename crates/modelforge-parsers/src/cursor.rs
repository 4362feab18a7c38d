//! Position-tracked binary reader
//!
//! All binary parsers read through [`Cursor`], which keeps an explicit
//! offset so malformed files fail with the position at which the data
//! ran out instead of a bare slice panic.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use modelforge_core::error::{Error, Result};

/// Byte order for multi-byte reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// A bounds-checked reader over a byte slice
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Cursor<'a> {
    /// Create a little-endian cursor at offset 0
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, endian: Endian::Little }
    }

    /// Create a cursor with an explicit byte order
    #[must_use]
    pub const fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self { data, pos: 0, endian }
    }

    /// Switch byte order for subsequent reads
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Current offset from the start of the slice
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying slice
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the underlying slice is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when every byte has been consumed
    #[must_use]
    pub const fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Jump to an absolute offset. The offset may equal the slice
    /// length (the end position) but not exceed it.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::UnexpectedEof { offset: offset as u64 });
        }
        self.pos = offset;
        Ok(())
    }

    /// Advance past `count` bytes
    pub fn skip(&mut self, count: usize) -> Result<()> {
        let target = self.pos.checked_add(count).ok_or(Error::UnexpectedEof {
            offset: self.data.len() as u64,
        })?;
        self.seek(target)
    }

    /// Next byte without advancing
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Advance one byte if one remains
    pub fn advance(&mut self) {
        if self.pos < self.data.len() {
            self.pos += 1;
        }
    }

    /// Consume bytes while `pred` holds, returning the span
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.pos < self.data.len() && pred(self.data[self.pos]) {
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    /// Read a raw byte slice
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(count).ok_or(Error::UnexpectedEof {
            offset: self.data.len() as u64,
        })?;
        if end > self.data.len() {
            return Err(Error::UnexpectedEof { offset: self.pos as u64 });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read one signed byte
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a 16-bit unsigned integer
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u16(b),
            Endian::Big => BigEndian::read_u16(b),
        })
    }

    /// Read a 16-bit signed integer
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Read a 32-bit unsigned integer
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u32(b),
            Endian::Big => BigEndian::read_u32(b),
        })
    }

    /// Read a 32-bit signed integer
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a 32-bit float
    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.read_bytes(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_f32(b),
            Endian::Big => BigEndian::read_f32(b),
        })
    }

    /// Read a 64-bit float
    pub fn read_f64(&mut self) -> Result<f64> {
        let b = self.read_bytes(8)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_f64(b),
            Endian::Big => BigEndian::read_f64(b),
        })
    }

    /// Read a NUL-terminated string. Consumes the terminator; invalid
    /// UTF-8 bytes are replaced rather than rejected since legacy
    /// exporters write arbitrary code pages here.
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos] != 0 {
            self.pos += 1;
        }
        if self.pos >= self.data.len() {
            return Err(Error::UnexpectedEof { offset: start as u64 });
        }
        let s = String::from_utf8_lossy(&self.data[start..self.pos]).into_owned();
        self.pos += 1; // terminator
        Ok(s)
    }

    /// Read a text line up to and including `\n`, returned without the
    /// line ending (`\r\n` and `\n` both accepted). A final unterminated
    /// line is returned as-is.
    pub fn read_line(&mut self) -> Result<&'a str> {
        if self.at_end() {
            return Err(Error::UnexpectedEof { offset: self.pos as u64 });
        }
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
            self.pos += 1;
        }
        let mut end = self.pos;
        if self.pos < self.data.len() {
            self.pos += 1; // newline
        }
        if end > start && self.data[end - 1] == b'\r' {
            end -= 1;
        }
        std::str::from_utf8(&self.data[start..end])
            .map_err(|_| Error::invalid_data("line is not valid UTF-8"))
    }
}
