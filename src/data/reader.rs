//! Little-endian cursor over an immutable byte buffer.
//!
//! Every multi-byte read assembles bytes least-significant first. The cursor
//! only ever moves forward; a read that would run past the end of the buffer
//! fails with [`ReadError::Truncated`] and leaves the position untouched.

use thiserror::Error;
use winnow::Parser;
use winnow::binary::{le_f32, le_f64, le_i16, le_i32, le_i64, le_u8, le_u16, le_u32};
use winnow::token::take;

use crate::data::parser_utils::{WResult, latin1_string, null_terminated, padded_string};

/// Errors produced by [`LeReader`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("truncated input: need {need} bytes at offset 0x{offset:X}, have {have}")]
    Truncated {
        offset: usize,
        need: usize,
        have: usize,
    },
}

/// Forward-only little-endian reader.
#[derive(Debug, Clone)]
pub struct LeReader<'a> {
    input: &'a [u8],
    total: usize,
}

impl<'a> LeReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            input: data,
            total: data.len(),
        }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.total - self.input.len()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn truncated(&self, need: usize) -> ReadError {
        ReadError::Truncated {
            offset: self.position(),
            need,
            have: self.remaining(),
        }
    }

    /// Run a winnow parser that consumes exactly `need` bytes.
    ///
    /// The length is checked up front so a short buffer reports how many bytes
    /// were missing rather than a generic parser failure.
    pub fn parse<O>(
        &mut self,
        need: usize,
        mut parser: impl FnMut(&mut &'a [u8]) -> WResult<O>,
    ) -> Result<O, ReadError> {
        if self.input.len() < need {
            return Err(self.truncated(need));
        }
        let mut input = self.input;
        let value = parser(&mut input).map_err(|_| self.truncated(need))?;
        self.input = input;
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        self.parse(1, |i| le_u8.parse_next(i))
    }

    pub fn read_i16(&mut self) -> Result<i16, ReadError> {
        self.parse(2, |i| le_i16.parse_next(i))
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        self.parse(2, |i| le_u16.parse_next(i))
    }

    pub fn read_i32(&mut self) -> Result<i32, ReadError> {
        self.parse(4, |i| le_i32.parse_next(i))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        self.parse(4, |i| le_u32.parse_next(i))
    }

    pub fn read_i64(&mut self) -> Result<i64, ReadError> {
        self.parse(8, |i| le_i64.parse_next(i))
    }

    pub fn read_f32(&mut self) -> Result<f32, ReadError> {
        self.parse(4, |i| le_f32.parse_next(i))
    }

    pub fn read_f64(&mut self) -> Result<f64, ReadError> {
        self.parse(8, |i| le_f64.parse_next(i))
    }

    /// Borrow the next `count` bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ReadError> {
        self.parse(count, |i| take(count).parse_next(i))
    }

    /// Read bytes up to a zero terminator.
    ///
    /// The terminator is consumed but not included in the result. A missing
    /// terminator is a truncation: the string would continue past the buffer.
    pub fn read_cstring(&mut self) -> Result<String, ReadError> {
        let bytes =
            null_terminated(self.input).ok_or_else(|| self.truncated(self.input.len() + 1))?;
        let value = latin1_string(bytes);
        self.input = &self.input[bytes.len() + 1..];
        Ok(value)
    }

    /// Read a fixed-width, null-padded string field.
    pub fn read_fixed_string(&mut self, width: usize) -> Result<String, ReadError> {
        self.parse(width, padded_string(width))
    }

    /// Advance by `count` bytes without interpreting them.
    pub fn skip(&mut self, count: usize) -> Result<(), ReadError> {
        if self.input.len() < count {
            return Err(self.truncated(count));
        }
        self.input = &self.input[count..];
        Ok(())
    }

    /// A reader over at most the next `len` bytes. Offsets stay relative to
    /// the start of the original buffer.
    pub fn limited(&self, len: usize) -> Self {
        let len = len.min(self.input.len());
        Self {
            input: &self.input[..len],
            total: self.position() + len,
        }
    }

    /// Advance to an absolute offset at or after the current position.
    pub fn seek_forward(&mut self, offset: usize) -> Result<(), ReadError> {
        let position = self.position();
        debug_assert!(offset >= position, "seek_forward called with a backwards offset");
        self.skip(offset.saturating_sub(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_primitives() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-2i16).to_le_bytes());
        data.extend_from_slice(&0xBEEFu16.to_le_bytes());
        data.extend_from_slice(&(-70_000i32).to_le_bytes());
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-0.25f64).to_le_bytes());
        data.extend_from_slice(&(i64::MIN + 7).to_le_bytes());
        data.push(0xFE);

        let mut reader = LeReader::new(&data);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_i32().unwrap(), -70_000);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), -0.25);
        assert_eq!(reader.read_i64().unwrap(), i64::MIN + 7);
        assert_eq!(reader.read_u8().unwrap(), 0xFE);
        assert!(reader.is_empty());
        assert_eq!(reader.position(), data.len());
    }

    #[test]
    fn bytes_assemble_least_significant_first() {
        let mut reader = LeReader::new(&[0x4D, 0x4D, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(reader.read_u16().unwrap(), 0x4D4D);
        assert_eq!(reader.read_u32().unwrap(), 0x0403_0201);
    }

    #[test]
    fn truncated_read_reports_shortfall_and_keeps_position() {
        let mut reader = LeReader::new(&[1, 2, 3]);
        reader.read_u8().unwrap();
        let err = reader.read_u32().unwrap_err();
        assert_eq!(
            err,
            ReadError::Truncated {
                offset: 1,
                need: 4,
                have: 2
            }
        );
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.read_u16().unwrap(), 0x0302);
    }

    #[test]
    fn cstring_excludes_terminator() {
        let mut reader = LeReader::new(b"Box01\0\x07");
        assert_eq!(reader.read_cstring().unwrap(), "Box01");
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.read_u8().unwrap(), 7);
    }

    #[test]
    fn cstring_without_terminator_is_truncated() {
        let mut reader = LeReader::new(b"abc");
        assert!(matches!(
            reader.read_cstring(),
            Err(ReadError::Truncated { offset: 0, .. })
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn skip_and_seek() {
        let data = [0u8; 10];
        let mut reader = LeReader::new(&data);
        reader.skip(3).unwrap();
        reader.seek_forward(8).unwrap();
        assert_eq!(reader.position(), 8);
        assert!(reader.skip(3).is_err());
        reader.skip(2).unwrap();
        assert!(reader.is_empty());
    }

    #[test]
    fn limited_reader_stops_at_its_end() {
        let data = [1u8, 2, 3, 4, 5, 6, 7];
        let mut reader = LeReader::new(&data);
        reader.skip(2).unwrap();

        let mut inner = reader.limited(3);
        assert_eq!(inner.position(), 2);
        assert_eq!(inner.remaining(), 3);
        assert_eq!(inner.read_u16().unwrap(), 0x0403);
        assert_eq!(
            inner.read_u16().unwrap_err(),
            ReadError::Truncated {
                offset: 4,
                need: 2,
                have: 1
            }
        );
        assert_eq!(reader.limited(100).remaining(), 5);
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn fixed_string_consumes_full_width() {
        let mut data = b"skin.pcx".to_vec();
        data.resize(64, 0);
        data.push(9);
        let mut reader = LeReader::new(&data);
        assert_eq!(reader.read_fixed_string(64).unwrap(), "skin.pcx");
        assert_eq!(reader.read_u8().unwrap(), 9);
    }
}
