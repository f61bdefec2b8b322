//! Primitive encoding/decoding for GATT payloads.
//!
//! All multi-byte integers are little-endian, as on the air.

use crate::codec::float::{sfloat_from_raw, sfloat_to_raw, MedFloat};
use crate::error::{DecodeError, EncodeError};
use crate::model::DateTime;

// =============================================================================
// DECODING
// =============================================================================

/// Reader for decoding binary data.
///
/// Wraps a byte slice and provides methods for reading primitives
/// with bounds checking and error handling.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Fails if any bytes are left unread.
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining_len() {
            0 => Ok(()),
            count => Err(DecodeError::TrailingBytes { count }),
        }
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N, context)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let [b] = self.read_array::<1>(context)?;
        Ok(b)
    }

    #[inline]
    pub fn read_u16(&mut self, context: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array(context)?))
    }

    #[inline]
    pub fn read_i16(&mut self, context: &'static str) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.read_array(context)?))
    }

    #[inline]
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array(context)?))
    }

    /// Reads an IEEE-11073 16-bit SFLOAT.
    pub fn read_sfloat(&mut self, context: &'static str) -> Result<MedFloat, DecodeError> {
        Ok(sfloat_from_raw(self.read_u16(context)?))
    }

    /// Reads a 7-byte GATT Date Time (year u16, month, day, hours, minutes, seconds).
    pub fn read_datetime(&mut self, context: &'static str) -> Result<DateTime, DecodeError> {
        let year = self.read_u16(context)?;
        let [month, day, hours, minutes, seconds] = self.read_array::<5>(context)?;
        Ok(DateTime::new(year, month, day, hours, minutes, seconds))
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Overwrites a byte already written (used to patch flag fields).
    pub fn set_byte(&mut self, pos: usize, byte: u8) {
        if let Some(slot) = self.buf.get_mut(pos) {
            *slot = byte;
        }
    }

    #[inline]
    pub fn write_u8(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes an IEEE-11073 16-bit SFLOAT.
    pub fn write_sfloat(&mut self, value: MedFloat, field: &'static str) -> Result<(), EncodeError> {
        let raw = sfloat_to_raw(value, field)?;
        self.write_u16(raw);
        Ok(())
    }

    /// Writes a 7-byte GATT Date Time.
    pub fn write_datetime(&mut self, dt: &DateTime) {
        self.write_u16(dt.year);
        self.buf
            .extend_from_slice(&[dt.month, dt.day, dt.hours, dt.minutes, dt.seconds]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_roundtrip() {
        let mut writer = Writer::new();
        writer.write_u8(0xAB);
        writer.write_u16(0xBEEF);
        writer.write_i16(-300);
        writer.write_u32(0xDEAD_BEEF);

        let mut reader = Reader::new(writer.as_bytes());
        assert_eq!(reader.read_u8("a").unwrap(), 0xAB);
        assert_eq!(reader.read_u16("b").unwrap(), 0xBEEF);
        assert_eq!(reader.read_i16("c").unwrap(), -300);
        assert_eq!(reader.read_u32("d").unwrap(), 0xDEAD_BEEF);
        assert!(reader.is_empty());
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_little_endian_layout() {
        let mut writer = Writer::new();
        writer.write_u16(0x0102);
        writer.write_u32(0x0304_0506);
        assert_eq!(writer.as_bytes(), &[0x02, 0x01, 0x06, 0x05, 0x04, 0x03]);
    }

    #[test]
    fn test_datetime_roundtrip() {
        let dt = DateTime::new(2024, 3, 15, 14, 30, 5);
        let mut writer = Writer::new();
        writer.write_datetime(&dt);
        assert_eq!(writer.len(), 7);
        assert_eq!(writer.as_bytes(), &[0xE8, 0x07, 3, 15, 14, 30, 5]);

        let mut reader = Reader::new(writer.as_bytes());
        assert_eq!(reader.read_datetime("time").unwrap(), dt);
    }

    #[test]
    fn test_unexpected_eof() {
        let data = [0u8; 5];
        let mut reader = Reader::new(&data);
        let result = reader.read_bytes(10, "test");
        assert!(matches!(result, Err(DecodeError::UnexpectedEof { .. })));
        // A failed read consumes nothing
        assert_eq!(reader.position(), 0);
        assert!(matches!(reader.read_u32("x"), Ok(0)));
        assert!(matches!(reader.read_u16("y"), Err(DecodeError::UnexpectedEof { context: "y" })));
    }

    #[test]
    fn test_trailing_bytes() {
        let data = [1u8, 2, 3];
        let mut reader = Reader::new(&data);
        reader.read_u8("a").unwrap();
        assert_eq!(reader.finish(), Err(DecodeError::TrailingBytes { count: 2 }));
    }

    #[test]
    fn test_set_byte() {
        let mut writer = Writer::new();
        writer.write_u8(0);
        writer.write_u8(7);
        writer.set_byte(0, 0x1F);
        writer.set_byte(10, 0xFF);
        assert_eq!(writer.into_bytes(), vec![0x1F, 7]);
    }
}
