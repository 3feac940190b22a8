//! Value codec primitives.
//!
//! Fixed-width little-endian scalars and 32-bit length-prefixed blobs.
//! [`BufferWriter`] appends into a `BytesMut`; [`BufferReader`] is a
//! bounds-checked view over a borrowed slice. `bytes::Buf` getters panic on
//! underflow, so every read checks `remaining()` first and reports
//! [`TypeError::UnexpectedEnd`] instead.
//!
//! ```text
//! u8/i8      1 byte
//! u16/i16    2 bytes LE
//! u32/i32    4 bytes LE
//! f32        4 bytes LE (IEEE 754)
//! f64        8 bytes LE (IEEE 754)
//! bool       1 byte, 0 or 1
//! string     u32 LE length + UTF-8 bytes
//! buffer     u32 LE length + bytes
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::TypeError;

/// Appends encoded values to a growable buffer.
#[derive(Debug, Default)]
pub struct BufferWriter {
    buf: BytesMut,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.put_u8(u8::from(v));
    }

    /// Writes a 32-bit element count or byte length.
    pub fn write_len(&mut self, len: usize) -> Result<(), TypeError> {
        let len = u32::try_from(len).map_err(|_| TypeError::TooLong(len))?;
        self.buf.put_u32_le(len);
        Ok(())
    }

    /// Writes a length-prefixed byte blob.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TypeError> {
        self.write_len(bytes.len())?;
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, s: &str) -> Result<(), TypeError> {
        self.write_bytes(s.as_bytes())
    }

    /// Appends already-encoded bytes without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Reads encoded values from a borrowed slice.
#[derive(Debug, Clone)]
pub struct BufferReader<'a> {
    buf: &'a [u8],
}

impl<'a> BufferReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), TypeError> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(TypeError::UnexpectedEnd { needed, remaining });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, TypeError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8, TypeError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn read_u16(&mut self) -> Result<u16, TypeError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_i16(&mut self) -> Result<i16, TypeError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, TypeError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, TypeError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_f32(&mut self) -> Result<f32, TypeError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_f64(&mut self) -> Result<f64, TypeError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    pub fn read_bool(&mut self) -> Result<bool, TypeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(TypeError::InvalidBool(other)),
        }
    }

    /// Reads a 32-bit element count or byte length.
    pub fn read_len(&mut self) -> Result<usize, TypeError> {
        Ok(self.read_u32()? as usize)
    }

    /// Reads a length-prefixed byte blob.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, TypeError> {
        let len = self.read_len()?;
        self.ensure(len)?;
        let bytes = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(bytes)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, TypeError> {
        String::from_utf8(self.read_bytes()?).map_err(|_| TypeError::InvalidUtf8)
    }

    /// Fails if any bytes are left unread.
    pub fn finish(self) -> Result<(), TypeError> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(TypeError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_are_little_endian() {
        let mut w = BufferWriter::new();
        w.write_u16(0x0102);
        w.write_i32(-2);
        assert_eq!(w.as_slice(), &[0x02, 0x01, 0xfe, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_scalar_round_trip() {
        let mut w = BufferWriter::new();
        w.write_u8(200);
        w.write_i8(-100);
        w.write_u16(60_000);
        w.write_i16(-30_000);
        w.write_u32(4_000_000_000);
        w.write_i32(-2_000_000_000);
        w.write_f32(1.5);
        w.write_f64(-0.25);
        w.write_bool(true);
        let bytes = w.into_vec();

        let mut r = BufferReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 200);
        assert_eq!(r.read_i8().unwrap(), -100);
        assert_eq!(r.read_u16().unwrap(), 60_000);
        assert_eq!(r.read_i16().unwrap(), -30_000);
        assert_eq!(r.read_u32().unwrap(), 4_000_000_000);
        assert_eq!(r.read_i32().unwrap(), -2_000_000_000);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_f64().unwrap(), -0.25);
        assert!(r.read_bool().unwrap());
        r.finish().unwrap();
    }

    #[test]
    fn test_string_is_length_prefixed() {
        let mut w = BufferWriter::new();
        w.write_str("hi").unwrap();
        assert_eq!(w.as_slice(), &[2, 0, 0, 0, b'h', b'i']);

        let bytes = w.into_vec();
        let mut r = BufferReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "hi");
    }

    #[test]
    fn test_read_past_end_is_an_error() {
        let mut r = BufferReader::new(&[1, 2]);
        assert_eq!(
            r.read_u32(),
            Err(TypeError::UnexpectedEnd {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_blob_length_longer_than_buffer_is_an_error() {
        // Header claims 100 bytes, only 1 follows.
        let mut r = BufferReader::new(&[100, 0, 0, 0, 7]);
        assert!(matches!(
            r.read_bytes(),
            Err(TypeError::UnexpectedEnd { needed: 100, .. })
        ));
    }

    #[test]
    fn test_invalid_bool_byte() {
        let mut r = BufferReader::new(&[2]);
        assert_eq!(r.read_bool(), Err(TypeError::InvalidBool(2)));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut r = BufferReader::new(&[1, 0, 0, 0, 0xff]);
        assert_eq!(r.read_string(), Err(TypeError::InvalidUtf8));
    }

    #[test]
    fn test_finish_reports_trailing_bytes() {
        let mut r = BufferReader::new(&[1, 2, 3]);
        r.read_u8().unwrap();
        assert_eq!(r.finish(), Err(TypeError::TrailingBytes(2)));
    }
}
