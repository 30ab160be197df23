//! Byte cursors for payload encoding and decoding
//!
//! All integers are big-endian. Strings are a 2-byte length followed by raw
//! bytes (8-bit clean, UTF-8 by convention). Collections are a 4-byte count
//! followed by fixed-shape entries.

use super::ProtocolError;

/// Reading cursor over a payload.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::Malformed(format!(
                "truncated payload reading {what}: need {len} bytes, have {}",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn u8(&mut self, what: &str) -> Result<u8, ProtocolError> {
        Ok(self.take(1, what)?[0])
    }

    pub fn bool(&mut self, what: &str) -> Result<bool, ProtocolError> {
        Ok(self.u8(what)? != 0)
    }

    pub fn i16(&mut self, what: &str) -> Result<i16, ProtocolError> {
        let bytes = self.take(2, what)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn i32(&mut self, what: &str) -> Result<i32, ProtocolError> {
        let bytes = self.take(4, what)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn i64(&mut self, what: &str) -> Result<i64, ProtocolError> {
        let bytes = self.take(8, what)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(word))
    }

    /// 2-byte length-prefixed string.
    pub fn string(&mut self, what: &str) -> Result<String, ProtocolError> {
        let len = usize::from(u16::from_be_bytes({
            let bytes = self.take(2, what)?;
            [bytes[0], bytes[1]]
        }));
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ProtocolError::Malformed(format!("invalid utf-8 in {what}")))
    }

    /// 4-byte collection count, bounded by the bytes actually remaining.
    pub fn count(&mut self, what: &str) -> Result<usize, ProtocolError> {
        let count = usize::try_from(self.i32(what)?)
            .map_err(|_| ProtocolError::Malformed(format!("negative count for {what}")))?;
        if count > self.remaining() {
            return Err(ProtocolError::Malformed(format!(
                "count {count} for {what} exceeds remaining payload"
            )));
        }
        Ok(count)
    }

    /// Fail if any bytes were left unconsumed.
    pub fn expect_end(&self, what: &str) -> Result<(), ProtocolError> {
        if self.remaining() != 0 {
            return Err(ProtocolError::Malformed(format!(
                "{} trailing bytes after {what}",
                self.remaining()
            )));
        }
        Ok(())
    }
}

/// Writing cursor building a payload.
#[derive(Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.put_u8(u8::from(value));
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_string(&mut self, value: &str) -> Result<(), ProtocolError> {
        let len = u16::try_from(value.len()).map_err(|_| {
            ProtocolError::Malformed(format!("string of {} bytes overflows prefix", value.len()))
        })?;
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn put_count(&mut self, count: usize) -> Result<(), ProtocolError> {
        let count = i32::try_from(count)
            .map_err(|_| ProtocolError::malformed("collection count overflows prefix"))?;
        self.put_i32(count);
        Ok(())
    }
}
