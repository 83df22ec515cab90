//! Instruction data field writer and reader.
//!
//! ```text
//! discriminator   8 bytes
//! u8              1 byte
//! u64 / i64       8 bytes, little-endian
//! pubkey          32 raw bytes
//! string          u8 length + UTF-8 bytes
//! ```

use chain_sol::Pubkey;

use crate::error::EncodeError;

/// Longest string representable behind a one-byte length prefix.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Appends fields to an instruction data buffer, discriminator first.
#[derive(Debug, Clone)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    pub fn new(discriminator: [u8; 8]) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&discriminator);
        Self { buf }
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i64(mut self, value: i64) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn pubkey(mut self, key: &Pubkey) -> Self {
        self.buf.extend_from_slice(key);
        self
    }

    /// Append a length-prefixed string; `field` names it in the error.
    pub fn string(mut self, field: &'static str, value: &str) -> Result<Self, EncodeError> {
        let bytes = value.as_bytes();
        let len = u8::try_from(bytes.len()).map_err(|_| EncodeError::StringTooLong {
            field,
            len: bytes.len(),
            max: MAX_STRING_LEN,
        })?;
        self.buf.push(len);
        self.buf.extend_from_slice(bytes);
        Ok(self)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads fields back out of instruction data, after the discriminator.
#[derive(Debug)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Split off the 8-byte discriminator and return a reader for the rest.
    pub fn with_discriminator(data: &'a [u8]) -> Result<([u8; 8], Self), EncodeError> {
        let mut reader = Self::new(data);
        let disc = reader.array::<8>()?;
        Ok((disc, reader))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], EncodeError> {
        let remaining = self.data.len() - self.pos;
        if n > remaining {
            return Err(EncodeError::Truncated { needed: n, remaining });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], EncodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, EncodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn u64(&mut self) -> Result<u64, EncodeError> {
        self.array::<8>().map(u64::from_le_bytes)
    }

    pub fn i64(&mut self) -> Result<i64, EncodeError> {
        self.array::<8>().map(i64::from_le_bytes)
    }

    pub fn pubkey(&mut self) -> Result<Pubkey, EncodeError> {
        self.array::<32>()
    }

    pub fn string(&mut self) -> Result<String, EncodeError> {
        let len = self.u8()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| EncodeError::InvalidArgument(format!("string is not UTF-8: {e}")))
    }

    /// Fail if any bytes were left unread.
    pub fn finish(self) -> Result<(), EncodeError> {
        match self.data.len() - self.pos {
            0 => Ok(()),
            n => Err(EncodeError::TrailingBytes(n)),
        }
    }
}
