//! Minimal binary reader/writer for the NEF container and the stack-item
//! storage codec. Variable-length integers follow the network encoding:
//! one byte below 0xfd, then 0xfd/0xfe/0xff markers for 16/32/64 bits.

use crate::error::{Error, Result};

#[derive(Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_var_int(&mut self, value: u64) {
        match value {
            0..=0xfc => self.write_u8(value as u8),
            0xfd..=0xffff => {
                self.write_u8(0xfd);
                self.write_u16(value as u16);
            }
            0x1_0000..=0xffff_ffff => {
                self.write_u8(0xfe);
                self.write_u32(value as u32);
            }
            _ => {
                self.write_u8(0xff);
                self.write_u64(value);
            }
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_var_int(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn write_var_string(&mut self, value: &str) {
        self.write_var_bytes(value.as_bytes());
    }

    /// Writes a string into a zero-padded field of exactly `len` bytes.
    pub fn write_fixed_string(&mut self, value: &str, len: usize) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > len {
            return Err(Error::Encoding(format!(
                "string longer than fixed field of {len} bytes"
            )));
        }
        self.write_bytes(bytes);
        self.buf.extend(std::iter::repeat(0u8).take(len - bytes.len()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::Encoding(format!(
                "unexpected end of input: need {len}, have {}",
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(out))
    }

    pub fn read_var_int(&mut self, max: u64) -> Result<u64> {
        let first = self.read_u8()?;
        let value = match first {
            0xfd => self.read_u16()? as u64,
            0xfe => self.read_u32()? as u64,
            0xff => self.read_u64()?,
            _ => first as u64,
        };
        if value > max {
            return Err(Error::Encoding(format!(
                "variable-length value {value} exceeds limit {max}"
            )));
        }
        Ok(value)
    }

    pub fn read_var_bytes(&mut self, max: usize) -> Result<&'a [u8]> {
        let len = self.read_var_int(max as u64)? as usize;
        self.read_bytes(len)
    }

    pub fn read_var_string(&mut self, max: usize) -> Result<String> {
        let bytes = self.read_var_bytes(max)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::Encoding(format!("invalid utf-8 string: {e}")))
    }

    /// Reads a zero-padded fixed-length string field.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        if bytes[end..].iter().any(|&b| b != 0) {
            return Err(Error::Encoding("garbage after string terminator".into()));
        }
        String::from_utf8(bytes[..end].to_vec())
            .map_err(|e| Error::Encoding(format!("invalid utf-8 string: {e}")))
    }

    pub fn expect_end(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::Encoding(format!(
                "{} trailing bytes after structure",
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_int_round_trip() {
        for value in [0u64, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, u32::MAX as u64, u64::MAX] {
            let mut writer = BinaryWriter::new();
            writer.write_var_int(value);
            let bytes = writer.into_bytes();
            let mut reader = BinaryReader::new(&bytes);
            assert_eq!(reader.read_var_int(u64::MAX).unwrap(), value);
            reader.expect_end().unwrap();
        }
    }

    #[test]
    fn var_int_enforces_limit() {
        let mut writer = BinaryWriter::new();
        writer.write_var_int(1000);
        let bytes = writer.into_bytes();
        assert!(BinaryReader::new(&bytes).read_var_int(999).is_err());
    }

    #[test]
    fn fixed_string_round_trip() {
        let mut writer = BinaryWriter::new();
        writer.write_fixed_string("neo-core-v3.0", 64).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 64);
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_fixed_string(64).unwrap(), "neo-core-v3.0");
    }
}
