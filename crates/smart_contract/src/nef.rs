//! The NEF container: compiled script plus metadata, integrity-checked
//! with a double-SHA256 checksum.

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};
use neo_core::UInt160;
use sha2::{Digest, Sha256};

/// "NEF3" in little-endian.
pub const NEF_MAGIC: u32 = 0x3346454E;
pub const MAX_SCRIPT_LENGTH: usize = 512 * 1024;
const MAX_SOURCE_LENGTH: usize = 256;
const MAX_TOKENS: usize = 128;
const COMPILER_FIELD_LENGTH: usize = 64;

/// A call-site token referencing a method on another contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodToken {
    pub hash: UInt160,
    pub method: String,
    pub parameters_count: u16,
    pub has_return_value: bool,
    pub call_flags: u8,
}

/// A compiled contract in the NEF container format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NefFile {
    pub compiler: String,
    pub source: String,
    pub tokens: Vec<MethodToken>,
    pub script: Vec<u8>,
    pub checksum: u32,
}

impl NefFile {
    /// Builds a container around `script`, computing the checksum.
    pub fn new(compiler: &str, script: Vec<u8>) -> Result<Self> {
        let mut nef = Self {
            compiler: compiler.to_string(),
            source: String::new(),
            tokens: Vec::new(),
            script,
            checksum: 0,
        };
        nef.checksum = nef.compute_checksum()?;
        Ok(nef)
    }

    /// Parses and integrity-checks a serialized container.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(bytes);
        let magic = reader.read_u32()?;
        if magic != NEF_MAGIC {
            return Err(Error::Encoding(format!("wrong NEF magic 0x{magic:08x}")));
        }
        let compiler = reader.read_fixed_string(COMPILER_FIELD_LENGTH)?;
        let source = reader.read_var_string(MAX_SOURCE_LENGTH)?;
        if reader.read_u8()? != 0 {
            return Err(Error::Encoding("reserved byte must be zero".into()));
        }
        let token_count = reader.read_var_int(MAX_TOKENS as u64)? as usize;
        let mut tokens = Vec::with_capacity(token_count);
        for _ in 0..token_count {
            tokens.push(MethodToken {
                hash: UInt160::from_bytes(reader.read_bytes(UInt160::LEN)?)?,
                method: reader.read_var_string(32)?,
                parameters_count: reader.read_u16()?,
                has_return_value: reader.read_u8()? != 0,
                call_flags: reader.read_u8()?,
            });
        }
        if reader.read_u16()? != 0 {
            return Err(Error::Encoding("reserved field must be zero".into()));
        }
        let script = reader.read_var_bytes(MAX_SCRIPT_LENGTH)?.to_vec();
        if script.is_empty() {
            return Err(Error::Encoding("script is empty".into()));
        }
        let checksum = reader.read_u32()?;
        reader.expect_end()?;
        let nef = Self {
            compiler,
            source,
            tokens,
            script,
            checksum,
        };
        if checksum != nef.compute_checksum()? {
            return Err(Error::Encoding("NEF checksum mismatch".into()));
        }
        Ok(nef)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = self.write_body()?;
        writer.write_u32(self.checksum);
        Ok(writer.into_bytes())
    }

    /// First four bytes of SHA256(SHA256(body)).
    pub fn compute_checksum(&self) -> Result<u32> {
        let body = self.write_body()?.into_bytes();
        let digest = Sha256::digest(Sha256::digest(&body));
        Ok(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }

    fn write_body(&self) -> Result<BinaryWriter> {
        if self.script.is_empty() {
            return Err(Error::Encoding("script is empty".into()));
        }
        if self.script.len() > MAX_SCRIPT_LENGTH {
            return Err(Error::Encoding("script too long".into()));
        }
        let mut writer = BinaryWriter::new();
        writer.write_u32(NEF_MAGIC);
        writer.write_fixed_string(&self.compiler, COMPILER_FIELD_LENGTH)?;
        writer.write_var_string(&self.source);
        writer.write_u8(0);
        writer.write_var_int(self.tokens.len() as u64);
        for token in &self.tokens {
            writer.write_bytes(token.hash.as_bytes());
            writer.write_var_string(&token.method);
            writer.write_u16(token.parameters_count);
            writer.write_u8(token.has_return_value as u8);
            writer.write_u8(token.call_flags);
        }
        writer.write_u16(0);
        writer.write_var_bytes(&self.script);
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_checksum() {
        let nef = NefFile::new("neo-core-v3.0", vec![0x10, 0x40]).unwrap();
        let bytes = nef.to_bytes().unwrap();
        let parsed = NefFile::parse(&bytes).unwrap();
        assert_eq!(parsed, nef);
    }

    #[test]
    fn corrupted_script_fails_checksum() {
        let nef = NefFile::new("neo-core-v3.0", vec![0x10, 0x40]).unwrap();
        let mut bytes = nef.to_bytes().unwrap();
        let script_pos = bytes.len() - 6;
        bytes[script_pos] ^= 0xff;
        assert!(NefFile::parse(&bytes).is_err());
    }

    #[test]
    fn rejects_wrong_magic() {
        let nef = NefFile::new("c", vec![0x40]).unwrap();
        let mut bytes = nef.to_bytes().unwrap();
        bytes[0] ^= 1;
        assert!(NefFile::parse(&bytes).is_err());
    }

    #[test]
    fn rejects_empty_script() {
        assert!(NefFile::new("c", Vec::new()).is_err());
    }
}
