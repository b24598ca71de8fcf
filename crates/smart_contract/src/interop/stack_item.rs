use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};
use neo_core::{ECPoint, UInt160, UInt256};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

// Type tags of the storage codec, shared with the wire format.
const TAG_ANY: u8 = 0x00;
const TAG_BOOLEAN: u8 = 0x20;
const TAG_INTEGER: u8 = 0x21;
const TAG_BYTE_STRING: u8 = 0x28;
const TAG_BUFFER: u8 = 0x30;
const TAG_ARRAY: u8 = 0x40;
const TAG_STRUCT: u8 = 0x41;
const TAG_MAP: u8 = 0x48;

/// Limits applied when decoding persisted items.
const MAX_INTEGER_BYTES: usize = 32;
const MAX_ITEM_BYTES: usize = u16::MAX as usize;
const MAX_COLLECTION_LEN: u64 = 2048;
const MAX_NESTING_DEPTH: u32 = 10;

/// A value on the VM's evaluation stack.
///
/// Native handlers receive their arguments and produce their results in
/// this representation; domain records map to and from it through
/// [`Interoperable`](crate::interop::Interoperable).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackItem {
    Null,
    Boolean(bool),
    Integer(BigInt),
    ByteString(Vec<u8>),
    Buffer(Vec<u8>),
    Array(Vec<StackItem>),
    Struct(Vec<StackItem>),
    Map(Vec<(StackItem, StackItem)>),
}

impl StackItem {
    pub fn is_null(&self) -> bool {
        matches!(self, StackItem::Null)
    }

    /// Interprets the item as an integer. Byte strings convert through
    /// the signed little-endian encoding; null and compound items fault.
    pub fn as_int(&self) -> Result<BigInt> {
        match self {
            StackItem::Boolean(b) => Ok(BigInt::from(*b as u8)),
            StackItem::Integer(v) => Ok(v.clone()),
            StackItem::ByteString(bytes) | StackItem::Buffer(bytes) => {
                if bytes.len() > MAX_INTEGER_BYTES {
                    return Err(Error::InvalidArgument("integer too large".into()));
                }
                Ok(BigInt::from_signed_bytes_le(bytes))
            }
            other => Err(Error::InvalidArgument(format!(
                "expected an integer, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        self.as_int()?
            .to_u32()
            .ok_or_else(|| Error::InvalidArgument("value out of u32 range".into()))
    }

    pub fn as_i64(&self) -> Result<i64> {
        self.as_int()?
            .to_i64()
            .ok_or_else(|| Error::InvalidArgument("value out of i64 range".into()))
    }

    /// Truthiness: null is false, integers compare against zero, byte
    /// strings are true when any byte is set.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            StackItem::Null => Ok(false),
            StackItem::Boolean(b) => Ok(*b),
            StackItem::Integer(v) => Ok(!v.is_zero()),
            StackItem::ByteString(bytes) | StackItem::Buffer(bytes) => {
                Ok(bytes.iter().any(|&b| b != 0))
            }
            _ => Ok(true),
        }
    }

    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        match self {
            StackItem::ByteString(bytes) | StackItem::Buffer(bytes) => Ok(bytes.clone()),
            StackItem::Integer(v) => Ok(v.to_signed_bytes_le()),
            StackItem::Boolean(b) => Ok(vec![*b as u8]),
            other => Err(Error::InvalidArgument(format!(
                "expected bytes, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_string(&self) -> Result<String> {
        String::from_utf8(self.as_bytes()?)
            .map_err(|e| Error::InvalidArgument(format!("invalid utf-8: {e}")))
    }

    pub fn as_uint160(&self) -> Result<UInt160> {
        Ok(UInt160::from_bytes(&self.as_bytes()?)?)
    }

    pub fn as_uint256(&self) -> Result<UInt256> {
        Ok(UInt256::from_bytes(&self.as_bytes()?)?)
    }

    pub fn as_ecpoint(&self) -> Result<ECPoint> {
        Ok(ECPoint::from_bytes(&self.as_bytes()?)?)
    }

    pub fn as_array(&self) -> Result<&[StackItem]> {
        match self {
            StackItem::Array(items) | StackItem::Struct(items) => Ok(items),
            other => Err(Error::InvalidArgument(format!(
                "expected an array, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::Null => "Null",
            StackItem::Boolean(_) => "Boolean",
            StackItem::Integer(_) => "Integer",
            StackItem::ByteString(_) => "ByteString",
            StackItem::Buffer(_) => "Buffer",
            StackItem::Array(_) => "Array",
            StackItem::Struct(_) => "Struct",
            StackItem::Map(_) => "Map",
        }
    }

    /// Encodes for storage. Fails on values the codec cannot represent
    /// (oversized payloads, excessive nesting).
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        self.write_to(&mut writer, 0)?;
        Ok(writer.into_bytes())
    }

    fn write_to(&self, writer: &mut BinaryWriter, depth: u32) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::Encoding("stack item nesting too deep".into()));
        }
        match self {
            StackItem::Null => writer.write_u8(TAG_ANY),
            StackItem::Boolean(b) => {
                writer.write_u8(TAG_BOOLEAN);
                writer.write_u8(*b as u8);
            }
            StackItem::Integer(v) => {
                let bytes = v.to_signed_bytes_le();
                if bytes.len() > MAX_INTEGER_BYTES {
                    return Err(Error::Encoding("integer exceeds 32 bytes".into()));
                }
                writer.write_u8(TAG_INTEGER);
                writer.write_var_bytes(&bytes);
            }
            StackItem::ByteString(bytes) => {
                if bytes.len() > MAX_ITEM_BYTES {
                    return Err(Error::Encoding("byte string too long".into()));
                }
                writer.write_u8(TAG_BYTE_STRING);
                writer.write_var_bytes(bytes);
            }
            StackItem::Buffer(bytes) => {
                if bytes.len() > MAX_ITEM_BYTES {
                    return Err(Error::Encoding("buffer too long".into()));
                }
                writer.write_u8(TAG_BUFFER);
                writer.write_var_bytes(bytes);
            }
            StackItem::Array(items) => {
                writer.write_u8(TAG_ARRAY);
                writer.write_var_int(items.len() as u64);
                for item in items {
                    item.write_to(writer, depth + 1)?;
                }
            }
            StackItem::Struct(items) => {
                writer.write_u8(TAG_STRUCT);
                writer.write_var_int(items.len() as u64);
                for item in items {
                    item.write_to(writer, depth + 1)?;
                }
            }
            StackItem::Map(pairs) => {
                writer.write_u8(TAG_MAP);
                writer.write_var_int(pairs.len() as u64);
                for (key, value) in pairs {
                    key.write_to(writer, depth + 1)?;
                    value.write_to(writer, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    /// Decodes a stored item. Malformed shapes fault rather than decode
    /// to a default.
    pub fn deserialize(bytes: &[u8]) -> Result<StackItem> {
        let mut reader = BinaryReader::new(bytes);
        let item = Self::read_from(&mut reader, 0)?;
        reader.expect_end()?;
        Ok(item)
    }

    fn read_from(reader: &mut BinaryReader<'_>, depth: u32) -> Result<StackItem> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::Encoding("stack item nesting too deep".into()));
        }
        let tag = reader.read_u8()?;
        match tag {
            TAG_ANY => Ok(StackItem::Null),
            TAG_BOOLEAN => Ok(StackItem::Boolean(reader.read_u8()? != 0)),
            TAG_INTEGER => {
                let bytes = reader.read_var_bytes(MAX_INTEGER_BYTES)?;
                Ok(StackItem::Integer(BigInt::from_signed_bytes_le(bytes)))
            }
            TAG_BYTE_STRING => Ok(StackItem::ByteString(
                reader.read_var_bytes(MAX_ITEM_BYTES)?.to_vec(),
            )),
            TAG_BUFFER => Ok(StackItem::Buffer(
                reader.read_var_bytes(MAX_ITEM_BYTES)?.to_vec(),
            )),
            TAG_ARRAY | TAG_STRUCT => {
                let len = reader.read_var_int(MAX_COLLECTION_LEN)?;
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(Self::read_from(reader, depth + 1)?);
                }
                Ok(if tag == TAG_ARRAY {
                    StackItem::Array(items)
                } else {
                    StackItem::Struct(items)
                })
            }
            TAG_MAP => {
                let len = reader.read_var_int(MAX_COLLECTION_LEN)?;
                let mut pairs = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    let key = Self::read_from(reader, depth + 1)?;
                    let value = Self::read_from(reader, depth + 1)?;
                    pairs.push((key, value));
                }
                Ok(StackItem::Map(pairs))
            }
            other => Err(Error::Encoding(format!("unknown stack item tag 0x{other:02x}"))),
        }
    }
}

impl From<bool> for StackItem {
    fn from(value: bool) -> Self {
        StackItem::Boolean(value)
    }
}

impl From<i64> for StackItem {
    fn from(value: i64) -> Self {
        StackItem::Integer(BigInt::from(value))
    }
}

impl From<u32> for StackItem {
    fn from(value: u32) -> Self {
        StackItem::Integer(BigInt::from(value))
    }
}

impl From<BigInt> for StackItem {
    fn from(value: BigInt) -> Self {
        StackItem::Integer(value)
    }
}

impl From<&BigInt> for StackItem {
    fn from(value: &BigInt) -> Self {
        StackItem::Integer(value.clone())
    }
}

impl From<Vec<u8>> for StackItem {
    fn from(value: Vec<u8>) -> Self {
        StackItem::ByteString(value)
    }
}

impl From<&str> for StackItem {
    fn from(value: &str) -> Self {
        StackItem::ByteString(value.as_bytes().to_vec())
    }
}

impl From<&UInt160> for StackItem {
    fn from(value: &UInt160) -> Self {
        StackItem::ByteString(value.as_bytes().to_vec())
    }
}

impl From<UInt160> for StackItem {
    fn from(value: UInt160) -> Self {
        StackItem::ByteString(value.as_bytes().to_vec())
    }
}

impl From<&UInt256> for StackItem {
    fn from(value: &UInt256) -> Self {
        StackItem::ByteString(value.as_bytes().to_vec())
    }
}

impl From<&ECPoint> for StackItem {
    fn from(value: &ECPoint) -> Self {
        StackItem::ByteString(value.as_bytes().to_vec())
    }
}

impl From<Option<ECPoint>> for StackItem {
    fn from(value: Option<ECPoint>) -> Self {
        match value {
            Some(point) => StackItem::from(&point),
            None => StackItem::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversion_from_bytes() {
        let item = StackItem::ByteString(vec![0x01, 0x02]);
        assert_eq!(item.as_int().unwrap(), BigInt::from(0x0201));
    }

    #[test]
    fn null_faults_as_integer_but_is_false() {
        assert!(StackItem::Null.as_int().is_err());
        assert!(!StackItem::Null.as_bool().unwrap());
    }

    #[test]
    fn serialize_round_trip() {
        let item = StackItem::Struct(vec![
            StackItem::Integer(BigInt::from(-42)),
            StackItem::Null,
            StackItem::ByteString(b"abc".to_vec()),
            StackItem::Array(vec![StackItem::Boolean(true)]),
            StackItem::Map(vec![(
                StackItem::ByteString(b"k".to_vec()),
                StackItem::Buffer(b"v".to_vec()),
            )]),
        ]);
        let bytes = item.serialize().unwrap();
        assert_eq!(StackItem::deserialize(&bytes).unwrap(), item);
    }

    #[test]
    fn deserialize_rejects_trailing_bytes() {
        let mut bytes = StackItem::Null.serialize().unwrap();
        bytes.push(0);
        assert!(StackItem::deserialize(&bytes).is_err());
    }

    #[test]
    fn deserialize_rejects_unknown_tag() {
        assert!(StackItem::deserialize(&[0x99]).is_err());
    }
}
