use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents a 256-bit unsigned integer, used for block and transaction
/// hashes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UInt256 {
    data: [u8; UInt256::LEN],
}

impl UInt256 {
    /// The length of UInt256 values in bytes.
    pub const LEN: usize = 32;

    /// Represents 0.
    pub const ZERO: Self = Self {
        data: [0; Self::LEN],
    };

    /// Creates a new UInt256 from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != Self::LEN {
            return Err(CoreError::InvalidFormat(format!(
                "UInt256 requires {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }
        let mut data = [0u8; Self::LEN];
        data.copy_from_slice(bytes);
        Ok(Self { data })
    }

    /// Returns the zero value.
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Converts to a byte array.
    pub fn to_array(&self) -> [u8; Self::LEN] {
        self.data
    }

    /// Returns the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.data.iter().rev().copied().collect::<Vec<_>>()))
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt256({})", self)
    }
}

impl FromStr for UInt256 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != Self::LEN * 2 {
            return Err(CoreError::InvalidFormat(
                "UInt256 hex string must be 64 characters".into(),
            ));
        }
        let mut data = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut data)
            .map_err(|e| CoreError::InvalidFormat(e.to_string()))?;
        data.reverse();
        Ok(Self { data })
    }
}

impl From<[u8; UInt256::LEN]> for UInt256 {
    fn from(data: [u8; UInt256::LEN]) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for UInt256 {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_round_trip() {
        let data = [0xabu8; UInt256::LEN];
        let value = UInt256::from_bytes(&data).unwrap();
        assert_eq!(value.to_array(), data);
    }

    #[test]
    fn display_parse_round_trip() {
        let mut data = [0u8; UInt256::LEN];
        data[31] = 0xff;
        let value = UInt256::from(data);
        assert_eq!(UInt256::from_str(&value.to_string()).unwrap(), value);
    }
}
