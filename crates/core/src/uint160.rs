use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Represents a 160-bit unsigned integer, used for account and contract
/// script hashes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UInt160 {
    data: [u8; UInt160::LEN],
}

impl UInt160 {
    /// The length of UInt160 values in bytes.
    pub const LEN: usize = 20;

    /// Represents 0.
    pub const ZERO: Self = Self {
        data: [0; Self::LEN],
    };

    /// Creates a new UInt160 from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != Self::LEN {
            return Err(CoreError::InvalidFormat(format!(
                "UInt160 requires {} bytes, got {}",
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

    /// Returns true if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
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

impl fmt::Display for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reversed hex with 0x prefix, matching the canonical text form.
        write!(f, "0x{}", hex::encode(self.data.iter().rev().copied().collect::<Vec<_>>()))
    }
}

impl fmt::Debug for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt160({})", self)
    }
}

impl FromStr for UInt160 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != Self::LEN * 2 {
            return Err(CoreError::InvalidFormat(
                "UInt160 hex string must be 40 characters".into(),
            ));
        }
        let mut data = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut data)
            .map_err(|e| CoreError::InvalidFormat(e.to_string()))?;
        data.reverse();
        Ok(Self { data })
    }
}

impl From<[u8; UInt160::LEN]> for UInt160 {
    fn from(data: [u8; UInt160::LEN]) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for UInt160 {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Compares numerically, i.e. from the most significant byte down.
pub fn compare_numeric(a: &UInt160, b: &UInt160) -> Ordering {
    a.data.iter().rev().cmp(b.data.iter().rev())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_round_trip() {
        let data = [7u8; UInt160::LEN];
        let value = UInt160::from_bytes(&data).unwrap();
        assert_eq!(value.to_array(), data);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(UInt160::from_bytes(&[0u8; 19]).is_err());
        assert!(UInt160::from_bytes(&[0u8; 21]).is_err());
    }

    #[test]
    fn display_parse_round_trip() {
        let mut data = [0u8; UInt160::LEN];
        data[0] = 1;
        let value = UInt160::from(data);
        let text = value.to_string();
        assert_eq!(UInt160::from_str(&text).unwrap(), value);
    }

    #[test]
    fn zero_is_zero() {
        assert!(UInt160::zero().is_zero());
        assert!(!UInt160::from([1u8; 20]).is_zero());
    }
}
