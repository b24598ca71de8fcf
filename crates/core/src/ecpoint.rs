use crate::error::CoreError;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A compressed secp256r1 public key (33 bytes).
///
/// Construction always validates that the bytes decode to a point on the
/// curve, so a held value is known good.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ECPoint {
    encoded: [u8; ECPoint::LEN],
}

impl ECPoint {
    /// The length of a compressed point in bytes.
    pub const LEN: usize = 33;

    /// Decodes a compressed point, rejecting bytes that are not on the
    /// curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != Self::LEN {
            return Err(CoreError::InvalidPublicKey(format!(
                "compressed point requires {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }
        if bytes[0] != 0x02 && bytes[0] != 0x03 {
            return Err(CoreError::InvalidPublicKey(format!(
                "invalid compression tag 0x{:02x}",
                bytes[0]
            )));
        }
        PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CoreError::InvalidPublicKey("point not on curve".into()))?;
        let mut encoded = [0u8; Self::LEN];
        encoded.copy_from_slice(bytes);
        Ok(Self { encoded })
    }

    /// Wraps an already-validated public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let point = key.to_encoded_point(true);
        let mut encoded = [0u8; Self::LEN];
        encoded.copy_from_slice(point.as_bytes());
        Self { encoded }
    }

    /// Returns the compressed encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Returns the compressed encoding as an owned array.
    pub fn to_array(&self) -> [u8; Self::LEN] {
        self.encoded
    }

    /// Returns the 32-byte X coordinate.
    pub fn x_bytes(&self) -> &[u8] {
        &self.encoded[1..]
    }
}

// Points order by X coordinate first, then by the parity tag. This is the
// ordering committee and validator lists are sorted with.
impl Ord for ECPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x_bytes()
            .cmp(other.x_bytes())
            .then(self.encoded[0].cmp(&other.encoded[0]))
    }
}

impl PartialOrd for ECPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.encoded))
    }
}

impl fmt::Debug for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ECPoint({})", self)
    }
}

impl FromStr for ECPoint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl AsRef<[u8]> for ECPoint {
    fn as_ref(&self) -> &[u8] {
        &self.encoded
    }
}

// Serialized as the hex form used in configuration files.
impl Serialize for ECPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ECPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_str(&text).map_err(D::Error::custom)
    }
}
