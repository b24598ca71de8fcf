use neo_core::{ECPoint, UInt160, UInt256};
use std::cmp::Ordering;

/// A storage key: the owning contract's id plus a contract-chosen byte
/// suffix.
///
/// The serialized form is the id as four big-endian bytes followed by the
/// suffix, so keys of one contract stay contiguous and suffixes iterate
/// in byte order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub id: i32,
    pub suffix: Vec<u8>,
}

impl Ord for StorageKey {
    /// Same order as the serialized form: the id compares as its
    /// big-endian unsigned bytes, so negative (native) ids sort after
    /// positive (deployed) ones.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.id as u32, &self.suffix).cmp(&(other.id as u32, &other.suffix))
    }
}

impl PartialOrd for StorageKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl StorageKey {
    pub fn new(id: i32, suffix: Vec<u8>) -> Self {
        Self { id, suffix }
    }

    /// Serializes to the store's raw key form.
    pub fn to_array(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.suffix.len());
        out.extend_from_slice(&self.id.to_be_bytes());
        out.extend_from_slice(&self.suffix);
        out
    }

    /// Parses a raw store key. Returns `None` for keys shorter than the
    /// id field.
    pub fn from_array(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }
        let mut id_bytes = [0u8; 4];
        id_bytes.copy_from_slice(&bytes[..4]);
        Some(Self {
            id: i32::from_be_bytes(id_bytes),
            suffix: bytes[4..].to_vec(),
        })
    }

    /// Raw prefix covering every key of contract `id` that starts with
    /// `prefix`.
    pub fn prefix(id: i32, prefix: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(5);
        out.extend_from_slice(&id.to_be_bytes());
        out.push(prefix);
        out
    }
}

/// Builds storage keys fluently: contract id, a one-byte prefix, then
/// any fixed-width fragments.
#[derive(Clone, Debug)]
pub struct KeyBuilder {
    id: i32,
    suffix: Vec<u8>,
}

impl KeyBuilder {
    pub fn new(id: i32, prefix: u8) -> Self {
        Self {
            id,
            suffix: vec![prefix],
        }
    }

    pub fn add(mut self, bytes: &[u8]) -> Self {
        self.suffix.extend_from_slice(bytes);
        self
    }

    pub fn add_uint160(self, value: &UInt160) -> Self {
        self.add(value.as_bytes())
    }

    pub fn add_uint256(self, value: &UInt256) -> Self {
        self.add(value.as_bytes())
    }

    pub fn add_ecpoint(self, value: &ECPoint) -> Self {
        self.add(value.as_bytes())
    }

    /// Appends a u32 big-endian, so numeric order matches iteration
    /// order.
    pub fn add_u32_be(self, value: u32) -> Self {
        self.add(&value.to_be_bytes())
    }

    pub fn to_key(self) -> StorageKey {
        StorageKey::new(self.id, self.suffix)
    }

    /// The raw byte form, usable directly as a seek prefix.
    pub fn to_prefix(self) -> Vec<u8> {
        self.to_key().to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let key = KeyBuilder::new(-5, 20)
            .add_uint160(&UInt160::from([9u8; 20]))
            .to_key();
        let raw = key.to_array();
        assert_eq!(raw.len(), 4 + 1 + 20);
        assert_eq!(StorageKey::from_array(&raw), Some(key));
    }

    #[test]
    fn id_is_big_endian() {
        let key = StorageKey::new(1, vec![7]);
        assert_eq!(key.to_array(), vec![0, 0, 0, 1, 7]);
    }

    #[test]
    fn ordering_matches_the_byte_form() {
        let native = StorageKey::new(-4, vec![9]);
        let deployed = StorageKey::new(3, vec![9]);
        assert!(deployed < native);
        assert_eq!(
            deployed.cmp(&native),
            deployed.to_array().cmp(&native.to_array())
        );
    }

    #[test]
    fn u32_fragments_preserve_numeric_order() {
        let low = KeyBuilder::new(-5, 29).add_u32_be(255).to_prefix();
        let high = KeyBuilder::new(-5, 29).add_u32_be(256).to_prefix();
        assert!(low < high);
    }
}
