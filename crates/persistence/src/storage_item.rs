use num_bigint::BigInt;

/// A stored value. Integers use the signed little-endian encoding shared
/// with the wire format, so balances written here read back identically
/// on every node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageItem {
    value: Vec<u8>,
}

impl StorageItem {
    pub fn new(value: Vec<u8>) -> Self {
        Self { value }
    }

    pub fn from_bigint(value: &BigInt) -> Self {
        Self {
            value: value.to_signed_bytes_le(),
        }
    }

    pub fn from_i64(value: i64) -> Self {
        Self::from_bigint(&BigInt::from(value))
    }

    pub fn to_bigint(&self) -> BigInt {
        BigInt::from_signed_bytes_le(&self.value)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.value
    }

    pub fn set(&mut self, value: Vec<u8>) {
        self.value = value;
    }

    pub fn set_bigint(&mut self, value: &BigInt) {
        self.value = value.to_signed_bytes_le();
    }

    /// Adds to the stored integer in place.
    pub fn add_assign(&mut self, amount: &BigInt) {
        let sum = self.to_bigint() + amount;
        self.set_bigint(&sum);
    }
}

impl From<Vec<u8>> for StorageItem {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&BigInt> for StorageItem {
    fn from(value: &BigInt) -> Self {
        Self::from_bigint(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bigint_round_trip() {
        for value in [0i64, 1, -1, 255, 256, -256, i64::MAX, i64::MIN] {
            let item = StorageItem::from_i64(value);
            assert_eq!(item.to_bigint(), BigInt::from(value));
        }
    }

    #[test]
    fn empty_value_reads_as_zero() {
        assert_eq!(StorageItem::new(Vec::new()).to_bigint(), BigInt::from(0));
    }

    #[test]
    fn add_assign_accumulates() {
        let mut item = StorageItem::from_i64(10);
        item.add_assign(&BigInt::from(-3));
        assert_eq!(item.to_bigint(), BigInt::from(7));
    }
}
