//! Typed access to the snapshot: interoperable records persisted through
//! the stack-item storage codec.

use crate::error::Result;
use crate::interop::{Interoperable, StackItem};
use neo_persistence::{DataCache, StorageItem, StorageKey};

/// Extension methods giving the snapshot typed record access.
///
/// Interoperable records are always rewritten whole: `set_interoperable`
/// replaces the full encoded value, never patches it in place.
pub trait SnapshotExt {
    /// Reads and decodes a record. Absent keys yield `Ok(None)`; a
    /// present but malformed record faults.
    fn get_interoperable<T: Interoperable>(&self, key: &StorageKey) -> Result<Option<T>>;

    /// Encodes and writes a record, replacing any previous value.
    fn set_interoperable<T: Interoperable>(&mut self, key: StorageKey, value: &T) -> Result<()>;
}

impl SnapshotExt for DataCache {
    fn get_interoperable<T: Interoperable>(&self, key: &StorageKey) -> Result<Option<T>> {
        match self.try_get(key) {
            Some(item) => {
                let stack_item = StackItem::deserialize(item.as_bytes())?;
                Ok(Some(T::from_stack_item(&stack_item)?))
            }
            None => Ok(None),
        }
    }

    fn set_interoperable<T: Interoperable>(&mut self, key: StorageKey, value: &T) -> Result<()> {
        let bytes = value.to_stack_item().serialize()?;
        self.put(key, StorageItem::new(bytes));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::interop::interoperable::struct_fields;
    use neo_persistence::MemoryStore;
    use num_bigint::BigInt;
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct Pair {
        a: BigInt,
        b: Vec<u8>,
    }

    impl Interoperable for Pair {
        fn from_stack_item(item: &StackItem) -> Result<Self> {
            let fields = struct_fields(item, 2)?;
            Ok(Self {
                a: fields[0].as_int()?,
                b: fields[1].as_bytes()?,
            })
        }

        fn to_stack_item(&self) -> StackItem {
            StackItem::Struct(vec![
                StackItem::from(&self.a),
                StackItem::ByteString(self.b.clone()),
            ])
        }
    }

    #[test]
    fn round_trips_records() {
        let mut cache = DataCache::new(Arc::new(MemoryStore::new()));
        let key = StorageKey::new(7, vec![1]);
        let pair = Pair {
            a: BigInt::from(99),
            b: b"xyz".to_vec(),
        };
        cache.set_interoperable(key.clone(), &pair).unwrap();
        assert_eq!(cache.get_interoperable::<Pair>(&key).unwrap(), Some(pair));
    }

    #[test]
    fn malformed_record_faults() {
        let mut cache = DataCache::new(Arc::new(MemoryStore::new()));
        let key = StorageKey::new(7, vec![1]);
        // A bare integer where a two-field struct is expected.
        let bytes = StackItem::from(5i64).serialize().unwrap();
        cache.put(key.clone(), neo_persistence::StorageItem::new(bytes));
        assert!(matches!(
            cache.get_interoperable::<Pair>(&key),
            Err(Error::Encoding(_))
        ));
    }
}
