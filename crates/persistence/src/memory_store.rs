use crate::store::{SeekDirection, Store};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// An in-memory [`Store`] backed by an ordered map. The default backend
/// for tests and for nodes run without a disk database.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn try_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    fn seek(&self, key_or_prefix: &[u8], direction: SeekDirection) -> Vec<(Vec<u8>, Vec<u8>)> {
        let entries = self.entries.read();
        match direction {
            SeekDirection::Forward => entries
                .range::<[u8], _>((Bound::Included(key_or_prefix), Bound::Unbounded))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            SeekDirection::Backward => {
                let upper = if key_or_prefix.is_empty() {
                    Bound::Unbounded
                } else {
                    Bound::Included(key_or_prefix)
                };
                entries
                    .range::<[u8], _>((Bound::Unbounded, upper))
                    .rev()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            }
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) {
        self.entries.write().insert(key.to_vec(), value.to_vec());
    }

    fn delete(&self, key: &[u8]) {
        self.entries.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let store = MemoryStore::new();
        store.put(b"a", b"1");
        assert_eq!(store.try_get(b"a"), Some(b"1".to_vec()));
        store.delete(b"a");
        assert_eq!(store.try_get(b"a"), None);
    }

    #[test]
    fn seek_both_directions() {
        let store = MemoryStore::new();
        for key in [b"a1", b"a2", b"b1"] {
            store.put(key, b"x");
        }
        let forward = store.seek(b"a2", SeekDirection::Forward);
        assert_eq!(
            forward.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
            vec![b"a2".to_vec(), b"b1".to_vec()]
        );
        let backward = store.seek(b"a2", SeekDirection::Backward);
        assert_eq!(
            backward.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
            vec![b"a2".to_vec(), b"a1".to_vec()]
        );
    }
}
