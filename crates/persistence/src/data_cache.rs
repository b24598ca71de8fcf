use crate::storage_item::StorageItem;
use crate::storage_key::StorageKey;
use crate::store::{SeekDirection, Store};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tracking state of a cached entry relative to the backing store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackState {
    /// Read from the store, unmodified.
    None,
    /// Absent from the store, created here.
    Added,
    /// Present in the store, modified here.
    Changed,
    /// Present in the store, deleted here.
    Deleted,
}

#[derive(Clone, Debug)]
struct Trackable {
    item: StorageItem,
    state: TrackState,
}

/// A write-tracking view over a [`Store`].
///
/// Contract execution reads through to the store and buffers every write
/// here; nothing reaches the store until [`commit`](DataCache::commit).
/// Cloning the cache yields an independent overlay over the same store,
/// which is how per-transaction rollback works.
#[derive(Clone)]
pub struct DataCache {
    store: Arc<dyn Store>,
    entries: BTreeMap<StorageKey, Trackable>,
}

impl DataCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            entries: BTreeMap::new(),
        }
    }

    /// Reads a value, preferring buffered writes over the store.
    pub fn try_get(&self, key: &StorageKey) -> Option<StorageItem> {
        if let Some(trackable) = self.entries.get(key) {
            return match trackable.state {
                TrackState::Deleted => None,
                _ => Some(trackable.item.clone()),
            };
        }
        self.store.try_get(&key.to_array()).map(StorageItem::new)
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        match self.entries.get(key) {
            Some(trackable) => trackable.state != TrackState::Deleted,
            None => self.store.contains(&key.to_array()),
        }
    }

    /// Fetches an entry for mutation, marking it dirty. When the key is
    /// absent, `default` seeds a fresh entry; with no default, absent
    /// keys return `None`.
    pub fn get_and_change(
        &mut self,
        key: &StorageKey,
        default: Option<StorageItem>,
    ) -> Option<&mut StorageItem> {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                let trackable = occupied.into_mut();
                match trackable.state {
                    TrackState::Deleted => {
                        let item = default?;
                        trackable.item = item;
                        trackable.state = TrackState::Changed;
                        Some(&mut trackable.item)
                    }
                    TrackState::None => {
                        trackable.state = TrackState::Changed;
                        Some(&mut trackable.item)
                    }
                    _ => Some(&mut trackable.item),
                }
            }
            Entry::Vacant(vacant) => match self.store.try_get(&key.to_array()) {
                Some(value) => {
                    let trackable = vacant.insert(Trackable {
                        item: StorageItem::new(value),
                        state: TrackState::Changed,
                    });
                    Some(&mut trackable.item)
                }
                None => {
                    let item = default?;
                    let trackable = vacant.insert(Trackable {
                        item,
                        state: TrackState::Added,
                    });
                    Some(&mut trackable.item)
                }
            },
        }
    }

    /// Writes `item` under `key`, creating or replacing.
    pub fn put(&mut self, key: StorageKey, item: StorageItem) {
        match self.entries.get_mut(&key) {
            Some(trackable) => {
                trackable.item = item;
                if trackable.state != TrackState::Added {
                    trackable.state = TrackState::Changed;
                }
            }
            None => {
                let state = if self.store.contains(&key.to_array()) {
                    TrackState::Changed
                } else {
                    TrackState::Added
                };
                self.entries.insert(key, Trackable { item, state });
            }
        }
    }

    /// Buffers a deletion. Deleting a key added in this cache simply
    /// forgets it.
    pub fn delete(&mut self, key: &StorageKey) {
        match self.entries.get_mut(key) {
            Some(trackable) => {
                if trackable.state == TrackState::Added {
                    self.entries.remove(key);
                } else {
                    trackable.state = TrackState::Deleted;
                }
            }
            None => {
                if self.store.contains(&key.to_array()) {
                    self.entries.insert(
                        key.clone(),
                        Trackable {
                            item: StorageItem::default(),
                            state: TrackState::Deleted,
                        },
                    );
                }
            }
        }
    }

    /// Returns every live entry whose raw key starts with `prefix`, in
    /// byte order along `direction`.
    pub fn find(
        &self,
        prefix: &[u8],
        direction: SeekDirection,
    ) -> Vec<(StorageKey, StorageItem)> {
        let mut merged: BTreeMap<Vec<u8>, Option<StorageItem>> = BTreeMap::new();
        for (raw, value) in self.store.seek(prefix, SeekDirection::Forward) {
            if !raw.starts_with(prefix) {
                break;
            }
            merged.insert(raw, Some(StorageItem::new(value)));
        }
        for (key, trackable) in &self.entries {
            let raw = key.to_array();
            if !raw.starts_with(prefix) {
                continue;
            }
            match trackable.state {
                TrackState::Deleted => {
                    merged.insert(raw, None);
                }
                _ => {
                    merged.insert(raw, Some(trackable.item.clone()));
                }
            }
        }
        collect_ordered(merged, direction)
    }

    /// Returns live entries in the half-open raw-key interval from
    /// `start` (inclusive) toward `end` (exclusive), walking along
    /// `direction`. Backward means `end < key <= start`, descending.
    pub fn find_range(
        &self,
        start: &[u8],
        end: &[u8],
        direction: SeekDirection,
    ) -> Vec<(StorageKey, StorageItem)> {
        let in_range = |raw: &[u8]| match direction {
            SeekDirection::Forward => raw >= start && raw < end,
            SeekDirection::Backward => raw <= start && raw > end,
        };
        let mut merged: BTreeMap<Vec<u8>, Option<StorageItem>> = BTreeMap::new();
        for (raw, value) in self.store.seek(start, direction) {
            if !in_range(&raw) {
                break;
            }
            merged.insert(raw, Some(StorageItem::new(value)));
        }
        for (key, trackable) in &self.entries {
            let raw = key.to_array();
            if !in_range(&raw) {
                continue;
            }
            match trackable.state {
                TrackState::Deleted => {
                    merged.insert(raw, None);
                }
                _ => {
                    merged.insert(raw, Some(trackable.item.clone()));
                }
            }
        }
        collect_ordered(merged, direction)
    }

    /// Flushes buffered writes to the store and resets tracking.
    pub fn commit(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        for (key, trackable) in entries {
            let raw = key.to_array();
            match trackable.state {
                TrackState::Added | TrackState::Changed => {
                    self.store.put(&raw, trackable.item.as_bytes());
                    self.entries.insert(
                        key,
                        Trackable {
                            item: trackable.item,
                            state: TrackState::None,
                        },
                    );
                }
                TrackState::Deleted => {
                    self.store.delete(&raw);
                }
                TrackState::None => {
                    self.entries.insert(key, trackable);
                }
            }
        }
    }
}

fn collect_ordered(
    merged: BTreeMap<Vec<u8>, Option<StorageItem>>,
    direction: SeekDirection,
) -> Vec<(StorageKey, StorageItem)> {
    let live = merged
        .into_iter()
        .filter_map(|(raw, item)| Some((StorageKey::from_array(&raw)?, item?)));
    match direction {
        SeekDirection::Forward => live.collect(),
        SeekDirection::Backward => {
            let mut out: Vec<_> = live.collect();
            out.reverse();
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::storage_key::KeyBuilder;

    fn cache_with_store() -> (DataCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (DataCache::new(store.clone()), store)
    }

    fn key(id: i32, suffix: &[u8]) -> StorageKey {
        StorageKey::new(id, suffix.to_vec())
    }

    #[test]
    fn reads_through_to_store() {
        let (cache, store) = cache_with_store();
        store.put(&key(1, b"a").to_array(), b"v");
        assert_eq!(
            cache.try_get(&key(1, b"a")),
            Some(StorageItem::new(b"v".to_vec()))
        );
    }

    #[test]
    fn writes_stay_buffered_until_commit() {
        let (mut cache, store) = cache_with_store();
        cache.put(key(1, b"a"), StorageItem::new(b"v".to_vec()));
        assert!(store.try_get(&key(1, b"a").to_array()).is_none());
        cache.commit();
        assert_eq!(store.try_get(&key(1, b"a").to_array()), Some(b"v".to_vec()));
    }

    #[test]
    fn delete_of_added_entry_forgets_it() {
        let (mut cache, store) = cache_with_store();
        cache.put(key(1, b"a"), StorageItem::default());
        cache.delete(&key(1, b"a"));
        assert!(!cache.contains(&key(1, b"a")));
        cache.commit();
        assert!(store.is_empty());
    }

    #[test]
    fn delete_shadows_store_entry() {
        let (mut cache, store) = cache_with_store();
        store.put(&key(1, b"a").to_array(), b"v");
        cache.delete(&key(1, b"a"));
        assert!(cache.try_get(&key(1, b"a")).is_none());
        cache.commit();
        assert!(store.is_empty());
    }

    #[test]
    fn get_and_change_seeds_default() {
        let (mut cache, _) = cache_with_store();
        assert!(cache.get_and_change(&key(1, b"a"), None).is_none());
        let item = cache
            .get_and_change(&key(1, b"a"), Some(StorageItem::from_i64(0)))
            .unwrap();
        item.add_assign(&5.into());
        assert_eq!(cache.try_get(&key(1, b"a")).unwrap().to_bigint(), 5.into());
    }

    #[test]
    fn find_merges_overlay_and_store() {
        let (mut cache, store) = cache_with_store();
        let prefix = StorageKey::prefix(1, 20);
        store.put(
            &KeyBuilder::new(1, 20).add(b"a").to_prefix(),
            b"store",
        );
        store.put(&KeyBuilder::new(1, 20).add(b"b").to_prefix(), b"gone");
        cache.put(
            KeyBuilder::new(1, 20).add(b"c").to_key(),
            StorageItem::new(b"cache".to_vec()),
        );
        cache.delete(&KeyBuilder::new(1, 20).add(b"b").to_key());

        let found = cache.find(&prefix, SeekDirection::Forward);
        let suffixes: Vec<_> = found.iter().map(|(k, _)| k.suffix.clone()).collect();
        assert_eq!(suffixes, vec![b"\x14a".to_vec(), b"\x14c".to_vec()]);

        let reversed = cache.find(&prefix, SeekDirection::Backward);
        assert_eq!(reversed[0].0.suffix, b"\x14c".to_vec());
    }

    #[test]
    fn find_range_backward_is_half_open() {
        let (mut cache, _) = cache_with_store();
        for index in [1u32, 3, 5, 7] {
            cache.put(
                KeyBuilder::new(1, 29).add_u32_be(index).to_key(),
                StorageItem::from_i64(index as i64),
            );
        }
        let start = KeyBuilder::new(1, 29).add_u32_be(6).to_prefix();
        let end = KeyBuilder::new(1, 29).add_u32_be(1).to_prefix();
        let found = cache.find_range(&start, &end, SeekDirection::Backward);
        let values: Vec<_> = found.iter().map(|(_, v)| v.to_bigint()).collect();
        assert_eq!(values, vec![5.into(), 3.into()]);
    }
}
