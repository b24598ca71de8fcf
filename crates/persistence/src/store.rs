/// Direction of a seek over ordered keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// A raw ordered key/value store.
///
/// Keys are compared as unsigned byte strings. Implementations use
/// interior mutability so a store can be shared behind an `Arc`.
pub trait Store: Send + Sync {
    /// Reads the value stored under `key`.
    fn try_get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Whether `key` is present.
    fn contains(&self, key: &[u8]) -> bool {
        self.try_get(key).is_some()
    }

    /// Returns entries starting at `key_or_prefix` in the given
    /// direction: forward yields keys >= the seed ascending, backward
    /// yields keys <= the seed descending. An empty seed with
    /// `Backward` yields everything descending.
    fn seek(&self, key_or_prefix: &[u8], direction: SeekDirection) -> Vec<(Vec<u8>, Vec<u8>)>;

    /// Writes `value` under `key`, replacing any existing value.
    fn put(&self, key: &[u8], value: &[u8]);

    /// Removes `key` if present.
    fn delete(&self, key: &[u8]);
}
