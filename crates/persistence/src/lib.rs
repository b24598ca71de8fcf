//! The persistence layer: raw key/value stores, typed storage keys and
//! items, and the write-tracking cache contracts execute against.

pub mod data_cache;
pub mod memory_store;
pub mod storage_item;
pub mod storage_key;
pub mod store;

pub use data_cache::{DataCache, TrackState};
pub use memory_store::MemoryStore;
pub use storage_item::StorageItem;
pub use storage_key::{KeyBuilder, StorageKey};
pub use store::{SeekDirection, Store};
