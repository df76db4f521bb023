//! Key-value slot shared by the map containers

use crate::key::HashKey;

/// One slot of a [`KeyMap`](crate::KeyMap) or
/// [`MultiMap`](crate::MultiMap) table.
///
/// The slot is empty iff its key is hash-null; the default-constructed
/// pair is the empty slot. Callers only touch this type when handing a
/// fixed buffer to `create_fixed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValue<K, V> {
    /// Slot key; hash-null marks the slot as empty.
    pub key: K,
    /// Slot value; meaningless while the slot is empty.
    pub value: V,
}

impl<K: HashKey, V> KeyValue<K, V> {
    /// Build a live pair.
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// True when this slot is empty.
    pub fn is_empty(&self) -> bool {
        self.key.is_hash_null()
    }
}
