//! One-to-one open-addressed hash map
//!
//! The same linear-probing engine as [`KeySet`](crate::KeySet), with
//! key-value slots. Probing and identity are keyed on the key alone;
//! inserting over an existing key overwrites its value.

use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::config::TableConfig;
use crate::containers::key_value::KeyValue;
use crate::containers::table_buf::TableBuf;
use crate::error::{Result, SetKitError};
use crate::key::HashKey;
use crate::memory::{default_alloc, TableAlloc};
use crate::sets::{AbstractSet, Collector, Membership};

/// A one-to-one hash map with explicit growth policy.
///
/// # Examples
///
/// ```rust
/// use setkit::{KeyMap, TableConfig};
///
/// let mut map = KeyMap::with_config("owners", &TableConfig::default()).unwrap();
/// map.insert(5u64, "a").unwrap();
/// map.insert(5u64, "b").unwrap();
/// assert_eq!(map.get(&5), Some(&"b"));
/// assert_eq!(map.count(), 1);
/// ```
pub struct KeyMap<K, V> {
    buf: TableBuf<KeyValue<K, V>>,
    alloc: Option<Arc<dyn TableAlloc>>,
    name: &'static str,
    active_count: usize,
    table_count: usize,
    change_count: u64,
    status: Option<SetKitError>,

    alloc_count_min: usize,
    table_count_min: usize,
    grow_threshold: u32,
    shrink_threshold: u32,
    auto_grow: bool,
    auto_shrink: bool,
    dynamic_alloc: bool,
}

impl<K: HashKey, V: Clone + Default> KeyMap<K, V> {
    /// Create an uninitialized map. Call [`KeyMap::create`] before use.
    pub fn new() -> Self {
        Self {
            buf: TableBuf::Empty,
            alloc: None,
            name: "",
            active_count: 0,
            table_count: 0,
            change_count: 0,
            status: Some(SetKitError::NotInitialized),
            alloc_count_min: 0,
            table_count_min: 0,
            grow_threshold: 0,
            shrink_threshold: 0,
            auto_grow: false,
            auto_shrink: false,
            dynamic_alloc: false,
        }
    }

    /// Create and initialize in one step, with the default allocator.
    pub fn with_config(name: &'static str, config: &TableConfig) -> Result<Self> {
        let mut map = Self::new();
        map.create(name, config, None)?;
        Ok(map)
    }

    /// Initialize the map with allocated storage.
    pub fn create(
        &mut self,
        name: &'static str,
        config: &TableConfig,
        alloc: Option<Arc<dyn TableAlloc>>,
    ) -> Result<()> {
        self.check_creatable(config)?;
        self.adopt_config(name, config);
        self.alloc = Some(alloc.unwrap_or_else(default_alloc));
        self.dynamic_alloc = config.dynamic_alloc;
        self.status = None;

        let table_count = self.table_count_min;
        let capacity = self.alloc_count_min.max(self.table_count_min);
        if let Err(err) = self.resize(table_count, capacity) {
            self.status = Some(err);
            return Err(err);
        }
        log::debug!("created map {:?}: {} slots", name, capacity);
        Ok(())
    }

    /// Initialize the map over a caller-supplied buffer of slots.
    pub fn create_fixed(
        &mut self,
        name: &'static str,
        config: &TableConfig,
        buffer: Vec<KeyValue<K, V>>,
    ) -> Result<()> {
        self.check_creatable(config)?;
        if buffer.len() < 2 {
            self.status = Some(SetKitError::InvalidArguments);
            return Err(SetKitError::InvalidArguments);
        }
        self.adopt_config(name, config);
        self.alloc = None;
        self.dynamic_alloc = false;
        self.buf = TableBuf::adopt(buffer);
        self.table_count = self.table_count_min.min(self.buf.len());
        self.status = None;
        log::debug!("created fixed map {:?}: {} slots", name, self.buf.len());
        Ok(())
    }

    /// Drop all storage and return to the uninitialized state.
    pub fn destroy(&mut self) {
        *self = Self::new();
    }

    /// Remove every entry and shrink back to the minimum capacity.
    pub fn reset(&mut self) {
        if self.status.is_some() {
            return;
        }
        for slot in &mut self.buf.slots_mut()[..self.table_count] {
            *slot = KeyValue::default();
        }
        self.active_count = 0;
        self.change_count += 1;
        let table_count = self.table_count_min;
        let capacity = self.alloc_count_min.max(self.table_count_min);
        if let Err(err) = self.resize(table_count, capacity) {
            log::debug!("{}: reset kept oversized buffer: {}", self.name, err);
        }
    }

    /// Insert a key-value pair, returning the value the key previously
    /// mapped to, if any.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.status()?;
        if key.is_hash_null() {
            return Err(SetKitError::InvalidArguments);
        }
        if self.auto_grow {
            if let Err(err) = self.grow() {
                log::debug!("{}: growth deferred: {}", self.name, err);
            }
        }
        if self.active_count >= self.table_count {
            return Err(SetKitError::CouldNotAlloc);
        }
        let index = self
            .find_empty_or_matching(&key)
            .ok_or(SetKitError::CouldNotAlloc)?;
        let slot = &mut self.buf.slots_mut()[index];
        self.change_count += 1;
        if slot.is_empty() {
            *slot = KeyValue::new(key, value);
            self.active_count += 1;
            Ok(None)
        } else {
            Ok(Some(mem::replace(&mut slot.value, value)))
        }
    }

    /// Remove a key, returning the value it mapped to.
    pub fn remove(&mut self, key: &K) -> Result<V> {
        self.status()?;
        if key.is_hash_null() {
            return Err(SetKitError::NotFound);
        }
        let value = self.remove_one(key).ok_or(SetKitError::NotFound)?;
        self.change_count += 1;
        if self.auto_shrink {
            if let Err(err) = self.shrink() {
                log::debug!("{}: shrink deferred: {}", self.name, err);
            }
        }
        Ok(value)
    }

    /// Look up the value associated with a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        if self.status.is_some() || key.is_hash_null() {
            return None;
        }
        let index = self.find_empty_or_matching(key)?;
        let slot = &self.buf.slots()[index];
        if slot.is_empty() {
            None
        } else {
            Some(&slot.value)
        }
    }

    /// Test presence of a key.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Apply any pending growth and shrink.
    pub fn update(&mut self) -> Result<()> {
        self.status()?;
        self.grow()?;
        self.shrink()?;
        Ok(())
    }

    /// Current status; `Err` for an uninitialized or misconfigured map.
    pub fn status(&self) -> Result<()> {
        match self.status {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of entries in the map.
    pub fn count(&self) -> usize {
        self.active_count
    }

    /// True when the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.active_count == 0
    }

    /// Number of slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Name given at creation; doubles as the allocation tag.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Mutation counter; every observable change increments it.
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// First occupied cursor index, or the end sentinel.
    pub fn first_index(&self) -> usize {
        self.next_index_from(0)
    }

    /// Next occupied cursor index after `index`, or the end sentinel.
    pub fn next_index(&self, index: usize) -> usize {
        self.next_index_from(index + 1)
    }

    /// True while a cursor index refers into the live table.
    pub fn index_valid(&self, index: usize) -> bool {
        self.status.is_none() && index < self.table_count
    }

    /// Key at a valid cursor index.
    pub fn key_at(&self, index: usize) -> &K {
        &self.buf.slots()[index].key
    }

    /// Value at a valid cursor index.
    pub fn value_at(&self, index: usize) -> &V {
        &self.buf.slots()[index].value
    }

    /// Key-value pair at a valid cursor index.
    pub fn key_value_at(&self, index: usize) -> (&K, &V) {
        let slot = &self.buf.slots()[index];
        (&slot.key, &slot.value)
    }

    /// Iterator over `(key, value)` pairs, in table order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            index: 0,
        }
    }

    /// Iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// Iterator over the values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    fn check_creatable(&mut self, config: &TableConfig) -> Result<()> {
        if self.status != Some(SetKitError::NotInitialized) {
            self.status = Some(SetKitError::DoubleInitialized);
            return Err(SetKitError::DoubleInitialized);
        }
        if let Err(err) = config.validate() {
            self.status = Some(err);
            return Err(err);
        }
        Ok(())
    }

    fn adopt_config(&mut self, name: &'static str, config: &TableConfig) {
        self.name = name;
        self.alloc_count_min = config.alloc_count_min;
        self.table_count_min = config.table_count_min;
        self.grow_threshold = config.grow_threshold;
        self.shrink_threshold = config.shrink_threshold;
        self.auto_grow = config.auto_grow;
        self.auto_shrink = config.auto_shrink;
    }

    fn next_index_from(&self, from: usize) -> usize {
        for i in from..self.table_count {
            if !self.buf.slots()[i].is_empty() {
                return i;
            }
        }
        self.table_count
    }

    fn find_empty_or_matching(&self, key: &K) -> Option<usize> {
        if self.table_count == 0 {
            return None;
        }
        let slots = self.buf.slots();
        let start = (key.hash_value() % self.table_count as u64) as usize;
        for i in start..self.table_count {
            if slots[i].is_empty() || slots[i].key == *key {
                return Some(i);
            }
        }
        for i in 0..start {
            if slots[i].is_empty() || slots[i].key == *key {
                return Some(i);
            }
        }
        None
    }

    fn reinsert(&mut self, index: usize) {
        let key = self.buf.slots()[index].key.clone();
        if let Some(new_index) = self.find_empty_or_matching(&key) {
            if new_index != index {
                let slots = self.buf.slots_mut();
                slots[new_index] = mem::take(&mut slots[index]);
            }
        }
    }

    fn remove_one(&mut self, key: &K) -> Option<V> {
        let index = self.find_empty_or_matching(key)?;
        if self.buf.slots()[index].is_empty() {
            return None;
        }
        let removed = mem::take(&mut self.buf.slots_mut()[index]);
        self.active_count -= 1;

        let table_count = self.table_count;
        for step in 1..table_count {
            let i = (index + step) % table_count;
            if self.buf.slots()[i].is_empty() {
                break;
            }
            self.reinsert(i);
        }
        Some(removed.value)
    }

    fn grow(&mut self) -> Result<()> {
        if self.active_count * 100 >= self.table_count * self.grow_threshold as usize {
            let mut new_table_count = self.table_count * 2;
            let mut new_capacity = self.buf.len().max(new_table_count);
            if !self.dynamic_alloc {
                new_capacity = self.buf.len();
                new_table_count = new_table_count.min(new_capacity);
            }
            self.resize(new_table_count, new_capacity)?;
        }
        Ok(())
    }

    fn shrink(&mut self) -> Result<()> {
        if self.table_count > self.table_count_min
            && self.active_count * 100 < self.table_count * self.shrink_threshold as usize
        {
            let new_table_count = (self.table_count / 2).max(self.table_count_min);
            let mut new_capacity = new_table_count.max(self.alloc_count_min);
            if !self.dynamic_alloc {
                new_capacity = self.buf.len();
            }
            self.resize(new_table_count, new_capacity)?;
        }
        Ok(())
    }

    fn resize(&mut self, new_table_count: usize, new_capacity: usize) -> Result<()> {
        if let Some(alloc) = self.alloc.clone() {
            if self.buf.len() != new_capacity {
                let new_buf = TableBuf::allocate(new_capacity, &alloc, self.name)?;
                let old_buf = mem::replace(&mut self.buf, new_buf);
                let old_table_count = mem::replace(&mut self.table_count, new_table_count);
                self.active_count = 0;
                if self.buf.len() > 0 {
                    for slot in &old_buf.slots()[..old_table_count] {
                        if !slot.is_empty() {
                            self.insert_slot(slot.clone());
                        }
                    }
                }
                log::trace!(
                    "{}: rebuilt table, {} slots / {} hashed",
                    self.name,
                    new_capacity,
                    new_table_count
                );
                return Ok(());
            }
        }
        if new_table_count < self.table_count {
            let old_table_count = mem::replace(&mut self.table_count, new_table_count);
            for i in 0..old_table_count {
                if !self.buf.slots()[i].is_empty() {
                    self.reinsert(i);
                }
            }
        } else if new_table_count > self.table_count {
            let old_table_count = mem::replace(&mut self.table_count, new_table_count);
            for i in 0..old_table_count {
                if !self.buf.slots()[i].is_empty() {
                    self.reinsert(i);
                }
            }
            for i in old_table_count..new_table_count {
                if self.buf.slots()[i].is_empty() {
                    break;
                }
                self.reinsert(i);
            }
        }
        Ok(())
    }

    fn insert_slot(&mut self, pair: KeyValue<K, V>) {
        if let Some(index) = self.find_empty_or_matching(&pair.key) {
            let slot = &mut self.buf.slots_mut()[index];
            if slot.is_empty() {
                *slot = pair;
                self.active_count += 1;
            }
        }
    }
}

impl<K: HashKey, V: Clone + Default> Default for KeyMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HashKey + fmt::Debug, V: Clone + Default + fmt::Debug> fmt::Debug for KeyMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// As an abstract set, a map is the set of its keys.
impl<K: HashKey, V: Clone + Default> Membership<K> for KeyMap<K, V> {
    fn contains(&self, key: &K) -> bool {
        KeyMap::contains(self, key)
    }
}

impl<K: HashKey, V: Clone + Default> AbstractSet<K> for KeyMap<K, V> {
    fn enumerate(&self, collector: &mut dyn Collector<K>, limit: Option<&dyn Membership<K>>) {
        let mut i = self.first_index();
        while self.index_valid(i) {
            let key = self.key_at(i);
            if limit.map_or(true, |l| l.contains(key)) {
                collector.push(key.clone());
            }
            i = self.next_index(i);
        }
    }

    fn enumeration_cost(&self) -> usize {
        self.count()
    }

    fn change_count(&self) -> u64 {
        self.change_count
    }
}

/// Iterator over the entries of a [`KeyMap`].
pub struct Iter<'a, K, V> {
    map: &'a KeyMap<K, V>,
    index: usize,
}

impl<'a, K: HashKey, V: Clone + Default> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.map.table_count {
            let slot = &self.map.buf.slots()[self.index];
            self.index += 1;
            if !slot.is_empty() {
                return Some((&slot.key, &slot.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.map.table_count.saturating_sub(self.index)))
    }
}
