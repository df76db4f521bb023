//! One-to-many open-addressed hash table
//!
//! `MultiMap` stores any number of `(key, value)` pairs per key, distinct
//! modulo pair equality. Linear probing keeps every pair of a key inside
//! one contiguous wrap-around run bounded by empty slots (the cluster
//! invariant), which is what makes whole-key removal and per-key cursors
//! cheap: neither ever leaves the cluster.

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

/// A one-to-many hash table with explicit growth policy.
///
/// Values must themselves carry the hash-null sentinel ([`HashKey`]):
/// per-pair removal treats a hash-null value as "absent" and fails with
/// `NotFound`.
///
/// As an abstract set, only key presence counts; enumeration yields each
/// distinct key once.
///
/// # Examples
///
/// ```rust
/// use setkit::{MultiMap, TableConfig};
///
/// let mut map = MultiMap::with_config("tags", &TableConfig::default()).unwrap();
/// map.insert(1u64, 10u64).unwrap();
/// map.insert(1u64, 11u64).unwrap();
/// let mut values: Vec<u64> = map.values_of(&1).copied().collect();
/// values.sort_unstable();
/// assert_eq!(values, vec![10, 11]);
/// ```
pub struct MultiMap<K, V> {
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

impl<K: HashKey, V: HashKey> MultiMap<K, V> {
    /// Create an uninitialized multimap. Call [`MultiMap::create`] before use.
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

    /// Initialize the multimap with allocated storage.
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
        log::debug!("created multimap {:?}: {} slots", name, capacity);
        Ok(())
    }

    /// Initialize the multimap over a caller-supplied buffer of slots.
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
        log::debug!("created fixed multimap {:?}: {} slots", name, self.buf.len());
        Ok(())
    }

    /// Drop all storage and return to the uninitialized state.
    pub fn destroy(&mut self) {
        *self = Self::new();
    }

    /// Remove every pair and shrink back to the minimum capacity.
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

    /// Insert a pair. Inserting a pair that is already present is a no-op.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
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
            .find_pair(&key, &value)
            .ok_or(SetKitError::CouldNotAlloc)?;
        let slot = &mut self.buf.slots_mut()[index];
        if slot.is_empty() {
            *slot = KeyValue::new(key, value);
            self.active_count += 1;
            self.change_count += 1;
        }
        Ok(())
    }

    /// Remove every pair with the given key.
    pub fn remove_all(&mut self, key: &K) -> Result<()> {
        self.status()?;
        if key.is_hash_null() || !self.remove_cluster(key, None) {
            return Err(SetKitError::NotFound);
        }
        self.change_count += 1;
        if self.auto_shrink {
            if let Err(err) = self.shrink() {
                log::debug!("{}: shrink deferred: {}", self.name, err);
            }
        }
        Ok(())
    }

    /// Remove one exact pair. A hash-null value means "absent" and fails.
    pub fn remove(&mut self, key: &K, value: &V) -> Result<()> {
        self.status()?;
        if key.is_hash_null() || value.is_hash_null() || !self.remove_cluster(key, Some(value)) {
            return Err(SetKitError::NotFound);
        }
        self.change_count += 1;
        if self.auto_shrink {
            if let Err(err) = self.shrink() {
                log::debug!("{}: shrink deferred: {}", self.name, err);
            }
        }
        Ok(())
    }

    /// Look up any one value stored under the key.
    pub fn find(&self, key: &K) -> Option<&V> {
        if self.status.is_some() || key.is_hash_null() {
            return None;
        }
        let index = self.find_key(key)?;
        let slot = &self.buf.slots()[index];
        if slot.is_empty() {
            None
        } else {
            Some(&slot.value)
        }
    }

    /// Test presence of a key.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Test presence of an exact pair.
    pub fn contains_pair(&self, key: &K, value: &V) -> bool {
        if self.status.is_some() || key.is_hash_null() {
            return false;
        }
        match self.find_pair(key, value) {
            Some(index) => !self.buf.slots()[index].is_empty(),
            None => false,
        }
    }

    /// Apply any pending growth and shrink.
    pub fn update(&mut self) -> Result<()> {
        self.status()?;
        self.grow()?;
        self.shrink()?;
        Ok(())
    }

    /// Current status; `Err` for an uninitialized or misconfigured table.
    pub fn status(&self) -> Result<()> {
        match self.status {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of pairs in the multimap.
    pub fn count(&self) -> usize {
        self.active_count
    }

    /// True when the multimap holds no pairs.
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

    /// First cursor index that starts a key cluster, or the end sentinel.
    ///
    /// Whole-table enumeration visits each distinct key exactly once: only
    /// the first slot of every cluster is reported.
    pub fn first_index(&self) -> usize {
        self.next_index_from(0)
    }

    /// Next cluster-starting cursor index after `index`.
    pub fn next_index(&self, index: usize) -> usize {
        self.next_index_from(index + 1)
    }

    /// First cursor index holding the given key, or the end sentinel.
    pub fn first_index_of(&self, key: &K) -> usize {
        if self.status.is_none() && !key.is_hash_null() {
            if let Some(index) = self.find_key(key) {
                if !self.buf.slots()[index].is_empty() {
                    return index;
                }
            }
        }
        self.table_count
    }

    /// Next cursor index with the same key, staying inside the cluster.
    pub fn next_index_of(&self, key: &K, index: usize) -> usize {
        if self.status.is_some() || key.is_hash_null() {
            return self.table_count;
        }
        let slots = self.buf.slots();
        for i in index + 1..self.table_count {
            if slots[i].is_empty() {
                return self.table_count;
            }
            if slots[i].key == *key {
                return i;
            }
        }
        for i in 0..index {
            if slots[i].is_empty() {
                return self.table_count;
            }
            if slots[i].key == *key {
                return i;
            }
        }
        self.table_count
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

    /// Iterator over all values stored under a key.
    pub fn values_of(&self, key: &K) -> ValuesOf<'_, K, V> {
        ValuesOf {
            map: self,
            key: key.clone(),
            index: self.first_index_of(key),
            steps: 0,
        }
    }

    /// Iterator over the distinct keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            map: self,
            index: self.first_index(),
        }
    }

    /// Iterator over every pair, in table order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            index: 0,
        }
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
            if !self.buf.slots()[i].is_empty() && self.is_first_in_run(i) {
                return i;
            }
        }
        self.table_count
    }

    /// True when `index` holds the first slot of its key's cluster:
    /// walking backwards (wrapping) hits an empty slot before another
    /// slot with the same key.
    fn is_first_in_run(&self, index: usize) -> bool {
        let slots = self.buf.slots();
        let key = &slots[index].key;
        for i in (0..index).rev() {
            if slots[i].is_empty() {
                return true;
            }
            if slots[i].key == *key {
                return false;
            }
        }
        for i in (index + 1..self.table_count).rev() {
            if slots[i].is_empty() {
                return true;
            }
            if slots[i].key == *key {
                return false;
            }
        }
        true
    }

    /// Probe stopping at an empty slot or the first slot with this key.
    fn find_key(&self, key: &K) -> Option<usize> {
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

    /// Probe stopping at an empty slot or the exact pair.
    fn find_pair(&self, key: &K, value: &V) -> Option<usize> {
        if self.table_count == 0 {
            return None;
        }
        let slots = self.buf.slots();
        let start = (key.hash_value() % self.table_count as u64) as usize;
        for i in start..self.table_count {
            if slots[i].is_empty() || (slots[i].key == *key && slots[i].value == *value) {
                return Some(i);
            }
        }
        for i in 0..start {
            if slots[i].is_empty() || (slots[i].key == *key && slots[i].value == *value) {
                return Some(i);
            }
        }
        None
    }

    fn reinsert(&mut self, index: usize) {
        let pair = self.buf.slots()[index].clone();
        if let Some(new_index) = self.find_pair(&pair.key, &pair.value) {
            if new_index != index {
                let slots = self.buf.slots_mut();
                slots[new_index] = pair;
                slots[index] = KeyValue::default();
            }
        }
    }

    /// Clear pairs of `key` inside its cluster: all of them, or just the
    /// one whose value matches. Counts every slot visited (matching or
    /// not) so the fix-up can reheal exactly the disturbed range.
    fn remove_cluster(&mut self, key: &K, value: Option<&V>) -> bool {
        let before = self.active_count;
        let Some(index) = self.find_key(key) else {
            return false;
        };
        if self.buf.slots()[index].is_empty() {
            return false;
        }
        let table_count = self.table_count;
        let mut visited = 0usize;
        let mut i = index;
        while !self.buf.slots()[i].is_empty() {
            let slot = &self.buf.slots()[i];
            let matches = slot.key == *key && value.map_or(true, |v| slot.value == *v);
            if matches {
                self.buf.slots_mut()[i] = KeyValue::default();
                self.active_count -= 1;
            }
            visited += 1;
            if visited >= table_count {
                break;
            }
            i = (i + 1) % table_count;
        }
        self.fix_up(index, visited);
        self.active_count < before
    }

    /// Reinsert the `count` slots after `index` in wrapping table order,
    /// rehealing entries whose probe chain ran through the fresh holes.
    fn fix_up(&mut self, index: usize, mut count: usize) {
        let table_count = self.table_count;
        for step in 1..table_count {
            if count == 0 {
                return;
            }
            count -= 1;
            let i = (index + step) % table_count;
            if !self.buf.slots()[i].is_empty() {
                self.reinsert(i);
            }
        }
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
        if let Some(index) = self.find_pair(&pair.key, &pair.value) {
            let slot = &mut self.buf.slots_mut()[index];
            if slot.is_empty() {
                *slot = pair;
                self.active_count += 1;
            }
        }
    }
}

impl<K: HashKey, V: HashKey> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HashKey + fmt::Debug, V: HashKey + fmt::Debug> fmt::Debug for MultiMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// As an abstract set, only key presence counts.
impl<K: HashKey, V: HashKey> Membership<K> for MultiMap<K, V> {
    fn contains(&self, key: &K) -> bool {
        MultiMap::contains(self, key)
    }
}

impl<K: HashKey, V: HashKey> AbstractSet<K> for MultiMap<K, V> {
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

/// Iterator over the values stored under one key of a [`MultiMap`].
///
/// Bounded by the table size, so it terminates even on a table whose
/// single cluster wraps the whole range.
pub struct ValuesOf<'a, K, V> {
    map: &'a MultiMap<K, V>,
    key: K,
    index: usize,
    steps: usize,
}

impl<'a, K: HashKey, V: HashKey> Iterator for ValuesOf<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.map.index_valid(self.index) || self.steps >= self.map.table_count {
            return None;
        }
        let value = self.map.value_at(self.index);
        self.index = self.map.next_index_of(&self.key, self.index);
        self.steps += 1;
        Some(value)
    }
}

/// Iterator over the distinct keys of a [`MultiMap`].
pub struct Keys<'a, K, V> {
    map: &'a MultiMap<K, V>,
    index: usize,
}

impl<'a, K: HashKey, V: HashKey> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.map.index_valid(self.index) {
            return None;
        }
        let key = self.map.key_at(self.index);
        self.index = self.map.next_index(self.index);
        Some(key)
    }
}

/// Iterator over every pair of a [`MultiMap`].
pub struct Iter<'a, K, V> {
    map: &'a MultiMap<K, V>,
    index: usize,
}

impl<'a, K: HashKey, V: HashKey> Iterator for Iter<'a, K, V> {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_config() -> TableConfig {
        TableConfig {
            alloc_count_min: 8,
            table_count_min: 4,
            grow_threshold: 75,
            shrink_threshold: 30,
            ..TableConfig::default()
        }
    }

    /// Every key's pairs must be reachable through the cluster cursor,
    /// which only holds while the cluster invariant holds.
    fn assert_clusters_intact(map: &MultiMap<u64, u64>) {
        let mut per_key: std::collections::HashMap<u64, usize> = std::collections::HashMap::new();
        for (k, _) in map.iter() {
            *per_key.entry(*k).or_default() += 1;
        }
        for (key, expected) in per_key {
            let via_cursor = map.values_of(&key).count();
            assert_eq!(
                via_cursor, expected,
                "cluster for key {} is split: cursor sees {} of {} pairs",
                key, via_cursor, expected
            );
        }
    }

    #[test]
    fn test_insert_and_find() {
        let mut map = MultiMap::with_config("basic", &TableConfig::default()).unwrap();
        map.insert(1u64, 10u64).unwrap();
        map.insert(1u64, 11u64).unwrap();
        map.insert(2u64, 20u64).unwrap();
        assert_eq!(map.count(), 3);
        assert!(map.contains(&1));
        assert!(map.contains_pair(&1, &11));
        assert!(!map.contains_pair(&1, &20));
        assert!([10u64, 11].contains(map.find(&1).unwrap()));
    }

    #[test]
    fn test_duplicate_pair_is_noop() {
        let mut map = MultiMap::with_config("dup", &TableConfig::default()).unwrap();
        map.insert(1u64, 10u64).unwrap();
        let change = map.change_count();
        map.insert(1u64, 10u64).unwrap();
        assert_eq!(map.count(), 1);
        assert_eq!(map.change_count(), change);
    }

    #[test]
    fn test_cluster_cursor() {
        // 1 and 9 share a natural slot at table_count 4 and still share one
        // after growth to 8.
        let mut map = MultiMap::with_config("cluster", &cluster_config()).unwrap();
        map.insert(1u64, 100u64).unwrap();
        map.insert(1u64, 101u64).unwrap();
        map.insert(9u64, 900u64).unwrap();
        map.insert(1u64, 102u64).unwrap();

        let mut values: Vec<u64> = map.values_of(&1).copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![100, 101, 102]);
        assert_eq!(map.values_of(&9).copied().collect::<Vec<_>>(), vec![900]);
        assert_clusters_intact(&map);

        map.remove(&1, &101).unwrap();
        let mut values: Vec<u64> = map.values_of(&1).copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![100, 102]);
        assert_eq!(map.values_of(&9).copied().collect::<Vec<_>>(), vec![900]);
        assert_clusters_intact(&map);
    }

    #[test]
    fn test_remove_all() {
        let mut map = MultiMap::with_config("removeall", &cluster_config()).unwrap();
        map.insert(1u64, 100u64).unwrap();
        map.insert(1u64, 101u64).unwrap();
        map.insert(1u64, 102u64).unwrap();
        map.insert(9u64, 900u64).unwrap();

        map.remove_all(&1).unwrap();
        assert!(!map.contains(&1));
        assert!(map.contains_pair(&9, &900));
        assert_eq!(map.count(), 1);
        assert_clusters_intact(&map);

        assert_eq!(map.remove_all(&1), Err(SetKitError::NotFound));
    }

    #[test]
    fn test_remove_null_value_not_found() {
        let mut map = MultiMap::with_config("nullval", &TableConfig::default()).unwrap();
        map.insert(1u64, 10u64).unwrap();
        assert_eq!(map.remove(&1, &0), Err(SetKitError::NotFound));
        assert_eq!(map.count(), 1);
    }

    #[test]
    fn test_remove_missing_pair() {
        let mut map = MultiMap::with_config("missing", &TableConfig::default()).unwrap();
        map.insert(1u64, 10u64).unwrap();
        assert_eq!(map.remove(&1, &11), Err(SetKitError::NotFound));
        assert_eq!(map.remove(&2, &10), Err(SetKitError::NotFound));
        assert_eq!(map.count(), 1);
    }

    #[test]
    fn test_removal_reheals_other_keys() {
        let mut map = MultiMap::with_config("reheal", &cluster_config()).unwrap();
        // Interleave two colliding keys so that removing one key's pairs
        // punches holes in front of the other's.
        map.insert(1u64, 100u64).unwrap();
        map.insert(9u64, 900u64).unwrap();
        map.insert(1u64, 101u64).unwrap();
        map.insert(9u64, 901u64).unwrap();
        map.insert(1u64, 102u64).unwrap();

        map.remove_all(&1).unwrap();
        let mut values: Vec<u64> = map.values_of(&9).copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![900, 901]);
        assert_clusters_intact(&map);
    }

    #[test]
    fn test_keys_deduplicated() {
        let mut map = MultiMap::with_config("keys", &cluster_config()).unwrap();
        for value in 1..=4u64 {
            map.insert(1u64, value).unwrap();
            map.insert(9u64, value * 10).unwrap();
        }
        let mut keys: Vec<u64> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 9]);
        assert_eq!(map.count(), 8);
    }

    #[test]
    fn test_growth_preserves_clusters() {
        let mut map = MultiMap::with_config("growth", &TableConfig::small()).unwrap();
        for key in 1..=20u64 {
            for value in 1..=5u64 {
                map.insert(key, key * 100 + value).unwrap();
            }
        }
        assert_eq!(map.count(), 100);
        for key in 1..=20u64 {
            let mut values: Vec<u64> = map.values_of(&key).copied().collect();
            values.sort_unstable();
            let expected: Vec<u64> = (1..=5u64).map(|v| key * 100 + v).collect();
            assert_eq!(values, expected, "cluster for key {} broken", key);
        }
        assert_clusters_intact(&map);
    }

    #[test]
    fn test_shrink_preserves_pairs() {
        let mut map = MultiMap::with_config("shrink", &TableConfig::small()).unwrap();
        for key in 1..=30u64 {
            map.insert(key, key).unwrap();
        }
        for key in 6..=30u64 {
            map.remove_all(&key).unwrap();
        }
        assert_eq!(map.count(), 5);
        for key in 1..=5u64 {
            assert!(map.contains_pair(&key, &key));
        }
        assert_clusters_intact(&map);
    }

    #[test]
    fn test_lifecycle_and_status() {
        let mut map = MultiMap::<u64, u64>::new();
        assert_eq!(map.insert(1, 1), Err(SetKitError::NotInitialized));
        map.create("life", &TableConfig::default(), None).unwrap();
        map.insert(1, 1).unwrap();
        map.reset();
        assert_eq!(map.count(), 0);
        map.destroy();
        assert_eq!(map.status(), Err(SetKitError::NotInitialized));
    }

    #[test]
    fn test_full_wraparound_cluster_terminates() {
        // A fixed table filled completely by one key: the value cursor and
        // removal must still terminate.
        let config = TableConfig {
            alloc_count_min: 2,
            table_count_min: 4,
            ..TableConfig::fixed()
        };
        let mut map = MultiMap::<u64, u64>::new();
        map.create_fixed("full", &config, vec![KeyValue::default(); 4])
            .unwrap();
        for value in 1..=4u64 {
            map.insert(1, value).unwrap();
        }
        assert_eq!(map.insert(1, 5), Err(SetKitError::CouldNotAlloc));
        assert_eq!(map.values_of(&1).count(), 4);
        map.remove_all(&1).unwrap();
        assert_eq!(map.count(), 0);
    }
}
