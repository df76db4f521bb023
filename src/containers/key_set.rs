//! Key-only open-addressed hash table
//!
//! `KeySet` stores keys in a linear-probing table whose empty slots are
//! marked by the key type's hash-null value. Deletion repairs probe
//! chains in place (no tombstones), so lookup cost stays a function of
//! the live load factor alone.

use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::config::TableConfig;
use crate::containers::table_buf::TableBuf;
use crate::error::{Result, SetKitError};
use crate::key::HashKey;
use crate::memory::{default_alloc, TableAlloc};
use crate::sets::{AbstractSet, Collector, Membership};

/// A key-only hash table with explicit growth policy.
///
/// The table is created in an uninitialized state; [`KeySet::create`] (or
/// [`KeySet::with_config`]) binds the configuration and storage. Inserting
/// an existing key is a no-op, matching set semantics.
///
/// # Examples
///
/// ```rust
/// use setkit::{KeySet, TableConfig};
///
/// let mut set = KeySet::with_config("ids", &TableConfig::default()).unwrap();
/// set.insert(7u64).unwrap();
/// set.insert(7u64).unwrap();
/// assert!(set.contains(&7));
/// assert_eq!(set.count(), 1);
/// ```
pub struct KeySet<K> {
    buf: TableBuf<K>,
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

impl<K: HashKey> KeySet<K> {
    /// Create an uninitialized set. Call [`KeySet::create`] before use.
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
        let mut set = Self::new();
        set.create(name, config, None)?;
        Ok(set)
    }

    /// Initialize the set with allocated storage.
    ///
    /// `alloc` falls back to the process-wide default allocator. Calling
    /// `create` on an initialized set fails with `DoubleInitialized`.
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
        log::debug!("created set {:?}: {} slots", name, capacity);
        Ok(())
    }

    /// Initialize the set over a caller-supplied buffer.
    ///
    /// The buffer is adopted (its previous contents are discarded) and its
    /// length becomes the permanent capacity; no allocation ever happens.
    pub fn create_fixed(
        &mut self,
        name: &'static str,
        config: &TableConfig,
        buffer: Vec<K>,
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
        log::debug!("created fixed set {:?}: {} slots", name, self.buf.len());
        Ok(())
    }

    /// Drop all storage and return to the uninitialized state.
    pub fn destroy(&mut self) {
        *self = Self::new();
    }

    /// Remove every key and shrink back to the minimum capacity.
    pub fn reset(&mut self) {
        if self.status.is_some() {
            return;
        }
        for slot in &mut self.buf.slots_mut()[..self.table_count] {
            *slot = K::default();
        }
        self.active_count = 0;
        self.change_count += 1;
        let table_count = self.table_count_min;
        let capacity = self.alloc_count_min.max(self.table_count_min);
        if let Err(err) = self.resize(table_count, capacity) {
            log::debug!("{}: reset kept oversized buffer: {}", self.name, err);
        }
    }

    /// Insert a key. Inserting a key that is already present is a no-op.
    pub fn insert(&mut self, key: K) -> Result<()> {
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
        if slot.is_hash_null() {
            *slot = key;
            self.active_count += 1;
            self.change_count += 1;
        }
        Ok(())
    }

    /// Remove a key, repairing the probe chains it participated in.
    pub fn remove(&mut self, key: &K) -> Result<()> {
        self.status()?;
        if key.is_hash_null() || !self.remove_one(key) {
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

    /// Test presence of a key.
    pub fn contains(&self, key: &K) -> bool {
        if self.status.is_some() || key.is_hash_null() {
            return false;
        }
        match self.find_empty_or_matching(key) {
            Some(index) => !self.buf.slots()[index].is_hash_null(),
            None => false,
        }
    }

    /// Apply any pending growth and shrink.
    ///
    /// Only needed when `auto_grow`/`auto_shrink` are off.
    pub fn update(&mut self) -> Result<()> {
        self.status()?;
        self.grow()?;
        self.shrink()?;
        Ok(())
    }

    /// Current status; `Err` for an uninitialized or misconfigured set.
    pub fn status(&self) -> Result<()> {
        match self.status {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of keys in the set.
    pub fn count(&self) -> usize {
        self.active_count
    }

    /// True when the set holds no keys.
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

    /// Key at a cursor index. The index must come from the cursor
    /// protocol and be valid.
    pub fn key_at(&self, index: usize) -> &K {
        &self.buf.slots()[index]
    }

    /// Iterator over the keys, in table order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            set: self,
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
            if !self.buf.slots()[i].is_hash_null() {
                return i;
            }
        }
        self.table_count
    }

    /// Probe for `key`: the first empty or equal slot, starting at the
    /// key's natural position and wrapping once. `None` only on a full
    /// table without a match.
    fn find_empty_or_matching(&self, key: &K) -> Option<usize> {
        if self.table_count == 0 {
            return None;
        }
        let slots = self.buf.slots();
        let start = (key.hash_value() % self.table_count as u64) as usize;
        for i in start..self.table_count {
            if slots[i].is_hash_null() || slots[i] == *key {
                return Some(i);
            }
        }
        for i in 0..start {
            if slots[i].is_hash_null() || slots[i] == *key {
                return Some(i);
            }
        }
        None
    }

    /// Move the entry at `index` back to its natural probe position if a
    /// collision had displaced it.
    fn reinsert(&mut self, index: usize) {
        let key = self.buf.slots()[index].clone();
        if let Some(new_index) = self.find_empty_or_matching(&key) {
            if new_index != index {
                let slots = self.buf.slots_mut();
                slots[new_index] = key;
                slots[index] = K::default();
            }
        }
    }

    fn remove_one(&mut self, key: &K) -> bool {
        let Some(index) = self.find_empty_or_matching(key) else {
            return false;
        };
        if self.buf.slots()[index].is_hash_null() {
            return false;
        }
        self.buf.slots_mut()[index] = K::default();
        self.active_count -= 1;

        // Entries after the hole may have probed past it; reinsert each one
        // until the chain's terminating empty slot.
        let table_count = self.table_count;
        for step in 1..table_count {
            let i = (index + step) % table_count;
            if self.buf.slots()[i].is_hash_null() {
                return true;
            }
            self.reinsert(i);
        }
        true
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
                // Fresh buffer: allocate first so failure leaves the
                // container untouched, then rebuild from the old table.
                let new_buf = TableBuf::allocate(new_capacity, &alloc, self.name)?;
                let old_buf = mem::replace(&mut self.buf, new_buf);
                let old_table_count = mem::replace(&mut self.table_count, new_table_count);
                self.active_count = 0;
                if self.buf.len() > 0 {
                    for slot in &old_buf.slots()[..old_table_count] {
                        if !slot.is_hash_null() {
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
                if !self.buf.slots()[i].is_hash_null() {
                    self.reinsert(i);
                }
            }
        } else if new_table_count > self.table_count {
            let old_table_count = mem::replace(&mut self.table_count, new_table_count);
            for i in 0..old_table_count {
                if !self.buf.slots()[i].is_hash_null() {
                    self.reinsert(i);
                }
            }
            // Keys bumped past the old boundary by the reinsert pass above
            // settle once we reach the first empty slot of the new range.
            for i in old_table_count..new_table_count {
                if self.buf.slots()[i].is_hash_null() {
                    break;
                }
                self.reinsert(i);
            }
        }
        Ok(())
    }

    /// Insert during a table rebuild: no growth, no status or null checks.
    fn insert_slot(&mut self, key: K) {
        if let Some(index) = self.find_empty_or_matching(&key) {
            let slot = &mut self.buf.slots_mut()[index];
            if slot.is_hash_null() {
                *slot = key;
                self.active_count += 1;
            }
        }
    }
}

impl<K: HashKey> Default for KeySet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HashKey + fmt::Debug> fmt::Debug for KeySet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: HashKey> Membership<K> for KeySet<K> {
    fn contains(&self, key: &K) -> bool {
        KeySet::contains(self, key)
    }
}

impl<K: HashKey> AbstractSet<K> for KeySet<K> {
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

/// Iterator over the keys of a [`KeySet`].
pub struct Iter<'a, K> {
    set: &'a KeySet<K>,
    index: usize,
}

impl<'a, K: HashKey> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.set.table_count {
            let slot = &self.set.buf.slots()[self.index];
            self.index += 1;
            if !slot.is_hash_null() {
                return Some(slot);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.set.table_count.saturating_sub(self.index)))
    }
}
