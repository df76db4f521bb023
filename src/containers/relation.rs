//! Many-to-one relation kept as two mutually consistent tables
//!
//! A `Relation` pairs a child-to-parent [`KeyMap`] with a parent-to-child
//! [`MultiMap`]. Every mutation updates both so that `(c, p)` is in the
//! map iff `(p, c)` is in the multimap. Viewed as an abstract set, the
//! elements of a relation are its children.

use std::fmt;
use std::sync::Arc;

use crate::config::TableConfig;
use crate::containers::key_map::KeyMap;
use crate::containers::key_value::KeyValue;
use crate::containers::multi_map::{MultiMap, ValuesOf};
use crate::error::{Result, SetKitError};
use crate::key::HashKey;
use crate::memory::TableAlloc;
use crate::sets::{AbstractSet, Collector, Membership};

/// A child-to-parent relation: each child has at most one parent, a
/// parent has any number of children.
///
/// # Examples
///
/// ```rust
/// use setkit::{Relation, TableConfig};
///
/// let mut rel = Relation::with_config("tree", &TableConfig::default()).unwrap();
/// rel.insert_child_parent(2u64, 1u64).unwrap();
/// rel.insert_child_parent(3u64, 1u64).unwrap();
/// assert_eq!(rel.find_parent(&2), Some(&1));
/// assert_eq!(rel.children(&1).count(), 2);
/// ```
pub struct Relation<K> {
    name: &'static str,
    child_to_parent: KeyMap<K, K>,
    parent_to_child: MultiMap<K, K>,
}

impl<K: HashKey> Relation<K> {
    /// Create an uninitialized relation. Call [`Relation::create`] before use.
    pub fn new() -> Self {
        Self {
            name: "",
            child_to_parent: KeyMap::new(),
            parent_to_child: MultiMap::new(),
        }
    }

    /// Create and initialize in one step, with the default allocator.
    pub fn with_config(name: &'static str, config: &TableConfig) -> Result<Self> {
        let mut relation = Self::new();
        relation.create(name, config, None)?;
        Ok(relation)
    }

    /// Initialize both sub-containers with allocated storage.
    pub fn create(
        &mut self,
        name: &'static str,
        config: &TableConfig,
        alloc: Option<Arc<dyn TableAlloc>>,
    ) -> Result<()> {
        self.name = name;
        let _ = self.parent_to_child.create(name, config, alloc.clone());
        let _ = self.child_to_parent.create(name, config, alloc);
        self.status()
    }

    /// Initialize both sub-containers over one caller-supplied buffer.
    ///
    /// The first half backs the parent-to-child table, the remainder the
    /// child-to-parent table.
    pub fn create_fixed(
        &mut self,
        name: &'static str,
        config: &TableConfig,
        mut buffer: Vec<KeyValue<K, K>>,
    ) -> Result<()> {
        self.name = name;
        let rest = buffer.split_off(buffer.len() / 2);
        let _ = self.parent_to_child.create_fixed(name, config, buffer);
        let _ = self.child_to_parent.create_fixed(name, config, rest);
        self.status()
    }

    /// Drop all storage and return to the uninitialized state.
    pub fn destroy(&mut self) {
        self.parent_to_child.destroy();
        self.child_to_parent.destroy();
    }

    /// Remove every relation.
    pub fn reset(&mut self) {
        self.parent_to_child.reset();
        self.child_to_parent.reset();
    }

    /// Relate a child to a parent, replacing the child's previous parent.
    ///
    /// A hash-null parent removes the child instead; a hash-null child is
    /// rejected. The two tables never expose a half-inserted relation: if
    /// the reverse edge cannot be stored, the forward edge is rolled back.
    pub fn insert_child_parent(&mut self, child: K, parent: K) -> Result<()> {
        if parent.is_hash_null() {
            return self.remove_child(&child);
        }
        if child.is_hash_null() {
            return Err(SetKitError::InvalidArguments);
        }
        let _ = self.remove_child(&child);
        self.child_to_parent.insert(child.clone(), parent.clone())?;
        if let Err(err) = self.parent_to_child.insert(parent, child.clone()) {
            let _ = self.child_to_parent.remove(&child);
            return Err(err);
        }
        Ok(())
    }

    /// Remove the child's relation with its parent, if any.
    pub fn remove_child(&mut self, child: &K) -> Result<()> {
        self.status()?;
        if child.is_hash_null() {
            return Err(SetKitError::NotFound);
        }
        let Some(parent) = self.child_to_parent.get(child).cloned() else {
            return Err(SetKitError::NotFound);
        };
        self.parent_to_child.remove(&parent, child)?;
        self.child_to_parent.remove(child)?;
        Ok(())
    }

    /// Remove every relation in which the given key is the parent.
    pub fn remove_parent(&mut self, parent: &K) -> Result<()> {
        self.status()?;
        if parent.is_hash_null() {
            return Err(SetKitError::NotFound);
        }
        let Self {
            child_to_parent,
            parent_to_child,
            ..
        } = self;
        for child in parent_to_child.values_of(parent) {
            let _ = child_to_parent.remove(child);
        }
        parent_to_child.remove_all(parent)
    }

    /// Find the parent of a child.
    pub fn find_parent(&self, child: &K) -> Option<&K> {
        self.child_to_parent.get(child)
    }

    /// True when the child has a parent.
    pub fn contains(&self, child: &K) -> bool {
        self.child_to_parent.contains(child)
    }

    /// True when the parent has at least one child.
    pub fn contains_parent(&self, parent: &K) -> bool {
        self.parent_to_child.contains(parent)
    }

    /// Iterator over the children of a parent.
    pub fn children(&self, parent: &K) -> ValuesOf<'_, K, K> {
        self.parent_to_child.values_of(parent)
    }

    /// Iterator over `(child, parent)` pairs.
    pub fn iter(&self) -> crate::containers::key_map::Iter<'_, K, K> {
        self.child_to_parent.iter()
    }

    /// Apply any pending growth and shrink on both tables.
    pub fn update(&mut self) -> Result<()> {
        self.child_to_parent.update()?;
        self.parent_to_child.update()
    }

    /// Combined status of the two tables.
    pub fn status(&self) -> Result<()> {
        self.parent_to_child.status()?;
        self.child_to_parent.status()
    }

    /// Number of relations.
    pub fn count(&self) -> usize {
        self.child_to_parent.count()
    }

    /// True when no relations are stored.
    pub fn is_empty(&self) -> bool {
        self.child_to_parent.is_empty()
    }

    /// Name given at creation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Mutation counter of the child-to-parent table.
    ///
    /// Every relation mutation touches that table, so its counter is used
    /// as the counter of the whole relation.
    pub fn change_count(&self) -> u64 {
        self.child_to_parent.change_count()
    }

    /// First occupied child cursor index, or the end sentinel.
    pub fn first_index(&self) -> usize {
        self.child_to_parent.first_index()
    }

    /// Next occupied child cursor index, or the end sentinel.
    pub fn next_index(&self, index: usize) -> usize {
        self.child_to_parent.next_index(index)
    }

    /// True while a child cursor index refers into the live table.
    pub fn index_valid(&self, index: usize) -> bool {
        self.child_to_parent.index_valid(index)
    }

    /// Child key at a valid cursor index.
    pub fn key_at(&self, index: usize) -> &K {
        self.child_to_parent.key_at(index)
    }
}

impl<K: HashKey> Default for Relation<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HashKey + fmt::Debug> fmt::Debug for Relation<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// As an abstract set, the elements of a relation are its children.
impl<K: HashKey> Membership<K> for Relation<K> {
    fn contains(&self, child: &K) -> bool {
        Relation::contains(self, child)
    }
}

impl<K: HashKey> AbstractSet<K> for Relation<K> {
    fn enumerate(&self, collector: &mut dyn Collector<K>, limit: Option<&dyn Membership<K>>) {
        let mut i = self.first_index();
        while self.index_valid(i) {
            let child = self.key_at(i);
            if limit.map_or(true, |l| l.contains(child)) {
                collector.push(child.clone());
            }
            i = self.next_index(i);
        }
    }

    fn enumeration_cost(&self) -> usize {
        self.count()
    }

    fn change_count(&self) -> u64 {
        Relation::change_count(self)
    }
}
