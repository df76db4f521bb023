//! Graph operators over a relation
//!
//! These operators map a source set through a [`Relation`]: one hop to
//! parents, one hop to children, or the full ancestor closure. Like the
//! algebra operators they are virtual sets borrowing their inputs.
//!
//! The ancestor closure assumes the relation is acyclic; a parent cycle
//! is outside the containers' contract.

use crate::containers::relation::Relation;
use crate::key::HashKey;
use crate::sets::{AbstractSet, Collector, Membership};

/// One hop child-to-parent: the parents of the source's elements.
///
/// `contains(k)` holds when some child of `k` is in the source set.
pub struct ParentsOf<'a, K> {
    relation: &'a Relation<K>,
    source: &'a dyn AbstractSet<K>,
}

impl<'a, K: HashKey> ParentsOf<'a, K> {
    /// Map `source` through `relation` towards parents.
    pub fn new(relation: &'a Relation<K>, source: &'a dyn AbstractSet<K>) -> Self {
        Self { relation, source }
    }
}

impl<K: HashKey> Membership<K> for ParentsOf<'_, K> {
    fn contains(&self, key: &K) -> bool {
        if key.is_hash_null() {
            return false;
        }
        self.relation
            .children(key)
            .any(|child| self.source.contains(child))
    }
}

impl<K: HashKey> AbstractSet<K> for ParentsOf<'_, K> {
    fn enumerate(&self, collector: &mut dyn Collector<K>, limit: Option<&dyn Membership<K>>) {
        let mut hop = HopToParent {
            out: collector,
            relation: self.relation,
            limit,
        };
        self.source.enumerate(&mut hop, None);
    }

    fn enumeration_cost(&self) -> usize {
        self.source.enumeration_cost()
    }

    fn change_count(&self) -> u64 {
        self.source.change_count() + self.relation.change_count()
    }
}

struct HopToParent<'c, 'd, K> {
    out: &'c mut (dyn Collector<K> + 'd),
    relation: &'c Relation<K>,
    limit: Option<&'c dyn Membership<K>>,
}

impl<K: HashKey> Collector<K> for HopToParent<'_, '_, K> {
    fn push(&mut self, key: K) {
        if let Some(parent) = self.relation.find_parent(&key) {
            if self.limit.map_or(true, |limit| limit.contains(parent)) {
                self.out.push(parent.clone());
            }
        }
    }
}

/// One hop parent-to-child: the children of the source's elements.
///
/// `contains(k)` holds when `k`'s parent is in the source set.
pub struct ChildrenOf<'a, K> {
    relation: &'a Relation<K>,
    source: &'a dyn AbstractSet<K>,
}

impl<'a, K: HashKey> ChildrenOf<'a, K> {
    /// Map `source` through `relation` towards children.
    pub fn new(relation: &'a Relation<K>, source: &'a dyn AbstractSet<K>) -> Self {
        Self { relation, source }
    }
}

impl<K: HashKey> Membership<K> for ChildrenOf<'_, K> {
    fn contains(&self, key: &K) -> bool {
        match self.relation.find_parent(key) {
            Some(parent) => self.source.contains(parent),
            None => false,
        }
    }
}

impl<K: HashKey> AbstractSet<K> for ChildrenOf<'_, K> {
    fn enumerate(&self, collector: &mut dyn Collector<K>, limit: Option<&dyn Membership<K>>) {
        let mut hop = HopToChildren {
            out: collector,
            relation: self.relation,
            limit,
        };
        self.source.enumerate(&mut hop, None);
    }

    fn enumeration_cost(&self) -> usize {
        self.source.enumeration_cost()
    }

    fn change_count(&self) -> u64 {
        self.source.change_count() + self.relation.change_count()
    }
}

struct HopToChildren<'c, 'd, K> {
    out: &'c mut (dyn Collector<K> + 'd),
    relation: &'c Relation<K>,
    limit: Option<&'c dyn Membership<K>>,
}

impl<K: HashKey> Collector<K> for HopToChildren<'_, '_, K> {
    fn push(&mut self, key: K) {
        for child in self.relation.children(&key) {
            if self.limit.map_or(true, |limit| limit.contains(child)) {
                self.out.push(child.clone());
            }
        }
    }
}

/// Transitive closure towards the roots: every ancestor of every source
/// element, and the parentless source elements themselves.
///
/// Enumeration walks each source element's ancestor chain and therefore
/// emits duplicates whenever chains share a tail; push into a
/// [`SetCollector`](crate::SetCollector).
pub struct AncestorsOf<'a, K> {
    relation: &'a Relation<K>,
    source: &'a dyn AbstractSet<K>,
}

impl<'a, K: HashKey> AncestorsOf<'a, K> {
    /// Close `source` over `relation`'s parent edges.
    pub fn new(relation: &'a Relation<K>, source: &'a dyn AbstractSet<K>) -> Self {
        Self { relation, source }
    }
}

impl<K: HashKey> Membership<K> for AncestorsOf<'_, K> {
    fn contains(&self, key: &K) -> bool {
        for child in self.relation.children(key) {
            if self.source.contains(child) {
                return true;
            }
            if self.contains(child) {
                return true;
            }
        }
        !self.relation.contains(key) && self.source.contains(key)
    }
}

impl<K: HashKey> AbstractSet<K> for AncestorsOf<'_, K> {
    fn enumerate(&self, collector: &mut dyn Collector<K>, limit: Option<&dyn Membership<K>>) {
        let mut walk = WalkToRoot {
            out: collector,
            relation: self.relation,
            limit,
        };
        self.source.enumerate(&mut walk, None);
    }

    fn enumeration_cost(&self) -> usize {
        self.source.enumeration_cost()
    }

    fn change_count(&self) -> u64 {
        self.source.change_count() + self.relation.change_count()
    }
}

struct WalkToRoot<'c, 'd, K> {
    out: &'c mut (dyn Collector<K> + 'd),
    relation: &'c Relation<K>,
    limit: Option<&'c dyn Membership<K>>,
}

impl<K: HashKey> Collector<K> for WalkToRoot<'_, '_, K> {
    fn push(&mut self, key: K) {
        let mut parent = self.relation.find_parent(&key);
        if parent.is_none() {
            // A parentless element represents itself.
            if self.limit.map_or(true, |limit| limit.contains(&key)) {
                self.out.push(key);
            }
            return;
        }
        while let Some(next) = parent {
            if self.limit.map_or(true, |limit| limit.contains(next)) {
                self.out.push(next.clone());
            }
            parent = self.relation.find_parent(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::containers::key_set::KeySet;
    use crate::sets::collect::SetCollector;

    fn set_of(name: &'static str, keys: &[u64]) -> KeySet<u64> {
        let mut set = KeySet::with_config(name, &TableConfig::small()).unwrap();
        for key in keys {
            set.insert(*key).unwrap();
        }
        set
    }

    fn collect(set: &dyn AbstractSet<u64>) -> Vec<u64> {
        let mut out = KeySet::with_config("collect", &TableConfig::small()).unwrap();
        set.enumerate(&mut SetCollector::new(&mut out), None);
        let mut keys: Vec<u64> = out.iter().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// c -> b -> a, d -> a
    fn family() -> Relation<u64> {
        let mut rel = Relation::with_config("family", &TableConfig::default()).unwrap();
        rel.insert_child_parent(3u64, 2u64).unwrap(); // c -> b
        rel.insert_child_parent(2u64, 1u64).unwrap(); // b -> a
        rel.insert_child_parent(4u64, 1u64).unwrap(); // d -> a
        rel
    }

    #[test]
    fn test_parents_of() {
        let rel = family();
        let source = set_of("src", &[3, 4]);
        let parents = ParentsOf::new(&rel, &source);
        assert_eq!(collect(&parents), vec![1, 2]);
        assert!(parents.contains(&2)); // b has child c in source
        assert!(parents.contains(&1)); // a has child d in source
        assert!(!parents.contains(&3));
    }

    #[test]
    fn test_children_of() {
        let rel = family();
        let source = set_of("src", &[1]);
        let children = ChildrenOf::new(&rel, &source);
        assert_eq!(collect(&children), vec![2, 4]);
        assert!(children.contains(&2));
        assert!(children.contains(&4));
        assert!(!children.contains(&3)); // parent b is not in source
        assert!(!children.contains(&1));
    }

    #[test]
    fn test_ancestors_closure() {
        let rel = family();
        let source = set_of("src", &[3, 4]);
        let ancestors = AncestorsOf::new(&rel, &source);

        // c's chain is b, a; d's chain is a.
        assert_eq!(collect(&ancestors), vec![1, 2]);
        assert!(ancestors.contains(&1));
        assert!(ancestors.contains(&2));
        assert!(!ancestors.contains(&3));
        assert!(!ancestors.contains(&4));
    }

    #[test]
    fn test_ancestors_keep_parentless_elements() {
        let rel = family();
        // 9 has no parent in the relation, so it represents itself.
        let source = set_of("src", &[4, 9]);
        let ancestors = AncestorsOf::new(&rel, &source);
        assert_eq!(collect(&ancestors), vec![1, 9]);
        assert!(ancestors.contains(&9));
    }

    #[test]
    fn test_ancestors_duplicates_collapse_in_set_collector() {
        let rel = family();
        // Both chains end at a; a plain vector sees the duplicate, a set
        // collector does not.
        let source = set_of("src", &[3, 4]);
        let ancestors = AncestorsOf::new(&rel, &source);
        let mut raw: Vec<u64> = Vec::new();
        ancestors.enumerate(&mut raw, None);
        raw.sort_unstable();
        assert_eq!(raw, vec![1, 1, 2]);
    }

    #[test]
    fn test_closure_respects_limit() {
        let rel = family();
        let source = set_of("src", &[3, 4]);
        let only_roots = set_of("roots", &[1]);
        let ancestors = AncestorsOf::new(&rel, &source);
        let mut out = KeySet::with_config("out", &TableConfig::small()).unwrap();
        ancestors.enumerate(&mut SetCollector::new(&mut out), Some(&only_roots));
        let keys: Vec<u64> = out.iter().copied().collect();
        assert_eq!(keys, vec![1]);
    }

    #[test]
    fn test_change_count_tracks_relation() {
        let mut rel = family();
        let source = set_of("src", &[3]);
        let before = AncestorsOf::new(&rel, &source).change_count();
        rel.insert_child_parent(5u64, 1u64).unwrap();
        let after = AncestorsOf::new(&rel, &source).change_count();
        assert!(after > before);
    }
}
