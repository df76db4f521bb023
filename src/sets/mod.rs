//! Lazy set algebra over the hash containers
//!
//! Every concrete container and every operator in this module exposes the
//! same small read surface: membership, enumeration into a collector,
//! a cost hint and a change counter. Operators are virtual sets that
//! borrow their sources, so arbitrarily deep composition trees evaluate
//! lazily and allocate nothing themselves.
//!
//! # Examples
//!
//! ```rust
//! use setkit::{AbstractSet, Intersection, KeySet, Membership, SetCollector, TableConfig};
//!
//! let mut evens = KeySet::with_config("evens", &TableConfig::default()).unwrap();
//! let mut small = KeySet::with_config("small", &TableConfig::default()).unwrap();
//! for key in 1..=20u64 {
//!     if key % 2 == 0 {
//!         evens.insert(key).unwrap();
//!     }
//!     if key <= 10 {
//!         small.insert(key).unwrap();
//!     }
//! }
//!
//! let sources: [&dyn AbstractSet<u64>; 2] = [&evens, &small];
//! let both = Intersection::new(&sources);
//! assert!(both.contains(&4));
//! assert!(!both.contains(&12));
//!
//! let mut out = KeySet::with_config("out", &TableConfig::default()).unwrap();
//! both.enumerate(&mut SetCollector::new(&mut out), None);
//! assert_eq!(out.count(), 5);
//! ```

pub mod algebra;
pub mod collect;
pub mod relation_ops;

pub use algebra::{Complement, Difference, Intersection, Union};
pub use collect::{CountCollector, SetCollector};
pub use relation_ops::{AncestorsOf, ChildrenOf, ParentsOf};

/// Membership test, the surface used for enumeration limits.
///
/// Split from [`AbstractSet`] so that internal limit combinators only
/// need to answer `contains`.
pub trait Membership<K> {
    /// Test if a key is an element of the set.
    fn contains(&self, key: &K) -> bool;
}

/// The polymorphic read interface shared by containers and operators.
pub trait AbstractSet<K>: Membership<K> {
    /// Push every element into the collector. When a `limit` is given,
    /// only elements it contains are pushed. Operators may emit
    /// duplicates; push into a [`SetCollector`] to deduplicate.
    fn enumerate(&self, collector: &mut dyn Collector<K>, limit: Option<&dyn Membership<K>>);

    /// Integer hint of how much work `enumerate` does. For concrete
    /// containers this is the element count.
    fn enumeration_cost(&self) -> usize;

    /// Monotonically non-decreasing mutation counter, summed over the
    /// underlying sources. Identical values imply no relevant mutation,
    /// which is what downstream caches key on.
    fn change_count(&self) -> u64;
}

/// Sink receiving enumerated keys one at a time.
pub trait Collector<K> {
    /// Receive one element.
    fn push(&mut self, key: K);
}

/// A plain vector is the array collector.
impl<K> Collector<K> for Vec<K> {
    fn push(&mut self, key: K) {
        Vec::push(self, key);
    }
}
