//! # SetKit: Hash Containers and Lazy Set Algebra
//!
//! This crate provides an open-addressed hash container family and an
//! abstract-set composition layer on top of it:
//!
//! - **Containers**: a key-only set, a one-to-one map, a one-to-many
//!   multimap and a child-to-parent relation, all linear-probing tables
//!   with hash-null empty slots, explicit grow/shrink policy and
//!   tombstone-free deletion
//! - **Pluggable Allocation**: buffers come from a [`TableAlloc`]
//!   implementation or from a caller-supplied fixed buffer
//! - **Set Algebra**: unions, intersections, differences, complements and
//!   relation closures as lazy virtual sets with cost-aware enumeration
//! - **Deterministic Behavior**: iteration order is an unspecified but
//!   deterministic function of insertion order and hash values
//!
//! ## Quick Start
//!
//! ```rust
//! use setkit::{
//!     AbstractSet, AncestorsOf, KeySet, Membership, Relation, SetCollector, TableConfig,
//! };
//!
//! // Key-only hash set with explicit growth policy
//! let mut lights = KeySet::with_config("lights", &TableConfig::default()).unwrap();
//! let mut heavies = KeySet::with_config("heavies", &TableConfig::default()).unwrap();
//! lights.insert(1u64).unwrap();
//! lights.insert(2u64).unwrap();
//! heavies.insert(2u64).unwrap();
//!
//! // A relation maps children to parents, one parent per child
//! let mut owners = Relation::with_config("owners", &TableConfig::default()).unwrap();
//! owners.insert_child_parent(2u64, 7u64).unwrap();
//!
//! // Operators compose containers into virtual sets, evaluated lazily
//! let roots = AncestorsOf::new(&owners, &heavies);
//! assert!(roots.contains(&7));
//!
//! let mut out = KeySet::with_config("out", &TableConfig::default()).unwrap();
//! roots.enumerate(&mut SetCollector::new(&mut out), None);
//! assert_eq!(out.count(), 1);
//! ```
//!
//! ## Concurrency
//!
//! Containers and operators are single-threaded; nothing here is `Sync`
//! against concurrent mutation. Mutating a container invalidates its
//! cursors and bumps its change counter, which is the signal downstream
//! caches use.

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod containers;
pub mod error;
pub mod key;
pub mod memory;
pub mod sets;

// Re-export core types
pub use config::TableConfig;
pub use containers::{KeyMap, KeySet, KeyValue, MultiMap, Relation};
pub use error::{Result, SetKitError};
pub use key::{HashKey, HashedKey};
pub use memory::{default_alloc, set_default_alloc, AllocStats, CountingAlloc, SystemAlloc, TableAlloc};
pub use sets::{
    AbstractSet, AncestorsOf, ChildrenOf, Collector, Complement, CountCollector, Difference,
    Intersection, Membership, ParentsOf, SetCollector, Union,
};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(VERSION.len() > 0);
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_re_exports() {
        let _set = KeySet::<u64>::new();
        let _map = KeyMap::<u64, u64>::new();
        let _multi = MultiMap::<u64, u64>::new();
        let _relation = Relation::<u64>::new();

        let err = SetKitError::NotFound;
        assert_eq!(err.category(), "domain");
        assert!(std::any::type_name::<Result<()>>().contains("SetKitError"));
    }

    #[test]
    fn test_config_round_trip() {
        let config = TableConfig::default();
        assert!(config.validate().is_ok());
    }
}
