//! Open-addressed hash containers
//!
//! All four containers share one engine design: linear probing over a
//! slot array whose empty slots are marked by the key's hash-null value,
//! explicit grow/shrink thresholds, and deletion that repairs probe
//! chains in place instead of leaving tombstones.
//!
//! - [`KeySet`] - key-only set
//! - [`KeyMap`] - one-to-one map
//! - [`MultiMap`] - one-to-many map with contiguous per-key clusters
//! - [`Relation`] - child-to-parent relation kept as a consistent
//!   map/multimap pair
//!
//! Every container also implements
//! [`AbstractSet`](crate::sets::AbstractSet), which is how the operators
//! in [`sets`](crate::sets) compose them into virtual sets.

pub mod key_map;
pub mod key_set;
pub mod key_value;
pub mod multi_map;
pub mod relation;
pub(crate) mod table_buf;

pub use key_map::KeyMap;
pub use key_set::KeySet;
pub use key_value::KeyValue;
pub use multi_map::MultiMap;
pub use relation::Relation;
