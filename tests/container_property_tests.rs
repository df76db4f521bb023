//! Model-based property tests for the hash containers
//!
//! Every container is driven with random operation sequences against a
//! std::collections model. The small key domain forces heavy collisions,
//! wrap-around probing and constant grow/shrink traffic, which is where
//! the probe fix-up and cluster bookkeeping earn their keep.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use setkit::sets::AbstractSet;
use setkit::{KeyMap, KeySet, MultiMap, Relation, SetCollector, SetKitError, TableConfig};

const KEY_DOMAIN: u64 = 24;

fn small_config() -> TableConfig {
    TableConfig {
        alloc_count_min: 8,
        table_count_min: 4,
        grow_threshold: 80,
        shrink_threshold: 30,
        ..TableConfig::default()
    }
}

fn key_strategy() -> impl Strategy<Value = u64> {
    1..=KEY_DOMAIN
}

#[derive(Debug, Clone)]
enum SetOp {
    Insert(u64),
    Remove(u64),
    Reset,
}

fn set_op_strategy() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        8 => key_strategy().prop_map(SetOp::Insert),
        4 => key_strategy().prop_map(SetOp::Remove),
        1 => Just(SetOp::Reset),
    ]
}

proptest! {
    #[test]
    fn set_matches_model(ops in prop::collection::vec(set_op_strategy(), 1..200)) {
        let mut set = KeySet::with_config("prop_set", &small_config()).unwrap();
        let mut model: HashSet<u64> = HashSet::new();

        for op in ops {
            match op {
                SetOp::Insert(key) => {
                    set.insert(key).unwrap();
                    model.insert(key);
                }
                SetOp::Remove(key) => {
                    let expected = model.remove(&key);
                    let got = set.remove(&key);
                    prop_assert_eq!(got.is_ok(), expected);
                    if !expected {
                        prop_assert_eq!(got, Err(SetKitError::NotFound));
                    }
                }
                SetOp::Reset => {
                    set.reset();
                    model.clear();
                }
            }

            // Probe correctness and count parity after every operation.
            prop_assert_eq!(set.count(), model.len());
            for key in 1..=KEY_DOMAIN {
                prop_assert_eq!(set.contains(&key), model.contains(&key), "key {}", key);
            }
        }
    }

    #[test]
    fn set_enumeration_totality(keys in prop::collection::vec(key_strategy(), 0..60)) {
        let mut set = KeySet::with_config("prop_total", &small_config()).unwrap();
        for key in &keys {
            set.insert(*key).unwrap();
        }

        let mut out = KeySet::with_config("prop_total_out", &small_config()).unwrap();
        set.enumerate(&mut SetCollector::new(&mut out), None);

        prop_assert_eq!(out.count(), set.count());
        for key in set.iter() {
            prop_assert!(out.contains(key));
        }
    }

    #[test]
    fn map_matches_model(
        ops in prop::collection::vec(
            prop_oneof![
                6 => (key_strategy(), 1..1000u64).prop_map(|(k, v)| (0u8, k, v)),
                3 => key_strategy().prop_map(|k| (1u8, k, 0u64)),
            ],
            1..200,
        )
    ) {
        let mut map = KeyMap::with_config("prop_map", &small_config()).unwrap();
        let mut model: HashMap<u64, u64> = HashMap::new();

        for (kind, key, value) in ops {
            match kind {
                0 => {
                    let previous = map.insert(key, value).unwrap();
                    prop_assert_eq!(previous, model.insert(key, value));
                }
                _ => {
                    let expected = model.remove(&key);
                    match expected {
                        Some(v) => prop_assert_eq!(map.remove(&key), Ok(v)),
                        None => prop_assert_eq!(map.remove(&key), Err(SetKitError::NotFound)),
                    }
                }
            }

            prop_assert_eq!(map.count(), model.len());
            for key in 1..=KEY_DOMAIN {
                prop_assert_eq!(map.get(&key).copied(), model.get(&key).copied(), "key {}", key);
            }
        }
    }

    #[test]
    fn multimap_matches_model(
        ops in prop::collection::vec(
            prop_oneof![
                8 => (key_strategy(), 1..6u64).prop_map(|(k, v)| (0u8, k, v)),
                2 => (key_strategy(), 1..6u64).prop_map(|(k, v)| (1u8, k, v)),
                2 => key_strategy().prop_map(|k| (2u8, k, 0u64)),
            ],
            1..200,
        )
    ) {
        let mut map = MultiMap::with_config("prop_multi", &small_config()).unwrap();
        let mut model: HashSet<(u64, u64)> = HashSet::new();

        for (kind, key, value) in ops {
            match kind {
                0 => {
                    map.insert(key, value).unwrap();
                    model.insert((key, value));
                }
                1 => {
                    let expected = model.remove(&(key, value));
                    prop_assert_eq!(map.remove(&key, &value).is_ok(), expected);
                }
                _ => {
                    let before = model.len();
                    model.retain(|(k, _)| *k != key);
                    prop_assert_eq!(map.remove_all(&key).is_ok(), model.len() < before);
                }
            }

            prop_assert_eq!(map.count(), model.len());
            // The per-key cursor must reach every pair of its cluster; a
            // split cluster would make it stop early at a hole.
            for key in 1..=KEY_DOMAIN {
                let mut got: Vec<u64> = map.values_of(&key).copied().collect();
                got.sort_unstable();
                let mut expected: Vec<u64> = model
                    .iter()
                    .filter(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
                    .collect();
                expected.sort_unstable();
                prop_assert_eq!(got, expected, "cluster for key {}", key);
            }
        }
    }

    #[test]
    fn relation_matches_model(
        ops in prop::collection::vec(
            prop_oneof![
                8 => (key_strategy(), key_strategy()).prop_map(|(c, p)| (0u8, c, p)),
                2 => key_strategy().prop_map(|c| (1u8, c, 0u64)),
                2 => key_strategy().prop_map(|p| (2u8, p, 0u64)),
            ],
            1..150,
        )
    ) {
        let mut rel = Relation::with_config("prop_rel", &small_config()).unwrap();
        let mut model: HashMap<u64, u64> = HashMap::new();

        for (kind, a, b) in ops {
            match kind {
                0 => {
                    rel.insert_child_parent(a, b).unwrap();
                    model.insert(a, b);
                }
                1 => {
                    let expected = model.remove(&a).is_some();
                    prop_assert_eq!(rel.remove_child(&a).is_ok(), expected);
                }
                _ => {
                    let before = model.len();
                    model.retain(|_, parent| *parent != a);
                    prop_assert_eq!(rel.remove_parent(&a).is_ok(), model.len() < before);
                }
            }

            // Cross-invariant: the child map and the reverse multimap
            // describe the same edge set.
            prop_assert_eq!(rel.count(), model.len());
            for key in 1..=KEY_DOMAIN {
                prop_assert_eq!(
                    rel.find_parent(&key).copied(),
                    model.get(&key).copied(),
                    "parent of {}",
                    key
                );
                let mut got: Vec<u64> = rel.children(&key).copied().collect();
                got.sort_unstable();
                let mut expected: Vec<u64> = model
                    .iter()
                    .filter(|(_, p)| **p == key)
                    .map(|(c, _)| *c)
                    .collect();
                expected.sort_unstable();
                prop_assert_eq!(got, expected, "children of {}", key);
                prop_assert_eq!(rel.contains_parent(&key), rel.children(&key).next().is_some());
            }
        }
    }
}
