//! Collectors: the sinks of enumeration

use crate::containers::key_set::KeySet;
use crate::key::HashKey;
use crate::sets::Collector;

/// Collector that inserts every pushed key into a [`KeySet`].
///
/// The set deduplicates, which makes this the intended sink for operators
/// whose enumeration may emit duplicates. Push failures (for example a
/// fixed-capacity destination running out of room) are dropped, matching
/// the fire-and-forget nature of enumeration.
pub struct SetCollector<'a, K> {
    set: &'a mut KeySet<K>,
}

impl<'a, K: HashKey> SetCollector<'a, K> {
    /// Wrap a destination set.
    pub fn new(set: &'a mut KeySet<K>) -> Self {
        Self { set }
    }
}

impl<K: HashKey> Collector<K> for SetCollector<'_, K> {
    fn push(&mut self, key: K) {
        let _ = self.set.insert(key);
    }
}

/// Collector that only counts what it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountCollector {
    count: usize,
}

impl CountCollector {
    /// Fresh counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys pushed so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl<K> Collector<K> for CountCollector {
    fn push(&mut self, _key: K) {
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::sets::AbstractSet;

    #[test]
    fn test_set_collector_deduplicates() {
        let mut out = KeySet::with_config("out", &TableConfig::small()).unwrap();
        let mut collector = SetCollector::new(&mut out);
        collector.push(5u64);
        collector.push(5u64);
        collector.push(6u64);
        assert_eq!(out.count(), 2);
    }

    #[test]
    fn test_count_collector() {
        let mut counter = CountCollector::new();
        Collector::push(&mut counter, 1u64);
        Collector::push(&mut counter, 1u64);
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_vec_collector_keeps_order_of_arrival() {
        let mut set = KeySet::with_config("src", &TableConfig::small()).unwrap();
        set.insert(3u64).unwrap();
        set.insert(7u64).unwrap();
        let mut out: Vec<u64> = Vec::new();
        set.enumerate(&mut out, None);
        out.sort_unstable();
        assert_eq!(out, vec![3, 7]);
    }
}
