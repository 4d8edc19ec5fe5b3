use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
    mem,
};

/// Bounded map that evicts the least recently used entries.
///
/// Recency is tracked by a monotonic counter, so promoting and evicting an entry are both
/// logarithmic in the number of entries.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    counter: u64,
    entries: HashMap<K, Slot<V>>,
    order: BTreeMap<u64, K>,
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    last_used: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            counter: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    /// Returns the value for `key` and marks it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.tick();
        let slot = self.entries.get_mut(key)?;
        let previous = mem::replace(&mut slot.last_used, now);
        if let Some(key) = self.order.remove(&previous) {
            self.order.insert(now, key);
        }
        Some(&slot.value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces the value for `key` and returns the entries evicted to stay within
    /// capacity, least recently used first.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        let now = self.tick();

        if let Some(slot) = self.entries.get_mut(&key) {
            let previous = mem::replace(&mut slot.last_used, now);
            slot.value = value;
            self.order.remove(&previous);
            self.order.insert(now, key);
            return vec![];
        }

        self.order.insert(now, key.clone());
        self.entries.insert(
            key,
            Slot {
                value,
                last_used: now,
            },
        );

        let mut evicted = vec![];
        while self.entries.len() > self.capacity {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            if let Some(slot) = self.entries.remove(&key) {
                evicted.push((key, slot.value));
            }
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys ordered from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.values().rev()
    }

    fn tick(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn keys(cache: &LruCache<u32, String>) -> Vec<u32> {
        cache.keys().copied().collect()
    }

    #[rstest]
    #[case(1, 0)]
    #[case(1, 1)]
    #[case(3, 5)]
    #[case(10, 1)]
    #[case(10, 25)]
    fn test_insert_beyond_capacity(#[case] capacity: usize, #[case] additional: usize) {
        let mut cache = LruCache::new(capacity);
        let mut evicted = vec![];

        for i in 0..capacity + additional {
            let key = u32::try_from(i).unwrap();
            evicted.extend(cache.insert(key, i.to_string()).into_iter().map(|(k, _)| k));
            assert!(cache.len() <= capacity);
        }

        assert_eq!(cache.len(), capacity);
        assert_eq!(
            evicted,
            (0..additional)
                .map(|i| u32::try_from(i).unwrap())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_get_promotes_entry() {
        let mut cache = LruCache::new(3);
        cache.insert(1, "a".to_string());
        cache.insert(2, "b".to_string());
        cache.insert(3, "c".to_string());

        assert_eq!(cache.get(&1), Some(&"a".to_string()));
        assert_eq!(keys(&cache), vec![1, 3, 2]);

        let evicted = cache.insert(4, "d".to_string());

        assert_eq!(evicted, vec![(2, "b".to_string())]);
        assert_eq!(keys(&cache), vec![4, 1, 3]);
        assert!(!cache.contains_key(&2));
    }

    #[test]
    fn test_get_missing() {
        let mut cache = LruCache::<u32, String>::new(2);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_insert_replaces_and_promotes() {
        let mut cache = LruCache::<u32, String>::new(2);
        cache.insert(1, "a".to_string());
        cache.insert(2, "b".to_string());

        assert_eq!(cache.insert(1, "A".to_string()), Vec::<(u32, String)>::new());
        assert_eq!(cache.len(), 2);
        assert_eq!(keys(&cache), vec![1, 2]);
        assert_eq!(cache.get(&1), Some(&"A".to_string()));
    }

    #[test]
    fn test_clear() {
        let mut cache = LruCache::<u32, String>::new(2);
        cache.insert(1, "a".to_string());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(keys(&cache), Vec::<u32>::new());
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn test_zero_capacity() {
        let mut cache = LruCache::new(0);
        cache.insert(1, "a".to_string());
        cache.insert(2, "b".to_string());
        assert_eq!(cache.capacity(), 1);
        assert_eq!(keys(&cache), vec![2]);
    }
}
