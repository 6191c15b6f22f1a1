//! Bidirectional mapping between opaque identifiers and dense indices.
//!
//! Users and items are referred to by their external keys only at the
//! boundaries of the harness. Everything inside works with `uidx` / `iidx`,
//! zero-based integers handed out in first-seen order.

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexSet;

/// Append-only index over keys of type `K`.
///
/// Indices are never reused: removing a key only hides it, and adding it back
/// revives its original index.
#[derive(Clone, Debug)]
pub struct FastIndex<K> {
    keys: IndexSet<K>,
    removed: HashSet<usize>,
}

impl<K> Default for FastIndex<K> {
    fn default() -> Self {
        Self {
            keys: IndexSet::new(),
            removed: HashSet::new(),
        }
    }
}

impl<K> FastIndex<K>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key and returns its index. Idempotent for known keys.
    pub fn add(&mut self, key: K) -> usize {
        let (idx, _) = self.keys.insert_full(key);
        self.removed.remove(&idx);
        idx
    }

    /// Hides a key. Its index stays allocated.
    pub fn remove(&mut self, key: &K) -> Option<usize> {
        let idx = self.keys.get_index_of(key)?;
        if self.removed.insert(idx) {
            Some(idx)
        } else {
            None
        }
    }

    /// Index of a key, if present.
    pub fn idx(&self, key: &K) -> Option<usize> {
        self.keys
            .get_index_of(key)
            .filter(|idx| !self.removed.contains(idx))
    }

    /// Key stored at an index, if present.
    pub fn key(&self, idx: usize) -> Option<&K> {
        if self.removed.contains(&idx) {
            return None;
        }
        self.keys.get_index(idx)
    }

    /// Whether the key is currently indexed.
    pub fn contains(&self, key: &K) -> bool {
        self.idx(key).is_some()
    }

    /// Number of allocated indices, including hidden ones.
    ///
    /// This is the size the dense per-index arrays must have.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over the live `(index, key)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &K)> {
        self.keys
            .iter()
            .enumerate()
            .filter(move |(idx, _)| !self.removed.contains(idx))
    }
}

impl<K> FromIterator<K> for FastIndex<K>
where
    K: Clone + Eq + Hash,
{
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let mut index = FastIndex::new();
        for key in iter {
            index.add(key);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let index: FastIndex<&str> = ["carol", "alice", "bob", "alice"].into_iter().collect();
        assert_eq!(index.len(), 3);
        assert_eq!(index.idx(&"carol"), Some(0));
        assert_eq!(index.idx(&"alice"), Some(1));
        assert_eq!(index.idx(&"bob"), Some(2));
        assert_eq!(index.key(2), Some(&"bob"));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut index = FastIndex::new();
        assert_eq!(index.add(10u32), 0);
        assert_eq!(index.add(20u32), 1);
        assert_eq!(index.add(10u32), 0);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_removed_indices_are_not_reused() {
        let mut index = FastIndex::new();
        index.add("a");
        index.add("b");
        assert_eq!(index.remove(&"a"), Some(0));
        assert_eq!(index.remove(&"a"), None);
        assert_eq!(index.idx(&"a"), None);
        assert_eq!(index.key(0), None);

        assert_eq!(index.add("c"), 2);
        assert_eq!(index.add("a"), 0);
        assert_eq!(index.len(), 3);

        let live: Vec<_> = index.iter().map(|(idx, _)| idx).collect();
        assert_eq!(live, vec![0, 1, 2]);
    }
}
