//! Incrementally updateable sparse preference store.
//!
//! Ratings are kept twice: once in a row per user (sorted by item index) and
//! once in a column per item (sorted by user index). Both views are updated
//! together so that every rating can be looked up by binary search from
//! either side.

use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::index::FastIndex;

/// A single `(user, item, value)` observation over dense indices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rating {
    pub uidx: usize,
    pub iidx: usize,
    pub value: f64,
}

impl Rating {
    pub fn new(uidx: usize, iidx: usize, value: f64) -> Self {
        Self { uidx, iidx, value }
    }
}

/// A rating as seen from one side of the store: the partner index and value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdxPref {
    /// Item index in a user row, user index in an item column
    pub idx: usize,
    pub value: f64,
}

impl IdxPref {
    pub fn new(idx: usize, value: f64) -> Self {
        Self { idx, value }
    }
}

/// How an incoming rating is combined with an existing one for the same pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The first value written wins.
    KeepOld,
    /// The latest value wins.
    #[default]
    Overwrite,
    /// The largest value seen wins.
    KeepMax,
}

impl MergePolicy {
    /// Whether writing `new` over `old` changes the stored value.
    pub fn changes(self, old: f64, new: f64) -> bool {
        match self {
            MergePolicy::KeepOld => false,
            MergePolicy::Overwrite => old != new,
            MergePolicy::KeepMax => new > old,
        }
    }

    /// The value stored after writing `new` over `old`.
    pub fn merge(self, old: f64, new: f64) -> f64 {
        match self {
            MergePolicy::KeepOld => old,
            MergePolicy::Overwrite => new,
            MergePolicy::KeepMax => old.max(new),
        }
    }
}

/// Sparse rating matrix with dual row/column indexing.
///
/// Rows are allocated lazily: a user or item with no ratings has no backing
/// vector. Out-of-range indices passed to the mutators are ignored.
#[derive(Clone, Debug)]
pub struct PreferenceData<U, I> {
    users: FastIndex<U>,
    items: FastIndex<I>,
    rows_by_user: Vec<Option<Vec<IdxPref>>>,
    rows_by_item: Vec<Option<Vec<IdxPref>>>,
    num_preferences: usize,
    merge: MergePolicy,
}

/// Store over dense integer keys, used by algorithms that only ever see indices.
pub type DensePreferenceData = PreferenceData<usize, usize>;

impl<U, I> PreferenceData<U, I>
where
    U: Clone + Eq + Hash,
    I: Clone + Eq + Hash,
{
    /// Creates an empty store over the given indexes.
    pub fn new(users: FastIndex<U>, items: FastIndex<I>, merge: MergePolicy) -> Self {
        let rows_by_user = vec![None; users.len()];
        let rows_by_item = vec![None; items.len()];
        Self {
            users,
            items,
            rows_by_user,
            rows_by_item,
            num_preferences: 0,
            merge,
        }
    }

    /// Bulk-loads a store from `(user, item, value)` triples.
    ///
    /// Unknown users and items are indexed in first-seen order; repeated pairs
    /// go through the merge policy.
    pub fn from_triples<T>(triples: T, merge: MergePolicy) -> Self
    where
        T: IntoIterator<Item = (U, I, f64)>,
    {
        let mut data = Self::new(FastIndex::new(), FastIndex::new(), merge);
        for (user, item, value) in triples {
            let uidx = data.add_user(user);
            let iidx = data.add_item(item);
            data.update_rating(uidx, iidx, value);
        }
        data
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.merge
    }

    pub fn user_index(&self) -> &FastIndex<U> {
        &self.users
    }

    pub fn item_index(&self) -> &FastIndex<I> {
        &self.items
    }

    /// Number of indexed users.
    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    /// Number of indexed items.
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// Total number of stored ratings.
    pub fn num_preferences(&self) -> usize {
        self.num_preferences
    }

    /// Number of items rated by `uidx`; 0 if the index is absent.
    pub fn num_items_of(&self, uidx: usize) -> usize {
        self.user_prefs(uidx).len()
    }

    /// Number of users who rated `iidx`; 0 if the index is absent.
    pub fn num_users_of(&self, iidx: usize) -> usize {
        self.item_prefs(iidx).len()
    }

    /// Ratings of a user, sorted by item index.
    pub fn user_prefs(&self, uidx: usize) -> &[IdxPref] {
        match self.rows_by_user.get(uidx) {
            Some(Some(row)) => row,
            _ => &[],
        }
    }

    /// Ratings of an item, sorted by user index.
    pub fn item_prefs(&self, iidx: usize) -> &[IdxPref] {
        match self.rows_by_item.get(iidx) {
            Some(Some(column)) => column,
            _ => &[],
        }
    }

    /// Users with at least one rating, in index order.
    pub fn users_with_preferences(&self) -> impl Iterator<Item = usize> + '_ {
        non_empty(&self.rows_by_user)
    }

    /// Items with at least one rating, in index order.
    pub fn items_with_preferences(&self) -> impl Iterator<Item = usize> + '_ {
        non_empty(&self.rows_by_item)
    }

    /// Iterates over every stored rating as `(uidx, iidx, value)`.
    pub fn triples(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.users_with_preferences().flat_map(move |uidx| {
            self.user_prefs(uidx)
                .iter()
                .map(move |pref| (uidx, pref.idx, pref.value))
        })
    }

    /// Looks up a single rating.
    pub fn preference(&self, uidx: usize, iidx: usize) -> Option<f64> {
        let row = self.user_prefs(uidx);
        row.binary_search_by(|pref| pref.idx.cmp(&iidx))
            .ok()
            .map(|pos| row[pos].value)
    }

    /// Indexes a user, growing the row array for a new index.
    pub fn add_user(&mut self, user: U) -> usize {
        let uidx = self.users.add(user);
        if uidx == self.rows_by_user.len() {
            self.rows_by_user.push(None);
        }
        uidx
    }

    /// Indexes an item, growing the column array for a new index.
    pub fn add_item(&mut self, item: I) -> usize {
        let iidx = self.items.add(item);
        if iidx == self.rows_by_item.len() {
            self.rows_by_item.push(None);
        }
        iidx
    }

    /// Inserts or merges a rating.
    ///
    /// Returns `true` if the store changed. Existing pairs only change when
    /// the merge policy says so; the mirrored column entry then receives the
    /// same merged value.
    pub fn update_rating(&mut self, uidx: usize, iidx: usize, value: f64) -> bool {
        if uidx >= self.rows_by_user.len() || iidx >= self.rows_by_item.len() {
            return false;
        }

        let merge = self.merge;
        let row = self.rows_by_user[uidx].get_or_insert_with(Vec::new);
        match row.binary_search_by(|pref| pref.idx.cmp(&iidx)) {
            Ok(pos) => {
                let old = row[pos].value;
                if !merge.changes(old, value) {
                    return false;
                }
                let merged = merge.merge(old, value);
                row[pos].value = merged;

                let column = self.rows_by_item[iidx].get_or_insert_with(Vec::new);
                match column.binary_search_by(|pref| pref.idx.cmp(&uidx)) {
                    Ok(cpos) => column[cpos].value = merged,
                    Err(cpos) => column.insert(cpos, IdxPref::new(uidx, merged)),
                }
                true
            }
            Err(pos) => {
                row.insert(pos, IdxPref::new(iidx, value));
                let column = self.rows_by_item[iidx].get_or_insert_with(Vec::new);
                if let Err(cpos) = column.binary_search_by(|pref| pref.idx.cmp(&uidx)) {
                    column.insert(cpos, IdxPref::new(uidx, value));
                }
                self.num_preferences += 1;
                true
            }
        }
    }

    /// Removes a rating from both views, returning the removed value.
    pub fn update_delete(&mut self, uidx: usize, iidx: usize) -> Option<f64> {
        let removed = match self.rows_by_user.get_mut(uidx) {
            Some(Some(row)) => row
                .binary_search_by(|pref| pref.idx.cmp(&iidx))
                .ok()
                .map(|pos| row.remove(pos).value),
            _ => None,
        };

        if let Some(Some(column)) = self.rows_by_item.get_mut(iidx) {
            if let Ok(pos) = column.binary_search_by(|pref| pref.idx.cmp(&uidx)) {
                column.remove(pos);
            }
        }

        if removed.is_some() {
            self.num_preferences -= 1;
        }
        removed
    }

    /// Drops every rating but keeps the user and item indexes.
    pub fn clear(&mut self) {
        self.rows_by_user.iter_mut().for_each(|row| *row = None);
        self.rows_by_item.iter_mut().for_each(|column| *column = None);
        self.num_preferences = 0;
    }
}

impl DensePreferenceData {
    /// Creates an empty store over `0..num_users` x `0..num_items`.
    pub fn dense(num_users: usize, num_items: usize, merge: MergePolicy) -> Self {
        Self::new(
            (0..num_users).collect(),
            (0..num_items).collect(),
            merge,
        )
    }
}

fn non_empty(rows: &[Option<Vec<IdxPref>>]) -> impl Iterator<Item = usize> + '_ {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.as_ref().is_some_and(|r| !r.is_empty()))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn is_sorted(prefs: &[IdxPref]) -> bool {
        prefs.windows(2).all(|w| w[0].idx < w[1].idx)
    }

    fn assert_consistent(data: &DensePreferenceData) {
        let mut count = 0;
        for uidx in 0..data.num_users() {
            let row = data.user_prefs(uidx);
            assert!(is_sorted(row), "row {uidx} not sorted");
            for pref in row {
                let column = data.item_prefs(pref.idx);
                let mirrored = column.iter().find(|p| p.idx == uidx);
                assert_eq!(mirrored.map(|p| p.value), Some(pref.value));
                count += 1;
            }
        }
        for iidx in 0..data.num_items() {
            let column = data.item_prefs(iidx);
            assert!(is_sorted(column), "column {iidx} not sorted");
            for pref in column {
                assert_eq!(data.preference(pref.idx, iidx), Some(pref.value));
            }
        }
        assert_eq!(data.num_preferences(), count);
    }

    #[test]
    fn test_insert_keeps_rows_sorted() {
        let mut data = DensePreferenceData::dense(2, 5, MergePolicy::Overwrite);
        assert!(data.update_rating(0, 3, 1.0));
        assert!(data.update_rating(0, 1, 2.0));
        assert!(data.update_rating(0, 4, 3.0));
        assert!(data.update_rating(1, 1, 4.0));

        let items: Vec<_> = data.user_prefs(0).iter().map(|p| p.idx).collect();
        assert_eq!(items, vec![1, 3, 4]);
        let users: Vec<_> = data.item_prefs(1).iter().map(|p| p.idx).collect();
        assert_eq!(users, vec![0, 1]);
        assert_eq!(data.num_preferences(), 4);
        assert_eq!(data.num_items_of(0), 3);
        assert_eq!(data.num_users_of(1), 2);
        assert_consistent(&data);
    }

    #[test]
    fn test_merge_policies() {
        let mut keep_old = DensePreferenceData::dense(1, 1, MergePolicy::KeepOld);
        keep_old.update_rating(0, 0, 2.0);
        assert!(!keep_old.update_rating(0, 0, 5.0));
        assert_eq!(keep_old.preference(0, 0), Some(2.0));

        let mut overwrite = DensePreferenceData::dense(1, 1, MergePolicy::Overwrite);
        overwrite.update_rating(0, 0, 2.0);
        assert!(!overwrite.update_rating(0, 0, 2.0));
        assert!(overwrite.update_rating(0, 0, 1.0));
        assert_eq!(overwrite.preference(0, 0), Some(1.0));
        assert_eq!(overwrite.item_prefs(0)[0].value, 1.0);

        let mut keep_max = DensePreferenceData::dense(1, 1, MergePolicy::KeepMax);
        keep_max.update_rating(0, 0, 2.0);
        assert!(!keep_max.update_rating(0, 0, 1.0));
        assert!(keep_max.update_rating(0, 0, 3.0));
        assert_eq!(keep_max.preference(0, 0), Some(3.0));
        assert_eq!(keep_max.num_preferences(), 1);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut data = DensePreferenceData::dense(2, 2, MergePolicy::Overwrite);
        assert!(!data.update_rating(5, 0, 1.0));
        assert!(!data.update_rating(0, 7, 1.0));
        assert_eq!(data.update_delete(9, 9), None);
        assert_eq!(data.preference(9, 0), None);
        assert_eq!(data.num_items_of(42), 0);
        assert_eq!(data.num_users_of(42), 0);
        assert_eq!(data.num_preferences(), 0);
    }

    #[test]
    fn test_delete() {
        let mut data = DensePreferenceData::dense(2, 2, MergePolicy::Overwrite);
        data.update_rating(0, 0, 1.0);
        data.update_rating(1, 0, 2.0);
        assert_eq!(data.update_delete(0, 0), Some(1.0));
        assert_eq!(data.update_delete(0, 0), None);
        assert_eq!(data.num_preferences(), 1);
        assert_eq!(data.preference(1, 0), Some(2.0));
        assert_consistent(&data);
    }

    #[test]
    fn test_lazy_growth_and_clear() {
        let mut data: PreferenceData<&str, &str> =
            PreferenceData::new(FastIndex::new(), FastIndex::new(), MergePolicy::Overwrite);
        let alice = data.add_user("alice");
        let book = data.add_item("book");
        assert_eq!(data.add_user("alice"), alice);
        assert!(data.update_rating(alice, book, 4.0));

        let bob = data.add_user("bob");
        assert_eq!(bob, 1);
        assert_eq!(data.num_items_of(bob), 0);

        data.clear();
        assert_eq!(data.num_preferences(), 0);
        assert_eq!(data.preference(alice, book), None);
        assert_eq!(data.user_index().idx(&"bob"), Some(1));
        assert_eq!(data.users_with_preferences().count(), 0);
    }

    #[test]
    fn test_from_triples() {
        let data = PreferenceData::from_triples(
            vec![("u1", "a", 1.0), ("u2", "b", 1.0), ("u1", "b", 0.0), ("u1", "a", 3.0)],
            MergePolicy::KeepMax,
        );
        assert_eq!(data.num_users(), 2);
        assert_eq!(data.num_items(), 2);
        assert_eq!(data.num_preferences(), 3);
        assert_eq!(data.preference(0, 0), Some(3.0));
        let triples: Vec<_> = data.triples().collect();
        assert_eq!(triples, vec![(0, 0, 3.0), (0, 1, 0.0), (1, 1, 1.0)]);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Rate(usize, usize, f64),
        Delete(usize, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8, 0usize..8, 0.0f64..5.0).prop_map(|(u, i, v)| Op::Rate(u, i, v)),
            (0usize..8, 0usize..8).prop_map(|(u, i)| Op::Delete(u, i)),
        ]
    }

    proptest! {
        #[test]
        fn prop_row_and_column_views_agree(ops in proptest::collection::vec(op(), 0..200)) {
            // Indices up to 7 on a 6x6 store also exercise the out-of-range path.
            let mut data = DensePreferenceData::dense(6, 6, MergePolicy::KeepMax);
            for op in ops {
                match op {
                    Op::Rate(u, i, v) => { data.update_rating(u, i, v); }
                    Op::Delete(u, i) => { data.update_delete(u, i); }
                }
                assert_consistent(&data);
            }
        }
    }
}
