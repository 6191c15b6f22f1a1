use std::fmt;
use std::sync::Arc;

use crate::preference::{MergePolicy, PreferenceData};

/// Decides whether a raw rating counts as a hit.
pub type Relevance = Arc<dyn Fn(f64) -> bool + Send + Sync>;

/// Maps a raw rating to the reward fed back to the algorithms.
pub type Reward = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Withheld ground truth of a simulation.
///
/// Immutable once built; parallel simulations share it behind an `Arc`.
pub struct Dataset {
    ratings: PreferenceData<String, String>,
    relevance: Relevance,
    reward: Reward,
    contact: bool,
    num_relevant: usize,
}

impl Dataset {
    pub fn new(ratings: PreferenceData<String, String>, relevance: Relevance, reward: Reward) -> Self {
        let num_relevant = ratings.triples().filter(|&(_, _, v)| relevance(v)).count();
        Self {
            ratings,
            relevance,
            reward,
            contact: false,
            num_relevant,
        }
    }

    /// Binary reward: ratings at or above `threshold` are relevant and worth 1.
    pub fn with_threshold(ratings: PreferenceData<String, String>, threshold: f64) -> Self {
        Self::new(
            ratings,
            Arc::new(move |value| value >= threshold),
            Arc::new(move |value| if value >= threshold { 1.0 } else { 0.0 }),
        )
    }

    /// Builds a thresholded dataset from raw `(user, item, value)` triples.
    pub fn from_triples<T>(triples: T, threshold: f64) -> Self
    where
        T: IntoIterator<Item = (String, String, f64)>,
    {
        Self::with_threshold(
            PreferenceData::from_triples(triples, MergePolicy::Overwrite),
            threshold,
        )
    }

    /// Marks users and items as living in the same key space (people
    /// recommended to people). Nobody is ever recommended to themselves.
    #[must_use]
    pub fn contact(mut self, contact: bool) -> Self {
        self.contact = contact;
        self
    }

    pub fn is_contact(&self) -> bool {
        self.contact
    }

    pub fn ratings(&self) -> &PreferenceData<String, String> {
        &self.ratings
    }

    pub fn num_users(&self) -> usize {
        self.ratings.num_users()
    }

    pub fn num_items(&self) -> usize {
        self.ratings.num_items()
    }

    /// Raw ground-truth value of a pair.
    pub fn preference(&self, uidx: usize, iidx: usize) -> Option<f64> {
        self.ratings.preference(uidx, iidx)
    }

    /// Reward for recommending `iidx` to `uidx`, `None` if the pair is unrated.
    pub fn reward(&self, uidx: usize, iidx: usize) -> Option<f64> {
        self.preference(uidx, iidx).map(|value| (self.reward)(value))
    }

    pub fn is_relevant(&self, uidx: usize, iidx: usize) -> bool {
        self.preference(uidx, iidx)
            .is_some_and(|value| (self.relevance)(value))
    }

    pub fn is_relevant_value(&self, value: f64) -> bool {
        (self.relevance)(value)
    }

    /// Number of relevant pairs in the ground truth.
    pub fn num_relevant(&self) -> usize {
        self.num_relevant
    }

    /// Relevant items of one user.
    pub fn relevant_items(&self, uidx: usize) -> impl Iterator<Item = usize> + '_ {
        self.ratings
            .user_prefs(uidx)
            .iter()
            .filter(|pref| (self.relevance)(pref.value))
            .map(|pref| pref.idx)
    }

    /// The user index sharing the key of item `iidx`.
    pub fn item_as_user(&self, iidx: usize) -> Option<usize> {
        let key = self.ratings.item_index().key(iidx)?;
        self.ratings.user_index().idx(key)
    }

    /// The item index sharing the key of user `uidx`.
    pub fn user_as_item(&self, uidx: usize) -> Option<usize> {
        let key = self.ratings.user_index().key(uidx)?;
        self.ratings.item_index().idx(key)
    }

    /// Every item that may be recommended to `uidx` in a fresh run.
    pub fn candidates(&self, uidx: usize) -> Vec<usize> {
        let own = if self.contact {
            self.user_as_item(uidx)
        } else {
            None
        };
        (0..self.num_items())
            .filter(|&iidx| Some(iidx) != own)
            .collect()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("num_users", &self.num_users())
            .field("num_items", &self.num_items())
            .field("num_preferences", &self.ratings.num_preferences())
            .field("num_relevant", &self.num_relevant)
            .field("contact", &self.contact)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(raw: &[(&str, &str, f64)]) -> Vec<(String, String, f64)> {
        raw.iter()
            .map(|&(u, i, v)| (u.to_string(), i.to_string(), v))
            .collect()
    }

    #[test]
    fn test_threshold_reward_and_relevance() {
        let dataset = Dataset::from_triples(
            triples(&[("u0", "i0", 5.0), ("u0", "i1", 2.0), ("u1", "i1", 4.0)]),
            4.0,
        );
        assert_eq!(dataset.num_relevant(), 2);
        assert_eq!(dataset.reward(0, 0), Some(1.0));
        assert_eq!(dataset.reward(0, 1), Some(0.0));
        assert_eq!(dataset.reward(1, 0), None);
        assert!(dataset.is_relevant(1, 1));
        assert!(!dataset.is_relevant(0, 1));
        assert_eq!(dataset.relevant_items(0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(dataset.candidates(0), vec![0, 1]);
    }

    #[test]
    fn test_contact_mode_maps_shared_keys() {
        let dataset = Dataset::from_triples(
            triples(&[("ann", "bob", 1.0), ("bob", "ann", 1.0), ("bob", "cid", 1.0)]),
            1.0,
        )
        .contact(true);

        // users: ann=0 bob=1, items: bob=0 ann=1 cid=2
        assert_eq!(dataset.user_as_item(0), Some(1));
        assert_eq!(dataset.item_as_user(0), Some(1));
        assert_eq!(dataset.item_as_user(2), None);
        assert_eq!(dataset.candidates(0), vec![0, 2]);
        assert_eq!(dataset.candidates(1), vec![1, 2]);
    }
}
