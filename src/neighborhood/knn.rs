use rand::rngs::StdRng;
use rand::SeedableRng;

use super::similarity::{RowAccumulator, UpdateableSimilarity, VectorCosineSimilarity};
use crate::preference::{DensePreferenceData, MergePolicy, Rating};
use crate::recommender::Algorithm;
use crate::untie;

/// Incremental user-based k-nearest-neighbours recommender.
///
/// Keeps its own copy of the feedback seen so far and a similarity that is
/// patched on every rating change. An item is scored for `u` as
/// `sum over the k most similar users v of sim(u, v)^q * r(v, i)`.
pub struct UserKnn<S = VectorCosineSimilarity> {
    data: DensePreferenceData,
    similarity: S,
    k: usize,
    q: f64,
    seed: u64,
    rng: StdRng,
    scores: RowAccumulator,
}

impl UserKnn<VectorCosineSimilarity> {
    /// Cosine kNN with `q = 1`.
    #[must_use]
    pub fn cosine(num_users: usize, num_items: usize, k: usize, seed: u64) -> Self {
        Self::new(num_users, num_items, VectorCosineSimilarity::cosine(), k, 1.0, seed)
    }
}

impl<S: UpdateableSimilarity> UserKnn<S> {
    #[must_use]
    pub fn new(num_users: usize, num_items: usize, similarity: S, k: usize, q: f64, seed: u64) -> Self {
        assert!(k > 0, "k must be greater than 0");
        assert!(q > 0.0, "q must be positive");
        Self {
            data: DensePreferenceData::dense(num_users, num_items, MergePolicy::Overwrite),
            similarity,
            k,
            q,
            seed,
            rng: StdRng::seed_from_u64(seed),
            scores: RowAccumulator::new(num_items),
        }
    }

    pub fn data(&self) -> &DensePreferenceData {
        &self.data
    }

    pub fn similarity(&self) -> &S {
        &self.similarity
    }

    /// The `k` most similar users with a positive similarity.
    pub fn neighbours(&self, uidx: usize) -> Vec<(usize, f64)> {
        self.similarity
            .similar_elems(uidx)
            .into_iter()
            .filter(|&(_, sim)| sim > 0.0)
            .take(self.k)
            .collect()
    }

    /// Writes `(uidx, iidx) = value`, patching the similarity first.
    fn learn(&mut self, uidx: usize, iidx: usize, value: f64) {
        if uidx >= self.data.num_users() || iidx >= self.data.num_items() {
            return;
        }
        if let Some(old) = self.data.preference(uidx, iidx) {
            if old == value {
                return;
            }
            for other in self.data.item_prefs(iidx) {
                self.similarity
                    .update_del(uidx, other.idx, iidx, old, other.value);
            }
            self.similarity.update_norm_del(uidx, old);
            self.data.update_delete(uidx, iidx);
        }

        for other in self.data.item_prefs(iidx) {
            self.similarity.update(uidx, other.idx, iidx, value, other.value);
        }
        self.similarity.update_norm(uidx, value);
        self.data.update_rating(uidx, iidx, value);
    }

    fn scored(&mut self, uidx: usize, available: &[usize]) -> Vec<(usize, f64)> {
        for (vidx, sim) in self.neighbours(uidx) {
            let weight = sim.powf(self.q);
            for pref in self.data.user_prefs(vidx) {
                self.scores.add_to(pref.idx, weight * pref.value);
            }
        }
        let scored = available
            .iter()
            .map(|&iidx| (iidx, self.scores.get(iidx)))
            .collect();
        self.scores.drain();
        scored
    }
}

impl<S: UpdateableSimilarity> Algorithm for UserKnn<S> {
    fn init(&mut self, training: &[Rating]) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.data.clear();
        for rating in training {
            self.data.update_rating(rating.uidx, rating.iidx, rating.value);
        }
        self.similarity.initialize(&self.data);
    }

    fn next(&mut self, uidx: usize, available: &[usize]) -> Option<usize> {
        let scored = self.scored(uidx, available);
        untie::argmax(scored, &mut self.rng)
    }

    fn next_list(&mut self, uidx: usize, available: &[usize], k: usize) -> Vec<usize> {
        let scored = self.scored(uidx, available);
        untie::top_k(scored, k, &mut self.rng)
    }

    fn update(&mut self, uidx: usize, iidx: usize, value: f64) {
        self.learn(uidx, iidx, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_neighbours_drive_scores() {
        let mut knn = UserKnn::cosine(3, 4, 1, 42);
        knn.init(&[
            Rating::new(0, 0, 1.0),
            Rating::new(0, 1, 1.0),
            Rating::new(1, 0, 1.0),
            Rating::new(1, 1, 1.0),
            Rating::new(1, 2, 1.0),
            Rating::new(2, 3, 1.0),
        ]);

        // User 0's only neighbour is user 1, who also liked item 2
        let neighbours = knn.neighbours(0);
        assert_eq!(neighbours.len(), 1);
        assert_eq!(neighbours[0].0, 1);
        assert_eq!(knn.next(0, &[2, 3]), Some(2));
    }

    #[test]
    fn test_updates_match_bulk_initialisation() {
        let ratings = [
            Rating::new(0, 0, 1.0),
            Rating::new(1, 0, 1.0),
            Rating::new(1, 1, 1.0),
            Rating::new(2, 1, 1.0),
            Rating::new(0, 1, 0.0),
        ];

        let mut online = UserKnn::cosine(3, 2, 2, 1);
        online.init(&[]);
        for r in &ratings {
            online.update(r.uidx, r.iidx, r.value);
        }
        // Overwrite one rating after the fact
        online.update(1, 0, 0.5);

        let mut batch_ratings = ratings.to_vec();
        batch_ratings[1].value = 0.5;
        let mut batch = UserKnn::cosine(3, 2, 2, 1);
        batch.init(&batch_ratings);

        for u in 0..3 {
            for v in 0..3 {
                assert_abs_diff_eq!(
                    online.similarity().similarity(u, v),
                    batch.similarity().similarity(u, v),
                    epsilon = 1e-12
                );
            }
        }
        assert_eq!(online.data().num_preferences(), 5);
    }

    #[test]
    fn test_cold_start_and_empty() {
        let mut knn = UserKnn::cosine(2, 3, 5, 7);
        knn.init(&[]);
        assert!(knn.next(0, &[0, 1, 2]).is_some());
        assert_eq!(knn.next(0, &[]), None);
        assert_eq!(knn.next_list(0, &[0, 1, 2], 2).len(), 2);
    }
}
