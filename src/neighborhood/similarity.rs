//! Incrementally updateable user-user similarity.
//!
//! The similarity keeps, per user, the squared norm of its rating vector and
//! the dot products with every user it shares an item with. A single rating
//! change only touches the norm of its user and the dot products with the
//! users who rated the same item, and the result is exactly what a full
//! recomputation over the current ratings gives.

use std::collections::BTreeMap;

use crate::preference::DensePreferenceData;

/// Similarity between elements that can follow single-rating changes.
pub trait UpdateableSimilarity: Send {
    /// Cold start over `num_elems` elements: every similarity is zero.
    fn initialize_empty(&mut self, num_elems: usize);

    /// Bulk computation from a snapshot of the ratings (users as elements).
    fn initialize(&mut self, data: &DensePreferenceData);

    /// Adds the contribution of `u_value` (by `uidx`) and `v_value` (by
    /// `vidx`) on item `iidx` to the pair `(uidx, vidx)`.
    fn update(&mut self, uidx: usize, vidx: usize, iidx: usize, u_value: f64, v_value: f64);

    /// Removes a contribution previously added with `update`.
    fn update_del(&mut self, uidx: usize, vidx: usize, iidx: usize, u_value: f64, v_value: f64);

    /// Adds a rating value to the norm accumulator of `uidx`.
    fn update_norm(&mut self, uidx: usize, value: f64);

    /// Removes a rating value from the norm accumulator of `uidx`.
    fn update_norm_del(&mut self, uidx: usize, old_value: f64);

    /// Similarity of a pair, zero when they share nothing.
    fn similarity(&self, uidx: usize, vidx: usize) -> f64;

    /// Elements with non-zero similarity to `uidx`, most similar first.
    fn similar_elems(&self, uidx: usize) -> Vec<(usize, f64)>;
}

/// Cosine similarity with an asymmetry exponent.
///
/// `sim(u, v) = dot(u, v) / (|u|^(2 alpha) * |v|^(2 (1 - alpha)))`; `alpha = 0.5`
/// is the usual symmetric cosine.
#[derive(Clone, Debug)]
pub struct VectorCosineSimilarity {
    alpha: f64,
    norms: Vec<f64>,
    dots: Vec<BTreeMap<usize, f64>>,
}

impl VectorCosineSimilarity {
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!((0.0..=1.0).contains(&alpha), "alpha must be between 0 and 1");
        Self {
            alpha,
            norms: Vec::new(),
            dots: Vec::new(),
        }
    }

    /// Symmetric cosine similarity.
    #[must_use]
    pub fn cosine() -> Self {
        Self::new(0.5)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Squared norm accumulated for `uidx`.
    pub fn squared_norm(&self, uidx: usize) -> f64 {
        self.norms.get(uidx).copied().unwrap_or(0.0)
    }

    fn ensure(&mut self, uidx: usize) {
        if uidx >= self.norms.len() {
            self.norms.resize(uidx + 1, 0.0);
            self.dots.resize_with(uidx + 1, BTreeMap::new);
        }
    }

    fn add_dot(&mut self, uidx: usize, vidx: usize, delta: f64) {
        if uidx == vidx {
            return;
        }
        self.ensure(uidx.max(vidx));
        for (a, b) in [(uidx, vidx), (vidx, uidx)] {
            let entry = self.dots[a].entry(b).or_insert(0.0);
            *entry += delta;
            if *entry == 0.0 {
                self.dots[a].remove(&b);
            }
        }
    }

    fn score(&self, uidx: usize, vidx: usize, dot: f64) -> f64 {
        let nu = self.squared_norm(uidx);
        let nv = self.squared_norm(vidx);
        if nu <= 0.0 || nv <= 0.0 {
            return 0.0;
        }
        dot / (nu.powf(self.alpha) * nv.powf(1.0 - self.alpha))
    }
}

impl Default for VectorCosineSimilarity {
    fn default() -> Self {
        Self::cosine()
    }
}

impl UpdateableSimilarity for VectorCosineSimilarity {
    fn initialize_empty(&mut self, num_elems: usize) {
        self.norms = vec![0.0; num_elems];
        self.dots = vec![BTreeMap::new(); num_elems];
    }

    fn initialize(&mut self, data: &DensePreferenceData) {
        let num_users = data.num_users();
        self.initialize_empty(num_users);

        let mut accumulator = RowAccumulator::new(num_users);
        for uidx in 0..num_users {
            for pref in data.user_prefs(uidx) {
                self.norms[uidx] += pref.value * pref.value;
                for other in data.item_prefs(pref.idx) {
                    if other.idx != uidx {
                        accumulator.add_to(other.idx, pref.value * other.value);
                    }
                }
            }
            for (vidx, dot) in accumulator.drain() {
                if dot != 0.0 {
                    self.dots[uidx].insert(vidx, dot);
                }
            }
        }
    }

    fn update(&mut self, uidx: usize, vidx: usize, _iidx: usize, u_value: f64, v_value: f64) {
        self.add_dot(uidx, vidx, u_value * v_value);
    }

    fn update_del(&mut self, uidx: usize, vidx: usize, _iidx: usize, u_value: f64, v_value: f64) {
        self.add_dot(uidx, vidx, -u_value * v_value);
    }

    fn update_norm(&mut self, uidx: usize, value: f64) {
        self.ensure(uidx);
        self.norms[uidx] += value * value;
    }

    fn update_norm_del(&mut self, uidx: usize, old_value: f64) {
        self.ensure(uidx);
        self.norms[uidx] -= old_value * old_value;
        if self.norms[uidx] < 0.0 {
            self.norms[uidx] = 0.0;
        }
    }

    fn similarity(&self, uidx: usize, vidx: usize) -> f64 {
        self.dots
            .get(uidx)
            .and_then(|row| row.get(&vidx))
            .map_or(0.0, |&dot| self.score(uidx, vidx, dot))
    }

    fn similar_elems(&self, uidx: usize) -> Vec<(usize, f64)> {
        let Some(row) = self.dots.get(uidx) else {
            return Vec::new();
        };
        let mut similar: Vec<(usize, f64)> = row
            .iter()
            .map(|(&vidx, &dot)| (vidx, self.score(uidx, vidx, dot)))
            .filter(|(_, sim)| *sim != 0.0)
            .collect();
        similar.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        similar
    }
}

const NOT_OCCUPIED: usize = usize::MAX;

/// Dense accumulator that remembers which slots it touched, so clearing it
/// costs only the number of non-zeros.
pub(crate) struct RowAccumulator {
    sums: Vec<f64>,
    next: Vec<usize>,
    head: usize,
}

impl RowAccumulator {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            sums: vec![0.0; size],
            next: vec![NOT_OCCUPIED; size],
            head: NOT_OCCUPIED,
        }
    }

    pub(crate) fn add_to(&mut self, slot: usize, value: f64) {
        if slot >= self.sums.len() {
            self.sums.resize(slot + 1, 0.0);
            self.next.resize(slot + 1, NOT_OCCUPIED);
        }
        self.sums[slot] += value;
        if self.next[slot] == NOT_OCCUPIED {
            // the list tail points at itself so that it still counts as occupied
            self.next[slot] = if self.head == NOT_OCCUPIED {
                slot
            } else {
                self.head
            };
            self.head = slot;
        }
    }

    pub(crate) fn get(&self, slot: usize) -> f64 {
        self.sums.get(slot).copied().unwrap_or(0.0)
    }

    /// Returns the touched slots with their sums and resets the accumulator.
    pub(crate) fn drain(&mut self) -> Vec<(usize, f64)> {
        let mut entries = Vec::new();
        let mut slot = self.head;
        while slot != NOT_OCCUPIED {
            let following = self.next[slot];
            entries.push((slot, self.sums[slot]));
            self.sums[slot] = 0.0;
            self.next[slot] = NOT_OCCUPIED;
            slot = if following == slot { NOT_OCCUPIED } else { following };
        }
        self.head = NOT_OCCUPIED;
        entries.sort_by_key(|(slot, _)| *slot);
        entries
    }
}
