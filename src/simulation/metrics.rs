use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Dataset;

/// A metric accumulated over the iterations of one run.
pub trait CumulativeMetric: Send {
    /// Forgets everything seen so far.
    fn reset(&mut self);

    /// Prepares for a run whose warm-up consumed `training`.
    fn initialize(&mut self, training: &[(usize, usize)], not_reciprocal: bool);

    /// Records one dispatched pair.
    fn update(&mut self, uidx: usize, iidx: usize);

    fn compute(&self) -> f64;
}

/// Share of the relevant pairs outside the warm-up retrieved so far.
///
/// When reciprocal pairs are consumed together, a pair and its reverse count
/// as a single relevant pair.
pub struct Recall {
    dataset: Arc<Dataset>,
    not_reciprocal: bool,
    excluded: HashSet<(usize, usize)>,
    total: usize,
    hits: usize,
}

impl Recall {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            not_reciprocal: false,
            excluded: HashSet::new(),
            total: 0,
            hits: 0,
        }
    }

    fn reverse(&self, uidx: usize, iidx: usize) -> Option<(usize, usize)> {
        let vidx = self.dataset.item_as_user(iidx)?;
        let jidx = self.dataset.user_as_item(uidx)?;
        Some((vidx, jidx))
    }

    /// The pair that stands for `(uidx, iidx)` in the count.
    fn canonical(&self, uidx: usize, iidx: usize) -> (usize, usize) {
        if !self.not_reciprocal {
            return (uidx, iidx);
        }
        match self.reverse(uidx, iidx) {
            Some(rev) if self.dataset.is_relevant(rev.0, rev.1) => rev.min((uidx, iidx)),
            _ => (uidx, iidx),
        }
    }
}

impl CumulativeMetric for Recall {
    fn reset(&mut self) {
        self.excluded.clear();
        self.total = 0;
        self.hits = 0;
    }

    fn initialize(&mut self, training: &[(usize, usize)], not_reciprocal: bool) {
        self.reset();
        self.not_reciprocal = not_reciprocal;
        self.excluded = training
            .iter()
            .map(|&(uidx, iidx)| self.canonical(uidx, iidx))
            .collect();

        let relevant: HashSet<(usize, usize)> = self
            .dataset
            .ratings()
            .triples()
            .filter(|&(_, _, value)| self.dataset.is_relevant_value(value))
            .map(|(uidx, iidx, _)| self.canonical(uidx, iidx))
            .collect();
        self.total = relevant.difference(&self.excluded).count();
    }

    fn update(&mut self, uidx: usize, iidx: usize) {
        if !self.dataset.is_relevant(uidx, iidx) {
            return;
        }
        let pair = self.canonical(uidx, iidx);
        // a reciprocal pair is only counted once
        if self.excluded.insert(pair) {
            self.hits += 1;
        }
    }

    fn compute(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }
}

/// Gini index of how often each item was recommended.
///
/// 0 when every item was shown equally often, 1 when a single item took all
/// recommendations.
///
/// Counts are kept in ascending order as they grow: a count rising by one
/// only has to move past the other items sharing its old value, so an update
/// costs one binary search and `compute` is constant time.
#[derive(Clone, Debug)]
pub struct Gini {
    /// Counts in ascending order.
    sorted: Vec<usize>,
    /// Position of each item in `sorted`.
    position: Vec<usize>,
    /// Item at each position of `sorted`.
    item_at: Vec<usize>,
    /// `sum_k (2k - n + 1) * sorted[k]`
    weighted: i64,
    total: usize,
}

impl Gini {
    pub fn new(num_items: usize) -> Self {
        Self {
            sorted: vec![0; num_items],
            position: (0..num_items).collect(),
            item_at: (0..num_items).collect(),
            weighted: 0,
            total: 0,
        }
    }
}

impl CumulativeMetric for Gini {
    fn reset(&mut self) {
        *self = Self::new(self.sorted.len());
    }

    fn initialize(&mut self, _training: &[(usize, usize)], _not_reciprocal: bool) {
        self.reset();
    }

    fn update(&mut self, _uidx: usize, iidx: usize) {
        let Some(&pos) = self.position.get(iidx) else {
            return;
        };
        let count = self.sorted[pos];
        // last slot holding the same count
        let last = self.sorted.partition_point(|&c| c <= count) - 1;
        let other = self.item_at[last];
        self.item_at.swap(pos, last);
        self.position[iidx] = last;
        self.position[other] = pos;

        self.sorted[last] += 1;
        let n = self.sorted.len() as i64;
        self.weighted += 2 * last as i64 - n + 1;
        self.total += 1;
    }

    fn compute(&self) -> f64 {
        let n = self.sorted.len();
        if n < 2 || self.total == 0 {
            return 0.0;
        }
        self.weighted as f64 / ((n - 1) as f64 * self.total as f64)
    }
}

/// Serialisable choice of metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Recall,
    Gini,
}

impl MetricKind {
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::Recall => "recall",
            MetricKind::Gini => "gini",
        }
    }

    pub fn build(self, dataset: &Arc<Dataset>) -> Box<dyn CumulativeMetric> {
        match self {
            MetricKind::Recall => Box::new(Recall::new(Arc::clone(dataset))),
            MetricKind::Gini => Box::new(Gini::new(dataset.num_items())),
        }
    }
}
