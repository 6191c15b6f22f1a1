use std::collections::BTreeMap;

/// Sparse per-item running counts and sums.
///
/// Holds the `(M, B)` pair of the clustering bandits: the estimated weight of
/// an item is `B / (M + 1)`. Iteration is ordered by item index so scores and
/// distances come out the same on every run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightAccumulator {
    entries: BTreeMap<usize, (f64, f64)>,
}

impl WeightAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` observations summing to `sum` for `iidx`.
    pub fn add(&mut self, iidx: usize, count: f64, sum: f64) {
        let entry = self.entries.entry(iidx).or_insert((0.0, 0.0));
        entry.0 += count;
        entry.1 += sum;
    }

    /// Adds every entry of `other`.
    pub fn merge(&mut self, other: &WeightAccumulator) {
        for (&iidx, &(count, sum)) in &other.entries {
            self.add(iidx, count, sum);
        }
    }

    pub fn count(&self, iidx: usize) -> f64 {
        self.entries.get(&iidx).map_or(0.0, |&(count, _)| count)
    }

    pub fn sum(&self, iidx: usize) -> f64 {
        self.entries.get(&iidx).map_or(0.0, |&(_, sum)| sum)
    }

    pub fn weight(&self, iidx: usize) -> f64 {
        self.entries
            .get(&iidx)
            .map_or(0.0, |&(count, sum)| sum / (count + 1.0))
    }

    /// `(iidx, weight)` for every touched item, by item index.
    pub fn weights(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries
            .iter()
            .map(|(&iidx, &(count, sum))| (iidx, sum / (count + 1.0)))
    }

    /// Like [`weights`](Self::weights) but only over items accepted by `keep`.
    pub fn weights_where<'a, F>(&'a self, keep: F) -> impl Iterator<Item = (usize, f64)> + 'a
    where
        F: Fn(usize) -> bool + 'a,
    {
        self.weights().filter(move |(iidx, _)| keep(*iidx))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_weight_is_smoothed_mean() {
        let mut acc = WeightAccumulator::new();
        acc.add(3, 1.0, 1.0);
        acc.add(3, 1.0, 0.0);
        acc.add(1, 1.0, 0.5);
        assert_abs_diff_eq!(acc.weight(3), 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(acc.weight(1), 0.25, epsilon = 1e-12);
        assert_eq!(acc.weight(9), 0.0);
        assert_eq!(acc.count(3), 2.0);

        let order: Vec<usize> = acc.weights().map(|(i, _)| i).collect();
        assert_eq!(order, vec![1, 3]);
    }

    #[test]
    fn test_merge_sums_members() {
        let mut a = WeightAccumulator::new();
        a.add(0, 1.0, 1.0);
        let mut b = WeightAccumulator::new();
        b.add(0, 2.0, 1.0);
        b.add(4, 1.0, 1.0);

        let mut cluster = WeightAccumulator::new();
        cluster.merge(&a);
        cluster.merge(&b);
        assert_eq!(cluster.count(0), 3.0);
        assert_eq!(cluster.sum(0), 2.0);
        assert_eq!(cluster.weights_where(|i| i > 0).count(), 1);
    }
}
