use super::{ItemBandit, ValueFunction};
use crate::untie;
use rand::seq::IndexedRandom;
use rand::Rng;

/// Categorical maximum-likelihood item bandit
///
/// Picks items with probability proportional to their estimated reward:
/// the smoothed hit ratio `(hits + a) / (hits + misses + a + b)` in the
/// weighted variant, or the smoothed accumulated reward `a + sum` in the
/// unweighted one. A single uniform draw is mapped through the cumulative
/// distribution of the available items.
#[derive(Clone, Debug)]
pub struct Mle {
    weighted: bool,
    prior_alpha: f64,
    prior_beta: f64,
    arm_stats: Vec<ArmStats>,
}

#[derive(Clone, Copy, Debug, Default)]
struct ArmStats {
    hits: f64,
    misses: f64,
}

impl Mle {
    /// Weighted (hit-ratio) variant with a Beta(1,1) smoothing prior
    #[must_use]
    pub fn weighted(num_items: usize) -> Self {
        Self::new(num_items, true, 1.0, 1.0)
    }

    /// Unweighted (accumulated reward) variant
    #[must_use]
    pub fn unweighted(num_items: usize) -> Self {
        Self::new(num_items, false, 1.0, 1.0)
    }

    #[must_use]
    pub fn new(num_items: usize, weighted: bool, prior_alpha: f64, prior_beta: f64) -> Self {
        assert!(prior_alpha >= 0.0, "prior_alpha must be non-negative");
        assert!(prior_beta >= 0.0, "prior_beta must be non-negative");
        Self {
            weighted,
            prior_alpha,
            prior_beta,
            arm_stats: vec![ArmStats::default(); num_items],
        }
    }

    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// Estimated (unnormalised) selection weight of an item
    pub fn estimate(&self, iidx: usize) -> f64 {
        let stats = self.arm_stats.get(iidx).copied().unwrap_or_default();
        self.score(&stats)
    }

    fn score(&self, stats: &ArmStats) -> f64 {
        if self.weighted {
            let denominator = stats.hits + stats.misses + self.prior_alpha + self.prior_beta;
            if denominator <= 0.0 {
                0.0
            } else {
                (stats.hits + self.prior_alpha) / denominator
            }
        } else {
            stats.hits + self.prior_alpha
        }
    }

    fn weights(
        &self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
    ) -> Vec<f64> {
        available
            .iter()
            .map(|&iidx| {
                let stats = self.arm_stats.get(iidx).copied().unwrap_or_default();
                let seen = stats.hits + stats.misses;
                let weight = value_fn.value(uidx, iidx, self.score(&stats), seen);
                if weight.is_finite() {
                    weight.max(0.0)
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl ItemBandit for Mle {
    fn next(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        rng: &mut dyn rand::RngCore,
    ) -> Option<usize> {
        if available.is_empty() {
            return None;
        }

        let weights = self.weights(uidx, available, value_fn);
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return available.choose(rng).copied();
        }

        // Inverse CDF over a single uniform draw
        let target = rng.random::<f64>() * total;
        let mut cumulative = 0.0;
        for (&iidx, weight) in available.iter().zip(&weights) {
            cumulative += weight;
            if target < cumulative {
                return Some(iidx);
            }
        }
        // Rounding can leave the target just above the last bound
        available
            .iter()
            .zip(&weights)
            .rev()
            .find(|(_, w)| **w > 0.0)
            .map(|(&iidx, _)| iidx)
    }

    fn next_list(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize> {
        // Weighted sampling without replacement (Efraimidis-Spirakis keys)
        let weights = self.weights(uidx, available, value_fn);
        let keyed: Vec<(usize, f64)> = available
            .iter()
            .zip(&weights)
            .map(|(&iidx, &weight)| {
                let u: f64 = rng.random_range(f64::MIN_POSITIVE..1.0);
                let key = if weight > 0.0 {
                    u.ln() / weight
                } else {
                    f64::NEG_INFINITY
                };
                (iidx, key)
            })
            .collect();
        untie::top_k(keyed, k, rng)
    }

    fn update(&mut self, iidx: usize, value: f64) {
        if let Some(stats) = self.arm_stats.get_mut(iidx) {
            if self.weighted {
                stats.hits += value;
                stats.misses += 1.0 - value;
            } else {
                stats.hits += value;
            }
        }
    }

    fn reset(&mut self) {
        self.arm_stats.iter_mut().for_each(|s| *s = ArmStats::default());
    }

    fn num_items(&self) -> usize {
        self.arm_stats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::identity;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_mle_weighted_estimate() {
        let mut bandit = Mle::weighted(2);
        bandit.update(0, 1.0);
        bandit.update(0, 1.0);
        bandit.update(0, 0.0);
        assert_abs_diff_eq!(bandit.estimate(0), 3.0 / 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bandit.estimate(1), 0.5, epsilon = 1e-12);
        assert!(bandit.is_weighted());
    }

    #[test]
    fn test_mle_unweighted_estimate() {
        let mut bandit = Mle::new(2, false, 0.0, 0.0);
        bandit.update(1, 2.0);
        bandit.update(1, 3.0);
        assert_eq!(bandit.estimate(1), 5.0);
        assert_eq!(bandit.estimate(0), 0.0);
    }

    #[test]
    fn test_mle_selects_proportionally() {
        let mut bandit = Mle::new(2, false, 0.0, 0.0);
        bandit.update(0, 1.0);
        bandit.update(1, 3.0);

        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for _ in 0..4000 {
            let pick = bandit.next(0, &[0, 1], &identity, &mut rng).unwrap();
            *counts.entry(pick).or_default() += 1;
        }
        let share = counts[&1] as f64 / 4000.0;
        assert!((share - 0.75).abs() < 0.03, "share was {share}");
    }

    #[test]
    fn test_mle_zero_weights_fall_back_to_uniform() {
        let mut bandit = Mle::new(3, false, 0.0, 0.0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let pick = bandit.next(0, &[0, 2], &identity, &mut rng).unwrap();
        assert!(pick == 0 || pick == 2);
        assert_eq!(bandit.next(0, &[], &identity, &mut rng), None);
    }

    #[test]
    fn test_mle_list_skips_zero_weight_items_last() {
        let mut bandit = Mle::new(3, false, 0.0, 0.0);
        bandit.update(0, 1.0);
        bandit.update(2, 1.0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let list = bandit.next_list(0, &[0, 1, 2], &identity, 3, &mut rng);
        assert_eq!(list.len(), 3);
        assert_eq!(list[2], 1);
    }
}
