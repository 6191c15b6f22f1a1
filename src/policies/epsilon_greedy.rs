use super::{ItemBandit, ValueFunction};
use crate::untie;
use rand::seq::{index, IndexedRandom};
use rand::Rng;

/// Epsilon-greedy item bandit - explores with probability epsilon, exploits otherwise
#[derive(Clone, Debug)]
pub struct EpsilonGreedy {
    epsilon: f64,
    arm_stats: Vec<ArmStats>,
}

#[derive(Clone, Debug, Default)]
struct ArmStats {
    pulls: usize,
    total_reward: f64,
}

impl ArmStats {
    fn average_reward(&self) -> f64 {
        if self.pulls == 0 {
            0.0
        } else {
            self.total_reward / self.pulls as f64
        }
    }
}

impl EpsilonGreedy {
    /// Creates a new EpsilonGreedy bandit over `num_items` items
    #[must_use]
    pub fn new(num_items: usize, epsilon: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&epsilon),
            "epsilon must be between 0 and 1"
        );
        Self {
            epsilon,
            arm_stats: vec![ArmStats::default(); num_items],
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Gets `(pulls, average reward)` for an item, if it has been pulled
    pub fn arm_stats(&self, iidx: usize) -> Option<(usize, f64)> {
        self.arm_stats
            .get(iidx)
            .filter(|s| s.pulls > 0)
            .map(|s| (s.pulls, s.average_reward()))
    }

    fn scores<'a>(
        &'a self,
        uidx: usize,
        available: &'a [usize],
        value_fn: &'a dyn ValueFunction,
    ) -> impl Iterator<Item = (usize, f64)> + 'a {
        available.iter().map(move |&iidx| {
            let (mean, pulls) = self
                .arm_stats
                .get(iidx)
                .map_or((0.0, 0.0), |s| (s.average_reward(), s.pulls as f64));
            (iidx, value_fn.value(uidx, iidx, mean, pulls))
        })
    }
}

impl ItemBandit for EpsilonGreedy {
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

        // Explore with probability epsilon
        let r: f64 = rng.random_range(0.0..1.0);
        if r < self.epsilon {
            available.choose(rng).copied()
        } else {
            untie::argmax(self.scores(uidx, available, value_fn), rng)
        }
    }

    fn next_list(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize> {
        let r: f64 = rng.random_range(0.0..1.0);
        if r < self.epsilon {
            let amount = k.min(available.len());
            index::sample(rng, available.len(), amount)
                .into_iter()
                .map(|pos| available[pos])
                .collect()
        } else {
            let scored: Vec<_> = self.scores(uidx, available, value_fn).collect();
            untie::top_k(scored, k, rng)
        }
    }

    fn update(&mut self, iidx: usize, value: f64) {
        if let Some(stats) = self.arm_stats.get_mut(iidx) {
            stats.pulls += 1;
            stats.total_reward += value;
        }
    }

    fn reset(&mut self) {
        self.arm_stats.iter_mut().for_each(|s| *s = ArmStats::default());
    }

    fn num_items(&self) -> usize {
        self.arm_stats.len()
    }
}
