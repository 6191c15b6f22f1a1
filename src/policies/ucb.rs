use super::{ItemBandit, ValueFunction};
use crate::untie;

/// Upper Confidence Bound (UCB1) item bandit
///
/// Scores each item by its empirical mean plus `sqrt(2 ln(n + 1) / pulls)`,
/// where `n` is the total number of updates seen. Items that were never
/// pulled score `+inf`, so every arm is tried before exploitation starts.
#[derive(Clone, Debug)]
pub struct Ucb1 {
    arm_stats: Vec<ArmStats>,
    /// Total number of rounds played
    total_rounds: usize,
}

#[derive(Clone, Debug, Default)]
struct ArmStats {
    pulls: usize,
    /// Running mean of the observed rewards
    mean: f64,
    /// Running mean of the squared rewards (UCB1-Tuned only)
    mean_sq: f64,
}

impl ArmStats {
    fn observe(&mut self, value: f64) {
        self.pulls += 1;
        let n = self.pulls as f64;
        self.mean += (value - self.mean) / n;
        self.mean_sq += (value * value - self.mean_sq) / n;
    }

    fn ucb_score(&self, total_rounds: usize) -> f64 {
        if self.pulls == 0 {
            // Unpulled arms have infinite UCB score (explore first)
            f64::INFINITY
        } else {
            let exploration = (2.0 * ln_rounds(total_rounds) / self.pulls as f64).sqrt();
            self.mean + exploration
        }
    }

    fn tuned_score(&self, total_rounds: usize) -> f64 {
        if self.pulls == 0 {
            return f64::INFINITY;
        }
        let pulls = self.pulls as f64;
        let log = ln_rounds(total_rounds);
        let variance =
            self.mean_sq - self.mean * self.mean + (2.0 * log / pulls).sqrt();
        self.mean + ((log / pulls) * variance.min(0.25)).sqrt()
    }
}

fn ln_rounds(total_rounds: usize) -> f64 {
    (total_rounds as f64 + 1.0).ln()
}

impl Ucb1 {
    #[must_use]
    pub fn new(num_items: usize) -> Self {
        Self {
            arm_stats: vec![ArmStats::default(); num_items],
            total_rounds: 0,
        }
    }

    /// Gets `(pulls, mean reward, UCB score)` for an item
    pub fn arm_stats(&self, iidx: usize) -> Option<(usize, f64, f64)> {
        self.arm_stats
            .get(iidx)
            .map(|s| (s.pulls, s.mean, s.ucb_score(self.total_rounds)))
    }

    /// Gets the total number of rounds played
    pub fn total_rounds(&self) -> usize {
        self.total_rounds
    }
}

fn scored<'a>(
    arm_stats: &'a [ArmStats],
    uidx: usize,
    available: &'a [usize],
    value_fn: &'a dyn ValueFunction,
    score: impl Fn(&ArmStats) -> f64 + 'a,
) -> impl Iterator<Item = (usize, f64)> + 'a {
    available.iter().map(move |&iidx| {
        let (raw, pulls) = arm_stats
            .get(iidx)
            .map_or((f64::INFINITY, 0.0), |s| (score(s), s.pulls as f64));
        (iidx, value_fn.value(uidx, iidx, raw, pulls))
    })
}

impl ItemBandit for Ucb1 {
    fn next(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        rng: &mut dyn rand::RngCore,
    ) -> Option<usize> {
        let rounds = self.total_rounds;
        untie::argmax(
            scored(&self.arm_stats, uidx, available, value_fn, move |s| {
                s.ucb_score(rounds)
            }),
            rng,
        )
    }

    fn next_list(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize> {
        let rounds = self.total_rounds;
        untie::top_k(
            scored(&self.arm_stats, uidx, available, value_fn, move |s| {
                s.ucb_score(rounds)
            }),
            k,
            rng,
        )
    }

    fn update(&mut self, iidx: usize, value: f64) {
        if let Some(stats) = self.arm_stats.get_mut(iidx) {
            stats.observe(value);
            self.total_rounds += 1;
        }
    }

    fn reset(&mut self) {
        self.arm_stats.iter_mut().for_each(|s| *s = ArmStats::default());
        self.total_rounds = 0;
    }

    fn num_items(&self) -> usize {
        self.arm_stats.len()
    }
}

/// UCB1-Tuned item bandit
///
/// Replaces the UCB1 bonus with a variance-aware one:
/// `sqrt(ln(n + 1) / pulls * min(1/4, V))` with
/// `V = E[x^2] - mean^2 + sqrt(2 ln(n + 1) / pulls)`.
#[derive(Clone, Debug)]
pub struct Ucb1Tuned {
    arm_stats: Vec<ArmStats>,
    total_rounds: usize,
}

impl Ucb1Tuned {
    #[must_use]
    pub fn new(num_items: usize) -> Self {
        Self {
            arm_stats: vec![ArmStats::default(); num_items],
            total_rounds: 0,
        }
    }

    /// Gets `(pulls, mean reward, tuned score)` for an item
    pub fn arm_stats(&self, iidx: usize) -> Option<(usize, f64, f64)> {
        self.arm_stats
            .get(iidx)
            .map(|s| (s.pulls, s.mean, s.tuned_score(self.total_rounds)))
    }

    pub fn total_rounds(&self) -> usize {
        self.total_rounds
    }
}

impl ItemBandit for Ucb1Tuned {
    fn next(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        rng: &mut dyn rand::RngCore,
    ) -> Option<usize> {
        let rounds = self.total_rounds;
        untie::argmax(
            scored(&self.arm_stats, uidx, available, value_fn, move |s| {
                s.tuned_score(rounds)
            }),
            rng,
        )
    }

    fn next_list(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize> {
        let rounds = self.total_rounds;
        untie::top_k(
            scored(&self.arm_stats, uidx, available, value_fn, move |s| {
                s.tuned_score(rounds)
            }),
            k,
            rng,
        )
    }

    fn update(&mut self, iidx: usize, value: f64) {
        if let Some(stats) = self.arm_stats.get_mut(iidx) {
            stats.observe(value);
            self.total_rounds += 1;
        }
    }

    fn reset(&mut self) {
        self.arm_stats.iter_mut().for_each(|s| *s = ArmStats::default());
        self.total_rounds = 0;
    }

    fn num_items(&self) -> usize {
        self.arm_stats.len()
    }
}
