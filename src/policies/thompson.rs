use super::{ItemBandit, ValueFunction};
use crate::untie;
use rand::Rng;
use rand_distr::{Beta, Distribution};

/// Thompson Sampling item bandit using a Beta posterior per item
///
/// Each call to `next` draws one sample from every available item's posterior
/// and picks the best; rewards are treated as success probabilities.
#[derive(Clone, Debug)]
pub struct ThompsonSampling {
    /// Prior alpha parameter for Beta distribution (defaults to 1.0)
    prior_alpha: f64,
    /// Prior beta parameter for Beta distribution (defaults to 1.0)
    prior_beta: f64,
    /// Posterior parameters for each item
    arm_stats: Vec<ArmStats>,
}

#[derive(Clone, Copy, Debug)]
struct ArmStats {
    alpha: f64,
    beta: f64,
}

impl ArmStats {
    /// Sample from the Beta distribution for this item
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        // Handle edge cases
        if self.alpha <= 0.0 || self.beta <= 0.0 {
            return 0.5;
        }

        match Beta::new(self.alpha, self.beta) {
            Ok(dist) => dist.sample(rng),
            Err(_) => self.expected_value(),
        }
    }

    fn expected_value(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}

impl ThompsonSampling {
    /// Creates a Thompson Sampling bandit with a uniform Beta(1,1) prior
    #[must_use]
    pub fn new(num_items: usize) -> Self {
        Self::with_prior(num_items, 1.0, 1.0)
    }

    /// Creates a Thompson Sampling bandit with the given Beta prior
    ///
    /// # Arguments
    /// * `prior_alpha` - Alpha parameter for Beta prior (must be positive)
    /// * `prior_beta` - Beta parameter for Beta prior (must be positive)
    #[must_use]
    pub fn with_prior(num_items: usize, prior_alpha: f64, prior_beta: f64) -> Self {
        assert!(prior_alpha > 0.0, "prior_alpha must be positive");
        assert!(prior_beta > 0.0, "prior_beta must be positive");
        Self {
            prior_alpha,
            prior_beta,
            arm_stats: vec![
                ArmStats {
                    alpha: prior_alpha,
                    beta: prior_beta,
                };
                num_items
            ],
        }
    }

    /// Gets the prior parameters
    pub fn prior(&self) -> (f64, f64) {
        (self.prior_alpha, self.prior_beta)
    }

    /// Gets `(alpha, beta, posterior mean)` for an item
    pub fn arm_stats(&self, iidx: usize) -> Option<(f64, f64, f64)> {
        self.arm_stats
            .get(iidx)
            .map(|s| (s.alpha, s.beta, s.expected_value()))
    }

    /// Number of (fractional) observations folded into an item's posterior
    fn observations(&self, stats: &ArmStats) -> f64 {
        stats.alpha + stats.beta - self.prior_alpha - self.prior_beta
    }

    fn prior_stats(&self) -> ArmStats {
        ArmStats {
            alpha: self.prior_alpha,
            beta: self.prior_beta,
        }
    }

    fn sample_item(&self, iidx: usize, rng: &mut dyn rand::RngCore) -> (f64, f64) {
        let stats = self
            .arm_stats
            .get(iidx)
            .copied()
            .unwrap_or_else(|| self.prior_stats());
        (stats.sample(rng), self.observations(&stats))
    }

    fn sampled_scores(
        &self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<(usize, f64)> {
        available
            .iter()
            .map(|&iidx| {
                let (sample, seen) = self.sample_item(iidx, rng);
                (iidx, value_fn.value(uidx, iidx, sample, seen))
            })
            .collect()
    }
}

impl ItemBandit for ThompsonSampling {
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
        let scored = self.sampled_scores(uidx, available, value_fn, rng);
        untie::argmax(scored, rng)
    }

    fn next_list(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize> {
        let scored = self.sampled_scores(uidx, available, value_fn, rng);
        untie::top_k(scored, k, rng)
    }

    fn update(&mut self, iidx: usize, value: f64) {
        if let Some(stats) = self.arm_stats.get_mut(iidx) {
            stats.alpha += value;
            stats.beta += 1.0 - value;
        }
    }

    fn reset(&mut self) {
        let prior = self.prior_stats();
        self.arm_stats.iter_mut().for_each(|s| *s = prior);
    }

    fn num_items(&self) -> usize {
        self.arm_stats.len()
    }
}

/// Thompson Sampling that reuses each item's sample for `delay` selections
///
/// An item is only resampled once its counter runs out. Every `update` of an
/// item resets its counter to `delay`, so the cached sample survives another
/// `delay` selections after new evidence arrives.
#[derive(Clone, Debug)]
pub struct DelayedThompsonSampling {
    inner: ThompsonSampling,
    delay: usize,
    cached: Vec<Option<f64>>,
    remaining: Vec<usize>,
}

impl DelayedThompsonSampling {
    #[must_use]
    pub fn new(num_items: usize, delay: usize) -> Self {
        Self::with_prior(num_items, 1.0, 1.0, delay)
    }

    #[must_use]
    pub fn with_prior(num_items: usize, prior_alpha: f64, prior_beta: f64, delay: usize) -> Self {
        Self {
            inner: ThompsonSampling::with_prior(num_items, prior_alpha, prior_beta),
            delay,
            cached: vec![None; num_items],
            remaining: vec![0; num_items],
        }
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Gets `(alpha, beta, posterior mean)` for an item
    pub fn arm_stats(&self, iidx: usize) -> Option<(f64, f64, f64)> {
        self.inner.arm_stats(iidx)
    }

    fn cached_sample(&mut self, iidx: usize, rng: &mut dyn rand::RngCore) -> (f64, f64) {
        if iidx >= self.cached.len() {
            return self.inner.sample_item(iidx, rng);
        }

        let seen = self.inner.observations(&self.inner.arm_stats[iidx]);
        match self.cached[iidx] {
            Some(sample) if self.remaining[iidx] > 0 => {
                self.remaining[iidx] -= 1;
                (sample, seen)
            }
            _ => {
                let (sample, _) = self.inner.sample_item(iidx, rng);
                self.cached[iidx] = Some(sample);
                self.remaining[iidx] = self.delay;
                (sample, seen)
            }
        }
    }

    fn sampled_scores(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<(usize, f64)> {
        available
            .iter()
            .map(|&iidx| {
                let (sample, seen) = self.cached_sample(iidx, rng);
                (iidx, value_fn.value(uidx, iidx, sample, seen))
            })
            .collect()
    }
}

impl ItemBandit for DelayedThompsonSampling {
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
        let scored = self.sampled_scores(uidx, available, value_fn, rng);
        untie::argmax(scored, rng)
    }

    fn next_list(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize> {
        let scored = self.sampled_scores(uidx, available, value_fn, rng);
        untie::top_k(scored, k, rng)
    }

    fn update(&mut self, iidx: usize, value: f64) {
        self.inner.update(iidx, value);
        if let Some(remaining) = self.remaining.get_mut(iidx) {
            *remaining = self.delay;
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.cached.iter_mut().for_each(|c| *c = None);
        self.remaining.iter_mut().for_each(|r| *r = 0);
    }

    fn num_items(&self) -> usize {
        self.inner.num_items()
    }
}
