use rand::rngs::StdRng;
use rand::SeedableRng;

use super::Algorithm;
use crate::policies::{identity, ItemBandit, Random, ValueFunction};
use crate::preference::Rating;

/// Non-personalised recommender driven by an item bandit.
///
/// Every user shares the same arm statistics; the value function can still
/// re-weight scores per user.
pub struct ItemBanditRecommender<B> {
    bandit: B,
    value_fn: Box<dyn ValueFunction + Send>,
    seed: u64,
    rng: StdRng,
}

/// Uniformly random baseline.
pub type RandomRecommender = ItemBanditRecommender<Random>;

impl<B: ItemBandit> ItemBanditRecommender<B> {
    /// Ranks by the bandit's own scores.
    #[must_use]
    pub fn new(bandit: B, seed: u64) -> Self {
        Self::with_value_fn(bandit, identity, seed)
    }

    #[must_use]
    pub fn with_value_fn<F>(bandit: B, value_fn: F, seed: u64) -> Self
    where
        F: ValueFunction + Send + 'static,
    {
        Self {
            bandit,
            value_fn: Box::new(value_fn),
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn bandit(&self) -> &B {
        &self.bandit
    }
}

impl RandomRecommender {
    #[must_use]
    pub fn random(num_items: usize, seed: u64) -> Self {
        Self::new(Random::new(num_items), seed)
    }
}

impl<B: ItemBandit> Algorithm for ItemBanditRecommender<B> {
    fn init(&mut self, training: &[Rating]) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.bandit.reset();
        for rating in training {
            self.bandit.update(rating.iidx, rating.value);
        }
    }

    fn next(&mut self, uidx: usize, available: &[usize]) -> Option<usize> {
        self.bandit
            .next(uidx, available, self.value_fn.as_ref(), &mut self.rng)
    }

    fn next_list(&mut self, uidx: usize, available: &[usize], k: usize) -> Vec<usize> {
        self.bandit
            .next_list(uidx, available, self.value_fn.as_ref(), k, &mut self.rng)
    }

    fn update(&mut self, _uidx: usize, iidx: usize, value: f64) {
        self.bandit.update(iidx, value);
    }
}
