//! Item bandit strategies.
//!
//! Each strategy treats the items of the catalogue as arms, keeps per-item
//! statistics over a fixed item universe and picks one (or the `k` best)
//! among the items still available to a user.

mod epsilon_greedy;
mod mle;
mod random;
mod thompson;
mod ucb;

pub use epsilon_greedy::EpsilonGreedy;
pub use mle::Mle;
pub use random::Random;
pub use thompson::{DelayedThompsonSampling, ThompsonSampling};
pub use ucb::{Ucb1, Ucb1Tuned};

/// Maps a bandit's raw score for an item into the score used for ranking.
///
/// Arguments are `(uidx, iidx, score, aux)`, where `aux` is the number of
/// observations the bandit holds for the item. Callers use this to inject
/// exploration bonuses or domain re-weighting without touching the bandit.
pub trait ValueFunction {
    fn value(&self, uidx: usize, iidx: usize, score: f64, aux: f64) -> f64;
}

impl<F> ValueFunction for F
where
    F: Fn(usize, usize, f64, f64) -> f64,
{
    fn value(&self, uidx: usize, iidx: usize, score: f64, aux: f64) -> f64 {
        self(uidx, iidx, score, aux)
    }
}

/// Value function that ranks by the bandit's own score.
pub fn identity(_uidx: usize, _iidx: usize, score: f64, _aux: f64) -> f64 {
    score
}

/// Core trait for item bandits
///
/// Note: like the rest of the crate this takes `&mut dyn RngCore` so that
/// bandits can be boxed and driven by the simulation's seeded RNG.
pub trait ItemBandit: Send {
    /// Select one item among `available`, or `None` if it is empty
    fn next(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        rng: &mut dyn rand::RngCore,
    ) -> Option<usize>;

    /// Select up to `k` distinct items among `available`, best first
    fn next_list(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize>;

    /// Record an observed reward for an item. Items outside the universe are ignored.
    fn update(&mut self, iidx: usize, value: f64);

    /// Forget all statistics
    fn reset(&mut self);

    /// Size of the item universe
    fn num_items(&self) -> usize;
}

impl<B: ItemBandit + ?Sized> ItemBandit for Box<B> {
    fn next(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        rng: &mut dyn rand::RngCore,
    ) -> Option<usize> {
        (**self).next(uidx, available, value_fn, rng)
    }

    fn next_list(
        &mut self,
        uidx: usize,
        available: &[usize],
        value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize> {
        (**self).next_list(uidx, available, value_fn, k, rng)
    }

    fn update(&mut self, iidx: usize, value: f64) {
        (**self).update(iidx, value)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn num_items(&self) -> usize {
        (**self).num_items()
    }
}
