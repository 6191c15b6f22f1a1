//! Interactive recommendation algorithms.
//!
//! An [`Algorithm`] only learns and scores: it is told which items are still
//! available and which feedback was observed. [`Interactive`] wraps an
//! algorithm into an [`InteractiveRecommender`], the object the simulation
//! loop drives, which also owns the per-user availability lists and the
//! policy for pairs without ground truth.

mod accumulator;
mod availability;
pub mod club;
pub mod cofiba;
mod item_bandit;
mod reciprocal;

pub use accumulator::WeightAccumulator;
pub use availability::Availability;
pub use club::Club;
pub use cofiba::Cofiba;
pub use item_bandit::{ItemBanditRecommender, RandomRecommender};
pub use reciprocal::NotReciprocal;

use crate::preference::Rating;
use crate::simulation::Warmup;

/// Online learning strategy behind an interactive recommender.
///
/// Implementations own whatever randomness they need, seeded at
/// construction, so a run is reproducible from its seed alone.
pub trait Algorithm: Send {
    /// Resets the state and learns from warm-up ratings.
    fn init(&mut self, training: &[Rating]);

    /// Picks one item among `available`, `None` when it is empty.
    fn next(&mut self, uidx: usize, available: &[usize]) -> Option<usize>;

    /// Picks up to `k` distinct items among `available`, best first.
    fn next_list(&mut self, uidx: usize, available: &[usize], k: usize) -> Vec<usize>;

    /// Learns the feedback `value` observed for `(uidx, iidx)`.
    fn update(&mut self, uidx: usize, iidx: usize, value: f64);
}

impl<A: Algorithm + ?Sized> Algorithm for Box<A> {
    fn init(&mut self, training: &[Rating]) {
        (**self).init(training)
    }

    fn next(&mut self, uidx: usize, available: &[usize]) -> Option<usize> {
        (**self).next(uidx, available)
    }

    fn next_list(&mut self, uidx: usize, available: &[usize], k: usize) -> Vec<usize> {
        (**self).next_list(uidx, available, k)
    }

    fn update(&mut self, uidx: usize, iidx: usize, value: f64) {
        (**self).update(uidx, iidx, value)
    }
}

/// The contract the recommendation loop drives.
///
/// Lifecycle: `init` once, then any number of `next` / `update` rounds.
pub trait InteractiveRecommender: Send {
    fn name(&self) -> &str;

    /// Loads availability lists and trains on the warm-up data.
    fn init(&mut self, warmup: &Warmup);

    /// Recommends one item to `uidx`, `None` once nothing is left for them.
    fn next(&mut self, uidx: usize) -> Option<usize>;

    /// Recommends up to `k` items to `uidx`.
    fn next_list(&mut self, uidx: usize, k: usize) -> Vec<usize>;

    /// Consumes the pair and learns the feedback, if any.
    ///
    /// `None` means the ground truth holds no rating for the pair.
    fn update(&mut self, uidx: usize, iidx: usize, value: Option<f64>);

    /// Items still available to `uidx`.
    fn available(&self, uidx: usize) -> &[usize];
}

impl<R: InteractiveRecommender + ?Sized> InteractiveRecommender for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn init(&mut self, warmup: &Warmup) {
        (**self).init(warmup)
    }

    fn next(&mut self, uidx: usize) -> Option<usize> {
        (**self).next(uidx)
    }

    fn next_list(&mut self, uidx: usize, k: usize) -> Vec<usize> {
        (**self).next_list(uidx, k)
    }

    fn update(&mut self, uidx: usize, iidx: usize, value: Option<f64>) {
        (**self).update(uidx, iidx, value)
    }

    fn available(&self, uidx: usize) -> &[usize] {
        (**self).available(uidx)
    }
}

/// Adapts an [`Algorithm`] to the loop contract.
///
/// With `ignore_unknown` set, pairs without ground truth are consumed but not
/// learned; otherwise they are learned as a zero reward.
pub struct Interactive<A> {
    name: String,
    algorithm: A,
    availability: Availability,
    ignore_unknown: bool,
}

impl<A: Algorithm> Interactive<A> {
    pub fn new(name: impl Into<String>, algorithm: A, ignore_unknown: bool) -> Self {
        Self {
            name: name.into(),
            algorithm,
            availability: Availability::default(),
            ignore_unknown,
        }
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn ignores_unknown(&self) -> bool {
        self.ignore_unknown
    }
}

impl<A: Algorithm> InteractiveRecommender for Interactive<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, warmup: &Warmup) {
        self.availability = Availability::new(warmup.availability.clone());
        self.algorithm.init(&warmup.training(self.ignore_unknown));
    }

    fn next(&mut self, uidx: usize) -> Option<usize> {
        self.algorithm.next(uidx, self.availability.items(uidx))
    }

    fn next_list(&mut self, uidx: usize, k: usize) -> Vec<usize> {
        self.algorithm
            .next_list(uidx, self.availability.items(uidx), k)
    }

    fn update(&mut self, uidx: usize, iidx: usize, value: Option<f64>) {
        self.availability.remove(uidx, iidx);
        match value {
            Some(value) => self.algorithm.update(uidx, iidx, value),
            None if !self.ignore_unknown => self.algorithm.update(uidx, iidx, 0.0),
            None => {}
        }
    }

    fn available(&self, uidx: usize) -> &[usize] {
        self.availability.items(uidx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what it learns and always proposes the first available item.
    #[derive(Default)]
    struct Recorder {
        learned: Vec<Rating>,
    }

    impl Algorithm for Recorder {
        fn init(&mut self, training: &[Rating]) {
            self.learned = training.to_vec();
        }

        fn next(&mut self, _uidx: usize, available: &[usize]) -> Option<usize> {
            available.first().copied()
        }

        fn next_list(&mut self, _uidx: usize, available: &[usize], k: usize) -> Vec<usize> {
            available.iter().take(k).copied().collect()
        }

        fn update(&mut self, uidx: usize, iidx: usize, value: f64) {
            self.learned.push(Rating::new(uidx, iidx, value));
        }
    }

    fn warmup() -> Warmup {
        Warmup {
            full: vec![],
            clean: vec![],
            availability: vec![vec![0, 1], vec![1]],
        }
    }

    #[test]
    fn test_ignored_pairs_still_consume_availability() {
        let mut rec = Interactive::new("recorder", Recorder::default(), true);
        rec.init(&warmup());

        assert_eq!(rec.next(0), Some(0));
        rec.update(0, 0, None);
        assert!(rec.algorithm().learned.is_empty());
        assert_eq!(rec.available(0), &[1]);

        rec.update(0, 1, Some(1.0));
        assert_eq!(rec.algorithm().learned, vec![Rating::new(0, 1, 1.0)]);
        assert_eq!(rec.next(0), None);
    }

    #[test]
    fn test_unknown_pairs_learned_as_failures() {
        let mut rec = Interactive::new("recorder", Recorder::default(), false);
        rec.init(&warmup());
        rec.update(1, 1, None);
        assert_eq!(rec.algorithm().learned, vec![Rating::new(1, 1, 0.0)]);
        assert!(rec.available(1).is_empty());
        assert_eq!(rec.next_list(0, 5), vec![0, 1]);
    }
}
