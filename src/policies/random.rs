use super::{ItemBandit, ValueFunction};
use rand::seq::{index, IndexedRandom};

/// Random selection bandit - picks available items uniformly at random
#[derive(Clone, Debug, Default)]
pub struct Random {
    num_items: usize,
}

impl Random {
    #[must_use]
    pub fn new(num_items: usize) -> Self {
        Self { num_items }
    }
}

impl ItemBandit for Random {
    fn next(
        &mut self,
        _uidx: usize,
        available: &[usize],
        _value_fn: &dyn ValueFunction,
        rng: &mut dyn rand::RngCore,
    ) -> Option<usize> {
        available.choose(rng).copied()
    }

    fn next_list(
        &mut self,
        _uidx: usize,
        available: &[usize],
        _value_fn: &dyn ValueFunction,
        k: usize,
        rng: &mut dyn rand::RngCore,
    ) -> Vec<usize> {
        let amount = k.min(available.len());
        index::sample(rng, available.len(), amount)
            .into_iter()
            .map(|pos| available[pos])
            .collect()
    }

    fn update(&mut self, _iidx: usize, _value: f64) {
        // Random selection doesn't learn from feedback
    }

    fn reset(&mut self) {
        // No state to reset
    }

    fn num_items(&self) -> usize {
        self.num_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::identity;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_random_next() {
        let mut bandit = Random::new(5);
        let available = vec![1, 3, 4];
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        let choice = bandit.next(0, &available, &identity, &mut rng).unwrap();
        assert!(available.contains(&choice));
    }

    #[test]
    fn test_random_empty() {
        let mut bandit = Random::new(5);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        assert_eq!(bandit.next(0, &[], &identity, &mut rng), None);
        assert!(bandit.next_list(0, &[], &identity, 3, &mut rng).is_empty());
    }

    #[test]
    fn test_random_list_has_no_repeats() {
        let mut bandit = Random::new(10);
        let available: Vec<usize> = (0..10).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        let list = bandit.next_list(0, &available, &identity, 6, &mut rng);
        assert_eq!(list.len(), 6);
        let distinct: HashSet<_> = list.iter().collect();
        assert_eq!(distinct.len(), 6);
    }
}
