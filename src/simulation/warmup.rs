use std::collections::HashSet;

use rand::seq::index;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::Dataset;
use crate::preference::Rating;

/// Which warm-up pairs are handed to the algorithms as ratings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupMode {
    /// Only relevant ratings.
    #[default]
    Positive,
    /// Every rated pair, with its reward.
    Known,
}

/// Data seeding a recommender before the live loop.
#[derive(Clone, Debug, Default)]
pub struct Warmup {
    /// Every warm-up pair, rated or not.
    pub full: Vec<(usize, usize)>,
    /// Warm-up pairs with a usable rating, as rewards.
    pub clean: Vec<Rating>,
    /// Items each user may still be recommended.
    pub availability: Vec<Vec<usize>>,
}

impl Warmup {
    /// Cold start: no training data, everything available.
    pub fn empty(dataset: &Dataset) -> Self {
        Self {
            full: Vec::new(),
            clean: Vec::new(),
            availability: (0..dataset.num_users())
                .map(|uidx| dataset.candidates(uidx))
                .collect(),
        }
    }

    /// Warm-up from explicit `(uidx, iidx)` pairs, which become unavailable.
    pub fn from_pairs(dataset: &Dataset, pairs: &[(usize, usize)], mode: WarmupMode) -> Self {
        let consumed: HashSet<(usize, usize)> = pairs.iter().copied().collect();

        let clean = pairs
            .iter()
            .filter_map(|&(uidx, iidx)| {
                let value = dataset.preference(uidx, iidx)?;
                let keep = match mode {
                    WarmupMode::Positive => dataset.is_relevant_value(value),
                    WarmupMode::Known => true,
                };
                keep.then(|| Rating::new(uidx, iidx, dataset.reward(uidx, iidx).unwrap_or(0.0)))
            })
            .collect();

        let availability = (0..dataset.num_users())
            .map(|uidx| {
                dataset
                    .candidates(uidx)
                    .into_iter()
                    .filter(|&iidx| !consumed.contains(&(uidx, iidx)))
                    .collect()
            })
            .collect();

        Self {
            full: pairs.to_vec(),
            clean,
            availability,
        }
    }

    /// Warm-up from a random `fraction` of the rated pairs.
    pub fn sample(dataset: &Dataset, fraction: f64, mode: WarmupMode, rng: &mut dyn RngCore) -> Self {
        let rated: Vec<(usize, usize)> = dataset
            .ratings()
            .triples()
            .map(|(uidx, iidx, _)| (uidx, iidx))
            .collect();
        let amount = ((rated.len() as f64) * fraction.clamp(0.0, 1.0)).round() as usize;
        let mut picked: Vec<usize> = index::sample(rng, rated.len(), amount).into_vec();
        picked.sort_unstable();
        let pairs: Vec<(usize, usize)> = picked.into_iter().map(|pos| rated[pos]).collect();
        Self::from_pairs(dataset, &pairs, mode)
    }

    /// Ratings an algorithm trains on.
    ///
    /// When unknown pairs are not ignored, warm-up pairs outside `clean` are
    /// learned as zero rewards.
    pub fn training(&self, ignore_unknown: bool) -> Vec<Rating> {
        if ignore_unknown {
            return self.clean.clone();
        }
        let clean: HashSet<(usize, usize)> = self.clean.iter().map(|r| (r.uidx, r.iidx)).collect();
        let mut training = self.clean.clone();
        training.extend(
            self.full
                .iter()
                .filter(|pair| !clean.contains(pair))
                .map(|&(uidx, iidx)| Rating::new(uidx, iidx, 0.0)),
        );
        training
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn dataset() -> Dataset {
        let raw = [("u0", "i0", 1.0), ("u0", "i1", 0.0), ("u1", "i0", 1.0), ("u1", "i2", 1.0)];
        Dataset::from_triples(
            raw.iter().map(|&(u, i, v)| (u.to_string(), i.to_string(), v)),
            1.0,
        )
    }

    #[test]
    fn test_pairs_leave_availability() {
        let dataset = dataset();
        let warmup = Warmup::from_pairs(&dataset, &[(0, 0), (0, 1), (1, 1)], WarmupMode::Positive);
        assert_eq!(warmup.availability[0], vec![2]);
        assert_eq!(warmup.availability[1], vec![0, 2]);
        assert_eq!(warmup.clean, vec![Rating::new(0, 0, 1.0)]);

        let training = warmup.training(false);
        assert_eq!(training.len(), 3);
        assert!(training[1..].iter().all(|r| r.value == 0.0));
        assert_eq!(warmup.training(true).len(), 1);
    }

    #[test]
    fn test_known_mode_keeps_negatives() {
        let dataset = dataset();
        let warmup = Warmup::from_pairs(&dataset, &[(0, 1), (1, 1)], WarmupMode::Known);
        assert_eq!(warmup.clean, vec![Rating::new(0, 1, 0.0)]);
    }

    #[test]
    fn test_sample_fraction() {
        let dataset = dataset();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let warmup = Warmup::sample(&dataset, 0.5, WarmupMode::Known, &mut rng);
        assert_eq!(warmup.full.len(), 2);
        assert_eq!(warmup.clean.len(), 2);
        let remaining: usize = warmup.availability.iter().map(Vec::len).sum();
        assert_eq!(remaining, 2 * 3 - 2);
    }
}
