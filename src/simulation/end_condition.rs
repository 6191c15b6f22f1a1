use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Dataset, Warmup};

/// Decides when a recommendation loop stops, checked once per iteration.
pub trait EndCondition: Send {
    fn init(&mut self, dataset: &Dataset, warmup: &Warmup);

    /// Records one dispatched pair and whether it was a hit.
    fn update(&mut self, uidx: usize, iidx: usize, relevant: bool);

    fn has_ended(&self) -> bool;
}

/// Runs until no user has anything left.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLimit;

impl EndCondition for NoLimit {
    fn init(&mut self, _dataset: &Dataset, _warmup: &Warmup) {}

    fn update(&mut self, _uidx: usize, _iidx: usize, _relevant: bool) {}

    fn has_ended(&self) -> bool {
        false
    }
}

/// Stops after a fixed number of iterations.
#[derive(Clone, Copy, Debug)]
pub struct NumIterations {
    limit: usize,
    done: usize,
}

impl NumIterations {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit, done: 0 }
    }
}

impl EndCondition for NumIterations {
    fn init(&mut self, _dataset: &Dataset, _warmup: &Warmup) {
        self.done = 0;
    }

    fn update(&mut self, _uidx: usize, _iidx: usize, _relevant: bool) {
        self.done += 1;
    }

    fn has_ended(&self) -> bool {
        self.done >= self.limit
    }
}

/// Stops once a share of the relevant pairs outside the warm-up was found.
#[derive(Clone, Copy, Debug)]
pub struct PercentagePositiveRatings {
    fraction: f64,
    target: usize,
    found: usize,
}

impl PercentagePositiveRatings {
    /// `fraction` in `[0, 1]`.
    #[must_use]
    pub fn new(fraction: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&fraction),
            "fraction must be between 0 and 1"
        );
        Self {
            fraction,
            target: 0,
            found: 0,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }
}

impl EndCondition for PercentagePositiveRatings {
    fn init(&mut self, dataset: &Dataset, warmup: &Warmup) {
        let in_warmup = warmup
            .full
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter(|&&(uidx, iidx)| dataset.is_relevant(uidx, iidx))
            .count();
        let remaining = dataset.num_relevant().saturating_sub(in_warmup);
        self.target = (self.fraction * remaining as f64).ceil() as usize;
        self.found = 0;
    }

    fn update(&mut self, _uidx: usize, _iidx: usize, relevant: bool) {
        if relevant {
            self.found += 1;
        }
    }

    fn has_ended(&self) -> bool {
        self.found >= self.target
    }
}

/// Serialisable choice of end condition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndConditionKind {
    #[default]
    NoLimit,
    NumIterations {
        limit: usize,
    },
    PercentagePositiveRatings {
        fraction: f64,
    },
}

impl EndConditionKind {
    pub fn build(self) -> Box<dyn EndCondition> {
        match self {
            EndConditionKind::NoLimit => Box::new(NoLimit),
            EndConditionKind::NumIterations { limit } => Box::new(NumIterations::new(limit)),
            EndConditionKind::PercentagePositiveRatings { fraction } => {
                Box::new(PercentagePositiveRatings::new(fraction))
            }
        }
    }
}
