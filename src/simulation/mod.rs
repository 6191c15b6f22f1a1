//! Recommendation loop and its collaborators.
//!
//! One loop drives one recommender over the withheld ground truth: pick a
//! user, ask for an item, look up the reward, feed it back, update metrics,
//! check the end condition. A loop is strictly sequential; parallelism lives
//! one level up, in [`batch`], where every task owns its own loop.

pub mod batch;
mod dataset;
pub mod end_condition;
pub mod metrics;
pub mod selection;
mod warmup;

pub use dataset::{Dataset, Relevance, Reward};
pub use end_condition::{EndCondition, EndConditionKind};
pub use metrics::{CumulativeMetric, MetricKind};
pub use selection::{SelectorKind, UserSelector};
pub use warmup::{Warmup, WarmupMode};

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::error::Result;
use crate::io::IterationLogWriter;
use crate::recommender::InteractiveRecommender;

/// One row of the iteration log.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    /// 1-based
    pub iteration: usize,
    pub uidx: usize,
    pub iidx: usize,
    /// Metric values, in the loop's metric order
    pub metrics: Vec<f64>,
    /// Wall time spent on the `next` / `update` pair
    pub elapsed_ms: u128,
}

/// Sequential simulation of one recommender.
pub struct RecommendationLoop {
    dataset: Arc<Dataset>,
    recommender: Box<dyn InteractiveRecommender>,
    selector: Box<dyn UserSelector>,
    end: Box<dyn EndCondition>,
    metrics: IndexMap<String, Box<dyn CumulativeMetric>>,
    rng: StdRng,
    iteration: usize,
}

impl RecommendationLoop {
    /// Builds the loop and initialises every collaborator from `warmup`.
    ///
    /// `seed` drives user selection; the recommender carries its own seed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dataset: Arc<Dataset>,
        mut recommender: Box<dyn InteractiveRecommender>,
        mut selector: Box<dyn UserSelector>,
        mut end: Box<dyn EndCondition>,
        mut metrics: IndexMap<String, Box<dyn CumulativeMetric>>,
        warmup: &Warmup,
        not_reciprocal: bool,
        seed: u64,
    ) -> Self {
        recommender.init(warmup);
        let users = (0..dataset.num_users())
            .filter(|&uidx| !recommender.available(uidx).is_empty())
            .collect();
        selector.init(users);
        end.init(&dataset, warmup);
        for metric in metrics.values_mut() {
            metric.initialize(&warmup.full, not_reciprocal);
        }

        Self {
            dataset,
            recommender,
            selector,
            end,
            metrics,
            rng: StdRng::seed_from_u64(seed),
            iteration: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.recommender.name()
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn recommender(&self) -> &dyn InteractiveRecommender {
        self.recommender.as_ref()
    }

    pub fn has_ended(&self) -> bool {
        self.end.has_ended() || self.selector.num_users() == 0
    }

    /// Runs one iteration, `None` once the run is over.
    pub fn next_iteration(&mut self) -> Option<IterationRecord> {
        if self.end.has_ended() {
            return None;
        }
        let start = Instant::now();
        let (uidx, iidx) = loop {
            let uidx = self.selector.select(&mut self.rng)?;
            match self.recommender.next(uidx) {
                Some(iidx) => break (uidx, iidx),
                None => self.selector.remove(uidx),
            }
        };
        Some(self.apply(uidx, iidx, start))
    }

    /// Replays logged pairs through the loop without asking the
    /// recommender, restoring the state of an interrupted run.
    pub fn replay(&mut self, pairs: &[(usize, usize)]) -> Vec<IterationRecord> {
        pairs
            .iter()
            .map(|&(uidx, iidx)| self.apply(uidx, iidx, Instant::now()))
            .collect()
    }

    fn apply(&mut self, uidx: usize, iidx: usize, start: Instant) -> IterationRecord {
        let reward = self.dataset.reward(uidx, iidx);
        self.recommender.update(uidx, iidx, reward);
        let elapsed_ms = start.elapsed().as_millis();

        let metrics = self
            .metrics
            .values_mut()
            .map(|metric| {
                metric.update(uidx, iidx);
                metric.compute()
            })
            .collect();
        self.end
            .update(uidx, iidx, self.dataset.is_relevant(uidx, iidx));
        if self.recommender.available(uidx).is_empty() {
            self.selector.remove(uidx);
        }

        self.iteration += 1;
        IterationRecord {
            iteration: self.iteration,
            uidx,
            iidx,
            metrics,
            elapsed_ms,
        }
    }

    /// Runs to the end, collecting every record.
    pub fn run_to_vec(&mut self) -> Vec<IterationRecord> {
        std::iter::from_fn(|| self.next_iteration()).collect()
    }

    /// Runs to the end, logging every iteration, and returns the number of
    /// iterations run by this call.
    pub fn run<W: Write>(&mut self, writer: &mut IterationLogWriter<W>) -> Result<usize> {
        info!(algorithm = self.name(), "starting simulation");
        let mut count = 0;
        while let Some(record) = self.next_iteration() {
            writer.write(&record)?;
            count += 1;
        }
        writer.flush()?;
        info!(
            algorithm = self.name(),
            iterations = self.iteration,
            "simulation finished"
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::{Interactive, RandomRecommender};
    use crate::simulation::end_condition::NumIterations;
    use crate::simulation::metrics::Recall;
    use crate::simulation::selection::RoundRobinSelector;

    fn dataset() -> Arc<Dataset> {
        let raw = [("u0", "i0", 1.0), ("u0", "i1", 0.0), ("u1", "i1", 1.0)];
        Arc::new(Dataset::from_triples(
            raw.iter().map(|&(u, i, v)| (u.to_string(), i.to_string(), v)),
            1.0,
        ))
    }

    fn simulation(dataset: &Arc<Dataset>, limit: usize) -> RecommendationLoop {
        let mut metrics: IndexMap<String, Box<dyn CumulativeMetric>> = IndexMap::new();
        metrics.insert("recall".to_string(), Box::new(Recall::new(Arc::clone(dataset))));
        RecommendationLoop::new(
            Arc::clone(dataset),
            Box::new(Interactive::new(
                "random",
                RandomRecommender::random(dataset.num_items(), 3),
                true,
            )),
            Box::new(RoundRobinSelector::new()),
            Box::new(NumIterations::new(limit)),
            metrics,
            &Warmup::empty(dataset),
            false,
            3,
        )
    }

    #[test]
    fn test_loop_exhausts_all_pairs() {
        let dataset = dataset();
        let mut sim = simulation(&dataset, 100);
        let records = sim.run_to_vec();

        // 2 users x 2 items, nothing else to recommend
        assert_eq!(records.len(), 4);
        assert!(sim.has_ended());
        let mut pairs: Vec<_> = records.iter().map(|r| (r.uidx, r.iidx)).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(records.last().unwrap().metrics, vec![1.0]);
        assert!(records.windows(2).all(|w| w[0].iteration + 1 == w[1].iteration));
    }

    #[test]
    fn test_loop_stops_at_iteration_limit() {
        let dataset = dataset();
        let mut sim = simulation(&dataset, 2);
        assert_eq!(sim.run_to_vec().len(), 2);
        assert_eq!(sim.next_iteration(), None);
        assert_eq!(sim.iteration(), 2);
    }

    #[test]
    fn test_replay_then_continue() {
        let dataset = dataset();
        let mut sim = simulation(&dataset, 100);
        let replayed = sim.replay(&[(0, 0), (1, 1)]);
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[1].metrics, vec![1.0]);
        assert_eq!(sim.recommender().available(0), &[1]);

        let rest = sim.run_to_vec();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].iteration, 3);
    }
}
