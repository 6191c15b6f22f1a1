//! Simulation configuration and the algorithm registry.
//!
//! A simulation is described by a JSON document:
//!
//! ```json
//! {
//!   "seed": 42,
//!   "end": { "type": "num_iterations", "limit": 1000 },
//!   "selector": "round_robin",
//!   "metrics": ["recall", "gini"],
//!   "algorithms": {
//!     "ts": { "type": "thompson_sampling" },
//!     "club-erdos": { "type": "club", "graph": { "type": "erdos_renyi" } }
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::graph::{CompleteGraph, EdgeProbability, EmptyGraph, ErdosRenyi, GraphGenerator};
use crate::neighborhood::{Euclidean, Manhattan, UserKnn, VectorCosineSimilarity};
use crate::policies::{
    DelayedThompsonSampling, EpsilonGreedy, Mle, ThompsonSampling, Ucb1, Ucb1Tuned,
};
use crate::recommender::{
    Club, Cofiba, Interactive, InteractiveRecommender, ItemBanditRecommender, RandomRecommender,
};
use crate::simulation::{Dataset, EndConditionKind, MetricKind, SelectorKind, WarmupMode};

fn one() -> f64 {
    1.0
}

fn default_epsilon() -> f64 {
    0.1
}

fn default_delay() -> usize {
    10
}

fn default_k() -> usize {
    10
}

fn default_cosine_alpha() -> f64 {
    0.5
}

fn default_alpha1() -> f64 {
    0.1
}

fn default_weighted() -> bool {
    true
}

fn default_edge_probability() -> Option<EdgeProbability> {
    Some(EdgeProbability::Connectivity)
}

/// Initial graph of a clustering bandit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphConfig {
    Empty,
    #[default]
    Complete,
    /// `probability` defaults to `3 ln(n) / n`; an explicit `null` leaves the
    /// generator unconfigured.
    ErdosRenyi {
        #[serde(default = "default_edge_probability")]
        probability: Option<EdgeProbability>,
    },
}

impl GraphConfig {
    pub fn generator(self) -> Box<dyn GraphGenerator> {
        match self {
            GraphConfig::Empty => Box::new(EmptyGraph),
            GraphConfig::Complete => Box::new(CompleteGraph),
            GraphConfig::ErdosRenyi {
                probability: Some(probability),
            } => Box::new(ErdosRenyi::new(probability)),
            GraphConfig::ErdosRenyi { probability: None } => Box::new(ErdosRenyi::unconfigured()),
        }
    }
}

/// Distance between weight vectors when clustering bandits cut edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceConfig {
    #[default]
    Euclidean,
    Manhattan,
}

/// One algorithm and its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlgorithmConfig {
    Random,
    EpsilonGreedy {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    ThompsonSampling {
        #[serde(default = "one")]
        alpha: f64,
        #[serde(default = "one")]
        beta: f64,
    },
    DelayedThompsonSampling {
        #[serde(default = "one")]
        alpha: f64,
        #[serde(default = "one")]
        beta: f64,
        #[serde(default = "default_delay")]
        delay: usize,
    },
    Ucb1,
    Ucb1Tuned,
    Mle {
        #[serde(default = "default_weighted")]
        weighted: bool,
        #[serde(default = "one")]
        alpha: f64,
        #[serde(default = "one")]
        beta: f64,
    },
    UserKnn {
        #[serde(default = "default_k")]
        k: usize,
        #[serde(default = "one")]
        q: f64,
        #[serde(default = "default_cosine_alpha")]
        alpha: f64,
    },
    Club {
        #[serde(default = "default_alpha1")]
        alpha1: f64,
        #[serde(default = "one")]
        alpha2: f64,
        #[serde(default)]
        graph: GraphConfig,
        #[serde(default)]
        distance: DistanceConfig,
    },
    Cofiba {
        #[serde(default = "default_alpha1")]
        alpha1: f64,
        #[serde(default = "one")]
        alpha2: f64,
        #[serde(default)]
        user_graph: GraphConfig,
        #[serde(default)]
        item_graph: GraphConfig,
        #[serde(default)]
        distance: DistanceConfig,
    },
}

fn check(ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(SimError::invalid(message))
    }
}

impl AlgorithmConfig {
    /// Checks parameters the constructors would reject.
    ///
    /// Edge probabilities are not checked here: a bad one is reported by the
    /// graph generator when the algorithm initialises.
    pub fn validate(&self) -> Result<()> {
        match *self {
            AlgorithmConfig::Random | AlgorithmConfig::Ucb1 | AlgorithmConfig::Ucb1Tuned => Ok(()),
            AlgorithmConfig::EpsilonGreedy { epsilon } => {
                check((0.0..=1.0).contains(&epsilon), "epsilon must be between 0 and 1")
            }
            AlgorithmConfig::ThompsonSampling { alpha, beta }
            | AlgorithmConfig::DelayedThompsonSampling { alpha, beta, .. } => {
                check(alpha > 0.0, "prior alpha must be positive")?;
                check(beta > 0.0, "prior beta must be positive")
            }
            AlgorithmConfig::Mle { alpha, beta, .. } => {
                check(alpha >= 0.0, "prior alpha must be non-negative")?;
                check(beta >= 0.0, "prior beta must be non-negative")
            }
            AlgorithmConfig::UserKnn { k, q, alpha } => {
                check(k > 0, "k must be greater than 0")?;
                check(q > 0.0, "q must be positive")?;
                check((0.0..=1.0).contains(&alpha), "alpha must be between 0 and 1")
            }
            AlgorithmConfig::Club { alpha1, alpha2, .. }
            | AlgorithmConfig::Cofiba { alpha1, alpha2, .. } => {
                check(alpha1 >= 0.0, "alpha1 must be non-negative")?;
                check(alpha2 >= 0.0, "alpha2 must be non-negative")
            }
        }
    }

    /// Builds an interactive recommender over `dataset`'s users and items.
    pub fn build(
        &self,
        name: &str,
        dataset: &Dataset,
        seed: u64,
        ignore_unknown: bool,
    ) -> Result<Box<dyn InteractiveRecommender>> {
        self.validate()?;
        let users = dataset.num_users();
        let items = dataset.num_items();

        fn wrap<A: crate::recommender::Algorithm + 'static>(
            name: &str,
            algorithm: A,
            ignore_unknown: bool,
        ) -> Box<dyn InteractiveRecommender> {
            Box::new(Interactive::new(name, algorithm, ignore_unknown))
        }

        let recommender = match *self {
            AlgorithmConfig::Random => wrap(name, RandomRecommender::random(items, seed), ignore_unknown),
            AlgorithmConfig::EpsilonGreedy { epsilon } => wrap(
                name,
                ItemBanditRecommender::new(EpsilonGreedy::new(items, epsilon), seed),
                ignore_unknown,
            ),
            AlgorithmConfig::ThompsonSampling { alpha, beta } => wrap(
                name,
                ItemBanditRecommender::new(ThompsonSampling::with_prior(items, alpha, beta), seed),
                ignore_unknown,
            ),
            AlgorithmConfig::DelayedThompsonSampling { alpha, beta, delay } => wrap(
                name,
                ItemBanditRecommender::new(
                    DelayedThompsonSampling::with_prior(items, alpha, beta, delay),
                    seed,
                ),
                ignore_unknown,
            ),
            AlgorithmConfig::Ucb1 => wrap(
                name,
                ItemBanditRecommender::new(Ucb1::new(items), seed),
                ignore_unknown,
            ),
            AlgorithmConfig::Ucb1Tuned => wrap(
                name,
                ItemBanditRecommender::new(Ucb1Tuned::new(items), seed),
                ignore_unknown,
            ),
            AlgorithmConfig::Mle {
                weighted,
                alpha,
                beta,
            } => wrap(
                name,
                ItemBanditRecommender::new(Mle::new(items, weighted, alpha, beta), seed),
                ignore_unknown,
            ),
            AlgorithmConfig::UserKnn { k, q, alpha } => wrap(
                name,
                UserKnn::new(users, items, VectorCosineSimilarity::new(alpha), k, q, seed),
                ignore_unknown,
            ),
            AlgorithmConfig::Club {
                alpha1,
                alpha2,
                graph,
                distance,
            } => {
                let generator = graph.generator();
                match distance {
                    DistanceConfig::Euclidean => wrap(
                        name,
                        Club::with_metric(users, alpha1, alpha2, generator, Euclidean, seed),
                        ignore_unknown,
                    ),
                    DistanceConfig::Manhattan => wrap(
                        name,
                        Club::with_metric(users, alpha1, alpha2, generator, Manhattan, seed),
                        ignore_unknown,
                    ),
                }
            }
            AlgorithmConfig::Cofiba {
                alpha1,
                alpha2,
                user_graph,
                item_graph,
                distance,
            } => {
                let (users_gen, items_gen) = (user_graph.generator(), item_graph.generator());
                match distance {
                    DistanceConfig::Euclidean => wrap(
                        name,
                        Cofiba::with_metric(
                            users, items, alpha1, alpha2, users_gen, items_gen, Euclidean, seed,
                        ),
                        ignore_unknown,
                    ),
                    DistanceConfig::Manhattan => wrap(
                        name,
                        Cofiba::with_metric(
                            users, items, alpha1, alpha2, users_gen, items_gen, Manhattan, seed,
                        ),
                        ignore_unknown,
                    ),
                }
            }
        };
        Ok(recommender)
    }
}

/// Random warm-up drawn from the rated pairs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WarmupConfig {
    pub fraction: f64,
    #[serde(default)]
    pub mode: WarmupMode,
}

fn default_threshold() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_metrics() -> Vec<MetricKind> {
    vec![MetricKind::Recall]
}

/// Everything a batch of simulations needs besides the data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    #[serde(default)]
    pub seed: u64,
    /// Ratings at or above this value are relevant and rewarded with 1.
    #[serde(default = "default_threshold")]
    pub relevance_threshold: f64,
    /// Users and items share one key space.
    #[serde(default)]
    pub contact: bool,
    /// Consume the reverse of every recommended pair (contact mode only).
    #[serde(default)]
    pub not_reciprocal: bool,
    /// Skip learning from pairs without ground truth.
    #[serde(default = "default_true")]
    pub ignore_unknown: bool,
    #[serde(default)]
    pub end: EndConditionKind,
    #[serde(default)]
    pub selector: SelectorKind,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricKind>,
    #[serde(default)]
    pub warmup: Option<WarmupConfig>,
    /// Replay existing logs before continuing.
    #[serde(default)]
    pub resume: bool,
    /// Directory for the iteration logs.
    #[serde(default)]
    pub output: Option<PathBuf>,
    pub algorithms: IndexMap<String, AlgorithmConfig>,
}

impl SimulationConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        check(!self.algorithms.is_empty(), "at least one algorithm is required")?;
        if let Some(warmup) = &self.warmup {
            check(
                (0.0..=1.0).contains(&warmup.fraction),
                "warmup fraction must be between 0 and 1",
            )?;
        }
        if let EndConditionKind::PercentagePositiveRatings { fraction } = self.end {
            check(
                (0.0..=1.0).contains(&fraction),
                "end fraction must be between 0 and 1",
            )?;
        }
        for (name, algorithm) in &self.algorithms {
            algorithm.validate().map_err(|err| match err {
                SimError::InvalidParameter { message } => {
                    SimError::invalid(format!("{name}: {message}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Registry holding one factory per configured algorithm.
    pub fn registry(&self) -> Registry {
        let mut registry = Registry::new();
        let ignore_unknown = self.ignore_unknown;
        for (name, algorithm) in &self.algorithms {
            let algorithm = algorithm.clone();
            let owned = name.clone();
            registry.register(name.clone(), move |dataset: &Arc<Dataset>, seed| {
                algorithm.build(&owned, dataset, seed, ignore_unknown)
            });
        }
        registry
    }
}

/// Builds a recommender for a dataset and seed.
pub type Factory =
    Box<dyn Fn(&Arc<Dataset>, u64) -> Result<Box<dyn InteractiveRecommender>> + Send + Sync>;

/// Name to recommender factory map, in registration order.
#[derive(Default)]
pub struct Registry {
    factories: IndexMap<String, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Arc<Dataset>, u64) -> Result<Box<dyn InteractiveRecommender>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn build(
        &self,
        name: &str,
        dataset: &Arc<Dataset>,
        seed: u64,
    ) -> Result<Box<dyn InteractiveRecommender>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SimError::UnknownAlgorithm {
                name: name.to_string(),
            })?;
        factory(dataset, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Arc<Dataset> {
        let raw = [("u0", "i0", 1.0), ("u1", "i1", 1.0), ("u2", "i0", 0.0)];
        Arc::new(Dataset::from_triples(
            raw.iter().map(|&(u, i, v)| (u.to_string(), i.to_string(), v)),
            1.0,
        ))
    }

    #[test]
    fn test_parse_with_defaults() {
        let config = SimulationConfig::from_json(
            r#"{
                "seed": 7,
                "end": {"type": "num_iterations", "limit": 100},
                "selector": "random_round_robin",
                "algorithms": {
                    "eg": {"type": "epsilon_greedy"},
                    "club-erdos": {"type": "club", "graph": {"type": "erdos_renyi"}},
                    "cofiba": {"type": "cofiba", "alpha2": 2.0, "item_graph": {"type": "empty"}}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert!(config.ignore_unknown);
        assert_eq!(config.metrics, vec![MetricKind::Recall]);
        assert_eq!(config.selector, SelectorKind::RandomRoundRobin);
        assert_eq!(
            config.algorithms["eg"],
            AlgorithmConfig::EpsilonGreedy { epsilon: 0.1 }
        );
        assert_eq!(
            config.algorithms["club-erdos"],
            AlgorithmConfig::Club {
                alpha1: 0.1,
                alpha2: 1.0,
                graph: GraphConfig::ErdosRenyi {
                    probability: Some(EdgeProbability::Connectivity)
                },
                distance: DistanceConfig::Euclidean,
            }
        );
        let names: Vec<&String> = config.algorithms.keys().collect();
        assert_eq!(names, vec!["eg", "club-erdos", "cofiba"]);
    }

    #[test]
    fn test_invalid_parameters_are_reported() {
        let err = SimulationConfig::from_json(
            r#"{"algorithms": {"eg": {"type": "epsilon_greedy", "epsilon": 2.0}}}"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameter: eg: epsilon must be between 0 and 1"
        );

        let err = SimulationConfig::from_json(r#"{"algorithms": {}}"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { .. }));

        let err = SimulationConfig::from_json(r#"{"algorithms": {"x": {"type": "linucb"}}}"#)
            .unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn test_registry_builds_by_name() {
        let config = SimulationConfig::from_json(
            r#"{"algorithms": {"knn": {"type": "user_knn", "k": 5}, "ucb": {"type": "ucb1"}}}"#,
        )
        .unwrap();
        let registry = config.registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["knn", "ucb"]);

        let dataset = dataset();
        let rec = registry.build("ucb", &dataset, 1).unwrap();
        assert_eq!(rec.name(), "ucb");

        assert!(matches!(
            registry.build("linucb", &dataset, 1),
            Err(SimError::UnknownAlgorithm { .. })
        ));
    }

    #[test]
    fn test_unconfigured_erdos_renyi_still_builds() {
        let config = AlgorithmConfig::Club {
            alpha1: 0.1,
            alpha2: 1.0,
            graph: GraphConfig::ErdosRenyi { probability: None },
            distance: DistanceConfig::Euclidean,
        };
        let dataset = dataset();
        assert!(config.build("club", &dataset, 1, true).is_ok());
    }

    #[test]
    fn test_manhattan_distance_for_clustering_bandits() {
        let config = SimulationConfig::from_json(
            r#"{"algorithms": {
                "club-l1": {"type": "club", "distance": "manhattan"},
                "cofiba-l1": {"type": "cofiba", "distance": "manhattan"}
            }}"#,
        )
        .unwrap();
        assert!(matches!(
            config.algorithms["club-l1"],
            AlgorithmConfig::Club { distance: DistanceConfig::Manhattan, .. }
        ));

        let dataset = dataset();
        let warmup = crate::simulation::Warmup::empty(&dataset);
        for name in ["club-l1", "cofiba-l1"] {
            let mut rec = config.registry().build(name, &dataset, 1).unwrap();
            rec.init(&warmup);
            let iidx = rec.next(0).unwrap();
            rec.update(0, iidx, dataset.reward(0, iidx));
            assert_eq!(rec.available(0).len(), dataset.num_items() - 1);
        }
    }
}
