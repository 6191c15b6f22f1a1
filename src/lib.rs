//! Bandicoot: offline simulation of interactive, bandit-based recommendation.
//!
//! A simulation replays a ratings dataset as withheld ground truth: a user is
//! picked, a recommender proposes one item, the rating (if any) is revealed
//! and fed back, and cumulative metrics are updated. Algorithms range from
//! non-personalised item bandits (epsilon-greedy, Thompson sampling, UCB,
//! MLE) to incremental user kNN and the clustering bandits CLUB and COFIBA.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use bandicoot::prelude::*;
//! use bandicoot::simulation::selection::RoundRobinSelector;
//! use bandicoot::simulation::end_condition::NumIterations;
//!
//! let triples = vec![
//!     ("ann".to_string(), "jazz".to_string(), 1.0),
//!     ("bob".to_string(), "rock".to_string(), 1.0),
//! ];
//! let dataset = Arc::new(Dataset::from_triples(triples, 1.0));
//!
//! let recommender = Interactive::new(
//!     "ts",
//!     ItemBanditRecommender::new(ThompsonSampling::new(dataset.num_items()), 42),
//!     true,
//! );
//! let mut metrics: IndexMap<String, Box<dyn CumulativeMetric>> = IndexMap::new();
//! metrics.insert("recall".to_string(), MetricKind::Recall.build(&dataset));
//!
//! let mut simulation = RecommendationLoop::new(
//!     Arc::clone(&dataset),
//!     Box::new(recommender),
//!     Box::new(RoundRobinSelector::new()),
//!     Box::new(NumIterations::new(10)),
//!     metrics,
//!     &Warmup::empty(&dataset),
//!     false,
//!     42,
//! );
//! let records = simulation.run_to_vec();
//! assert_eq!(records.len(), 4);
//! assert_eq!(records[3].metrics, vec![1.0]);
//! ```

pub mod config;
mod error;
pub mod graph;
pub mod index;
pub mod io;
pub mod neighborhood;
pub mod policies;
pub mod preference;
pub mod recommender;
pub mod simulation;
pub mod untie;

pub use config::{AlgorithmConfig, DistanceConfig, GraphConfig, Registry, SimulationConfig};
pub use error::{Result, SimError};
pub use index::FastIndex;
pub use preference::{DensePreferenceData, PreferenceData, Rating};
pub use recommender::{Algorithm, Interactive, InteractiveRecommender};
pub use simulation::{Dataset, IterationRecord, RecommendationLoop, Warmup};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::graph::{CompleteGraph, EdgeProbability, ErdosRenyi, GraphGenerator};
    pub use crate::neighborhood::{UserKnn, VectorCosineSimilarity};
    pub use crate::policies::{
        DelayedThompsonSampling, EpsilonGreedy, ItemBandit, Mle, Random, ThompsonSampling, Ucb1,
        Ucb1Tuned,
    };
    pub use crate::recommender::{
        Algorithm, Club, Cofiba, Interactive, InteractiveRecommender, ItemBanditRecommender,
        NotReciprocal, RandomRecommender,
    };
    pub use crate::simulation::{
        CumulativeMetric, Dataset, EndCondition, MetricKind, RecommendationLoop, UserSelector,
        Warmup,
    };
    pub use crate::{Result, SimError, SimulationConfig};
    // metric maps are keyed in insertion order
    pub use indexmap::IndexMap;
}
