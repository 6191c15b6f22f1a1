use std::fmt::Debug;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::Graph;
use crate::error::{Result, SimError};

/// Builds the initial graph of a clustering bandit.
///
/// Generators are injected into the algorithms, so CLUB over a complete
/// graph and CLUB over an Erdos-Renyi graph only differ by this value.
pub trait GraphGenerator: Debug + Send + Sync {
    fn generate(&self, num_nodes: usize, rng: &mut dyn RngCore) -> Result<Graph>;
}

impl<G: GraphGenerator + ?Sized> GraphGenerator for Box<G> {
    fn generate(&self, num_nodes: usize, rng: &mut dyn RngCore) -> Result<Graph> {
        (**self).generate(num_nodes, rng)
    }
}

/// No edges: every node starts in its own cluster.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyGraph;

impl GraphGenerator for EmptyGraph {
    fn generate(&self, num_nodes: usize, _rng: &mut dyn RngCore) -> Result<Graph> {
        Ok(Graph::new(num_nodes))
    }
}

/// Every pair connected: one initial cluster.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompleteGraph;

impl GraphGenerator for CompleteGraph {
    fn generate(&self, num_nodes: usize, _rng: &mut dyn RngCore) -> Result<Graph> {
        let mut graph = Graph::new(num_nodes);
        for a in 0..num_nodes {
            for b in (a + 1)..num_nodes {
                graph.add_edge(a, b);
            }
        }
        Ok(graph)
    }
}

/// Edge probability of an Erdos-Renyi graph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeProbability {
    Fixed(f64),
    /// `3 ln(n) / n`, capped at 1: connected with high probability.
    Connectivity,
}

impl EdgeProbability {
    pub fn resolve(self, num_nodes: usize) -> f64 {
        match self {
            EdgeProbability::Fixed(p) => p,
            EdgeProbability::Connectivity => {
                if num_nodes < 2 {
                    1.0
                } else {
                    let n = num_nodes as f64;
                    (3.0 * n.ln() / n).min(1.0)
                }
            }
        }
    }
}

/// G(n, p) random graph.
///
/// Generating without a probability is a `NotConfigured` error, and a
/// probability outside `[0, 1]` is `BadConfigured`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErdosRenyi {
    probability: Option<EdgeProbability>,
}

impl ErdosRenyi {
    #[must_use]
    pub fn new(probability: EdgeProbability) -> Self {
        Self {
            probability: Some(probability),
        }
    }

    /// Generator with the `3 ln(n) / n` connectivity probability.
    #[must_use]
    pub fn connected() -> Self {
        Self::new(EdgeProbability::Connectivity)
    }

    /// Generator without a probability yet.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn probability(&self) -> Option<EdgeProbability> {
        self.probability
    }
}

impl GraphGenerator for ErdosRenyi {
    fn generate(&self, num_nodes: usize, rng: &mut dyn RngCore) -> Result<Graph> {
        let probability = self.probability.ok_or_else(|| SimError::NotConfigured {
            message: "Erdos-Renyi edge probability is not set".to_string(),
        })?;
        let p = probability.resolve(num_nodes);
        if !(0.0..=1.0).contains(&p) {
            return Err(SimError::BadConfigured {
                message: format!("Erdos-Renyi edge probability {p} is outside [0, 1]"),
            });
        }

        let mut graph = Graph::new(num_nodes);
        for a in 0..num_nodes {
            for b in (a + 1)..num_nodes {
                if rng.random::<f64>() < p {
                    graph.add_edge(a, b);
                }
            }
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_complete_graph() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let graph = CompleteGraph.generate(5, &mut rng).unwrap();
        assert_eq!(graph.num_edges(), 10);
        assert_eq!(EmptyGraph.generate(5, &mut rng).unwrap().num_edges(), 0);
    }

    #[test]
    fn test_erdos_renyi_errors() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let err = ErdosRenyi::unconfigured().generate(4, &mut rng).unwrap_err();
        assert!(matches!(err, SimError::NotConfigured { .. }));

        let err = ErdosRenyi::new(EdgeProbability::Fixed(1.5))
            .generate(4, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SimError::BadConfigured { .. }));
    }

    #[test]
    fn test_erdos_renyi_extremes_and_seeding() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let full = ErdosRenyi::new(EdgeProbability::Fixed(1.0))
            .generate(6, &mut rng)
            .unwrap();
        assert_eq!(full.num_edges(), 15);
        let none = ErdosRenyi::new(EdgeProbability::Fixed(0.0))
            .generate(6, &mut rng)
            .unwrap();
        assert_eq!(none.num_edges(), 0);

        let a = ErdosRenyi::connected()
            .generate(50, &mut rand::rngs::StdRng::seed_from_u64(7))
            .unwrap();
        let b = ErdosRenyi::connected()
            .generate(50, &mut rand::rngs::StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_connectivity_probability() {
        let p = EdgeProbability::Connectivity.resolve(100);
        assert!((p - 3.0 * 100f64.ln() / 100.0).abs() < 1e-12);
        assert_eq!(EdgeProbability::Connectivity.resolve(3), 1.0);
        assert_eq!(EdgeProbability::Connectivity.resolve(1), 1.0);
    }
}
