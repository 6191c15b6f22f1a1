//! Clustering of bandits (CLUB).
//!
//! Users are nodes of a confidence-bound graph whose connected components
//! are the clusters. Every user keeps an individual weight vector over items
//! (one independent component per item), every cluster the sum of its
//! members' vectors. Recommendations use the cluster vector with a UCB bonus;
//! feedback may cut edges to neighbours whose vectors have drifted too far
//! apart, splitting the cluster.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, warn};

use super::{Algorithm, WeightAccumulator};
use crate::graph::{
    connected_components_within, Clusters, CompleteGraph, ErdosRenyi, Graph, GraphGenerator,
};
use crate::neighborhood::distance::{DistanceMetric, Euclidean};
use crate::preference::Rating;
use crate::untie;

/// Confidence bound of an estimate backed by `times` observations.
pub(crate) fn confidence_bound(times: usize) -> f64 {
    let t = times as f64;
    ((1.0 + (1.0 + t).ln()) / (1.0 + t)).sqrt()
}

/// UCB score of an item from a cluster's accumulated feedback.
pub(crate) fn cluster_score(
    weights: Option<&WeightAccumulator>,
    iidx: usize,
    alpha1: f64,
    iteration: usize,
) -> f64 {
    let (weight, count) = weights.map_or((0.0, 0.0), |w| (w.weight(iidx), w.count(iidx)));
    let bonus = ((iteration as f64 + 1.0).ln() / (count + 1.0)).sqrt();
    weight + alpha1 * bonus
}

/// Generates the initial graph, or falls back to singleton clusters.
///
/// A failing generator leaves no graph behind: the algorithm keeps running
/// with every node alone and never splits.
pub(crate) fn initial_partition(
    generator: &dyn GraphGenerator,
    num_nodes: usize,
    rng: &mut dyn RngCore,
    what: &str,
) -> (Option<Graph>, Clusters) {
    match generator.generate(num_nodes, rng) {
        Ok(graph) => {
            let clusters = Clusters::from_graph(&graph);
            debug!(
                what,
                nodes = num_nodes,
                edges = graph.num_edges(),
                clusters = clusters.num_clusters(),
                "generated initial graph"
            );
            (Some(graph), clusters)
        }
        Err(err) => {
            warn!(what, ?generator, %err, "graph generation failed, clustering disabled");
            (None, Clusters::singletons(num_nodes))
        }
    }
}

/// CLUB over an injected initial graph.
///
/// `alpha1` scales the exploration bonus of the item scores, `alpha2` the
/// edge-deletion threshold.
pub struct Club<D = Euclidean> {
    num_users: usize,
    alpha1: f64,
    alpha2: f64,
    generator: Box<dyn GraphGenerator>,
    metric: D,
    seed: u64,
    rng: StdRng,
    graph: Option<Graph>,
    clusters: Clusters,
    individual: Vec<WeightAccumulator>,
    cluster_weights: Vec<WeightAccumulator>,
    times: Vec<usize>,
    iteration: usize,
}

impl Club<Euclidean> {
    #[must_use]
    pub fn new<G>(num_users: usize, alpha1: f64, alpha2: f64, generator: G, seed: u64) -> Self
    where
        G: GraphGenerator + 'static,
    {
        Self::with_metric(num_users, alpha1, alpha2, generator, Euclidean, seed)
    }

    /// CLUB starting from a single cluster of all users.
    #[must_use]
    pub fn complete(num_users: usize, alpha1: f64, alpha2: f64, seed: u64) -> Self {
        Self::new(num_users, alpha1, alpha2, CompleteGraph, seed)
    }

    /// CLUB starting from an Erdos-Renyi graph with `p = 3 ln(n) / n`.
    #[must_use]
    pub fn erdos(num_users: usize, alpha1: f64, alpha2: f64, seed: u64) -> Self {
        Self::new(num_users, alpha1, alpha2, ErdosRenyi::connected(), seed)
    }
}

impl<D: DistanceMetric> Club<D> {
    #[must_use]
    pub fn with_metric<G>(
        num_users: usize,
        alpha1: f64,
        alpha2: f64,
        generator: G,
        metric: D,
        seed: u64,
    ) -> Self
    where
        G: GraphGenerator + 'static,
    {
        assert!(alpha1 >= 0.0, "alpha1 must be non-negative");
        assert!(alpha2 >= 0.0, "alpha2 must be non-negative");
        Self {
            num_users,
            alpha1,
            alpha2,
            generator: Box::new(generator),
            metric,
            seed,
            rng: StdRng::seed_from_u64(seed),
            graph: None,
            clusters: Clusters::singletons(num_users),
            individual: vec![WeightAccumulator::new(); num_users],
            cluster_weights: vec![WeightAccumulator::new(); num_users],
            times: vec![0; num_users],
            iteration: 0,
        }
    }

    /// Current confidence-bound graph, `None` if generation failed.
    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn clusters(&self) -> &Clusters {
        &self.clusters
    }

    pub fn cluster_weights(&self, cluster: usize) -> Option<&WeightAccumulator> {
        self.cluster_weights.get(cluster)
    }

    pub fn user_weights(&self, uidx: usize) -> Option<&WeightAccumulator> {
        self.individual.get(uidx)
    }

    pub fn times(&self, uidx: usize) -> usize {
        self.times.get(uidx).copied().unwrap_or(0)
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    fn rebuild_cluster(&mut self, cluster: usize) {
        if cluster >= self.cluster_weights.len() {
            self.cluster_weights
                .resize_with(cluster + 1, WeightAccumulator::new);
        }
        let mut weights = WeightAccumulator::new();
        for &member in self.clusters.members(cluster) {
            weights.merge(&self.individual[member]);
        }
        self.cluster_weights[cluster] = weights;
    }

    fn scores<'a>(&'a self, uidx: usize, available: &'a [usize]) -> impl Iterator<Item = (usize, f64)> + 'a {
        let weights = self
            .clusters
            .cluster_of(uidx)
            .and_then(|cluster| self.cluster_weights.get(cluster));
        available.iter().map(move |&iidx| {
            (iidx, cluster_score(weights, iidx, self.alpha1, self.iteration))
        })
    }

    /// Cuts edges from `uidx` to neighbours that no longer look alike.
    fn prune_edges(&mut self, uidx: usize) -> bool {
        let Some(graph) = self.graph.as_mut() else {
            return false;
        };
        let neighbours: Vec<usize> = graph.neighbours(uidx).collect();
        let cb_u = confidence_bound(self.times[uidx]);
        let mut removed = false;
        for vidx in neighbours {
            let distance = self
                .metric
                .distance(self.individual[uidx].weights(), self.individual[vidx].weights());
            let threshold = self.alpha2 * (cb_u + confidence_bound(self.times[vidx]));
            if distance > threshold {
                graph.remove_edge(uidx, vidx);
                removed = true;
            }
        }
        removed
    }

    /// Splits the cluster of `uidx` if its graph fell apart; returns whether it did.
    fn split(&mut self, cluster: usize) -> bool {
        let Some(graph) = self.graph.as_ref() else {
            return false;
        };
        let pieces = connected_components_within(graph, self.clusters.members(cluster));
        if pieces.len() < 2 {
            return false;
        }
        match self.clusters.divide(cluster, pieces) {
            Ok(ids) => {
                debug!(cluster, parts = ids.len(), "split user cluster");
                for id in ids {
                    self.rebuild_cluster(id);
                }
                true
            }
            Err(err) => {
                warn!(cluster, %err, "could not split user cluster");
                false
            }
        }
    }
}

impl<D: DistanceMetric> Algorithm for Club<D> {
    fn init(&mut self, training: &[Rating]) {
        self.rng = StdRng::seed_from_u64(self.seed);
        let (graph, clusters) =
            initial_partition(self.generator.as_ref(), self.num_users, &mut self.rng, "users");
        self.graph = graph;
        self.clusters = clusters;
        self.individual = vec![WeightAccumulator::new(); self.num_users];
        self.times = vec![0; self.num_users];
        self.iteration = 0;

        for rating in training.iter().filter(|r| r.uidx < self.num_users) {
            self.individual[rating.uidx].add(rating.iidx, 1.0, rating.value);
            self.times[rating.uidx] += 1;
        }

        self.cluster_weights = Vec::with_capacity(self.clusters.num_clusters());
        for cluster in 0..self.clusters.num_clusters() {
            self.rebuild_cluster(cluster);
        }
    }

    fn next(&mut self, uidx: usize, available: &[usize]) -> Option<usize> {
        let scored: Vec<(usize, f64)> = self.scores(uidx, available).collect();
        untie::argmax(scored, &mut self.rng)
    }

    fn next_list(&mut self, uidx: usize, available: &[usize], k: usize) -> Vec<usize> {
        let scored: Vec<(usize, f64)> = self.scores(uidx, available).collect();
        untie::top_k(scored, k, &mut self.rng)
    }

    fn update(&mut self, uidx: usize, iidx: usize, value: f64) {
        if uidx >= self.num_users {
            return;
        }

        self.individual[uidx].add(iidx, 1.0, value);

        let Some(cluster) = self.clusters.cluster_of(uidx) else {
            return;
        };
        let split = self.prune_edges(uidx) && self.split(cluster);
        if !split {
            self.cluster_weights[cluster].add(iidx, 1.0, value);
        }

        self.times[uidx] += 1;
        self.iteration += 1;
    }
}
