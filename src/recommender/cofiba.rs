//! Collaborative filtering bandits (COFIBA).
//!
//! Items are clustered on a graph of their own, and every item cluster owns
//! an independent user graph, user partition and set of user-cluster weight
//! vectors. A user's preferences are therefore compared only over the items
//! of one item cluster at a time, and an item cluster that falls apart hands
//! a copy of its user structures to each of its pieces.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::club::{cluster_score, confidence_bound, initial_partition};
use super::{Algorithm, WeightAccumulator};
use crate::graph::{
    connected_components_within, Clusters, CompleteGraph, ErdosRenyi, Graph, GraphGenerator,
};
use crate::neighborhood::distance::{DistanceMetric, Euclidean};
use crate::preference::Rating;
use crate::untie;

/// User-side clustering owned by one item cluster.
#[derive(Clone, Debug)]
struct UserLayer {
    graph: Option<Graph>,
    clusters: Clusters,
    /// Per user cluster, restricted to the items of the owning item cluster
    weights: Vec<WeightAccumulator>,
}

/// COFIBA over injected user and item graph generators.
pub struct Cofiba<D = Euclidean> {
    num_users: usize,
    num_items: usize,
    alpha1: f64,
    alpha2: f64,
    user_generator: Box<dyn GraphGenerator>,
    item_generator: Box<dyn GraphGenerator>,
    metric: D,
    seed: u64,
    rng: StdRng,
    /// Per user, over items
    users: Vec<WeightAccumulator>,
    /// Per item, over users
    items: Vec<WeightAccumulator>,
    user_times: Vec<usize>,
    item_times: Vec<usize>,
    iteration: usize,
    item_graph: Option<Graph>,
    item_clusters: Clusters,
    layers: Vec<UserLayer>,
}

impl Cofiba<Euclidean> {
    #[must_use]
    pub fn new<U, I>(
        num_users: usize,
        num_items: usize,
        alpha1: f64,
        alpha2: f64,
        user_generator: U,
        item_generator: I,
        seed: u64,
    ) -> Self
    where
        U: GraphGenerator + 'static,
        I: GraphGenerator + 'static,
    {
        Self::with_metric(
            num_users,
            num_items,
            alpha1,
            alpha2,
            user_generator,
            item_generator,
            Euclidean,
            seed,
        )
    }

    /// Both graphs complete.
    #[must_use]
    pub fn complete(num_users: usize, num_items: usize, alpha1: f64, alpha2: f64, seed: u64) -> Self {
        Self::new(num_users, num_items, alpha1, alpha2, CompleteGraph, CompleteGraph, seed)
    }

    /// Both graphs Erdos-Renyi with `p = 3 ln(n) / n`.
    #[must_use]
    pub fn erdos(num_users: usize, num_items: usize, alpha1: f64, alpha2: f64, seed: u64) -> Self {
        Self::new(
            num_users,
            num_items,
            alpha1,
            alpha2,
            ErdosRenyi::connected(),
            ErdosRenyi::connected(),
            seed,
        )
    }
}

impl<D: DistanceMetric> Cofiba<D> {
    /// `metric` compares user vectors; item vectors are always compared
    /// with the Euclidean distance.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_metric<U, I>(
        num_users: usize,
        num_items: usize,
        alpha1: f64,
        alpha2: f64,
        user_generator: U,
        item_generator: I,
        metric: D,
        seed: u64,
    ) -> Self
    where
        U: GraphGenerator + 'static,
        I: GraphGenerator + 'static,
    {
        assert!(alpha1 >= 0.0, "alpha1 must be non-negative");
        assert!(alpha2 >= 0.0, "alpha2 must be non-negative");
        Self {
            num_users,
            num_items,
            alpha1,
            alpha2,
            user_generator: Box::new(user_generator),
            item_generator: Box::new(item_generator),
            metric,
            seed,
            rng: StdRng::seed_from_u64(seed),
            users: vec![WeightAccumulator::new(); num_users],
            items: vec![WeightAccumulator::new(); num_items],
            user_times: vec![0; num_users],
            item_times: vec![0; num_items],
            iteration: 0,
            item_graph: None,
            item_clusters: Clusters::single(num_items),
            layers: Vec::new(),
        }
    }

    pub fn item_graph(&self) -> Option<&Graph> {
        self.item_graph.as_ref()
    }

    pub fn item_clusters(&self) -> &Clusters {
        &self.item_clusters
    }

    /// User partition inside item cluster `item_cluster`.
    pub fn user_clusters(&self, item_cluster: usize) -> Option<&Clusters> {
        self.layers.get(item_cluster).map(|layer| &layer.clusters)
    }

    pub fn user_graph(&self, item_cluster: usize) -> Option<&Graph> {
        self.layers
            .get(item_cluster)
            .and_then(|layer| layer.graph.as_ref())
    }

    /// Weights of user cluster `user_cluster` inside item cluster `item_cluster`.
    pub fn cluster_weights(&self, item_cluster: usize, user_cluster: usize) -> Option<&WeightAccumulator> {
        self.layers
            .get(item_cluster)
            .and_then(|layer| layer.weights.get(user_cluster))
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    fn in_item_cluster(&self, item_cluster: usize) -> impl Fn(usize) -> bool + '_ {
        move |iidx| self.item_clusters.cluster_of(iidx) == Some(item_cluster)
    }

    /// Sum of the members' vectors of one user cluster, over one item cluster.
    fn user_cluster_weights(&self, item_cluster: usize, members: &[usize]) -> WeightAccumulator {
        let keep = self.in_item_cluster(item_cluster);
        let mut weights = WeightAccumulator::new();
        for &member in members {
            for (iidx, _) in self.users[member].weights_where(&keep) {
                weights.add(iidx, self.users[member].count(iidx), self.users[member].sum(iidx));
            }
        }
        weights
    }

    fn rebuild_layer_cluster(&mut self, item_cluster: usize, user_cluster: usize) {
        let members = self.layers[item_cluster]
            .clusters
            .members(user_cluster)
            .to_vec();
        let weights = self.user_cluster_weights(item_cluster, &members);
        let layer = &mut self.layers[item_cluster];
        if user_cluster >= layer.weights.len() {
            layer.weights.resize_with(user_cluster + 1, WeightAccumulator::new);
        }
        layer.weights[user_cluster] = weights;
    }

    fn rebuild_layer(&mut self, item_cluster: usize) {
        let num_clusters = self.layers[item_cluster].clusters.num_clusters();
        self.layers[item_cluster].weights = Vec::with_capacity(num_clusters);
        for user_cluster in 0..num_clusters {
            self.rebuild_layer_cluster(item_cluster, user_cluster);
        }
    }

    fn scores(&self, uidx: usize, available: &[usize]) -> Vec<(usize, f64)> {
        available
            .iter()
            .map(|&iidx| {
                let weights = self
                    .item_clusters
                    .cluster_of(iidx)
                    .and_then(|h| self.layers.get(h))
                    .and_then(|layer| {
                        let cluster = layer.clusters.cluster_of(uidx)?;
                        layer.weights.get(cluster)
                    });
                (iidx, cluster_score(weights, iidx, self.alpha1, self.iteration))
            })
            .collect()
    }

    /// User step: prune `uidx`'s edges in layer `h`, comparing preferences
    /// over the items of item cluster `h` only.
    fn update_users(&mut self, h: usize, uidx: usize, iidx: usize, value: f64) {
        let Some(cluster) = self.layers[h].clusters.cluster_of(uidx) else {
            return;
        };

        let neighbours: Vec<usize> = match &self.layers[h].graph {
            Some(graph) => graph.neighbours(uidx).collect(),
            None => Vec::new(),
        };
        let cb_u = confidence_bound(self.user_times[uidx]);
        let mut cut = Vec::new();
        {
            let keep = self.in_item_cluster(h);
            for vidx in neighbours {
                let distance = self.metric.distance(
                    self.users[uidx].weights_where(&keep),
                    self.users[vidx].weights_where(&keep),
                );
                if distance > self.alpha2 * (cb_u + confidence_bound(self.user_times[vidx])) {
                    cut.push(vidx);
                }
            }
        }

        let layer = &mut self.layers[h];
        let mut split_ids = None;
        if let Some(graph) = layer.graph.as_mut().filter(|_| !cut.is_empty()) {
            for &vidx in &cut {
                graph.remove_edge(uidx, vidx);
            }
            let pieces = connected_components_within(graph, layer.clusters.members(cluster));
            if pieces.len() > 1 {
                match layer.clusters.divide(cluster, pieces) {
                    Ok(ids) => split_ids = Some(ids),
                    Err(err) => warn!(item_cluster = h, cluster, %err, "could not split user cluster"),
                }
            }
        }

        match split_ids {
            Some(ids) => {
                debug!(item_cluster = h, cluster, parts = ids.len(), "split user cluster");
                for id in ids {
                    self.rebuild_layer_cluster(h, id);
                }
            }
            None => {
                if let Some(weights) = self.layers[h].weights.get_mut(cluster) {
                    weights.add(iidx, 1.0, value);
                }
            }
        }
    }

    /// Item step: prune `iidx`'s edges by comparing the items' user vectors;
    /// a split item cluster hands a copy of its user layer to every piece.
    fn update_items(&mut self, h: usize, iidx: usize) {
        let Some(graph) = self.item_graph.as_mut() else {
            return;
        };

        let neighbours: Vec<usize> = graph.neighbours(iidx).collect();
        let cb_i = confidence_bound(self.item_times[iidx]);
        let mut removed = false;
        for jidx in neighbours {
            let distance = Euclidean.distance(self.items[iidx].weights(), self.items[jidx].weights());
            if distance > self.alpha2 * (cb_i + confidence_bound(self.item_times[jidx])) {
                graph.remove_edge(iidx, jidx);
                removed = true;
            }
        }
        if !removed {
            return;
        }

        let pieces = connected_components_within(graph, self.item_clusters.members(h));
        if pieces.len() < 2 {
            return;
        }
        let ids = match self.item_clusters.divide(h, pieces) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(item_cluster = h, %err, "could not split item cluster");
                return;
            }
        };
        debug!(item_cluster = h, parts = ids.len(), "split item cluster");

        let parent = self.layers[h].clone();
        for &id in &ids[1..] {
            if id >= self.layers.len() {
                self.layers.resize_with(id + 1, || parent.clone());
            } else {
                self.layers[id] = parent.clone();
            }
        }
        for id in ids {
            self.rebuild_layer(id);
        }
    }

    fn fresh_layer(&mut self) -> UserLayer {
        let (graph, clusters) = initial_partition(
            self.user_generator.as_ref(),
            self.num_users,
            &mut self.rng,
            "users",
        );
        UserLayer {
            graph,
            clusters,
            weights: Vec::new(),
        }
    }
}

impl<D: DistanceMetric> Algorithm for Cofiba<D> {
    fn init(&mut self, training: &[Rating]) {
        self.rng = StdRng::seed_from_u64(self.seed);
        let (item_graph, item_clusters) =
            initial_partition(self.item_generator.as_ref(), self.num_items, &mut self.rng, "items");
        self.item_graph = item_graph;
        self.item_clusters = if self.item_graph.is_some() {
            item_clusters
        } else {
            Clusters::single(self.num_items)
        };

        self.layers = Vec::with_capacity(self.item_clusters.num_clusters());
        for _ in 0..self.item_clusters.num_clusters() {
            let layer = self.fresh_layer();
            self.layers.push(layer);
        }

        self.users = vec![WeightAccumulator::new(); self.num_users];
        self.items = vec![WeightAccumulator::new(); self.num_items];
        self.user_times = vec![0; self.num_users];
        self.item_times = vec![0; self.num_items];
        self.iteration = 0;

        for rating in training
            .iter()
            .filter(|r| r.uidx < self.num_users && r.iidx < self.num_items)
        {
            self.users[rating.uidx].add(rating.iidx, 1.0, rating.value);
            self.items[rating.iidx].add(rating.uidx, 1.0, rating.value);
            self.user_times[rating.uidx] += 1;
            self.item_times[rating.iidx] += 1;
        }

        for h in 0..self.layers.len() {
            self.rebuild_layer(h);
        }
    }

    fn next(&mut self, uidx: usize, available: &[usize]) -> Option<usize> {
        let scored = self.scores(uidx, available);
        untie::argmax(scored, &mut self.rng)
    }

    fn next_list(&mut self, uidx: usize, available: &[usize], k: usize) -> Vec<usize> {
        let scored = self.scores(uidx, available);
        untie::top_k(scored, k, &mut self.rng)
    }

    fn update(&mut self, uidx: usize, iidx: usize, value: f64) {
        if uidx >= self.num_users || iidx >= self.num_items {
            return;
        }

        self.users[uidx].add(iidx, 1.0, value);
        self.items[iidx].add(uidx, 1.0, value);

        if let Some(h) = self.item_clusters.cluster_of(iidx) {
            self.update_users(h, uidx, iidx, value);
            self.update_items(h, iidx);
        }

        self.user_times[uidx] += 1;
        self.item_times[iidx] += 1;
        self.iteration += 1;
    }
}
