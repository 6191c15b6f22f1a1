//! Graph clustering substrate for the clustering bandits.
//!
//! Nodes are dense indices and edges live in per-node adjacency sets, so the
//! partition built on top of a graph refers to members by index only.

pub mod clusters;
pub mod components;
pub mod generators;

pub use clusters::Clusters;
pub use components::{connected_components, connected_components_within};
pub use generators::{CompleteGraph, EdgeProbability, EmptyGraph, ErdosRenyi, GraphGenerator};

use indexmap::IndexSet;

/// Undirected, unweighted graph over `0..num_nodes`.
///
/// Adjacency sets keep insertion order, so neighbour iteration is
/// reproducible for a given construction sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    adjacency: Vec<IndexSet<usize>>,
    num_edges: usize,
}

impl Graph {
    /// Graph with `num_nodes` isolated nodes.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            adjacency: vec![IndexSet::new(); num_nodes],
            num_edges: 0,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Adds the edge `{a, b}`. Self loops and unknown nodes are ignored.
    ///
    /// Returns whether the edge is new.
    pub fn add_edge(&mut self, a: usize, b: usize) -> bool {
        if a == b || a >= self.num_nodes() || b >= self.num_nodes() {
            return false;
        }
        if !self.adjacency[a].insert(b) {
            return false;
        }
        self.adjacency[b].insert(a);
        self.num_edges += 1;
        true
    }

    /// Removes the edge `{a, b}`, returning whether it existed.
    pub fn remove_edge(&mut self, a: usize, b: usize) -> bool {
        let removed = self
            .adjacency
            .get_mut(a)
            .is_some_and(|neighbours| neighbours.swap_remove(&b));
        if removed {
            if let Some(neighbours) = self.adjacency.get_mut(b) {
                neighbours.swap_remove(&a);
            }
            self.num_edges -= 1;
        }
        removed
    }

    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|neighbours| neighbours.contains(&b))
    }

    pub fn neighbours(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency
            .get(node)
            .into_iter()
            .flat_map(|neighbours| neighbours.iter().copied())
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency.get(node).map_or(0, IndexSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_are_undirected() {
        let mut graph = Graph::new(3);
        assert!(graph.add_edge(0, 1));
        assert!(!graph.add_edge(1, 0));
        assert!(!graph.add_edge(2, 2));
        assert!(!graph.add_edge(0, 5));
        assert_eq!(graph.num_edges(), 1);
        assert!(graph.contains_edge(1, 0));

        assert!(graph.remove_edge(1, 0));
        assert!(!graph.remove_edge(0, 1));
        assert_eq!(graph.num_edges(), 0);
        assert_eq!(graph.degree(0), 0);
    }

    #[test]
    fn test_neighbours_keep_insertion_order() {
        let mut graph = Graph::new(3);
        graph.add_edge(2, 1);
        graph.add_edge(2, 0);
        assert_eq!(graph.neighbours(2).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(graph.degree(2), 2);
        assert_eq!(graph.neighbours(9).count(), 0);
    }
}
