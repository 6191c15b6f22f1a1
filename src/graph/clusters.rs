use std::collections::HashSet;

use super::{connected_components, Graph};
use crate::error::{Result, SimError};

/// Partition of `0..num_elements` into numbered clusters.
///
/// Membership is kept both ways: a lookup table from element to cluster id
/// and a member list per cluster. Cluster ids are dense and only grow.
#[derive(Clone, Debug, PartialEq)]
pub struct Clusters {
    cluster_of: Vec<usize>,
    members: Vec<Vec<usize>>,
}

impl Clusters {
    /// Everything in cluster 0.
    pub fn single(num_elements: usize) -> Self {
        Self {
            cluster_of: vec![0; num_elements],
            members: vec![(0..num_elements).collect()],
        }
    }

    /// Every element alone in its own cluster, cluster `k` holding element `k`.
    pub fn singletons(num_elements: usize) -> Self {
        Self {
            cluster_of: (0..num_elements).collect(),
            members: (0..num_elements).map(|element| vec![element]).collect(),
        }
    }

    /// One cluster per connected component of `graph`.
    pub fn from_graph(graph: &Graph) -> Self {
        let members = connected_components(graph);
        let mut cluster_of = vec![0; graph.num_nodes()];
        for (cluster, component) in members.iter().enumerate() {
            for &node in component {
                cluster_of[node] = cluster;
            }
        }
        Self { cluster_of, members }
    }

    /// Builds a partition from its pieces; piece `k` becomes cluster `k`.
    pub fn from_partition(num_elements: usize, pieces: Vec<Vec<usize>>) -> Result<Self> {
        let mut cluster_of = vec![usize::MAX; num_elements];
        for (cluster, piece) in pieces.iter().enumerate() {
            for &element in piece {
                match cluster_of.get_mut(element) {
                    Some(slot) if *slot == usize::MAX => *slot = cluster,
                    Some(_) => {
                        return Err(SimError::InvalidPartition {
                            message: format!("element {element} appears twice"),
                        })
                    }
                    None => {
                        return Err(SimError::InvalidPartition {
                            message: format!("element {element} is out of range"),
                        })
                    }
                }
            }
        }
        if let Some(missing) = cluster_of.iter().position(|&c| c == usize::MAX) {
            return Err(SimError::InvalidPartition {
                message: format!("element {missing} is not covered"),
            });
        }
        Ok(Self {
            cluster_of,
            members: pieces,
        })
    }

    pub fn num_elements(&self) -> usize {
        self.cluster_of.len()
    }

    pub fn num_clusters(&self) -> usize {
        self.members.len()
    }

    pub fn cluster_of(&self, element: usize) -> Option<usize> {
        self.cluster_of.get(element).copied()
    }

    pub fn members(&self, cluster: usize) -> &[usize] {
        self.members.get(cluster).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Splits `cluster` into `parts`.
    ///
    /// The parts must cover the cluster's members exactly once. The first
    /// part keeps the id `cluster`, the others get fresh ids appended at the
    /// end. Returns the ids of the parts, in order.
    pub fn divide(&mut self, cluster: usize, parts: Vec<Vec<usize>>) -> Result<Vec<usize>> {
        if cluster >= self.members.len() {
            return Err(SimError::InvalidPartition {
                message: format!("cluster {cluster} does not exist"),
            });
        }
        if parts.is_empty() || parts.iter().any(Vec::is_empty) {
            return Err(SimError::InvalidPartition {
                message: "a division needs non-empty parts".to_string(),
            });
        }

        let original: HashSet<usize> = self.members[cluster].iter().copied().collect();
        let mut seen = HashSet::with_capacity(original.len());
        for &element in parts.iter().flatten() {
            if !original.contains(&element) || !seen.insert(element) {
                return Err(SimError::InvalidPartition {
                    message: format!("element {element} does not split cluster {cluster} exactly"),
                });
            }
        }
        if seen.len() != original.len() {
            return Err(SimError::InvalidPartition {
                message: format!("division of cluster {cluster} loses elements"),
            });
        }

        let mut ids = Vec::with_capacity(parts.len());
        for (k, part) in parts.into_iter().enumerate() {
            let id = if k == 0 {
                cluster
            } else {
                self.members.push(Vec::new());
                self.members.len() - 1
            };
            for &element in &part {
                self.cluster_of[element] = id;
            }
            self.members[id] = part;
            ids.push(id);
        }
        Ok(ids)
    }
}
