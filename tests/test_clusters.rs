use proptest::prelude::*;

use bandicoot::graph::{connected_components_within, Clusters, Graph};
use bandicoot::SimError;

#[test]
fn test_divide_reuses_id_for_first_part() {
    let mut clusters = Clusters::single(6);
    let ids = clusters
        .divide(0, vec![vec![4, 5], vec![0, 2], vec![1, 3]])
        .unwrap();

    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(clusters.members(0), &[4, 5]);
    assert_eq!(clusters.members(1), &[0, 2]);
    assert_eq!(clusters.cluster_of(3), Some(2));
    assert_eq!(clusters.num_clusters(), 3);

    // a later split keeps earlier ids stable
    let ids = clusters.divide(1, vec![vec![2], vec![0]]).unwrap();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(clusters.members(0), &[4, 5]);
    assert_eq!(clusters.cluster_of(0), Some(3));
}

#[test]
fn test_divide_rejects_bad_partitions() {
    let mut clusters = Clusters::single(3);
    for parts in [
        vec![vec![0, 1]],
        vec![vec![0, 1], vec![1, 2]],
        vec![vec![0, 1, 2, 3]],
        vec![vec![0, 1, 2], vec![]],
    ] {
        let err = clusters.divide(0, parts).unwrap_err();
        assert!(matches!(err, SimError::InvalidPartition { .. }));
    }
    assert!(clusters.divide(4, vec![vec![0]]).is_err());
    assert_eq!(clusters, Clusters::single(3));
}

#[test]
fn test_components_split_a_cluster() {
    let mut graph = Graph::new(5);
    graph.add_edge(0, 1);
    graph.add_edge(3, 4);
    graph.add_edge(1, 2);
    graph.remove_edge(1, 2);

    let mut clusters = Clusters::single(5);
    let parts = connected_components_within(&graph, clusters.members(0));
    assert_eq!(parts, vec![vec![0, 1], vec![2], vec![3, 4]]);
    clusters.divide(0, parts).unwrap();
    assert_eq!(clusters, Clusters::from_graph(&graph));
}

/// A cluster of `n` elements and a random assignment of each to one of four
/// parts.
fn division() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (2usize..40).prop_flat_map(|n| {
        (Just(n), proptest::collection::vec(0usize..4, n))
    })
}

proptest! {
    #[test]
    fn prop_divide_covers_cluster_exactly_once((n, labels) in division()) {
        let mut clusters = Clusters::single(n);
        let mut parts: Vec<Vec<usize>> = vec![Vec::new(); 4];
        for (element, &label) in labels.iter().enumerate() {
            parts[label].push(element);
        }
        parts.retain(|part| !part.is_empty());
        let first = parts[0].clone();

        let ids = clusters.divide(0, parts.clone()).unwrap();
        prop_assert_eq!(ids[0], 0);
        prop_assert_eq!(clusters.members(0), first.as_slice());

        let mut union: Vec<usize> = ids
            .iter()
            .flat_map(|&id| clusters.members(id).iter().copied())
            .collect();
        union.sort_unstable();
        prop_assert_eq!(union, (0..n).collect::<Vec<_>>());

        for (&id, part) in ids.iter().zip(&parts) {
            for &element in part {
                prop_assert_eq!(clusters.cluster_of(element), Some(id));
            }
        }
    }
}
