use std::collections::{HashSet, VecDeque};

use super::Graph;

/// Connected components over every node.
///
/// Members are sorted; components are ordered by their smallest node.
pub fn connected_components(graph: &Graph) -> Vec<Vec<usize>> {
    let nodes: Vec<usize> = (0..graph.num_nodes()).collect();
    connected_components_within(graph, &nodes)
}

/// Connected components of the subgraph induced by `nodes`.
///
/// Edges leaving the subset are not followed, so the cost is bounded by the
/// subset and its incident edges. Components are ordered by the first of
/// their nodes to appear in `nodes`.
pub fn connected_components_within(graph: &Graph, nodes: &[usize]) -> Vec<Vec<usize>> {
    let subset: HashSet<usize> = nodes.iter().copied().collect();
    let mut visited: HashSet<usize> = HashSet::with_capacity(nodes.len());
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for &start in nodes {
        if !visited.insert(start) {
            continue;
        }
        let mut component = vec![start];
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            for neighbour in graph.neighbours(node) {
                if subset.contains(&neighbour) && visited.insert(neighbour) {
                    component.push(neighbour);
                    queue.push_back(neighbour);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Graph {
        let mut graph = Graph::new(7);
        for (a, b) in [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)] {
            graph.add_edge(a, b);
        }
        graph
    }

    #[test]
    fn test_components_cover_all_nodes() {
        let components = connected_components(&two_triangles());
        assert_eq!(components, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
    }

    #[test]
    fn test_components_within_subset() {
        let mut graph = two_triangles();
        graph.add_edge(2, 3);
        // 1 and 5 are outside the subset, so 0-2-3-4 stays connected only via 2-3
        let components = connected_components_within(&graph, &[4, 0, 2, 3]);
        assert_eq!(components, vec![vec![0, 2, 3, 4]]);

        graph.remove_edge(2, 3);
        let components = connected_components_within(&graph, &[4, 0, 2, 3]);
        assert_eq!(components, vec![vec![3, 4], vec![0, 2]]);
    }
}
