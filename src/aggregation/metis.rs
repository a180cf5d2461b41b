use super::{AggregationScheme, NodeGraph};
use std::collections::VecDeque;

/// Balanced aggregates from recursive graph bisection
///
/// The graph is split into `ceil(nodes / nodes_per_aggregate)` parts. Each bisection orders the
/// nodes of a part breadth-first from a pseudo-peripheral node and cuts the ordering in
/// proportion to the number of parts on either side.
#[derive(Debug, Clone, Copy)]
pub struct MetisAggregation {
    pub nodes_per_aggregate: usize,
}

impl AggregationScheme for MetisAggregation {
    fn aggregate(&self, graph: &NodeGraph) -> (Vec<usize>, usize) {
        let n = graph.num_nodes();
        if n == 0 {
            return (Vec::new(), 0);
        }

        let per_aggregate = self.nodes_per_aggregate.max(1);
        let parts = ((n + per_aggregate - 1) / per_aggregate).max(1);

        let mut aggs = vec![0; n];
        let mut num_aggs = 0;
        bisect(graph, (0..n).collect(), parts, &mut num_aggs, &mut aggs);

        (aggs, num_aggs)
    }
}

fn bisect(graph: &NodeGraph, nodes: Vec<usize>, parts: usize, next_id: &mut usize, aggs: &mut [usize]) {
    let parts = parts.min(nodes.len());
    if parts <= 1 {
        for node in nodes {
            aggs[node] = *next_id;
        }
        *next_id += 1;
        return;
    }

    let mut order = bfs_order(graph, &nodes);

    let left_parts = parts / 2;
    let split = ((nodes.len() * left_parts + parts / 2) / parts).clamp(1, nodes.len() - 1);
    let right = order.split_off(split);

    bisect(graph, order, left_parts, next_id, aggs);
    bisect(graph, right, parts - left_parts, next_id, aggs);
}

// breadth-first ordering of a node subset; disconnected pieces are appended in turn
fn bfs_order(graph: &NodeGraph, nodes: &[usize]) -> Vec<usize> {
    let mut in_set = vec![false; graph.num_nodes()];
    nodes.iter().for_each(|node| in_set[*node] = true);

    let mut visited = vec![false; graph.num_nodes()];
    let mut order = Vec::with_capacity(nodes.len());

    let mut pending = nodes.to_vec();
    pending.sort_by_key(|node| (graph.degree(*node), *node));

    for &seed in pending.iter() {
        if visited[seed] {
            continue;
        }
        let start = pseudo_peripheral(graph, seed, &in_set);
        bfs(graph, start, &in_set, &mut visited, &mut order);
    }

    order
}

// last node reached by a breadth-first search from `seed`
fn pseudo_peripheral(graph: &NodeGraph, seed: usize, in_set: &[bool]) -> usize {
    let mut visited = vec![false; graph.num_nodes()];
    let mut order = Vec::new();
    bfs(graph, seed, in_set, &mut visited, &mut order);
    order.last().copied().unwrap_or(seed)
}

fn bfs(graph: &NodeGraph, start: usize, in_set: &[bool], visited: &mut [bool], order: &mut Vec<usize>) {
    let mut queue = VecDeque::from([start]);
    visited[start] = true;

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for nb in graph.neighbors(node) {
            if in_set[*nb] && !visited[*nb] {
                visited[*nb] = true;
                queue.push_back(*nb);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::tests::{assert_is_partition, grid_laplacian};
    use smallvec::SmallVec;

    #[test]
    fn balanced_parts() {
        let a = grid_laplacian(10, 10, 1);
        let graph = NodeGraph::from_matrix(&a, 1, 0.0).unwrap();

        let (aggs, num) = MetisAggregation {
            nodes_per_aggregate: 9,
        }
        .aggregate(&graph);

        assert_eq!(num, 12);
        assert_is_partition(&aggs, num);

        let mut sizes = vec![0; num];
        aggs.iter().for_each(|agg| sizes[*agg] += 1);
        assert!(sizes.iter().all(|s| *s >= 7 && *s <= 10));
    }

    #[test]
    fn disconnected_graph() {
        let graph = NodeGraph::from_adjacency(vec![SmallVec::new(); 5]);
        let (aggs, num) = MetisAggregation {
            nodes_per_aggregate: 2,
        }
        .aggregate(&graph);

        assert_eq!(num, 3);
        assert_is_partition(&aggs, num);
    }
}
