use super::{AggregationScheme, MisAggregation, NodeGraph};
use smallvec::SmallVec;
use std::cmp::Reverse;

pub(super) const UNAGGREGATED: usize = usize::MAX;

/// Local graphs with at most this many nodes are aggregated with MIS by [UncoupledMisAggregation]
pub const MIS_SWITCH_NODES: usize = 64;

/// Greedy aggregation that ignores couplings to other ranks
#[derive(Debug, Clone, Copy, Default)]
pub struct UncoupledAggregation;

impl AggregationScheme for UncoupledAggregation {
    fn aggregate(&self, graph: &NodeGraph) -> (Vec<usize>, usize) {
        let mut aggs = vec![UNAGGREGATED; graph.num_nodes()];
        let mut num_aggs = 0;

        // phase 1: neighbourhoods that are still completely free become aggregates
        for node in 0..graph.num_nodes() {
            if aggs[node] != UNAGGREGATED {
                continue;
            }
            if graph.neighbors(node).iter().all(|nb| aggs[*nb] == UNAGGREGATED) {
                aggs[node] = num_aggs;
                for nb in graph.neighbors(node) {
                    aggs[*nb] = num_aggs;
                }
                num_aggs += 1;
            }
        }

        // phase 2
        attach_to_neighbors(graph, &mut aggs, num_aggs);

        // phase 3
        num_aggs = aggregate_leftovers(graph, &mut aggs, num_aggs);

        (aggs, num_aggs)
    }
}

/// Uncoupled aggregation on large local graphs, MIS on small ones
#[derive(Debug, Clone, Copy, Default)]
pub struct UncoupledMisAggregation;

impl AggregationScheme for UncoupledMisAggregation {
    fn aggregate(&self, graph: &NodeGraph) -> (Vec<usize>, usize) {
        if graph.num_nodes() > MIS_SWITCH_NODES {
            UncoupledAggregation.aggregate(graph)
        } else {
            MisAggregation.aggregate(graph)
        }
    }
}

/// Attach each free node to the adjacent aggregate it has the most connections to.
///
/// Ties go to the smaller aggregate, then to the lower aggregate id. Only nodes that were
/// aggregated before the call attract free nodes.
pub(super) fn attach_to_neighbors(graph: &NodeGraph, aggs: &mut [usize], num_aggs: usize) {
    let mut sizes = vec![0usize; num_aggs];
    for agg in aggs.iter().filter(|agg| **agg != UNAGGREGATED) {
        sizes[*agg] += 1;
    }
    let snapshot = aggs.to_vec();

    for node in 0..graph.num_nodes() {
        if snapshot[node] != UNAGGREGATED {
            continue;
        }

        let mut connections: SmallVec<[(usize, usize); 8]> = SmallVec::new();
        for nb in graph.neighbors(node) {
            let agg = snapshot[*nb];
            if agg == UNAGGREGATED {
                continue;
            }
            match connections.iter_mut().find(|(a, _)| *a == agg) {
                Some((_, count)) => *count += 1,
                None => connections.push((agg, 1)),
            }
        }

        let best = connections
            .iter()
            .max_by_key(|(agg, count)| (*count, Reverse(sizes[*agg]), Reverse(*agg)))
            .map(|(agg, _)| *agg);

        if let Some(agg) = best {
            aggs[node] = agg;
            sizes[agg] += 1;
        }
    }
}

/// Every node that is still free starts a new aggregate together with its free neighbours
pub(super) fn aggregate_leftovers(graph: &NodeGraph, aggs: &mut [usize], mut num_aggs: usize) -> usize {
    for node in 0..graph.num_nodes() {
        if aggs[node] != UNAGGREGATED {
            continue;
        }
        aggs[node] = num_aggs;
        for nb in graph.neighbors(node) {
            if aggs[*nb] == UNAGGREGATED {
                aggs[*nb] = num_aggs;
            }
        }
        num_aggs += 1;
    }
    num_aggs
}
