use super::uncoupled::{aggregate_leftovers, attach_to_neighbors, UNAGGREGATED};
use super::{AggregationScheme, NodeGraph};

/// Aggregates rooted at a maximal independent set of the distance-two graph
///
/// Roots are picked greedily by ascending degree (then index), so boundary nodes are visited
/// first. Root neighbourhoods are disjoint; remaining nodes are attached to the neighbouring
/// aggregate with the most connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct MisAggregation;

impl AggregationScheme for MisAggregation {
    fn aggregate(&self, graph: &NodeGraph) -> (Vec<usize>, usize) {
        let n = graph.num_nodes();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|node| (graph.degree(*node), *node));

        let mut blocked = vec![false; n];
        let mut aggs = vec![UNAGGREGATED; n];
        let mut num_aggs = 0;

        for root in order {
            if blocked[root] {
                continue;
            }

            aggs[root] = num_aggs;
            blocked[root] = true;
            for nb in graph.neighbors(root) {
                if aggs[*nb] == UNAGGREGATED {
                    aggs[*nb] = num_aggs;
                }
                blocked[*nb] = true;
                for nb2 in graph.neighbors(*nb) {
                    blocked[*nb2] = true;
                }
            }
            num_aggs += 1;
        }

        attach_to_neighbors(graph, &mut aggs, num_aggs);
        let num_aggs = aggregate_leftovers(graph, &mut aggs, num_aggs);

        (aggs, num_aggs)
    }
}
