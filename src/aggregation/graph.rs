use crate::AmgError;
use smallvec::SmallVec;
use sparse_matrix::CrsMatrix;

type Neighbors = SmallVec<[usize; 8]>;

/// Amalgamated graph of a matrix block: one vertex per node, no self loops
#[derive(Debug, Clone)]
pub struct NodeGraph {
    adjacency: Vec<Neighbors>,
}

impl NodeGraph {
    /// Build the node graph of a square block.
    ///
    /// Rows `node * block_size .. (node + 1) * block_size` form one node. Nodes `I != J` are
    /// connected if some entry `a_ij` (row i in I, column j in J) is strong:
    /// `threshold == 0` or `|a_ij| > threshold * sqrt(|a_ii a_jj|)`.
    /// Columns that are not owned rows of this rank are ignored.
    pub fn from_matrix(a: &CrsMatrix, block_size: usize, threshold: f64) -> Result<Self, AmgError> {
        let num_rows = a.num_rows();
        if block_size == 0 || num_rows % block_size != 0 {
            return Err(AmgError::Structure(format!(
                "{} rows cannot be amalgamated into nodes of {} rows",
                num_rows, block_size
            )));
        }

        let diag = a.extract_diagonal();
        let row_map = a.row_map();
        let domain_map = a.domain_map();
        let mut adjacency = vec![Neighbors::new(); num_rows / block_size];

        for r in 0..num_rows {
            let node_r = r / block_size;
            let (cols, vals) = a.row(r);
            for (c, v) in cols.iter().zip(vals.iter()) {
                let c_row = match row_map.lid(domain_map.gid(*c)) {
                    Some(c_row) => c_row,
                    None => continue,
                };
                let node_c = c_row / block_size;
                if node_c == node_r {
                    continue;
                }

                let strong =
                    threshold == 0.0 || v.abs() > threshold * (diag[r] * diag[c_row]).abs().sqrt();
                if strong {
                    adjacency[node_r].push(node_c);
                    adjacency[node_c].push(node_r);
                }
            }
        }

        Ok(Self::from_adjacency(adjacency))
    }

    pub(crate) fn from_adjacency(mut adjacency: Vec<Neighbors>) -> Self {
        for neighbors in adjacency.iter_mut() {
            neighbors.sort_unstable();
            neighbors.dedup();
        }
        Self { adjacency }
    }

    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::tests::grid_laplacian;
    use sparse_matrix::{IndexMap, SparseMatrix};
    use std::sync::Arc;

    #[test]
    fn amalgamated_grid_graph() {
        let a = grid_laplacian(3, 3, 2);
        let graph = NodeGraph::from_matrix(&a, 2, 0.0).unwrap();

        assert_eq!(graph.num_nodes(), 9);
        assert_eq!(graph.neighbors(4), &[1, 3, 5, 7]);
        assert_eq!(graph.degree(0), 2);
    }

    #[test]
    fn weak_couplings_are_dropped() {
        let map = Arc::new(IndexMap::contiguous(0, 3));
        let mut sm = SparseMatrix::new(map.clone());
        for i in 0..3 {
            sm.sum_into_global([i, i], 1.0).unwrap();
        }
        sm.sum_into_global([0, 1], -0.5).unwrap();
        sm.sum_into_global([1, 0], -0.5).unwrap();
        sm.sum_into_global([1, 2], -0.01).unwrap();
        sm.sum_into_global([2, 1], -0.01).unwrap();
        let a = sm.complete(map).unwrap();

        let graph = NodeGraph::from_matrix(&a, 1, 0.1).unwrap();
        assert_eq!(graph.neighbors(1), &[0]);
        assert!(graph.neighbors(2).is_empty());

        let graph = NodeGraph::from_matrix(&a, 1, 0.0).unwrap();
        assert_eq!(graph.neighbors(1), &[0, 2]);
    }

    #[test]
    fn bad_block_size() {
        let a = grid_laplacian(3, 1, 1);
        assert!(NodeGraph::from_matrix(&a, 2, 0.0).is_err());
    }
}
