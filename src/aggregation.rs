//! Node-based aggregation of a matrix block into non-overlapping aggregates.
//!
//! A block is first amalgamated into a node graph (`block_size` rows per node, weak couplings
//! dropped), then one of the [AggregationScheme]s partitions the nodes. Local aggregate ids are
//! made globally unique with an exclusive prefix sum over the per-rank counts.

mod context;
mod graph;
mod metis;
mod mis;
mod uncoupled;

pub use context::AggregationContext;
pub use graph::NodeGraph;
pub use metis::MetisAggregation;
pub use mis::MisAggregation;
pub use uncoupled::{UncoupledAggregation, UncoupledMisAggregation};

use crate::comm::{exclusive_offset, Communicator};
use crate::{AmgError, NullSpace};
use sparse_matrix::CrsMatrix;
use std::fmt;
use std::str::FromStr;

/// Coarsening heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    Uncoupled,
    UncoupledMis,
    Mis,
    Metis,
}

impl FromStr for AggregationType {
    type Err = AmgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Uncoupled" => Ok(Self::Uncoupled),
            "Uncoupled-MIS" => Ok(Self::UncoupledMis),
            "MIS" => Ok(Self::Mis),
            "METIS" => Ok(Self::Metis),
            _ => Err(AmgError::config(format!(
                "unknown aggregation type '{}' (expected Uncoupled, Uncoupled-MIS, MIS or METIS)",
                s
            ))),
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Uncoupled => write!(f, "Uncoupled"),
            Self::UncoupledMis => write!(f, "Uncoupled-MIS"),
            Self::Mis => write!(f, "MIS"),
            Self::Metis => write!(f, "METIS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationParams {
    pub kind: AggregationType,
    /// Strength-of-connection cutoff; 0 keeps every structural nonzero
    pub threshold: f64,
    /// Target aggregate size of the METIS scheme
    pub nodes_per_aggregate: usize,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            kind: AggregationType::Uncoupled,
            threshold: 0.0,
            nodes_per_aggregate: 9,
        }
    }
}

/// Partitioning strategy over a node graph
pub trait AggregationScheme {
    /// Aggregate id (dense, from 0) of every node, and the number of aggregates
    fn aggregate(&self, graph: &NodeGraph) -> (Vec<usize>, usize);
}

pub fn scheme(params: &AggregationParams) -> Box<dyn AggregationScheme> {
    match params.kind {
        AggregationType::Uncoupled => Box::new(UncoupledAggregation),
        AggregationType::UncoupledMis => Box::new(UncoupledMisAggregation),
        AggregationType::Mis => Box::new(MisAggregation),
        AggregationType::Metis => Box::new(MetisAggregation {
            nodes_per_aggregate: params.nodes_per_aggregate,
        }),
    }
}

/// Rank-local aggregation result
///
/// `partition[row] < num_local` is the local aggregate of an owned row; larger values mark rows
/// that belong to an aggregate of another rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAggregates {
    pub partition: Vec<usize>,
    pub num_local: usize,
}

/// Partition of the rows of a block into globally numbered aggregates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalAggregates {
    /// Global aggregate id per local row, `None` for rows of remote aggregates
    pub partition: Vec<Option<usize>>,
    pub num_local: usize,
    pub num_global: usize,
    /// Global id of the first local aggregate
    pub offset: usize,
}

/// Aggregate the rows of a square block, `block_size` rows per node.
pub fn aggregate(
    a: &CrsMatrix,
    params: &AggregationParams,
    block_size: usize,
    nullspace: &NullSpace,
) -> Result<LocalAggregates, AmgError> {
    if nullspace.dim() == 0 {
        return Err(AmgError::config("null space dimension not given"));
    }
    if nullspace.rows() != a.num_rows() {
        return Err(AmgError::Structure(format!(
            "null space has {} rows but the block has {}",
            nullspace.rows(),
            a.num_rows()
        )));
    }

    let graph = NodeGraph::from_matrix(a, block_size, params.threshold)?;
    let (node_aggs, num_local) = scheme(params).aggregate(&graph);

    let partition = (0..a.num_rows()).map(|row| node_aggs[row / block_size]).collect();

    Ok(LocalAggregates {
        partition,
        num_local,
    })
}

/// Add this rank's prefix-sum offset to the local aggregate ids; rows of remote aggregates get `None`
pub fn resolve_global_aggregates(
    local: &LocalAggregates,
    comm: &dyn Communicator,
) -> GlobalAggregates {
    let counts = comm.gather_counts(local.num_local);
    let (offset, num_global) = exclusive_offset(&counts, comm.rank());

    let partition = local
        .partition
        .iter()
        .map(|&agg| (agg < local.num_local).then(|| agg + offset))
        .collect();

    GlobalAggregates {
        partition,
        num_local: local.num_local,
        num_global,
        offset,
    }
}

/// Pressure partition inherited from the velocity partition.
///
/// Requires that pressure row `i` and velocity rows `i * nv .. i * nv + nv` belong to the same
/// node; all velocity rows of a node must therefore share one aggregate.
pub fn derive_pressure_partition(
    velocity: &GlobalAggregates,
    velocity_dofs_per_node: usize,
) -> Result<GlobalAggregates, AmgError> {
    let nv = velocity_dofs_per_node;
    if nv == 0 || velocity.partition.len() % nv != 0 {
        return Err(AmgError::Structure(format!(
            "{} velocity rows cannot be grouped into nodes of {} dofs",
            velocity.partition.len(),
            nv
        )));
    }

    let partition = velocity
        .partition
        .chunks(nv)
        .enumerate()
        .map(|(node, node_rows)| {
            if node_rows.iter().all(|agg| *agg == node_rows[0]) {
                Ok(node_rows[0])
            } else {
                Err(AmgError::Structure(format!(
                    "velocity dofs of node {} are spread over different aggregates",
                    node
                )))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GlobalAggregates {
        partition,
        ..velocity.clone()
    })
}
