//! Tentative (unsmoothed aggregation) prolongator.

use crate::aggregation::GlobalAggregates;
use crate::{AmgError, NullSpace};
use nalgebra::DMatrix;
use rayon::prelude::*;
use sparse_matrix::{CrsMatrix, IndexMap, SparseMatrix, SparseMatrixError};
use std::sync::Arc;

/// Tentative prolongator of one field and the coarse null space it induces
#[derive(Debug, Clone)]
pub struct TentativeProlongator {
    /// Fine row map x coarse domain map, orthonormal columns per aggregate
    pub p: CrsMatrix,
    /// Stacked `R` factors, `nullspace_dim` rows per local aggregate
    pub next_nullspace: NullSpace,
}

/// Build `P_tent` and the coarse null space from an aggregate partition.
///
/// Aggregate `g` (global id) owns the coarse gids `g * n + domain_offset .. (g + 1) * n + domain_offset`
/// where `n` is the null-space dimension. On every aggregate the restriction of the null space is
/// factored as `Q R`; `Q` fills the aggregate's block of `P_tent` and `R` its rows of the coarse null space.
pub fn build_tentative_prolongator(
    row_map: &Arc<IndexMap>,
    aggregates: &GlobalAggregates,
    nullspace: &NullSpace,
    domain_offset: usize,
) -> Result<TentativeProlongator, AmgError> {
    let n = nullspace.dim();
    if n == 0 {
        return Err(AmgError::config("null space dimension not given"));
    }
    if nullspace.rows() != row_map.len() || aggregates.partition.len() != row_map.len() {
        return Err(AmgError::Structure(format!(
            "row map has {} rows, null space {} and aggregate partition {}",
            row_map.len(),
            nullspace.rows(),
            aggregates.partition.len()
        )));
    }

    let agg_rows = rows_per_aggregate(aggregates)?;

    let first_coarse = aggregates.offset * n + domain_offset;
    let coarse_map = Arc::new(IndexMap::contiguous(first_coarse, aggregates.num_local * n));

    let factors = agg_rows
        .par_iter()
        .enumerate()
        .map(|(agg, rows)| {
            if rows.len() < n {
                return Err(AmgError::AggregateTooSmall {
                    aggregate: agg + aggregates.offset,
                    rows: rows.len(),
                    nullspace_dim: n,
                });
            }

            let b_agg = DMatrix::from_fn(rows.len(), n, |i, j| nullspace.get(rows[i], j));
            let qr = b_agg.qr();
            let (q, r) = (qr.q(), qr.r());

            let first_col = first_coarse + agg * n;
            let entries = rows
                .iter()
                .enumerate()
                .flat_map(|(i, row)| {
                    let q = &q;
                    (0..n).map(move |j| ([row_map.gid(*row), first_col + j], q[(i, j)]))
                })
                .collect::<Vec<_>>();

            Ok((entries, r))
        })
        .collect::<Result<Vec<_>, AmgError>>()?;

    let mut p = SparseMatrix::new(row_map.clone());
    let mut next_nullspace = NullSpace::zeros(aggregates.num_local * n, n);

    for (agg, (entries, r)) in factors.into_iter().enumerate() {
        p.insert_group(entries)?;
        for i in 0..n {
            for j in 0..n {
                next_nullspace.set(agg * n + i, j, r[(i, j)]);
            }
        }
    }

    let p = p.complete(coarse_map).map_err(|e| match e {
        SparseMatrixError::MissingColumn(gid) => AmgError::MissingCoarseColumn(gid),
        other => other.into(),
    })?;

    Ok(TentativeProlongator { p, next_nullspace })
}

// local rows of every local aggregate, in ascending order
fn rows_per_aggregate(aggregates: &GlobalAggregates) -> Result<Vec<Vec<usize>>, AmgError> {
    let mut agg_rows = vec![Vec::new(); aggregates.num_local];

    for (row, agg) in aggregates.partition.iter().enumerate() {
        let Some(agg) = agg else { continue };

        let local = agg
            .checked_sub(aggregates.offset)
            .filter(|local| *local < aggregates.num_local)
            .ok_or_else(|| {
                AmgError::Structure(format!(
                    "row {} belongs to aggregate {}, which is not owned by this rank",
                    row, agg
                ))
            })?;
        agg_rows[local].push(row);
    }

    Ok(agg_rows)
}
