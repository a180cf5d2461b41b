use crate::prolongator::Transfer;
use crate::AmgError;
use sparse_matrix::{BlockMatrix, CrsMatrix, MapExtractor, PRESSURE, VELOCITY};
use std::sync::Arc;

/// Galerkin triple product `R A P`, formed as `(R A) P`
pub fn galerkin_product(r: &CrsMatrix, a: &CrsMatrix, p: &CrsMatrix) -> Result<CrsMatrix, AmgError> {
    let ra = r.multiply(a)?;
    Ok(ra.multiply(p)?)
}

/// Coarse 2x2 block system from the velocity and pressure transfer pairs.
///
/// Block `(i, j)` is `R_i A_ij P_j`; the coarse map extractor concatenates the coarse velocity and
/// pressure maps.
pub fn coarsen_blocks(
    a: &BlockMatrix,
    velocity: &Transfer,
    pressure: &Transfer,
) -> Result<BlockMatrix, AmgError> {
    let transfers = [velocity, pressure];

    let block = |i: usize, j: usize| -> Result<Arc<CrsMatrix>, AmgError> {
        Ok(Arc::new(galerkin_product(
            &transfers[i].r,
            a.block(i, j),
            &transfers[j].p,
        )?))
    };

    let extractor = MapExtractor::from_maps([
        velocity.p.domain_map().clone(),
        pressure.p.domain_map().clone(),
    ])?;

    Ok(BlockMatrix::new(
        [
            [block(VELOCITY, VELOCITY)?, block(VELOCITY, PRESSURE)?],
            [block(PRESSURE, VELOCITY)?, block(PRESSURE, PRESSURE)?],
        ],
        Arc::new(extractor),
    )?)
}
