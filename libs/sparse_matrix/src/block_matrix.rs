use crate::crs_matrix::check_len;
use crate::{CrsMatrix, IndexMap, Operator, SparseMatrixError};
use std::sync::Arc;

/// Index of the velocity field in a [MapExtractor] / [BlockMatrix]
pub const VELOCITY: usize = 0;
/// Index of the pressure field in a [MapExtractor] / [BlockMatrix]
pub const PRESSURE: usize = 1;

/// Split of a full map into two disjoint sub-maps that cover it exactly once
#[derive(Clone, Debug)]
pub struct MapExtractor {
    full: Arc<IndexMap>,
    maps: [Arc<IndexMap>; 2],
    /// (sub-map, local id in the sub-map) of every local id of the full map
    positions: Vec<(usize, usize)>,
}

impl MapExtractor {
    pub fn new(full: Arc<IndexMap>, maps: [Arc<IndexMap>; 2]) -> Result<Self, SparseMatrixError> {
        let mut positions: Vec<Option<(usize, usize)>> = vec![None; full.len()];

        for (m, sub_map) in maps.iter().enumerate() {
            for (sub_lid, gid) in sub_map.gids().iter().enumerate() {
                let lid = full.lid(*gid).ok_or_else(|| {
                    SparseMatrixError::InvalidSplit(format!(
                        "gid {} of sub-map {} is not in the full map",
                        gid, m
                    ))
                })?;
                if positions[lid].replace((m, sub_lid)).is_some() {
                    return Err(SparseMatrixError::InvalidSplit(format!(
                        "gid {} is part of both sub-maps",
                        gid
                    )));
                }
            }
        }

        let positions = positions
            .into_iter()
            .enumerate()
            .map(|(lid, pos)| {
                pos.ok_or_else(|| {
                    SparseMatrixError::InvalidSplit(format!(
                        "gid {} is not covered by either sub-map",
                        full.gid(lid)
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            full,
            maps,
            positions,
        })
    }

    /// Velocity/pressure split of a node-interleaved map.
    ///
    /// Every node owns `velocity_dofs_per_node` consecutive velocity dofs followed by one pressure dof.
    pub fn from_node_stride(
        full: Arc<IndexMap>,
        velocity_dofs_per_node: usize,
    ) -> Result<Self, SparseMatrixError> {
        let stride = velocity_dofs_per_node + 1;
        if velocity_dofs_per_node == 0 || full.len() % stride != 0 {
            return Err(SparseMatrixError::InvalidSplit(format!(
                "{} dofs cannot be split into nodes of {} velocity + 1 pressure dofs",
                full.len(),
                velocity_dofs_per_node
            )));
        }

        let mut vel_gids = Vec::with_capacity(full.len() / stride * velocity_dofs_per_node);
        let mut pre_gids = Vec::with_capacity(full.len() / stride);
        for (lid, gid) in full.gids().iter().enumerate() {
            if lid % stride < velocity_dofs_per_node {
                vel_gids.push(*gid);
            } else {
                pre_gids.push(*gid);
            }
        }

        Self::new(
            full,
            [
                Arc::new(IndexMap::from_gids(vel_gids)?),
                Arc::new(IndexMap::from_gids(pre_gids)?),
            ],
        )
    }

    /// Build the full map as the concatenation of two sub-maps
    pub fn from_maps(maps: [Arc<IndexMap>; 2]) -> Result<Self, SparseMatrixError> {
        let gids = maps[0].gids().iter().chain(maps[1].gids().iter()).copied().collect();
        Self::new(Arc::new(IndexMap::from_gids(gids)?), maps)
    }

    pub fn full_map(&self) -> &Arc<IndexMap> {
        &self.full
    }

    pub fn map(&self, block: usize) -> &Arc<IndexMap> {
        &self.maps[block]
    }

    pub(crate) fn position(&self, lid: usize) -> (usize, usize) {
        self.positions[lid]
    }

    /// Copy the entries of `block` out of a full vector
    pub fn extract_vector(&self, full: &[f64], block: usize) -> Result<Vec<f64>, SparseMatrixError> {
        check_len("extract_vector", self.full.len(), full.len())?;

        let mut part = vec![0.0; self.maps[block].len()];
        for (lid, &(b, sub_lid)) in self.positions.iter().enumerate() {
            if b == block {
                part[sub_lid] = full[lid];
            }
        }
        Ok(part)
    }

    /// Write the entries of `block` into a full vector
    pub fn insert_vector(
        &self,
        part: &[f64],
        block: usize,
        full: &mut [f64],
    ) -> Result<(), SparseMatrixError> {
        check_len("insert_vector (full)", self.full.len(), full.len())?;
        check_len("insert_vector (part)", self.maps[block].len(), part.len())?;

        for (lid, &(b, sub_lid)) in self.positions.iter().enumerate() {
            if b == block {
                full[lid] = part[sub_lid];
            }
        }
        Ok(())
    }
}

/// 2x2 block operator over a [MapExtractor]
///
/// `block(i, j)` has the row map `Map(i)` and the domain map `Map(j)` of the extractor.
#[derive(Clone, Debug)]
pub struct BlockMatrix {
    blocks: [[Arc<CrsMatrix>; 2]; 2],
    extractor: Arc<MapExtractor>,
}

impl BlockMatrix {
    pub fn new(
        blocks: [[Arc<CrsMatrix>; 2]; 2],
        extractor: Arc<MapExtractor>,
    ) -> Result<Self, SparseMatrixError> {
        for (i, block_row) in blocks.iter().enumerate() {
            for (j, block) in block_row.iter().enumerate() {
                if !block.row_map().same_as(extractor.map(i)) {
                    return Err(SparseMatrixError::MapMismatch("block matrix range map"));
                }
                if !block.domain_map().same_as(extractor.map(j)) {
                    return Err(SparseMatrixError::MapMismatch("block matrix domain map"));
                }
            }
        }

        Ok(Self { blocks, extractor })
    }

    pub fn block(&self, i: usize, j: usize) -> &Arc<CrsMatrix> {
        &self.blocks[i][j]
    }

    pub fn extractor(&self) -> &Arc<MapExtractor> {
        &self.extractor
    }

    /// Block-wise product: (y_vel, y_pre) = A (x_vel, x_pre)
    pub fn apply_blocks(
        &self,
        x_vel: &[f64],
        x_pre: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), SparseMatrixError> {
        let mut y_vel = self.blocks[0][0].mul_vec(x_vel)?;
        let mut y_pre = self.blocks[1][0].mul_vec(x_vel)?;

        let y_vel_12 = self.blocks[0][1].mul_vec(x_pre)?;
        let y_pre_22 = self.blocks[1][1].mul_vec(x_pre)?;

        y_vel.iter_mut().zip(y_vel_12).for_each(|(y, z)| *y += z);
        y_pre.iter_mut().zip(y_pre_22).for_each(|(y, z)| *y += z);

        Ok((y_vel, y_pre))
    }

    /// Block-wise residual (b_vel, b_pre) - A (x_vel, x_pre)
    pub fn residual_blocks(
        &self,
        b_vel: &[f64],
        b_pre: &[f64],
        x_vel: &[f64],
        x_pre: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), SparseMatrixError> {
        check_len("residual_blocks (vel)", self.extractor.map(0).len(), b_vel.len())?;
        check_len("residual_blocks (pre)", self.extractor.map(1).len(), b_pre.len())?;

        let (mut r_vel, mut r_pre) = self.apply_blocks(x_vel, x_pre)?;
        r_vel.iter_mut().zip(b_vel).for_each(|(r, b)| *r = b - *r);
        r_pre.iter_mut().zip(b_pre).for_each(|(r, b)| *r = b - *r);

        Ok((r_vel, r_pre))
    }
}

impl Operator for BlockMatrix {
    fn range_map(&self) -> &Arc<IndexMap> {
        self.extractor.full_map()
    }

    fn domain_map(&self) -> &Arc<IndexMap> {
        self.extractor.full_map()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), SparseMatrixError> {
        check_len("apply (y)", self.extractor.full_map().len(), y.len())?;

        let x_vel = self.extractor.extract_vector(x, 0)?;
        let x_pre = self.extractor.extract_vector(x, 1)?;
        let (y_vel, y_pre) = self.apply_blocks(&x_vel, &x_pre)?;

        self.extractor.insert_vector(&y_vel, 0, y)?;
        self.extractor.insert_vector(&y_pre, 1, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SparseMatrix;

    fn interleaved_matrix(num_nodes: usize, nv: usize) -> CrsMatrix {
        let n = num_nodes * (nv + 1);
        let map = Arc::new(IndexMap::contiguous(0, n));
        let mut sm = SparseMatrix::new(map.clone());
        for i in 0..n {
            sm.sum_into_global([i, i], 2.0 + i as f64).unwrap();
            if i + 1 < n {
                sm.sum_into_global([i, i + 1], -1.0).unwrap();
                sm.sum_into_global([i + 1, i], -1.0).unwrap();
            }
        }
        sm.complete(map).unwrap()
    }

    #[test]
    fn node_stride_split() {
        let map = Arc::new(IndexMap::contiguous(0, 8));
        let ex = MapExtractor::from_node_stride(map, 3).unwrap();

        assert_eq!(ex.map(VELOCITY).gids(), &[0, 1, 2, 4, 5, 6]);
        assert_eq!(ex.map(PRESSURE).gids(), &[3, 7]);

        let full: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let pre = ex.extract_vector(&full, PRESSURE).unwrap();
        assert_eq!(pre, vec![3.0, 7.0]);

        let mut back = vec![0.0; 8];
        ex.insert_vector(&pre, PRESSURE, &mut back).unwrap();
        assert_eq!(back[7], 7.0);
        assert_eq!(back[6], 0.0);
    }

    #[test]
    fn bad_stride_rejected() {
        let map = Arc::new(IndexMap::contiguous(0, 7));
        assert!(matches!(
            MapExtractor::from_node_stride(map, 3),
            Err(SparseMatrixError::InvalidSplit(_))
        ));
    }

    #[test]
    fn overlapping_sub_maps_rejected() {
        let full = Arc::new(IndexMap::contiguous(0, 3));
        let res = MapExtractor::new(
            full,
            [
                Arc::new(IndexMap::contiguous(0, 2)),
                Arc::new(IndexMap::contiguous(1, 2)),
            ],
        );
        assert!(res.is_err());
    }

    #[test]
    fn split_preserves_operator() {
        let a = interleaved_matrix(4, 2);
        let ex = Arc::new(MapExtractor::from_node_stride(a.row_map().clone(), 2).unwrap());
        let blocks = a.split(ex).unwrap();

        assert_eq!(blocks.block(VELOCITY, VELOCITY).num_rows(), 8);
        assert_eq!(blocks.block(PRESSURE, PRESSURE).num_rows(), 4);
        assert_eq!(blocks.block(VELOCITY, PRESSURE).num_cols(), 4);

        let x: Vec<f64> = (0..12).map(|i| (i as f64).sin()).collect();
        let y_mono = a.mul_vec(&x).unwrap();
        let mut y_block = vec![0.0; 12];
        Operator::apply(&blocks, &x, &mut y_block).unwrap();

        for (m, b) in y_mono.iter().zip(y_block.iter()) {
            assert!((m - b).abs() < 1e-14);
        }
    }

    #[test]
    fn mismatched_blocks_rejected() {
        let a = Arc::new(interleaved_matrix(2, 1));
        let ex = Arc::new(MapExtractor::from_node_stride(a.row_map().clone(), 1).unwrap());

        let res = BlockMatrix::new([[a.clone(), a.clone()], [a.clone(), a]], ex);
        assert!(matches!(res, Err(SparseMatrixError::MapMismatch(_))));
    }
}
