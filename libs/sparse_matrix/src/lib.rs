extern crate bytes;
extern crate nalgebra;
extern crate rayon;

mod aij_matrix;
mod block_matrix;
mod crs_matrix;
mod error;
mod index_map;
mod sparse_matrix;
pub mod vector_ops;

pub use aij_matrix::AIJMatrixBinary;
pub use block_matrix::{BlockMatrix, MapExtractor, PRESSURE, VELOCITY};
pub use crs_matrix::CrsMatrix;
pub use error::SparseMatrixError;
pub use index_map::IndexMap;
pub use sparse_matrix::SparseMatrix;

use std::sync::Arc;

/// Linear operator with fixed range and domain maps
pub trait Operator {
    fn range_map(&self) -> &Arc<IndexMap>;
    fn domain_map(&self) -> &Arc<IndexMap>;
    /// y = Op x
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), SparseMatrixError>;
}
