//! Prolongator smoothing and transfer-operator pairs.

use crate::AmgError;
use eigensolver::{max_eigenvalue, EigenAnalysis};
use sparse_matrix::CrsMatrix;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default damping factor of the smoothed-aggregation step
pub const DEFAULT_SA_DAMPING: f64 = 4.0 / 3.0;

/// Which prolongator a field uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProlongatorSmoothing {
    /// Plain aggregation: `P = P_tent`
    Plain,
    /// Smoothed aggregation: `P = P_tent - (omega / lambda) D^-1 A P_tent`
    Smoothed,
}

impl FromStr for ProlongatorSmoothing {
    type Err = AmgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PA-AMG" => Ok(Self::Plain),
            "SA-AMG" => Ok(Self::Smoothed),
            _ => Err(AmgError::config(format!(
                "unknown prolongator smoother '{}' (expected PA-AMG or SA-AMG)",
                s
            ))),
        }
    }
}

impl fmt::Display for ProlongatorSmoothing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "PA-AMG"),
            Self::Smoothed => write!(f, "SA-AMG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub damping: f64,
    pub eigen_analysis: EigenAnalysis,
    pub eigen_iterations: usize,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            damping: DEFAULT_SA_DAMPING,
            eigen_analysis: EigenAnalysis::Cg,
            eigen_iterations: 10,
        }
    }
}

/// One damped Jacobi step applied to the tentative prolongator:
/// `P = P_tent - (omega / lambda_max(D^-1 A)) D^-1 A P_tent`
pub fn smooth_prolongator(
    a: &CrsMatrix,
    p_tent: &CrsMatrix,
    params: &SmoothingParams,
) -> Result<CrsMatrix, AmgError> {
    let diag = a.extract_diagonal();
    if let Some(row) = diag.iter().position(|d| *d == 0.0) {
        return Err(AmgError::ZeroDiagonal { row });
    }

    let lambda = max_eigenvalue(a, true, params.eigen_analysis, params.eigen_iterations)?;
    let inv_diag: Vec<f64> = diag.iter().map(|d| 1.0 / d).collect();

    let mut dinv_ap = a.multiply(p_tent)?;
    dinv_ap.left_scale(&inv_diag)?;

    let p = p_tent.add(1.0, &dinv_ap, -params.damping / lambda)?;

    log::debug!(
        "smoothed prolongator: lambda_max(D^-1 A) = {:.6e}, damping = {:.4}, nnz {} -> {}",
        lambda,
        params.damping / lambda,
        p_tent.nnz(),
        p.nnz()
    );
    Ok(p)
}

/// Prolongator and restriction of one field on one level; `r` is the transpose of `p`
#[derive(Debug, Clone)]
pub struct Transfer {
    pub p: Arc<CrsMatrix>,
    pub r: Arc<CrsMatrix>,
}

/// Final prolongator of a field (smoothed if requested) and its transpose
pub fn build_transfer(
    a: &CrsMatrix,
    p_tent: CrsMatrix,
    smoothing: ProlongatorSmoothing,
    params: &SmoothingParams,
) -> Result<Transfer, AmgError> {
    let p = match smoothing {
        ProlongatorSmoothing::Plain => p_tent,
        ProlongatorSmoothing::Smoothed => smooth_prolongator(a, &p_tent, params)?,
    };
    let r = p.transpose();

    Ok(Transfer {
        p: Arc::new(p),
        r: Arc::new(r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::tests::grid_laplacian;
    use crate::ErrorKind;
    use sparse_matrix::{IndexMap, SparseMatrix};

    // piecewise constant prolongator onto pairs of rows
    fn pairwise_prolongator(a: &CrsMatrix) -> CrsMatrix {
        let n = a.num_rows();
        let coarse = Arc::new(IndexMap::contiguous(0, n / 2));
        let mut p = SparseMatrix::new(a.row_map().clone());
        let q = 1.0 / 2f64.sqrt();
        for row in 0..n {
            p.sum_into_global([row, row / 2], q).unwrap();
        }
        p.complete(coarse).unwrap()
    }

    #[test]
    fn prolongator_smoother_names() {
        assert_eq!("SA-AMG".parse::<ProlongatorSmoothing>().unwrap(), ProlongatorSmoothing::Smoothed);
        assert_eq!(ProlongatorSmoothing::Plain.to_string(), "PA-AMG");

        let err = "SA".parse::<ProlongatorSmoothing>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn smoothing_widens_the_stencil() {
        let a = grid_laplacian(4, 4, 1);
        let p_tent = pairwise_prolongator(&a);

        let p = smooth_prolongator(&a, &p_tent, &SmoothingParams::default()).unwrap();

        assert!(p.nnz() > p_tent.nnz());
        assert!(p.domain_map().same_as(p_tent.domain_map()));
        assert!(p.row_map().same_as(p_tent.row_map()));
        assert!(p.to_dense().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn smoothing_keeps_interior_constants() {
        // D^-1 A annihilates the constant away from the boundary rows
        let map = Arc::new(IndexMap::contiguous(0, 6));
        let mut sm = SparseMatrix::new(map.clone());
        for row in 0..6 {
            sm.sum_into_global([row, row], 2.0).unwrap();
            if row > 0 {
                sm.sum_into_global([row, row - 1], -1.0).unwrap();
                sm.sum_into_global([row - 1, row], -1.0).unwrap();
            }
        }
        let a = sm.complete(map).unwrap();
        let p_tent = pairwise_prolongator(&a);
        let p = smooth_prolongator(&a, &p_tent, &SmoothingParams::default()).unwrap();

        let ones = vec![1.0; 3];
        let pc = p.mul_vec(&ones).unwrap();
        let ptc = p_tent.mul_vec(&ones).unwrap();
        for row in 1..5 {
            assert!((pc[row] - ptc[row]).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_diagonal_is_fatal() {
        let map = Arc::new(IndexMap::contiguous(0, 4));
        let mut sm = SparseMatrix::new(map.clone());
        for row in 0..4 {
            if row != 2 {
                sm.sum_into_global([row, row], 2.0).unwrap();
            }
            if row > 0 {
                sm.sum_into_global([row, row - 1], -1.0).unwrap();
                sm.sum_into_global([row - 1, row], -1.0).unwrap();
            }
        }
        let a = sm.complete(map).unwrap();
        let p_tent = pairwise_prolongator(&a);

        let err = smooth_prolongator(&a, &p_tent, &SmoothingParams::default()).unwrap_err();
        assert_eq!(err, AmgError::ZeroDiagonal { row: 2 });
        assert_eq!(err.kind(), ErrorKind::Numerical);
        assert!(err.to_string().contains("diagonal entries of A are 0"));
    }

    #[test]
    fn restriction_is_transpose() {
        let a = grid_laplacian(4, 2, 1);
        let p_tent = pairwise_prolongator(&a);

        for smoothing in [ProlongatorSmoothing::Plain, ProlongatorSmoothing::Smoothed] {
            let transfer = build_transfer(&a, p_tent.clone(), smoothing, &SmoothingParams::default()).unwrap();

            assert_eq!(transfer.r.transpose(), *transfer.p);
            assert_eq!(transfer.r.num_rows(), 4);
            assert_eq!(transfer.r.num_cols(), 8);
        }
    }
}
