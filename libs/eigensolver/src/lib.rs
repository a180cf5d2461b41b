extern crate nalgebra;
extern crate sparse_matrix;

mod lanczos;
mod power;

use sparse_matrix::{CrsMatrix, SparseMatrixError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Method used to estimate the largest eigenvalue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenAnalysis {
    /// Lanczos (Krylov) estimate on the symmetrically scaled operator
    Cg,
    /// Power iteration
    PowerMethod,
}

impl FromStr for EigenAnalysis {
    type Err = EigenSolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cg" => Ok(Self::Cg),
            "power-method" => Ok(Self::PowerMethod),
            _ => Err(EigenSolverError::UnknownMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for EigenAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Cg => write!(f, "cg"),
            Self::PowerMethod => write!(f, "power-method"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EigenSolverError {
    #[error("diagonal entries of A are 0 (row {row})")]
    ZeroDiagonal { row: usize },
    #[error("maximum eigenvalue estimate is 0; operator is degenerate")]
    ZeroEigenvalue,
    #[error("unknown eigen-analysis type '{0}'")]
    UnknownMethod(String),
    #[error(transparent)]
    Matrix(#[from] SparseMatrixError),
}

/// Estimate the largest eigenvalue of `A`, or of `D^-1 A` if `diagonal_scaling` is set.
///
/// Fails if a diagonal entry is zero (when scaling) or if the estimate is exactly zero.
pub fn max_eigenvalue(
    a: &CrsMatrix,
    diagonal_scaling: bool,
    method: EigenAnalysis,
    iterations: usize,
) -> Result<f64, EigenSolverError> {
    let inv_diag = if diagonal_scaling {
        let diag = a.extract_diagonal();
        if let Some(row) = diag.iter().position(|d| *d == 0.0) {
            return Err(EigenSolverError::ZeroDiagonal { row });
        }
        Some(diag)
    } else {
        None
    };

    let lambda = match (method, inv_diag) {
        (EigenAnalysis::PowerMethod, diag) => power::power_method(a, diag.as_deref(), iterations)?,
        (EigenAnalysis::Cg, None) => lanczos::lanczos(a, None, 1.0, iterations)?,
        (EigenAnalysis::Cg, Some(diag)) => {
            let all_pos = diag.iter().all(|d| *d > 0.0);
            let all_neg = diag.iter().all(|d| *d < 0.0);

            if all_pos || all_neg {
                let sign = if all_pos { 1.0 } else { -1.0 };
                let inv_sqrt: Vec<f64> = diag.iter().map(|d| 1.0 / d.abs().sqrt()).collect();
                lanczos::lanczos(a, Some(&inv_sqrt), sign, iterations)?
            } else {
                log::debug!("diagonal has mixed signs; using power method for eigenvalue estimate");
                power::power_method(a, Some(&diag), iterations)?
            }
        }
    };

    if lambda == 0.0 {
        return Err(EigenSolverError::ZeroEigenvalue);
    }

    log::trace!("max eigenvalue estimate ({}): {:.6e}", method, lambda);
    Ok(lambda)
}

// deterministic start vector, so the setup is reproducible
pub(crate) fn start_vector(n: usize) -> Vec<f64> {
    let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
    (0..n)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            0.5 + (seed % 1000) as f64 / 1000.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparse_matrix::{IndexMap, SparseMatrix};
    use std::sync::Arc;

    pub(crate) fn laplacian_1d(n: usize, diag: f64) -> CrsMatrix {
        let map = Arc::new(IndexMap::contiguous(0, n));
        let mut sm = SparseMatrix::new(map.clone());
        for i in 0..n {
            sm.sum_into_global([i, i], diag).unwrap();
            if i > 0 {
                sm.sum_into_global([i, i - 1], -1.0).unwrap();
                sm.sum_into_global([i - 1, i], -1.0).unwrap();
            }
        }
        sm.complete(map).unwrap()
    }

    // eigenvalues of tridiag(-1, 2, -1) / 2 are 1 - cos(k pi / (n + 1))
    fn exact_scaled_max(n: usize) -> f64 {
        1.0 - (n as f64 * std::f64::consts::PI / (n as f64 + 1.0)).cos()
    }

    #[test]
    fn lanczos_estimate_of_scaled_laplacian() {
        let a = laplacian_1d(50, 2.0);
        let lambda = max_eigenvalue(&a, true, EigenAnalysis::Cg, 50).unwrap();

        assert!((lambda - exact_scaled_max(50)).abs() < 1e-8);
    }

    #[test]
    fn lanczos_underestimates_with_few_steps() {
        let a = laplacian_1d(200, 2.0);
        let lambda = max_eigenvalue(&a, true, EigenAnalysis::Cg, 10).unwrap();

        assert!(lambda <= exact_scaled_max(200) + 1e-12);
        assert!(lambda > 1.5);
    }

    #[test]
    fn negative_diagonal_is_flipped() {
        let mut a = laplacian_1d(30, 2.0);
        a.scale(-1.0);
        let lambda = max_eigenvalue(&a, true, EigenAnalysis::Cg, 30).unwrap();

        assert!((lambda - exact_scaled_max(30)).abs() < 1e-8);
    }

    #[test]
    fn power_method_estimate() {
        let a = laplacian_1d(10, 2.0);
        let lambda = max_eigenvalue(&a, true, EigenAnalysis::PowerMethod, 500).unwrap();

        assert!((lambda - exact_scaled_max(10)).abs() < 1e-3);
    }

    #[test]
    fn zero_diagonal_rejected() {
        let a = laplacian_1d(5, 0.0);
        assert_eq!(
            max_eigenvalue(&a, true, EigenAnalysis::Cg, 10),
            Err(EigenSolverError::ZeroDiagonal { row: 0 })
        );
    }

    #[test]
    fn zero_operator_rejected() {
        let map = Arc::new(IndexMap::contiguous(0, 4));
        let zero = SparseMatrix::new(map.clone()).complete(map).unwrap();

        assert_eq!(
            max_eigenvalue(&zero, false, EigenAnalysis::Cg, 10),
            Err(EigenSolverError::ZeroEigenvalue)
        );
        assert_eq!(
            max_eigenvalue(&zero, false, EigenAnalysis::PowerMethod, 10),
            Err(EigenSolverError::ZeroEigenvalue)
        );
    }

    #[test]
    fn method_names() {
        assert_eq!("cg".parse::<EigenAnalysis>(), Ok(EigenAnalysis::Cg));
        assert_eq!(
            "power-method".parse::<EigenAnalysis>(),
            Ok(EigenAnalysis::PowerMethod)
        );
        assert!("Anorm".parse::<EigenAnalysis>().is_err());
    }
}
