use super::schur_solver::SchurSolver;
use crate::{AmgError, ParameterList};
use sparse_matrix::CrsMatrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IluParams {
    /// Only level 0 (no fill-in) is supported
    pub level_of_fill: usize,
    pub absolute_threshold: f64,
    pub relative_threshold: f64,
}

impl Default for IluParams {
    fn default() -> Self {
        Self {
            level_of_fill: 0,
            absolute_threshold: 0.0,
            relative_threshold: 1.0,
        }
    }
}

impl IluParams {
    pub fn from_list(list: &ParameterList) -> Result<Self, AmgError> {
        let defaults = Self::default();
        let params = Self {
            level_of_fill: list.get_usize("fact: level-of-fill", defaults.level_of_fill)?,
            absolute_threshold: list.get_double("fact: absolute threshold", defaults.absolute_threshold)?,
            relative_threshold: list.get_double("fact: relative threshold", defaults.relative_threshold)?,
        };

        if params.level_of_fill != 0 {
            return Err(AmgError::config(format!(
                "ILU level-of-fill {} is not supported (only 0)",
                params.level_of_fill
            )));
        }
        Ok(params)
    }
}

/// Incomplete LU factorization without fill-in
///
/// `L` (unit diagonal, strictly lower part) and `U` share the sparsity pattern of the matrix, plus
/// a diagonal entry on every row. Before factoring, every diagonal entry `d` is replaced by
/// `relative_threshold * d + sign(d) * absolute_threshold`.
#[derive(Debug, Clone)]
pub struct Ilu0 {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    lu: Vec<f64>,
    diag_ptr: Vec<usize>,
}

impl Ilu0 {
    pub fn new(a: &CrsMatrix, params: &IluParams) -> Result<Self, AmgError> {
        if !a.row_map().same_as(a.domain_map()) {
            return Err(AmgError::Structure(
                "ILU(0) needs a square matrix with matching row and domain maps".to_owned(),
            ));
        }

        let n = a.num_rows();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::with_capacity(a.nnz() + n);
        let mut lu = Vec::with_capacity(a.nnz() + n);
        let mut diag_ptr = Vec::with_capacity(n);

        row_ptr.push(0);
        for r in 0..n {
            let (cols, vals) = a.row(r);
            // position of the diagonal among the sorted columns; inserted if it is missing
            let split = cols.partition_point(|c| *c < r);

            col_idx.extend_from_slice(&cols[..split]);
            lu.extend_from_slice(&vals[..split]);

            let (d, rest) = match cols.get(split) {
                Some(c) if *c == r => (vals[split], split + 1),
                _ => (0.0, split),
            };
            let sign = if d < 0.0 { -1.0 } else { 1.0 };
            diag_ptr.push(col_idx.len());
            col_idx.push(r);
            lu.push(params.relative_threshold * d + sign * params.absolute_threshold);

            col_idx.extend_from_slice(&cols[rest..]);
            lu.extend_from_slice(&vals[rest..]);
            row_ptr.push(col_idx.len());
        }

        let mut ilu = Self {
            row_ptr,
            col_idx,
            lu,
            diag_ptr,
        };
        ilu.factorize()?;
        Ok(ilu)
    }

    fn factorize(&mut self) -> Result<(), AmgError> {
        let n = self.diag_ptr.len();

        for i in 0..n {
            for k_idx in self.row_ptr[i]..self.diag_ptr[i] {
                let k = self.col_idx[k_idx];
                let factor = self.lu[k_idx] / self.lu[self.diag_ptr[k]];
                self.lu[k_idx] = factor;

                // U part of row k, used to update the rest of row i
                let u_start = self.diag_ptr[k] + 1;
                let u_end = self.row_ptr[k + 1];

                for j_idx in (k_idx + 1)..self.row_ptr[i + 1] {
                    let j = self.col_idx[j_idx];
                    if let Ok(m) = self.col_idx[u_start..u_end].binary_search(&j) {
                        let update = factor * self.lu[u_start + m];
                        self.lu[j_idx] -= update;
                    }
                }
            }

            if self.lu[self.diag_ptr[i]] == 0.0 {
                return Err(AmgError::Degenerate(format!(
                    "zero pivot in ILU(0) factorization at row {}",
                    i
                )));
            }
        }

        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.diag_ptr.len()
    }

    /// Solve `L U x = b`
    pub fn apply(&self, b: &[f64]) -> Result<Vec<f64>, AmgError> {
        let n = self.num_rows();
        if b.len() != n {
            return Err(sparse_matrix::SparseMatrixError::DimensionMismatch {
                op: "ILU(0) solve",
                expected: n,
                found: b.len(),
            }
            .into());
        }

        let mut x = b.to_vec();
        for i in 0..n {
            for k_idx in self.row_ptr[i]..self.diag_ptr[i] {
                x[i] -= self.lu[k_idx] * x[self.col_idx[k_idx]];
            }
        }
        for i in (0..n).rev() {
            for k_idx in (self.diag_ptr[i] + 1)..self.row_ptr[i + 1] {
                x[i] -= self.lu[k_idx] * x[self.col_idx[k_idx]];
            }
            x[i] /= self.lu[self.diag_ptr[i]];
        }

        Ok(x)
    }
}

impl SchurSolver for Ilu0 {
    fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, AmgError> {
        self.apply(rhs)
    }

    fn name(&self) -> &'static str {
        "ILU(0)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::tests::grid_laplacian;
    use sparse_matrix::{IndexMap, SparseMatrix};
    use std::sync::Arc;

    #[test]
    fn tridiagonal_factorization_is_exact() {
        // no fill-in for a tridiagonal matrix, so ILU(0) is the exact LU
        let n = 8;
        let map = Arc::new(IndexMap::contiguous(0, n));
        let mut sm = SparseMatrix::new(map.clone());
        for i in 0..n {
            sm.sum_into_global([i, i], 3.0).unwrap();
            if i > 0 {
                sm.sum_into_global([i, i - 1], -1.0).unwrap();
                sm.sum_into_global([i - 1, i], -1.5).unwrap();
            }
        }
        let a = sm.complete(map).unwrap();
        let ilu = Ilu0::new(&a, &IluParams::default()).unwrap();

        let x_exact: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 * 0.25).collect();
        let b = a.mul_vec(&x_exact).unwrap();
        let x = ilu.solve(&b).unwrap();

        for (xi, ei) in x.iter().zip(x_exact.iter()) {
            assert!((xi - ei).abs() < 1e-12);
        }
    }

    #[test]
    fn approximate_solve_reduces_error() {
        let a = grid_laplacian(6, 6, 1);
        let ilu = Ilu0::new(&a, &IluParams::default()).unwrap();

        let b = vec![1.0; 36];
        let x = ilu.solve(&b).unwrap();
        let r = a.residual(&b, &x).unwrap();

        let r_norm = sparse_matrix::vector_ops::norm2(&r);
        assert!(r_norm < 0.5 * sparse_matrix::vector_ops::norm2(&b));
    }

    #[test]
    fn missing_diagonal_is_perturbed() {
        let map = Arc::new(IndexMap::contiguous(0, 2));
        let mut sm = SparseMatrix::new(map.clone());
        sm.sum_into_global([0, 1], 1.0).unwrap();
        sm.sum_into_global([1, 0], 1.0).unwrap();
        let a = sm.complete(map).unwrap();

        let err = Ilu0::new(&a, &IluParams::default()).unwrap_err();
        assert!(matches!(err, AmgError::Degenerate(_)));

        let shifted = IluParams {
            absolute_threshold: 2.0,
            ..Default::default()
        };
        let ilu = Ilu0::new(&a, &shifted).unwrap();
        // [[2, 1], [1, 2]] factored exactly
        let x = ilu.solve(&[3.0, 3.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-14);
        assert!((x[1] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn only_level_zero_fill() {
        let list = ParameterList::new("IFPACK Parameters").with("fact: level-of-fill", 1);
        assert!(IluParams::from_list(&list).is_err());

        let list = ParameterList::new("IFPACK Parameters").with("fact: relative threshold", 1.1);
        let params = IluParams::from_list(&list).unwrap();
        assert!((params.relative_threshold - 1.1).abs() < 1e-15);
        assert_eq!(params.absolute_threshold, 0.0);
    }
}
