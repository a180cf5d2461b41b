use crate::{BlockMatrix, IndexMap, MapExtractor, Operator, SparseMatrixError};
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::sync::Arc;

/// Finalized compressed-row sparse matrix
///
/// Rows are local ids of `row_map` (which is also the range map), column indices are local ids of
/// `domain_map`. Column indices are sorted within each row. The structure cannot be changed once a
/// matrix is built; all algebra returns new matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct CrsMatrix {
    row_map: Arc<IndexMap>,
    domain_map: Arc<IndexMap>,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CrsMatrix {
    pub(crate) fn from_sorted_parts(
        row_map: Arc<IndexMap>,
        domain_map: Arc<IndexMap>,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(row_ptr.len(), row_map.len() + 1);
        debug_assert_eq!(col_idx.len(), values.len());

        Self {
            row_map,
            domain_map,
            row_ptr,
            col_idx,
            values,
        }
    }

    fn from_rows(
        row_map: Arc<IndexMap>,
        domain_map: Arc<IndexMap>,
        rows: Vec<(Vec<usize>, Vec<f64>)>,
    ) -> Self {
        let nnz = rows.iter().map(|(c, _)| c.len()).sum();
        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        row_ptr.push(0);
        for (mut cols, mut vals) in rows {
            col_idx.append(&mut cols);
            values.append(&mut vals);
            row_ptr.push(col_idx.len());
        }

        Self::from_sorted_parts(row_map, domain_map, row_ptr, col_idx, values)
    }

    /// Identity operator on `map`
    pub fn identity(map: Arc<IndexMap>) -> Self {
        let n = map.len();
        Self::from_sorted_parts(
            map.clone(),
            map,
            (0..=n).collect(),
            (0..n).collect(),
            vec![1.0; n],
        )
    }

    /// Diagonal operator on `map`
    pub fn from_diagonal(map: Arc<IndexMap>, diagonal: &[f64]) -> Result<Self, SparseMatrixError> {
        check_len("from_diagonal", map.len(), diagonal.len())?;

        let mut diag = Self::identity(map);
        diag.values.copy_from_slice(diagonal);
        Ok(diag)
    }

    pub fn row_map(&self) -> &Arc<IndexMap> {
        &self.row_map
    }

    pub fn range_map(&self) -> &Arc<IndexMap> {
        &self.row_map
    }

    pub fn domain_map(&self) -> &Arc<IndexMap> {
        &self.domain_map
    }

    pub fn num_rows(&self) -> usize {
        self.row_map.len()
    }

    pub fn num_cols(&self) -> usize {
        self.domain_map.len()
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column ids and values of a local row
    pub fn row(&self, lid: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[lid]..self.row_ptr[lid + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// Value at local coordinates; zero if the entry is not stored
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (cols, vals) = self.row(row);
        match cols.binary_search(&col) {
            Ok(k) => vals[k],
            Err(_) => 0.0,
        }
    }

    /// Iterate over the stored entries in global coordinates
    pub fn iter_entries(&self) -> impl Iterator<Item = ([usize; 2], f64)> + '_ {
        (0..self.num_rows()).flat_map(move |r| {
            let (cols, vals) = self.row(r);
            let row_gid = self.row_map.gid(r);
            cols.iter()
                .zip(vals.iter())
                .map(move |(c, v)| ([row_gid, self.domain_map.gid(*c)], *v))
        })
    }

    /// y = A x
    pub fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), SparseMatrixError> {
        check_len("apply (x)", self.num_cols(), x.len())?;
        check_len("apply (y)", self.num_rows(), y.len())?;

        y.par_iter_mut().enumerate().for_each(|(r, y_r)| {
            let (cols, vals) = self.row(r);
            *y_r = cols.iter().zip(vals.iter()).map(|(c, v)| v * x[*c]).sum();
        });

        Ok(())
    }

    /// A x, in a newly allocated vector
    pub fn mul_vec(&self, x: &[f64]) -> Result<Vec<f64>, SparseMatrixError> {
        let mut y = vec![0.0; self.num_rows()];
        self.apply(x, &mut y)?;
        Ok(y)
    }

    /// b - A x
    pub fn residual(&self, b: &[f64], x: &[f64]) -> Result<Vec<f64>, SparseMatrixError> {
        check_len("residual", self.num_rows(), b.len())?;
        let mut r = self.mul_vec(x)?;
        r.iter_mut().zip(b.iter()).for_each(|(r_i, b_i)| *r_i = b_i - *r_i);
        Ok(r)
    }

    /// Diagonal entries (structurally missing entries are zero).
    ///
    /// Uses the row/domain gids, so the matrix does not need to be ordered the same way in both maps.
    pub fn extract_diagonal(&self) -> Vec<f64> {
        (0..self.num_rows())
            .map(|r| match self.domain_map.lid(self.row_map.gid(r)) {
                Some(c) => self.get(r, c),
                None => 0.0,
            })
            .collect()
    }

    pub fn scale(&mut self, alpha: f64) {
        self.values.iter_mut().for_each(|v| *v *= alpha);
    }

    /// Scale row `i` by `scaling[i]`, i.e. A <- diag(scaling) A
    pub fn left_scale(&mut self, scaling: &[f64]) -> Result<(), SparseMatrixError> {
        check_len("left_scale", self.num_rows(), scaling.len())?;

        for (r, s) in scaling.iter().enumerate() {
            let range = self.row_ptr[r]..self.row_ptr[r + 1];
            self.values[range].iter_mut().for_each(|v| *v *= s);
        }
        Ok(())
    }

    /// Explicit transpose; the row and domain maps are swapped
    pub fn transpose(&self) -> Self {
        let num_cols = self.num_cols();
        let mut row_ptr = vec![0; num_cols + 1];
        for c in self.col_idx.iter() {
            row_ptr[c + 1] += 1;
        }
        for c in 0..num_cols {
            row_ptr[c + 1] += row_ptr[c];
        }

        let mut next = row_ptr.clone();
        let mut col_idx = vec![0; self.nnz()];
        let mut values = vec![0.0; self.nnz()];

        for r in 0..self.num_rows() {
            let (cols, vals) = self.row(r);
            for (c, v) in cols.iter().zip(vals.iter()) {
                col_idx[next[*c]] = r;
                values[next[*c]] = *v;
                next[*c] += 1;
            }
        }

        Self::from_sorted_parts(
            self.domain_map.clone(),
            self.row_map.clone(),
            row_ptr,
            col_idx,
            values,
        )
    }

    /// Sparse product `self * other` (row-by-row, rows computed in parallel)
    pub fn multiply(&self, other: &Self) -> Result<Self, SparseMatrixError> {
        if !self.domain_map.same_as(&other.row_map) {
            return Err(SparseMatrixError::MapMismatch("multiply"));
        }

        let rows: Vec<(Vec<usize>, Vec<f64>)> = (0..self.num_rows())
            .into_par_iter()
            .map(|r| {
                let (a_cols, a_vals) = self.row(r);
                let mut products: Vec<(usize, f64)> = Vec::new();
                for (k, a_rk) in a_cols.iter().zip(a_vals.iter()) {
                    let (b_cols, b_vals) = other.row(*k);
                    products.extend(b_cols.iter().zip(b_vals.iter()).map(|(c, b)| (*c, a_rk * b)));
                }
                merge_sorted(products)
            })
            .collect();

        Ok(Self::from_rows(
            self.row_map.clone(),
            other.domain_map.clone(),
            rows,
        ))
    }

    /// alpha * self + beta * other; both matrices must share row and domain maps
    pub fn add(&self, alpha: f64, other: &Self, beta: f64) -> Result<Self, SparseMatrixError> {
        if !self.row_map.same_as(&other.row_map) || !self.domain_map.same_as(&other.domain_map) {
            return Err(SparseMatrixError::MapMismatch("add"));
        }

        let rows: Vec<(Vec<usize>, Vec<f64>)> = (0..self.num_rows())
            .into_par_iter()
            .map(|r| {
                let (a_cols, a_vals) = self.row(r);
                let (b_cols, b_vals) = other.row(r);
                let sum: Vec<(usize, f64)> = a_cols
                    .iter()
                    .zip(a_vals.iter())
                    .map(|(c, v)| (*c, alpha * v))
                    .chain(b_cols.iter().zip(b_vals.iter()).map(|(c, v)| (*c, beta * v)))
                    .collect();
                merge_sorted(sum)
            })
            .collect();

        Ok(Self::from_rows(
            self.row_map.clone(),
            self.domain_map.clone(),
            rows,
        ))
    }

    /// Split a square matrix over `extractor.full_map()` into its 2x2 blocks
    pub fn split(&self, extractor: Arc<MapExtractor>) -> Result<BlockMatrix, SparseMatrixError> {
        let full = extractor.full_map();
        if !self.row_map.same_as(full) || !self.domain_map.same_as(full) {
            return Err(SparseMatrixError::MapMismatch("split"));
        }

        let mut blocks: [[Vec<(Vec<usize>, Vec<f64>)>; 2]; 2] = Default::default();
        for (i, block_row) in blocks.iter_mut().enumerate() {
            for row in block_row.iter_mut() {
                *row = vec![(Vec::new(), Vec::new()); extractor.map(i).len()];
            }
        }

        for r in 0..self.num_rows() {
            let (bi, sub_r) = extractor.position(r);
            let (cols, vals) = self.row(r);
            for (c, v) in cols.iter().zip(vals.iter()) {
                let (bj, sub_c) = extractor.position(*c);
                let (sub_cols, sub_vals) = &mut blocks[bi][bj][sub_r];
                sub_cols.push(sub_c);
                sub_vals.push(*v);
            }
        }

        let [[b00, b01], [b10, b11]] = blocks;
        let build = |i: usize, j: usize, rows: Vec<(Vec<usize>, Vec<f64>)>| {
            let rows = rows
                .into_iter()
                .map(|(cols, vals)| merge_sorted(cols.into_iter().zip(vals).collect()))
                .collect();
            Arc::new(Self::from_rows(
                extractor.map(i).clone(),
                extractor.map(j).clone(),
                rows,
            ))
        };

        BlockMatrix::new(
            [
                [build(0, 0, b00), build(0, 1, b01)],
                [build(1, 0, b10), build(1, 1, b11)],
            ],
            extractor.clone(),
        )
    }

    /// Dense copy of the matrix in local coordinates
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.num_rows(), self.num_cols());
        for r in 0..self.num_rows() {
            let (cols, vals) = self.row(r);
            for (c, v) in cols.iter().zip(vals.iter()) {
                dense[(r, *c)] += v;
            }
        }
        dense
    }
}

impl Operator for CrsMatrix {
    fn range_map(&self) -> &Arc<IndexMap> {
        &self.row_map
    }

    fn domain_map(&self) -> &Arc<IndexMap> {
        &self.domain_map
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), SparseMatrixError> {
        CrsMatrix::apply(self, x, y)
    }
}

// sort by column and sum duplicates
fn merge_sorted(mut entries: Vec<(usize, f64)>) -> (Vec<usize>, Vec<f64>) {
    entries.sort_unstable_by_key(|(c, _)| *c);

    let mut cols: Vec<usize> = Vec::with_capacity(entries.len());
    let mut vals: Vec<f64> = Vec::with_capacity(entries.len());
    for (c, v) in entries {
        match cols.last() {
            Some(last) if *last == c => {
                if let Some(acc) = vals.last_mut() {
                    *acc += v;
                }
            }
            _ => {
                cols.push(c);
                vals.push(v);
            }
        }
    }

    (cols, vals)
}

pub(crate) fn check_len(
    op: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), SparseMatrixError> {
    if expected == found {
        Ok(())
    } else {
        Err(SparseMatrixError::DimensionMismatch {
            op,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SparseMatrix;

    fn map(n: usize) -> Arc<IndexMap> {
        Arc::new(IndexMap::contiguous(0, n))
    }

    fn from_dense(rows: &[&[f64]]) -> CrsMatrix {
        let row_map = map(rows.len());
        let domain_map = map(rows[0].len());
        let mut sm = SparseMatrix::new(row_map);
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                if *v != 0.0 {
                    sm.sum_into_global([r, c], *v).unwrap();
                }
            }
        }
        sm.complete(domain_map).unwrap()
    }

    #[test]
    fn matrix_vector_product() {
        let a = from_dense(&[&[2.0, -1.0, 0.0], &[-1.0, 2.0, -1.0], &[0.0, -1.0, 2.0]]);

        let y = a.mul_vec(&[1.0, 2.0, 3.0]).unwrap();
        assert!((y[0] - 0.0).abs() < 1e-15);
        assert!((y[1] - 0.0).abs() < 1e-15);
        assert!((y[2] - 4.0).abs() < 1e-15);

        assert!(a.mul_vec(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn transpose_of_rectangular() {
        let p = from_dense(&[&[1.0, 0.0], &[2.0, 0.0], &[0.0, 3.0]]);
        let pt = p.transpose();

        assert_eq!(pt.num_rows(), 2);
        assert_eq!(pt.num_cols(), 3);
        assert_eq!(pt.row(0).0, &[0, 1]);
        assert!((pt.get(1, 2) - 3.0).abs() < 1e-15);
        assert_eq!(pt.transpose(), p);
    }

    #[test]
    fn product_matches_dense() {
        let a = from_dense(&[&[4.0, -1.0, 0.0], &[-1.0, 4.0, -1.0], &[0.0, -1.0, 4.0]]);
        let p = from_dense(&[&[1.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]]);

        let rap = p.transpose().multiply(&a).unwrap().multiply(&p).unwrap();
        let dense = p.to_dense().transpose() * a.to_dense() * p.to_dense();

        assert_eq!(rap.num_rows(), 2);
        for r in 0..2 {
            for c in 0..2 {
                assert!((rap.get(r, c) - dense[(r, c)]).abs() < 1e-13);
            }
        }

        assert!(a.multiply(&p.transpose()).is_err());
    }

    #[test]
    fn scaled_sum() {
        let a = from_dense(&[&[1.0, 2.0], &[0.0, 3.0]]);
        let b = from_dense(&[&[1.0, 0.0], &[4.0, 1.0]]);

        let c = a.add(2.0, &b, -1.0).unwrap();

        assert!((c.get(0, 0) - 1.0).abs() < 1e-15);
        assert!((c.get(0, 1) - 4.0).abs() < 1e-15);
        assert!((c.get(1, 0) + 4.0).abs() < 1e-15);
        assert!((c.get(1, 1) - 5.0).abs() < 1e-15);
    }

    #[test]
    fn diagonal_and_scaling() {
        let mut a = from_dense(&[&[2.0, 1.0], &[1.0, 0.0]]);
        assert_eq!(a.extract_diagonal(), vec![2.0, 0.0]);

        a.left_scale(&[0.5, 2.0]).unwrap();
        assert!((a.get(0, 1) - 0.5).abs() < 1e-15);
        assert!((a.get(1, 0) - 2.0).abs() < 1e-15);

        let d = CrsMatrix::from_diagonal(map(2), &[3.0, 4.0]).unwrap();
        assert_eq!(d.mul_vec(&[1.0, 1.0]).unwrap(), vec![3.0, 4.0]);
    }
}
