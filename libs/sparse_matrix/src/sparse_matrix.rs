use crate::{CrsMatrix, IndexMap, SparseMatrixError};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::mpsc::channel;
use std::sync::Arc;

/// Un-finalized sparse matrix used while filling in entries.
///
/// Rows are addressed through the row map, columns by global id. Repeated writes to the same
/// coordinate are summed. Call [SparseMatrix::complete] to fix the domain map and get a
/// [CrsMatrix] that can be used for algebra.
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    row_map: Arc<IndexMap>,
    /// Matrix entries keyed by [local row, global column]
    entries: BTreeMap<[usize; 2], f64>,
}

impl SparseMatrix {
    pub fn new(row_map: Arc<IndexMap>) -> Self {
        Self {
            row_map,
            entries: BTreeMap::new(),
        }
    }

    pub fn row_map(&self) -> &Arc<IndexMap> {
        &self.row_map
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Add a value into the matrix at global coordinates, inserting the entry if it does not exist yet
    pub fn sum_into_global(
        &mut self,
        [row_gid, col_gid]: [usize; 2],
        value: f64,
    ) -> Result<(), SparseMatrixError> {
        let row_lid = self
            .row_map
            .lid(row_gid)
            .ok_or(SparseMatrixError::RowNotOwned(row_gid))?;

        self.entries
            .entry([row_lid, col_gid])
            .and_modify(|curr_val| *curr_val += value)
            .or_insert(value);

        Ok(())
    }

    /// Insert a group of entries in global coordinates
    pub fn insert_group(
        &mut self,
        mut entry_group: Vec<([usize; 2], f64)>,
    ) -> Result<(), SparseMatrixError> {
        for (rc, value) in entry_group.drain(0..) {
            self.sum_into_global(rc, value)?;
        }
        Ok(())
    }

    // Remove the entries from the matrix, replacing them with an empty BTreeMap.
    fn take_entries(&mut self) -> BTreeMap<[usize; 2], f64> {
        std::mem::take(&mut self.entries)
    }

    /// Consume the entries from another sparse matrix leaving it empty.
    pub fn consume_matrix(&mut self, other: &mut Self) -> Result<(), SparseMatrixError> {
        if !self.row_map.same_as(&other.row_map) {
            return Err(SparseMatrixError::MapMismatch("consume_matrix"));
        }
        let new_entries = other.take_entries();

        for (coordinates, value) in new_entries.iter() {
            if let Some(current_value) = self.entries.get_mut(coordinates) {
                *current_value += *value;
            } else {
                self.entries.insert(*coordinates, *value);
            }
        }

        Ok(())
    }

    /// Iterate over the entries in global coordinates, sorted by local row
    pub fn iter_entries(&self) -> impl Iterator<Item = ([usize; 2], f64)> + '_ {
        self.entries
            .iter()
            .map(|([r, c], value)| ([self.row_map.gid(*r), *c], *value))
    }

    /// Finalize the matrix with the given domain map.
    ///
    /// Every column must be owned by `domain_map`; the range map is the row map.
    pub fn complete(self, domain_map: Arc<IndexMap>) -> Result<CrsMatrix, SparseMatrixError> {
        let num_rows = self.row_map.len();
        let mut row_ptr = vec![0; num_rows + 1];
        let mut col_idx = Vec::with_capacity(self.entries.len());
        let mut values = Vec::with_capacity(self.entries.len());

        let mut row_entries: Vec<(usize, f64)> = Vec::new();
        let mut current_row = 0;

        for ([r, c_gid], v) in self.entries.into_iter() {
            let c = domain_map
                .lid(c_gid)
                .ok_or(SparseMatrixError::MissingColumn(c_gid))?;

            while current_row < r {
                flush_row(&mut row_entries, &mut col_idx, &mut values);
                current_row += 1;
                row_ptr[current_row] = col_idx.len();
            }
            row_entries.push((c, v));
        }

        while current_row < num_rows {
            flush_row(&mut row_entries, &mut col_idx, &mut values);
            current_row += 1;
            row_ptr[current_row] = col_idx.len();
        }

        Ok(CrsMatrix::from_sorted_parts(
            self.row_map,
            domain_map,
            row_ptr,
            col_idx,
            values,
        ))
    }
}

// local column ids are not necessarily ordered like the global ones
fn flush_row(row_entries: &mut Vec<(usize, f64)>, col_idx: &mut Vec<usize>, values: &mut Vec<f64>) {
    row_entries.sort_unstable_by_key(|(c, _)| *c);
    for (c, v) in row_entries.drain(0..) {
        col_idx.push(c);
        values.push(v);
    }
}

/// Gather groups of entries (in global coordinates) computed in parallel.
///
/// Panics if an entry is on a row that is not owned by the matrix's row map.
impl ParallelExtend<Vec<([usize; 2], f64)>> for SparseMatrix {
    fn par_extend<I>(&mut self, entry_groups_iter: I)
    where
        I: IntoParallelIterator<Item = Vec<([usize; 2], f64)>>,
    {
        let (sender, receiver) = channel();

        entry_groups_iter
            .into_par_iter()
            .for_each_with(sender, |s, entry_group| {
                s.send(entry_group).expect(
                    "Failed to send entry group over MPSC channel; cannot construct Matrix!",
                )
            });

        receiver.iter().for_each(|entry_group| {
            self.insert_group(entry_group)
                .expect("Entry group contained a row that is not owned by this matrix!")
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(n: usize) -> Arc<IndexMap> {
        Arc::new(IndexMap::contiguous(0, n))
    }

    #[test]
    fn value_insertion() {
        let mut sm = SparseMatrix::new(map(10));

        sm.sum_into_global([0, 0], 1.0).unwrap();
        sm.sum_into_global([0, 0], 1.0).unwrap();
        sm.sum_into_global([9, 9], 10.0).unwrap();
        sm.sum_into_global([4, 3], 0.25).unwrap();
        sm.sum_into_global([0, 8], 0.125).unwrap();
        sm.sum_into_global([0, 8], 0.125).unwrap();

        let raw_entries = sm.take_entries();

        assert!((raw_entries.get(&[0, 0]).unwrap() - 2.0).abs() < 1e-15);
        assert!((raw_entries.get(&[9, 9]).unwrap() - 10.0).abs() < 1e-15);
        assert!((raw_entries.get(&[4, 3]).unwrap() - 0.25).abs() < 1e-15);
        assert!((raw_entries.get(&[0, 8]).unwrap() - 0.25).abs() < 1e-15);

        assert!(raw_entries.get(&[3, 4]).is_none());
    }

    #[test]
    fn consume_another_matrix() {
        let mut sm_a = SparseMatrix::new(map(5));
        let mut sm_b = SparseMatrix::new(map(5));

        for i in 0..5 {
            sm_a.sum_into_global([i, i], (i + 1) as f64).unwrap();
            sm_b.sum_into_global([i, i], (5 - i) as f64).unwrap();
        }
        sm_a.sum_into_global([0, 4], 0.5).unwrap();
        sm_b.sum_into_global([0, 4], -0.5).unwrap();
        sm_b.sum_into_global([2, 3], -0.5).unwrap();

        sm_a.consume_matrix(&mut sm_b).unwrap();

        assert_eq!(sm_b.num_entries(), 0);

        let sm_a_entries = sm_a.take_entries();

        for i in 0..5 {
            assert!((sm_a_entries.get(&[i, i]).unwrap() - 6.0).abs() < 1e-15);
        }
        assert!((sm_a_entries.get(&[0, 4]).unwrap()).abs() < 1e-15);
        assert!((sm_a_entries.get(&[2, 3]).unwrap() + 0.5).abs() < 1e-15);
    }

    #[test]
    fn consume_matrix_with_different_map() {
        let mut sm_a = SparseMatrix::new(map(5));
        let mut sm_b = SparseMatrix::new(map(6));

        assert!(sm_a.consume_matrix(&mut sm_b).is_err());
    }

    #[test]
    fn insertion_on_foreign_row() {
        let mut sm = SparseMatrix::new(Arc::new(IndexMap::contiguous(10, 5)));

        assert_eq!(
            sm.sum_into_global([2, 10], 1.0),
            Err(SparseMatrixError::RowNotOwned(2))
        );
    }

    #[test]
    fn complete_with_missing_column() {
        let mut sm = SparseMatrix::new(map(3));
        sm.sum_into_global([1, 7], 1.0).unwrap();

        assert_eq!(
            sm.complete(map(3)).unwrap_err(),
            SparseMatrixError::MissingColumn(7)
        );
    }

    #[test]
    fn complete_orders_columns_by_local_id() {
        let rows = map(2);
        let cols = Arc::new(IndexMap::from_gids(vec![5, 3, 4]).unwrap());

        let mut sm = SparseMatrix::new(rows);
        sm.insert_group(vec![([0, 3], 1.0), ([0, 4], 2.0), ([0, 5], 3.0), ([1, 4], 4.0)])
            .unwrap();

        let crs = sm.complete(cols).unwrap();

        assert_eq!(crs.row(0).0, &[0, 1, 2]);
        assert_eq!(crs.row(0).1, &[3.0, 1.0, 2.0]);
        assert_eq!(crs.row(1).0, &[2]);
        assert_eq!(crs.nnz(), 4);
    }

    #[test]
    fn parallel_assembly() {
        let mut sm = SparseMatrix::new(map(100));
        sm.par_extend((0..100).into_par_iter().map(|i| {
            let mut group = vec![([i, i], 2.0)];
            if i > 0 {
                group.push(([i, i - 1], -1.0));
            }
            group
        }));

        assert_eq!(sm.num_entries(), 199);
        let crs = sm.complete(map(100)).unwrap();
        assert!((crs.get(50, 49) + 1.0).abs() < 1e-15);
        assert!((crs.get(50, 50) - 2.0).abs() < 1e-15);
    }
}
