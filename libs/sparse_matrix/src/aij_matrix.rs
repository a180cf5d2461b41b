use crate::CrsMatrix;
use bytes::{BufMut, BytesMut};
use std::fs::File;
use std::io::{BufWriter, Write};

const PETSC_MAT_CLASSID: i32 = 1211216;

/// Petsc Sparse Matrix Format (binary AIJ)
pub struct AIJMatrixBinary {
    pub a: Vec<f64>,
    pub i: Vec<i32>, // Number of entries on each row (compute a prefix sum to get canonical form)
    pub j: Vec<i32>,
    pub rows: usize,
    pub cols: usize,
}

impl From<&CrsMatrix> for AIJMatrixBinary {
    fn from(crs: &CrsMatrix) -> Self {
        let i = (0..crs.num_rows())
            .map(|r| crs.row(r).0.len() as i32)
            .collect();

        // column ids are written as global ids of the domain map
        let (j, a) = crs
            .iter_entries()
            .map(|([_, c], v)| (c as i32, v))
            .unzip();

        AIJMatrixBinary {
            a,
            i,
            j,
            rows: crs.num_rows(),
            cols: crs.num_cols(),
        }
    }
}

impl AIJMatrixBinary {
    /// Serialize the matrix in PETSc's big-endian binary layout
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(16 + self.i.len() * 4 + self.j.len() * 4 + self.a.len() * 8);

        // header
        buf.put_i32(PETSC_MAT_CLASSID);
        buf.put_i32(self.rows as i32);
        buf.put_i32(self.cols as i32);
        buf.put_i32(self.a.len() as i32);

        // num-non-zero entries on each row
        for &rnz in self.i.iter() {
            buf.put_i32(rnz);
        }

        // column indices of non-zero entries
        for &j in self.j.iter() {
            buf.put_i32(j);
        }

        // non-zero entries
        for &a in self.a.iter() {
            buf.put_f64(a);
        }

        buf
    }

    pub fn print_to_petsc_binary_file(&self, path: impl AsRef<str>) -> std::io::Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        writer.write_all(self.to_bytes().as_ref())?;
        writer.flush()
    }
}
