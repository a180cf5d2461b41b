use sparse_matrix::{BlockMatrix, CrsMatrix, PRESSURE, VELOCITY};
use std::fmt;

/// Global dimensions and stored entries of one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixStats {
    pub rows: usize,
    pub cols: usize,
    pub nnz: usize,
}

impl From<&CrsMatrix> for MatrixStats {
    fn from(a: &CrsMatrix) -> Self {
        Self {
            rows: a.num_rows(),
            cols: a.num_cols(),
            nnz: a.nnz(),
        }
    }
}

impl fmt::Display for MatrixStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} x {} ({})", self.rows, self.cols, self.nnz)
    }
}

/// Transfer operators of level `level` and the coarse blocks they produce on `level + 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStats {
    pub level: usize,
    pub pvel: MatrixStats,
    pub ppre: MatrixStats,
    /// `A11`, `A12`, `A21`, `A22` of the coarser level
    pub coarse: [[MatrixStats; 2]; 2],
}

impl LevelStats {
    pub fn new(level: usize, pvel: &CrsMatrix, ppre: &CrsMatrix, coarse: &BlockMatrix) -> Self {
        let stats = |i, j| MatrixStats::from(coarse.block(i, j).as_ref());
        Self {
            level,
            pvel: pvel.into(),
            ppre: ppre.into(),
            coarse: [
                [stats(VELOCITY, VELOCITY), stats(VELOCITY, PRESSURE)],
                [stats(PRESSURE, VELOCITY), stats(PRESSURE, PRESSURE)],
            ],
        }
    }

    /// Velocity plus pressure rows of the coarser level
    pub fn coarse_rows(&self) -> usize {
        self.coarse[VELOCITY][VELOCITY].rows + self.coarse[PRESSURE][PRESSURE].rows
    }
}

impl fmt::Display for LevelStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let l = self.level;
        writeln!(f, "Pvel[{}]: {}", l, self.pvel)?;
        writeln!(f, "Ppre[{}]: {}", l, self.ppre)?;
        writeln!(f, "A11[{}]: {}", l + 1, self.coarse[0][0])?;
        writeln!(f, "A12[{}]: {}", l + 1, self.coarse[0][1])?;
        writeln!(f, "A21[{}]: {}", l + 1, self.coarse[1][0])?;
        write!(f, "A22[{}]: {}", l + 1, self.coarse[1][1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lines() {
        let m = |rows, cols, nnz| MatrixStats { rows, cols, nnz };
        let stats = LevelStats {
            level: 1,
            pvel: m(72, 18, 72),
            ppre: m(36, 9, 36),
            coarse: [[m(18, 18, 90), m(18, 9, 40)], [m(9, 18, 40), m(9, 9, 33)]],
        };

        let text = stats.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Pvel[1]: 72 x 18 (72)");
        assert_eq!(lines[2], "A11[2]: 18 x 18 (90)");
        assert_eq!(lines[5], "A22[2]: 9 x 9 (33)");
        assert_eq!(stats.coarse_rows(), 27);
    }
}
