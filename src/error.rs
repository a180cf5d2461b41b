use eigensolver::EigenSolverError;
use sparse_matrix::SparseMatrixError;
use thiserror::Error;

/// Failure class of an [AmgError]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing parameters; a caller bug
    Configuration,
    /// Violated structural invariant of the hierarchy or of a matrix
    Structural,
    /// Degenerate operator that cannot be scaled or smoothed safely
    Numerical,
}

/// Fatal errors of the multigrid setup and apply
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmgError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(
        "aggregate too small, fatal! (aggregate {aggregate} has {rows} rows, null space dimension is {nullspace_dim})"
    )]
    AggregateTooSmall {
        aggregate: usize,
        rows: usize,
        nullspace_dim: usize,
    },
    #[error("coarse column {0} is not owned by the coarse domain map")]
    MissingCoarseColumn(usize),
    #[error("structural error: {0}")]
    Structure(String),
    #[error("diagonal entries of A are 0 (row {row})")]
    ZeroDiagonal { row: usize },
    #[error("numerical degeneracy: {0}")]
    Degenerate(String),
    #[error(transparent)]
    Matrix(#[from] SparseMatrixError),
    #[error(transparent)]
    Eigen(#[from] EigenSolverError),
}

impl AmgError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::AggregateTooSmall { .. }
            | Self::MissingCoarseColumn(_)
            | Self::Structure(_)
            | Self::Matrix(_) => ErrorKind::Structural,
            Self::ZeroDiagonal { .. } | Self::Degenerate(_) => ErrorKind::Numerical,
            Self::Eigen(e) => match e {
                EigenSolverError::UnknownMethod(_) => ErrorKind::Configuration,
                EigenSolverError::Matrix(_) => ErrorKind::Structural,
                EigenSolverError::ZeroDiagonal { .. } | EigenSolverError::ZeroEigenvalue => {
                    ErrorKind::Numerical
                }
            },
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
