use thiserror::Error;

/// Errors raised by the sparse matrix backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SparseMatrixError {
    #[error("dimension mismatch in {op}: expected {expected}, found {found}")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("index maps do not match in {0}")]
    MapMismatch(&'static str),
    #[error("global column {0} is not part of the domain map")]
    MissingColumn(usize),
    #[error("global row {0} is not owned by the row map")]
    RowNotOwned(usize),
    #[error("global id {0} appears more than once in an index map")]
    DuplicateGid(usize),
    #[error("invalid map split: {0}")]
    InvalidSplit(String),
}
