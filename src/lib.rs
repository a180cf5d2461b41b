extern crate eigensolver;
extern crate sparse_matrix;

pub mod aggregation;
pub mod braess_sarazin;
pub mod cavity;
pub mod comm;
pub mod config;
pub mod error;
pub mod galerkin;
pub mod krylov;
pub mod nullspace;
pub mod params;
pub mod preconditioner;
pub mod prolongator;
pub mod tentative;

pub use comm::{Communicator, SerialComm};
pub use config::{Parameter, ParameterList};
pub use error::{AmgError, ErrorKind};
pub use nullspace::NullSpace;
pub use params::{SaddlePointParams, SmootherPasses};
pub use preconditioner::{SaddlePointPreconditioner, SystemMatrix};

pub use eigensolver::EigenAnalysis;
pub use sparse_matrix::{BlockMatrix, CrsMatrix, IndexMap, MapExtractor, Operator, SparseMatrix};
