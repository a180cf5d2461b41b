use super::ilu::{Ilu0, IluParams};
use super::scalar_amg::{ScalarAmg, ScalarAmgParams};
use crate::{AmgError, ParameterList};
use sparse_matrix::CrsMatrix;

/// Approximate solve with the scaled pressure Schur complement
///
/// Implementations must be linear in `rhs` so that the smoother stays a linear operator.
pub trait SchurSolver {
    fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, AmgError>;

    fn name(&self) -> &'static str;
}

/// Inner solver of the Braess-Sarazin smoother, chosen by the pressure solver list
#[derive(Debug, Clone, PartialEq)]
pub enum SchurSolverParams {
    Ilu(IluParams),
    Ml(ScalarAmgParams),
}

impl SchurSolverParams {
    /// Read the `IFPACK Parameters` sublist, or else the `ML Parameters` sublist
    pub fn from_list(pressure_params: &ParameterList) -> Result<Self, AmgError> {
        if let Some(ifpack) = pressure_params.sublist("IFPACK Parameters") {
            Ok(Self::Ilu(IluParams::from_list(ifpack)?))
        } else if let Some(ml) = pressure_params.sublist("ML Parameters") {
            Ok(Self::Ml(ScalarAmgParams::from_list(ml)?))
        } else {
            Err(AmgError::config("no IFPACK or ML ParameterList found"))
        }
    }

    pub fn build(&self, schur: CrsMatrix) -> Result<Box<dyn SchurSolver + Send + Sync>, AmgError> {
        Ok(match self {
            Self::Ilu(params) => Box::new(Ilu0::new(&schur, params)?),
            Self::Ml(params) => Box::new(ScalarAmg::new(schur, params)?),
        })
    }
}

impl Default for SchurSolverParams {
    fn default() -> Self {
        Self::Ilu(IluParams::default())
    }
}
