//! Braess-Sarazin relaxation for 2x2 velocity/pressure block systems.

mod ilu;
mod scalar_amg;
mod schur_solver;

pub use ilu::{Ilu0, IluParams};
pub use scalar_amg::{ScalarAmg, ScalarAmgParams};
pub use schur_solver::{SchurSolver, SchurSolverParams};

use crate::{AmgError, ParameterList};
use sparse_matrix::{BlockMatrix, PRESSURE, VELOCITY};

pub const DEFAULT_BS_DAMPING: f64 = 1.3;

#[derive(Debug, Clone, PartialEq)]
pub struct BraessSarazinParams {
    /// Scaling `alpha` of the velocity diagonal, `(alpha D)^-1` approximates `A11^-1`
    pub damping: f64,
    pub sweeps: usize,
    pub schur: SchurSolverParams,
}

impl Default for BraessSarazinParams {
    fn default() -> Self {
        Self {
            damping: DEFAULT_BS_DAMPING,
            sweeps: 1,
            schur: SchurSolverParams::default(),
        }
    }
}

impl BraessSarazinParams {
    /// Override `braess-sarazin: damping factor` / `braess-sarazin: sweeps` from a list
    pub fn with_overrides(&self, list: &ParameterList) -> Result<Self, AmgError> {
        let params = Self {
            damping: list.get_double("braess-sarazin: damping factor", self.damping)?,
            sweeps: list.get_usize("braess-sarazin: sweeps", self.sweeps)?,
            schur: self.schur.clone(),
        };

        if params.damping <= 0.0 {
            return Err(AmgError::config(format!(
                "braess-sarazin: damping factor must be positive (found {})",
                params.damping
            )));
        }
        if params.sweeps == 0 {
            return Err(AmgError::config("braess-sarazin: sweeps must be at least 1"));
        }
        Ok(params)
    }

    /// Parameter list rendering, used for the setup diagnostics
    pub fn to_list(&self, name: &str) -> ParameterList {
        let mut list = ParameterList::new(name)
            .with("braess-sarazin: damping factor", self.damping)
            .with("braess-sarazin: sweeps", self.sweeps);

        match &self.schur {
            SchurSolverParams::Ilu(ilu) => {
                list.set(
                    "IFPACK Parameters",
                    ParameterList::new("IFPACK Parameters")
                        .with("fact: level-of-fill", ilu.level_of_fill)
                        .with("fact: absolute threshold", ilu.absolute_threshold)
                        .with("fact: relative threshold", ilu.relative_threshold),
                );
            }
            SchurSolverParams::Ml(ml) => {
                list.set(
                    "ML Parameters",
                    ParameterList::new("ML Parameters")
                        .with("max levels", ml.max_levels)
                        .with("coarse: max size", ml.coarse_max_size)
                        .with("aggregation: type", ml.aggregation.kind.to_string())
                        .with("aggregation: threshold", ml.aggregation.threshold)
                        .with("aggregation: damping factor", ml.damping)
                        .with("smoother: sweeps", ml.smoother_sweeps)
                        .with("smoother: damping factor", ml.smoother_damping)
                        .with("cycle applications", ml.cycles),
                );
            }
        }
        list
    }
}

/// Braess-Sarazin smoother of one level
///
/// With `D = diag(A11)` and the damping `alpha`, the approximate Schur complement
/// `S = A22 - A21 (alpha D)^-1 A12` is formed once. A sweep computes the block residual `(r_u, r_p)`,
/// solves `S dp = r_p - A21 (alpha D)^-1 r_u` with the inner solver, sets
/// `du = (alpha D)^-1 (r_u - A12 dp)` and updates the iterate by `(du, dp)`.
pub struct BraessSarazinSmoother {
    blocks: BlockMatrix,
    inv_scaled_diag: Vec<f64>,
    schur: Box<dyn SchurSolver + Send + Sync>,
    sweeps: usize,
}

impl BraessSarazinSmoother {
    pub fn new(blocks: &BlockMatrix, params: &BraessSarazinParams) -> Result<Self, AmgError> {
        let a11 = blocks.block(VELOCITY, VELOCITY);

        let diag = a11.extract_diagonal();
        if let Some(row) = diag.iter().position(|d| *d == 0.0) {
            return Err(AmgError::ZeroDiagonal { row });
        }
        let inv_scaled_diag: Vec<f64> = diag.iter().map(|d| 1.0 / (params.damping * d)).collect();

        let mut scaled_a12 = blocks.block(VELOCITY, PRESSURE).as_ref().clone();
        scaled_a12.left_scale(&inv_scaled_diag)?;
        let correction = blocks.block(PRESSURE, VELOCITY).multiply(&scaled_a12)?;
        let schur_op = blocks.block(PRESSURE, PRESSURE).add(1.0, &correction, -1.0)?;

        log::debug!(
            "Braess-Sarazin smoother: {} velocity / {} pressure rows, Schur operator nnz {}, {} sweep(s)",
            a11.num_rows(),
            schur_op.num_rows(),
            schur_op.nnz(),
            params.sweeps
        );

        let schur = params.schur.build(schur_op)?;

        Ok(Self {
            blocks: blocks.clone(),
            inv_scaled_diag,
            schur,
            sweeps: params.sweeps,
        })
    }

    pub fn schur_solver_name(&self) -> &'static str {
        self.schur.name()
    }

    /// Relax `A (y_vel, y_pre) = (b_vel, b_pre)`; `y` holds the initial guess on entry
    pub fn apply_inverse(
        &self,
        b_vel: &[f64],
        b_pre: &[f64],
        y_vel: &mut [f64],
        y_pre: &mut [f64],
    ) -> Result<(), AmgError> {
        let a12 = self.blocks.block(VELOCITY, PRESSURE);
        let a21 = self.blocks.block(PRESSURE, VELOCITY);

        for _ in 0..self.sweeps {
            let (r_vel, r_pre) = self.blocks.residual_blocks(b_vel, b_pre, y_vel, y_pre)?;

            let scaled_r_vel: Vec<f64> = r_vel
                .iter()
                .zip(self.inv_scaled_diag.iter())
                .map(|(r, d)| r * d)
                .collect();
            let mut rhs = a21.mul_vec(&scaled_r_vel)?;
            rhs.iter_mut().zip(r_pre.iter()).for_each(|(s, r)| *s = r - *s);

            let d_pre = self.schur.solve(&rhs)?;
            let a12_d_pre = a12.mul_vec(&d_pre)?;

            y_vel
                .iter_mut()
                .zip(r_vel.iter().zip(a12_d_pre.iter()))
                .zip(self.inv_scaled_diag.iter())
                .for_each(|((y, (r, c)), d)| *y += d * (r - c));
            y_pre.iter_mut().zip(d_pre.iter()).for_each(|(y, dp)| *y += dp);
        }

        Ok(())
    }
}
