//! Synthetic velocity/pressure system on a structured cavity grid.

use crate::params::AMGBS_LIST;
use crate::{AmgError, ParameterList};
use rayon::prelude::*;
use sparse_matrix::{BlockMatrix, CrsMatrix, IndexMap, MapExtractor, SparseMatrix};
use std::f64::consts::PI;
use std::sync::Arc;

/// Shift added to the velocity Laplacians
pub const VELOCITY_SHIFT: f64 = 0.1;
/// Shift added to the pressure Laplacian
pub const PRESSURE_SHIFT: f64 = 1.0;
/// Scale of the discrete gradient/divergence pair
pub const COUPLING: f64 = 0.25;

/// `nx x ny` node grid with `nv` velocity dofs and one pressure dof per node
///
/// Dofs are interleaved by node: node `n` owns `n * (nv + 1) .. n * (nv + 1) + nv` for the velocity
/// components and `n * (nv + 1) + nv` for the pressure. Every velocity component and the pressure
/// get a shifted 5-point Laplacian; pressure and velocity are coupled by a central-difference
/// divergence `B` (component `k` differentiated along `x` for even `k`, along `y` for odd `k`) and
/// its transpose, which keeps the assembled matrix symmetric positive definite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CavityProblem {
    pub nx: usize,
    pub ny: usize,
    pub velocity_dofs_per_node: usize,
}

impl CavityProblem {
    pub fn new(nx: usize, ny: usize, velocity_dofs_per_node: usize) -> Result<Self, AmgError> {
        if nx == 0 || ny == 0 {
            return Err(AmgError::config(format!("empty cavity grid ({} x {})", nx, ny)));
        }
        if velocity_dofs_per_node == 0 {
            return Err(AmgError::config("at least one velocity dof per node is required"));
        }
        Ok(Self {
            nx,
            ny,
            velocity_dofs_per_node,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nx * self.ny
    }

    pub fn num_dofs(&self) -> usize {
        self.num_nodes() * (self.velocity_dofs_per_node + 1)
    }

    /// Global id of a dof; `component == nv` is the pressure
    pub fn dof(&self, node: usize, component: usize) -> usize {
        node * (self.velocity_dofs_per_node + 1) + component
    }

    fn pressure_dof(&self, node: usize) -> usize {
        self.dof(node, self.velocity_dofs_per_node)
    }

    fn node(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Neighbors of node (i, j) along `x` (axis 0) or `y` (axis 1): (lower, upper)
    fn axis_neighbors(&self, i: usize, j: usize, axis: usize) -> (Option<usize>, Option<usize>) {
        if axis == 0 {
            (
                (i > 0).then(|| self.node(i - 1, j)),
                (i + 1 < self.nx).then(|| self.node(i + 1, j)),
            )
        } else {
            (
                (j > 0).then(|| self.node(i, j - 1)),
                (j + 1 < self.ny).then(|| self.node(i, j + 1)),
            )
        }
    }

    // all entries in the rows of one node plus the transposed divergence entries of its pressure row
    fn node_entries(&self, i: usize, j: usize) -> Vec<([usize; 2], f64)> {
        let nv = self.velocity_dofs_per_node;
        let node = self.node(i, j);
        let mut entries = Vec::with_capacity((nv + 1) * 5 + 4 * nv);

        let neighbors: Vec<usize> = (0..2)
            .flat_map(|axis| {
                let (lo, hi) = self.axis_neighbors(i, j, axis);
                lo.into_iter().chain(hi)
            })
            .collect();

        for component in 0..=nv {
            let row = self.dof(node, component);
            let shift = if component < nv {
                VELOCITY_SHIFT
            } else {
                PRESSURE_SHIFT
            };
            entries.push(([row, row], 4.0 + shift));
            for other in neighbors.iter() {
                entries.push(([row, self.dof(*other, component)], -1.0));
            }
        }

        let p_row = self.pressure_dof(node);
        for component in 0..nv {
            let (lo, hi) = self.axis_neighbors(i, j, component % 2);
            for (neighbor, sign) in [(lo, -1.0), (hi, 1.0)] {
                if let Some(other) = neighbor {
                    let u_col = self.dof(other, component);
                    let value = sign * 0.5 * COUPLING;
                    entries.push(([p_row, u_col], value));
                    entries.push(([u_col, p_row], value));
                }
            }
        }

        entries
    }

    /// Assembled node-interleaved matrix
    pub fn matrix(&self) -> Result<CrsMatrix, AmgError> {
        let map = Arc::new(IndexMap::contiguous(0, self.num_dofs()));
        let mut sm = SparseMatrix::new(map.clone());

        sm.par_extend((0..self.num_nodes()).into_par_iter().map(|node| {
            let (i, j) = (node % self.nx, node / self.nx);
            self.node_entries(i, j)
        }));

        log::debug!(
            "assembled {} x {} cavity system: {} dofs, {} entries",
            self.nx,
            self.ny,
            self.num_dofs(),
            sm.num_entries()
        );
        Ok(sm.complete(map)?)
    }

    /// The same operator, split into velocity/pressure blocks
    pub fn block_matrix(&self) -> Result<BlockMatrix, AmgError> {
        let a = self.matrix()?;
        let extractor = MapExtractor::from_node_stride(a.row_map().clone(), self.velocity_dofs_per_node)?;
        Ok(a.split(Arc::new(extractor))?)
    }

    /// Smooth reference solution in the interleaved ordering
    pub fn manufactured_solution(&self) -> Vec<f64> {
        let nv = self.velocity_dofs_per_node;
        let mut x = vec![0.0; self.num_dofs()];
        for j in 0..self.ny {
            for i in 0..self.nx {
                let node = self.node(i, j);
                let px = (i + 1) as f64 / (self.nx + 1) as f64;
                let py = (j + 1) as f64 / (self.ny + 1) as f64;
                for component in 0..nv {
                    x[self.dof(node, component)] = ((component + 1) as f64 * PI * px).sin() * (PI * py).sin();
                }
                x[self.pressure_dof(node)] = px - py;
            }
        }
        x
    }

    /// Default preconditioner settings for this problem: the main list and the pressure solver list
    pub fn parameter_lists(&self) -> (ParameterList, ParameterList) {
        let nv = self.velocity_dofs_per_node;
        let amgbs = ParameterList::new(AMGBS_LIST)
            .with("PDE equations", nv)
            .with("null space: dimension", nv)
            .with("max levels", 6)
            .with("max coarse dimension", 20)
            .with("aggregation: type", "Uncoupled")
            .with("amgbs: smoother: pre or post", "both")
            .with("amgbs: prolongator smoother (vel)", "PA-AMG")
            .with("amgbs: prolongator smoother (pre)", "PA-AMG");
        let params = ParameterList::new("Braess-Sarazin multigrid").with(AMGBS_LIST, amgbs);

        let ifpack = ParameterList::new("IFPACK Parameters")
            .with("fact: level-of-fill", 0)
            .with("fact: absolute threshold", 0.0)
            .with("fact: relative threshold", 1.0);
        let pressure_params = ParameterList::new("SIMPLER").with("IFPACK Parameters", ifpack);

        (params, pressure_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::krylov::{gmres, GmresConfig, IdentityPreconditioner};
    use crate::{SaddlePointPreconditioner, SystemMatrix};
    use approx::assert_relative_eq;
    use nalgebra::SymmetricEigen;
    use sparse_matrix::vector_ops::norm2;
    use sparse_matrix::{PRESSURE, VELOCITY};

    const GMRES_20: GmresConfig = GmresConfig {
        restart: 20,
        max_iter: 20,
        tol: 1e-10,
    };

    /// Residual reduction of 20 multigrid preconditioned GMRES iterations
    fn preconditioned_reduction(
        problem: &CavityProblem,
        params: &ParameterList,
        pressure_params: &ParameterList,
    ) -> f64 {
        let a = Arc::new(problem.matrix().unwrap());
        let b = a.mul_vec(&problem.manufactured_solution()).unwrap();

        let prec =
            SaddlePointPreconditioner::new(SystemMatrix::Monolithic(a.clone()), params, pressure_params).unwrap();
        assert!(prec.num_levels() >= 2);

        let mut x = vec![0.0; b.len()];
        let result = gmres(a.as_ref(), &prec, &b, &mut x, &GMRES_20).unwrap();

        assert!(result.iterations <= 20);
        assert_relative_eq!(result.initial_residual_norm, norm2(&b), max_relative = 1e-12);
        // the reported residual is the true one
        let r = a.residual(&b, &x).unwrap();
        assert_relative_eq!(result.residual_norm, norm2(&r), max_relative = 1e-12);

        result.reduction()
    }

    #[test]
    fn dimensions() {
        let problem = CavityProblem::new(10, 10, 3).unwrap();
        assert_eq!(problem.num_nodes(), 100);
        assert_eq!(problem.num_dofs(), 400);
        assert_eq!(problem.dof(2, 3), 11);

        let blocks = problem.block_matrix().unwrap();
        assert_eq!(blocks.block(VELOCITY, VELOCITY).num_rows(), 300);
        assert_eq!(blocks.block(PRESSURE, PRESSURE).num_rows(), 100);
        assert_eq!(blocks.block(VELOCITY, PRESSURE).num_cols(), 100);
    }

    #[test]
    fn interior_node_stencil() {
        let problem = CavityProblem::new(3, 3, 2).unwrap();
        let a = problem.matrix().unwrap();
        let centre = 4;

        let u0 = problem.dof(centre, 0);
        let p = problem.dof(centre, 2);
        assert!((a.get(u0, u0) - 4.1).abs() < 1e-15);
        assert!((a.get(p, p) - 5.0).abs() < 1e-15);
        assert!((a.get(u0, problem.dof(3, 0)) + 1.0).abs() < 1e-15);
        // divergence of component 0 along x, of component 1 along y
        assert!((a.get(p, problem.dof(5, 0)) - 0.125).abs() < 1e-15);
        assert!((a.get(p, problem.dof(3, 0)) + 0.125).abs() < 1e-15);
        assert!((a.get(p, problem.dof(7, 1)) - 0.125).abs() < 1e-15);
        assert_eq!(a.get(p, problem.dof(5, 1)), 0.0);
    }

    #[test]
    fn symmetric_positive_definite() {
        let problem = CavityProblem::new(4, 5, 3).unwrap();
        let dense = problem.matrix().unwrap().to_dense();

        assert!((&dense - dense.transpose()).amax() < 1e-15);
        let eigen = SymmetricEigen::new(dense);
        assert!(eigen.eigenvalues.min() > 0.0);
    }

    #[test]
    fn empty_grid_rejected() {
        assert!(CavityProblem::new(0, 4, 2).is_err());
        assert!(CavityProblem::new(4, 4, 0).is_err());
    }

    #[test]
    fn v_cycle_preconditioned_gmres() {
        let problem = CavityProblem::new(10, 10, 3).unwrap();
        assert_eq!(problem.num_dofs(), 400);

        let (params, pressure_params) = problem.parameter_lists();
        let reduction = preconditioned_reduction(&problem, &params, &pressure_params);
        assert!(reduction <= 1e-3, "residual reduced by {:.3e} only", reduction);
    }

    #[test]
    fn smoothed_aggregation_with_nested_ml_schur_solver() {
        let problem = CavityProblem::new(10, 10, 3).unwrap();

        let params = ParameterList::from_json_str(
            "params",
            r#"{
                "AMGBS Parameters": {
                    "PDE equations": 3,
                    "max levels": 4,
                    "max coarse dimension": 20,
                    "aggregation: type": "Uncoupled-MIS",
                    "amgbs: prolongator smoother (vel)": "SA-AMG",
                    "amgbs: prolongator smoother (pre)": "SA-AMG",
                    "braess-sarazin: sweeps": 2,
                    "braess-sarazin: list (level 0)": { "braess-sarazin: sweeps": 1 }
                }
            }"#,
        )
        .unwrap();
        let pressure_params = ParameterList::from_json_str(
            "SIMPLER",
            r#"{ "ML Parameters": { "max levels": 3, "coarse: max size": 10 } }"#,
        )
        .unwrap();

        let reduction = preconditioned_reduction(&problem, &params, &pressure_params);
        assert!(reduction <= 1e-3, "residual reduced by {:.3e} only", reduction);
    }

    #[test]
    fn multigrid_beats_unpreconditioned_gmres() {
        let problem = CavityProblem::new(10, 10, 3).unwrap();
        let (params, pressure_params) = problem.parameter_lists();
        let with_mg = preconditioned_reduction(&problem, &params, &pressure_params);

        let a = problem.matrix().unwrap();
        let b = a.mul_vec(&problem.manufactured_solution()).unwrap();
        let mut x = vec![0.0; b.len()];
        let plain = gmres(&a, &IdentityPreconditioner, &b, &mut x, &GMRES_20).unwrap();

        assert!(with_mg < plain.reduction());
    }
}
