use super::schur_solver::SchurSolver;
use crate::aggregation::{AggregationContext, AggregationParams};
use crate::galerkin::galerkin_product;
use crate::prolongator::{build_transfer, ProlongatorSmoothing, SmoothingParams, Transfer};
use crate::tentative::build_tentative_prolongator;
use crate::{AmgError, NullSpace, ParameterList, SerialComm};
use nalgebra::{DMatrix, DVector};
use sparse_matrix::vector_ops::axpy;
use sparse_matrix::CrsMatrix;

/// Settings of the nested smoothed-aggregation solver (`ML Parameters`)
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarAmgParams {
    pub max_levels: usize,
    pub coarse_max_size: usize,
    pub aggregation: AggregationParams,
    /// Prolongator damping; 0 selects plain aggregation
    pub damping: f64,
    pub smoother_sweeps: usize,
    pub smoother_damping: f64,
    pub cycles: usize,
}

impl Default for ScalarAmgParams {
    fn default() -> Self {
        Self {
            max_levels: 10,
            coarse_max_size: 32,
            aggregation: AggregationParams::default(),
            damping: 4.0 / 3.0,
            smoother_sweeps: 2,
            smoother_damping: 0.67,
            cycles: 1,
        }
    }
}

impl ScalarAmgParams {
    pub fn from_list(list: &ParameterList) -> Result<Self, AmgError> {
        let defaults = Self::default();
        let aggregation = AggregationParams {
            kind: list
                .get_str("aggregation: type", &defaults.aggregation.kind.to_string())?
                .parse()?,
            threshold: list.get_double("aggregation: threshold", defaults.aggregation.threshold)?,
            nodes_per_aggregate: list.get_usize(
                "aggregation: nodes per aggregate",
                defaults.aggregation.nodes_per_aggregate,
            )?,
        };

        let params = Self {
            max_levels: list.get_usize("max levels", defaults.max_levels)?,
            coarse_max_size: list.get_usize("coarse: max size", defaults.coarse_max_size)?,
            aggregation,
            damping: list.get_double("aggregation: damping factor", defaults.damping)?,
            smoother_sweeps: list.get_usize("smoother: sweeps", defaults.smoother_sweeps)?,
            smoother_damping: list.get_double("smoother: damping factor", defaults.smoother_damping)?,
            cycles: list.get_usize("cycle applications", defaults.cycles)?,
        };

        if params.max_levels == 0 {
            return Err(AmgError::config("ML 'max levels' must be at least 1"));
        }
        if params.cycles == 0 {
            return Err(AmgError::config("ML 'cycle applications' must be at least 1"));
        }
        Ok(params)
    }
}

struct ScalarLevel {
    a: CrsMatrix,
    inv_diag: Vec<f64>,
    transfer: Transfer,
}

/// Smoothed-aggregation V-cycle for a scalar operator
///
/// Damped Jacobi smoothing on every level and a dense direct solve on the coarsest one. The
/// hierarchy is rank-local (the nested solve does not communicate).
pub struct ScalarAmg {
    levels: Vec<ScalarLevel>,
    coarse_inverse: DMatrix<f64>,
    params: ScalarAmgParams,
}

impl ScalarAmg {
    pub fn new(a: CrsMatrix, params: &ScalarAmgParams) -> Result<Self, AmgError> {
        let comm = SerialComm;
        let context = AggregationContext::acquire(&comm);

        let smoothing = if params.damping == 0.0 {
            ProlongatorSmoothing::Plain
        } else {
            ProlongatorSmoothing::Smoothed
        };
        let smoothing_params = SmoothingParams {
            damping: params.damping,
            ..Default::default()
        };

        let mut levels = Vec::new();
        let mut current = a;
        let mut nullspace = NullSpace::constant(current.num_rows());

        while levels.len() + 1 < params.max_levels && current.num_rows() > params.coarse_max_size {
            let aggregates = context.aggregate(&current, &params.aggregation, 1, &nullspace)?;
            if aggregates.num_global == 0 || aggregates.num_global >= current.num_rows() {
                log::debug!("nested AMG: no further coarsening at {} rows", current.num_rows());
                break;
            }

            let tentative = build_tentative_prolongator(current.row_map(), &aggregates, &nullspace, 0)?;
            let transfer = build_transfer(&current, tentative.p, smoothing, &smoothing_params)?;
            let coarse = galerkin_product(&transfer.r, &current, &transfer.p)?;

            let inv_diag = inverse_diagonal(&current)?;
            levels.push(ScalarLevel {
                a: current,
                inv_diag,
                transfer,
            });

            current = coarse;
            nullspace = tentative.next_nullspace;
        }

        let coarse_inverse = current.to_dense().try_inverse().ok_or_else(|| {
            AmgError::Degenerate(format!(
                "coarsest operator of the nested AMG ({} rows) is singular",
                current.num_rows()
            ))
        })?;

        log::debug!(
            "nested AMG: {} levels, coarsest operator has {} rows",
            levels.len() + 1,
            current.num_rows()
        );

        Ok(Self {
            levels,
            coarse_inverse,
            params: params.clone(),
        })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len() + 1
    }

    fn jacobi(&self, level: &ScalarLevel, b: &[f64], x: &mut [f64]) -> Result<(), AmgError> {
        for _ in 0..self.params.smoother_sweeps {
            let r = level.a.residual(b, x)?;
            x.iter_mut()
                .zip(r.iter().zip(level.inv_diag.iter()))
                .for_each(|(x_i, (r_i, d_i))| *x_i += self.params.smoother_damping * d_i * r_i);
        }
        Ok(())
    }

    fn v_cycle(&self, level: usize, b: &[f64], x: &mut [f64]) -> Result<(), AmgError> {
        if level == self.levels.len() {
            let sol = &self.coarse_inverse * DVector::from_column_slice(b);
            x.copy_from_slice(sol.as_slice());
            return Ok(());
        }

        let lvl = &self.levels[level];
        self.jacobi(lvl, b, x)?;

        let r = lvl.a.residual(b, x)?;
        let r_coarse = lvl.transfer.r.mul_vec(&r)?;
        let mut e_coarse = vec![0.0; r_coarse.len()];
        self.v_cycle(level + 1, &r_coarse, &mut e_coarse)?;

        let e = lvl.transfer.p.mul_vec(&e_coarse)?;
        axpy(1.0, &e, x);

        self.jacobi(lvl, b, x)
    }
}

impl SchurSolver for ScalarAmg {
    fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, AmgError> {
        let mut x = vec![0.0; rhs.len()];
        for _ in 0..self.params.cycles {
            self.v_cycle(0, rhs, &mut x)?;
        }
        Ok(x)
    }

    fn name(&self) -> &'static str {
        "ML"
    }
}

fn inverse_diagonal(a: &CrsMatrix) -> Result<Vec<f64>, AmgError> {
    a.extract_diagonal()
        .iter()
        .enumerate()
        .map(|(row, d)| {
            if *d == 0.0 {
                Err(AmgError::ZeroDiagonal { row })
            } else {
                Ok(1.0 / d)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::tests::grid_laplacian;
    use sparse_matrix::vector_ops::norm2;

    #[test]
    fn builds_a_hierarchy() {
        let a = grid_laplacian(12, 12, 1);
        let amg = ScalarAmg::new(a, &ScalarAmgParams::default()).unwrap();

        assert!(amg.num_levels() >= 2);
        assert!(amg.num_levels() <= 10);
    }

    #[test]
    fn cycles_reduce_the_residual() {
        let a = grid_laplacian(12, 12, 1);
        let params = ScalarAmgParams {
            cycles: 8,
            ..Default::default()
        };
        let amg = ScalarAmg::new(a.clone(), &params).unwrap();

        let b: Vec<f64> = (0..144).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
        let x = amg.solve(&b).unwrap();
        let r = a.residual(&b, &x).unwrap();

        assert!(norm2(&r) < 1e-2 * norm2(&b));
    }

    #[test]
    fn small_operator_is_solved_directly() {
        let a = grid_laplacian(3, 3, 1);
        let amg = ScalarAmg::new(a.clone(), &ScalarAmgParams::default()).unwrap();
        assert_eq!(amg.num_levels(), 1);

        let b = vec![1.0; 9];
        let x = amg.solve(&b).unwrap();
        let r = a.residual(&b, &x).unwrap();
        assert!(norm2(&r) < 1e-12);
    }

    #[test]
    fn plain_aggregation_and_list_parsing() {
        let list = ParameterList::new("ML Parameters")
            .with("aggregation: damping factor", 0.0)
            .with("aggregation: type", "MIS")
            .with("coarse: max size", 10);
        let params = ScalarAmgParams::from_list(&list).unwrap();

        assert_eq!(params.coarse_max_size, 10);
        assert_eq!(params.aggregation.kind, crate::aggregation::AggregationType::Mis);

        let a = grid_laplacian(8, 8, 1);
        let amg = ScalarAmg::new(a, &params).unwrap();
        assert!(amg.num_levels() >= 2);

        let bad = ParameterList::new("ML Parameters").with("aggregation: type", "Coupled");
        assert!(ScalarAmgParams::from_list(&bad).is_err());
    }
}
