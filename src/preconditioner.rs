//! Braess-Sarazin multigrid preconditioner for velocity/pressure systems.
//!
//! Setup aggregates the velocity block, inherits the pressure aggregates from the velocity nodes,
//! builds a transfer pair per field and forms the coarse 2x2 block system with Galerkin products,
//! level by level until the coarse system is small enough or the level budget is used up. Every
//! level gets a Braess-Sarazin smoother; the coarsest one is used as the coarse solver.
//!
//! [SaddlePointPreconditioner::apply_inverse] performs one V-cycle. It only reads the hierarchy, so
//! it can be called concurrently for different right-hand sides.

mod level;
mod stats;

pub use level::Level;
pub use stats::{LevelStats, MatrixStats};

use crate::aggregation::{derive_pressure_partition, AggregationContext};
use crate::braess_sarazin::BraessSarazinSmoother;
use crate::comm::Communicator;
use crate::galerkin::coarsen_blocks;
use crate::params::{level_list_name, SaddlePointParams};
use crate::prolongator::build_transfer;
use crate::tentative::build_tentative_prolongator;
use crate::{AmgError, NullSpace, ParameterList, SerialComm};
use rayon::prelude::*;
use sparse_matrix::vector_ops::axpy;
use sparse_matrix::{BlockMatrix, CrsMatrix, MapExtractor, SparseMatrixError, PRESSURE, VELOCITY};
use std::sync::Arc;

#[cfg(feature = "petsc_export")]
use sparse_matrix::AIJMatrixBinary;
#[cfg(feature = "petsc_export")]
use std::path::Path;

/// Operator handed to the preconditioner
pub enum SystemMatrix {
    /// Node-interleaved matrix; split with the `PDE equations` stride
    Monolithic(Arc<CrsMatrix>),
    /// Already split into velocity/pressure blocks
    Blocked(BlockMatrix),
}

pub struct SaddlePointPreconditioner {
    levels: Vec<Level>,
    coarsest: BlockMatrix,
    coarsest_smoother: Arc<BraessSarazinSmoother>,
    stats: Vec<LevelStats>,
    params: SaddlePointParams,
}

impl SaddlePointPreconditioner {
    /// Set up the hierarchy on a single rank
    pub fn new(
        matrix: SystemMatrix,
        params: &ParameterList,
        pressure_params: &ParameterList,
    ) -> Result<Self, AmgError> {
        Self::with_communicator(matrix, params, pressure_params, &SerialComm)
    }

    pub fn with_communicator(
        matrix: SystemMatrix,
        params: &ParameterList,
        pressure_params: &ParameterList,
        comm: &dyn Communicator,
    ) -> Result<Self, AmgError> {
        let params = SaddlePointParams::from_lists(params, pressure_params)?;
        let nv = params.velocity_dofs_per_node;

        let mut current = match matrix {
            SystemMatrix::Blocked(blocks) => blocks,
            SystemMatrix::Monolithic(a) => {
                let extractor = MapExtractor::from_node_stride(a.row_map().clone(), nv)?;
                a.split(Arc::new(extractor))?
            }
        };

        let mut velocity_ns = NullSpace::translations(current.block(VELOCITY, VELOCITY).num_rows(), nv)?;
        let mut pressure_ns = NullSpace::constant(current.block(PRESSURE, PRESSURE).num_rows());

        let context = AggregationContext::acquire(comm);
        let mut levels = Vec::new();
        let mut stats = Vec::new();

        for curlevel in 0..params.max_levels - 1 {
            let a11 = current.block(VELOCITY, VELOCITY).clone();
            let a22 = current.block(PRESSURE, PRESSURE).clone();

            let velocity_aggs = context.aggregate(&a11, &params.aggregation, nv, &velocity_ns)?;
            let pressure_aggs = derive_pressure_partition(&velocity_aggs, nv)?;

            let velocity_tent = build_tentative_prolongator(a11.row_map(), &velocity_aggs, &velocity_ns, 0)?;
            let pressure_tent = build_tentative_prolongator(
                a22.row_map(),
                &pressure_aggs,
                &pressure_ns,
                velocity_aggs.num_global * nv,
            )?;

            let velocity = build_transfer(&a11, velocity_tent.p, params.velocity_prolongator, &params.smoothing)?;
            let pressure = build_transfer(&a22, pressure_tent.p, params.pressure_prolongator, &params.smoothing)?;

            let coarse = coarsen_blocks(&current, &velocity, &pressure)?;
            let level_stats = LevelStats::new(curlevel, &velocity.p, &pressure.p, &coarse);
            if params.verbosity > 4 {
                log::info!("{}", level_stats);
            }

            let smoother = Arc::new(level_smoother(&current, &params, curlevel)?);

            levels.push(Level {
                a: current,
                velocity,
                pressure,
                smoother,
            });
            stats.push(level_stats);

            current = coarse;
            velocity_ns = velocity_tent.next_nullspace;
            pressure_ns = pressure_tent.next_nullspace;

            let coarse_rows = context.communicator().sum_all(level_stats.coarse_rows());
            if coarse_rows < params.max_coarse_dim {
                if params.verbosity > 4 {
                    log::info!(
                        "dim A[{}] < {}. -> end aggregation process",
                        curlevel + 1,
                        params.max_coarse_dim
                    );
                }
                break;
            }
        }
        drop(context);

        let coarsest_smoother = Arc::new(level_smoother(&current, &params, levels.len())?);

        if params.verbosity > 2 {
            log::info!("Braess-Sarazin multigrid setup phase complete");
            log::info!("nlevels/maxlevels: {}/{}", levels.len() + 1, params.max_levels);
        }

        Ok(Self {
            levels,
            coarsest: current,
            coarsest_smoother,
            stats,
            params,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len() + 1
    }

    /// Non-coarsest level `l`
    pub fn level(&self, l: usize) -> Option<&Level> {
        self.levels.get(l)
    }

    pub fn level_stats(&self) -> &[LevelStats] {
        &self.stats
    }

    pub fn coarsest_blocks(&self) -> &BlockMatrix {
        &self.coarsest
    }

    pub fn coarsest_smoother(&self) -> &Arc<BraessSarazinSmoother> {
        &self.coarsest_smoother
    }

    pub fn params(&self) -> &SaddlePointParams {
        &self.params
    }

    fn fine_blocks(&self) -> &BlockMatrix {
        self.levels.first().map(|l| &l.a).unwrap_or(&self.coarsest)
    }

    /// One V-cycle for a full (node-interleaved or block-ordered) vector: `y = M^-1 x`
    pub fn apply_inverse(&self, x: &[f64], y: &mut [f64]) -> Result<(), AmgError> {
        let extractor = self.fine_blocks().extractor();
        let x_vel = extractor.extract_vector(x, VELOCITY)?;
        let x_pre = extractor.extract_vector(x, PRESSURE)?;

        let mut y_vel = vec![0.0; x_vel.len()];
        let mut y_pre = vec![0.0; x_pre.len()];
        self.v_cycle(&x_vel, &x_pre, &mut y_vel, &mut y_pre)?;

        extractor.insert_vector(&y_vel, VELOCITY, y)?;
        extractor.insert_vector(&y_pre, PRESSURE, y)?;
        Ok(())
    }

    /// [SaddlePointPreconditioner::apply_inverse] for several right-hand sides, in parallel
    pub fn apply_inverse_multi(&self, xs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, AmgError> {
        xs.par_iter()
            .map(|x| {
                let mut y = vec![0.0; x.len()];
                self.apply_inverse(x, &mut y)?;
                Ok(y)
            })
            .collect()
    }

    /// One V-cycle on the split vectors; `y` is overwritten
    pub fn v_cycle(
        &self,
        x_vel: &[f64],
        x_pre: &[f64],
        y_vel: &mut [f64],
        y_pre: &mut [f64],
    ) -> Result<(), AmgError> {
        let blocks = self.fine_blocks();
        check_len(blocks.extractor().map(VELOCITY).len(), x_vel.len(), y_vel.len())?;
        check_len(blocks.extractor().map(PRESSURE).len(), x_pre.len(), y_pre.len())?;

        self.cycle(0, x_vel, x_pre, y_vel, y_pre)
    }

    fn cycle(
        &self,
        level: usize,
        x_vel: &[f64],
        x_pre: &[f64],
        y_vel: &mut [f64],
        y_pre: &mut [f64],
    ) -> Result<(), AmgError> {
        if level == self.levels.len() {
            y_vel.fill(0.0);
            y_pre.fill(0.0);
            return self.coarsest_smoother.apply_inverse(x_vel, x_pre, y_vel, y_pre);
        }

        let lvl = &self.levels[level];
        let mut z_vel = vec![0.0; x_vel.len()];
        let mut z_pre = vec![0.0; x_pre.len()];

        if self.params.smoother_passes.pre() {
            lvl.pre_smoother().apply_inverse(x_vel, x_pre, &mut z_vel, &mut z_pre)?;
        }

        let (r_vel, r_pre) = lvl.a.residual_blocks(x_vel, x_pre, &z_vel, &z_pre)?;
        let rc_vel = lvl.velocity.r.mul_vec(&r_vel)?;
        let rc_pre = lvl.pressure.r.mul_vec(&r_pre)?;

        let mut ec_vel = vec![0.0; rc_vel.len()];
        let mut ec_pre = vec![0.0; rc_pre.len()];
        self.cycle(level + 1, &rc_vel, &rc_pre, &mut ec_vel, &mut ec_pre)?;

        axpy(1.0, &lvl.velocity.p.mul_vec(&ec_vel)?, &mut z_vel);
        axpy(1.0, &lvl.pressure.p.mul_vec(&ec_pre)?, &mut z_pre);

        if self.params.smoother_passes.post() {
            lvl.post_smoother().apply_inverse(x_vel, x_pre, &mut z_vel, &mut z_pre)?;
        }

        y_vel.copy_from_slice(&z_vel);
        y_pre.copy_from_slice(&z_pre);
        Ok(())
    }

    /// Write the operators and transfer matrices of every level as PETSc binaries into `dir`
    #[cfg(feature = "petsc_export")]
    pub fn write_hierarchy(&self, dir: impl AsRef<Path>, prefix: &str) -> std::io::Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let write = |name: String, a: &CrsMatrix| {
            let path = dir.join(format!("{}_{}.dat", prefix, name));
            AIJMatrixBinary::from(a).print_to_petsc_binary_file(path.to_string_lossy())
        };
        let write_blocks = |l: usize, blocks: &BlockMatrix| -> std::io::Result<()> {
            for (i, j) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                write(format!("A{}{}_{}", i + 1, j + 1, l), blocks.block(i, j).as_ref())?;
            }
            Ok(())
        };

        for (l, level) in self.levels.iter().enumerate() {
            write_blocks(l, &level.a)?;
            write(format!("Pvel_{}", l), level.velocity.p.as_ref())?;
            write(format!("Ppre_{}", l), level.pressure.p.as_ref())?;
        }
        write_blocks(self.levels.len(), &self.coarsest)?;

        log::info!("wrote {} levels to {}", self.num_levels(), dir.display());
        Ok(())
    }
}

fn level_smoother(
    blocks: &BlockMatrix,
    params: &SaddlePointParams,
    level: usize,
) -> Result<BraessSarazinSmoother, AmgError> {
    let bs_params = params.braess_sarazin_for_level(level)?;
    if params.verbosity > 8 {
        log::info!(
            "Braess-Sarazin smoother (level {})\nparameters:\n{}",
            level,
            bs_params.to_list(&level_list_name(level))
        );
    }
    BraessSarazinSmoother::new(blocks, &bs_params)
}

fn check_len(expected: usize, x_len: usize, y_len: usize) -> Result<(), AmgError> {
    for found in [x_len, y_len] {
        if found != expected {
            return Err(SparseMatrixError::DimensionMismatch {
                op: "v_cycle",
                expected,
                found,
            }
            .into());
        }
    }
    Ok(())
}
