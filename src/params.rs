//! Typed settings of the saddle-point preconditioner, read from parameter lists.

use crate::aggregation::{AggregationParams, AggregationType};
use crate::braess_sarazin::{BraessSarazinParams, SchurSolverParams};
use crate::prolongator::{ProlongatorSmoothing, SmoothingParams, DEFAULT_SA_DAMPING};
use crate::{AmgError, ParameterList};
use eigensolver::EigenAnalysis;
use std::fmt;
use std::str::FromStr;

pub const AMGBS_LIST: &str = "AMGBS Parameters";
pub const ML_LIST: &str = "ML Parameters";

/// Which smoothing passes of the V-cycle are active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmootherPasses {
    Both,
    Pre,
    Post,
}

impl SmootherPasses {
    pub fn pre(&self) -> bool {
        matches!(self, Self::Both | Self::Pre)
    }

    pub fn post(&self) -> bool {
        matches!(self, Self::Both | Self::Post)
    }
}

impl FromStr for SmootherPasses {
    type Err = AmgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(Self::Both),
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            _ => Err(AmgError::config(format!(
                "unknown value '{}' for 'amgbs: smoother: pre or post' (expected both, pre or post)",
                s
            ))),
        }
    }
}

impl fmt::Display for SmootherPasses {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Both => write!(f, "both"),
            Self::Pre => write!(f, "pre"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Everything the hierarchy setup needs
#[derive(Debug, Clone, PartialEq)]
pub struct SaddlePointParams {
    pub max_levels: usize,
    /// Setup stops once the next level has fewer velocity + pressure rows than this
    pub max_coarse_dim: usize,
    pub velocity_dofs_per_node: usize,
    pub aggregation: AggregationParams,
    pub smoothing: SmoothingParams,
    pub velocity_prolongator: ProlongatorSmoothing,
    pub pressure_prolongator: ProlongatorSmoothing,
    pub smoother_passes: SmootherPasses,
    pub verbosity: i64,
    /// Base Braess-Sarazin settings, before per-level overrides
    pub braess_sarazin: BraessSarazinParams,
    amgbs: ParameterList,
}

impl SaddlePointParams {
    /// Read the `AMGBS Parameters` sublist of `params` and the Schur solver settings of `pressure_params`.
    ///
    /// A missing `AMGBS Parameters` sublist is treated as empty. `PDE equations` is required; it is
    /// looked up in `AMGBS Parameters` first and in `ML Parameters` second.
    pub fn from_lists(
        params: &ParameterList,
        pressure_params: &ParameterList,
    ) -> Result<Self, AmgError> {
        let amgbs = params
            .sublist(AMGBS_LIST)
            .cloned()
            .unwrap_or_else(|| ParameterList::new(AMGBS_LIST));
        let ml = params.sublist(ML_LIST);

        let lookup = |key: &str| -> Result<Option<i64>, AmgError> {
            match amgbs.get_int_opt(key)? {
                Some(v) => Ok(Some(v)),
                None => match ml {
                    Some(ml) => ml.get_int_opt(key),
                    None => Ok(None),
                },
            }
        };

        let nv = match lookup("PDE equations")? {
            Some(nv) if nv >= 1 => nv as usize,
            Some(nv) => {
                return Err(AmgError::config(format!(
                    "'PDE equations' must be at least 1 (found {})",
                    nv
                )))
            }
            None => return Err(AmgError::config("null space dimension not given")),
        };
        if let Some(dim) = lookup("null space: dimension")? {
            if dim != nv as i64 {
                return Err(AmgError::config(format!(
                    "'null space: dimension' ({}) must equal 'PDE equations' ({})",
                    dim, nv
                )));
            }
        }

        let aggregation = AggregationParams {
            kind: amgbs
                .get_str("aggregation: type", &AggregationType::Uncoupled.to_string())?
                .parse()?,
            threshold: amgbs.get_double("aggregation: threshold", 0.0)?,
            nodes_per_aggregate: amgbs.get_usize("aggregation: nodes per aggregate", 9)?,
        };
        if aggregation.nodes_per_aggregate == 0 {
            return Err(AmgError::config("'aggregation: nodes per aggregate' must be at least 1"));
        }

        let smoothing = SmoothingParams {
            damping: amgbs.get_double("aggregation: damping factor", DEFAULT_SA_DAMPING)?,
            eigen_analysis: amgbs
                .get_str("eigen-analysis: type", &EigenAnalysis::Cg.to_string())?
                .parse()?,
            eigen_iterations: amgbs.get_usize("eigen-analysis: iterations", 10)?,
        };

        let verbosity = match amgbs.get_int_opt("ML output")? {
            Some(v) => v,
            None => amgbs.get_int("output", 0)?,
        };

        let base = BraessSarazinParams {
            schur: SchurSolverParams::from_list(pressure_params)?,
            ..Default::default()
        };
        let braess_sarazin = base.with_overrides(&amgbs)?;

        let max_levels = amgbs.get_usize("max levels", 6)?;
        if max_levels == 0 {
            return Err(AmgError::config("'max levels' must be at least 1"));
        }

        Ok(Self {
            max_levels,
            max_coarse_dim: amgbs.get_usize("max coarse dimension", 20)?,
            velocity_dofs_per_node: nv,
            aggregation,
            smoothing,
            velocity_prolongator: amgbs
                .get_str("amgbs: prolongator smoother (vel)", "PA-AMG")?
                .parse()?,
            pressure_prolongator: amgbs
                .get_str("amgbs: prolongator smoother (pre)", "PA-AMG")?
                .parse()?,
            smoother_passes: amgbs.get_str("amgbs: smoother: pre or post", "both")?.parse()?,
            verbosity,
            braess_sarazin,
            amgbs,
        })
    }

    /// Braess-Sarazin settings of `level`, with the `braess-sarazin: list (level N)` overrides applied
    pub fn braess_sarazin_for_level(&self, level: usize) -> Result<BraessSarazinParams, AmgError> {
        match self.amgbs.sublist(&level_list_name(level)) {
            Some(list) => self.braess_sarazin.with_overrides(list),
            None => Ok(self.braess_sarazin.clone()),
        }
    }
}

pub fn level_list_name(level: usize) -> String {
    format!("braess-sarazin: list (level {})", level)
}
