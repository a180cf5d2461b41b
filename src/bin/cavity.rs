use clap::Parser;
use saddle_amg::cavity::CavityProblem;
use saddle_amg::krylov::{gmres, GmresConfig, SolverStatus};
use saddle_amg::{AmgError, ParameterList, SaddlePointPreconditioner, SystemMatrix};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Solve a synthetic cavity saddle-point system with Braess-Sarazin multigrid preconditioned GMRES
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Nodes along x
    #[arg(long, default_value_t = 10)]
    nx: usize,

    /// Nodes along y
    #[arg(long, default_value_t = 10)]
    ny: usize,

    /// Velocity dofs per node
    #[arg(long, default_value_t = 3)]
    velocity_dofs: usize,

    /// JSON file with the main parameter list (replaces the defaults)
    #[arg(long, value_name = "JSON")]
    params: Option<PathBuf>,

    /// JSON file with the pressure solver list (IFPACK or ML Parameters)
    #[arg(long, value_name = "JSON")]
    pressure_params: Option<PathBuf>,

    /// GMRES iteration budget
    #[arg(long, default_value_t = 20)]
    iterations: usize,

    /// GMRES relative tolerance
    #[arg(long, default_value_t = 1e-8)]
    tol: f64,

    /// Write the multigrid hierarchy as PETSc binaries into this directory
    #[arg(long, value_name = "DIR")]
    dump: Option<PathBuf>,
}

fn load_list(name: &str, path: &PathBuf) -> Result<ParameterList, AmgError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AmgError::Config(format!("unable to read {}: {}", path.display(), e)))?;
    ParameterList::from_json_str(name, &text)
}

#[cfg(feature = "petsc_export")]
fn dump_hierarchy(prec: &SaddlePointPreconditioner, dir: &PathBuf) -> Result<(), AmgError> {
    prec.write_hierarchy(dir, "cavity")
        .map_err(|e| AmgError::Config(format!("unable to write hierarchy to {}: {}", dir.display(), e)))
}

#[cfg(not(feature = "petsc_export"))]
fn dump_hierarchy(_prec: &SaddlePointPreconditioner, _dir: &PathBuf) -> Result<(), AmgError> {
    log::warn!("built without the petsc_export feature; --dump is ignored");
    Ok(())
}

fn run(cli: &Cli) -> Result<SolverStatus, AmgError> {
    let problem = CavityProblem::new(cli.nx, cli.ny, cli.velocity_dofs)?;
    let (default_params, default_pressure_params) = problem.parameter_lists();

    let params = match &cli.params {
        Some(path) => load_list("params", path)?,
        None => default_params,
    };
    let pressure_params = match &cli.pressure_params {
        Some(path) => load_list("pressure params", path)?,
        None => default_pressure_params,
    };

    let a = Arc::new(problem.matrix()?);
    let x_star = problem.manufactured_solution();
    let b = a.mul_vec(&x_star)?;

    let prec = SaddlePointPreconditioner::new(SystemMatrix::Monolithic(a.clone()), &params, &pressure_params)?;
    println!(
        "{} x {} cavity, {} dofs, {} multigrid levels",
        cli.nx,
        cli.ny,
        problem.num_dofs(),
        prec.num_levels()
    );
    for stats in prec.level_stats() {
        println!("{}", stats);
    }

    if let Some(dir) = &cli.dump {
        dump_hierarchy(&prec, dir)?;
    }

    let config = GmresConfig {
        restart: cli.iterations.max(1),
        max_iter: cli.iterations,
        tol: cli.tol,
    };
    let mut x = vec![0.0; b.len()];
    let result = gmres(a.as_ref(), &prec, &b, &mut x, &config)?;

    for (it, res) in result.residual_history.iter().enumerate() {
        println!("{:>4}  {:.6e}", it, res);
    }
    let error = x
        .iter()
        .zip(x_star.iter())
        .map(|(u, v)| (u - v).abs())
        .fold(0.0, f64::max);
    println!(
        "{:?} after {} iterations: residual reduction {:.3e}, max error {:.3e}",
        result.status,
        result.iterations,
        result.reduction(),
        error
    );

    Ok(result.status)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
