//! Restarted, right-preconditioned GMRES.

use crate::preconditioner::SaddlePointPreconditioner;
use crate::AmgError;
use sparse_matrix::vector_ops::{axpy, dot, norm2, scale};
use sparse_matrix::Operator;

/// Approximate inverse used inside the Krylov iteration
pub trait Preconditioner {
    /// z = M^-1 r
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), AmgError>;
}

impl Preconditioner for SaddlePointPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), AmgError> {
        self.apply_inverse(r, z)
    }
}

/// M = I
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), AmgError> {
        z.copy_from_slice(r);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GmresConfig {
    /// Krylov dimension between restarts
    pub restart: usize,
    /// Total number of inner iterations
    pub max_iter: usize,
    /// Tolerance on the residual norm relative to the initial one
    pub tol: f64,
}

impl Default for GmresConfig {
    fn default() -> Self {
        Self {
            restart: 30,
            max_iter: 100,
            tol: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Converged,
    MaxIterations,
    /// The Krylov space became invariant before the tolerance was reached
    Breakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    pub status: SolverStatus,
    pub iterations: usize,
    pub residual_norm: f64,
    pub initial_residual_norm: f64,
    /// Residual norm before the first and after every iteration
    pub residual_history: Vec<f64>,
}

impl SolverResult {
    pub fn reduction(&self) -> f64 {
        if self.initial_residual_norm == 0.0 {
            0.0
        } else {
            self.residual_norm / self.initial_residual_norm
        }
    }
}

#[derive(Clone, Copy)]
struct Givens {
    c: f64,
    s: f64,
}

impl Givens {
    // rotation that zeroes b in (a, b)
    fn new(a: f64, b: f64) -> Self {
        let h = a.hypot(b);
        if h == 0.0 {
            Self { c: 1.0, s: 0.0 }
        } else {
            Self { c: a / h, s: b / h }
        }
    }

    fn apply(&self, a: &mut f64, b: &mut f64) {
        let (ta, tb) = (*a, *b);
        *a = self.c * ta + self.s * tb;
        *b = -self.s * ta + self.c * tb;
    }
}

/// Solve `A x = b` with GMRES(m), preconditioned from the right: `A M^-1 u = b`, `x = M^-1 u`.
///
/// `x` holds the initial guess on entry and the approximate solution on exit. The residual norms
/// of the history are the Arnoldi estimates, which equal the true residual norms in exact
/// arithmetic for right preconditioning.
pub fn gmres<A, M>(
    a: &A,
    m: &M,
    b: &[f64],
    x: &mut [f64],
    config: &GmresConfig,
) -> Result<SolverResult, AmgError>
where
    A: Operator + ?Sized,
    M: Preconditioner + ?Sized,
{
    let n = b.len();
    let restart = config.restart.max(1).min(n.max(1));

    let mut r = vec![0.0; n];
    residual(a, b, x, &mut r)?;
    let initial = norm2(&r);
    let mut history = vec![initial];

    log::debug!("GMRES({}): initial residual {:.6e}", restart, initial);

    if initial == 0.0 {
        return Ok(SolverResult {
            status: SolverStatus::Converged,
            iterations: 0,
            residual_norm: 0.0,
            initial_residual_norm: 0.0,
            residual_history: history,
        });
    }

    let target = config.tol * initial;
    let mut iterations = 0;
    let mut res_norm = initial;
    let mut status = SolverStatus::MaxIterations;

    while iterations < config.max_iter {
        let beta = norm2(&r);
        let mut basis: Vec<Vec<f64>> = Vec::with_capacity(restart + 1);
        let mut precond_basis: Vec<Vec<f64>> = Vec::with_capacity(restart);
        let mut v0 = r.clone();
        scale(1.0 / beta, &mut v0);
        basis.push(v0);

        // column j of the Hessenberg matrix holds j + 2 entries
        let mut hessenberg: Vec<Vec<f64>> = Vec::with_capacity(restart);
        let mut rotations: Vec<Givens> = Vec::with_capacity(restart);
        let mut g = vec![0.0; restart + 1];
        g[0] = beta;

        let mut breakdown = false;
        for j in 0..restart {
            if iterations == config.max_iter {
                break;
            }
            iterations += 1;

            let mut z = vec![0.0; n];
            m.apply(&basis[j], &mut z)?;
            let mut w = vec![0.0; n];
            a.apply(&z, &mut w)?;
            precond_basis.push(z);

            let mut h = vec![0.0; j + 2];
            for (i, v) in basis.iter().enumerate() {
                h[i] = dot(&w, v);
                axpy(-h[i], v, &mut w);
            }
            h[j + 1] = norm2(&w);

            for (i, rot) in rotations.iter().enumerate() {
                let (upper, lower) = h.split_at_mut(i + 1);
                rot.apply(&mut upper[i], &mut lower[0]);
            }
            let rot = Givens::new(h[j], h[j + 1]);
            {
                let (upper, lower) = h.split_at_mut(j + 1);
                rot.apply(&mut upper[j], &mut lower[0]);
            }
            {
                let (upper, lower) = g.split_at_mut(j + 1);
                rot.apply(&mut upper[j], &mut lower[0]);
            }
            rotations.push(rot);

            let h_next = norm2(&w);
            hessenberg.push(h);

            res_norm = g[j + 1].abs();
            history.push(res_norm);
            log::trace!("GMRES iteration {}: residual {:.6e}", iterations, res_norm);

            if res_norm <= target {
                status = SolverStatus::Converged;
                break;
            }
            if h_next <= f64::EPSILON * beta {
                breakdown = true;
                break;
            }
            scale(1.0 / h_next, &mut w);
            basis.push(w);
        }

        // back substitution of the triangular system
        let k = hessenberg.len();
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut s = g[i];
            for (l, y_l) in y.iter().enumerate().take(k).skip(i + 1) {
                s -= hessenberg[l][i] * y_l;
            }
            y[i] = s / hessenberg[i][i];
        }
        for (y_i, z_i) in y.iter().zip(precond_basis.iter()) {
            axpy(*y_i, z_i, x);
        }

        residual(a, b, x, &mut r)?;
        res_norm = norm2(&r);

        if status == SolverStatus::Converged || res_norm <= target {
            status = SolverStatus::Converged;
            break;
        }
        if breakdown {
            status = SolverStatus::Breakdown;
            break;
        }
    }

    log::debug!(
        "GMRES finished after {} iterations: residual {:.6e} ({:?})",
        iterations,
        res_norm,
        status
    );

    Ok(SolverResult {
        status,
        iterations,
        residual_norm: res_norm,
        initial_residual_norm: initial,
        residual_history: history,
    })
}

fn residual<A: Operator + ?Sized>(a: &A, b: &[f64], x: &[f64], r: &mut [f64]) -> Result<(), AmgError> {
    a.apply(x, r)?;
    r.iter_mut().zip(b.iter()).for_each(|(r_i, b_i)| *r_i = b_i - *r_i);
    Ok(())
}
