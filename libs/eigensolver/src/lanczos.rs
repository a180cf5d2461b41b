use crate::{start_vector, EigenSolverError};
use nalgebra::{DMatrix, SymmetricEigen};
use sparse_matrix::vector_ops::{dot, norm2, scale};
use sparse_matrix::CrsMatrix;

/// Largest Ritz value of `sign * S A S` after (at most) `iterations` Lanczos steps,
/// where `S = diag(inv_sqrt_diag)` (or the identity).
///
/// The operator must be symmetric.
pub(crate) fn lanczos(
    a: &CrsMatrix,
    inv_sqrt_diag: Option<&[f64]>,
    sign: f64,
    iterations: usize,
) -> Result<f64, EigenSolverError> {
    let n = a.num_rows();
    if n == 0 {
        return Ok(0.0);
    }
    let steps = iterations.clamp(1, n);

    let mut v = start_vector(n);
    let v_norm = norm2(&v);
    scale(1.0 / v_norm, &mut v);
    let mut v_prev = vec![0.0; n];

    let mut alphas: Vec<f64> = Vec::with_capacity(steps);
    let mut betas: Vec<f64> = Vec::with_capacity(steps);
    let mut beta = 0.0;
    let mut t_norm: f64 = 0.0;

    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];

    for _ in 0..steps {
        // w = sign * S A S v
        match inv_sqrt_diag {
            Some(s) => x.iter_mut().zip(v.iter().zip(s)).for_each(|(x_i, (v_i, s_i))| *x_i = v_i * s_i),
            None => x.copy_from_slice(&v),
        }
        a.apply(&x, &mut w)?;
        match inv_sqrt_diag {
            Some(s) => w.iter_mut().zip(s).for_each(|(w_i, s_i)| *w_i *= sign * s_i),
            None => scale(sign, &mut w),
        }

        let alpha = dot(&w, &v);
        for i in 0..n {
            w[i] -= alpha * v[i] + beta * v_prev[i];
        }
        alphas.push(alpha);

        beta = norm2(&w);
        t_norm = t_norm.max(alpha.abs() + beta);
        if beta <= 1e-12 * t_norm {
            // invariant subspace found
            break;
        }
        betas.push(beta);

        std::mem::swap(&mut v_prev, &mut v);
        v.iter_mut().zip(w.iter()).for_each(|(v_i, w_i)| *v_i = w_i / beta);
    }

    let k = alphas.len();
    let mut t = DMatrix::zeros(k, k);
    for (i, alpha) in alphas.iter().enumerate() {
        t[(i, i)] = *alpha;
        if i + 1 < k {
            t[(i, i + 1)] = betas[i];
            t[(i + 1, i)] = betas[i];
        }
    }

    let ritz_values = SymmetricEigen::new(t).eigenvalues;
    Ok(ritz_values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max))
}
