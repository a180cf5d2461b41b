use crate::{start_vector, EigenSolverError};
use sparse_matrix::vector_ops::{norm2, scale};
use sparse_matrix::CrsMatrix;

/// Power iteration on `D^-1 A` (or `A`); returns the magnitude of the dominant eigenvalue
pub(crate) fn power_method(
    a: &CrsMatrix,
    diag: Option<&[f64]>,
    iterations: usize,
) -> Result<f64, EigenSolverError> {
    let n = a.num_rows();
    if n == 0 {
        return Ok(0.0);
    }

    let mut x = start_vector(n);
    let x_norm = norm2(&x);
    scale(1.0 / x_norm, &mut x);

    let mut y = vec![0.0; n];
    let mut lambda = 0.0;

    for _ in 0..iterations.max(1) {
        a.apply(&x, &mut y)?;
        if let Some(d) = diag {
            y.iter_mut().zip(d).for_each(|(y_i, d_i)| *y_i /= d_i);
        }

        lambda = norm2(&y);
        if lambda == 0.0 {
            break;
        }
        x.iter_mut().zip(y.iter()).for_each(|(x_i, y_i)| *x_i = y_i / lambda);
    }

    Ok(lambda)
}
