//! Dense vector kernels shared by the solvers

pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y.iter()).map(|(a, b)| a * b).sum()
}

pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

/// y <- y + alpha x
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    y.iter_mut().zip(x.iter()).for_each(|(y_i, x_i)| *y_i += alpha * x_i);
}

/// x <- alpha x
pub fn scale(alpha: f64, x: &mut [f64]) {
    x.iter_mut().for_each(|x_i| *x_i *= alpha);
}

/// y <- alpha x + beta y
pub fn update(alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    y.iter_mut()
        .zip(x.iter())
        .for_each(|(y_i, x_i)| *y_i = alpha * x_i + beta * *y_i);
}
