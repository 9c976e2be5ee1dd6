//! Matrix-vector product factor: y = A x with an observed matrix.
//!
//! Exact linear-Gaussian transforms in both directions. The backward
//! message stays in natural parameters (A^T P_y A, A^T eta_y), which
//! needs no inversion and is exact even when the y message is singular
//! along some directions.

use ff_common::{OpResult, OperatorError};
use ff_dist::VectorGaussian;
use ndarray::Array2;

fn check_shapes(matrix: &Array2<f64>, x_dim: usize) -> OpResult<()> {
    if matrix.ncols() != x_dim {
        return Err(OperatorError::DomainMismatch {
            argument: "matrix",
            message: format!("matrix has {} columns, x has {}", matrix.ncols(), x_dim),
        });
    }
    Ok(())
}

/// EP message to y: N(A m_x, A V_x A^T).
pub fn y_average_conditional(matrix: &Array2<f64>, x: &VectorGaussian) -> OpResult<VectorGaussian> {
    check_shapes(matrix, x.dim())?;
    let (mean_x, cov_x) = x.mean_and_covariance()?;
    let mean_y = matrix.dot(&mean_x);
    let cov_y = matrix.dot(&cov_x).dot(&matrix.t());
    VectorGaussian::from_mean_and_covariance(&mean_y, &cov_y)
}

/// EP message to x: natural parameters (A^T eta_y, A^T P_y A).
pub fn x_average_conditional(matrix: &Array2<f64>, y: &VectorGaussian) -> OpResult<VectorGaussian> {
    if matrix.nrows() != y.dim() {
        return Err(OperatorError::DomainMismatch {
            argument: "matrix",
            message: format!("matrix has {} rows, y has {}", matrix.nrows(), y.dim()),
        });
    }
    let mtp = matrix.t().dot(&y.mean_times_precision);
    let precision = matrix.t().dot(&y.precision).dot(matrix);
    Ok(VectorGaussian::from_natural(mtp, precision))
}

/// VMP messages coincide with EP for a deterministic linear map.
pub fn y_average_logarithm(matrix: &Array2<f64>, x: &VectorGaussian) -> OpResult<VectorGaussian> {
    y_average_conditional(matrix, x)
}

pub fn x_average_logarithm(matrix: &Array2<f64>, y: &VectorGaussian) -> OpResult<VectorGaussian> {
    x_average_conditional(matrix, y)
}

/// Evidence: log E[factor] under the current messages.
pub fn log_average_factor(
    y: &VectorGaussian,
    matrix: &Array2<f64>,
    x: &VectorGaussian,
) -> OpResult<f64> {
    let forward = y_average_conditional(matrix, x)?;
    forward.log_average_of(y)
}

/// Derived output: no evidence contribution.
pub fn log_evidence_ratio() -> f64 {
    0.0
}

pub fn average_log_factor() -> f64 {
    0.0
}
