//! Multivariate Gaussian in natural parameters over `ndarray` containers.
//!
//! Used by the matrix-vector product factor. Stored as (precision * mean,
//! precision matrix); moment access solves the linear system through an
//! internal Cholesky factorization, which doubles as the properness check.

use ff_common::{OpResult, OperatorError};
use ndarray::{Array1, Array2};

/// Multivariate Gaussian distribution / message.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorGaussian {
    pub mean_times_precision: Array1<f64>,
    pub precision: Array2<f64>,
}

impl VectorGaussian {
    pub fn uniform(dim: usize) -> Self {
        VectorGaussian {
            mean_times_precision: Array1::zeros(dim),
            precision: Array2::zeros((dim, dim)),
        }
    }

    pub fn from_natural(mean_times_precision: Array1<f64>, precision: Array2<f64>) -> Self {
        VectorGaussian {
            mean_times_precision,
            precision,
        }
    }

    pub fn from_mean_and_precision(mean: &Array1<f64>, precision: Array2<f64>) -> Self {
        VectorGaussian {
            mean_times_precision: precision.dot(mean),
            precision,
        }
    }

    /// Build from moment parameters; fails when the covariance is not
    /// positive definite.
    pub fn from_mean_and_covariance(mean: &Array1<f64>, covariance: &Array2<f64>) -> OpResult<Self> {
        let precision = invert_spd(covariance).ok_or(OperatorError::ImproperMessage {
            argument: "covariance",
        })?;
        Ok(VectorGaussian::from_mean_and_precision(mean, precision))
    }

    /// log of the integral of `other`'s density under `self`:
    /// the density of N(m1; m2, V1 + V2). Uniform arguments contribute
    /// factor one.
    pub fn log_average_of(&self, other: &VectorGaussian) -> OpResult<f64> {
        if self.is_uniform() || other.is_uniform() {
            return Ok(0.0);
        }
        let (m1, v1) = self.mean_and_covariance()?;
        let (m2, v2) = other.mean_and_covariance()?;
        let v = &v1 + &v2;
        let chol = cholesky(&v).ok_or(OperatorError::ImproperMessage {
            argument: "vector gaussian sum covariance",
        })?;
        let delta = &m1 - &m2;
        let solved = chol_solve(&chol, &delta);
        let log_det: f64 = (0..v.nrows()).map(|i| chol[(i, i)].ln()).sum::<f64>() * 2.0;
        let quad = delta.dot(&solved);
        let d = self.dim() as f64;
        Ok(-0.5 * (d * ff_math::LOG_2PI + log_det + quad))
    }

    pub fn dim(&self) -> usize {
        self.mean_times_precision.len()
    }

    pub fn is_uniform(&self) -> bool {
        self.precision.iter().all(|&p| p == 0.0)
            && self.mean_times_precision.iter().all(|&m| m == 0.0)
    }

    /// Proper iff the precision matrix is symmetric positive definite.
    pub fn is_proper(&self) -> bool {
        cholesky(&self.precision).is_some()
    }

    /// (mean, covariance); fails when the precision is not positive
    /// definite.
    pub fn mean_and_covariance(&self) -> OpResult<(Array1<f64>, Array2<f64>)> {
        let chol = cholesky(&self.precision).ok_or(OperatorError::ImproperMessage {
            argument: "vector gaussian",
        })?;
        let mean = chol_solve(&chol, &self.mean_times_precision);
        let n = self.dim();
        let mut cov = Array2::zeros((n, n));
        for j in 0..n {
            let mut e = Array1::zeros(n);
            e[j] = 1.0;
            let col = chol_solve(&chol, &e);
            for i in 0..n {
                cov[(i, j)] = col[i];
            }
        }
        Ok((mean, cov))
    }

    pub fn mean(&self) -> OpResult<Array1<f64>> {
        Ok(self.mean_and_covariance()?.0)
    }

    pub fn product(&self, other: &VectorGaussian) -> OpResult<VectorGaussian> {
        if self.dim() != other.dim() {
            return Err(OperatorError::DomainMismatch {
                argument: "vector gaussian",
                message: format!("dimension {} vs {}", self.dim(), other.dim()),
            });
        }
        Ok(VectorGaussian {
            mean_times_precision: &self.mean_times_precision + &other.mean_times_precision,
            precision: &self.precision + &other.precision,
        })
    }

    pub fn ratio(&self, other: &VectorGaussian, force_proper: bool) -> OpResult<VectorGaussian> {
        if self.dim() != other.dim() {
            return Err(OperatorError::DomainMismatch {
                argument: "vector gaussian",
                message: format!("dimension {} vs {}", self.dim(), other.dim()),
            });
        }
        let result = VectorGaussian {
            mean_times_precision: &self.mean_times_precision - &other.mean_times_precision,
            precision: &self.precision - &other.precision,
        };
        if force_proper && !result.is_proper() && !result.is_uniform() {
            // Fall back to the uniform message rather than propagate an
            // indefinite precision matrix
            return Ok(VectorGaussian::uniform(self.dim()));
        }
        Ok(result)
    }
}

/// Inverse of a symmetric positive definite matrix via Cholesky.
fn invert_spd(a: &Array2<f64>) -> Option<Array2<f64>> {
    let chol = cholesky(a)?;
    let n = a.nrows();
    let mut inv = Array2::zeros((n, n));
    for j in 0..n {
        let mut e = Array1::zeros(n);
        e[j] = 1.0;
        let col = chol_solve(&chol, &e);
        for i in 0..n {
            inv[(i, j)] = col[i];
        }
    }
    Some(inv)
}

/// Lower-triangular Cholesky factor, or None if not positive definite.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return None;
    }
    let mut l: Array2<f64> = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[(i, j)];
            for k in 0..j {
                sum -= l[(i, k)] * l[(j, k)];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[(i, j)] = sum.sqrt();
            } else {
                l[(i, j)] = sum / l[(j, j)];
            }
        }
    }
    Some(l)
}

/// Solve (L L^T) x = b given the Cholesky factor L.
fn chol_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[(i, k)] * y[k];
        }
        y[i] = sum / l[(i, i)];
    }
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[(k, i)] * x[k];
        }
        x[i] = sum / l[(i, i)];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn mean_round_trip() {
        let prec = array![[2.0, 0.5], [0.5, 1.0]];
        let mean = array![1.0, -2.0];
        let g = VectorGaussian::from_mean_and_precision(&mean, prec);
        let (m, cov) = g.mean_and_covariance().unwrap();
        assert!(approx_eq(m[0], 1.0, 1e-12));
        assert!(approx_eq(m[1], -2.0, 1e-12));
        // covariance * precision = identity
        let ident = cov.dot(&g.precision);
        assert!(approx_eq(ident[(0, 0)], 1.0, 1e-12));
        assert!(approx_eq(ident[(0, 1)], 0.0, 1e-12));
    }

    #[test]
    fn indefinite_precision_is_improper() {
        let g = VectorGaussian::from_natural(array![0.0, 0.0], array![[1.0, 0.0], [0.0, -1.0]]);
        assert!(!g.is_proper());
        assert!(g.mean_and_covariance().is_err());
    }

    #[test]
    fn product_adds_naturals() {
        let a = VectorGaussian::from_mean_and_precision(
            &array![1.0, 0.0],
            array![[1.0, 0.0], [0.0, 1.0]],
        );
        let b = VectorGaussian::from_mean_and_precision(
            &array![3.0, 0.0],
            array![[1.0, 0.0], [0.0, 1.0]],
        );
        let p = a.product(&b).unwrap();
        let (m, _) = p.mean_and_covariance().unwrap();
        assert!(approx_eq(m[0], 2.0, 1e-12));
    }

    #[test]
    fn ratio_force_proper_falls_back_to_uniform() {
        let narrow = VectorGaussian::from_mean_and_precision(&array![0.0], array![[1.0]]);
        let wide = VectorGaussian::from_mean_and_precision(&array![0.0], array![[2.0]]);
        let r = narrow.ratio(&wide, true).unwrap();
        assert!(r.is_uniform());
    }
}
