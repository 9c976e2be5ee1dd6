//! One-dimensional Gaussian in natural parameters.
//!
//! Stored as (mean * precision, precision) so that products and ratios of
//! messages are coordinate-wise adds and subtracts. Degenerate states:
//! a point mass is encoded as infinite precision with the point stored in
//! `mean_times_precision`; the uniform distribution is all zeros.

use ff_common::{OpResult, OperatorError};
use ff_math::LOG_2PI;
use serde::{Deserialize, Serialize};

/// Gaussian distribution / message in natural parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    /// mean * precision; holds the point location when precision is infinite.
    pub mean_times_precision: f64,
    /// 1 / variance; 0 encodes uniform, +inf encodes a point mass.
    pub precision: f64,
}

impl Gaussian {
    /// The uniform (improper, all-zero natural parameters) distribution.
    pub fn uniform() -> Self {
        Gaussian {
            mean_times_precision: 0.0,
            precision: 0.0,
        }
    }

    /// A point mass at `value`.
    pub fn point_mass(value: f64) -> Self {
        Gaussian {
            mean_times_precision: value,
            precision: f64::INFINITY,
        }
    }

    pub fn from_mean_and_variance(mean: f64, variance: f64) -> Self {
        if variance == 0.0 {
            return Gaussian::point_mass(mean);
        }
        if variance == f64::INFINITY {
            return Gaussian::uniform();
        }
        Gaussian {
            mean_times_precision: mean / variance,
            precision: 1.0 / variance,
        }
    }

    pub fn from_mean_and_precision(mean: f64, precision: f64) -> Self {
        if precision == f64::INFINITY {
            return Gaussian::point_mass(mean);
        }
        Gaussian {
            mean_times_precision: mean * precision,
            precision,
        }
    }

    pub fn from_natural(mean_times_precision: f64, precision: f64) -> Self {
        Gaussian {
            mean_times_precision,
            precision,
        }
    }

    pub fn is_point_mass(&self) -> bool {
        self.precision == f64::INFINITY
    }

    pub fn is_uniform(&self) -> bool {
        self.precision == 0.0 && self.mean_times_precision == 0.0
    }

    /// Proper means normalizable: positive precision, or a point mass.
    pub fn is_proper(&self) -> bool {
        self.precision > 0.0
    }

    /// The location of a point mass.
    ///
    /// Callers check `is_point_mass` first; the value is meaningless
    /// otherwise.
    pub fn point(&self) -> f64 {
        self.mean_times_precision
    }

    /// (mean, variance). Uniform yields (0, inf); a point mass (point, 0).
    pub fn mean_and_variance(&self) -> (f64, f64) {
        if self.is_point_mass() {
            (self.point(), 0.0)
        } else if self.precision == 0.0 {
            (0.0, f64::INFINITY)
        } else {
            (
                self.mean_times_precision / self.precision,
                1.0 / self.precision,
            )
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean_and_variance().0
    }

    pub fn variance(&self) -> f64 {
        self.mean_and_variance().1
    }

    /// E[x^2].
    pub fn mean_square(&self) -> f64 {
        let (m, v) = self.mean_and_variance();
        v + m * m
    }

    /// Log-density at `x`. A point mass uses the counting-measure
    /// convention: 0 at the point, -inf elsewhere.
    pub fn log_prob(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if self.is_point_mass() {
            return if x == self.point() {
                0.0
            } else {
                f64::NEG_INFINITY
            };
        }
        if self.precision == 0.0 {
            return 0.0;
        }
        let (m, v) = self.mean_and_variance();
        let d = x - m;
        -0.5 * (LOG_2PI + v.ln() + d * d / v)
    }

    /// log of the integral of `other`'s density under `self`.
    ///
    /// For two proper Gaussians this is the density of N(m1; m2, v1 + v2).
    /// Uniform arguments contribute factor one.
    pub fn log_average_of(&self, other: &Gaussian) -> f64 {
        if self.is_point_mass() {
            return other.log_prob(self.point());
        }
        if other.is_point_mass() {
            return self.log_prob(other.point());
        }
        if self.precision == 0.0 || other.precision == 0.0 {
            return 0.0;
        }
        let (m1, v1) = self.mean_and_variance();
        let (m2, v2) = other.mean_and_variance();
        let v = v1 + v2;
        let d = m1 - m2;
        -0.5 * (LOG_2PI + v.ln() + d * d / v)
    }

    /// Product of two Gaussian messages.
    ///
    /// Point masses absorb: the product with a point mass is that point
    /// mass, unless the two points disagree, which is an all-zero
    /// contradiction.
    pub fn product(&self, other: &Gaussian) -> OpResult<Gaussian> {
        if self.is_point_mass() {
            if other.is_point_mass() && other.point() != self.point() {
                return Err(OperatorError::AllZero {
                    constraint: "product of unequal point masses",
                });
            }
            return Ok(*self);
        }
        if other.is_point_mass() {
            return Ok(*other);
        }
        Ok(Gaussian {
            mean_times_precision: self.mean_times_precision + other.mean_times_precision,
            precision: self.precision + other.precision,
        })
    }

    /// Ratio of two Gaussian messages.
    ///
    /// With `force_proper`, a negative resulting precision is clamped to
    /// zero, keeping the linear tilt; the message stays representable and
    /// products with it remain valid.
    pub fn ratio(&self, other: &Gaussian, force_proper: bool) -> OpResult<Gaussian> {
        if other.is_uniform() {
            return Ok(*self);
        }
        if self.is_point_mass() {
            if other.is_point_mass() {
                return Err(OperatorError::NotSupported {
                    reason: "ratio of two point masses",
                });
            }
            return Ok(*self);
        }
        if other.is_point_mass() {
            return Err(OperatorError::NotSupported {
                reason: "ratio with a point-mass denominator",
            });
        }
        let mut precision = self.precision - other.precision;
        let mut mtp = self.mean_times_precision - other.mean_times_precision;
        if force_proper && precision < 0.0 {
            precision = 0.0;
            if !mtp.is_finite() {
                mtp = 0.0;
            }
        }
        Ok(Gaussian {
            mean_times_precision: mtp,
            precision,
        })
    }

    /// Message raised to a power (natural parameters scaled).
    pub fn power(&self, exponent: f64) -> OpResult<Gaussian> {
        if self.is_point_mass() {
            if exponent < 0.0 {
                return Err(OperatorError::NotSupported {
                    reason: "negative power of a point mass",
                });
            }
            if exponent == 0.0 {
                return Ok(Gaussian::uniform());
            }
            return Ok(*self);
        }
        Ok(Gaussian {
            mean_times_precision: self.mean_times_precision * exponent,
            precision: self.precision * exponent,
        })
    }

    /// Fails unless the message is proper, naming the offending argument.
    pub fn require_proper(&self, argument: &'static str) -> OpResult<()> {
        if self.is_proper() {
            Ok(())
        } else {
            Err(OperatorError::ImproperMessage { argument })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn moment_round_trip() {
        let g = Gaussian::from_mean_and_variance(1.5, 2.5);
        let (m, v) = g.mean_and_variance();
        assert!(approx_eq(m, 1.5, 1e-12));
        assert!(approx_eq(v, 2.5, 1e-12));
    }

    #[test]
    fn degenerate_states() {
        let p = Gaussian::point_mass(3.0);
        assert!(p.is_point_mass());
        assert_eq!(p.mean_and_variance(), (3.0, 0.0));
        assert_eq!(p.log_prob(3.0), 0.0);
        assert_eq!(p.log_prob(2.0), f64::NEG_INFINITY);

        let u = Gaussian::uniform();
        assert!(u.is_uniform());
        assert!(!u.is_proper());
        assert_eq!(u.log_prob(7.0), 0.0);
    }

    #[test]
    fn product_adds_naturals() {
        let a = Gaussian::from_mean_and_variance(0.0, 1.0);
        let b = Gaussian::from_mean_and_variance(2.0, 1.0);
        let p = a.product(&b).unwrap();
        let (m, v) = p.mean_and_variance();
        assert!(approx_eq(m, 1.0, 1e-12));
        assert!(approx_eq(v, 0.5, 1e-12));
    }

    #[test]
    fn point_mass_absorbs_product() {
        let p = Gaussian::point_mass(2.0);
        let g = Gaussian::from_mean_and_variance(0.0, 1.0);
        assert_eq!(g.product(&p).unwrap(), p);
        assert!(matches!(
            p.product(&Gaussian::point_mass(3.0)),
            Err(OperatorError::AllZero { .. })
        ));
    }

    #[test]
    fn ratio_against_uniform_is_identity() {
        let g = Gaussian::from_mean_and_variance(-0.7, 3.1);
        assert_eq!(g.ratio(&Gaussian::uniform(), false).unwrap(), g);
    }

    #[test]
    fn ratio_inverts_product() {
        let a = Gaussian::from_mean_and_variance(1.0, 2.0);
        let b = Gaussian::from_mean_and_variance(-1.0, 4.0);
        let p = a.product(&b).unwrap();
        let back = p.ratio(&b, false).unwrap();
        assert!(approx_eq(back.mean_times_precision, a.mean_times_precision, 1e-12));
        assert!(approx_eq(back.precision, a.precision, 1e-12));
    }

    #[test]
    fn force_proper_clamps_negative_precision() {
        let narrow = Gaussian::from_mean_and_variance(0.0, 1.0);
        let wide = Gaussian::from_mean_and_variance(0.0, 0.5);
        let improper = narrow.ratio(&wide, false).unwrap();
        assert!(improper.precision < 0.0);
        let forced = narrow.ratio(&wide, true).unwrap();
        assert_eq!(forced.precision, 0.0);
    }

    #[test]
    fn log_average_of_is_symmetric() {
        let a = Gaussian::from_mean_and_variance(1.0, 2.0);
        let b = Gaussian::from_mean_and_variance(-0.5, 0.7);
        assert!(approx_eq(a.log_average_of(&b), b.log_average_of(&a), 1e-12));
    }

    #[test]
    fn log_average_of_point_mass_is_density() {
        let a = Gaussian::from_mean_and_variance(1.0, 2.0);
        let p = Gaussian::point_mass(0.3);
        assert!(approx_eq(a.log_average_of(&p), a.log_prob(0.3), 1e-12));
    }

    #[test]
    fn power_scales_naturals() {
        let g = Gaussian::from_mean_and_variance(2.0, 1.0);
        let h = g.power(0.5).unwrap();
        assert!(approx_eq(h.precision, 0.5, 1e-12));
        assert!(approx_eq(h.mean(), 2.0, 1e-12));
    }
}
