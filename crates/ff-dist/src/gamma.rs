//! Gamma distribution in shape/rate parameters.
//!
//! Density proportional to x^(shape-1) exp(-rate x). Message products add
//! (shape - 1) and rate, making Gamma(1, 0) the multiplicative identity.
//! A point mass is encoded as infinite shape with the point stored in
//! `rate`.

use ff_common::{OpResult, OperatorError};
use ff_math::{digamma, log_gamma};
use serde::{Deserialize, Serialize};

/// Gamma distribution / message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gamma {
    /// Shape parameter; +inf encodes a point mass.
    pub shape: f64,
    /// Rate parameter; holds the point location when shape is infinite.
    pub rate: f64,
}

impl Gamma {
    pub fn new(shape: f64, rate: f64) -> Self {
        Gamma { shape, rate }
    }

    /// The multiplicative identity Gamma(1, 0).
    pub fn uniform() -> Self {
        Gamma::new(1.0, 0.0)
    }

    pub fn point_mass(value: f64) -> Self {
        Gamma {
            shape: f64::INFINITY,
            rate: value,
        }
    }

    pub fn is_point_mass(&self) -> bool {
        self.shape == f64::INFINITY
    }

    pub fn is_uniform(&self) -> bool {
        self.shape == 1.0 && self.rate == 0.0
    }

    pub fn is_proper(&self) -> bool {
        self.is_point_mass() || (self.shape > 0.0 && self.rate > 0.0)
    }

    pub fn point(&self) -> f64 {
        self.rate
    }

    pub fn mean(&self) -> f64 {
        if self.is_point_mass() {
            return self.point();
        }
        self.shape / self.rate
    }

    pub fn variance(&self) -> f64 {
        if self.is_point_mass() {
            return 0.0;
        }
        self.shape / (self.rate * self.rate)
    }

    /// E[log x] = psi(shape) - ln(rate).
    pub fn mean_log(&self) -> f64 {
        if self.is_point_mass() {
            return self.point().ln();
        }
        digamma(self.shape) - self.rate.ln()
    }

    /// Moment matching from mean and variance.
    pub fn from_mean_and_variance(mean: f64, variance: f64) -> Self {
        if variance == 0.0 {
            return Gamma::point_mass(mean);
        }
        Gamma::new(mean * mean / variance, mean / variance)
    }

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
        if x < 0.0 {
            return f64::NEG_INFINITY;
        }
        self.shape * self.rate.ln() - log_gamma(self.shape) + (self.shape - 1.0) * x.ln()
            - self.rate * x
    }

    pub fn log_average_of(&self, other: &Gamma) -> f64 {
        if self.is_point_mass() {
            return other.log_prob(self.point());
        }
        if other.is_point_mass() {
            return self.log_prob(other.point());
        }
        if self.is_uniform() || other.is_uniform() {
            return 0.0;
        }
        let shape = self.shape + other.shape - 1.0;
        let rate = self.rate + other.rate;
        log_gamma(shape) - shape * rate.ln() - (log_gamma(self.shape)
            - self.shape * self.rate.ln())
            - (log_gamma(other.shape) - other.shape * other.rate.ln())
    }

    pub fn product(&self, other: &Gamma) -> OpResult<Gamma> {
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
        Ok(Gamma::new(
            self.shape + other.shape - 1.0,
            self.rate + other.rate,
        ))
    }

    pub fn ratio(&self, other: &Gamma, force_proper: bool) -> OpResult<Gamma> {
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
        let mut shape = self.shape - other.shape + 1.0;
        let mut rate = self.rate - other.rate;
        if force_proper {
            if shape <= 0.0 {
                shape = 1.0;
            }
            if rate < 0.0 {
                rate = 0.0;
            }
        }
        Ok(Gamma::new(shape, rate))
    }

    pub fn power(&self, exponent: f64) -> OpResult<Gamma> {
        if self.is_point_mass() {
            if exponent < 0.0 {
                return Err(OperatorError::NotSupported {
                    reason: "negative power of a point mass",
                });
            }
            if exponent == 0.0 {
                return Ok(Gamma::uniform());
            }
            return Ok(*self);
        }
        Ok(Gamma::new(
            exponent * (self.shape - 1.0) + 1.0,
            exponent * self.rate,
        ))
    }

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
    fn moments_round_trip() {
        let d = Gamma::new(3.0, 2.0);
        let e = Gamma::from_mean_and_variance(d.mean(), d.variance());
        assert!(approx_eq(e.shape, 3.0, 1e-12));
        assert!(approx_eq(e.rate, 2.0, 1e-12));
    }

    #[test]
    fn product_ratio_invert() {
        let a = Gamma::new(2.5, 1.5);
        let b = Gamma::new(1.2, 0.8);
        let p = a.product(&b).unwrap();
        let back = p.ratio(&b, false).unwrap();
        assert!(approx_eq(back.shape, a.shape, 1e-12));
        assert!(approx_eq(back.rate, a.rate, 1e-12));
    }

    #[test]
    fn uniform_is_identity() {
        let a = Gamma::new(2.5, 1.5);
        assert_eq!(a.product(&Gamma::uniform()).unwrap(), a);
        assert_eq!(a.ratio(&Gamma::uniform(), false).unwrap(), a);
        assert_eq!(a.log_average_of(&Gamma::uniform()), 0.0);
    }

    #[test]
    fn point_mass_log_prob() {
        let p = Gamma::point_mass(2.0);
        assert_eq!(p.log_prob(2.0), 0.0);
        assert_eq!(p.log_prob(1.0), f64::NEG_INFINITY);
        let d = Gamma::new(3.0, 2.0);
        assert!(approx_eq(d.log_average_of(&p), d.log_prob(2.0), 1e-12));
    }

    #[test]
    fn mean_log_matches_digamma() {
        let d = Gamma::new(4.0, 0.5);
        assert!(approx_eq(d.mean_log(), digamma(4.0) - 0.5f64.ln(), 1e-14));
    }
}
