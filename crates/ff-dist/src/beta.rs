//! Beta distribution in count parameters.
//!
//! Density proportional to p^(a-1) (1-p)^(b-1); products of messages add
//! counts minus one, so Beta(1, 1) is the multiplicative identity. A point
//! mass is encoded as infinite `true_count` with the point stored in
//! `false_count`.

use ff_common::{OpResult, OperatorError};
use ff_math::{digamma, log_beta, trigamma};
use serde::{Deserialize, Serialize};

const NEWTON_MAX_ITERS: usize = 100;
const NEWTON_TOL: f64 = 1e-10;

/// Beta distribution / message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beta {
    /// Pseudo-count of true outcomes (the "alpha" parameter).
    pub true_count: f64,
    /// Pseudo-count of false outcomes; holds the point location when
    /// `true_count` is infinite.
    pub false_count: f64,
}

impl Beta {
    pub fn new(true_count: f64, false_count: f64) -> Self {
        Beta {
            true_count,
            false_count,
        }
    }

    /// The multiplicative identity Beta(1, 1).
    pub fn uniform() -> Self {
        Beta::new(1.0, 1.0)
    }

    /// A point mass at `value` in [0, 1].
    pub fn point_mass(value: f64) -> Self {
        Beta {
            true_count: f64::INFINITY,
            false_count: value,
        }
    }

    pub fn is_point_mass(&self) -> bool {
        self.true_count == f64::INFINITY
    }

    pub fn is_uniform(&self) -> bool {
        self.true_count == 1.0 && self.false_count == 1.0
    }

    pub fn is_proper(&self) -> bool {
        self.is_point_mass() || (self.true_count > 0.0 && self.false_count > 0.0)
    }

    pub fn point(&self) -> f64 {
        self.false_count
    }

    pub fn total_count(&self) -> f64 {
        self.true_count + self.false_count
    }

    pub fn mean(&self) -> f64 {
        if self.is_point_mass() {
            return self.point();
        }
        self.true_count / self.total_count()
    }

    pub fn variance(&self) -> f64 {
        if self.is_point_mass() {
            return 0.0;
        }
        let s = self.total_count();
        self.true_count * self.false_count / (s * s * (s + 1.0))
    }

    /// E[log p] = psi(a) - psi(a + b).
    pub fn mean_log(&self) -> f64 {
        if self.is_point_mass() {
            return self.point().ln();
        }
        digamma(self.true_count) - digamma(self.total_count())
    }

    /// E[log(1 - p)] = psi(b) - psi(a + b).
    pub fn mean_log_complement(&self) -> f64 {
        if self.is_point_mass() {
            return (-self.point()).ln_1p();
        }
        digamma(self.false_count) - digamma(self.total_count())
    }

    /// Moment matching: the Beta with the given mean and variance.
    ///
    /// Exact whenever the pair is representable (variance below the
    /// two-point-mass bound mean*(1-mean)); zero variance gives the point
    /// mass.
    pub fn from_mean_and_variance(mean: f64, variance: f64) -> Self {
        if variance == 0.0 {
            return Beta::point_mass(mean);
        }
        let total = mean * (1.0 - mean) / variance - 1.0;
        Beta::new(mean * total, (1.0 - mean) * total)
    }

    /// Inverse moment problem: the Beta matching a desired mean and
    /// E[log p], solved by a damped Newton iteration on the total count.
    ///
    /// The initial bracket comes from the large-count asymptotics of the
    /// digamma difference; the `mean_log >= ln(mean)` boundary collapses to
    /// the explicit point-mass limit.
    pub fn from_mean_and_mean_log(mean: f64, mean_log: f64) -> Self {
        if mean <= 0.0 {
            return Beta::point_mass(0.0);
        }
        if mean >= 1.0 {
            return Beta::point_mass(1.0);
        }
        let gap = mean.ln() - mean_log;
        if gap <= 0.0 {
            // E[log p] can approach ln(mean) only as the density collapses
            return Beta::point_mass(mean);
        }
        // Asymptotic: psi(m s) - psi(s) ~ ln(m) - (1/m - 1)/(2 s)
        let mut s = (1.0 / mean - 1.0) / (2.0 * gap);
        for _ in 0..NEWTON_MAX_ITERS {
            let f = digamma(mean * s) - digamma(s) - mean_log;
            if f.abs() < NEWTON_TOL {
                break;
            }
            let df = mean * trigamma(mean * s) - trigamma(s);
            let mut step = f / df;
            // Damp steps that would leave the positive half-line
            while s - step <= 0.0 {
                step *= 0.5;
            }
            s -= step;
        }
        Beta::new(mean * s, (1.0 - mean) * s)
    }

    /// Log-density at `x` in [0, 1].
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
        if !(0.0..=1.0).contains(&x) {
            return f64::NEG_INFINITY;
        }
        (self.true_count - 1.0) * x.ln() + (self.false_count - 1.0) * (-x).ln_1p()
            - log_beta(self.true_count, self.false_count)
    }

    /// log of the integral of `other`'s density under `self`.
    pub fn log_average_of(&self, other: &Beta) -> f64 {
        if self.is_point_mass() {
            return other.log_prob(self.point());
        }
        if other.is_point_mass() {
            return self.log_prob(other.point());
        }
        if self.is_uniform() || other.is_uniform() {
            return 0.0;
        }
        let a = self.true_count + other.true_count - 1.0;
        let b = self.false_count + other.false_count - 1.0;
        log_beta(a, b)
            - log_beta(self.true_count, self.false_count)
            - log_beta(other.true_count, other.false_count)
    }

    pub fn product(&self, other: &Beta) -> OpResult<Beta> {
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
        Ok(Beta::new(
            self.true_count + other.true_count - 1.0,
            self.false_count + other.false_count - 1.0,
        ))
    }

    /// Ratio of messages; with `force_proper`, non-positive counts are
    /// clamped back to the identity value.
    pub fn ratio(&self, other: &Beta, force_proper: bool) -> OpResult<Beta> {
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
        let mut a = self.true_count - other.true_count + 1.0;
        let mut b = self.false_count - other.false_count + 1.0;
        if force_proper {
            if a <= 0.0 {
                a = 1.0;
            }
            if b <= 0.0 {
                b = 1.0;
            }
        }
        Ok(Beta::new(a, b))
    }

    pub fn power(&self, exponent: f64) -> OpResult<Beta> {
        if self.is_point_mass() {
            if exponent < 0.0 {
                return Err(OperatorError::NotSupported {
                    reason: "negative power of a point mass",
                });
            }
            if exponent == 0.0 {
                return Ok(Beta::uniform());
            }
            return Ok(*self);
        }
        Ok(Beta::new(
            exponent * (self.true_count - 1.0) + 1.0,
            exponent * (self.false_count - 1.0) + 1.0,
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
