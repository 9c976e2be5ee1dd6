//! Bernoulli distribution in log-odds.
//!
//! The log-odds parameterization makes message products additive and is
//! the form the nonlinear link operators produce. Point masses are the
//! infinite log-odds values.

use ff_common::{OpResult, OperatorError};
use ff_math::{log1p_exp, log_add_exp, log_sigmoid, sigmoid};
use serde::{Deserialize, Serialize};

/// Bernoulli distribution / message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bernoulli {
    /// log(P(true) / P(false)); +inf and -inf are the point masses.
    pub log_odds: f64,
}

/// Log-odds that two independent Bernoulli variables are equal.
///
/// logit P(a = b) for a ~ Bernoulli(l1), b ~ Bernoulli(l2):
/// log((p1 p2 + q1 q2) / (p1 q2 + q1 p2)) = log(1 + e^(l1+l2)) - log(e^l1 + e^l2).
pub fn logit_prob_equal(l1: f64, l2: f64) -> f64 {
    if l1.is_nan() || l2.is_nan() {
        return f64::NAN;
    }
    if l1.is_infinite() {
        return if l1 > 0.0 { l2 } else { -l2 };
    }
    if l2.is_infinite() {
        return if l2 > 0.0 { l1 } else { -l1 };
    }
    log1p_exp(l1 + l2) - log_add_exp(l1, l2)
}

impl Bernoulli {
    pub fn from_log_odds(log_odds: f64) -> Self {
        Bernoulli { log_odds }
    }

    pub fn from_prob_true(p: f64) -> Self {
        Bernoulli {
            log_odds: ff_math::logit(p),
        }
    }

    pub fn point_mass(value: bool) -> Self {
        Bernoulli {
            log_odds: if value {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            },
        }
    }

    pub fn uniform() -> Self {
        Bernoulli { log_odds: 0.0 }
    }

    pub fn is_point_mass(&self) -> bool {
        self.log_odds.is_infinite()
    }

    pub fn is_uniform(&self) -> bool {
        self.log_odds == 0.0
    }

    /// Every Bernoulli with non-NaN log-odds is normalizable.
    pub fn is_proper(&self) -> bool {
        !self.log_odds.is_nan()
    }

    pub fn point(&self) -> bool {
        self.log_odds > 0.0
    }

    pub fn prob_true(&self) -> f64 {
        sigmoid(self.log_odds)
    }

    pub fn log_prob_true(&self) -> f64 {
        log_sigmoid(self.log_odds)
    }

    pub fn log_prob_false(&self) -> f64 {
        log_sigmoid(-self.log_odds)
    }

    pub fn log_prob(&self, value: bool) -> f64 {
        if value {
            self.log_prob_true()
        } else {
            self.log_prob_false()
        }
    }

    /// log(p1 p2 + q1 q2): the log-probability the two agree.
    pub fn log_average_of(&self, other: &Bernoulli) -> f64 {
        if self.is_point_mass() {
            return other.log_prob(self.point());
        }
        if other.is_point_mass() {
            return self.log_prob(other.point());
        }
        let (l1, l2) = (self.log_odds, other.log_odds);
        log1p_exp(l1 + l2) - log1p_exp(l1) - log1p_exp(l2)
    }

    pub fn product(&self, other: &Bernoulli) -> OpResult<Bernoulli> {
        if self.is_point_mass() && other.is_point_mass() && self.point() != other.point() {
            return Err(OperatorError::AllZero {
                constraint: "product of unequal point masses",
            });
        }
        Ok(Bernoulli {
            log_odds: add_log_odds(self.log_odds, other.log_odds),
        })
    }

    pub fn ratio(&self, other: &Bernoulli, _force_proper: bool) -> OpResult<Bernoulli> {
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
        Ok(Bernoulli {
            log_odds: self.log_odds - other.log_odds,
        })
    }

    pub fn power(&self, exponent: f64) -> OpResult<Bernoulli> {
        if self.is_point_mass() && exponent < 0.0 {
            return Err(OperatorError::NotSupported {
                reason: "negative power of a point mass",
            });
        }
        Ok(Bernoulli {
            log_odds: self.log_odds * exponent,
        })
    }
}

/// Sum of log-odds with point masses absorbing.
fn add_log_odds(a: f64, b: f64) -> f64 {
    if a.is_infinite() {
        return a;
    }
    if b.is_infinite() {
        return b;
    }
    a + b
}
