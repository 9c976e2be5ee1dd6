//! Discrete distribution over 0..n in log-probability form.

use ff_common::{OpResult, OperatorError};
use ff_math::{log_sum_exp, normalize_log_probs};
use serde::{Deserialize, Serialize};

/// Discrete distribution / message over a fixed-size support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrete {
    /// Normalized log-probabilities, one per support point.
    pub log_probs: Vec<f64>,
}

impl Discrete {
    /// Build from unnormalized log-weights. Returns the log-normalizer
    /// alongside; all-(-inf) weights are an all-zero contradiction.
    pub fn from_log_weights(mut log_weights: Vec<f64>) -> OpResult<(Discrete, f64)> {
        if log_weights.iter().any(|w| w.is_nan()) {
            return Err(OperatorError::NumericalBreakdown {
                context: "discrete log-weights",
            });
        }
        let norm = normalize_log_probs(&mut log_weights);
        if norm == f64::NEG_INFINITY {
            return Err(OperatorError::AllZero {
                constraint: "all discrete weights are zero",
            });
        }
        if norm == f64::INFINITY {
            return Err(OperatorError::NumericalBreakdown {
                context: "discrete normalizer overflow",
            });
        }
        Ok((
            Discrete {
                log_probs: log_weights,
            },
            norm,
        ))
    }

    pub fn uniform(n: usize) -> Self {
        let lp = -(n as f64).ln();
        Discrete {
            log_probs: vec![lp; n],
        }
    }

    pub fn point_mass(index: usize, n: usize) -> Self {
        let mut log_probs = vec![f64::NEG_INFINITY; n];
        log_probs[index] = 0.0;
        Discrete { log_probs }
    }

    pub fn len(&self) -> usize {
        self.log_probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_probs.is_empty()
    }

    pub fn is_uniform(&self) -> bool {
        let first = self.log_probs[0];
        self.log_probs.iter().all(|&lp| (lp - first).abs() < 1e-14)
    }

    pub fn is_point_mass(&self) -> bool {
        self.log_probs.iter().filter(|lp| lp.is_finite()).count() == 1
    }

    pub fn is_proper(&self) -> bool {
        !self.log_probs.is_empty()
    }

    /// Index of the point mass; meaningless unless `is_point_mass`.
    pub fn point(&self) -> usize {
        self.log_probs
            .iter()
            .position(|lp| lp.is_finite())
            .unwrap_or(0)
    }

    pub fn prob(&self, index: usize) -> f64 {
        self.log_probs[index].exp()
    }

    pub fn log_prob(&self, index: usize) -> f64 {
        self.log_probs[index]
    }

    /// Index with the highest probability.
    pub fn mode(&self) -> usize {
        let mut best = 0;
        for (i, &lp) in self.log_probs.iter().enumerate() {
            if lp > self.log_probs[best] {
                best = i;
            }
        }
        best
    }

    /// log sum_i p_i q_i.
    pub fn log_average_of(&self, other: &Discrete) -> f64 {
        debug_assert_eq!(self.len(), other.len());
        let terms: Vec<f64> = self
            .log_probs
            .iter()
            .zip(other.log_probs.iter())
            .map(|(&a, &b)| a + b)
            .collect();
        log_sum_exp(&terms)
    }

    pub fn product(&self, other: &Discrete) -> OpResult<Discrete> {
        if self.len() != other.len() {
            return Err(OperatorError::DomainMismatch {
                argument: "discrete",
                message: format!("support {} vs {}", self.len(), other.len()),
            });
        }
        let weights: Vec<f64> = self
            .log_probs
            .iter()
            .zip(other.log_probs.iter())
            .map(|(&a, &b)| a + b)
            .collect();
        Ok(Discrete::from_log_weights(weights)?.0)
    }

    pub fn ratio(&self, other: &Discrete, _force_proper: bool) -> OpResult<Discrete> {
        if self.len() != other.len() {
            return Err(OperatorError::DomainMismatch {
                argument: "discrete",
                message: format!("support {} vs {}", self.len(), other.len()),
            });
        }
        if self
            .log_probs
            .iter()
            .zip(other.log_probs.iter())
            .any(|(&a, &b)| b == f64::NEG_INFINITY && a != f64::NEG_INFINITY)
        {
            return Err(OperatorError::NotSupported {
                reason: "ratio with a zero-probability denominator entry",
            });
        }
        let weights: Vec<f64> = self
            .log_probs
            .iter()
            .zip(other.log_probs.iter())
            .map(|(&a, &b)| if a == b { 0.0 } else { a - b })
            .collect();
        Ok(Discrete::from_log_weights(weights)?.0)
    }

    pub fn power(&self, exponent: f64) -> OpResult<Discrete> {
        let weights: Vec<f64> = self.log_probs.iter().map(|&a| a * exponent).collect();
        Ok(Discrete::from_log_weights(weights)?.0)
    }
}
