//! Dirichlet distribution in pseudo-count parameters.

use ff_common::{OpResult, OperatorError};
use ff_math::{digamma, log_gamma};
use serde::{Deserialize, Serialize};

/// Dirichlet distribution / message over probability vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dirichlet {
    /// Pseudo-counts, one per component; all-ones is the identity.
    pub pseudo_counts: Vec<f64>,
}

impl Dirichlet {
    pub fn new(pseudo_counts: Vec<f64>) -> Self {
        Dirichlet { pseudo_counts }
    }

    pub fn uniform(n: usize) -> Self {
        Dirichlet {
            pseudo_counts: vec![1.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.pseudo_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pseudo_counts.is_empty()
    }

    pub fn is_uniform(&self) -> bool {
        self.pseudo_counts.iter().all(|&c| c == 1.0)
    }

    pub fn is_proper(&self) -> bool {
        self.pseudo_counts.iter().all(|&c| c > 0.0)
    }

    pub fn total_count(&self) -> f64 {
        self.pseudo_counts.iter().sum()
    }

    pub fn mean(&self) -> Vec<f64> {
        let total = self.total_count();
        self.pseudo_counts.iter().map(|&c| c / total).collect()
    }

    /// E[log p_i] = psi(c_i) - psi(sum c).
    pub fn mean_log(&self) -> Vec<f64> {
        let total_psi = digamma(self.total_count());
        self.pseudo_counts
            .iter()
            .map(|&c| digamma(c) - total_psi)
            .collect()
    }

    fn log_normalizer(&self) -> f64 {
        let sum_lgamma: f64 = self.pseudo_counts.iter().map(|&c| log_gamma(c)).sum();
        sum_lgamma - log_gamma(self.total_count())
    }

    pub fn log_average_of(&self, other: &Dirichlet) -> f64 {
        if self.is_uniform() || other.is_uniform() {
            return 0.0;
        }
        let combined = Dirichlet::new(
            self.pseudo_counts
                .iter()
                .zip(other.pseudo_counts.iter())
                .map(|(&a, &b)| a + b - 1.0)
                .collect(),
        );
        combined.log_normalizer() - self.log_normalizer() - other.log_normalizer()
    }

    pub fn product(&self, other: &Dirichlet) -> OpResult<Dirichlet> {
        if self.len() != other.len() {
            return Err(OperatorError::DomainMismatch {
                argument: "dirichlet",
                message: format!("dimension {} vs {}", self.len(), other.len()),
            });
        }
        Ok(Dirichlet::new(
            self.pseudo_counts
                .iter()
                .zip(other.pseudo_counts.iter())
                .map(|(&a, &b)| a + b - 1.0)
                .collect(),
        ))
    }

    pub fn ratio(&self, other: &Dirichlet, force_proper: bool) -> OpResult<Dirichlet> {
        if self.len() != other.len() {
            return Err(OperatorError::DomainMismatch {
                argument: "dirichlet",
                message: format!("dimension {} vs {}", self.len(), other.len()),
            });
        }
        Ok(Dirichlet::new(
            self.pseudo_counts
                .iter()
                .zip(other.pseudo_counts.iter())
                .map(|(&a, &b)| {
                    let c = a - b + 1.0;
                    if force_proper && c <= 0.0 {
                        1.0
                    } else {
                        c
                    }
                })
                .collect(),
        ))
    }

    pub fn power(&self, exponent: f64) -> OpResult<Dirichlet> {
        Ok(Dirichlet::new(
            self.pseudo_counts
                .iter()
                .map(|&c| exponent * (c - 1.0) + 1.0)
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn mean_sums_to_one() {
        let d = Dirichlet::new(vec![2.0, 3.0, 5.0]);
        let total: f64 = d.mean().iter().sum();
        assert!(approx_eq(total, 1.0, 1e-12));
        assert!(approx_eq(d.mean()[2], 0.5, 1e-12));
    }

    #[test]
    fn product_ratio_invert() {
        let a = Dirichlet::new(vec![2.0, 3.0]);
        let b = Dirichlet::new(vec![1.5, 1.5]);
        let p = a.product(&b).unwrap();
        let back = p.ratio(&b, false).unwrap();
        assert!(approx_eq(back.pseudo_counts[0], 2.0, 1e-12));
        assert!(approx_eq(back.pseudo_counts[1], 3.0, 1e-12));
    }

    #[test]
    fn uniform_identity() {
        let a = Dirichlet::new(vec![2.0, 3.0]);
        assert_eq!(a.product(&Dirichlet::uniform(2)).unwrap(), a);
        assert_eq!(a.log_average_of(&Dirichlet::uniform(2)), 0.0);
    }

    #[test]
    fn mean_log_is_digamma_difference() {
        let d = Dirichlet::new(vec![2.0, 4.0]);
        let ml = d.mean_log();
        assert!(approx_eq(ml[0], digamma(2.0) - digamma(6.0), 1e-14));
    }
}
