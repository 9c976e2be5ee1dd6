//! Gauss-Hermite quadrature for expectations under a Gaussian.
//!
//! Nodes and weights are computed once per degree by Newton iteration on
//! the Hermite recurrence (Numerical Recipes `gauher`) and cached.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::stable::log_sum_exp;

/// Default quadrature degree used by the operator catalogue.
pub const DEFAULT_DEGREE: usize = 32;

const NEWTON_MAX_ITERS: usize = 64;
const NEWTON_EPS: f64 = 3.0e-14;
const PI_POW_NEG_QUARTER: f64 = 0.751_125_544_464_942_5; // pi^(-1/4)

/// Gauss-Hermite rule for weight exp(-x^2): nodes and weights of equal length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HermiteRule {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

fn compute_rule(n: usize) -> HermiteRule {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let m = (n + 1) / 2;
    let nf = n as f64;
    let mut z = 0.0;
    let mut pp = 1.0;
    for i in 0..m {
        // Initial root guesses, refined from the largest root downward
        z = match i {
            0 => (2.0 * nf + 1.0).sqrt() - 1.85575 * (2.0 * nf + 1.0).powf(-1.0 / 6.0),
            1 => z - 1.14 * nf.powf(0.426) / z,
            2 => 1.86 * z - 0.86 * nodes[0],
            3 => 1.91 * z - 0.91 * nodes[1],
            _ => 2.0 * z - nodes[i - 2],
        };
        for _ in 0..NEWTON_MAX_ITERS {
            let mut p1 = PI_POW_NEG_QUARTER;
            let mut p2 = 0.0;
            for j in 1..=n {
                let jf = j as f64;
                let p3 = p2;
                p2 = p1;
                p1 = z * (2.0 / jf).sqrt() * p2 - ((jf - 1.0) / jf).sqrt() * p3;
            }
            pp = (2.0 * nf).sqrt() * p2;
            let z1 = z;
            z = z1 - p1 / pp;
            if (z - z1).abs() <= NEWTON_EPS {
                break;
            }
        }
        nodes[i] = z;
        nodes[n - 1 - i] = -z;
        weights[i] = 2.0 / (pp * pp);
        weights[n - 1 - i] = weights[i];
    }
    HermiteRule { nodes, weights }
}

/// The cached default-degree rule.
pub fn default_rule() -> &'static HermiteRule {
    static RULE: OnceLock<HermiteRule> = OnceLock::new();
    RULE.get_or_init(|| compute_rule(DEFAULT_DEGREE))
}

/// E[f(x)] for x ~ N(mean, variance).
pub fn gaussian_expectation(mean: f64, variance: f64, f: impl Fn(f64) -> f64) -> f64 {
    if variance == 0.0 {
        return f(mean);
    }
    let rule = default_rule();
    let scale = (2.0 * variance).sqrt();
    let mut sum = 0.0;
    for (&t, &w) in rule.nodes.iter().zip(rule.weights.iter()) {
        sum += w * f(mean + scale * t);
    }
    sum / std::f64::consts::PI.sqrt()
}

/// log E[exp(g(x))] for x ~ N(mean, variance), with g supplied in log space.
///
/// Keeps every term in the log domain so integrands that underflow
/// pointwise still contribute.
pub fn gaussian_expectation_ln(mean: f64, variance: f64, g: impl Fn(f64) -> f64) -> f64 {
    if variance == 0.0 {
        return g(mean);
    }
    let rule = default_rule();
    let scale = (2.0 * variance).sqrt();
    let log_norm = std::f64::consts::PI.sqrt().ln();
    let terms: Vec<f64> = rule
        .nodes
        .iter()
        .zip(rule.weights.iter())
        .map(|(&t, &w)| w.ln() - log_norm + g(mean + scale * t))
        .collect();
    log_sum_exp(&terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
    }

    #[test]
    fn rule_is_symmetric_and_normalized() {
        let rule = default_rule();
        assert_eq!(rule.nodes.len(), DEFAULT_DEGREE);
        // Sum of weights = integral of exp(-x^2) = sqrt(pi)
        let total: f64 = rule.weights.iter().sum();
        assert!(approx_eq(total, std::f64::consts::PI.sqrt(), 1e-12));
        for i in 0..DEFAULT_DEGREE / 2 {
            assert!(approx_eq(
                rule.nodes[i],
                -rule.nodes[DEFAULT_DEGREE - 1 - i],
                1e-13
            ));
        }
    }

    #[test]
    fn gaussian_moments_are_exact() {
        let mean = 1.3;
        let variance = 0.7;
        assert!(approx_eq(
            gaussian_expectation(mean, variance, |x| x),
            mean,
            1e-12
        ));
        assert!(approx_eq(
            gaussian_expectation(mean, variance, |x| x * x),
            variance + mean * mean,
            1e-12
        ));
        // Polynomials up to degree 2n-1 are exact
        assert!(approx_eq(
            gaussian_expectation(0.0, 1.0, |x| x.powi(6)),
            15.0,
            1e-10
        ));
    }

    #[test]
    fn moment_generating_function() {
        // E[e^(t x)] = e^(t m + t^2 v / 2)
        let (m, v, t): (f64, f64, f64) = (0.4, 2.1, 0.9);
        let expected = (t * m + t * t * v / 2.0).exp();
        assert!(approx_eq(
            gaussian_expectation(m, v, |x| (t * x).exp()),
            expected,
            1e-9
        ));
        assert!(approx_eq(
            gaussian_expectation_ln(m, v, |x| t * x),
            expected.ln(),
            1e-10
        ));
    }

    #[test]
    fn log_domain_handles_underflowing_integrand() {
        // E[sigmoid(x)] with x ~ N(-600, 1): every term underflows pointwise
        let l = gaussian_expectation_ln(-600.0, 1.0, crate::math::stable::log_sigmoid);
        assert!(l.is_finite());
        assert!(l < -500.0);
    }

    #[test]
    fn point_mass_variance_short_circuits() {
        assert_eq!(gaussian_expectation(2.0, 0.0, |x| x * x), 4.0);
    }
}
