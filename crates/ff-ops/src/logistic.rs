//! Logistic factor: p = sigmoid(x), linking a Gaussian to a Beta.
//!
//! EP messages moment-match the tilted posterior (Gaussian prior times
//! the incoming Beta evaluated at sigmoid(x)) by quadrature. The VMP
//! message to p solves an inverse moment problem, finding the Beta that
//! matches the posterior mean and mean-log, with the damped Newton
//! solver in `ff_dist::Beta`; the VMP message to x uses the quadratic
//! tilted bound.

use ff_common::{require_not_nan, InferenceSettings, OpResult};
use ff_dist::{Beta, Gaussian};
use ff_math::quadrature::default_rule;
use ff_math::{
    log_beta, log_sigmoid, log_sum_exp, logistic_gaussian_ln, logit, sigmoid,
};

use crate::log_odds::lambda;

/// Normalizer and tilted moments of x and p = sigmoid(x) under
/// N(x; m, v) * p^(a-1) (1-p)^(b-1) / B(a, b).
struct TiltedStats {
    log_z: f64,
    ex: f64,
    ex2: f64,
    ep: f64,
    ep2: f64,
}

fn tilted_stats(m: f64, v: f64, p_msg: &Beta) -> TiltedStats {
    let (a, b) = (p_msg.true_count, p_msg.false_count);
    let log_norm = -log_beta(a, b);
    let rule = default_rule();
    let scale = (2.0 * v).sqrt();
    let n = rule.nodes.len();
    let mut log_weights = Vec::with_capacity(n);
    let mut xs = Vec::with_capacity(n);
    for (&t, &w) in rule.nodes.iter().zip(rule.weights.iter()) {
        let x = m + scale * t;
        let g = (a - 1.0) * log_sigmoid(x) + (b - 1.0) * log_sigmoid(-x) + log_norm;
        log_weights.push(w.ln() + g);
        xs.push(x);
    }
    let log_total = log_sum_exp(&log_weights);
    let mut ex = 0.0;
    let mut ex2 = 0.0;
    let mut ep = 0.0;
    let mut ep2 = 0.0;
    for (lw, &x) in log_weights.iter().zip(xs.iter()) {
        let u = (lw - log_total).exp();
        let p = sigmoid(x);
        ex += u * x;
        ex2 += u * x * x;
        ep += u * p;
        ep2 += u * p * p;
    }
    TiltedStats {
        log_z: log_total - std::f64::consts::PI.sqrt().ln(),
        ex,
        ex2,
        ep,
        ep2,
    }
}

/// EP message to p.
pub fn logistic_average_conditional(
    logistic: &Beta,
    x: &Gaussian,
    settings: &InferenceSettings,
) -> OpResult<Beta> {
    if logistic.is_point_mass() {
        return Ok(*logistic);
    }
    if x.is_point_mass() {
        return Ok(Beta::point_mass(sigmoid(x.point())));
    }
    x.require_proper("x")?;
    let (m, v) = x.mean_and_variance();
    let stats = tilted_stats(m, v, logistic);
    let mean = require_not_nan(stats.ep, "logistic mean")?;
    let variance = stats.ep2 - stats.ep * stats.ep;
    let posterior = Beta::from_mean_and_variance(mean, variance.max(0.0));
    posterior.ratio(logistic, settings.force_proper)
}

/// EP message to x.
pub fn x_average_conditional(
    logistic: &Beta,
    x: &Gaussian,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    if logistic.is_point_mass() {
        return Ok(Gaussian::point_mass(logit(logistic.point())));
    }
    if x.is_point_mass() {
        return Ok(Gaussian::uniform());
    }
    x.require_proper("x")?;
    logistic.require_proper("logistic")?;
    let (m, v) = x.mean_and_variance();
    let stats = tilted_stats(m, v, logistic);
    let mean = require_not_nan(stats.ex, "x mean")?;
    let variance = (stats.ex2 - stats.ex * stats.ex).max(0.0);
    let posterior = Gaussian::from_mean_and_variance(mean, variance);
    posterior.ratio(x, settings.force_proper)
}

/// Evidence: log E[factor] under the current messages.
pub fn log_average_factor(logistic: &Beta, x: &Gaussian) -> f64 {
    if x.is_point_mass() {
        return logistic.log_prob(sigmoid(x.point()));
    }
    if logistic.is_point_mass() {
        return x.log_prob(logit(logistic.point()));
    }
    let (m, v) = x.mean_and_variance();
    tilted_stats(m, v, logistic).log_z
}

/// EP evidence contribution after removing the double-counted output
/// normalizer.
pub fn log_evidence_ratio(logistic: &Beta, x: &Gaussian, to_logistic: &Beta) -> f64 {
    log_average_factor(logistic, x) - to_logistic.log_average_of(logistic)
}

/// VMP message to p: the Beta matching the posterior mean and E[log p],
/// found by the damped Newton inverse solver.
pub fn logistic_average_logarithm(x: &Gaussian) -> OpResult<Beta> {
    if x.is_point_mass() {
        return Ok(Beta::point_mass(sigmoid(x.point())));
    }
    x.require_proper("x")?;
    let (m, v) = x.mean_and_variance();
    let mean = logistic_gaussian_ln(m, v).exp();
    let mean_log = ff_math::quadrature::gaussian_expectation(m, v, log_sigmoid);
    Ok(Beta::from_mean_and_mean_log(mean, mean_log))
}

/// VMP message to x under the quadratic tilted bound: natural parameters
/// ((a - b) / 2, 2 (a + b - 2) lambda(xi)).
pub fn x_average_logarithm(logistic: &Beta, x: &Gaussian) -> OpResult<Gaussian> {
    if logistic.is_point_mass() {
        return Ok(Gaussian::point_mass(logit(logistic.point())));
    }
    logistic.require_proper("logistic")?;
    let xi = x.mean_square().sqrt();
    let (a, b) = (logistic.true_count, logistic.false_count);
    Ok(Gaussian::from_natural(
        0.5 * (a - b),
        2.0 * (a + b - 2.0).max(0.0) * lambda(xi),
    ))
}

/// VMP evidence term: E[log Beta(sigmoid(x); a, b)] under q(x).
pub fn average_log_factor(logistic: &Beta, x: &Gaussian) -> f64 {
    let (m, v) = x.mean_and_variance();
    let (a, b) = (logistic.true_count, logistic.false_count);
    let e_log_p = ff_math::quadrature::gaussian_expectation(m, v, log_sigmoid);
    let e_log_q = ff_math::quadrature::gaussian_expectation(m, v, |t| log_sigmoid(-t));
    (a - 1.0) * e_log_p + (b - 1.0) * e_log_q - log_beta(a, b)
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

    fn settings() -> InferenceSettings {
        InferenceSettings::default()
    }

    #[test]
    fn uniform_beta_gives_plain_moment_match() {
        let x = Gaussian::from_mean_and_variance(0.0, 1.0);
        let msg = logistic_average_conditional(&Beta::uniform(), &x, &settings()).unwrap();
        // E[sigmoid(x)] = 1/2 by symmetry
        assert!(approx_eq(msg.mean(), 0.5, 1e-9));
        assert!(msg.is_proper());
    }

    #[test]
    fn point_mass_x_reduces_to_deterministic_link() {
        let x = Gaussian::point_mass(1.2);
        let msg = logistic_average_conditional(&Beta::uniform(), &x, &settings()).unwrap();
        assert!(msg.is_point_mass());
        assert!(approx_eq(msg.point(), sigmoid(1.2), 1e-12));
    }

    #[test]
    fn observed_p_pins_x() {
        let x = Gaussian::from_mean_and_variance(0.0, 1.0);
        let msg = x_average_conditional(&Beta::point_mass(0.73), &x, &settings()).unwrap();
        assert!(msg.is_point_mass());
        assert!(approx_eq(msg.point(), logit(0.73), 1e-12));
    }

    #[test]
    fn informative_beta_shifts_x_posterior() {
        let x = Gaussian::from_mean_and_variance(0.0, 4.0);
        // Beta favoring p near 1 should push x upward
        let p_msg = Beta::new(10.0, 1.0);
        let msg = x_average_conditional(&p_msg, &x, &settings()).unwrap();
        let posterior = msg.product(&x).unwrap();
        assert!(posterior.mean() > 0.5);
    }

    #[test]
    fn normalization_identity_against_uniform() {
        // Dividing the produced message by a uniform input returns it
        let x = Gaussian::from_mean_and_variance(0.4, 1.1);
        let msg = logistic_average_conditional(&Beta::uniform(), &x, &settings()).unwrap();
        let again = msg.ratio(&Beta::uniform(), false).unwrap();
        assert_eq!(msg, again);
    }

    #[test]
    fn vmp_beta_matches_posterior_mean() {
        let x = Gaussian::from_mean_and_variance(1.0, 0.5);
        let msg = logistic_average_logarithm(&x).unwrap();
        let expected_mean = logistic_gaussian_ln(1.0, 0.5).exp();
        assert!(approx_eq(msg.mean(), expected_mean, 1e-6));
        // Mean-log matched as well
        let expected_mean_log =
            ff_math::quadrature::gaussian_expectation(1.0, 0.5, log_sigmoid);
        assert!(approx_eq(msg.mean_log(), expected_mean_log, 1e-6));
    }

    #[test]
    fn vmp_x_message_direction() {
        let p_msg = Beta::new(5.0, 2.0);
        let x = Gaussian::from_mean_and_variance(0.0, 1.0);
        let msg = x_average_logarithm(&p_msg, &x).unwrap();
        assert!(msg.mean_times_precision > 0.0);
        assert!(msg.precision > 0.0);
    }

    #[test]
    fn evidence_is_finite_and_consistent() {
        let x = Gaussian::from_mean_and_variance(0.2, 0.7);
        let p_msg = Beta::new(2.0, 3.0);
        let laf = log_average_factor(&p_msg, &x);
        assert!(laf.is_finite());
        let to_p = logistic_average_conditional(&p_msg, &x, &settings()).unwrap();
        let ler = log_evidence_ratio(&p_msg, &x, &to_p);
        assert!(ler.is_finite());
    }
}
