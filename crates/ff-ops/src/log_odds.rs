//! BernoulliFromLogOdds factor: s ~ Bernoulli(sigmoid(x)).
//!
//! The EP message to the log-odds needs the first two derivatives of
//! log E[sigmoid(+/-x)] with respect to the Gaussian mean; the regime
//! partition lives in `ff_math::logistic_gaussian`. The VMP message uses
//! the quadratic tilted bound on log(1 + e^x), which is tight at
//! xi^2 = E[x^2].

use ff_common::{require_not_nan, OpResult, OperatorError};
use ff_dist::{Bernoulli, Gaussian};
use ff_math::{log_add_exp, log_sigmoid, logistic_gaussian_derivs, sigmoid};

/// Tilted posterior moments for one observation sign.
fn tilted_moments(s: bool, x: &Gaussian) -> (f64, f64, f64) {
    let (m, v) = x.mean_and_variance();
    let d = if s {
        logistic_gaussian_derivs(m, v)
    } else {
        logistic_gaussian_derivs(-m, v)
    };
    let (alpha, gamma) = if s {
        (d.dlogz, d.d2logz)
    } else {
        (-d.dlogz, d.d2logz)
    };
    (d.log_z, m + v * alpha, v * (1.0 + v * gamma))
}

/// EP message to the log-odds for an observed outcome.
pub fn log_odds_average_conditional(s: bool, x: &Gaussian) -> OpResult<Gaussian> {
    x.require_proper("log_odds")?;
    let (m, v) = x.mean_and_variance();
    let d = if s {
        logistic_gaussian_derivs(m, v)
    } else {
        logistic_gaussian_derivs(-m, v)
    };
    let (alpha, gamma) = if s {
        (d.dlogz, d.d2logz)
    } else {
        (-d.dlogz, d.d2logz)
    };
    // Message = tilted posterior / prior, in stable ratio form
    let denom = 1.0 + v * gamma;
    let precision = require_not_nan(-gamma / denom, "log_odds precision")?;
    let mtp = require_not_nan((alpha - m * gamma) / denom, "log_odds mean")?;
    Ok(Gaussian::from_natural(mtp, precision))
}

/// EP message to the log-odds for an uncertain outcome: the mixture of the
/// two tilted posteriors, moment-matched, divided by the prior.
pub fn log_odds_average_conditional_uncertain(
    s: &Bernoulli,
    x: &Gaussian,
    settings: &ff_common::InferenceSettings,
) -> OpResult<Gaussian> {
    if s.is_point_mass() {
        return log_odds_average_conditional(s.point(), x);
    }
    x.require_proper("log_odds")?;
    if x.is_point_mass() {
        // Both branches tilt a zero-variance prior the same way
        return Ok(Gaussian::uniform());
    }
    let (logz_t, mean_t, var_t) = tilted_moments(true, x);
    let (logz_f, mean_f, var_f) = tilted_moments(false, x);
    let logw_t = s.log_prob_true() + logz_t;
    let logw_f = s.log_prob_false() + logz_f;
    let log_total = log_add_exp(logw_t, logw_f);
    let wt = (logw_t - log_total).exp();
    let wf = (logw_f - log_total).exp();
    let mean = wt * mean_t + wf * mean_f;
    let second = wt * (var_t + mean_t * mean_t) + wf * (var_f + mean_f * mean_f);
    let posterior = Gaussian::from_mean_and_variance(mean, second - mean * mean);
    let msg = posterior.ratio(x, settings.force_proper)?;
    require_not_nan(msg.precision, "log_odds precision")?;
    require_not_nan(msg.mean_times_precision, "log_odds mean")?;
    Ok(msg)
}

/// EP message to the outcome.
pub fn s_average_conditional(x: &Gaussian) -> Bernoulli {
    let (m, v) = x.mean_and_variance();
    if x.is_point_mass() {
        return Bernoulli::from_log_odds(m);
    }
    let logz_t = logistic_gaussian_derivs(m, v).log_z;
    let logz_f = logistic_gaussian_derivs(-m, v).log_z;
    Bernoulli::from_log_odds(logz_t - logz_f)
}

/// Evidence: log E[factor] for an observed outcome.
pub fn log_average_factor(s: bool, x: &Gaussian) -> f64 {
    let (m, v) = x.mean_and_variance();
    let m_signed = if s { m } else { -m };
    logistic_gaussian_derivs(m_signed, v).log_z
}

/// Evidence: log E[factor] for an uncertain outcome.
pub fn log_average_factor_uncertain(s: &Bernoulli, x: &Gaussian) -> f64 {
    if s.is_point_mass() {
        return log_average_factor(s.point(), x);
    }
    log_add_exp(
        s.log_prob_true() + log_average_factor(true, x),
        s.log_prob_false() + log_average_factor(false, x),
    )
}

/// EP evidence contribution. Observed outcomes keep the whole log-factor;
/// uncertain ones subtract the double-counted outcome normalizer.
pub fn log_evidence_ratio(s: &Bernoulli, x: &Gaussian) -> f64 {
    if s.is_point_mass() {
        return log_average_factor(s.point(), x);
    }
    let to_s = s_average_conditional(x);
    log_average_factor_uncertain(s, x) - to_s.log_average_of(s)
}

/// The tilted-bound coefficient lambda(xi) = (sigmoid(xi) - 1/2) / (2 xi).
pub(crate) fn lambda(xi: f64) -> f64 {
    if xi.abs() < 1e-8 {
        // Limit at zero
        return 0.125;
    }
    (sigmoid(xi) - 0.5) / (2.0 * xi)
}

/// VMP message to the log-odds: Gaussian with natural parameters
/// (E[s] - 1/2, 2 lambda(xi)), xi^2 = E[x^2].
pub fn log_odds_average_logarithm(s: &Bernoulli, x: &Gaussian) -> OpResult<Gaussian> {
    if !x.is_point_mass() && !x.is_proper() {
        return Err(OperatorError::ImproperMessage { argument: "log_odds" });
    }
    let xi = x.mean_square().sqrt();
    let coeff = if s.is_point_mass() {
        if s.point() {
            0.5
        } else {
            -0.5
        }
    } else {
        s.prob_true() - 0.5
    };
    Ok(Gaussian::from_natural(coeff, 2.0 * lambda(xi)))
}

/// VMP message to the outcome: log sigma(x) - log sigma(-x) = x in
/// expectation.
pub fn s_average_logarithm(x: &Gaussian) -> Bernoulli {
    Bernoulli::from_log_odds(x.mean())
}

/// VMP evidence term: the tilted-bound value of E[log p(s | x)].
pub fn average_log_factor(s: &Bernoulli, x: &Gaussian) -> f64 {
    let m = x.mean();
    let xi = x.mean_square().sqrt();
    let p = s.prob_true();
    (p - 0.5) * m + log_sigmoid(xi) - 0.5 * xi
}
