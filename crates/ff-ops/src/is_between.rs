//! Integral-bound factors: IsBetween and IsPositive.
//!
//! is_between = 1{lower <= x <= upper} with constant bounds. Messages are
//! truncated-Gaussian moments evaluated through the CDF ratio, which stays
//! accurate when the admissible interval sits far out in a tail. The
//! zero-width interval collapses to an explicit point mass.

use ff_common::{require_not_nan, InferenceSettings, OpResult, OperatorError};
use ff_dist::{Bernoulli, Gaussian};
use ff_math::{log_add_exp, normal_cdf_diff_ln, normal_pdf_ln};

/// Log-mass and moments of N(m, v) truncated to [lower, upper].
///
/// Either bound may be infinite. A zero-probability interval reports
/// -inf mass with undefined moments.
pub fn truncated_gaussian_moments(
    m: f64,
    v: f64,
    lower: f64,
    upper: f64,
) -> (f64, f64, f64) {
    let sd = v.sqrt();
    let zl = if lower == f64::NEG_INFINITY {
        f64::NEG_INFINITY
    } else {
        (lower - m) / sd
    };
    let zu = if upper == f64::INFINITY {
        f64::INFINITY
    } else {
        (upper - m) / sd
    };
    let log_z = if zl == f64::NEG_INFINITY && zu == f64::INFINITY {
        0.0
    } else if zl == f64::NEG_INFINITY {
        ff_math::normal_cdf_ln(zu)
    } else if zu == f64::INFINITY {
        ff_math::normal_cdf_ln(-zl)
    } else {
        normal_cdf_diff_ln(zl, zu)
    };
    if log_z == f64::NEG_INFINITY {
        return (f64::NEG_INFINITY, f64::NAN, f64::NAN);
    }
    // phi(z)/Z terms, kept in log space until the ratio
    let r_l = if zl.is_infinite() {
        0.0
    } else {
        (normal_pdf_ln(zl) - log_z).exp()
    };
    let r_u = if zu.is_infinite() {
        0.0
    } else {
        (normal_pdf_ln(zu) - log_z).exp()
    };
    let zr_l = if zl.is_infinite() { 0.0 } else { zl * r_l };
    let zr_u = if zu.is_infinite() { 0.0 } else { zu * r_u };
    let shift = r_l - r_u;
    let mean = m + sd * shift;
    let variance = v * (1.0 + zr_l - zr_u - shift * shift);
    (log_z, mean, variance.max(0.0))
}

fn interval_log_masses(x: &Gaussian, lower: f64, upper: f64) -> (f64, f64) {
    let (m, v) = x.mean_and_variance();
    if x.is_point_mass() {
        let inside = lower <= m && m <= upper;
        return if inside {
            (0.0, f64::NEG_INFINITY)
        } else {
            (f64::NEG_INFINITY, 0.0)
        };
    }
    let (log_in, _, _) = truncated_gaussian_moments(m, v, lower, upper);
    let (log_lo, _, _) = truncated_gaussian_moments(m, v, f64::NEG_INFINITY, lower);
    let (log_hi, _, _) = truncated_gaussian_moments(m, v, upper, f64::INFINITY);
    (log_in, log_add_exp(log_lo, log_hi))
}

/// EP message to the indicator.
pub fn is_between_average_conditional(x: &Gaussian, lower: f64, upper: f64) -> Bernoulli {
    if !x.is_proper() {
        // No information about where x lies
        return Bernoulli::uniform();
    }
    let (log_in, log_out) = interval_log_masses(x, lower, upper);
    Bernoulli::from_log_odds(log_in - log_out)
}

/// EP message to x for an observed indicator.
pub fn x_average_conditional(
    is_between: bool,
    x: &Gaussian,
    lower: f64,
    upper: f64,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    if lower > upper {
        return Err(OperatorError::DomainMismatch {
            argument: "lower",
            message: format!("empty interval [{lower}, {upper}]"),
        });
    }
    if is_between && lower == upper {
        // Zero-width interval pins x exactly
        return Ok(Gaussian::point_mass(lower));
    }
    if x.is_point_mass() {
        return Ok(Gaussian::uniform());
    }
    x.require_proper("x")?;
    let (m, v) = x.mean_and_variance();
    let posterior = if is_between {
        let (log_z, mean, variance) = truncated_gaussian_moments(m, v, lower, upper);
        if log_z == f64::NEG_INFINITY {
            return Err(OperatorError::AllZero {
                constraint: "x constrained to an interval of zero mass",
            });
        }
        Gaussian::from_mean_and_variance(mean, variance)
    } else {
        // Complement: mixture of the two tails
        let (log_lo, mean_lo, var_lo) =
            truncated_gaussian_moments(m, v, f64::NEG_INFINITY, lower);
        let (log_hi, mean_hi, var_hi) = truncated_gaussian_moments(m, v, upper, f64::INFINITY);
        let log_total = log_add_exp(log_lo, log_hi);
        if log_total == f64::NEG_INFINITY {
            return Err(OperatorError::AllZero {
                constraint: "x constrained outside an interval of full mass",
            });
        }
        let mut mean = 0.0;
        let mut second = 0.0;
        for (lw, mu, var) in [(log_lo, mean_lo, var_lo), (log_hi, mean_hi, var_hi)] {
            if lw == f64::NEG_INFINITY {
                continue;
            }
            let w = (lw - log_total).exp();
            mean += w * mu;
            second += w * (var + mu * mu);
        }
        Gaussian::from_mean_and_variance(mean, second - mean * mean)
    };
    let msg = posterior.ratio(x, settings.force_proper)?;
    require_not_nan(msg.precision, "is_between precision")?;
    require_not_nan(msg.mean_times_precision, "is_between mean")?;
    Ok(msg)
}

/// EP message to x for an uncertain indicator: blend of the inside and
/// outside posteriors.
pub fn x_average_conditional_uncertain(
    is_between: &Bernoulli,
    x: &Gaussian,
    lower: f64,
    upper: f64,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    if is_between.is_point_mass() {
        return x_average_conditional(is_between.point(), x, lower, upper, settings);
    }
    if is_between.is_uniform() {
        return Ok(Gaussian::uniform());
    }
    if x.is_point_mass() {
        return Ok(Gaussian::uniform());
    }
    x.require_proper("x")?;
    let (m, v) = x.mean_and_variance();
    let (log_in, mean_in, var_in) = truncated_gaussian_moments(m, v, lower, upper);
    let (log_lo, mean_lo, var_lo) = truncated_gaussian_moments(m, v, f64::NEG_INFINITY, lower);
    let (log_hi, mean_hi, var_hi) = truncated_gaussian_moments(m, v, upper, f64::INFINITY);
    let terms = [
        (is_between.log_prob_true() + log_in, mean_in, var_in),
        (is_between.log_prob_false() + log_lo, mean_lo, var_lo),
        (is_between.log_prob_false() + log_hi, mean_hi, var_hi),
    ];
    let log_total = ff_math::log_sum_exp(&[terms[0].0, terms[1].0, terms[2].0]);
    if log_total == f64::NEG_INFINITY {
        return Err(OperatorError::AllZero {
            constraint: "no admissible region for x",
        });
    }
    let mut mean = 0.0;
    let mut second = 0.0;
    for &(lw, mu, var) in &terms {
        if lw == f64::NEG_INFINITY {
            continue;
        }
        let w = (lw - log_total).exp();
        mean += w * mu;
        second += w * (var + mu * mu);
    }
    let posterior = Gaussian::from_mean_and_variance(mean, second - mean * mean);
    posterior.ratio(x, settings.force_proper)
}

/// Evidence: log E[factor].
pub fn log_average_factor(is_between: &Bernoulli, x: &Gaussian, lower: f64, upper: f64) -> f64 {
    if !x.is_proper() {
        return 0.0;
    }
    let (log_in, log_out) = interval_log_masses(x, lower, upper);
    if is_between.is_point_mass() {
        return if is_between.point() { log_in } else { log_out };
    }
    log_add_exp(
        is_between.log_prob_true() + log_in,
        is_between.log_prob_false() + log_out,
    )
}

/// EP evidence contribution.
pub fn log_evidence_ratio(is_between: &Bernoulli, x: &Gaussian, lower: f64, upper: f64) -> f64 {
    if is_between.is_point_mass() {
        return log_average_factor(is_between, x, lower, upper);
    }
    let to_b = is_between_average_conditional(x, lower, upper);
    log_average_factor(is_between, x, lower, upper) - to_b.log_average_of(is_between)
}

/// Hard constraints keep the same message under VMP.
pub fn x_average_logarithm(
    is_between: bool,
    x: &Gaussian,
    lower: f64,
    upper: f64,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    x_average_conditional(is_between, x, lower, upper, settings)
}

/// IsPositive: indicator message of the half-line factor.
pub fn is_positive_average_conditional(x: &Gaussian) -> Bernoulli {
    is_between_average_conditional(x, 0.0, f64::INFINITY)
}

/// IsPositive: message to x for an observed sign.
pub fn is_positive_x_average_conditional(
    is_positive: bool,
    x: &Gaussian,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    if is_positive {
        x_average_conditional(true, x, 0.0, f64::INFINITY, settings)
    } else {
        x_average_conditional(true, x, f64::NEG_INFINITY, 0.0, settings)
    }
}

pub fn is_positive_log_evidence_ratio(is_positive: bool, x: &Gaussian) -> f64 {
    log_evidence_ratio(
        &Bernoulli::point_mass(is_positive),
        x,
        0.0,
        f64::INFINITY,
    )
}
