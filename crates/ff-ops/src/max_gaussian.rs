//! Max factor: max = max(a, b) over Gaussians.
//!
//! The normalizer splits into two order components (a wins, b wins), each
//! a Gaussian product against the incoming max message times the
//! probability of beating the other argument. Messages blend the two
//! components with weights exp(logw_i - logz). When the target argument
//! carries a very tight incoming message, the posterior-over-prior ratio
//! cancels catastrophically, and the message is instead assembled from
//! the first two derivatives of log Z (the alpha/beta parameterization).

use ff_common::{require_not_nan, InferenceSettings, OpResult, OperatorError};
use ff_dist::Gaussian;
use ff_math::{log_add_exp, normal_cdf_ln, normal_cdf_ratio};

/// Incoming-a precision above which the ratio path loses precision and
/// the derivative path takes over.
const ALPHA_BETA_PRECISION: f64 = 1.0e8;

/// Per-component statistics of the two-branch normalizer.
#[derive(Debug, Clone, Copy)]
struct Component {
    /// log of the branch mass.
    log_w: f64,
    /// Posterior moments of the max variable within the branch.
    mx: f64,
    vx: f64,
    /// Variance of the winner's product distribution.
    s: f64,
    /// Hazard and standardized threshold against the loser.
    h: f64,
    t: f64,
    /// 1 / sqrt(s + loser variance).
    inv_d: f64,
}

/// Statistics shared by every Max message.
#[derive(Debug, Clone, Copy)]
pub struct MaxStats {
    log_z: f64,
    comp_a: Component,
    comp_b: Component,
}

impl MaxStats {
    pub fn log_z(&self) -> f64 {
        self.log_z
    }
}

/// One order component: `winner` (times the max message) beats `loser`.
fn component(max_msg: &Gaussian, winner: &Gaussian, loser: &Gaussian) -> OpResult<Component> {
    let dead = Component {
        log_w: f64::NEG_INFINITY,
        mx: 0.0,
        vx: 0.0,
        s: 0.0,
        h: 0.0,
        t: 0.0,
        inv_d: 0.0,
    };
    let log_c = winner.log_average_of(max_msg);
    if log_c == f64::NEG_INFINITY {
        return Ok(dead);
    }
    let prod = winner.product(max_msg)?;
    let (mu, s) = prod.mean_and_variance();
    let (m_l, v_l) = loser.mean_and_variance();
    let d2 = s + v_l;
    if d2 == 0.0 {
        // Both sides pinned: the branch is a step function
        let log_w = if mu >= m_l {
            log_c
        } else {
            f64::NEG_INFINITY
        };
        return Ok(Component {
            log_w,
            mx: mu,
            vx: 0.0,
            s,
            h: 0.0,
            t: 0.0,
            inv_d: 0.0,
        });
    }
    let d = d2.sqrt();
    let t = (mu - m_l) / d;
    let h = 1.0 / normal_cdf_ratio(t);
    let alpha = h / d;
    let mx = mu + s * alpha;
    let vx = (s - s * s * alpha * (alpha + t / d)).max(0.0);
    Ok(Component {
        log_w: log_c + normal_cdf_ln(t),
        mx,
        vx,
        s,
        h,
        t,
        inv_d: 1.0 / d,
    })
}

/// Normalizer and per-component statistics for the current messages.
pub fn compute_stats(max_msg: &Gaussian, a: &Gaussian, b: &Gaussian) -> OpResult<MaxStats> {
    let comp_a = component(max_msg, a, b)?;
    let comp_b = component(max_msg, b, a)?;
    let log_z = log_add_exp(comp_a.log_w, comp_b.log_w);
    Ok(MaxStats {
        log_z,
        comp_a,
        comp_b,
    })
}

/// EP message to the max.
pub fn max_average_conditional(
    max_msg: &Gaussian,
    a: &Gaussian,
    b: &Gaussian,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    if a.is_point_mass() && b.is_point_mass() {
        return Ok(Gaussian::point_mass(a.point().max(b.point())));
    }
    if max_msg.is_point_mass() {
        return Ok(Gaussian::uniform());
    }
    let stats = compute_stats(max_msg, a, b)?;
    if stats.log_z == f64::NEG_INFINITY {
        return Err(OperatorError::AllZero {
            constraint: "max has no mass consistent with its arguments",
        });
    }
    let w1 = (stats.comp_a.log_w - stats.log_z).exp();
    let w2 = (stats.comp_b.log_w - stats.log_z).exp();
    let mean = w1 * stats.comp_a.mx + w2 * stats.comp_b.mx;
    let second = w1 * (stats.comp_a.vx + stats.comp_a.mx * stats.comp_a.mx)
        + w2 * (stats.comp_b.vx + stats.comp_b.mx * stats.comp_b.mx);
    let posterior = Gaussian::from_mean_and_variance(mean, (second - mean * mean).max(0.0));
    let msg = posterior.ratio(max_msg, settings.force_proper)?;
    require_not_nan(msg.precision, "max precision")?;
    require_not_nan(msg.mean_times_precision, "max mean")?;
    Ok(msg)
}

/// Moments of the target argument under the loser branch: its own belief
/// softly truncated below the branch winner.
fn loser_moments(target: &Gaussian, winner_comp: &Component) -> (f64, f64) {
    let (m, v) = target.mean_and_variance();
    let g = winner_comp.h * winner_comp.inv_d;
    let mean = m - v * g;
    let variance =
        (v - v * v * g * (g + winner_comp.t * winner_comp.inv_d)).max(0.0);
    (mean, variance)
}

/// d log z / d m_target and its derivative for the winner branch of the
/// target argument.
fn winner_derivs(target: &Gaussian, max_msg: &Gaussian, comp: &Component) -> (f64, f64) {
    let (m, v) = target.mean_and_variance();
    let (prior_term, dmu) = if max_msg.is_uniform() {
        (0.0, 1.0)
    } else if max_msg.is_point_mass() {
        ((max_msg.point() - m) / v, 0.0)
    } else {
        let (mm, vm) = max_msg.mean_and_variance();
        ((mm - m) / (v + vm), comp.s / v)
    };
    let alpha = comp.h * comp.inv_d;
    let d1 = prior_term + alpha * dmu;
    let d2 = -1.0 / (v + max_msg.variance())
        - dmu * dmu * comp.h * (comp.t + comp.h) * comp.inv_d * comp.inv_d;
    (d1, d2)
}

/// d log z / d m_target and its derivative for the loser branch.
fn loser_derivs(comp: &Component) -> (f64, f64) {
    let g = comp.h * comp.inv_d;
    (-g, -comp.h * (comp.t + comp.h) * comp.inv_d * comp.inv_d)
}

/// EP message to `a`.
///
/// Blends the winner-branch posterior (a is the max) with the
/// loser-branch truncation (a sits below the other winner); switches to
/// the alpha/beta derivative parameterization when the incoming message
/// is too tight for the ratio to survive cancellation.
pub fn a_average_conditional(
    max_msg: &Gaussian,
    a: &Gaussian,
    b: &Gaussian,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    if a.is_point_mass() {
        return Ok(Gaussian::uniform());
    }
    if !a.is_proper() {
        return Err(OperatorError::ImproperMessage { argument: "a" });
    }
    let stats = compute_stats(max_msg, a, b)?;
    if stats.log_z == f64::NEG_INFINITY {
        return Err(OperatorError::AllZero {
            constraint: "max has no mass consistent with its arguments",
        });
    }
    let w1 = (stats.comp_a.log_w - stats.log_z).exp();
    let w2 = (stats.comp_b.log_w - stats.log_z).exp();
    let (m1, v1) = a.mean_and_variance();

    if a.precision >= ALPHA_BETA_PRECISION {
        tracing::trace!(
            target: "ff_ops::max_gaussian",
            precision = a.precision,
            "switching to the alpha/beta derivative path"
        );
        // Alpha/beta path: assemble the message from the first two
        // derivatives of log Z with respect to the incoming mean
        let (w_d1, w_d2) = winner_derivs(a, max_msg, &stats.comp_a);
        let (l_d1, l_d2) = loser_derivs(&stats.comp_b);
        let alpha = w1 * w_d1 + w2 * l_d1;
        let d2logz = w1 * (w_d1 * w_d1 + w_d2) + w2 * (l_d1 * l_d1 + l_d2) - alpha * alpha;
        let beta = -d2logz;
        let denom = 1.0 - v1 * beta;
        let precision = require_not_nan(beta / denom, "max a precision")?;
        let mtp = require_not_nan((alpha + m1 * beta) / denom, "max a mean")?;
        return Ok(Gaussian::from_natural(mtp, precision));
    }

    let (mean_w, var_w) = (stats.comp_a.mx, stats.comp_a.vx);
    let (mean_l, var_l) = loser_moments(a, &stats.comp_b);
    let mean = w1 * mean_w + w2 * mean_l;
    let second = w1 * (var_w + mean_w * mean_w) + w2 * (var_l + mean_l * mean_l);
    let posterior = Gaussian::from_mean_and_variance(mean, (second - mean * mean).max(0.0));
    let msg = posterior.ratio(a, settings.force_proper)?;
    require_not_nan(msg.precision, "max a precision")?;
    require_not_nan(msg.mean_times_precision, "max a mean")?;
    Ok(msg)
}

pub fn b_average_conditional(
    max_msg: &Gaussian,
    a: &Gaussian,
    b: &Gaussian,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    a_average_conditional(max_msg, b, a, settings)
}

/// Evidence: log E[factor] under the current messages.
pub fn log_average_factor(max_msg: &Gaussian, a: &Gaussian, b: &Gaussian) -> OpResult<f64> {
    if a.is_point_mass() && b.is_point_mass() {
        return Ok(max_msg.log_prob(a.point().max(b.point())));
    }
    Ok(compute_stats(max_msg, a, b)?.log_z)
}

/// EP evidence contribution: observed outputs keep the whole normalizer,
/// uncertain ones subtract the double-counted forward mass.
pub fn log_evidence_ratio(
    max_msg: &Gaussian,
    a: &Gaussian,
    b: &Gaussian,
    settings: &InferenceSettings,
) -> OpResult<f64> {
    let laf = log_average_factor(max_msg, a, b)?;
    if max_msg.is_point_mass() {
        return Ok(laf);
    }
    let to_max = max_average_conditional(max_msg, a, b, settings)?;
    Ok(laf - to_max.log_average_of(max_msg))
}

/// Max-product message to the max output: exact only for pinned inputs.
pub fn max_max_conditional(a: &Gaussian, b: &Gaussian) -> OpResult<Gaussian> {
    if a.is_point_mass() && b.is_point_mass() {
        return Ok(Gaussian::point_mass(a.point().max(b.point())));
    }
    Err(OperatorError::NotSupported {
        reason: "max-product message for Max requires point-mass arguments",
    })
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
    fn point_mass_reduction() {
        let a = Gaussian::point_mass(3.0);
        let b = Gaussian::point_mass(5.0);
        let msg =
            max_average_conditional(&Gaussian::uniform(), &a, &b, &settings()).unwrap();
        assert!(msg.is_point_mass());
        assert_eq!(msg.point(), 5.0);
        // Matching observed max: log-factor 0; mismatch: -inf
        assert_eq!(
            log_average_factor(&Gaussian::point_mass(5.0), &a, &b).unwrap(),
            0.0
        );
        assert_eq!(
            log_average_factor(&Gaussian::point_mass(4.0), &a, &b).unwrap(),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn symmetric_in_arguments() {
        let a = Gaussian::from_mean_and_variance(0.0, 1.0);
        let b = Gaussian::from_mean_and_variance(1.0, 2.0);
        let ab = max_average_conditional(&Gaussian::uniform(), &a, &b, &settings()).unwrap();
        let ba = max_average_conditional(&Gaussian::uniform(), &b, &a, &settings()).unwrap();
        assert!(approx_eq(ab.mean_times_precision, ba.mean_times_precision, 1e-10));
        assert!(approx_eq(ab.precision, ba.precision, 1e-10));
    }

    #[test]
    fn iid_inputs_match_closed_form_max_moments() {
        // max of two iid N(0,1): mean = 1/sqrt(pi), var = 1 - 1/pi
        let a = Gaussian::from_mean_and_variance(0.0, 1.0);
        let b = Gaussian::from_mean_and_variance(0.0, 1.0);
        let msg = max_average_conditional(&Gaussian::uniform(), &a, &b, &settings()).unwrap();
        let (m, v) = msg.mean_and_variance();
        assert!(approx_eq(m, 1.0 / std::f64::consts::PI.sqrt(), 1e-9));
        assert!(approx_eq(v, 1.0 - 1.0 / std::f64::consts::PI, 1e-9));
    }

    #[test]
    fn one_point_mass_truncates_the_other() {
        // max(a, 0) with a ~ N(0,1), max observed at its own marginal:
        // message to max is the rectified distribution
        let a = Gaussian::from_mean_and_variance(0.0, 1.0);
        let b = Gaussian::point_mass(0.0);
        let msg = max_average_conditional(&Gaussian::uniform(), &a, &b, &settings()).unwrap();
        let (m, _v) = msg.mean_and_variance();
        // E[max(a, 0)] = phi(0) = 0.3989
        assert!(approx_eq(m, (2.0 * std::f64::consts::PI).sqrt().recip(), 1e-9));
    }

    #[test]
    fn observed_max_pulls_argument_up() {
        let a = Gaussian::from_mean_and_variance(0.0, 1.0);
        let b = Gaussian::from_mean_and_variance(0.0, 1.0);
        let max_msg = Gaussian::point_mass(2.0);
        let to_a = a_average_conditional(&max_msg, &a, &b, &settings()).unwrap();
        let posterior = to_a.product(&a).unwrap();
        assert!(posterior.mean() > 0.0);
        assert!(posterior.mean() < 2.0 + 1e-9);
    }

    #[test]
    fn backward_messages_are_symmetric() {
        let a = Gaussian::from_mean_and_variance(0.5, 1.5);
        let b = Gaussian::from_mean_and_variance(0.5, 1.5);
        let max_msg = Gaussian::from_mean_and_variance(2.0, 0.5);
        let to_a = a_average_conditional(&max_msg, &a, &b, &settings()).unwrap();
        let to_b = b_average_conditional(&max_msg, &a, &b, &settings()).unwrap();
        assert!(approx_eq(to_a.mean_times_precision, to_b.mean_times_precision, 1e-10));
        assert!(approx_eq(to_a.precision, to_b.precision, 1e-10));
    }

    #[test]
    fn tight_incoming_precision_uses_derivative_path() {
        let a = Gaussian::from_mean_and_precision(1.0, 1e10);
        let b = Gaussian::from_mean_and_variance(0.0, 1.0);
        let max_msg = Gaussian::from_mean_and_variance(1.5, 0.25);
        let msg = a_average_conditional(&max_msg, &a, &b, &settings()).unwrap();
        assert!(msg.precision.is_finite());
        assert!(msg.mean_times_precision.is_finite());
        // The message must still combine into a proper posterior
        let posterior = msg.product(&a).unwrap();
        assert!(posterior.is_proper());
    }

    #[test]
    fn normalization_identity() {
        let a = Gaussian::from_mean_and_variance(0.3, 1.0);
        let b = Gaussian::from_mean_and_variance(-0.4, 2.0);
        let msg = max_average_conditional(&Gaussian::uniform(), &a, &b, &settings()).unwrap();
        assert_eq!(msg.ratio(&Gaussian::uniform(), false).unwrap(), msg);
    }

    #[test]
    fn contradictory_point_masses_report_all_zero() {
        // max message pinned below both arguments
        let a = Gaussian::point_mass(3.0);
        let b = Gaussian::from_mean_and_variance(0.0, 1.0);
        let max_msg = Gaussian::point_mass(1.0);
        assert!(matches!(
            a_average_conditional(&max_msg, &b, &a, &settings()),
            Err(OperatorError::AllZero { .. })
        ));
    }

    #[test]
    fn max_product_point_reduction() {
        let m = max_max_conditional(&Gaussian::point_mass(1.0), &Gaussian::point_mass(4.0))
            .unwrap();
        assert_eq!(m.point(), 4.0);
        assert!(matches!(
            max_max_conditional(
                &Gaussian::from_mean_and_variance(0.0, 1.0),
                &Gaussian::point_mass(4.0)
            ),
            Err(OperatorError::NotSupported { .. })
        ));
    }
}
