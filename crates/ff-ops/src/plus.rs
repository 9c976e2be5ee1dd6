//! Gaussian sum and difference factors.
//!
//! sum = a + b is the one exactly-Gaussian factor in the catalogue: every
//! message is a linear transform of means and variances, and moment
//! conservation is exact. The difference factor reuses the same algebra
//! with a sign flip.

use ff_dist::Gaussian;

/// EP message to the sum: N(ma + mb, va + vb).
pub fn sum_average_conditional(a: &Gaussian, b: &Gaussian) -> Gaussian {
    let (ma, va) = a.mean_and_variance();
    let (mb, vb) = b.mean_and_variance();
    Gaussian::from_mean_and_variance(ma + mb, va + vb)
}

/// EP message to `a`: N(msum - mb, vsum + vb).
pub fn a_average_conditional(sum: &Gaussian, b: &Gaussian) -> Gaussian {
    let (ms, vs) = sum.mean_and_variance();
    let (mb, vb) = b.mean_and_variance();
    Gaussian::from_mean_and_variance(ms - mb, vs + vb)
}

pub fn b_average_conditional(sum: &Gaussian, a: &Gaussian) -> Gaussian {
    a_average_conditional(sum, a)
}

/// VMP message to the sum: identical linear transform.
pub fn sum_average_logarithm(a: &Gaussian, b: &Gaussian) -> Gaussian {
    sum_average_conditional(a, b)
}

/// VMP message to `a`: mean msum - mb at the sum's own precision.
pub fn a_average_logarithm(sum: &Gaussian, b: &Gaussian) -> Gaussian {
    if sum.is_point_mass() {
        return Gaussian::point_mass(sum.point() - b.mean());
    }
    Gaussian::from_natural(
        sum.mean_times_precision - sum.precision * b.mean(),
        sum.precision,
    )
}

pub fn b_average_logarithm(sum: &Gaussian, a: &Gaussian) -> Gaussian {
    a_average_logarithm(sum, a)
}

/// Max-product message to the sum: maximization over a Gaussian pair
/// factorizes the same way the integral does.
pub fn sum_max_conditional(a: &Gaussian, b: &Gaussian) -> Gaussian {
    sum_average_conditional(a, b)
}

/// Evidence: log E[factor] under the current messages.
pub fn log_average_factor(sum: &Gaussian, a: &Gaussian, b: &Gaussian) -> f64 {
    sum_average_conditional(a, b).log_average_of(sum)
}

/// Deterministic factor: zero for an uncertain sum, the log-factor for an
/// observed one.
pub fn log_evidence_ratio(sum: &Gaussian, a: &Gaussian, b: &Gaussian) -> f64 {
    if sum.is_point_mass() {
        log_average_factor(sum, a, b)
    } else {
        0.0
    }
}

/// Expected log-factor under VMP: zero for a deterministic relation.
pub fn average_log_factor() -> f64 {
    0.0
}

/// difference = a - b, message to the difference.
pub fn difference_average_conditional(a: &Gaussian, b: &Gaussian) -> Gaussian {
    let (ma, va) = a.mean_and_variance();
    let (mb, vb) = b.mean_and_variance();
    Gaussian::from_mean_and_variance(ma - mb, va + vb)
}

/// difference = a - b, message to `a`: N(mdiff + mb, vdiff + vb).
pub fn difference_a_average_conditional(difference: &Gaussian, b: &Gaussian) -> Gaussian {
    let (md, vd) = difference.mean_and_variance();
    let (mb, vb) = b.mean_and_variance();
    Gaussian::from_mean_and_variance(md + mb, vd + vb)
}

/// difference = a - b, message to `b`: N(ma - mdiff, va + vdiff).
pub fn difference_b_average_conditional(difference: &Gaussian, a: &Gaussian) -> Gaussian {
    let (md, vd) = difference.mean_and_variance();
    let (ma, va) = a.mean_and_variance();
    Gaussian::from_mean_and_variance(ma - md, va + vd)
}
