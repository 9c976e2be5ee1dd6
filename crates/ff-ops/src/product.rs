//! Product factors: Gaussian * Gaussian and Gaussian * Beta.
//!
//! The product of two uncertain variables is not conjugate; messages are
//! exact when one argument is a point mass and moment-matched through a
//! linearization at the partner's mean otherwise. Natural-parameter
//! conversion happens in the caller via ratio against the self-message,
//! guarded by the force-proper setting.

use ff_common::{OpResult, OperatorError};
use ff_dist::{Beta, Gaussian};

/// EP message to the product of two Gaussians.
///
/// Moments of the product of independent variables are exact:
/// E[ab] = ma mb, Var[ab] = ma^2 vb + mb^2 va + va vb.
pub fn product_average_conditional(a: &Gaussian, b: &Gaussian) -> Gaussian {
    if !a.is_proper() || !b.is_proper() {
        // An unbounded argument makes every product value equally likely
        return Gaussian::uniform();
    }
    let (ma, va) = a.mean_and_variance();
    let (mb, vb) = b.mean_and_variance();
    if a.is_point_mass() && b.is_point_mass() {
        return Gaussian::point_mass(ma * mb);
    }
    Gaussian::from_mean_and_variance(ma * mb, ma * ma * vb + mb * mb * va + va * vb)
}

/// EP message to `a` from product = a * b.
///
/// Exact inverse scaling when `b` is a point mass; linearized at the mean
/// of `b` otherwise.
pub fn a_average_conditional(product: &Gaussian, b: &Gaussian) -> OpResult<Gaussian> {
    if product.is_uniform() {
        return Ok(Gaussian::uniform());
    }
    let (mp, vp) = product.mean_and_variance();
    if b.is_point_mass() {
        let b0 = b.point();
        if b0 == 0.0 {
            if product.is_point_mass() && product.point() != 0.0 {
                return Err(OperatorError::AllZero {
                    constraint: "product of zero cannot equal a nonzero constant",
                });
            }
            return Ok(Gaussian::uniform());
        }
        return Ok(Gaussian::from_mean_and_variance(mp / b0, vp / (b0 * b0)));
    }
    let (mb, vb) = b.mean_and_variance();
    if mb == 0.0 {
        return Err(OperatorError::NotSupported {
            reason: "product message to a factor argument with zero-mean uncertain partner",
        });
    }
    let mean = mp / mb;
    let variance = (vp + vb * mean * mean) / (mb * mb);
    Ok(Gaussian::from_mean_and_variance(mean, variance))
}

pub fn b_average_conditional(product: &Gaussian, a: &Gaussian) -> OpResult<Gaussian> {
    a_average_conditional(product, a)
}

/// VMP message to the product: mean E[a]E[b], variance E[a^2]E[b^2] minus
/// the squared mean.
pub fn product_average_logarithm(a: &Gaussian, b: &Gaussian) -> Gaussian {
    if !a.is_proper() || !b.is_proper() {
        return Gaussian::uniform();
    }
    let (ma, _) = a.mean_and_variance();
    let (mb, _) = b.mean_and_variance();
    if a.is_point_mass() && b.is_point_mass() {
        return Gaussian::point_mass(ma * mb);
    }
    let mean = ma * mb;
    let variance = a.mean_square() * b.mean_square() - mean * mean;
    Gaussian::from_mean_and_variance(mean, variance)
}

/// VMP message to `a`: precision scales by E[b^2], location by E[b].
pub fn a_average_logarithm(product: &Gaussian, b: &Gaussian) -> OpResult<Gaussian> {
    if product.is_point_mass() {
        return Err(OperatorError::NotSupported {
            reason: "VMP product message with an observed product requires a stochastic child",
        });
    }
    if !b.is_proper() {
        // E[b^2] diverges; the factor carries no finite-precision update
        return Ok(Gaussian::uniform());
    }
    Ok(Gaussian::from_natural(
        product.mean_times_precision * b.mean(),
        product.precision * b.mean_square(),
    ))
}

pub fn b_average_logarithm(product: &Gaussian, a: &Gaussian) -> OpResult<Gaussian> {
    a_average_logarithm(product, a)
}

/// Evidence: log E[factor] under the current messages.
pub fn log_average_factor(product: &Gaussian, a: &Gaussian, b: &Gaussian) -> f64 {
    product_average_conditional(a, b).log_average_of(product)
}

pub fn log_evidence_ratio(product: &Gaussian, a: &Gaussian, b: &Gaussian) -> f64 {
    if product.is_point_mass() {
        log_average_factor(product, a, b)
    } else {
        0.0
    }
}

/// Deterministic relation: zero VMP evidence.
pub fn average_log_factor() -> f64 {
    0.0
}

/// EP message to product = a * w with a Beta-distributed scale in [0, 1].
pub fn product_beta_average_conditional(a: &Gaussian, w: &Beta) -> Gaussian {
    if !a.is_proper() {
        return Gaussian::uniform();
    }
    let (ma, _) = a.mean_and_variance();
    let ew = w.mean();
    if a.is_point_mass() && w.is_point_mass() {
        return Gaussian::point_mass(ma * ew);
    }
    let ew2 = w.variance() + ew * ew;
    let mean = ma * ew;
    let variance = a.mean_square() * ew2 - mean * mean;
    Gaussian::from_mean_and_variance(mean, variance)
}

/// EP message to the Gaussian argument of product = a * w.
pub fn product_beta_a_average_conditional(product: &Gaussian, w: &Beta) -> OpResult<Gaussian> {
    if product.is_uniform() {
        return Ok(Gaussian::uniform());
    }
    let (mp, vp) = product.mean_and_variance();
    if w.is_point_mass() {
        let w0 = w.point();
        if w0 == 0.0 {
            return Ok(Gaussian::uniform());
        }
        return Ok(Gaussian::from_mean_and_variance(mp / w0, vp / (w0 * w0)));
    }
    let ew = w.mean();
    if ew == 0.0 {
        return Err(OperatorError::NotSupported {
            reason: "product message with a zero-mean scale",
        });
    }
    let mean = mp / ew;
    let variance = (vp + w.variance() * mean * mean) / (ew * ew);
    Ok(Gaussian::from_mean_and_variance(mean, variance))
}

/// EP message to the Beta scale of product = a * w, moment-matched through
/// the linearization w ~ product / a.
pub fn product_beta_w_average_conditional(product: &Gaussian, a: &Gaussian) -> OpResult<Beta> {
    if product.is_uniform() {
        return Ok(Beta::uniform());
    }
    let (mp, vp) = product.mean_and_variance();
    let (ma, va) = a.mean_and_variance();
    if ma == 0.0 {
        return Err(OperatorError::NotSupported {
            reason: "scale message with a zero-mean Gaussian argument",
        });
    }
    let mean = (mp / ma).clamp(1e-6, 1.0 - 1e-6);
    let variance = (vp + va * mean * mean) / (ma * ma);
    if variance >= mean * (1.0 - mean) {
        // Weaker than any proper Beta can express
        return Ok(Beta::uniform());
    }
    Ok(Beta::from_mean_and_variance(mean, variance))
}

/// The Beta scale has no valid variational update under this
/// parameterization.
pub fn product_beta_w_average_logarithm(_product: &Gaussian, _a: &Gaussian) -> OpResult<Beta> {
    Err(OperatorError::NotSupported {
        reason: "no VMP update for a Beta scale of a Gaussian product",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn point_mass_scaling_is_exact() {
        let a = Gaussian::point_mass(3.0);
        let b = Gaussian::from_mean_and_variance(2.0, 4.0);
        let p = product_average_conditional(&a, &b);
        let (m, v) = p.mean_and_variance();
        assert!(approx_eq(m, 6.0, 1e-12));
        assert!(approx_eq(v, 36.0, 1e-12));
    }

    #[test]
    fn both_points_reduce_to_product() {
        let p = product_average_conditional(&Gaussian::point_mass(3.0), &Gaussian::point_mass(5.0));
        assert!(p.is_point_mass());
        assert_eq!(p.point(), 15.0);
    }

    #[test]
    fn uncertain_product_moments() {
        let a = Gaussian::from_mean_and_variance(1.0, 2.0);
        let b = Gaussian::from_mean_and_variance(3.0, 4.0);
        let p = product_average_conditional(&a, &b);
        let (m, v) = p.mean_and_variance();
        assert!(approx_eq(m, 3.0, 1e-12));
        assert!(approx_eq(v, 1.0 * 4.0 + 9.0 * 2.0 + 2.0 * 4.0, 1e-12));
    }

    #[test]
    fn backward_point_scale_inverts() {
        let product = Gaussian::from_mean_and_variance(6.0, 8.0);
        let b = Gaussian::point_mass(2.0);
        let to_a = a_average_conditional(&product, &b).unwrap();
        let (m, v) = to_a.mean_and_variance();
        assert!(approx_eq(m, 3.0, 1e-12));
        assert!(approx_eq(v, 2.0, 1e-12));
    }

    #[test]
    fn backward_zero_point_scale_is_uniform() {
        let product = Gaussian::from_mean_and_variance(0.0, 1.0);
        let b = Gaussian::point_mass(0.0);
        assert!(a_average_conditional(&product, &b).unwrap().is_uniform());
        // Nonzero observed product through a zero scale is contradictory
        let bad = Gaussian::point_mass(3.0);
        assert!(matches!(
            a_average_conditional(&bad, &b),
            Err(OperatorError::AllZero { .. })
        ));
    }

    #[test]
    fn vmp_backward_scales_naturals() {
        let product = Gaussian::from_mean_and_precision(6.0, 2.0);
        let b = Gaussian::from_mean_and_variance(2.0, 1.0);
        let to_a = a_average_logarithm(&product, &b).unwrap();
        assert!(approx_eq(to_a.precision, 2.0 * (1.0 + 4.0), 1e-12));
        assert!(approx_eq(to_a.mean_times_precision, 12.0 * 2.0, 1e-12));
    }

    #[test]
    fn vmp_observed_product_is_unsupported() {
        let product = Gaussian::point_mass(6.0);
        let b = Gaussian::from_mean_and_variance(2.0, 1.0);
        assert!(matches!(
            a_average_logarithm(&product, &b),
            Err(OperatorError::NotSupported { .. })
        ));
    }

    #[test]
    fn beta_scale_forward_moments() {
        let a = Gaussian::from_mean_and_variance(2.0, 1.0);
        let w = Beta::new(2.0, 2.0);
        let p = product_beta_average_conditional(&a, &w);
        let ew = 0.5;
        let ew2 = w.variance() + 0.25;
        let (m, v) = p.mean_and_variance();
        assert!(approx_eq(m, 2.0 * ew, 1e-12));
        assert!(approx_eq(v, 5.0 * ew2 - 1.0, 1e-12));
    }

    #[test]
    fn beta_scale_backward_stays_proper() {
        let product = Gaussian::from_mean_and_variance(0.5, 0.01);
        let a = Gaussian::from_mean_and_variance(1.0, 0.01);
        let w = product_beta_w_average_conditional(&product, &a).unwrap();
        assert!(w.is_proper());
        assert!(approx_eq(w.mean(), 0.5, 0.05));
    }

    #[test]
    fn symmetric_in_arguments() {
        let a = Gaussian::from_mean_and_variance(1.0, 2.0);
        let b = Gaussian::from_mean_and_variance(3.0, 4.0);
        assert_eq!(
            product_average_conditional(&a, &b),
            product_average_conditional(&b, &a)
        );
    }
}
