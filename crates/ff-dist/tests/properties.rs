//! Property-based tests for the distribution families.
//!
//! The message-algebra laws every family must satisfy: products and
//! ratios invert, uniform is the two-sided identity, powers compose, and
//! log_average_of is symmetric where the math says it must be.

use ff_dist::{Bernoulli, Beta, Discrete, Gamma, Gaussian};
use proptest::prelude::*;

const TOL: f64 = 1e-9;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() && b.is_infinite() {
        return a.signum() == b.signum();
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Gaussian ratio undoes the product.
    #[test]
    fn gaussian_product_ratio_invert(
        ma in -50.0..50.0f64, va in 0.01..100.0f64,
        mb in -50.0..50.0f64, vb in 0.01..100.0f64,
    ) {
        let a = Gaussian::from_mean_and_variance(ma, va);
        let b = Gaussian::from_mean_and_variance(mb, vb);
        let back = a.product(&b).unwrap().ratio(&b, false).unwrap();
        prop_assert!(approx_eq(back.mean_times_precision, a.mean_times_precision, TOL));
        prop_assert!(approx_eq(back.precision, a.precision, TOL));
    }

    /// Uniform is a two-sided identity for the Gaussian product.
    #[test]
    fn gaussian_uniform_identity(m in -50.0..50.0f64, v in 0.01..100.0f64) {
        let g = Gaussian::from_mean_and_variance(m, v);
        prop_assert_eq!(g.product(&Gaussian::uniform()).unwrap(), g);
        prop_assert_eq!(g.ratio(&Gaussian::uniform(), false).unwrap(), g);
        prop_assert_eq!(g.log_average_of(&Gaussian::uniform()), 0.0);
    }

    /// Gaussian powers compose multiplicatively.
    #[test]
    fn gaussian_power_composes(
        m in -20.0..20.0f64, v in 0.1..10.0f64,
        p in 0.1..3.0f64, q in 0.1..3.0f64,
    ) {
        let g = Gaussian::from_mean_and_variance(m, v);
        let twice = g.power(p).unwrap().power(q).unwrap();
        let once = g.power(p * q).unwrap();
        prop_assert!(approx_eq(twice.precision, once.precision, TOL));
        prop_assert!(approx_eq(twice.mean_times_precision, once.mean_times_precision, TOL));
    }

    /// log_average_of is symmetric for Gaussians.
    #[test]
    fn gaussian_log_average_symmetric(
        ma in -50.0..50.0f64, va in 0.01..100.0f64,
        mb in -50.0..50.0f64, vb in 0.01..100.0f64,
    ) {
        let a = Gaussian::from_mean_and_variance(ma, va);
        let b = Gaussian::from_mean_and_variance(mb, vb);
        prop_assert!(approx_eq(a.log_average_of(&b), b.log_average_of(&a), TOL));
    }

    /// Moment matching round-trips exactly for representable pairs.
    #[test]
    fn beta_moment_round_trip(a in 0.2..50.0f64, b in 0.2..50.0f64) {
        let d = Beta::new(a, b);
        let e = Beta::from_mean_and_variance(d.mean(), d.variance());
        prop_assert!(approx_eq(e.true_count, a, 1e-6));
        prop_assert!(approx_eq(e.false_count, b, 1e-6));
    }

    /// The Newton inverse solver recovers the Beta from its own
    /// mean/mean-log pair.
    #[test]
    fn beta_newton_inverse_round_trip(a in 0.3..40.0f64, b in 0.3..40.0f64) {
        let d = Beta::new(a, b);
        let e = Beta::from_mean_and_mean_log(d.mean(), d.mean_log());
        prop_assert!(approx_eq(e.true_count, a, 1e-4 * (1.0 + a)));
        prop_assert!(approx_eq(e.false_count, b, 1e-4 * (1.0 + b)));
    }

    /// Beta product/ratio invert.
    #[test]
    fn beta_product_ratio_invert(
        a1 in 0.2..20.0f64, b1 in 0.2..20.0f64,
        a2 in 0.2..20.0f64, b2 in 0.2..20.0f64,
    ) {
        let x = Beta::new(a1, b1);
        let y = Beta::new(a2, b2);
        let back = x.product(&y).unwrap().ratio(&y, false).unwrap();
        prop_assert!(approx_eq(back.true_count, a1, TOL));
        prop_assert!(approx_eq(back.false_count, b1, TOL));
    }

    /// Gamma product/ratio invert.
    #[test]
    fn gamma_product_ratio_invert(
        s1 in 0.2..20.0f64, r1 in 0.1..20.0f64,
        s2 in 0.2..20.0f64, r2 in 0.1..20.0f64,
    ) {
        let x = Gamma::new(s1, r1);
        let y = Gamma::new(s2, r2);
        let back = x.product(&y).unwrap().ratio(&y, false).unwrap();
        prop_assert!(approx_eq(back.shape, s1, TOL));
        prop_assert!(approx_eq(back.rate, r1, TOL));
    }

    /// Bernoulli log-odds algebra is additive.
    #[test]
    fn bernoulli_product_adds(l1 in -30.0..30.0f64, l2 in -30.0..30.0f64) {
        let x = Bernoulli::from_log_odds(l1);
        let y = Bernoulli::from_log_odds(l2);
        prop_assert!(approx_eq(x.product(&y).unwrap().log_odds, l1 + l2, TOL));
    }

    /// Discrete products renormalize to a proper distribution.
    #[test]
    fn discrete_product_normalizes(
        w in prop::collection::vec(-10.0..10.0f64, 2..8),
        u in -5.0..5.0f64,
    ) {
        let (a, _) = Discrete::from_log_weights(w.clone()).unwrap();
        let (b, _) = Discrete::from_log_weights(vec![u; w.len()]).unwrap();
        let p = a.product(&b).unwrap();
        let total: f64 = p.log_probs.iter().map(|lp| lp.exp()).sum();
        prop_assert!(approx_eq(total, 1.0, 1e-10));
        // A constant second factor never changes the distribution
        for i in 0..w.len() {
            prop_assert!(approx_eq(p.log_prob(i), a.log_prob(i), 1e-9));
        }
    }

    /// Gaussian log_prob integrates point-mass evidence consistently.
    #[test]
    fn gaussian_point_average(m in -20.0..20.0f64, v in 0.1..10.0f64, x in -20.0..20.0f64) {
        let g = Gaussian::from_mean_and_variance(m, v);
        let p = Gaussian::point_mass(x);
        prop_assert!(approx_eq(g.log_average_of(&p), g.log_prob(x), TOL));
    }

    /// Force-proper ratios always yield a usable message.
    #[test]
    fn gaussian_force_proper_never_negative(
        ma in -20.0..20.0f64, va in 0.01..10.0f64,
        mb in -20.0..20.0f64, vb in 0.01..10.0f64,
    ) {
        let a = Gaussian::from_mean_and_variance(ma, va);
        let b = Gaussian::from_mean_and_variance(mb, vb);
        let r = a.ratio(&b, true).unwrap();
        prop_assert!(r.precision >= 0.0);
    }
}
