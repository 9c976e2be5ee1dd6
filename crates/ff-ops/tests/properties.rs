//! Property-based tests for the operator catalogue.
//!
//! Uses proptest to verify the contract-level properties hold across many
//! random message configurations: exact moment conservation, argument
//! symmetry, point-mass reduction, the normalization identity, and
//! evidence additivity of deterministic wrappers.

use ff_common::InferenceSettings;
use ff_dist::{Bernoulli, Gaussian};
use ff_ops::{copy, equal, log_odds, max_gaussian, plus};
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

fn settings() -> InferenceSettings {
    InferenceSettings::default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Plus conserves mean and variance exactly.
    #[test]
    fn plus_moment_conservation(
        ma in -50.0..50.0f64, va in 0.01..100.0f64,
        mb in -50.0..50.0f64, vb in 0.01..100.0f64,
    ) {
        let a = Gaussian::from_mean_and_variance(ma, va);
        let b = Gaussian::from_mean_and_variance(mb, vb);
        let sum = plus::sum_average_conditional(&a, &b);
        let (m, v) = sum.mean_and_variance();
        prop_assert_eq!(m, ma + mb);
        prop_assert_eq!(v, va + vb);
    }

    /// Plus is symmetric in its addends.
    #[test]
    fn plus_symmetry(
        ma in -50.0..50.0f64, va in 0.01..100.0f64,
        mb in -50.0..50.0f64, vb in 0.01..100.0f64,
    ) {
        let a = Gaussian::from_mean_and_variance(ma, va);
        let b = Gaussian::from_mean_and_variance(mb, vb);
        prop_assert_eq!(
            plus::sum_average_conditional(&a, &b),
            plus::sum_average_conditional(&b, &a)
        );
    }

    /// Dividing any produced message by a uniform input returns it
    /// unchanged.
    #[test]
    fn normalization_identity(
        ma in -50.0..50.0f64, va in 0.01..100.0f64,
        mb in -50.0..50.0f64, vb in 0.01..100.0f64,
    ) {
        let a = Gaussian::from_mean_and_variance(ma, va);
        let b = Gaussian::from_mean_and_variance(mb, vb);
        let msg = plus::sum_average_conditional(&a, &b);
        prop_assert_eq!(msg.ratio(&Gaussian::uniform(), false).unwrap(), msg);
        let max_msg =
            max_gaussian::max_average_conditional(&Gaussian::uniform(), &a, &b, &settings())
                .unwrap();
        prop_assert_eq!(max_msg.ratio(&Gaussian::uniform(), false).unwrap(), max_msg);
    }

    /// AreEqual is symmetric in its arguments.
    #[test]
    fn are_equal_symmetry(la in -20.0..20.0f64, lb in -20.0..20.0f64) {
        let a = Bernoulli::from_log_odds(la);
        let b = Bernoulli::from_log_odds(lb);
        prop_assert_eq!(
            equal::are_equal_average_conditional(&a, &b),
            equal::are_equal_average_conditional(&b, &a)
        );
    }

    /// Max with point masses reproduces the deterministic formula.
    #[test]
    fn max_point_mass_reduction(pa in -100.0..100.0f64, pb in -100.0..100.0f64) {
        let a = Gaussian::point_mass(pa);
        let b = Gaussian::point_mass(pb);
        let msg = max_gaussian::max_average_conditional(
            &Gaussian::uniform(), &a, &b, &settings()
        ).unwrap();
        prop_assert!(msg.is_point_mass());
        prop_assert_eq!(msg.point(), pa.max(pb));
        // Matching observation: log-factor 0
        let lf = max_gaussian::log_average_factor(
            &Gaussian::point_mass(pa.max(pb)), &a, &b
        ).unwrap();
        prop_assert_eq!(lf, 0.0);
    }

    /// Max message is invariant under swapping its arguments.
    #[test]
    fn max_symmetry(
        ma in -10.0..10.0f64, va in 0.1..10.0f64,
        mb in -10.0..10.0f64, vb in 0.1..10.0f64,
    ) {
        let a = Gaussian::from_mean_and_variance(ma, va);
        let b = Gaussian::from_mean_and_variance(mb, vb);
        let ab = max_gaussian::max_average_conditional(
            &Gaussian::uniform(), &a, &b, &settings()
        ).unwrap();
        let ba = max_gaussian::max_average_conditional(
            &Gaussian::uniform(), &b, &a, &settings()
        ).unwrap();
        prop_assert!(approx_eq(ab.mean_times_precision, ba.mean_times_precision, TOL));
        prop_assert!(approx_eq(ab.precision, ba.precision, TOL));
    }

    /// Plus with point masses reproduces exact addition.
    #[test]
    fn plus_point_mass_reduction(pa in -100.0..100.0f64, pb in -100.0..100.0f64) {
        let sum = plus::sum_average_conditional(
            &Gaussian::point_mass(pa), &Gaussian::point_mass(pb)
        );
        prop_assert!(sum.is_point_mass());
        prop_assert_eq!(sum.point(), pa + pb);
    }

    /// The log-odds EP message never returns NaN across wide regimes.
    #[test]
    fn log_odds_message_is_finite(
        m in -500.0..500.0f64,
        v in 0.0..1000.0f64,
        s in any::<bool>(),
    ) {
        let x = Gaussian::from_mean_and_variance(m, v);
        let msg = log_odds::log_odds_average_conditional(s, &x).unwrap();
        prop_assert!(!msg.precision.is_nan());
        prop_assert!(!msg.mean_times_precision.is_nan());
    }

    /// Copy wrappers contribute nothing to evidence: wrapping one
    /// argument of a stochastic factor leaves the total unchanged.
    #[test]
    fn evidence_additivity_through_copy(
        m in -30.0..30.0f64, v in 0.01..50.0f64, s in any::<bool>(),
    ) {
        let x = Gaussian::from_mean_and_variance(m, v);
        let s_msg = Bernoulli::point_mass(s);
        let direct = log_odds::log_evidence_ratio(&s_msg, &x);
        // Route x through Copy: the forwarded belief is unchanged and the
        // wrapper adds zero
        let forwarded = copy::copy_average_conditional(&x);
        let total = copy::log_evidence_ratio()
            + log_odds::log_evidence_ratio(&s_msg, &forwarded);
        prop_assert!(approx_eq(direct, total, TOL));
    }

    /// Equality-constraint wrappers also cancel out of the evidence sum.
    #[test]
    fn evidence_additivity_through_equal(
        m in -30.0..30.0f64, v in 0.01..50.0f64, s in any::<bool>(),
    ) {
        let x = Gaussian::from_mean_and_variance(m, v);
        let s_msg = Bernoulli::point_mass(s);
        let direct = log_odds::log_evidence_ratio(&s_msg, &x);
        let forwarded = equal::equal_b_average_conditional(&x);
        let total = equal::equal_log_evidence_ratio(&x, &forwarded)
            + log_odds::log_evidence_ratio(&s_msg, &forwarded);
        prop_assert!(approx_eq(direct, total, TOL));
    }
}

#[test]
fn are_equal_reference_scenario() {
    // AreEqualAverageConditional(Bernoulli(2.0), Bernoulli(-1.0)) must be
    // Bernoulli.FromLogOdds(LogitProbEqual(2.0, -1.0))
    let msg = equal::are_equal_average_conditional(
        &Bernoulli::from_log_odds(2.0),
        &Bernoulli::from_log_odds(-1.0),
    );
    let expected = ff_dist::bernoulli::logit_prob_equal(2.0, -1.0);
    assert_eq!(msg.log_odds, expected);
    // And against an independently computed constant: p1 = sigmoid(2),
    // p2 = sigmoid(-1), logit(p1 p2 + q1 q2)
    let p1 = 1.0 / (1.0 + (-2.0f64).exp());
    let p2 = 1.0 / (1.0 + 1.0f64.exp());
    let agree = p1 * p2 + (1.0 - p1) * (1.0 - p2);
    let reference = (agree / (1.0 - agree)).ln();
    assert!((msg.log_odds - reference).abs() < 1e-12);
}

#[test]
fn log_odds_regime_boundary_agreement() {
    // Messages straddling the m + v = 0 regime boundary agree to within
    // the quadrature tolerance
    let m = -3.0;
    let below = log_odds::log_odds_average_conditional(
        true,
        &Gaussian::from_mean_and_variance(m, -m - 1e-4),
    )
    .unwrap();
    let above = log_odds::log_odds_average_conditional(
        true,
        &Gaussian::from_mean_and_variance(m, -m + 1e-4),
    )
    .unwrap();
    let rel = |a: f64, b: f64| (a - b).abs() / a.abs().max(b.abs());
    assert!(rel(below.precision, above.precision) < 1e-3);
    assert!(rel(below.mean_times_precision, above.mean_times_precision) < 1e-3);
}
