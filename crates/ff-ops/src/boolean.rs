//! Boolean factors: Not, And, Or.
//!
//! Exact Bernoulli EP messages in log-odds form. The backward messages
//! reuse the agreement probability `log_average_of`, which already covers
//! the point-mass cases.

use ff_dist::Bernoulli;

/// Not factor: message to the output.
pub fn not_average_conditional(a: &Bernoulli) -> Bernoulli {
    Bernoulli::from_log_odds(-a.log_odds)
}

/// Not factor: message to the input.
pub fn not_a_average_conditional(not: &Bernoulli) -> Bernoulli {
    Bernoulli::from_log_odds(-not.log_odds)
}

/// And factor: message to the conjunction output. P(T) = p_a p_b.
pub fn and_average_conditional(a: &Bernoulli, b: &Bernoulli) -> Bernoulli {
    let log_p = a.log_prob_true() + b.log_prob_true();
    Bernoulli::from_log_odds(log_p - (-log_p.exp()).ln_1p())
}

/// And factor: message to `a`.
///
/// For a = true the factor forces and = b (agreement weight); for
/// a = false it forces and = false.
pub fn and_a_average_conditional(and: &Bernoulli, b: &Bernoulli) -> Bernoulli {
    if and.is_point_mass() && and.point() {
        // and = true pins a = true
        return Bernoulli::point_mass(true);
    }
    Bernoulli::from_log_odds(b.log_average_of(and) - and.log_prob_false())
}

pub fn and_b_average_conditional(and: &Bernoulli, a: &Bernoulli) -> Bernoulli {
    and_a_average_conditional(and, a)
}

/// Or factor: message to the disjunction output. P(F) = q_a q_b.
pub fn or_average_conditional(a: &Bernoulli, b: &Bernoulli) -> Bernoulli {
    let log_q = a.log_prob_false() + b.log_prob_false();
    Bernoulli::from_log_odds((-log_q.exp()).ln_1p() - log_q)
}

/// Or factor: message to `a`.
///
/// For a = true the factor forces or = true; for a = false it forces
/// or = b (agreement weight).
pub fn or_a_average_conditional(or: &Bernoulli, b: &Bernoulli) -> Bernoulli {
    if or.is_point_mass() && !or.point() {
        // or = false pins a = false
        return Bernoulli::point_mass(false);
    }
    Bernoulli::from_log_odds(or.log_prob_true() - b.log_average_of(or))
}

pub fn or_b_average_conditional(or: &Bernoulli, a: &Bernoulli) -> Bernoulli {
    or_a_average_conditional(or, a)
}

/// Evidence: log E[factor] for the And factor.
pub fn and_log_average_factor(and: &Bernoulli, a: &Bernoulli, b: &Bernoulli) -> f64 {
    and_average_conditional(a, b).log_average_of(and)
}

/// EP evidence contribution: the forward normalizer cancels for an
/// uncertain output, leaving zero; observed outputs keep the log-factor.
pub fn and_log_evidence_ratio(and: &Bernoulli, a: &Bernoulli, b: &Bernoulli) -> f64 {
    if and.is_point_mass() {
        and_log_average_factor(and, a, b)
    } else {
        0.0
    }
}

pub fn or_log_average_factor(or: &Bernoulli, a: &Bernoulli, b: &Bernoulli) -> f64 {
    or_average_conditional(a, b).log_average_of(or)
}

pub fn or_log_evidence_ratio(or: &Bernoulli, a: &Bernoulli, b: &Bernoulli) -> f64 {
    if or.is_point_mass() {
        or_log_average_factor(or, a, b)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_math::sigmoid;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn not_flips_log_odds() {
        let a = Bernoulli::from_log_odds(0.8);
        assert_eq!(not_average_conditional(&a).log_odds, -0.8);
        assert!(not_a_average_conditional(&Bernoulli::point_mass(true)).is_point_mass());
    }

    #[test]
    fn and_truth_table_at_point_masses() {
        let t = Bernoulli::point_mass(true);
        let f = Bernoulli::point_mass(false);
        assert!(and_average_conditional(&t, &t).point());
        assert!(!and_average_conditional(&t, &f).point());
        assert!(!and_average_conditional(&f, &f).point());
        assert!(or_average_conditional(&t, &f).point());
        assert!(!or_average_conditional(&f, &f).point());
    }

    #[test]
    fn and_forward_matches_probability_arithmetic() {
        let a = Bernoulli::from_prob_true(0.7);
        let b = Bernoulli::from_prob_true(0.4);
        let msg = and_average_conditional(&a, &b);
        assert!(approx_eq(msg.prob_true(), 0.28, 1e-12));
        let msg_or = or_average_conditional(&a, &b);
        assert!(approx_eq(msg_or.prob_true(), 1.0 - 0.3 * 0.6, 1e-12));
    }

    #[test]
    fn and_backward_matches_enumeration() {
        let e = Bernoulli::from_prob_true(0.9);
        let b = Bernoulli::from_prob_true(0.4);
        let msg = and_a_average_conditional(&e, &b);
        // a = true: agreement of and with b; a = false: and must be false
        let w_true = 0.4f64 * 0.9 + 0.6 * 0.1;
        let w_false = 0.1f64;
        assert!(approx_eq(msg.log_odds, (w_true / w_false).ln(), 1e-12));
    }

    #[test]
    fn observed_outputs_pin_inputs() {
        let b = Bernoulli::from_prob_true(0.4);
        let and_t = and_a_average_conditional(&Bernoulli::point_mass(true), &b);
        assert!(and_t.is_point_mass() && and_t.point());
        let or_f = or_a_average_conditional(&Bernoulli::point_mass(false), &b);
        assert!(or_f.is_point_mass() && !or_f.point());
        // and = false with b = false leaves a unconstrained
        let and_f =
            and_a_average_conditional(&Bernoulli::point_mass(false), &Bernoulli::point_mass(false));
        assert!(and_f.is_uniform());
    }

    #[test]
    fn symmetric_in_arguments() {
        let a = Bernoulli::from_log_odds(1.0);
        let b = Bernoulli::from_log_odds(-0.5);
        assert_eq!(
            and_average_conditional(&a, &b),
            and_average_conditional(&b, &a)
        );
        assert_eq!(or_average_conditional(&a, &b), or_average_conditional(&b, &a));
    }

    #[test]
    fn uncertain_output_evidence_is_zero() {
        let e = Bernoulli::from_log_odds(0.3);
        let a = Bernoulli::from_log_odds(1.0);
        let b = Bernoulli::from_log_odds(-1.0);
        assert_eq!(and_log_evidence_ratio(&e, &a, &b), 0.0);
        // Observed output keeps the log-factor
        let t = Bernoulli::point_mass(true);
        let expected = (sigmoid(1.0) * sigmoid(-1.0)).ln();
        assert!(approx_eq(and_log_evidence_ratio(&t, &a, &b), expected, 1e-12));
    }
}
