//! AreEqual and equality-constraint factors.
//!
//! `AreEqual(a, b) -> e` reports whether two discrete variables agree;
//! its Bernoulli messages have the `logit_prob_equal` closed form. The
//! bare equality constraint between two variables of one family is a pure
//! reparameterization: each side receives the other side's belief.

use ff_common::OpResult;
use ff_dist::bernoulli::logit_prob_equal;
use ff_dist::{Belief, Bernoulli, Discrete};
use ff_math::log_sum_exp;

/// EP message to the equality indicator.
pub fn are_equal_average_conditional(a: &Bernoulli, b: &Bernoulli) -> Bernoulli {
    Bernoulli::from_log_odds(logit_prob_equal(a.log_odds, b.log_odds))
}

/// EP message to `a`. By the symmetry of the agreement table this has the
/// same closed form as the forward message.
pub fn a_average_conditional(are_equal: &Bernoulli, b: &Bernoulli) -> Bernoulli {
    Bernoulli::from_log_odds(logit_prob_equal(are_equal.log_odds, b.log_odds))
}

pub fn b_average_conditional(are_equal: &Bernoulli, a: &Bernoulli) -> Bernoulli {
    a_average_conditional(are_equal, a)
}

/// Observed-indicator overload: pass `b` through, flipped on disagreement.
pub fn a_average_conditional_observed(are_equal: bool, b: &Bernoulli) -> Bernoulli {
    if are_equal {
        *b
    } else {
        Bernoulli::from_log_odds(-b.log_odds)
    }
}

/// Evidence: log E[factor] under the current messages.
pub fn log_average_factor(are_equal: &Bernoulli, a: &Bernoulli, b: &Bernoulli) -> f64 {
    let to_e = are_equal_average_conditional(a, b);
    to_e.log_average_of(are_equal)
}

/// EP evidence after removing the double-counted output normalizer: zero
/// for an uncertain indicator, the log-factor itself for an observed one.
pub fn log_evidence_ratio(are_equal: &Bernoulli, a: &Bernoulli, b: &Bernoulli) -> f64 {
    if are_equal.is_point_mass() {
        log_average_factor(are_equal, a, b)
    } else {
        0.0
    }
}

/// Discrete variant: message to the indicator.
pub fn are_equal_discrete_average_conditional(a: &Discrete, b: &Discrete) -> Bernoulli {
    let log_agree = a.log_average_of(b);
    // log P(disagree) = log(1 - P(agree))
    let log_disagree = (-log_agree.exp()).ln_1p();
    Bernoulli::from_log_odds(log_agree - log_disagree)
}

/// Discrete variant: message to `a`.
///
/// For a = i the factor averages to P(e=T) q_b(i) + P(e=F)(1 - q_b(i)).
pub fn a_discrete_average_conditional(are_equal: &Bernoulli, b: &Discrete) -> OpResult<Discrete> {
    let log_pe = are_equal.log_prob_true();
    let log_qe = are_equal.log_prob_false();
    let weights: Vec<f64> = (0..b.len())
        .map(|i| {
            let log_pb = b.log_prob(i);
            let log_not_pb = (-log_pb.exp()).ln_1p();
            log_sum_exp(&[log_pe + log_pb, log_qe + log_not_pb])
        })
        .collect();
    Ok(Discrete::from_log_weights(weights)?.0)
}

/// Equality constraint: the message to one side is the other side's belief.
pub fn equal_a_average_conditional<B: Belief>(b: &B) -> B {
    b.clone()
}

pub fn equal_b_average_conditional<B: Belief>(a: &B) -> B {
    a.clone()
}

/// Evidence for the equality constraint. The normalizer of the product of
/// the two incoming beliefs appears once in the numerator and once in the
/// denominator, so the net contribution cancels to zero.
pub fn equal_log_evidence_ratio<B: Belief>(a: &B, b: &B) -> f64 {
    a.log_average_of(b) - b.log_average_of(a)
}
