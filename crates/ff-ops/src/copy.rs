//! Copy and Cut factors.
//!
//! `Copy` relabels one variable as another: messages pass through
//! unchanged in both directions and the evidence contribution is zero.
//! `Cut` forwards belief but severs the backward dependency, sending the
//! uniform message upstream; the scheduler uses it to break update cycles.

use ff_dist::Belief;

/// EP message to the copy output: the input belief itself.
pub fn copy_average_conditional<B: Belief>(value: &B) -> B {
    value.clone()
}

/// EP message to the copied input: the output belief itself.
pub fn value_average_conditional<B: Belief>(copy: &B) -> B {
    copy.clone()
}

/// VMP messages coincide with the EP ones for a pure relabeling.
pub fn copy_average_logarithm<B: Belief>(value: &B) -> B {
    value.clone()
}

pub fn value_average_logarithm<B: Belief>(copy: &B) -> B {
    copy.clone()
}

/// Max-product messages also pass through unchanged.
pub fn copy_max_conditional<B: Belief>(value: &B) -> B {
    value.clone()
}

/// Deterministic relabeling contributes no evidence.
pub fn log_evidence_ratio() -> f64 {
    0.0
}

pub fn average_log_factor() -> f64 {
    0.0
}

/// Forward message of the Cut factor: belief passes through.
pub fn cut_average_conditional<B: Belief>(value: &B) -> B {
    value.clone()
}

/// Backward message of the Cut factor: always uniform, severing the
/// dependency on the downstream marginal.
pub fn cut_value_average_conditional<B: Belief>(value: &B) -> B {
    value.uniform_like()
}
