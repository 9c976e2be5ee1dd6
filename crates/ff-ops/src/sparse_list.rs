//! Element-wise lifting of scalar operators across sparse lists.
//!
//! A scalar operator applied to a sparse list touches the shared default
//! once and each exception individually, so factors over long,
//! mostly-identical lists stay cheap. Evidence sums respect the same
//! sparsity.

use ff_common::OpResult;
use ff_dist::{Bernoulli, Gaussian, SparseList};

use crate::{equal, plus};

/// Lift a unary message operator across a sparse list.
pub fn lift_unary<D, E>(
    input: &SparseList<D>,
    op: impl FnMut(&D) -> OpResult<E>,
) -> OpResult<SparseList<E>>
where
    D: Clone + PartialEq,
    E: Clone + PartialEq,
{
    input.try_map(op)
}

/// Lift a binary message operator across two sparse lists.
pub fn lift_binary<D, E, F>(
    a: &SparseList<D>,
    b: &SparseList<E>,
    op: impl FnMut(&D, &E) -> OpResult<F>,
) -> OpResult<SparseList<F>>
where
    D: Clone + PartialEq,
    E: Clone + PartialEq,
    F: Clone + PartialEq,
{
    a.try_zip_map(b, op)
}

/// Element-wise Gaussian sum: message to the sums list.
pub fn sums_average_conditional(
    a: &SparseList<Gaussian>,
    b: &SparseList<Gaussian>,
) -> OpResult<SparseList<Gaussian>> {
    lift_binary(a, b, |x, y| Ok(plus::sum_average_conditional(x, y)))
}

/// Element-wise Gaussian sum: message to the first addend list.
pub fn sums_a_average_conditional(
    sums: &SparseList<Gaussian>,
    b: &SparseList<Gaussian>,
) -> OpResult<SparseList<Gaussian>> {
    lift_binary(sums, b, |s, y| Ok(plus::a_average_conditional(s, y)))
}

/// Element-wise AreEqual over Bernoulli lists: message to the indicators.
pub fn are_equal_average_conditional(
    a: &SparseList<Bernoulli>,
    b: &SparseList<Bernoulli>,
) -> OpResult<SparseList<Bernoulli>> {
    lift_binary(a, b, |x, y| Ok(equal::are_equal_average_conditional(x, y)))
}

/// Summed evidence across an element-wise factor list, using sparsity:
/// the default pair is scored once.
pub fn sums_log_average_factor(
    sums: &SparseList<Gaussian>,
    a: &SparseList<Gaussian>,
    b: &SparseList<Gaussian>,
) -> OpResult<f64> {
    let forward = sums_average_conditional(a, b)?;
    let scores = forward.try_zip_map(sums, |f, s| Ok(f.log_average_of(s)))?;
    Ok(scores.sum_scores(|&score| score))
}

/// Element-wise evidence ratios are zero for derived uncertain outputs.
pub fn log_evidence_ratio() -> f64 {
    0.0
}
