//! Error types for message-operator evaluation.
//!
//! The taxonomy separates four failure kinds that schedulers treat
//! differently:
//! - improper inputs, which may resolve once upstream messages stabilize;
//! - unsupported algorithm/argument combinations, permanent by nature;
//! - numerical breakdown (NaN, non-point-mass infinite precision), always
//!   a programming error;
//! - all-zero contradictions between observed constants, which signal a
//!   model bug rather than an ordinary zero-likelihood outcome.
//!
//! Zero likelihood itself is not an error: deterministic mismatches yield
//! a -infinity log-factor value and inference continues.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for operator evaluation.
pub type OpResult<T> = std::result::Result<T, OperatorError>;

/// Unified failure type raised by the operator catalogue.
///
/// Failures propagate to the scheduler uncaught; no operator substitutes a
/// default value for a failed computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperatorError {
    /// A required-proper incoming message was improper. Retryable once the
    /// upstream message stabilizes.
    #[error("improper message for argument '{argument}'")]
    ImproperMessage { argument: &'static str },

    /// The requested algorithm cannot produce a correct message for this
    /// argument configuration. Permanent for the combination.
    #[error("not supported: {reason}")]
    NotSupported { reason: &'static str },

    /// NaN or infinite-without-point-mass precision appeared in a result.
    #[error("numerical breakdown in {context}")]
    NumericalBreakdown { context: &'static str },

    /// Observed constants jointly violate a hard factor constraint.
    /// Distinct from ordinary zero likelihood: the model itself is wrong.
    #[error("all-zero constraint violation: {constraint}")]
    AllZero { constraint: &'static str },

    /// An argument had the wrong shape or length for the factor.
    #[error("domain mismatch for '{argument}': {message}")]
    DomainMismatch {
        argument: &'static str,
        message: String,
    },
}

/// Suggested scheduler reaction, mirrored in serialized diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Retry after upstream messages change.
    Retry,
    /// Skip this update permanently.
    Skip,
    /// Abort inference; the model or the core is wrong.
    Abort,
}

impl OperatorError {
    /// Whether the same call could succeed after upstream messages change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OperatorError::ImproperMessage { .. })
    }

    /// The reaction a scheduler should take.
    pub fn recovery(&self) -> Recovery {
        match self {
            OperatorError::ImproperMessage { .. } => Recovery::Retry,
            OperatorError::NotSupported { .. } => Recovery::Skip,
            OperatorError::NumericalBreakdown { .. } => Recovery::Abort,
            OperatorError::AllZero { .. } => Recovery::Abort,
            OperatorError::DomainMismatch { .. } => Recovery::Abort,
        }
    }
}

/// Guard helper: raises `NumericalBreakdown` when a computed scalar is NaN.
///
/// Infinities pass through; callers that forbid them check separately.
pub fn require_not_nan(value: f64, context: &'static str) -> OpResult<f64> {
    if value.is_nan() {
        Err(OperatorError::NumericalBreakdown { context })
    } else {
        Ok(value)
    }
}
