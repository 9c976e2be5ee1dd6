//! Inference settings threaded explicitly through operator calls.
//!
//! A plain struct bound once at catalogue construction and passed by
//! reference, so concurrent schedulers can hold different settings
//! without any process-wide mutable state.

use serde::{Deserialize, Serialize};

/// Damping control for iterative fixed-point operators.
///
/// A fresh step fraction is drawn uniformly from [0, max_step] per update
/// and blends the new message with the previously sent one. This is an
/// empirical stabilizer: it changes convergence speed, never the fixed
/// point itself, and carries no convergence proof.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DampingSettings {
    /// Upper bound of the random step fraction. 0 disables damping.
    pub max_step: f64,
}

impl Default for DampingSettings {
    fn default() -> Self {
        Self { max_step: 0.5 }
    }
}

impl DampingSettings {
    /// Damping disabled entirely.
    pub fn off() -> Self {
        Self { max_step: 0.0 }
    }
}

/// Settings consulted by every operator group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    /// When a message ratio produces a non-normalizable (negative
    /// precision/count) result, nudge it back to a proper distribution
    /// instead of propagating the improper message.
    pub force_proper: bool,
    /// Damping control for the iterative operators.
    pub damping: DampingSettings,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            force_proper: false,
            damping: DampingSettings::default(),
        }
    }
}

impl InferenceSettings {
    /// Settings with the force-proper guard enabled.
    pub fn forcing_proper() -> Self {
        Self {
            force_proper: true,
            ..Self::default()
        }
    }
}
