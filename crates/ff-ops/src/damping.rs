//! Damping: blending a fresh message with the previously sent one.
//!
//! The blend is geometric in density space (a convex combination of
//! natural parameters), so the damped message stays inside the family.
//! The step fraction is drawn uniformly from [0, max_step] per call; the
//! randomness perturbs oscillatory fixed-point iterations without moving
//! the fixed point itself.

use ff_common::DampingSettings;
use ff_dist::Belief;
use rand::Rng;

/// Draw a step fraction for one update.
pub fn random_step(settings: &DampingSettings, rng: &mut impl Rng) -> f64 {
    if settings.max_step <= 0.0 {
        return 0.0;
    }
    rng.random_range(0.0..=settings.max_step)
}

/// new^(1-step) * previous^step.
///
/// A step of 0 returns the fresh message unchanged; point masses cannot
/// be blended and win outright.
pub fn damp<B: Belief>(new: &B, previous: &B, step: f64) -> B {
    debug_assert!((0.0..1.0).contains(&step), "step must be in [0, 1)");
    if step == 0.0 || new.is_point_mass() || previous.is_point_mass() || previous.is_uniform() {
        return new.clone();
    }
    let fresh = match new.power(1.0 - step) {
        Ok(f) => f,
        Err(_) => return new.clone(),
    };
    let held = match previous.power(step) {
        Ok(h) => h,
        Err(_) => return new.clone(),
    };
    fresh.product(&held).unwrap_or_else(|_| new.clone())
}
