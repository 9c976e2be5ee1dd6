//! Numerically stable primitives for log-domain message math.

use std::f64::consts::PI;

/// ln(2*pi).
pub const LOG_2PI: f64 = 1.837_877_066_409_345_6;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // published numerical constants
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    for v in values {
        sum += (*v - max).exp();
    }
    max + sum.ln()
}

/// Stable log(exp(a) + exp(b)).
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    if a == f64::INFINITY || b == f64::INFINITY {
        return f64::INFINITY;
    }
    let m = a.max(b);
    let diff = (a - b).abs();
    m + (-diff).exp().ln_1p()
}

/// Stable log(exp(a) - exp(b)). Requires a > b for real-valued result.
pub fn log_sub_exp(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    if a == b {
        return f64::NEG_INFINITY;
    }
    if a < b {
        return f64::NAN;
    }
    if a == f64::INFINITY {
        return f64::INFINITY;
    }
    let exp_x = (b - a).exp();
    a + (-exp_x).ln_1p()
}

/// log(1 + exp(x)) without overflow for large x or underflow for very negative x.
pub fn log1p_exp(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x > 33.3 {
        // exp(-x) below double epsilon relative to x
        x
    } else if x > -37.0 {
        x.exp().ln_1p()
    } else {
        x.exp()
    }
}

/// log(exp(x) - 1). Requires x > 0; returns NEG_INFINITY at 0.
pub fn log_expm1(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x > 33.3 {
        return x;
    }
    x.exp_m1().ln()
}

/// Logistic function 1 / (1 + exp(-x)), stable in both tails.
pub fn sigmoid(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// log(sigmoid(x)) = -log(1 + exp(-x)).
pub fn log_sigmoid(x: f64) -> f64 {
    -log1p_exp(-x)
}

/// Inverse of the logistic function: log(p / (1 - p)).
pub fn logit(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    p.ln() - (-p).ln_1p()
}

/// Natural log of the Gamma function (log |Gamma(z)|).
///
/// Uses a Lanczos approximation with reflection for z < 0.5.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z <= 0.0 {
        let z_round = z.round();
        if (z - z_round).abs() < 1e-15 {
            return f64::NAN;
        }
    }
    if z < 0.5 {
        let sin_pi = (PI * z).sin();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}

/// log Beta(a, b) = log Gamma(a) + log Gamma(b) - log Gamma(a+b).
pub fn log_beta(a: f64, b: f64) -> f64 {
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

// Asymptotic expansion of digamma/trigamma is applied above this point;
// smaller arguments are shifted up by the recurrence first.
const PSI_ASYMPTOTIC_MIN: f64 = 6.0;

/// Digamma function psi(x) = d/dx log Gamma(x).
pub fn digamma(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return f64::INFINITY;
    }
    if x <= 0.0 {
        let x_round = x.round();
        if (x - x_round).abs() < 1e-15 {
            return f64::NAN;
        }
        // Reflection: psi(x) = psi(1-x) - pi / tan(pi x)
        return digamma(1.0 - x) - PI / (PI * x).tan();
    }

    let mut result = 0.0;
    let mut z = x;
    while z < PSI_ASYMPTOTIC_MIN {
        result -= 1.0 / z;
        z += 1.0;
    }
    let inv = 1.0 / z;
    let inv2 = inv * inv;
    // psi(z) ~ ln z - 1/(2z) - 1/(12z^2) + 1/(120z^4) - 1/(252z^6) + 1/(240z^8)
    let series = inv2 * (-1.0 / 12.0 + inv2 * (1.0 / 120.0 + inv2 * (-1.0 / 252.0 + inv2 / 240.0)));
    result + z.ln() - 0.5 * inv + series
}

/// Trigamma function psi'(x) = d^2/dx^2 log Gamma(x).
pub fn trigamma(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return 0.0;
    }
    if x <= 0.0 {
        let x_round = x.round();
        if (x - x_round).abs() < 1e-15 {
            return f64::NAN;
        }
        // Reflection: psi'(x) + psi'(1-x) = pi^2 / sin^2(pi x)
        let s = (PI * x).sin();
        return PI * PI / (s * s) - trigamma(1.0 - x);
    }

    let mut result = 0.0;
    let mut z = x;
    while z < PSI_ASYMPTOTIC_MIN {
        result += 1.0 / (z * z);
        z += 1.0;
    }
    let inv = 1.0 / z;
    let inv2 = inv * inv;
    // psi'(z) ~ 1/z + 1/(2z^2) + 1/(6z^3) - 1/(30z^5) + 1/(42z^7) - 1/(30z^9)
    let series = inv * inv2 * (1.0 / 6.0 + inv2 * (-1.0 / 30.0 + inv2 * (1.0 / 42.0 - inv2 / 30.0)));
    result + inv + 0.5 * inv2 + series
}

/// Normalize a slice of log-weights in place so that exp sums to one.
///
/// Returns the log-normalizer. All -inf input yields NaN weights untouched
/// and a -inf normalizer.
pub fn normalize_log_probs(log_probs: &mut [f64]) -> f64 {
    let norm = log_sum_exp(log_probs);
    if norm.is_finite() {
        for lp in log_probs.iter_mut() {
            *lp -= norm;
        }
    }
    norm
}
