//! Scalar helpers for the logit model and Wald inference.
//!
//! All functions are written to stay finite for large `|η|`: the fitter
//! deliberately walks far into the tails when data are (nearly) separated,
//! and we need the deviance to keep decreasing there instead of collapsing to
//! `ln(0)`.

use statrs::distribution::{ContinuousCDF, Normal};

/// Logistic function `1 / (1 + e^{-η})`.
pub fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// `ln σ(η)`, stable for large negative `η`.
pub fn log_sigmoid(eta: f64) -> f64 {
    -softplus(-eta)
}

/// `ln(1 + e^z)`.
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// `k ln(k / m)` with the convention `0 ln 0 = 0`.
pub fn xlogy_ratio(k: f64, m: f64) -> f64 {
    if k <= 0.0 { 0.0 } else { k * (k / m).ln() }
}

/// Two-sided p-value of a Wald statistic against the standard normal.
///
/// Returns NaN for non-finite input.
pub fn wald_p_value(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        // P(|Z| > |z|) = 2 * P(Z > |z|); `sf` keeps precision in the far tail.
        Ok(normal) => (2.0 * normal.sf(z.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}
