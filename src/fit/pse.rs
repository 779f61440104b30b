//! PSE derivation: the x at which the fitted probability of y=1 is 0.5.
//!
//! From `logit P = a + b x = 0` we get `x = -a / b`. A slope within the floor
//! of zero gives an explicit `Pse::Undefined` instead of ±infinity.

use crate::domain::{FitResult, Pse, PseResult, UndefinedPse};

/// Derive the PSE for one fit.
pub fn compute_pse(fit: FitResult, slope_floor: f64) -> PseResult {
    let pse = pse_value(&fit, slope_floor);
    PseResult { fit, pse }
}

fn pse_value(fit: &FitResult, slope_floor: f64) -> Pse {
    if !fit.status.is_converged() || !fit.intercept.is_finite() || !fit.slope.is_finite() {
        return Pse::Undefined(UndefinedPse::FitInvalid);
    }
    if fit.slope.abs() <= slope_floor {
        return Pse::Undefined(UndefinedPse::FlatSlope);
    }
    let pse = -fit.intercept / fit.slope;
    if pse.is_finite() {
        Pse::Defined(pse)
    } else {
        Pse::Undefined(UndefinedPse::FlatSlope)
    }
}
