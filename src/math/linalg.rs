//! Small dense linear algebra for the two-parameter logistic model.
//!
//! Every Newton step solves `I δ = U`, where `I` is the 2×2 Fisher information
//! (symmetric positive definite whenever the group has two distinct x levels
//! with non-degenerate weights) and `U` the score vector.
//!
//! Implementation choices:
//! - We reject matrices whose eigenvalue ratio is below `MIN_RECIPROCAL_CONDITION`
//!   before factorizing. Cholesky alone succeeds on matrices that are
//!   positive definite only up to rounding, which would yield meaningless
//!   standard errors.
//! - Cholesky is then used for both the solve and the inverse (covariance).

use nalgebra::{Matrix2, SymmetricEigen, Vector2};

/// Smallest accepted `λ_min / λ_max` for the information matrix.
const MIN_RECIPROCAL_CONDITION: f64 = 1e-12;

/// Solve `a x = b` for symmetric positive definite `a`.
///
/// Returns `None` if `a` is singular, indefinite, or too ill-conditioned.
pub fn solve_spd(a: &Matrix2<f64>, b: &Vector2<f64>) -> Option<Vector2<f64>> {
    if !is_well_conditioned(a) {
        return None;
    }
    let x = a.cholesky()?.solve(b);
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Invert a symmetric positive definite matrix (used for the covariance).
pub fn invert_spd(a: &Matrix2<f64>) -> Option<Matrix2<f64>> {
    if !is_well_conditioned(a) {
        return None;
    }
    let inv = a.cholesky()?.inverse();
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}

fn is_well_conditioned(a: &Matrix2<f64>) -> bool {
    if a.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let eig = SymmetricEigen::new(*a).eigenvalues;
    let (lo, hi) = (eig.min(), eig.max());
    hi > 0.0 && lo > 0.0 && lo / hi >= MIN_RECIPROCAL_CONDITION
}
