//! Binomial-count logistic regression for a single group.
//!
//! Given the cells of one group (stimulus level `x`, successes `ones`, trials
//! `n`), we maximize the binomial log-likelihood of
//!
//! ```text
//! logit P(y=1 | x) = a + b x
//! ```
//!
//! by Newton-Raphson, which for the canonical logit link is the same iteration
//! as IRLS. Each step solves `I(β) δ = U(β)` with the Fisher information `I`
//! and score `U`.
//!
//! Numerical details:
//! - x is centred on its trial-weighted mean and scaled by its weighted
//!   standard deviation before fitting; coefficients and their covariance are
//!   mapped back afterwards. The linear predictor `η` is identical in both
//!   parameterizations, so every `η`-based guard is unaffected.
//! - Convergence: `|dev - dev_old| / (|dev| + 0.1) < tolerance`, with a hard
//!   iteration cap.
//! - Step-halving whenever a full step fails to decrease the deviance.
//! - Separation: the MLE exists iff the x-ranges of the y=1 and y=0 trials
//!   overlap, which we check exactly before iterating. Coefficients can only
//!   grow without bound when that check fails, so the loop itself does not
//!   bound `|η|`: widely spaced levels legitimately reach very large `|η|` at
//!   a finite optimum. The loop only stops early on non-finite values.

use nalgebra::{Matrix2, Vector2};

use crate::domain::{FitOptions, FitResult, FitStatus, GroupCell, GroupKey, NonIdentifiableReason};
use crate::math::{invert_spd, log_sigmoid, sigmoid, solve_spd, wald_p_value, xlogy_ratio};

/// Maximum number of step halvings per iteration.
const MAX_STEP_HALVINGS: usize = 20;

/// Fit one group.
///
/// Never panics and never fails: problems are reported through
/// `FitResult::status`, with NaN coefficients.
pub fn fit_group(key: &GroupKey, cells: &[GroupCell], options: &FitOptions) -> FitResult {
    let n_trials: u64 = cells.iter().map(GroupCell::n).sum();
    let n_levels = count_levels(cells);

    if let Some(reason) = non_identifiable_reason(cells, n_levels) {
        return FitResult::failed(key.clone(), FitStatus::NonIdentifiable(reason), n_trials, n_levels, 0);
    }

    if is_separated(cells) {
        log::debug!("{key}: outcome classes are separated in x; MLE does not exist");
        return FitResult::failed(key.clone(), FitStatus::Diverged, n_trials, n_levels, 0);
    }

    let design = Design::new(cells);
    let outcome = irls(&design, options);
    log::debug!(
        "{key}: {:?} after {} iteration(s), deviance={:.6}",
        outcome.status,
        outcome.iterations,
        outcome.deviance
    );

    if !outcome.status.is_converged() {
        return FitResult::failed(key.clone(), outcome.status, n_trials, n_levels, outcome.iterations);
    }

    // Covariance of the standardized coefficients.
    let Some(cov_std) = invert_spd(&outcome.information) else {
        return FitResult::failed(key.clone(), FitStatus::Singular, n_trials, n_levels, outcome.iterations);
    };

    // a = b0 - b1 c / s,  b = b1 / s
    let (c, s) = (design.center, design.scale);
    let jacobian = Matrix2::new(1.0, -c / s, 0.0, 1.0 / s);
    let coef = jacobian * outcome.beta;
    let cov = jacobian * cov_std * jacobian.transpose();

    let (intercept, slope) = (coef[0], coef[1]);
    let intercept_se = std_error(cov[(0, 0)]);
    let slope_se = std_error(cov[(1, 1)]);
    let slope_z = slope / slope_se;

    FitResult {
        key: key.clone(),
        status: FitStatus::Converged,
        intercept,
        slope,
        intercept_se,
        slope_se,
        slope_z,
        slope_p_value: wald_p_value(slope_z),
        deviance: outcome.deviance,
        null_deviance: design.null_deviance(),
        log_likelihood: design.log_likelihood(&outcome.beta),
        iterations: outcome.iterations,
        n_trials,
        n_levels,
    }
}

fn std_error(variance: f64) -> f64 {
    if variance.is_finite() && variance >= 0.0 { variance.sqrt() } else { f64::NAN }
}

fn count_levels(cells: &[GroupCell]) -> usize {
    let mut levels: Vec<_> = cells.iter().map(|c| c.x).collect();
    levels.sort();
    levels.dedup();
    levels.len()
}

fn non_identifiable_reason(cells: &[GroupCell], n_levels: usize) -> Option<NonIdentifiableReason> {
    if n_levels < 2 {
        return Some(NonIdentifiableReason::TooFewLevels);
    }
    let ones: u64 = cells.iter().map(|c| c.ones).sum();
    let zeros: u64 = cells.iter().map(|c| c.zeros).sum();
    if ones == 0 || zeros == 0 {
        return Some(NonIdentifiableReason::NoResponseVariance);
    }
    None
}

/// True when a threshold on x splits the outcome classes (complete or
/// quasi-complete separation).
///
/// With a single predictor plus intercept, the MLE exists iff the ranges of x
/// over y=1 trials and over y=0 trials overlap on an open interval.
fn is_separated(cells: &[GroupCell]) -> bool {
    let range = |pick: fn(&GroupCell) -> u64| {
        cells
            .iter()
            .filter(|c| pick(c) > 0)
            .map(|c| c.x.value())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)))
    };
    let (ones_min, ones_max) = range(|c| c.ones);
    let (zeros_min, zeros_max) = range(|c| c.zeros);

    let overlap = ones_min < zeros_max && zeros_min < ones_max;
    !overlap
}

/// Standardized design for one group.
struct Design {
    z: Vec<f64>,
    ones: Vec<f64>,
    zeros: Vec<f64>,
    center: f64,
    scale: f64,
    /// Log-likelihood of the saturated model (one probability per cell).
    saturated_ll: f64,
}

impl Design {
    fn new(cells: &[GroupCell]) -> Self {
        let total: f64 = cells.iter().map(|c| c.n() as f64).sum();
        let center = cells.iter().map(|c| c.n() as f64 * c.x.value()).sum::<f64>() / total;
        let var = cells
            .iter()
            .map(|c| c.n() as f64 * (c.x.value() - center).powi(2))
            .sum::<f64>()
            / total;
        let scale = if var.is_finite() && var > 0.0 { var.sqrt() } else { 1.0 };

        let saturated_ll = cells
            .iter()
            .map(|c| {
                let n = c.n() as f64;
                xlogy_ratio(c.ones as f64, n) + xlogy_ratio(c.zeros as f64, n)
            })
            .sum::<f64>();

        Self {
            z: cells.iter().map(|c| (c.x.value() - center) / scale).collect(),
            ones: cells.iter().map(|c| c.ones as f64).collect(),
            zeros: cells.iter().map(|c| c.zeros as f64).collect(),
            center,
            scale,
            saturated_ll,
        }
    }

    fn eta(&self, beta: &Vector2<f64>, i: usize) -> f64 {
        beta[0] + beta[1] * self.z[i]
    }

    fn max_abs_eta(&self, beta: &Vector2<f64>) -> f64 {
        (0..self.z.len())
            .map(|i| self.eta(beta, i).abs())
            .fold(0.0, f64::max)
    }

    /// Bernoulli log-likelihood summed over all trials.
    fn log_likelihood(&self, beta: &Vector2<f64>) -> f64 {
        (0..self.z.len())
            .map(|i| {
                let eta = self.eta(beta, i);
                self.ones[i] * log_sigmoid(eta) + self.zeros[i] * log_sigmoid(-eta)
            })
            .sum()
    }

    fn deviance(&self, beta: &Vector2<f64>) -> f64 {
        (2.0 * (self.saturated_ll - self.log_likelihood(beta))).max(0.0)
    }

    fn null_deviance(&self) -> f64 {
        let ones: f64 = self.ones.iter().sum();
        let zeros: f64 = self.zeros.iter().sum();
        let p = ones / (ones + zeros);
        let null_ll = ones * p.ln() + zeros * (1.0 - p).ln();
        (2.0 * (self.saturated_ll - null_ll)).max(0.0)
    }

    /// Score vector and Fisher information at `beta`.
    fn score_and_information(&self, beta: &Vector2<f64>) -> (Vector2<f64>, Matrix2<f64>) {
        let mut score = Vector2::zeros();
        let mut info = Matrix2::zeros();
        for i in 0..self.z.len() {
            let eta = self.eta(beta, i);
            let (p, q) = (sigmoid(eta), sigmoid(-eta));
            // ones - n p, written so it stays accurate when p is close to 1.
            let resid = self.ones[i] * q - self.zeros[i] * p;
            let w = (self.ones[i] + self.zeros[i]) * p * q;
            let z = self.z[i];

            score[0] += resid;
            score[1] += resid * z;
            info[(0, 0)] += w;
            info[(0, 1)] += w * z;
            info[(1, 1)] += w * z * z;
        }
        info[(1, 0)] = info[(0, 1)];
        (score, info)
    }
}

struct IrlsOutcome {
    status: FitStatus,
    /// Coefficients on the standardized scale.
    beta: Vector2<f64>,
    /// Fisher information at `beta`.
    information: Matrix2<f64>,
    deviance: f64,
    iterations: usize,
}

fn irls(design: &Design, options: &FitOptions) -> IrlsOutcome {
    let mut beta = Vector2::zeros();
    let mut dev = design.deviance(&beta);

    let stop = |status: FitStatus, beta: Vector2<f64>, dev: f64, iterations: usize| IrlsOutcome {
        status,
        beta,
        information: design.score_and_information(&beta).1,
        deviance: dev,
        iterations,
    };

    for iter in 1..=options.max_iterations {
        let (score, info) = design.score_and_information(&beta);
        let Some(step) = solve_spd(&info, &score) else {
            return stop(FitStatus::Singular, beta, dev, iter);
        };

        // Step-halving: accept the longest step that does not increase the deviance.
        let mut t = 1.0;
        let mut accepted = None;
        for _ in 0..=MAX_STEP_HALVINGS {
            let candidate = beta + step * t;
            let candidate_dev = design.deviance(&candidate);
            if candidate_dev.is_finite() && candidate_dev <= dev * (1.0 + 1e-12) + 1e-12 {
                accepted = Some((candidate, candidate_dev));
                break;
            }
            t *= 0.5;
        }
        let Some((new_beta, new_dev)) = accepted else {
            return stop(FitStatus::NotConverged, beta, dev, iter);
        };

        let max_eta = design.max_abs_eta(&new_beta);
        log::debug!(
            "iter {iter}: beta=[{:.6}, {:.6}] deviance={new_dev:.9} max|eta|={max_eta:.3} step={t}",
            new_beta[0],
            new_beta[1]
        );

        if !max_eta.is_finite() || new_beta.iter().any(|v| !v.is_finite()) {
            return stop(FitStatus::Diverged, new_beta, new_dev, iter);
        }

        let converged = (new_dev - dev).abs() / (new_dev.abs() + 0.1) < options.tolerance;
        beta = new_beta;
        dev = new_dev;
        if converged {
            return stop(FitStatus::Converged, beta, dev, iter);
        }
    }

    stop(FitStatus::NotConverged, beta, dev, options.max_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Label, Level};

    fn cells(key: &GroupKey, data: &[(f64, u64, u64)]) -> Vec<GroupCell> {
        data.iter()
            .map(|&(x, ones, zeros)| GroupCell {
                key: key.clone(),
                x: Level::new(x).unwrap(),
                ones,
                zeros,
            })
            .collect()
    }

    fn key() -> GroupKey {
        GroupKey::individual(Label::new("p1"), Label::new("A"))
    }

    #[test]
    fn two_level_fit_matches_closed_form() {
        // With two levels the model is saturated: a = logit(1/4), b = logit(3/4) - logit(1/4),
        // Var(logit p_hat) = 1 / (n p (1-p)) = 4/3 per level.
        let k = key();
        let fit = fit_group(&k, &cells(&k, &[(0.0, 1, 3), (1.0, 3, 1)]), &FitOptions::default());

        assert_eq!(fit.status, FitStatus::Converged);
        let l3 = 3.0_f64.ln();
        assert!((fit.intercept + l3).abs() < 1e-6, "a={}", fit.intercept);
        assert!((fit.slope - 2.0 * l3).abs() < 1e-6, "b={}", fit.slope);
        assert!((fit.intercept_se - (4.0_f64 / 3.0).sqrt()).abs() < 1e-6);
        assert!((fit.slope_se - (8.0_f64 / 3.0).sqrt()).abs() < 1e-6);
        assert!(fit.slope_p_value > 0.17 && fit.slope_p_value < 0.19, "p={}", fit.slope_p_value);
        assert!(fit.deviance < 1e-8);
        assert_eq!(fit.n_trials, 8);
        assert_eq!(fit.n_levels, 2);
    }

    #[test]
    fn recovers_known_coefficients_from_large_counts() {
        let (a, b) = (1.5, -0.8);
        let k = key();
        let data: Vec<(f64, u64, u64)> = (-2..=6)
            .map(|i| {
                let x = i as f64;
                let ones = (1000.0 * sigmoid(a + b * x)).round() as u64;
                (x, ones, 1000 - ones)
            })
            .collect();

        let fit = fit_group(&k, &cells(&k, &data), &FitOptions::default());
        assert_eq!(fit.status, FitStatus::Converged);
        assert!((fit.intercept - a).abs() < 0.05, "a={}", fit.intercept);
        assert!((fit.slope - b).abs() < 0.05, "b={}", fit.slope);
        assert!(fit.slope_p_value < 1e-10);
        assert!(fit.null_deviance > fit.deviance);
        assert!(fit.log_likelihood < 0.0);
    }

    #[test]
    fn large_x_offsets_do_not_hurt_conditioning() {
        // Same curve shifted by 10_000 in x: slope identical, intercept shifted.
        let (a, b) = (0.5, 1.2);
        let k = key();
        let shift = 10_000.0;
        let data: Vec<(f64, u64, u64)> = (-3..=3)
            .map(|i| {
                let x = i as f64;
                let ones = (200.0 * sigmoid(a + b * x)).round() as u64;
                (x + shift, ones, 200 - ones)
            })
            .collect();
        let fit = fit_group(&k, &cells(&k, &data), &FitOptions::default());
        assert_eq!(fit.status, FitStatus::Converged);

        let unshifted: Vec<(f64, u64, u64)> = data.iter().map(|&(x, o, z)| (x - shift, o, z)).collect();
        let base = fit_group(&k, &cells(&k, &unshifted), &FitOptions::default());
        assert!((fit.slope - base.slope).abs() < 1e-6);
        assert!((fit.intercept - (base.intercept - base.slope * shift)).abs() < 1e-3);
    }

    #[test]
    fn balanced_responses_give_exactly_zero_slope() {
        let k = key();
        let fit = fit_group(&k, &cells(&k, &[(1.0, 5, 5), (2.0, 5, 5), (3.0, 5, 5)]), &FitOptions::default());
        assert_eq!(fit.status, FitStatus::Converged);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 0.0);
        assert!((fit.slope_p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_level_is_not_identifiable() {
        let k = key();
        let fit = fit_group(&k, &cells(&k, &[(1.0, 4, 6)]), &FitOptions::default());
        assert_eq!(
            fit.status,
            FitStatus::NonIdentifiable(NonIdentifiableReason::TooFewLevels)
        );
        assert!(fit.intercept.is_nan() && fit.slope.is_nan() && fit.slope_p_value.is_nan());
        assert_eq!(fit.n_trials, 10);
    }

    #[test]
    fn constant_response_is_not_identifiable() {
        let k = key();
        let fit = fit_group(&k, &cells(&k, &[(1.0, 10, 0), (2.0, 10, 0)]), &FitOptions::default());
        assert_eq!(
            fit.status,
            FitStatus::NonIdentifiable(NonIdentifiableReason::NoResponseVariance)
        );
    }

    #[test]
    fn perfect_separation_is_flagged_without_iterating() {
        // y=0 for x<2, y=1 for x>=2.
        let k = key();
        let fit = fit_group(&k, &cells(&k, &[(1.0, 0, 10), (2.0, 10, 0), (3.0, 10, 0)]), &FitOptions::default());
        assert_eq!(fit.status, FitStatus::Diverged);
        assert_eq!(fit.iterations, 0);
        assert!(fit.slope.is_nan());
        assert!(fit.slope_p_value.is_nan());
    }

    #[test]
    fn quasi_separation_is_flagged() {
        // The boundary level is mixed, everything else is pure.
        let k = key();
        let c = cells(&k, &[(1.0, 0, 10), (2.0, 4, 6), (3.0, 10, 0)]);
        assert!(is_separated(&c));
        assert_eq!(fit_group(&k, &c, &FitOptions::default()).status, FitStatus::Diverged);
    }

    #[test]
    fn overlapping_classes_are_not_separated() {
        let k = key();
        assert!(!is_separated(&cells(&k, &[(1.0, 1, 9), (2.0, 4, 6), (3.0, 10, 0)])));
        // Non-monotone data still has a finite MLE.
        assert!(!is_separated(&cells(&k, &[(1.0, 0, 5), (2.0, 3, 2), (3.0, 0, 5)])));
    }

    #[test]
    fn widely_spaced_levels_still_converge() {
        // Outer cells sit at |eta| ~ 800 at the optimum; the middle two cells
        // pin the fit to a = logit(0.4), b = logit(0.6) - logit(0.4).
        let k = key();
        let c = cells(&k, &[(-1000.0, 0, 10), (0.0, 4, 6), (1.0, 6, 4), (1000.0, 10, 0)]);
        assert!(!is_separated(&c));

        let fit = fit_group(&k, &c, &FitOptions::default());
        assert_eq!(fit.status, FitStatus::Converged);
        let logit = |p: f64| (p / (1.0 - p)).ln();
        assert!((fit.intercept - logit(0.4)).abs() < 1e-4, "a={}", fit.intercept);
        assert!((fit.slope - (logit(0.6) - logit(0.4))).abs() < 1e-4, "b={}", fit.slope);
        assert!(fit.slope_p_value.is_finite());
    }

    #[test]
    fn iteration_cap_is_reported() {
        let k = key();
        let opts = FitOptions {
            max_iterations: 1,
            ..FitOptions::default()
        };
        let data: Vec<(f64, u64, u64)> = (0..5)
            .map(|i| {
                let ones = (100.0 * sigmoid(-2.0 + 1.3 * i as f64)).round() as u64;
                (i as f64, ones, 100 - ones)
            })
            .collect();
        let fit = fit_group(&k, &cells(&k, &data), &opts);
        assert_eq!(fit.status, FitStatus::NotConverged);
        assert_eq!(fit.iterations, 1);
        assert!(fit.intercept.is_nan());
    }

    #[test]
    fn refitting_is_bit_identical() {
        let k = key();
        let c = cells(&k, &[(1.0, 8, 2), (2.0, 5, 5), (3.0, 1, 9)]);
        let first = fit_group(&k, &c, &FitOptions::default());
        let second = fit_group(&k, &c, &FitOptions::default());
        assert_eq!(first.intercept.to_bits(), second.intercept.to_bits());
        assert_eq!(first.slope.to_bits(), second.slope.to_bits());
        assert_eq!(first.slope_p_value.to_bits(), second.slope_p_value.to_bits());
    }
}
