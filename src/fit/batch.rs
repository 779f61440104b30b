//! Fit every group of a count table.
//!
//! Groups are independent, so they are fitted in parallel with rayon. The
//! input is an ordered `Vec`, and `par_iter().map().collect()` preserves that
//! order, so the output is identical to a sequential run.

use rayon::prelude::*;

use crate::aggregate::CellGroup;
use crate::domain::{Diagnostic, FitOptions, FitStatus, Pse, PseResult, UndefinedPse};
use crate::fit::logistic::fit_group;
use crate::fit::pse::compute_pse;

/// Fit all groups and derive their PSEs, in group order.
pub fn fit_groups(groups: &[CellGroup], options: &FitOptions) -> Vec<PseResult> {
    groups
        .par_iter()
        .map(|g| {
            log::debug!("{}: fitting {} trials over {} cells", g.key, g.n_trials(), g.cells.len());
            compute_pse(fit_group(&g.key, &g.cells, options), options.slope_floor)
        })
        .collect()
}

/// Recoverable problems among fitted groups (one per flagged group).
pub fn fit_diagnostics(results: &[PseResult]) -> Vec<Diagnostic> {
    results
        .iter()
        .filter_map(|r| {
            let key = r.fit.key.clone();
            match (r.fit.status, r.pse) {
                (FitStatus::NonIdentifiable(reason), _) => Some(Diagnostic::NonIdentifiableGroup { key, reason }),
                (FitStatus::Converged, Pse::Undefined(UndefinedPse::FlatSlope)) => {
                    Some(Diagnostic::UndefinedPse { key })
                }
                (FitStatus::Converged, _) => None,
                (status, _) => Some(Diagnostic::FitConvergence { key, status }),
            }
        })
        .inspect(|d| log::warn!("{d}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate_individual, group_cells};
    use crate::domain::{Label, Level, NonIdentifiableReason, TrialRecord};

    fn trials(id: &str, cond: &str, x: f64, ones: usize, zeros: usize) -> Vec<TrialRecord> {
        let t = |y| TrialRecord {
            id: Label::new(id),
            condition: Label::new(cond),
            x: Level::new(x).unwrap(),
            y,
        };
        std::iter::repeat_with(|| t(true))
            .take(ones)
            .chain(std::iter::repeat_with(|| t(false)).take(zeros))
            .collect()
    }

    #[test]
    fn every_group_gets_a_result_in_order() {
        let mut data = Vec::new();
        // p1/A: fine
        data.extend(trials("p1", "A", 1.0, 8, 2));
        data.extend(trials("p1", "A", 2.0, 5, 5));
        data.extend(trials("p1", "A", 3.0, 2, 8));
        // p1/B: single level
        data.extend(trials("p1", "B", 1.0, 3, 3));
        // p2/A: separated
        data.extend(trials("p2", "A", 1.0, 0, 10));
        data.extend(trials("p2", "A", 2.0, 10, 0));
        // p2/B: flat
        data.extend(trials("p2", "B", 1.0, 5, 5));
        data.extend(trials("p2", "B", 2.0, 5, 5));

        let groups = group_cells(&aggregate_individual(&data));
        let results = fit_groups(&groups, &FitOptions::default());
        assert_eq!(results.len(), 4);
        for (g, r) in groups.iter().zip(&results) {
            assert_eq!(r.fit.key, g.key);
            assert_eq!(r.fit.n_trials, g.n_trials());
        }

        let keys: Vec<String> = results.iter().map(|r| r.fit.key.to_string()).collect();
        assert_eq!(keys, vec!["p1/A", "p1/B", "p2/A", "p2/B"]);

        assert!(matches!(results[0].pse, Pse::Defined(_)));

        let diags = fit_diagnostics(&results);
        assert_eq!(diags.len(), 3);
        assert!(matches!(
            diags[0],
            Diagnostic::NonIdentifiableGroup {
                reason: NonIdentifiableReason::TooFewLevels,
                ..
            }
        ));
        assert!(matches!(
            diags[1],
            Diagnostic::FitConvergence {
                status: FitStatus::Diverged,
                ..
            }
        ));
        assert!(matches!(diags[2], Diagnostic::UndefinedPse { .. }));
    }
}
