//! Reporting utilities: result tables and the run summary.

pub mod format;

pub use format::*;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::dataset::TrialDataset;
use crate::domain::{Diagnostic, FitStatus, Pse, PseResult, RejectReason, ResultRow, RowStatus, UndefinedPse};

/// Counts surfaced to the user next to the result tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_excluded: usize,
    pub exclusions: BTreeMap<RejectReason, usize>,
    pub individual: LevelSummary,
    pub group: LevelSummary,
    pub diagnostics: Vec<Diagnostic>,
}

/// Fit outcome counts for one result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LevelSummary {
    pub groups: usize,
    pub fitted: usize,
    pub failed: usize,
    pub undefined_pse: usize,
}

impl LevelSummary {
    pub fn from_results(results: &[PseResult]) -> Self {
        let mut s = LevelSummary {
            groups: results.len(),
            ..Default::default()
        };
        for r in results {
            if r.fit.status == FitStatus::Converged {
                s.fitted += 1;
            } else {
                s.failed += 1;
            }
            if r.pse == Pse::Undefined(UndefinedPse::FlatSlope) {
                s.undefined_pse += 1;
            }
        }
        s
    }
}

impl RunSummary {
    pub fn new(
        dataset: &TrialDataset,
        individual: &[PseResult],
        group: &[PseResult],
        fit_diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let mut diagnostics: Vec<Diagnostic> = dataset
            .rejected()
            .iter()
            .map(|r| Diagnostic::InvalidRecord {
                line: r.line,
                reason: r.reason,
            })
            .collect();
        diagnostics.extend(fit_diagnostics);

        Self {
            rows_read: dataset.rows_read(),
            rows_used: dataset.records().len(),
            rows_excluded: dataset.rejected().len(),
            exclusions: dataset.rejection_counts(),
            individual: LevelSummary::from_results(individual),
            group: LevelSummary::from_results(group),
            diagnostics,
        }
    }
}

/// Flatten fits into exported rows, ordered by id then condition.
///
/// Values that are undefined (failed fits, flat slopes) become `None`.
pub fn build_result_table(results: &[PseResult]) -> Vec<ResultRow> {
    let mut sorted: Vec<&PseResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.fit.key.cmp(&b.fit.key));

    sorted
        .into_iter()
        .map(|r| {
            let fit = &r.fit;
            let ok = fit.status.is_converged();
            ResultRow {
                id: fit.key.id.clone(),
                condition: fit.key.condition.clone(),
                a: finite(ok, fit.intercept),
                b: finite(ok, fit.slope),
                pse: r.pse.value(),
                p_value: finite(ok, fit.slope_p_value),
                status: RowStatus::of(r),
            }
        })
        .collect()
}

fn finite(ok: bool, v: f64) -> Option<f64> {
    (ok && v.is_finite()).then_some(v)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitResult, GroupKey, Label, NonIdentifiableReason};
    use crate::fit::compute_pse;

    fn converged(id: Option<&str>, cond: &str, a: f64, b: f64) -> PseResult {
        let key = GroupKey {
            id: id.map(Label::new),
            condition: Label::new(cond),
        };
        let mut fit = FitResult::failed(key, FitStatus::Converged, 30, 3, 5);
        fit.intercept = a;
        fit.slope = b;
        fit.slope_p_value = 0.01;
        compute_pse(fit, 1e-12)
    }

    #[test]
    fn rows_are_sorted_and_flagged() {
        let failed = compute_pse(
            FitResult::failed(
                GroupKey::individual("p1".into(), "A".into()),
                FitStatus::NonIdentifiable(NonIdentifiableReason::TooFewLevels),
                10,
                1,
                0,
            ),
            1e-12,
        );
        let results = vec![
            converged(Some("p10"), "A", 1.0, -0.5),
            converged(Some("p2"), "B", 0.0, 0.0),
            failed,
            converged(Some("p2"), "A", 2.0, -1.0),
        ];

        let rows = build_result_table(&results);
        let keys: Vec<(String, &str)> = rows
            .iter()
            .map(|r| (r.id.as_ref().unwrap().to_string(), r.condition.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("p1".to_string(), "A"),
                ("p2".to_string(), "A"),
                ("p2".to_string(), "B"),
                ("p10".to_string(), "A"),
            ]
        );

        assert_eq!(rows[0].a, None);
        assert_eq!(rows[0].pse, None);
        assert_eq!(rows[0].status, RowStatus::TooFewLevels);

        assert_eq!(rows[1].pse, Some(2.0));
        assert_eq!(rows[1].status, RowStatus::Ok);

        assert_eq!(rows[2].b, Some(0.0));
        assert_eq!(rows[2].pse, None);
        assert_eq!(rows[2].status, RowStatus::FlatSlope);
    }

    #[test]
    fn status_labels_match_serialized_form() {
        let all = [
            RowStatus::Ok,
            RowStatus::TooFewLevels,
            RowStatus::NoResponseVariance,
            RowStatus::NotConverged,
            RowStatus::Diverged,
            RowStatus::Singular,
            RowStatus::FlatSlope,
        ];
        for status in all {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.label());
        }
        assert_eq!(RowStatus::from(FitStatus::Converged), RowStatus::Ok);
        assert_eq!(format!("[{:<6}]", RowStatus::Ok), "[ok    ]");
    }

    #[test]
    fn level_summary_counts_outcomes() {
        let results = vec![
            converged(None, "A", 1.0, 1.0),
            converged(None, "B", 1.0, 0.0),
            compute_pse(
                FitResult::failed(GroupKey::group("C".into()), FitStatus::Diverged, 20, 2, 0),
                1e-12,
            ),
        ];
        let s = LevelSummary::from_results(&results);
        assert_eq!(
            s,
            LevelSummary {
                groups: 3,
                fitted: 2,
                failed: 1,
                undefined_pse: 1
            }
        );
    }
}
