//! Row validation: raw table → `TrialDataset`.
//!
//! Design goals:
//! - **Strict schema** for required columns (fatal `InvalidInput`)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (records keep input order)

use std::collections::BTreeMap;

use crate::data::table::{RawRow, RawTable};
use crate::domain::{Label, Level, RejectReason, RejectedRow, TrialRecord};
use crate::error::PseError;

/// Default name of the condition column.
pub const DEFAULT_CONDITION_COLUMN: &str = "Condition";

/// Separator used when several factor columns form one condition label.
pub const CONDITION_SEPARATOR: &str = "_";

/// Tokens treated as missing in the X and Y columns (in addition to blank cells).
const MISSING_TOKENS: [&str; 5] = ["na", "nan", "n/a", "null", "none"];

/// Missing-value tokens for the ID and condition columns. Narrower than
/// `MISSING_TOKENS`: "None" or "Null" are ordinary condition names.
const LABEL_MISSING_TOKENS: [&str; 2] = ["na", "nan"];

/// Validated, immutable trial collection plus the rejection report.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialDataset {
    records: Vec<TrialRecord>,
    rejected: Vec<RejectedRow>,
    rows_read: usize,
}

struct Columns {
    id: usize,
    conditions: Vec<usize>,
    x: usize,
    y: usize,
}

impl TrialDataset {
    /// Validate every row of `table`.
    ///
    /// `condition_columns` lists the factor columns that form the condition
    /// label; an empty slice means the single `Condition` column.
    pub fn from_table(table: &RawTable, condition_columns: &[String]) -> Result<Self, PseError> {
        let columns = resolve_columns(table, condition_columns)?;
        if table.is_empty() {
            return Err(PseError::invalid_input("The input table has no rows."));
        }

        let mut records = Vec::with_capacity(table.rows().len());
        let mut rejected = Vec::new();

        for row in table.rows() {
            match parse_row(table, row, &columns) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    log::warn!("line {}: row excluded ({})", row.line, reason.describe());
                    rejected.push(RejectedRow {
                        line: row.line,
                        reason,
                    });
                }
            }
        }

        if records.is_empty() {
            return Err(PseError::invalid_input(format!(
                "No valid rows remain after validation ({} rows excluded).",
                rejected.len()
            )));
        }

        Ok(Self {
            records,
            rejected,
            rows_read: table.rows().len(),
        })
    }

    /// Build a dataset directly from already-typed records.
    pub fn from_records(records: Vec<TrialRecord>) -> Result<Self, PseError> {
        if records.is_empty() {
            return Err(PseError::invalid_input("The input table has no rows."));
        }
        let rows_read = records.len();
        Ok(Self {
            records,
            rejected: Vec::new(),
            rows_read,
        })
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Number of excluded rows per reason.
    pub fn rejection_counts(&self) -> BTreeMap<RejectReason, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.rejected {
            *counts.entry(r.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Observed `(min, max)` of x over valid records.
    pub fn x_range(&self) -> (f64, f64) {
        self.records.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(r.x.value()), hi.max(r.x.value()))
        })
    }
}

fn resolve_columns(table: &RawTable, condition_columns: &[String]) -> Result<Columns, PseError> {
    let required = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| PseError::invalid_input(format!("Missing required column: `{name}`")))
    };

    let id = required("ID")?;
    let conditions = if condition_columns.is_empty() {
        vec![required(DEFAULT_CONDITION_COLUMN)?]
    } else {
        condition_columns
            .iter()
            .map(|c| required(c.as_str()))
            .collect::<Result<Vec<_>, _>>()?
    };
    let x = required("X")?;
    let y = required("Y")?;

    Ok(Columns { id, conditions, x, y })
}

fn parse_row(table: &RawTable, row: &RawRow, columns: &Columns) -> Result<TrialRecord, RejectReason> {
    let id = label(table.cell(row, columns.id)).ok_or(RejectReason::MissingId)?;

    let mut parts = Vec::with_capacity(columns.conditions.len());
    for &idx in &columns.conditions {
        parts.push(label(table.cell(row, idx)).ok_or(RejectReason::MissingCondition)?);
    }
    let condition = parts.join(CONDITION_SEPARATOR);

    let x = parse_x(table.cell(row, columns.x))?;
    let y = parse_y(table.cell(row, columns.y))?;

    Ok(TrialRecord {
        id: Label::new(id),
        condition: Label::new(condition),
        x,
        y,
    })
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !MISSING_TOKENS.iter().any(|t| v.eq_ignore_ascii_case(t)))
}

fn label(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !LABEL_MISSING_TOKENS.iter().any(|t| v.eq_ignore_ascii_case(t)))
}

fn parse_x(value: Option<&str>) -> Result<Level, RejectReason> {
    let s = present(value).ok_or(RejectReason::MissingX)?;
    let v = s.parse::<f64>().map_err(|_| RejectReason::InvalidX)?;
    Level::new(v).ok_or(RejectReason::NonFiniteX)
}

fn parse_y(value: Option<&str>) -> Result<bool, RejectReason> {
    let s = present(value).ok_or(RejectReason::MissingY)?;
    if s.eq_ignore_ascii_case("true") {
        return Ok(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Ok(false);
    }
    match s.parse::<f64>() {
        Ok(v) if v == 1.0 => Ok(true),
        Ok(v) if v == 0.0 => Ok(false),
        _ => Err(RejectReason::NonBinaryY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[&str; 4]]) -> RawTable {
        let mut t = RawTable::new(["ID", "Condition", "X", "Y"]);
        for r in rows {
            t.push_row(r.iter().copied());
        }
        t
    }

    #[test]
    fn valid_rows_become_records() {
        let t = table(&[["p1", "A", "1.5", "1"], ["p1", "A", "2", "0.0"], ["p2", "B", "-3", "TRUE"]]);
        let ds = TrialDataset::from_table(&t, &[]).unwrap();
        assert_eq!(ds.records().len(), 3);
        assert_eq!(ds.rows_read(), 3);
        assert!(ds.rejected().is_empty());
        assert!(ds.records()[0].y);
        assert!(!ds.records()[1].y);
        assert_eq!(ds.records()[2].x.value(), -3.0);
        assert_eq!(ds.x_range(), (-3.0, 2.0));
    }

    #[test]
    fn invalid_rows_are_excluded_with_reasons() {
        let t = table(&[
            ["p1", "A", "1", "1"],
            ["", "A", "1", "1"],
            ["p1", "NA", "1", "1"],
            ["p1", "A", "abc", "1"],
            ["p1", "A", "inf", "1"],
            ["p1", "A", "1", "2"],
            ["p1", "A", "1", ""],
            ["p1", "A", "NaN", "0"],
        ]);
        let ds = TrialDataset::from_table(&t, &[]).unwrap();
        assert_eq!(ds.records().len(), 1);
        assert_eq!(ds.rows_read(), 8);

        let reasons: Vec<RejectReason> = ds.rejected().iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::MissingId,
                RejectReason::MissingCondition,
                RejectReason::InvalidX,
                RejectReason::NonFiniteX,
                RejectReason::NonBinaryY,
                RejectReason::MissingY,
                RejectReason::MissingX,
            ]
        );
        assert_eq!(ds.rejected()[0].line, 3);
        assert_eq!(ds.rejection_counts().values().sum::<usize>(), 7);
    }

    #[test]
    fn none_and_null_are_valid_labels() {
        let t = table(&[
            ["p1", "None", "1", "1"],
            ["p1", "Cue", "1", "1"],
            ["null", "none", "2", "0"],
            ["p1", "None", "none", "1"],
            ["p1", "nan", "1", "1"],
        ]);
        let ds = TrialDataset::from_table(&t, &[]).unwrap();
        assert_eq!(ds.records().len(), 3);
        assert_eq!(ds.records()[0].condition.as_str(), "None");
        assert_eq!(ds.records()[2].id.as_str(), "null");
        assert_eq!(ds.records()[2].condition.as_str(), "none");

        let reasons: Vec<RejectReason> = ds.rejected().iter().map(|r| r.reason).collect();
        assert_eq!(reasons, vec![RejectReason::MissingX, RejectReason::MissingCondition]);
    }

    #[test]
    fn missing_column_is_fatal() {
        let mut t = RawTable::new(["ID", "Condition", "X"]);
        t.push_row(["p1", "A", "1"]);
        let err = TrialDataset::from_table(&t, &[]).unwrap_err();
        assert!(matches!(err, PseError::InvalidInput(ref m) if m.contains("`Y`")));
    }

    #[test]
    fn empty_table_is_fatal() {
        let t = RawTable::new(["ID", "Condition", "X", "Y"]);
        assert!(matches!(
            TrialDataset::from_table(&t, &[]),
            Err(PseError::InvalidInput(_))
        ));
    }

    #[test]
    fn all_rows_invalid_is_fatal() {
        let t = table(&[["p1", "A", "1", "5"]]);
        assert!(matches!(
            TrialDataset::from_table(&t, &[]),
            Err(PseError::InvalidInput(_))
        ));
    }

    #[test]
    fn factor_columns_are_combined_into_condition() {
        let mut t = RawTable::new(["id", "size", "colour", "x", "y"]);
        t.push_row(["p1", "big", "red", "1", "1"]);
        t.push_row(["p1", "small", "", "1", "1"]);
        let cols = vec!["size".to_string(), "colour".to_string()];
        let ds = TrialDataset::from_table(&t, &cols).unwrap();
        assert_eq!(ds.records().len(), 1);
        assert_eq!(ds.records()[0].condition.as_str(), "big_red");
        assert_eq!(ds.rejected()[0].reason, RejectReason::MissingCondition);
    }
}
