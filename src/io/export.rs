//! Export result tables, count tables and trials to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or R/pandas:
//! undefined numbers are written as `NA`, floats use the shortest exact
//! representation.

use std::fs::File;
use std::path::Path;

use crate::domain::{GroupCell, ResultRow, TrialRecord};
use crate::error::PseError;
use crate::report::MISSING;

const INDIVIDUAL_HEADER: [&str; 7] = ["ID", "Condition", "a", "b", "pse", "p.value", "status"];
const GROUP_HEADER: [&str; 6] = ["Condition", "a", "b", "pse", "p.value", "status"];
const CELLS_HEADER: [&str; 8] = ["level", "ID", "Condition", "X", "ones", "zeros", "n", "prop"];
const TRIALS_HEADER: [&str; 4] = ["ID", "Condition", "X", "Y"];

/// Write the per-(ID, Condition) result table.
pub fn write_individual_csv(path: &Path, rows: &[ResultRow]) -> Result<(), PseError> {
    let mut w = create_writer(path)?;
    w.write_record(INDIVIDUAL_HEADER)?;
    for r in rows {
        let id = r.id.as_ref().map(|id| id.as_str()).unwrap_or_default();
        let mut record = vec![id.to_string()];
        record.extend(result_fields(r));
        w.write_record(&record)?;
    }
    finish(w, path)
}

/// Write the per-Condition result table.
pub fn write_group_csv(path: &Path, rows: &[ResultRow]) -> Result<(), PseError> {
    let mut w = create_writer(path)?;
    w.write_record(GROUP_HEADER)?;
    for r in rows {
        w.write_record(result_fields(r))?;
    }
    finish(w, path)
}

/// Write both count tables into one long file (`level` = individual/group).
pub fn write_cells_csv(path: &Path, individual: &[GroupCell], group: &[GroupCell]) -> Result<(), PseError> {
    let mut w = create_writer(path)?;
    w.write_record(CELLS_HEADER)?;
    for (level, cells) in [("individual", individual), ("group", group)] {
        for c in cells {
            let id = c.key.id.as_ref().map(|id| id.as_str()).unwrap_or_default();
            w.write_record([
                level.to_string(),
                id.to_string(),
                c.key.condition.to_string(),
                c.x.value().to_string(),
                c.ones.to_string(),
                c.zeros.to_string(),
                c.n().to_string(),
                c.prop().to_string(),
            ])?;
        }
    }
    finish(w, path)
}

/// Write one row per trial, in the input layout `fit` reads back.
pub fn write_trials_csv(path: &Path, trials: &[TrialRecord]) -> Result<(), PseError> {
    let mut w = create_writer(path)?;
    w.write_record(TRIALS_HEADER)?;
    for t in trials {
        w.write_record([
            t.id.to_string(),
            t.condition.to_string(),
            t.x.value().to_string(),
            if t.y { "1" } else { "0" }.to_string(),
        ])?;
    }
    finish(w, path)
}

fn result_fields(r: &ResultRow) -> Vec<String> {
    vec![
        r.condition.to_string(),
        fmt_opt(r.a),
        fmt_opt(r.b),
        fmt_opt(r.pse),
        fmt_opt(r.p_value),
        r.status.label().to_string(),
    ]
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| MISSING.to_string())
}

fn create_writer(path: &Path) -> Result<csv::Writer<File>, PseError> {
    let file = File::create(path).map_err(|e| PseError::io(path, e))?;
    Ok(csv::Writer::from_writer(file))
}

fn finish(mut w: csv::Writer<File>, path: &Path) -> Result<(), PseError> {
    w.flush().map_err(|e| PseError::io(path, e))?;
    log::info!("wrote '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupKey, Label, Level, RowStatus};

    fn row(id: Option<&str>, defined: bool) -> ResultRow {
        ResultRow {
            id: id.map(Label::new),
            condition: Label::new("A"),
            a: defined.then_some(4.0),
            b: defined.then_some(-2.0),
            pse: defined.then_some(2.0),
            p_value: defined.then_some(0.25),
            status: if defined { RowStatus::Ok } else { RowStatus::Diverged },
        }
    }

    #[test]
    fn individual_csv_writes_na_for_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("individual.csv");
        write_individual_csv(&path, &[row(Some("P1"), true), row(Some("P2"), false)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID,Condition,a,b,pse,p.value,status");
        assert_eq!(lines[1], "P1,A,4,-2,2,0.25,ok");
        assert_eq!(lines[2], "P2,A,NA,NA,NA,NA,diverged");
    }

    #[test]
    fn group_csv_has_no_id_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.csv");
        write_group_csv(&path, &[row(None, true)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Condition,a,b,pse,p.value,status\nA,4,-2,2,0.25,ok\n");
    }

    #[test]
    fn cells_csv_lists_both_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.csv");
        let x = Level::new(1.5).unwrap();
        let individual = vec![GroupCell {
            key: GroupKey::individual(Label::new("P1"), Label::new("A")),
            x,
            ones: 1,
            zeros: 3,
        }];
        let group = vec![GroupCell {
            key: GroupKey::group(Label::new("A")),
            x,
            ones: 1,
            zeros: 3,
        }];
        write_cells_csv(&path, &individual, &group).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "level,ID,Condition,X,ones,zeros,n,prop");
        assert_eq!(lines[1], "individual,P1,A,1.5,1,3,4,0.25");
        assert_eq!(lines[2], "group,,A,1.5,1,3,4,0.25");
    }

    #[test]
    fn trials_csv_reads_back_through_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.csv");
        let trials = vec![
            TrialRecord {
                id: Label::new("P1"),
                condition: Label::new("A"),
                x: Level::new(0.1).unwrap(),
                y: true,
            },
            TrialRecord {
                id: Label::new("P1"),
                condition: Label::new("A"),
                x: Level::new(-2.0).unwrap(),
                y: false,
            },
        ];
        write_trials_csv(&path, &trials).unwrap();

        let table = crate::io::load_table(&path).unwrap();
        let dataset = crate::data::TrialDataset::from_table(&table, &[]).unwrap();
        assert_eq!(dataset.records(), trials.as_slice());
    }
}
