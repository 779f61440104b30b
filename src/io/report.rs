//! JSON run report.
//!
//! The report is the portable representation of a run, aimed at plotting
//! collaborators:
//! - both result tables (`null` where the CSV export writes `NA`)
//! - the run summary and diagnostics
//! - fitted curves sampled on a shared x grid over `[x_min, x_max]`
//!
//! The x bounds only shape the grid. They never influence a fit.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::domain::{FitOptions, Label, PseResult, ResultRow};
use crate::error::PseError;
use crate::math::lin_space;
use crate::report::RunSummary;

/// A fitted curve evaluated on the report grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveGrid {
    pub id: Option<Label>,
    pub condition: Label,
    /// `P(y=1)` at each grid point.
    pub p: Vec<f64>,
}

/// Top-level JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub tool: String,
    pub generated_at: String,
    pub input: String,
    pub options: FitOptions,
    pub summary: RunSummary,
    pub individual: Vec<ResultRow>,
    pub group: Vec<ResultRow>,
    /// Shared x grid for every curve.
    pub x: Vec<f64>,
    pub individual_curves: Vec<CurveGrid>,
    pub group_curves: Vec<CurveGrid>,
}

/// Inputs borrowed from a finished run.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub input: &'a Path,
    pub options: FitOptions,
    pub summary: &'a RunSummary,
    pub individual: &'a [PseResult],
    pub group: &'a [PseResult],
    pub individual_rows: &'a [ResultRow],
    pub group_rows: &'a [ResultRow],
}

/// Assemble the report; curves are only emitted for converged fits.
pub fn build_report(inputs: ReportInputs<'_>, x_min: f64, x_max: f64, grid_points: usize) -> Result<JsonReport, PseError> {
    let (x_min, x_max) = widen_degenerate(x_min, x_max);
    let x = lin_space(x_min, x_max, grid_points)?;

    Ok(JsonReport {
        tool: "pse".to_string(),
        generated_at: chrono::Local::now().to_rfc3339(),
        input: inputs.input.display().to_string(),
        options: inputs.options,
        summary: inputs.summary.clone(),
        individual: inputs.individual_rows.to_vec(),
        group: inputs.group_rows.to_vec(),
        individual_curves: curves(inputs.individual, &x),
        group_curves: curves(inputs.group, &x),
        x,
    })
}

/// Write a report as pretty-printed JSON.
pub fn write_report_json(path: &Path, report: &JsonReport) -> Result<(), PseError> {
    let file = File::create(path).map_err(|e| PseError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    log::info!("wrote '{}'", path.display());
    Ok(())
}

fn curves(results: &[PseResult], x: &[f64]) -> Vec<CurveGrid> {
    let mut sorted: Vec<&PseResult> = results.iter().filter(|r| r.fit.status.is_converged()).collect();
    sorted.sort_by(|a, b| a.fit.key.cmp(&b.fit.key));
    sorted
        .into_iter()
        .map(|r| CurveGrid {
            id: r.fit.key.id.clone(),
            condition: r.fit.key.condition.clone(),
            p: x.iter().map(|&xi| r.fit.predict(xi)).collect(),
        })
        .collect()
}

// A single observed level still deserves a plottable window.
fn widen_degenerate(x_min: f64, x_max: f64) -> (f64, f64) {
    if x_min.is_finite() && x_max.is_finite() && x_min == x_max {
        (x_min - 0.5, x_max + 0.5)
    } else {
        (x_min, x_max)
    }
}
