//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! raw table -> validated trials -> count tables -> fits + PSE -> result tables
//!
//! The CLI then only has to deal with presentation and exports.

use crate::aggregate::{CellGroup, aggregate_group, aggregate_individual, group_cells};
use crate::data::{RawTable, TrialDataset};
use crate::domain::{FitConfig, FitOptions, GroupCell, PseResult, ResultRow};
use crate::error::PseError;
use crate::fit::{fit_diagnostics, fit_groups};
use crate::io::{JsonReport, ReportInputs, build_report, load_table};
use crate::report::{RunSummary, build_result_table};

/// All computed outputs of a single `pse fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: TrialDataset,
    pub individual_cells: Vec<GroupCell>,
    pub group_cells: Vec<GroupCell>,
    pub individual: Vec<PseResult>,
    pub group: Vec<PseResult>,
    pub individual_rows: Vec<ResultRow>,
    pub group_rows: Vec<ResultRow>,
    pub summary: RunSummary,
}

impl RunOutput {
    /// Assemble the JSON report; the grid defaults to the observed x range.
    pub fn report(&self, config: &FitConfig) -> Result<JsonReport, PseError> {
        let (lo, hi) = self.dataset.x_range();
        build_report(
            ReportInputs {
                input: &config.input,
                options: config.fit,
                summary: &self.summary,
                individual: &self.individual,
                group: &self.group,
                individual_rows: &self.individual_rows,
                group_rows: &self.group_rows,
            },
            config.x_min.unwrap_or(lo),
            config.x_max.unwrap_or(hi),
            config.grid_points,
        )
    }
}

/// Execute the full pipeline on the configured input file.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, PseError> {
    let table = load_table(&config.input)?;
    run_on_table(&table, &config.condition_columns, &config.fit)
}

/// Execute the pipeline on an in-memory table.
pub fn run_on_table(
    table: &RawTable,
    condition_columns: &[String],
    options: &FitOptions,
) -> Result<RunOutput, PseError> {
    // 1) Validate rows.
    let dataset = TrialDataset::from_table(table, condition_columns)?;
    log::info!(
        "{} of {} rows valid ({} excluded)",
        dataset.records().len(),
        dataset.rows_read(),
        dataset.rejected().len()
    );

    run_on_dataset(dataset, options)
}

/// Execute the pipeline on already-validated trials.
pub fn run_on_dataset(dataset: TrialDataset, options: &FitOptions) -> Result<RunOutput, PseError> {
    if !(options.tolerance.is_finite() && options.tolerance > 0.0) {
        return Err(PseError::Config("Tolerance must be finite and > 0.".to_string()));
    }
    if !(options.slope_floor.is_finite() && options.slope_floor >= 0.0) {
        return Err(PseError::Config("Slope floor must be finite and >= 0.".to_string()));
    }
    if options.max_iterations == 0 {
        return Err(PseError::Config("Max iterations must be > 0.".to_string()));
    }

    // 2) Count tables.
    let individual_cells = aggregate_individual(dataset.records());
    let pooled_cells = aggregate_group(dataset.records());
    let individual_groups: Vec<CellGroup> = group_cells(&individual_cells);
    let condition_groups: Vec<CellGroup> = group_cells(&pooled_cells);
    log::info!(
        "aggregated {} individual units ({} cells), {} conditions ({} cells)",
        individual_groups.len(),
        individual_cells.len(),
        condition_groups.len(),
        pooled_cells.len()
    );

    // 3) Fit every unit and derive PSEs.
    let individual = fit_groups(&individual_groups, options);
    let group = fit_groups(&condition_groups, options);

    // 4) Tables + summary.
    let individual_rows = build_result_table(&individual);
    let group_rows = build_result_table(&group);
    let mut diagnostics = fit_diagnostics(&individual);
    diagnostics.extend(fit_diagnostics(&group));
    let summary = RunSummary::new(&dataset, &individual, &group, diagnostics);

    Ok(RunOutput {
        dataset,
        individual_cells,
        group_cells: pooled_cells,
        individual,
        group,
        individual_rows,
        group_rows,
        summary,
    })
}

/// Write every export the config asks for.
pub fn write_exports(run: &RunOutput, config: &FitConfig) -> Result<(), PseError> {
    if let Some(path) = &config.export_individual {
        crate::io::write_individual_csv(path, &run.individual_rows)?;
    }
    if let Some(path) = &config.export_group {
        crate::io::write_group_csv(path, &run.group_rows)?;
    }
    if let Some(path) = &config.export_cells {
        crate::io::write_cells_csv(path, &run.individual_cells, &run.group_cells)?;
    }
    if let Some(path) = &config.export_json {
        let report = run.report(config)?;
        crate::io::write_report_json(path, &report)?;
    }
    Ok(())
}
