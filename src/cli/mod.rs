//! Command-line parsing for the psychometric PSE fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline and the math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::data::ConditionSpec;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pse", version, about = "Per-participant and group psychometric fits with PSE estimates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit logistic curves per (ID, Condition) and per Condition, print PSEs, optionally export.
    Fit(FitArgs),
    /// Write a synthetic trial CSV from known per-condition curves.
    Simulate(SimulateArgs),
}

/// Options for `pse fit`.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Trial CSV with columns ID, Condition, X, Y (one row per trial).
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Factor columns combined (with `_`) into the condition label, e.g. `Hand,Speed`.
    #[arg(long, value_delimiter = ',', value_name = "COLS")]
    pub condition_columns: Vec<String>,

    /// Lower x bound of the curve grid in the JSON report (default: observed minimum).
    #[arg(long, allow_negative_numbers = true)]
    pub x_min: Option<f64>,

    /// Upper x bound of the curve grid in the JSON report (default: observed maximum).
    #[arg(long, allow_negative_numbers = true)]
    pub x_max: Option<f64>,

    /// Number of curve grid points in the JSON report.
    #[arg(long, default_value_t = 101)]
    pub grid_points: usize,

    /// Export the per-(ID, Condition) table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_individual: Option<PathBuf>,

    /// Export the per-Condition table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_group: Option<PathBuf>,

    /// Export the aggregated count tables to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_cells: Option<PathBuf>,

    /// Export tables, summary and fitted curve grids to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Newton/IRLS iteration cap per group.
    #[arg(long, default_value_t = 25)]
    pub max_iterations: usize,

    /// Relative deviance-change convergence tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub tolerance: f64,

    /// |slope| at or below this value leaves the PSE undefined.
    #[arg(long, default_value_t = 1e-12)]
    pub slope_floor: f64,

    /// Only print the summary (no result tables).
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

/// Options for `pse simulate`.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output trial CSV.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    /// Number of simulated participants.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub participants: usize,

    /// Condition as `NAME:a:b` (repeatable). Default: `A:4:-2` and `B:-4:2`.
    #[arg(long = "condition", value_parser = parse_condition, value_name = "NAME:a:b")]
    pub conditions: Vec<ConditionSpec>,

    /// Stimulus levels.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_value = "1,2,3")]
    pub levels: Vec<f64>,

    /// Trials per participant, condition and level.
    #[arg(long, default_value_t = 10)]
    pub trials: usize,

    /// SD of the per-participant PSE shift.
    #[arg(long, default_value_t = 0.0)]
    pub pse_jitter: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Parse `NAME:a:b`. The name may itself contain `:`; the last two fields are numbers.
pub fn parse_condition(s: &str) -> Result<ConditionSpec, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(b), Some(a), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected NAME:a:b, got `{s}`"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty condition name in `{s}`"));
    }
    let intercept: f64 = a
        .trim()
        .parse()
        .map_err(|_| format!("invalid intercept `{a}` in `{s}`"))?;
    let slope: f64 = b
        .trim()
        .parse()
        .map_err(|_| format!("invalid slope `{b}` in `{s}`"))?;
    Ok(ConditionSpec {
        name: name.to_string(),
        intercept,
        slope,
    })
}
