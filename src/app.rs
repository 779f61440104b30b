//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the fit pipeline (or the simulator)
//! - prints the summary and result tables
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, FitArgs, SimulateArgs};
use crate::data::{SimulationSpec, generate_trials};
use crate::domain::{FitConfig, FitOptions};
use crate::error::{AppError, PseError};

pub mod pipeline;

/// Entry point for the `pse` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_run_summary(&run.summary, &config));
    if !config.quiet {
        println!("{}", crate::report::format_result_table("Individual fits", &run.individual_rows));
        println!("{}", crate::report::format_result_table("Group fits", &run.group_rows));
    }

    pipeline::write_exports(&run, &config)?;
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let spec = simulation_spec_from_args(&args);
    let trials = generate_trials(&spec)?;
    crate::io::write_trials_csv(&args.output, &trials)?;
    println!("Wrote {} trials to {}", trials.len(), args.output.display());
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, PseError> {
    if let (Some(lo), Some(hi)) = (args.x_min, args.x_max) {
        if !(lo < hi) {
            return Err(PseError::Config(format!("--x-min ({lo}) must be < --x-max ({hi}).")));
        }
    }

    Ok(FitConfig {
        input: args.input.clone(),
        condition_columns: args
            .condition_columns
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        x_min: args.x_min,
        x_max: args.x_max,
        grid_points: args.grid_points,
        fit: FitOptions {
            max_iterations: args.max_iterations,
            tolerance: args.tolerance,
            slope_floor: args.slope_floor,
        },
        export_individual: args.export_individual.clone(),
        export_group: args.export_group.clone(),
        export_cells: args.export_cells.clone(),
        export_json: args.export_json.clone(),
        quiet: args.quiet,
    })
}

pub fn simulation_spec_from_args(args: &SimulateArgs) -> SimulationSpec {
    let defaults = SimulationSpec::default();
    SimulationSpec {
        participants: args.participants,
        conditions: if args.conditions.is_empty() {
            defaults.conditions
        } else {
            args.conditions.clone()
        },
        levels: args.levels.clone(),
        trials: args.trials,
        pse_jitter: args.pse_jitter,
        seed: args.seed,
    }
}
