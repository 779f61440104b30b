//! Synthetic trial generation from known psychometric curves.
//!
//! Each condition has a true `(a, b)`; each simulated participant gets its own
//! PSE shift drawn from `Normal(0, pse_jitter)`, so individual curves scatter
//! around the condition curve while keeping its slope.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Label, Level, TrialRecord};
use crate::error::PseError;
use crate::math::sigmoid;

/// True curve of one simulated condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSpec {
    pub name: String,
    pub intercept: f64,
    pub slope: f64,
}

impl ConditionSpec {
    /// PSE of the true curve (`-a / b`).
    pub fn pse(&self) -> f64 {
        -self.intercept / self.slope
    }
}

/// Full description of a simulated experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSpec {
    pub participants: usize,
    pub conditions: Vec<ConditionSpec>,
    pub levels: Vec<f64>,
    /// Trials per (participant, condition, level).
    pub trials: usize,
    /// SD of the per-participant PSE shift; 0 gives identical participants.
    pub pse_jitter: f64,
    pub seed: u64,
}

impl Default for SimulationSpec {
    fn default() -> Self {
        Self {
            participants: 2,
            conditions: vec![
                ConditionSpec {
                    name: "A".to_string(),
                    intercept: 4.0,
                    slope: -2.0,
                },
                ConditionSpec {
                    name: "B".to_string(),
                    intercept: -4.0,
                    slope: 2.0,
                },
            ],
            levels: vec![1.0, 2.0, 3.0],
            trials: 10,
            pse_jitter: 0.0,
            seed: 42,
        }
    }
}

impl SimulationSpec {
    fn validate(&self) -> Result<(), PseError> {
        if self.participants == 0 {
            return Err(PseError::Config("Participant count must be > 0.".to_string()));
        }
        if self.trials == 0 {
            return Err(PseError::Config("Trials per level must be > 0.".to_string()));
        }
        if self.conditions.is_empty() {
            return Err(PseError::Config("At least one condition is required.".to_string()));
        }
        for c in &self.conditions {
            if c.name.trim().is_empty() {
                return Err(PseError::Config("Condition names must be non-empty.".to_string()));
            }
            if !(c.intercept.is_finite() && c.slope.is_finite()) {
                return Err(PseError::Config(format!(
                    "Condition `{}` has non-finite coefficients.",
                    c.name
                )));
            }
        }
        if self.levels.is_empty() || self.levels.iter().any(|x| !x.is_finite()) {
            return Err(PseError::Config("Levels must be a non-empty list of finite numbers.".to_string()));
        }
        if !(self.pse_jitter.is_finite() && self.pse_jitter >= 0.0) {
            return Err(PseError::Config("PSE jitter must be finite and >= 0.".to_string()));
        }
        Ok(())
    }
}

/// Participant label for the `i`-th (0-based) simulated participant.
pub fn participant_label(i: usize) -> Label {
    Label::new(format!("P{}", i + 1))
}

/// Draw every trial of the experiment. Same spec, same trials.
pub fn generate_trials(spec: &SimulationSpec) -> Result<Vec<TrialRecord>, PseError> {
    spec.validate()?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let jitter = Normal::new(0.0, spec.pse_jitter)
        .map_err(|e| PseError::Config(format!("PSE jitter distribution error: {e}")))?;

    let levels: Vec<Level> = spec.levels.iter().filter_map(|&x| Level::new(x)).collect();
    let mut out = Vec::with_capacity(spec.participants * spec.conditions.len() * levels.len() * spec.trials);

    for p in 0..spec.participants {
        let id = participant_label(p);
        for c in &spec.conditions {
            // Shifting the PSE by `d` at fixed slope means a' = a - b d.
            let shift = if spec.pse_jitter > 0.0 { jitter.sample(&mut rng) } else { 0.0 };
            let intercept = c.intercept - c.slope * shift;
            let condition = Label::new(c.name.trim());
            log::debug!("{id}/{condition}: true PSE {:.4}, shift {shift:.4}", c.pse() + shift);

            for &x in &levels {
                let p_one = sigmoid(intercept + c.slope * x.value());
                for _ in 0..spec.trials {
                    out.push(TrialRecord {
                        id: id.clone(),
                        condition: condition.clone(),
                        x,
                        y: rng.gen_bool(p_one),
                    });
                }
            }
        }
    }

    log::info!(
        "simulated {} trials ({} participants x {} conditions x {} levels)",
        out.len(),
        spec.participants,
        spec.conditions.len(),
        levels.len()
    );

    Ok(out)
}
