//! Evaluation grids for fitted psychometric curves.

use crate::error::PseError;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, PseError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(PseError::Config(format!(
            "Invalid x range: min={min}, max={max} (must be finite and max>min)."
        )));
    }
    if steps < 2 {
        return Err(PseError::Config("Grid points must be >= 2.".to_string()));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    // Pin the last point so rounding never leaves it short of `max`.
    if let Some(last) = out.last_mut() {
        *last = max;
    }
    Ok(out)
}
