/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// stats module
//
// calculates statistics - least squares lines through sweep samples and the spread of
// replicate measurements
//
////////////////////////////////////////////////////////////////////////////////////

use crate::error::{Result, SimError};
use serde::Serialize;

// Linear fit --------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64, // coefficient of determination
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    // x at which the fitted line reaches y; None for a flat line
    pub fn solve_for(&self, y: f64) -> Option<f64> {
        if self.slope == 0.0 {
            None
        } else {
            Some((y - self.intercept) / self.slope)
        }
    }
}

/// Ordinary least squares line through `points`.
///
/// # Errors
/// `InvalidParameters` when there are fewer than two points, a value is not finite, or
/// every x is the same.
pub fn linear_fit(points: &[(f64, f64)]) -> Result<LinearFit> {
    if points.len() < 2 {
        return Err(SimError::invalid(
            "points",
            format!("a line needs at least two points, got {}", points.len()),
        ));
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(SimError::invalid("points", "every value must be finite"));
    }

    let count = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / count;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / count;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx == 0.0 {
        return Err(SimError::invalid(
            "points",
            "all x values are equal so the slope is undefined",
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    // regression sum of squares over total sum of squares; a flat sample is fitted exactly
    let mut ss_reg = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in points {
        let fitted = slope * x + intercept;
        ss_reg += (fitted - mean_y) * (fitted - mean_y);
        ss_tot += (y - mean_y) * (y - mean_y);
    }
    let r_squared = if ss_tot == 0.0 { 1.0 } else { ss_reg / ss_tot };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

// Spread ------------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Spread {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

pub fn spread(values: &[f64]) -> Option<Spread> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    Some(Spread { mean, max, min })
}
