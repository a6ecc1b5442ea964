//! Least-squares regression helpers
//!
//! `LinearFit` fits a straight line against the observation index, which is
//! what trend fallbacks and the Dickey-Fuller style checks need. The general
//! `least_squares` solver handles small dense systems (lagged regressors in
//! ARIMA estimation) through the normal equations.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Ordinary least-squares line `y = intercept + slope * x` with `x = 0..n`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit a line through `values` indexed by position.
    ///
    /// A single observation yields a flat line through it.
    pub fn fit(values: &[f64]) -> Result<Self> {
        match values.len() {
            0 => Err(MathError::InsufficientData(
                "Linear fit needs at least one observation".to_string(),
            )),
            1 => Ok(Self {
                slope: 0.0,
                intercept: values[0],
            }),
            n => {
                let n_f = n as f64;
                let x_mean = (n_f - 1.0) / 2.0;
                let y_mean = values.iter().sum::<f64>() / n_f;

                let mut sxy = 0.0;
                let mut sxx = 0.0;
                for (i, &y) in values.iter().enumerate() {
                    let dx = i as f64 - x_mean;
                    sxy += dx * (y - y_mean);
                    sxx += dx * dx;
                }

                let slope = sxy / sxx;
                Ok(Self {
                    slope,
                    intercept: y_mean - slope * x_mean,
                })
            }
        }
    }

    /// Value of the fitted line at position `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Solve `min ||X b - y||²` for `b` using the normal equations.
///
/// `rows` holds one regressor vector per observation, all of equal width.
/// Returns `SingularMatrix` when the regressors are (numerically) collinear.
pub fn least_squares(rows: &[Vec<f64>], targets: &[f64]) -> Result<Vec<f64>> {
    solve_normal_equations(rows, targets, 0.0)
}

/// Least squares with a ridge term: `penalty` times the largest diagonal
/// entry of `X'X` is added to every diagonal entry.
///
/// Collinear regressors (lags of an exactly periodic series, an innovation
/// column that is all but zero) then get a unique minimum-norm style
/// solution instead of `SingularMatrix`.
pub fn ridge_least_squares(rows: &[Vec<f64>], targets: &[f64], penalty: f64) -> Result<Vec<f64>> {
    if !penalty.is_finite() || penalty < 0.0 {
        return Err(MathError::InvalidInput(format!(
            "Ridge penalty must be non-negative, got {}",
            penalty
        )));
    }
    solve_normal_equations(rows, targets, penalty)
}

fn solve_normal_equations(rows: &[Vec<f64>], targets: &[f64], penalty: f64) -> Result<Vec<f64>> {
    if rows.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Row count ({}) doesn't match target count ({})",
            rows.len(),
            targets.len()
        )));
    }
    let width = match rows.first() {
        Some(row) => row.len(),
        None => {
            return Err(MathError::InsufficientData(
                "Least squares needs at least one observation".to_string(),
            ))
        }
    };
    if width == 0 {
        return Ok(Vec::new());
    }
    if rows.len() < width {
        return Err(MathError::InsufficientData(format!(
            "{} observations for {} regressors",
            rows.len(),
            width
        )));
    }
    if rows.iter().any(|row| row.len() != width) {
        return Err(MathError::InvalidInput(
            "Regressor rows have different widths".to_string(),
        ));
    }

    // Augmented normal equations [X'X | X'y]
    let mut system = vec![vec![0.0; width + 1]; width];
    for (row, &y) in rows.iter().zip(targets) {
        for i in 0..width {
            for j in 0..width {
                system[i][j] += row[i] * row[j];
            }
            system[i][width] += row[i] * y;
        }
    }

    let scale = (0..width)
        .map(|i| system[i][i].abs())
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE);
    for (i, row) in system.iter_mut().enumerate() {
        row[i] += penalty * scale;
    }

    for col in 0..width {
        let pivot = (col..width)
            .max_by(|&a, &b| system[a][col].abs().total_cmp(&system[b][col].abs()))
            .unwrap_or(col);
        if system[pivot][col].abs() <= scale * 1e-12 {
            return Err(MathError::SingularMatrix(format!(
                "Pivot {} vanishes in a {}x{} system",
                col, width, width
            )));
        }
        system.swap(col, pivot);

        for row in (col + 1)..width {
            let factor = system[row][col] / system[col][col];
            if factor != 0.0 {
                for k in col..=width {
                    system[row][k] -= factor * system[col][k];
                }
            }
        }
    }

    let mut solution = vec![0.0; width];
    for i in (0..width).rev() {
        let tail: f64 = ((i + 1)..width).map(|j| system[i][j] * solution[j]).sum();
        solution[i] = (system[i][width] - tail) / system[i][i];
    }

    if solution.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Least squares produced a non-finite coefficient".to_string(),
        ));
    }
    Ok(solution)
}
