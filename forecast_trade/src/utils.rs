//! Utility functions for the forecast_trade crate

use crate::error::{ForecastError, Result};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Sample standard deviation (n - 1), 0 with fewer than two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

/// Population standard deviation (n), 0 for an empty slice
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// Percentile with linear interpolation between closest ranks.
///
/// `sorted` must be in ascending order; `pct` is in `[0, 100]`.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (pct.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let fraction = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Two-sided standard normal quantile for a central interval `level`
pub fn normal_quantile(level: f64) -> Result<f64> {
    if level <= 0.0 || level >= 1.0 {
        return Err(ForecastError::InvalidParameter(
            "Interval level must be between 0 and 1".to_string(),
        ));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::ForecastingError(format!("Normal distribution: {}", e)))?;
    Ok(normal.inverse_cdf(0.5 + level / 2.0))
}

/// Confidence from interval width relative to the level of the series:
/// `1 - mean(half width) / mean(reference)`, clamped to `[floor, ceiling]`
pub fn interval_confidence(
    intervals: &[(f64, f64)],
    reference: &[f64],
    floor: f64,
    ceiling: f64,
) -> f64 {
    let level = mean(reference).abs();
    if intervals.is_empty() || level == 0.0 {
        return floor;
    }
    let half_width =
        intervals.iter().map(|(lo, hi)| (hi - lo) / 2.0).sum::<f64>() / intervals.len() as f64;
    let confidence = 1.0 - half_width / level;
    if confidence.is_finite() {
        confidence.clamp(floor, ceiling)
    } else {
        floor
    }
}

/// Differencing of order one
pub fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    // Mean Absolute Percentage Error, skipping zero actuals
    let mape = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
    })
}

/// Error measures of fitted values against targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&sorted, 50.0), 3.0);
        assert_relative_eq!(percentile(&sorted, 25.0), 2.0);
        assert_relative_eq!(percentile(&sorted, 2.5), 1.1);
        assert_relative_eq!(percentile(&sorted, 100.0), 5.0);
    }

    #[test]
    fn test_standard_deviations() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_std(&values), 2.0, epsilon = 1e-12);
        assert_relative_eq!(sample_std(&values), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_normal_quantile() {
        assert_relative_eq!(normal_quantile(0.95).unwrap(), 1.959964, epsilon = 1e-5);
        assert!(normal_quantile(1.0).is_err());
    }

    #[test]
    fn test_interval_confidence_clamps() {
        let reference = [100.0; 10];
        let tight = vec![(99.0, 101.0); 5];
        let wide = vec![(0.0, 200.0); 5];
        assert_relative_eq!(interval_confidence(&tight, &reference, 0.4, 0.9), 0.9);
        assert_relative_eq!(interval_confidence(&wide, &reference, 0.4, 0.9), 0.4);
    }

    #[test]
    fn test_forecast_accuracy() {
        let accuracy = forecast_accuracy(&[1.0, 2.0], &[2.0, 2.0]).unwrap();
        assert_relative_eq!(accuracy.mae, 0.5);
        assert_relative_eq!(accuracy.mse, 0.5);
        assert!(forecast_accuracy(&[], &[]).is_err());
    }
}
