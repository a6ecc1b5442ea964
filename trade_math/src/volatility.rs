//! Volatility indicator implementations
//!
//! Contains implementations of various volatility-based indicators:
//! - Rolling (sample) standard deviation
//! - Bollinger Bands
//! - Simple returns

use crate::moving_averages::sma;
use crate::{check_period, MathError, Result};
use serde::{Deserialize, Serialize};

/// Rolling sample standard deviation (n - 1 denominator).
pub fn rolling_std(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    if period < 2 {
        return Err(MathError::InvalidInput(
            "Standard deviation period must be at least 2".to_string(),
        ));
    }

    let n = values.len();
    let mut out = vec![None; n];
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|&v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (period - 1) as f64;
        out[i] = Some(variance.max(0.0).sqrt());
    }
    Ok(out)
}

/// Bollinger upper/middle/lower bands and bandwidth, aligned with the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub bandwidth: Vec<Option<f64>>,
}

/// Bollinger Bands: `middle = SMA(period)`, `upper/lower = middle ± k * std`.
///
/// Bandwidth is `(upper - lower) / middle`, and 0 when the middle band is 0.
pub fn bollinger_bands(closes: &[f64], period: usize, k: f64) -> Result<BollingerSeries> {
    check_period(period, "Bollinger")?;
    if k.is_nan() || k <= 0.0 {
        return Err(MathError::InvalidInput(
            "Standard deviation multiplier must be greater than zero".to_string(),
        ));
    }

    let middle = sma(closes, period)?;
    let std = rolling_std(closes, period.max(2))?;

    let n = closes.len();
    let mut upper = vec![None; n];
    let mut lower = vec![None; n];
    let mut bandwidth = vec![None; n];

    for i in 0..n {
        if let (Some(m), Some(s)) = (middle[i], std[i]) {
            let u = m + k * s;
            let l = m - k * s;
            upper[i] = Some(u);
            lower[i] = Some(l);
            bandwidth[i] = Some(if m == 0.0 { 0.0 } else { (u - l) / m });
        }
    }

    Ok(BollingerSeries {
        upper,
        middle,
        lower,
        bandwidth,
    })
}

/// Simple returns `p[t] / p[t-1] - 1`; one element shorter than the input.
pub fn pct_change(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rolling_std_matches_sample_formula() {
        let series = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8).unwrap();
        // Sample variance of the classic example is 32 / 7
        assert_relative_eq!(series[7].unwrap(), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_eq!(series[6], None);
    }

    #[test]
    fn test_bands_are_ordered() {
        let closes: Vec<f64> = (0..50)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0)
            .collect();
        let bands = bollinger_bands(&closes, 20, 2.0).unwrap();

        for i in 0..closes.len() {
            match (bands.upper[i], bands.middle[i], bands.lower[i]) {
                (Some(u), Some(m), Some(l)) => {
                    assert!(u >= m && m >= l);
                }
                (None, None, None) => assert!(i < 19),
                _ => panic!("bands must be defined together"),
            }
        }
    }

    #[test]
    fn test_flat_prices_have_zero_bandwidth() {
        let bands = bollinger_bands(&[50.0; 25], 20, 2.0).unwrap();
        assert_eq!(bands.bandwidth[24], Some(0.0));
        assert_eq!(bands.upper[24], Some(50.0));
    }

    #[test]
    fn test_pct_change() {
        let returns = pct_change(&[100.0, 110.0, 99.0]);
        assert_relative_eq!(returns[0], 0.1);
        assert_relative_eq!(returns[1], -0.1);
    }

    #[test]
    fn test_invalid_multiplier() {
        assert!(bollinger_bands(&[1.0, 2.0], 2, 0.0).is_err());
    }
}
