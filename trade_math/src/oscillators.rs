//! Oscillator indicator implementations
//!
//! Contains implementations of various oscillator indicators:
//! - Relative Strength Index (RSI)
//! - Moving Average Convergence Divergence (MACD)
//! - Stochastic Oscillator

use crate::moving_averages::ema;
use crate::{check_period, MathError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Relative Strength Index (RSI) over a rolling window of price changes
///
/// Average gain and average loss are plain means over the last `period`
/// deltas. A window with no losses reads 100, and a window with no movement at
/// all reads 50, so the output always stays within `[0, 100]`.
#[derive(Debug, Clone)]
pub struct RelativeStrengthIndex {
    period: usize,
    previous_price: Option<f64>,
    gains: VecDeque<f64>,
    losses: VecDeque<f64>,
}

impl RelativeStrengthIndex {
    /// Create a new RSI with the specified period
    pub fn new(period: usize) -> Result<Self> {
        check_period(period, "RSI")?;

        Ok(Self {
            period,
            previous_price: None,
            gains: VecDeque::with_capacity(period),
            losses: VecDeque::with_capacity(period),
        })
    }

    /// Update the RSI with a new price value and return the current reading
    pub fn update(&mut self, price: f64) -> Option<f64> {
        if let Some(prev_price) = self.previous_price {
            let change = price - prev_price;

            self.gains.push_back(change.max(0.0));
            self.losses.push_back((-change).max(0.0));

            if self.gains.len() > self.period {
                self.gains.pop_front();
                self.losses.pop_front();
            }
        }

        self.previous_price = Some(price);
        self.value()
    }

    /// Get the current RSI value (0-100)
    pub fn value(&self) -> Option<f64> {
        if self.gains.len() < self.period {
            return None;
        }

        let avg_gain = self.gains.iter().sum::<f64>() / self.period as f64;
        let avg_loss = self.losses.iter().sum::<f64>() / self.period as f64;

        if avg_loss <= 0.0 {
            return Some(if avg_gain <= 0.0 { 50.0 } else { 100.0 });
        }

        let rs = avg_gain / avg_loss;
        Some((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the RSI, clearing all values
    pub fn reset(&mut self) {
        self.previous_price = None;
        self.gains.clear();
        self.losses.clear();
    }
}

/// RSI series for a sequence of closing prices.
pub fn rsi(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut indicator = RelativeStrengthIndex::new(period)?;
    Ok(closes.iter().map(|&c| indicator.update(c)).collect())
}

/// MACD line, signal line and histogram, aligned with the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Moving Average Convergence Divergence.
///
/// `line = ema(fast) - ema(slow)`, `signal = ema(line, signal_period)`,
/// `histogram = line - signal`.
pub fn macd(
    closes: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Result<MacdSeries> {
    if fast_period >= slow_period {
        return Err(MathError::InvalidInput(
            "Fast period must be smaller than slow period".to_string(),
        ));
    }
    check_period(signal_period, "MACD signal")?;

    let fast = ema(closes, fast_period)?;
    let slow = ema(closes, slow_period)?;
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, signal_period)?;
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();

    Ok(MacdSeries {
        line,
        signal,
        histogram,
    })
}

/// Stochastic %K and %D, aligned with the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

/// Stochastic Oscillator.
///
/// `%K = 100 * (close - lowest low) / (highest high - lowest low)` over
/// `k_period` bars; a flat range reads 50. `%D` is the mean of the last
/// `d_period` defined %K values.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> Result<StochasticSeries> {
    check_period(k_period, "Stochastic %K")?;
    check_period(d_period, "Stochastic %D")?;
    if highs.len() != closes.len() || lows.len() != closes.len() {
        return Err(MathError::InvalidInput(format!(
            "High/low/close lengths differ ({}, {}, {})",
            highs.len(),
            lows.len(),
            closes.len()
        )));
    }

    let n = closes.len();
    let mut k = vec![None; n];
    for i in (k_period - 1)..n {
        let start = i + 1 - k_period;
        let highest_high = highs[start..=i]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let lowest_low = lows[start..=i].iter().copied().fold(f64::INFINITY, f64::min);

        let range = highest_high - lowest_low;
        k[i] = Some(if range <= 0.0 {
            50.0
        } else {
            (100.0 * (closes[i] - lowest_low) / range).clamp(0.0, 100.0)
        });
    }

    let mut d = vec![None; n];
    for i in 0..n {
        if i + 1 < d_period {
            continue;
        }
        let window = &k[i + 1 - d_period..=i];
        if window.iter().all(Option::is_some) {
            let sum: f64 = window.iter().flatten().sum();
            d[i] = Some(sum / d_period as f64);
        }
    }

    Ok(StochasticSeries { k, d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rsi_calculation() {
        let mut rsi = RelativeStrengthIndex::new(3).unwrap();

        // Add some test data: 10.0, 10.5, 11.0, 10.5, 10.0
        assert_eq!(rsi.update(10.0), None);
        rsi.update(10.5);
        rsi.update(11.0);
        let rsi_value = rsi.update(10.5).unwrap();
        assert!((0.0..=100.0).contains(&rsi_value));

        // Test downtrend: should produce lower RSI
        let new_rsi_value = rsi.update(10.0).unwrap();
        assert!(new_rsi_value < rsi_value);
    }

    #[test]
    fn test_rsi_without_losses_is_100() {
        let series = rsi(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(series[3], Some(100.0));
        assert_eq!(series[4], Some(100.0));
    }

    #[test]
    fn test_rsi_flat_reads_50() {
        let series = rsi(&[7.0; 20], 14).unwrap();
        assert_eq!(series[13], None);
        assert_eq!(series[14], Some(50.0));
    }

    #[test]
    fn test_macd_calculation() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let result = macd(&closes, 12, 26, 9).unwrap();

        assert_eq!(result.line.len(), closes.len());
        // In an uptrend, MACD should be positive
        assert!(*result.line.last().unwrap() > 0.0);
        for i in 0..closes.len() {
            assert_relative_eq!(result.histogram[i], result.line[i] - result.signal[i]);
        }
    }

    #[test]
    fn test_macd_rejects_inverted_periods() {
        assert!(macd(&[1.0, 2.0], 26, 12, 9).is_err());
    }

    #[test]
    fn test_stochastic_calculation() {
        let highs = [110.0, 115.0, 120.0, 125.0];
        let lows = [100.0, 105.0, 110.0, 115.0];
        let closes = [105.0, 110.0, 115.0, 120.0];
        let result = stochastic(&highs, &lows, &closes, 3, 2).unwrap();

        assert_eq!(result.k[1], None);
        // (115 - 100) / (120 - 100)
        assert_relative_eq!(result.k[2].unwrap(), 75.0);
        assert_eq!(result.d[2], None);
        let d = result.d[3].unwrap();
        assert!((0.0..=100.0).contains(&d));
    }

    #[test]
    fn test_stochastic_flat_range_is_midpoint() {
        let flat = [10.0; 5];
        let result = stochastic(&flat, &flat, &flat, 3, 2).unwrap();
        assert_eq!(result.k[4], Some(50.0));
        assert_eq!(result.d[4], Some(50.0));
    }
}
