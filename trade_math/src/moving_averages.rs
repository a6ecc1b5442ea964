//! Moving average calculation implementations
//!
//! Contains implementations of the moving averages used by the forecasting
//! pipeline:
//! - Simple Moving Average (SMA)
//! - Exponential Moving Average (EMA), seeded with the first observation

use crate::{check_period, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) over a fixed window
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        check_period(period, "SMA")?;

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Push a value and return the average once the window is full
    pub fn update(&mut self, value: f64) -> Option<f64> {
        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }
        self.value()
    }

    /// Current average, `None` until `period` values have been seen
    pub fn value(&self) -> Option<f64> {
        if self.values.len() < self.period {
            return None;
        }
        // Summing the window each time keeps flat inputs exact.
        Some(self.values.iter().sum::<f64>() / self.period as f64)
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the SMA, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Exponential Moving Average (EMA)
///
/// Uses the recursive form `ema = alpha * x + (1 - alpha) * ema_prev` with
/// `alpha = 2 / (span + 1)`, seeded with the first value. Every position of the
/// input therefore has a defined EMA.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    span: usize,
    alpha: f64,
    current: Option<f64>,
}

impl ExponentialMovingAverage {
    /// Create a new Exponential Moving Average with the specified span
    pub fn new(span: usize) -> Result<Self> {
        check_period(span, "EMA")?;

        Ok(Self {
            span,
            alpha: 2.0 / (span as f64 + 1.0),
            current: None,
        })
    }

    /// Push a value and return the updated average
    pub fn update(&mut self, value: f64) -> f64 {
        let next = match self.current {
            None => value,
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
        };
        self.current = Some(next);
        next
    }

    /// Current average, `None` before the first update
    pub fn value(&self) -> Option<f64> {
        self.current
    }

    /// Get the span
    pub fn span(&self) -> usize {
        self.span
    }

    /// Reset the EMA, clearing all values
    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Rolling simple moving average of `values`.
///
/// Positions before the first full window are `None`; a period longer than
/// the input yields an all-`None` series.
pub fn sma(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut average = SimpleMovingAverage::new(period)?;
    Ok(values.iter().map(|&v| average.update(v)).collect())
}

/// Exponential moving average of `values` with the given span.
pub fn ema(values: &[f64], span: usize) -> Result<Vec<f64>> {
    let mut average = ExponentialMovingAverage::new(span)?;
    Ok(values.iter().map(|&v| average.update(v)).collect())
}
