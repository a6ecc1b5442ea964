//! # Trade Math
//!
//! Technical indicators and small numerical helpers for daily price series.
//!
//! Every indicator is a pure function over slices. Series outputs keep the
//! length of their input; positions inside the lookback window are `None`
//! rather than an error, so callers decide how much history is enough.

use thiserror::Error;

// Indicator modules
pub mod moving_averages;
pub mod oscillators;
pub mod regression;
pub mod volatility;
pub mod volume;

pub use moving_averages::{ema, sma, ExponentialMovingAverage, SimpleMovingAverage};
pub use oscillators::{macd, rsi, stochastic, MacdSeries, RelativeStrengthIndex, StochasticSeries};
pub use regression::{least_squares, ridge_least_squares, LinearFit};
pub use volatility::{bollinger_bands, pct_change, rolling_std, BollingerSeries};
pub use volume::{average_volume, volume_ratio};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Errors that can occur in trading-related calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Singular system: {0}")]
    SingularMatrix(String),
}

/// Result type for trading math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Last defined value of an indicator series.
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().find_map(|v| *v)
}

pub(crate) fn check_period(period: usize, name: &str) -> Result<()> {
    if period == 0 {
        return Err(MathError::InvalidInput(format!(
            "{} period must be greater than zero",
            name
        )));
    }
    Ok(())
}
