//! Headline statistics of a price history

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::utils::sample_std;
use serde::{Deserialize, Serialize};
use trade_math::pct_change;

/// Trading days in a year
pub const TRADING_DAYS: usize = 252;

/// Latest price, returns over standard lookbacks, volatility and 52-week range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub current_price: f64,
    /// Close of the previous bar, or the current price for a single bar
    pub previous_close: f64,
    pub change_pct: f64,
    pub volume: u64,
    /// Percent return over 20 bars
    pub return_1m: Option<f64>,
    /// Percent return over 60 bars
    pub return_3m: Option<f64>,
    /// Percent return over 120 bars
    pub return_6m: Option<f64>,
    /// Percent return over 252 bars
    pub return_1y: Option<f64>,
    /// Annualised standard deviation of daily returns, in percent
    pub volatility_pct: f64,
    pub high_52w: f64,
    pub low_52w: f64,
}

/// Percent change between the last close and the close `bars` earlier;
/// `None` without enough history
pub fn period_return(closes: &[f64], bars: usize) -> Option<f64> {
    if bars == 0 || closes.len() <= bars {
        return None;
    }
    let last = closes[closes.len() - 1];
    let base = closes[closes.len() - 1 - bars];
    (base > 0.0).then(|| (last - base) / base * 100.0)
}

impl QuoteSnapshot {
    pub fn from_series(series: &PriceSeries) -> Result<Self> {
        let bars = series.bars();
        let last = bars
            .last()
            .ok_or_else(|| ForecastError::DataError("Empty price series".to_string()))?;
        let closes = series.closes();

        let current_price = last.data.close;
        let previous_close = match bars.len() {
            1 => current_price,
            n => bars[n - 2].data.close,
        };
        let change_pct = if previous_close > 0.0 {
            (current_price - previous_close) / previous_close * 100.0
        } else {
            0.0
        };

        let year = &bars[bars.len().saturating_sub(TRADING_DAYS)..];
        let high_52w = year
            .iter()
            .map(|b| b.data.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let low_52w = year.iter().map(|b| b.data.low).fold(f64::INFINITY, f64::min);

        Ok(Self {
            current_price,
            previous_close,
            change_pct,
            volume: last.data.volume,
            return_1m: period_return(&closes, 20),
            return_3m: period_return(&closes, 60),
            return_6m: period_return(&closes, 120),
            return_1y: period_return(&closes, TRADING_DAYS),
            volatility_pct: sample_std(&pct_change(&closes)) * (TRADING_DAYS as f64).sqrt() * 100.0,
            high_52w,
            low_52w,
        })
    }
}
