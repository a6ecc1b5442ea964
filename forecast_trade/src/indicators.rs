//! Technical indicator set derived from a price series
//!
//! The set is recomputed on every request and never cached. Series keep the
//! length of the input; lookback gaps are `None`.

use crate::config::IndicatorConfig;
use crate::data::PriceSeries;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trade_math::{
    bollinger_bands, latest, macd, rsi, sma, stochastic, BollingerSeries, MacdSeries,
    StochasticSeries,
};

/// Every indicator series for one price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Simple moving average per period
    pub moving_averages: BTreeMap<usize, Vec<Option<f64>>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: MacdSeries,
    pub bollinger: BollingerSeries,
    pub stochastic: StochasticSeries,
}

impl IndicatorSet {
    /// Compute all indicators from the series
    pub fn compute(series: &PriceSeries, config: &IndicatorConfig) -> Result<Self> {
        let closes = series.closes();

        let mut moving_averages = BTreeMap::new();
        for &period in &config.ma_periods {
            moving_averages.insert(period, sma(&closes, period)?);
        }

        Ok(Self {
            moving_averages,
            rsi: rsi(&closes, config.rsi_period)?,
            macd: macd(
                &closes,
                config.macd_fast,
                config.macd_slow,
                config.macd_signal,
            )?,
            bollinger: bollinger_bands(&closes, config.bollinger_period, config.bollinger_k)?,
            stochastic: stochastic(
                &series.highs(),
                &series.lows(),
                &closes,
                config.stochastic_k,
                config.stochastic_d,
            )?,
        })
    }

    /// Latest value of the moving average with `period`, if computed and defined
    pub fn latest_ma(&self, period: usize) -> Option<f64> {
        self.moving_averages.get(&period).and_then(|s| latest(s))
    }

    /// Latest values and their classifications against `current_price`
    pub fn snapshot(&self, current_price: f64) -> IndicatorSnapshot {
        let rsi = latest(&self.rsi).unwrap_or(50.0);
        let macd_line = self.macd.line.last().copied().unwrap_or(0.0);
        let macd_signal_line = self.macd.signal.last().copied().unwrap_or(0.0);
        let macd_histogram = self.macd.histogram.last().copied().unwrap_or(0.0);

        let upper = latest(&self.bollinger.upper);
        let middle = latest(&self.bollinger.middle);
        let lower = latest(&self.bollinger.lower);
        let bandwidth = latest(&self.bollinger.bandwidth);

        let stochastic_k = latest(&self.stochastic.k);
        let stochastic_d = latest(&self.stochastic.d);

        IndicatorSnapshot {
            moving_averages: self
                .moving_averages
                .iter()
                .filter_map(|(period, series)| latest(series).map(|v| (*period, v)))
                .collect(),
            rsi,
            rsi_signal: RsiSignal::classify(rsi),
            macd_line,
            macd_signal_line,
            macd_histogram,
            macd_signal: MacdSignal::classify(macd_histogram),
            bollinger_upper: upper,
            bollinger_middle: middle,
            bollinger_lower: lower,
            bollinger_bandwidth: bandwidth,
            bollinger_position: BandPosition::classify(current_price, upper, lower),
            stochastic_k,
            stochastic_d,
            stochastic_signal: StochasticSignal::classify(stochastic_k),
        }
    }
}

/// RSI zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiSignal {
    pub fn classify(rsi: f64) -> Self {
        if rsi > 70.0 {
            RsiSignal::Overbought
        } else if rsi < 30.0 {
            RsiSignal::Oversold
        } else {
            RsiSignal::Neutral
        }
    }
}

/// Sign of the MACD histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MacdSignal {
    Bullish,
    Bearish,
}

impl MacdSignal {
    pub fn classify(histogram: f64) -> Self {
        if histogram > 0.0 {
            MacdSignal::Bullish
        } else {
            MacdSignal::Bearish
        }
    }
}

/// Where the price sits relative to the Bollinger bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BandPosition {
    Upper,
    Lower,
    Middle,
}

impl BandPosition {
    /// Above the upper band reads `Upper`, below the lower band `Lower`.
    /// Undefined bands read `Middle`.
    pub fn classify(price: f64, upper: Option<f64>, lower: Option<f64>) -> Self {
        match (upper, lower) {
            (Some(u), _) if price > u => BandPosition::Upper,
            (_, Some(l)) if price < l => BandPosition::Lower,
            _ => BandPosition::Middle,
        }
    }
}

/// Stochastic %K zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StochasticSignal {
    Overbought,
    Oversold,
    Neutral,
}

impl StochasticSignal {
    pub fn classify(k: Option<f64>) -> Self {
        match k {
            Some(k) if k > 80.0 => StochasticSignal::Overbought,
            Some(k) if k < 20.0 => StochasticSignal::Oversold,
            _ => StochasticSignal::Neutral,
        }
    }
}

/// Latest indicator readings consumed by reports and alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub moving_averages: BTreeMap<usize, f64>,
    pub rsi: f64,
    pub rsi_signal: RsiSignal,
    pub macd_line: f64,
    pub macd_signal_line: f64,
    pub macd_histogram: f64,
    pub macd_signal: MacdSignal,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub bollinger_bandwidth: Option<f64>,
    pub bollinger_position: BandPosition,
    pub stochastic_k: Option<f64>,
    pub stochastic_d: Option<f64>,
    pub stochastic_signal: StochasticSignal,
}
