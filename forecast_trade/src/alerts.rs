//! Alert criteria over the latest market state
//!
//! Each criterion carries its own threshold and is checked against a
//! [`MarketContext`] built once per series. Delivery and scheduling of
//! alerts live outside this crate.

use crate::config::IndicatorConfig;
use crate::data::PriceSeries;
use crate::error::Result;
use crate::indicators::{BandPosition, IndicatorSet, IndicatorSnapshot};
use crate::quote::{period_return, QuoteSnapshot};
use serde::{Deserialize, Serialize};
use trade_math::{sma, volume_ratio};

const SHORT_MA: usize = 50;
const LONG_MA: usize = 200;
const VOLUME_WINDOW: usize = 20;
const WEEK: usize = 5;

/// Direction in which one line crossed another on the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossover {
    Bullish,
    Bearish,
}

impl Crossover {
    /// Crossing of `fast` through `slow` between the previous and the latest bar
    pub fn detect(previous: (f64, f64), latest: (f64, f64)) -> Option<Self> {
        let (prev_fast, prev_slow) = previous;
        let (fast, slow) = latest;
        if prev_fast <= prev_slow && fast > slow {
            Some(Crossover::Bullish)
        } else if prev_fast >= prev_slow && fast < slow {
            Some(Crossover::Bearish)
        } else {
            None
        }
    }
}

/// Market state an alert is checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub quote: QuoteSnapshot,
    pub indicators: IndicatorSnapshot,
    /// Percent return over the last 5 bars
    pub weekly_change_pct: Option<f64>,
    /// Latest volume over its 20-bar average
    pub volume_ratio: Option<f64>,
    /// Sign change of the MACD histogram on the latest bar
    pub macd_crossover: Option<Crossover>,
    /// 50-bar average crossing the 200-bar average on the latest bar
    pub ma_crossover: Option<Crossover>,
}

impl MarketContext {
    pub fn from_series(series: &PriceSeries, config: &IndicatorConfig) -> Result<Self> {
        let quote = QuoteSnapshot::from_series(series)?;
        let set = IndicatorSet::compute(series, config)?;
        let closes = series.closes();

        let histogram = &set.macd.histogram;
        let macd_crossover = match histogram.len() {
            n if n >= 2 => Crossover::detect((histogram[n - 2], 0.0), (histogram[n - 1], 0.0)),
            _ => None,
        };

        let short = sma(&closes, SHORT_MA)?;
        let long = sma(&closes, LONG_MA)?;
        let ma_crossover = match closes.len() {
            n if n >= 2 => match (short[n - 2], long[n - 2], short[n - 1], long[n - 1]) {
                (Some(ps), Some(pl), Some(s), Some(l)) => Crossover::detect((ps, pl), (s, l)),
                _ => None,
            },
            _ => None,
        };

        Ok(Self {
            indicators: set.snapshot(quote.current_price),
            weekly_change_pct: period_return(&closes, WEEK),
            volume_ratio: volume_ratio(&series.volumes(), VOLUME_WINDOW),
            macd_crossover,
            ma_crossover,
            quote,
        })
    }
}

/// A condition on the latest market state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "criterion", rename_all = "snake_case")]
pub enum AlertCriterion {
    PriceAbove { price: f64 },
    PriceBelow { price: f64 },
    DailyChangeAbove { percent: f64 },
    /// Daily change below `-percent`
    DailyChangeBelow { percent: f64 },
    WeeklyChangeAbove { percent: f64 },
    MonthlyChangeAbove { percent: f64 },
    /// Latest volume above `multiple` times its 20-bar average
    VolumeSpike { multiple: f64 },
    RsiOverbought { threshold: f64 },
    RsiOversold { threshold: f64 },
    MacdBullishCrossover,
    MacdBearishCrossover,
    GoldenCross,
    DeathCross,
    BollingerUpperBreak,
    BollingerLowerBreak,
}

impl AlertCriterion {
    pub fn is_triggered(&self, ctx: &MarketContext) -> bool {
        let above = |value: Option<f64>, threshold: f64| value.map_or(false, |v| v > threshold);
        match *self {
            AlertCriterion::PriceAbove { price } => ctx.quote.current_price > price,
            AlertCriterion::PriceBelow { price } => ctx.quote.current_price < price,
            AlertCriterion::DailyChangeAbove { percent } => ctx.quote.change_pct > percent,
            AlertCriterion::DailyChangeBelow { percent } => ctx.quote.change_pct < -percent,
            AlertCriterion::WeeklyChangeAbove { percent } => above(ctx.weekly_change_pct, percent),
            AlertCriterion::MonthlyChangeAbove { percent } => above(ctx.quote.return_1m, percent),
            AlertCriterion::VolumeSpike { multiple } => above(ctx.volume_ratio, multiple),
            AlertCriterion::RsiOverbought { threshold } => ctx.indicators.rsi > threshold,
            AlertCriterion::RsiOversold { threshold } => ctx.indicators.rsi < threshold,
            AlertCriterion::MacdBullishCrossover => ctx.macd_crossover == Some(Crossover::Bullish),
            AlertCriterion::MacdBearishCrossover => ctx.macd_crossover == Some(Crossover::Bearish),
            AlertCriterion::GoldenCross => ctx.ma_crossover == Some(Crossover::Bullish),
            AlertCriterion::DeathCross => ctx.ma_crossover == Some(Crossover::Bearish),
            AlertCriterion::BollingerUpperBreak => {
                ctx.indicators.bollinger_position == BandPosition::Upper
            }
            AlertCriterion::BollingerLowerBreak => {
                ctx.indicators.bollinger_position == BandPosition::Lower
            }
        }
    }
}

/// The criteria in `criteria` that fire on `ctx`
pub fn triggered<'a>(criteria: &'a [AlertCriterion], ctx: &MarketContext) -> Vec<&'a AlertCriterion> {
    criteria.iter().filter(|c| c.is_triggered(ctx)).collect()
}
