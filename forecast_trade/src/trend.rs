//! Trend analysis from moving-average alignment, momentum and volume

use crate::config::TrendConfig;
use crate::data::PriceSeries;
use serde::{Deserialize, Serialize};
use std::fmt;
use trade_math::{latest, sma, volume_ratio};

/// Trading signal shared by the trend analyzer and the final recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl Signal {
    pub fn is_bullish(self) -> bool {
        matches!(self, Signal::Buy | Signal::StrongBuy)
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, Signal::Sell | Signal::StrongSell)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::StrongBuy => "STRONG BUY",
            Signal::Buy => "BUY",
            Signal::Hold => "HOLD",
            Signal::Sell => "SELL",
            Signal::StrongSell => "STRONG SELL",
        })
    }
}

/// Discrete trend classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    StrongUptrend,
    Uptrend,
    Neutral,
    Downtrend,
    StrongDowntrend,
}

/// Result of the trend analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAssessment {
    pub direction: TrendDirection,
    /// `min(|score| / 6, 1)`
    pub strength: f64,
    pub signal: Signal,
    pub trend_score: i32,
    /// Percent change over the last 5 bars
    pub momentum_5d: f64,
    /// Percent change over the last 20 bars
    pub momentum_20d: f64,
    pub volume_ratio: f64,
}

impl TrendAssessment {
    /// Assessment used when the history is too short to score
    pub fn neutral() -> Self {
        Self {
            direction: TrendDirection::Neutral,
            strength: 0.5,
            signal: Signal::Hold,
            trend_score: 0,
            momentum_5d: 0.0,
            momentum_20d: 0.0,
            volume_ratio: 1.0,
        }
    }

    /// Map an integer score to direction, signal and strength
    pub fn from_score(score: i32, momentum_5d: f64, momentum_20d: f64, volume_ratio: f64) -> Self {
        let (direction, signal) = match score {
            s if s >= 4 => (TrendDirection::StrongUptrend, Signal::StrongBuy),
            s if s >= 2 => (TrendDirection::Uptrend, Signal::Buy),
            s if s <= -4 => (TrendDirection::StrongDowntrend, Signal::StrongSell),
            s if s <= -2 => (TrendDirection::Downtrend, Signal::Sell),
            _ => (TrendDirection::Neutral, Signal::Hold),
        };
        Self {
            direction,
            strength: (score.abs() as f64 / 6.0).min(1.0),
            signal,
            trend_score: score,
            momentum_5d,
            momentum_20d,
            volume_ratio,
        }
    }
}

/// Integer-scored trend analyzer
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    /// Score the series.
    ///
    /// +/-3 for full MA(5/10/20) alignment, +/-2 for agreeing 5- and 20-bar
    /// momentum, and one more point in the direction of the score on a
    /// volume spike. Histories shorter than `min_bars` read neutral.
    pub fn analyze(&self, series: &PriceSeries) -> TrendAssessment {
        // Momentum looks back 21 bars
        let min_bars = self.config.min_bars.max(21);
        if series.len() < min_bars {
            return TrendAssessment::neutral();
        }

        let closes = series.closes();
        let n = closes.len();
        let price = closes[n - 1];

        let ma = |period: usize| sma(&closes, period).ok().and_then(|s| latest(&s));
        let mut score: i32 = 0;

        if let (Some(ma5), Some(ma10), Some(ma20)) = (ma(5), ma(10), ma(20)) {
            if price > ma5 && ma5 > ma10 && ma10 > ma20 {
                score += 3;
            } else if price < ma5 && ma5 < ma10 && ma10 < ma20 {
                score -= 3;
            }
        }

        let momentum_5d = (price / closes[n - 6] - 1.0) * 100.0;
        let momentum_20d = (price / closes[n - 21] - 1.0) * 100.0;
        if momentum_5d > 2.0 && momentum_20d > 5.0 {
            score += 2;
        } else if momentum_5d < -2.0 && momentum_20d < -5.0 {
            score -= 2;
        }

        let ratio = volume_ratio(&series.volumes(), self.config.volume_window).unwrap_or(1.0);
        if ratio > self.config.volume_spike_ratio {
            score += score.signum();
        }

        TrendAssessment::from_score(score, momentum_5d, momentum_20d, ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[rstest]
    #[case(6, TrendDirection::StrongUptrend, Signal::StrongBuy)]
    #[case(4, TrendDirection::StrongUptrend, Signal::StrongBuy)]
    #[case(3, TrendDirection::Uptrend, Signal::Buy)]
    #[case(1, TrendDirection::Neutral, Signal::Hold)]
    #[case(-2, TrendDirection::Downtrend, Signal::Sell)]
    #[case(-5, TrendDirection::StrongDowntrend, Signal::StrongSell)]
    fn score_thresholds(
        #[case] score: i32,
        #[case] direction: TrendDirection,
        #[case] signal: Signal,
    ) {
        let assessment = TrendAssessment::from_score(score, 0.0, 0.0, 1.0);
        assert_eq!(assessment.direction, direction);
        assert_eq!(assessment.signal, signal);
        assert!(assessment.strength <= 1.0);
    }

    #[test]
    fn short_history_is_neutral() {
        let series = PriceSeries::from_closes(start(), &[100.0; 29]).unwrap();
        let assessment = TrendAnalyzer::default().analyze(&series);
        assert_eq!(assessment, TrendAssessment::neutral());
    }

    #[test]
    fn steep_rally_with_volume_is_strong() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let mut volumes = vec![1_000u64; 60];
        volumes[59] = 5_000;
        let series = PriceSeries::from_closes_and_volumes(start(), &closes, &volumes).unwrap();
        let assessment = TrendAnalyzer::default().analyze(&series);
        // 3 (alignment) + 2 (momentum) + 1 (volume)
        assert_eq!(assessment.trend_score, 6);
        assert_eq!(assessment.signal, Signal::StrongBuy);
        assert_eq!(assessment.strength, 1.0);
    }

    #[test]
    fn selloff_scores_negative() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 * 0.99f64.powi(i)).collect();
        let series = PriceSeries::from_closes(start(), &closes).unwrap();
        let assessment = TrendAnalyzer::default().analyze(&series);
        assert_eq!(assessment.trend_score, -5);
        assert_eq!(assessment.direction, TrendDirection::StrongDowntrend);
    }

    #[rstest]
    #[case(0.99, -6)]
    #[case(1.0, 0)]
    fn volume_spike_follows_the_score_sign(#[case] daily_factor: f64, #[case] expected: i32) {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 * daily_factor.powi(i)).collect();
        let mut volumes = vec![1_000u64; 60];
        volumes[59] = 5_000;
        let series = PriceSeries::from_closes_and_volumes(start(), &closes, &volumes).unwrap();
        let assessment = TrendAnalyzer::default().analyze(&series);
        assert!(assessment.volume_ratio > 1.5);
        assert_eq!(assessment.trend_score, expected);
    }

    #[test]
    fn zero_volume_does_not_spike() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + 0.1 * i as f64).collect();
        let series = PriceSeries::from_closes_and_volumes(start(), &closes, &[0; 40]).unwrap();
        let assessment = TrendAnalyzer::default().analyze(&series);
        assert_eq!(assessment.volume_ratio, 0.0);
        assert_eq!(assessment.trend_score, 3);
    }

    #[test]
    fn signal_serializes_with_spaces() {
        let json = serde_json::to_string(&Signal::StrongSell).unwrap();
        assert_eq!(json, "\"STRONG SELL\"");
    }
}
