//! Forecast configuration
//!
//! Every field has a default matching the reference parameters of the
//! engine, so a `ForecastConfig::default()` reproduces the standard report.
//! Configs can be loaded from JSON with missing fields filled in.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Lookback parameters for the indicator set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ma_periods: Vec<usize>,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_periods: vec![5, 10, 20, 50, 200],
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_k: 2.0,
            stochastic_k: 14,
            stochastic_d: 3,
        }
    }
}

/// Trend analyzer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub min_bars: usize,
    pub volume_window: usize,
    pub volume_spike_ratio: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_bars: 30,
            volume_window: 20,
            volume_spike_ratio: 1.5,
        }
    }
}

/// Auto-ARIMA parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaConfig {
    pub min_bars: usize,
    pub lookback: usize,
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    pub fallback_window: usize,
    pub interval_level: f64,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            min_bars: 50,
            lookback: 252,
            max_p: 2,
            max_d: 1,
            max_q: 2,
            fallback_window: 60,
            interval_level: 0.95,
        }
    }
}

/// Damped-trend exponential smoothing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub min_bars: usize,
    pub lookback: usize,
    pub fallback_alpha: f64,
    pub fallback_window: usize,
    pub trend_points: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            min_bars: 20,
            lookback: 100,
            fallback_alpha: 0.3,
            fallback_window: 60,
            trend_points: 10,
        }
    }
}

/// Decomposition forecaster parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    pub min_bars: usize,
    pub lookback: usize,
    pub interval_level: f64,
    pub enabled: bool,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            min_bars: 30,
            lookback: 252,
            interval_level: 0.95,
            enabled: true,
        }
    }
}

/// Recurrent forecaster parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrentConfig {
    pub min_bars: usize,
    pub window: usize,
    pub hidden_units: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub enabled: bool,
}

impl Default for RecurrentConfig {
    fn default() -> Self {
        Self {
            min_bars: 60,
            window: 20,
            hidden_units: 16,
            epochs: 20,
            learning_rate: 0.01,
            enabled: true,
        }
    }
}

/// Monte Carlo simulator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub min_bars: usize,
    pub simulations: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            min_bars: 30,
            simulations: 1000,
        }
    }
}

/// Price-change thresholds (percent) for the recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub strong_threshold_pct: f64,
    pub threshold_pct: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            strong_threshold_pct: 8.0,
            threshold_pct: 3.0,
        }
    }
}

/// Top-level configuration of a forecast engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Fewest bars a request may carry
    pub min_history: usize,
    /// Seed for stochastic models; `None` draws from entropy
    pub seed: Option<u64>,
    /// Run models on the rayon pool instead of sequentially
    pub parallel: bool,
    /// Cooperative per-model time budget
    pub model_time_budget_ms: Option<u64>,
    pub indicators: IndicatorConfig,
    pub trend: TrendConfig,
    pub arima: ArimaConfig,
    pub smoothing: SmoothingConfig,
    pub seasonal: SeasonalConfig,
    pub recurrent: RecurrentConfig,
    pub monte_carlo: MonteCarloConfig,
    pub recommendation: RecommendationConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_history: 20,
            seed: None,
            parallel: true,
            model_time_budget_ms: None,
            indicators: IndicatorConfig::default(),
            trend: TrendConfig::default(),
            arima: ArimaConfig::default(),
            smoothing: SmoothingConfig::default(),
            seasonal: SeasonalConfig::default(),
            recurrent: RecurrentConfig::default(),
            monte_carlo: MonteCarloConfig::default(),
            recommendation: RecommendationConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Parse a JSON document; absent fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.model_time_budget_ms = Some(budget.as_millis() as u64);
        self
    }

    pub fn with_simulations(mut self, simulations: usize) -> Self {
        self.monte_carlo.simulations = simulations;
        self
    }

    pub fn with_seasonal(mut self, enabled: bool) -> Self {
        self.seasonal.enabled = enabled;
        self
    }

    pub fn with_recurrent(mut self, enabled: bool) -> Self {
        self.recurrent.enabled = enabled;
        self
    }

    /// Per-model time budget, if one is configured
    pub fn time_budget(&self) -> Option<Duration> {
        self.model_time_budget_ms.map(Duration::from_millis)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        fn positive(value: usize, name: &str) -> Result<()> {
            if value == 0 {
                return Err(ForecastError::ConfigError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
            Ok(())
        }

        positive(self.min_history, "min_history")?;
        positive(self.indicators.rsi_period, "indicators.rsi_period")?;
        positive(self.indicators.bollinger_period, "indicators.bollinger_period")?;
        positive(self.indicators.stochastic_k, "indicators.stochastic_k")?;
        positive(self.indicators.stochastic_d, "indicators.stochastic_d")?;
        positive(self.indicators.macd_signal, "indicators.macd_signal")?;
        positive(self.trend.volume_window, "trend.volume_window")?;
        positive(self.arima.lookback, "arima.lookback")?;
        positive(self.arima.fallback_window, "arima.fallback_window")?;
        positive(self.seasonal.lookback, "seasonal.lookback")?;
        positive(self.smoothing.lookback, "smoothing.lookback")?;
        positive(self.smoothing.fallback_window, "smoothing.fallback_window")?;
        positive(self.smoothing.trend_points, "smoothing.trend_points")?;
        positive(self.recurrent.window, "recurrent.window")?;
        positive(self.recurrent.hidden_units, "recurrent.hidden_units")?;
        positive(self.monte_carlo.simulations, "monte_carlo.simulations")?;

        if self.indicators.ma_periods.iter().any(|&p| p == 0) {
            return Err(ForecastError::ConfigError(
                "indicators.ma_periods must all be greater than zero".to_string(),
            ));
        }
        if self.indicators.macd_fast >= self.indicators.macd_slow {
            return Err(ForecastError::ConfigError(
                "indicators.macd_fast must be smaller than indicators.macd_slow".to_string(),
            ));
        }
        if self.indicators.bollinger_k.is_nan() || self.indicators.bollinger_k <= 0.0 {
            return Err(ForecastError::ConfigError(
                "indicators.bollinger_k must be positive".to_string(),
            ));
        }
        if self.arima.interval_level <= 0.0 || self.arima.interval_level >= 1.0 {
            return Err(ForecastError::ConfigError(
                "arima.interval_level must be between 0 and 1".to_string(),
            ));
        }
        if self.seasonal.interval_level <= 0.0 || self.seasonal.interval_level >= 1.0 {
            return Err(ForecastError::ConfigError(
                "seasonal.interval_level must be between 0 and 1".to_string(),
            ));
        }
        if self.smoothing.fallback_alpha <= 0.0 || self.smoothing.fallback_alpha >= 1.0 {
            return Err(ForecastError::ConfigError(
                "smoothing.fallback_alpha must be between 0 and 1".to_string(),
            ));
        }
        if self.recurrent.learning_rate <= 0.0 || !self.recurrent.learning_rate.is_finite() {
            return Err(ForecastError::ConfigError(
                "recurrent.learning_rate must be positive".to_string(),
            ));
        }
        let thresholds = &self.recommendation;
        if thresholds.threshold_pct < 0.0 || thresholds.strong_threshold_pct < thresholds.threshold_pct
        {
            return Err(ForecastError::ConfigError(
                "recommendation thresholds must satisfy 0 <= threshold <= strong threshold"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_history, 20);
        assert_eq!(config.monte_carlo.simulations, 1000);
        assert_eq!(config.indicators.ma_periods, vec![5, 10, 20, 50, 200]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            ForecastConfig::from_json_str(r#"{"seed": 7, "arima": {"lookback": 120}}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.arima.lookback, 120);
        assert_eq!(config.arima.min_bars, 50);
        assert!(config.parallel);
    }

    #[test]
    fn invalid_macd_periods_are_rejected() {
        let mut config = ForecastConfig::default();
        config.indicators.macd_fast = 30;
        assert!(matches!(
            config.validate(),
            Err(ForecastError::ConfigError(_))
        ));
    }

    #[test]
    fn builders_set_fields() {
        let config = ForecastConfig::default()
            .with_seed(3)
            .with_parallel(false)
            .with_time_budget(Duration::from_millis(250))
            .with_recurrent(false);
        assert_eq!(config.seed, Some(3));
        assert!(!config.parallel);
        assert_eq!(config.time_budget(), Some(Duration::from_millis(250)));
        assert!(!config.recurrent.enabled);
    }
}
