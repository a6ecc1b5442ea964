//! Forecast orchestration
//!
//! A request walks `Validating → ComputingIndicators → RunningModels →
//! Combining → Classifying → Done`; any fatal error ends it in `Failed`.
//! Indicator and trend analysis never fail a validated request, and a single
//! model's fallback is never fatal. Only a too-short history or an ensemble
//! without a single valid model is.

use crate::config::{ForecastConfig, RecommendationConfig};
use crate::data::PriceSeries;
use crate::ensemble::{EnsembleCombiner, EnsembleResult};
use crate::error::{ForecastError, ForecastStage, Result};
use crate::indicators::{IndicatorSet, IndicatorSnapshot};
use crate::models::registry::ModelRegistry;
use crate::models::ModelResult;
use crate::trend::{Signal, TrendAnalyzer, TrendAssessment};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Everything one forecast request produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub current_price: f64,
    pub horizon_days: usize,
    /// Bars of history the forecast was computed from
    pub history_bars: usize,
    /// One result per model slot, fallbacks included
    pub models: Vec<ModelResult>,
    pub ensemble: EnsembleResult,
    /// Ensemble point prediction relative to the current price, in percent
    pub price_change_pct: f64,
    pub recommendation: Signal,
    pub trend: TrendAssessment,
    pub indicators: IndicatorSnapshot,
}

/// Map the forecast price change to a recommendation.
///
/// A move only counts when the trend signal points the same way; anything
/// else is a hold.
pub fn recommend(
    price_change_pct: f64,
    trend_signal: Signal,
    thresholds: &RecommendationConfig,
) -> Signal {
    if trend_signal.is_bullish() {
        if price_change_pct > thresholds.strong_threshold_pct {
            return Signal::StrongBuy;
        }
        if price_change_pct > thresholds.threshold_pct {
            return Signal::Buy;
        }
    } else if trend_signal.is_bearish() {
        if price_change_pct < -thresholds.strong_threshold_pct {
            return Signal::StrongSell;
        }
        if price_change_pct < -thresholds.threshold_pct {
            return Signal::Sell;
        }
    }
    Signal::Hold
}

/// Reusable forecast pipeline; the model registry is built once
#[derive(Debug)]
pub struct ForecastEngine {
    config: ForecastConfig,
    registry: ModelRegistry,
    analyzer: TrendAnalyzer,
    combiner: EnsembleCombiner,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        let registry = ModelRegistry::from_config(&config);
        Self::with_registry(config, registry)
    }

    /// Engine over an explicitly built registry
    pub fn with_registry(config: ForecastConfig, registry: ModelRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            analyzer: TrendAnalyzer::new(config.trend.clone()),
            combiner: EnsembleCombiner::new(),
            config,
            registry,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Forecast `horizon` days ahead of `series`
    pub fn generate_forecast(
        &self,
        series: &PriceSeries,
        current_price: f64,
        horizon: usize,
    ) -> Result<ForecastReport> {
        self.run(series, current_price, horizon).map_err(|e| {
            warn!(stage = %ForecastStage::Failed, error = %e, "forecast failed");
            e
        })
    }

    fn run(&self, series: &PriceSeries, current_price: f64, horizon: usize) -> Result<ForecastReport> {
        enter(ForecastStage::Validating);
        self.validate(series, current_price, horizon)?;

        enter(ForecastStage::ComputingIndicators);
        let indicators = IndicatorSet::compute(series, &self.config.indicators)?;
        let trend = self.analyzer.analyze(series);

        enter(ForecastStage::RunningModels);
        let models = self.registry.run(
            series,
            horizon,
            self.config.seed,
            self.config.time_budget(),
            self.config.parallel,
        );

        enter(ForecastStage::Combining);
        let ensemble = self.combiner.combine(&models, horizon)?;

        enter(ForecastStage::Classifying);
        let price_change_pct =
            (ensemble.point_prediction - current_price) / current_price * 100.0;
        let recommendation = recommend(
            price_change_pct,
            trend.signal,
            &self.config.recommendation,
        );

        enter(ForecastStage::Done);
        info!(
            bars = series.len(),
            horizon,
            %recommendation,
            price_change_pct,
            confidence = ensemble.confidence,
            "forecast complete"
        );

        Ok(ForecastReport {
            current_price,
            horizon_days: horizon,
            history_bars: series.len(),
            models,
            ensemble,
            price_change_pct,
            recommendation,
            trend,
            indicators: indicators.snapshot(current_price),
        })
    }

    fn validate(&self, series: &PriceSeries, current_price: f64, horizon: usize) -> Result<()> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Horizon must be at least one day".to_string(),
            ));
        }
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Current price must be positive, got {}",
                current_price
            )));
        }
        if series.len() < self.config.min_history {
            return Err(ForecastError::InsufficientHistory {
                stage: ForecastStage::Validating,
                required: self.config.min_history,
                available: series.len(),
            });
        }
        Ok(())
    }
}

fn enter(stage: ForecastStage) {
    debug!(stage = %stage, "forecast stage");
}

/// Forecast with the default configuration
pub fn generate_forecast(
    series: &PriceSeries,
    current_price: f64,
    horizon: usize,
) -> Result<ForecastReport> {
    ForecastEngine::new(ForecastConfig::default())?.generate_forecast(series, current_price, horizon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case(9.0, Signal::StrongBuy, Signal::StrongBuy)]
    #[case(9.0, Signal::Buy, Signal::StrongBuy)]
    #[case(5.0, Signal::Buy, Signal::Buy)]
    #[case(3.0, Signal::Buy, Signal::Hold)]
    #[case(9.0, Signal::Hold, Signal::Hold)]
    #[case(-9.0, Signal::Buy, Signal::Hold)]
    #[case(-5.0, Signal::Sell, Signal::Sell)]
    #[case(-9.0, Signal::StrongSell, Signal::StrongSell)]
    #[case(-2.0, Signal::StrongSell, Signal::Hold)]
    fn recommendation_needs_trend_agreement(
        #[case] change: f64,
        #[case] trend: Signal,
        #[case] expected: Signal,
    ) {
        assert_eq!(
            recommend(change, trend, &RecommendationConfig::default()),
            expected
        );
    }

    fn series(n: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 0.1).collect();
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &closes).unwrap()
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let engine = ForecastEngine::new(ForecastConfig::default().with_seed(1)).unwrap();
        assert!(matches!(
            engine.generate_forecast(&series(40), 104.0, 0),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let engine = ForecastEngine::new(ForecastConfig::default().with_seed(1)).unwrap();
        assert!(engine.generate_forecast(&series(40), 0.0, 5).is_err());
        assert!(engine.generate_forecast(&series(40), f64::NAN, 5).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ForecastConfig::default().with_simulations(0);
        assert!(matches!(
            ForecastEngine::new(config),
            Err(ForecastError::ConfigError(_))
        ));
    }
}
