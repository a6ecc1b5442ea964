//! # Portfolio Forecast
//!
//! Umbrella crate over the workspace: [`trade_math`] holds the numeric
//! building blocks and [`forecast_trade`] the forecasting pipeline built on
//! them. Most callers only need the [`prelude`].
//!
//! ## Example
//!
//! ```
//! use portfolio_forecast::prelude::*;
//! use chrono::NaiveDate;
//!
//! let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5).collect();
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let series = PriceSeries::from_closes(start, &closes).unwrap();
//!
//! let engine = ForecastEngine::new(ForecastConfig::default().with_seed(7)).unwrap();
//! let report = engine.generate_forecast(&series, 129.5, 5).unwrap();
//! assert_eq!(report.ensemble.predicted_path.len(), 5);
//! ```

pub use forecast_trade;
pub use trade_math;

/// The types needed to load prices, run a forecast and read the report
pub mod prelude {
    pub use forecast_trade::{
        generate_forecast, AlertCriterion, DataLoader, EnsembleResult, ForecastConfig,
        ForecastEngine, ForecastError, ForecastReport, MarketContext, ModelKind, ModelResult,
        PriceSeries, QuoteSnapshot, Signal, TrendDirection,
    };
    pub use trade_math::MathError;
}

/// Versions of the workspace crates, keyed by crate name
pub fn versions() -> [(&'static str, &'static str); 2] {
    [
        (forecast_trade::NAME, forecast_trade::VERSION),
        (trade_math::NAME, trade_math::VERSION),
    ]
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::*;

    #[test]
    fn test_versions() {
        let versions = versions();
        assert_eq!(versions[0].0, "forecast_trade");
        assert_eq!(versions[1].0, "trade_math");
        assert!(versions.iter().all(|(_, v)| !v.is_empty()));
    }

    #[test]
    fn test_prelude_runs_a_forecast() {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = PriceSeries::from_closes(start, &[50.0; 40]).unwrap();
        let report = generate_forecast(&series, 50.0, 3).unwrap();
        assert_eq!(report.recommendation, Signal::Hold);
    }
}
