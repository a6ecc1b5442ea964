//! Forecasting models for daily closing prices
//!
//! Two layers live here. [`ForecastModel`] / [`TrainedForecastModel`] are the
//! fit-then-forecast interface of an individual estimator with fixed
//! parameters. [`Forecaster`] is the ensemble-facing strategy: it decides
//! data sufficiency, searches parameters, degrades to its documented fallback
//! and always hands back a well-formed [`ModelResult`].

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::time::{Duration, Instant};

pub mod arima;
pub mod exponential_smoothing;
pub mod monte_carlo;
#[cfg(feature = "neural")]
pub mod recurrent;
pub mod registry;
#[cfg(feature = "seasonal")]
pub mod seasonal;

/// Confidence reported by a model that could not produce a real forecast
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Forecast values with optional prediction intervals
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    values: Vec<f64>,
    intervals: Option<Vec<(f64, f64)>>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            intervals: None,
        }
    }

    /// Create a new forecast result with prediction intervals
    pub fn new_with_intervals(values: Vec<f64>, intervals: Vec<(f64, f64)>) -> Result<Self> {
        if values.len() != intervals.len() {
            return Err(ForecastError::ForecastingError(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }

        Ok(Self {
            values,
            intervals: Some(intervals),
        })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.values.len()
    }

    /// Get the prediction intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    pub fn into_parts(self) -> (Vec<f64>, Option<Vec<(f64, f64)>>) {
        (self.values, self.intervals)
    }

    /// Whether every value and interval bound is finite
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
            && self
                .intervals
                .iter()
                .flatten()
                .all(|(lo, hi)| lo.is_finite() && hi.is_finite())
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for future periods
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> String;
}

/// Forecast model that can be trained on a price series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on an ordered sequence of observations
    fn train(&self, data: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> String;
}

/// The five ensemble members
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Arima,
    ExponentialSmoothing,
    Seasonal,
    Recurrent,
    MonteCarlo,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Arima,
        ModelKind::ExponentialSmoothing,
        ModelKind::Seasonal,
        ModelKind::Recurrent,
        ModelKind::MonteCarlo,
    ];

    /// Human readable model name
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Arima => "ARIMA",
            ModelKind::ExponentialSmoothing => "Exponential Smoothing",
            ModelKind::Seasonal => "Seasonal Decomposition",
            ModelKind::Recurrent => "Recurrent Network",
            ModelKind::MonteCarlo => "Monte Carlo",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Risk summary of a Monte Carlo run; all levels are prices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub simulations: usize,
    /// Mean daily simple return
    pub drift: f64,
    /// Sample standard deviation of daily simple returns
    pub volatility: f64,
    pub terminal_std: f64,
    /// 2.5th and 97.5th percentile of terminal prices
    pub band_95: (f64, f64),
    /// 0.5th and 99.5th percentile of terminal prices
    pub band_99: (f64, f64),
    /// 5th percentile of terminal prices
    pub var_95: f64,
    /// 1st percentile of terminal prices
    pub var_99: f64,
}

/// Model-specific metadata attached to every [`ModelResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelDiagnostics {
    Arima {
        order: (usize, usize, usize),
        aic: f64,
        stationary: bool,
        slope: f64,
    },
    /// OLS trend used when no ARIMA order could be fitted
    LinearTrend { slope: f64, window: usize },
    DampedTrend {
        alpha: f64,
        beta: f64,
        phi: f64,
        rmse: f64,
    },
    /// Simple smoothing plus trend used when the damped fit fails
    SimpleSmoothing { alpha: f64, trend: f64 },
    Decomposition {
        slope: f64,
        seasonal_amplitude: f64,
        residual_std: f64,
    },
    /// The slot's own model was replaced by `substitute`
    Substituted {
        substitute: ModelKind,
        inner: Box<ModelDiagnostics>,
    },
    Recurrent { epochs_run: usize, training_mae: f64 },
    MonteCarlo(MonteCarloSummary),
    InsufficientData { required: usize, available: usize },
    Unavailable { backend: String },
    Failed { reason: String },
}

impl ModelDiagnostics {
    /// Hard failure; the only state the ensemble excludes
    pub fn is_error(&self) -> bool {
        match self {
            ModelDiagnostics::Failed { .. } => true,
            ModelDiagnostics::Substituted { inner, .. } => inner.is_error(),
            _ => false,
        }
    }

    /// Whether the result comes from a fallback rather than the primary model
    pub fn is_fallback(&self) -> bool {
        match self {
            ModelDiagnostics::LinearTrend { .. }
            | ModelDiagnostics::SimpleSmoothing { .. }
            | ModelDiagnostics::Substituted { .. }
            | ModelDiagnostics::InsufficientData { .. }
            | ModelDiagnostics::Unavailable { .. }
            | ModelDiagnostics::Failed { .. } => true,
            _ => false,
        }
    }
}

/// One model's forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: ModelKind,
    pub point_prediction: f64,
    /// One value per forecast day
    pub predicted_path: Vec<f64>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervals: Option<Vec<(f64, f64)>>,
    pub diagnostics: ModelDiagnostics,
}

impl ModelResult {
    /// Result from a forecast path; the point prediction is the last step
    pub fn from_path(
        model: ModelKind,
        last_price: f64,
        path: Vec<f64>,
        intervals: Option<Vec<(f64, f64)>>,
        confidence: f64,
        diagnostics: ModelDiagnostics,
    ) -> Self {
        Self {
            model,
            point_prediction: path.last().copied().unwrap_or(last_price),
            predicted_path: path,
            confidence,
            intervals,
            diagnostics,
        }
    }

    /// Last price repeated over the horizon
    pub fn flat(
        model: ModelKind,
        last_price: f64,
        horizon: usize,
        diagnostics: ModelDiagnostics,
    ) -> Self {
        Self {
            model,
            point_prediction: last_price,
            predicted_path: vec![last_price; horizon],
            confidence: FALLBACK_CONFIDENCE,
            intervals: None,
            diagnostics,
        }
    }

    pub fn insufficient(
        model: ModelKind,
        series: &PriceSeries,
        horizon: usize,
        required: usize,
    ) -> Self {
        Self::flat(
            model,
            series.last_close().unwrap_or(0.0),
            horizon,
            ModelDiagnostics::InsufficientData {
                required,
                available: series.len(),
            },
        )
    }

    pub fn failed(model: ModelKind, series: &PriceSeries, horizon: usize, reason: String) -> Self {
        Self::flat(
            model,
            series.last_close().unwrap_or(0.0),
            horizon,
            ModelDiagnostics::Failed { reason },
        )
    }

    /// Relabel a substitute model's result as the output of slot `slot`
    pub fn substituted_for(self, slot: ModelKind) -> Self {
        let ModelResult {
            model,
            point_prediction,
            predicted_path,
            confidence,
            intervals,
            diagnostics,
        } = self;
        Self {
            model: slot,
            point_prediction,
            predicted_path,
            confidence,
            intervals,
            diagnostics: ModelDiagnostics::Substituted {
                substitute: model,
                inner: Box::new(diagnostics),
            },
        }
    }

    /// Counted by the ensemble
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.is_error()
    }
}

/// Per-call inputs shared by every model: randomness and time budget
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelContext {
    pub seed: Option<u64>,
    pub deadline: Option<Instant>,
}

impl ModelContext {
    pub fn new(seed: Option<u64>, budget: Option<Duration>) -> Self {
        Self {
            seed,
            deadline: budget.map(|b| Instant::now() + b),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            deadline: None,
        }
    }

    /// Seeded generator, or one drawn from entropy without a seed
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Whether the time budget has run out
    pub fn expired(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }
}

/// Ensemble member: forecast a price series over `horizon` days.
///
/// Implementations never return an error. Insufficient history, missing
/// backends and failed fits are all reported through the result's
/// diagnostics.
pub trait Forecaster: Send + Sync + Debug {
    fn kind(&self) -> ModelKind;

    /// Fewest bars needed for a real forecast
    fn min_history(&self) -> usize;

    fn forecast(&self, series: &PriceSeries, horizon: usize, ctx: &ModelContext) -> ModelResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn substituted_failure_is_an_error() {
        let inner = ModelDiagnostics::Failed {
            reason: "boom".to_string(),
        };
        let wrapped = ModelDiagnostics::Substituted {
            substitute: ModelKind::ExponentialSmoothing,
            inner: Box::new(inner),
        };
        assert!(wrapped.is_error());
        assert!(!ModelDiagnostics::InsufficientData {
            required: 50,
            available: 25
        }
        .is_error());
    }

    #[test]
    fn insufficient_result_repeats_last_close() {
        let series = PriceSeries::from_closes(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &[10.0, 11.0, 12.0],
        )
        .unwrap();
        let result = ModelResult::insufficient(ModelKind::Arima, &series, 4, 50);
        assert_eq!(result.predicted_path, vec![12.0; 4]);
        assert_eq!(result.point_prediction, 12.0);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert!(result.is_valid());
        assert!(result.diagnostics.is_fallback());
    }

    #[test]
    fn substitution_keeps_the_forecast() {
        let result = ModelResult::from_path(
            ModelKind::ExponentialSmoothing,
            10.0,
            vec![10.5, 11.0],
            None,
            0.7,
            ModelDiagnostics::SimpleSmoothing {
                alpha: 0.3,
                trend: 0.5,
            },
        )
        .substituted_for(ModelKind::Seasonal);

        assert_eq!(result.model, ModelKind::Seasonal);
        assert_eq!(result.point_prediction, 11.0);
        assert_eq!(result.confidence, 0.7);
        match result.diagnostics {
            ModelDiagnostics::Substituted { substitute, inner } => {
                assert_eq!(substitute, ModelKind::ExponentialSmoothing);
                assert!(matches!(*inner, ModelDiagnostics::SimpleSmoothing { .. }));
            }
            other => panic!("unexpected diagnostics {:?}", other),
        }
    }

    #[test]
    fn seeded_contexts_repeat() {
        use rand::Rng;
        let a: f64 = ModelContext::seeded(9).rng().gen();
        let b: f64 = ModelContext::seeded(9).rng().gen();
        assert_eq!(a, b);
        assert!(!ModelContext::seeded(9).expired());
        assert!(ModelContext::new(None, Some(Duration::ZERO)).expired());
    }

    #[test]
    fn diagnostics_are_tagged() {
        let json = serde_json::to_value(ModelDiagnostics::Unavailable {
            backend: "neural".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "unavailable");
        assert_eq!(json["backend"], "neural");
    }
}
