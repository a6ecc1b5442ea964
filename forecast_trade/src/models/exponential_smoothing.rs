//! Exponential smoothing models for time series forecasting

use super::{
    ForecastModel, ForecastResult, Forecaster, ModelContext, ModelDiagnostics, ModelKind,
    ModelResult, TrainedForecastModel,
};
use crate::config::SmoothingConfig;
use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::utils::mean;
use tracing::warn;

const ALPHA_GRID: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
const BETA_GRID: [f64; 6] = [0.01, 0.05, 0.1, 0.2, 0.3, 0.5];
const PHI_GRID: [f64; 6] = [0.8, 0.85, 0.9, 0.95, 0.98, 0.995];

/// Additive damped-trend exponential smoothing (Holt with damping)
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    /// Level smoothing parameter
    alpha: f64,
    /// Trend smoothing parameter
    beta: f64,
    /// Trend damping factor
    phi: f64,
}

/// Trained damped-trend model
#[derive(Debug, Clone)]
pub struct TrainedExponentialSmoothing {
    alpha: f64,
    beta: f64,
    phi: f64,
    /// Final level
    level: f64,
    /// Final trend
    trend: f64,
    /// Sum of squared one-step-ahead errors
    sse: f64,
    /// Number of one-step-ahead errors in `sse`
    errors: usize,
}

impl ExponentialSmoothing {
    /// Create a new damped-trend model
    pub fn new(alpha: f64, beta: f64, phi: f64) -> Result<Self> {
        for (name, value) in [("Alpha", alpha), ("Beta", beta), ("Phi", phi)] {
            if value <= 0.0 || value > 1.0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be in (0, 1]",
                    name
                )));
            }
        }

        Ok(Self { alpha, beta, phi })
    }
}

impl ForecastModel for ExponentialSmoothing {
    type Trained = TrainedExponentialSmoothing;

    fn train(&self, data: &[f64]) -> Result<Self::Trained> {
        if data.len() < 2 {
            return Err(ForecastError::DataError(
                "Damped trend smoothing needs at least two observations".to_string(),
            ));
        }

        let (alpha, beta, phi) = (self.alpha, self.beta, self.phi);
        let mut level = data[0];
        let mut trend = data[1] - data[0];
        let mut sse = 0.0;

        for &value in &data[1..] {
            let predicted = level + phi * trend;
            let error = value - predicted;
            sse += error * error;

            let previous_level = level;
            level = alpha * value + (1.0 - alpha) * predicted;
            trend = beta * (level - previous_level) + (1.0 - beta) * phi * trend;
        }

        if !sse.is_finite() || !level.is_finite() || !trend.is_finite() {
            return Err(ForecastError::ForecastingError(
                "Damped trend smoothing diverged".to_string(),
            ));
        }

        Ok(TrainedExponentialSmoothing {
            alpha,
            beta,
            phi,
            level,
            trend,
            sse,
            errors: data.len() - 1,
        })
    }

    fn name(&self) -> String {
        format!(
            "Damped Trend (alpha={}, beta={}, phi={})",
            self.alpha, self.beta, self.phi
        )
    }
}

impl TrainedExponentialSmoothing {
    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Root mean squared one-step-ahead error
    pub fn rmse(&self) -> f64 {
        (self.sse / self.errors.max(1) as f64).sqrt()
    }

    pub fn parameters(&self) -> (f64, f64, f64) {
        (self.alpha, self.beta, self.phi)
    }
}

impl TrainedForecastModel for TrainedExponentialSmoothing {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        // level + (phi + phi^2 + ... + phi^h) * trend
        let mut damping = 0.0;
        let mut phi_power = 1.0;
        let values = (0..horizons)
            .map(|_| {
                phi_power *= self.phi;
                damping += phi_power;
                self.level + damping * self.trend
            })
            .collect();

        Ok(ForecastResult::new(values))
    }

    fn name(&self) -> String {
        format!(
            "Damped Trend (alpha={}, beta={}, phi={})",
            self.alpha, self.beta, self.phi
        )
    }
}

/// Damped-trend smoothing with (alpha, beta, phi) picked by in-sample SSE
#[derive(Debug, Clone, Default)]
pub struct DampedTrendForecaster {
    config: SmoothingConfig,
}

impl DampedTrendForecaster {
    pub fn new(config: SmoothingConfig) -> Self {
        Self { config }
    }

    /// Grid search over the smoothing parameters
    pub fn fit(&self, data: &[f64]) -> Option<TrainedExponentialSmoothing> {
        let mut best: Option<TrainedExponentialSmoothing> = None;
        for &alpha in &ALPHA_GRID {
            for &beta in &BETA_GRID {
                for &phi in &PHI_GRID {
                    let fit = ExponentialSmoothing::new(alpha, beta, phi)
                        .and_then(|model| model.train(data));
                    if let Ok(fit) = fit {
                        if best.as_ref().map_or(true, |b| fit.sse < b.sse) {
                            best = Some(fit);
                        }
                    }
                }
            }
        }
        best
    }

    /// Simple exponential smoothing plus the average slope of the last
    /// smoothed points
    fn simple_smoothing(&self, closes: &[f64], horizon: usize) -> ModelResult {
        let window = &closes[closes.len().saturating_sub(self.config.fallback_window)..];
        let alpha = self.config.fallback_alpha;

        let mut smoothed = Vec::with_capacity(window.len());
        for &value in window {
            let next = match smoothed.last() {
                Some(&prev) => alpha * value + (1.0 - alpha) * prev,
                None => value,
            };
            smoothed.push(next);
        }

        let last = smoothed.last().copied().unwrap_or(0.0);
        let k = self.config.trend_points.min(smoothed.len()).max(1);
        let trend = (last - smoothed[smoothed.len() - k]) / k as f64;
        let path = (1..=horizon).map(|i| last + trend * i as f64).collect();

        ModelResult::from_path(
            ModelKind::ExponentialSmoothing,
            last,
            path,
            None,
            0.6,
            ModelDiagnostics::SimpleSmoothing { alpha, trend },
        )
    }
}

impl Forecaster for DampedTrendForecaster {
    fn kind(&self) -> ModelKind {
        ModelKind::ExponentialSmoothing
    }

    fn min_history(&self) -> usize {
        self.config.min_bars
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize, _ctx: &ModelContext) -> ModelResult {
        if series.len() < self.min_history() {
            return ModelResult::insufficient(self.kind(), series, horizon, self.min_history());
        }

        let closes = series.closes();
        let window = &closes[closes.len().saturating_sub(self.config.lookback)..];
        let last = window[window.len() - 1];

        let fitted = self.fit(window).and_then(|model| {
            let forecast = model.forecast(horizon).ok().filter(ForecastResult::is_finite)?;
            Some((model, forecast))
        });

        match fitted {
            Some((model, forecast)) => {
                let rmse = model.rmse();
                let level = mean(window);
                let confidence = if level > 0.0 {
                    (1.0 - rmse / level).clamp(0.4, 0.8)
                } else {
                    0.4
                };
                let (alpha, beta, phi) = model.parameters();
                let (values, _) = forecast.into_parts();

                ModelResult::from_path(
                    self.kind(),
                    last,
                    values,
                    None,
                    confidence,
                    ModelDiagnostics::DampedTrend {
                        alpha,
                        beta,
                        phi,
                        rmse,
                    },
                )
            }
            None => {
                warn!(
                    model = "exponential_smoothing",
                    "damped trend fit failed, using simple smoothing"
                );
                self.simple_smoothing(&closes, horizon)
            }
        }
    }
}
