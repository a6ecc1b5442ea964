//! Trend plus day-of-week decomposition
//!
//! The closes are split into an OLS trend, a centred weekday effect and a
//! residual. Forecasts extend the trend over the next trading dates and add
//! the effect of each date's weekday; intervals are the usual OLS prediction
//! intervals widened by the residual spread.

use super::exponential_smoothing::DampedTrendForecaster;
use super::{Forecaster, ModelContext, ModelDiagnostics, ModelKind, ModelResult};
use crate::config::{SeasonalConfig, SmoothingConfig};
use crate::data::{is_weekend, trading_days, PriceSeries};
use crate::error::{ForecastError, Result};
use crate::utils::{interval_confidence, normal_quantile};
use chrono::{Datelike, Days, NaiveDate};
use tracing::{debug, warn};
use trade_math::LinearFit;

/// Fewest observations a weekday needs before it gets its own effect
const MIN_WEEKDAY_OBSERVATIONS: usize = 2;

/// Fitted trend and weekday components
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    trend: LinearFit,
    /// Effect per weekday, Monday first; 0 for weekdays without enough data
    weekday_effects: [f64; 7],
    residual_std: f64,
    n: usize,
    x_mean: f64,
    sxx: f64,
    last_date: NaiveDate,
    weekends: bool,
}

impl Decomposition {
    /// Decompose `closes` observed on `dates`
    pub fn fit(closes: &[f64], dates: &[NaiveDate]) -> Result<Self> {
        let n = closes.len();
        if n != dates.len() {
            return Err(ForecastError::DataError(format!(
                "Closes length ({}) doesn't match dates length ({})",
                n,
                dates.len()
            )));
        }
        if n < 3 {
            return Err(ForecastError::ForecastingError(
                "Decomposition needs at least three observations".to_string(),
            ));
        }
        let last_date = dates[n - 1];

        let trend = LinearFit::fit(closes)?;
        let detrended: Vec<f64> = closes
            .iter()
            .enumerate()
            .map(|(i, y)| y - trend.predict(i as f64))
            .collect();

        let mut sums = [0.0; 7];
        let mut counts = [0usize; 7];
        for (date, r) in dates.iter().zip(&detrended) {
            let day = date.weekday().num_days_from_monday() as usize;
            sums[day] += r;
            counts[day] += 1;
        }

        let active: Vec<usize> = (0..7)
            .filter(|&d| counts[d] >= MIN_WEEKDAY_OBSERVATIONS)
            .collect();
        let mut weekday_effects = [0.0; 7];
        if !active.is_empty() {
            let raw: Vec<f64> = active.iter().map(|&d| sums[d] / counts[d] as f64).collect();
            let centre = raw.iter().sum::<f64>() / raw.len() as f64;
            for (&d, effect) in active.iter().zip(raw) {
                weekday_effects[d] = effect - centre;
            }
        }

        let ssr: f64 = dates
            .iter()
            .zip(&detrended)
            .map(|(date, r)| {
                let e = r - weekday_effects[date.weekday().num_days_from_monday() as usize];
                e * e
            })
            .sum();
        let dof = n
            .saturating_sub(2 + active.len().saturating_sub(1))
            .max(1);
        let residual_std = (ssr / dof as f64).sqrt();
        if !residual_std.is_finite() {
            return Err(ForecastError::ForecastingError(
                "Decomposition residuals are not finite".to_string(),
            ));
        }

        let x_mean = (n as f64 - 1.0) / 2.0;
        let sxx = (0..n).map(|i| (i as f64 - x_mean).powi(2)).sum();

        Ok(Self {
            trend,
            weekday_effects,
            residual_std,
            n,
            x_mean,
            sxx,
            last_date,
            weekends: dates.iter().any(|d| is_weekend(*d)),
        })
    }

    pub fn slope(&self) -> f64 {
        self.trend.slope
    }

    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }

    pub fn weekday_effects(&self) -> &[f64; 7] {
        &self.weekday_effects
    }

    /// Spread between the strongest and weakest weekday effect
    pub fn seasonal_amplitude(&self) -> f64 {
        let max = self.weekday_effects.iter().copied().fold(f64::MIN, f64::max);
        let min = self.weekday_effects.iter().copied().fold(f64::MAX, f64::min);
        max - min
    }

    /// The next `horizon` dates: weekdays only unless the history trades on weekends
    pub fn future_dates(&self, horizon: usize) -> Result<Vec<NaiveDate>> {
        let next = self
            .last_date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ForecastError::DataError("Date out of range".to_string()))?;
        if !self.weekends {
            return trading_days(next, horizon);
        }
        (0..horizon as u64)
            .map(|i| {
                next.checked_add_days(Days::new(i))
                    .ok_or_else(|| ForecastError::DataError("Date out of range".to_string()))
            })
            .collect()
    }

    /// Point forecasts and prediction intervals at the given coverage
    pub fn forecast(&self, horizon: usize, level: f64) -> Result<(Vec<f64>, Vec<(f64, f64)>)> {
        let z = normal_quantile(level)?;
        let n = self.n as f64;
        let mut values = Vec::with_capacity(horizon);
        let mut intervals = Vec::with_capacity(horizon);

        for (step, date) in self.future_dates(horizon)?.into_iter().enumerate() {
            let x = n - 1.0 + (step + 1) as f64;
            let effect = self.weekday_effects[date.weekday().num_days_from_monday() as usize];
            let value = self.trend.predict(x) + effect;
            let leverage = 1.0 + 1.0 / n + (x - self.x_mean).powi(2) / self.sxx;
            let half_width = z * self.residual_std * leverage.sqrt();
            values.push(value);
            intervals.push((value - half_width, value + half_width));
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ForecastingError(
                "Decomposition forecast is not finite".to_string(),
            ));
        }
        Ok((values, intervals))
    }
}

/// Decomposition forecaster that hands over to damped-trend smoothing when
/// its own fit fails
#[derive(Debug, Clone, Default)]
pub struct DecompositionForecaster {
    config: SeasonalConfig,
    substitute: DampedTrendForecaster,
}

impl DecompositionForecaster {
    pub fn new(config: SeasonalConfig, smoothing: SmoothingConfig) -> Self {
        Self {
            config,
            substitute: DampedTrendForecaster::new(smoothing),
        }
    }

    fn run(&self, series: &PriceSeries, horizon: usize) -> Result<ModelResult> {
        let recent = series.tail(self.config.lookback);
        let closes = recent.closes();
        let last = recent
            .last_close()
            .ok_or_else(|| ForecastError::DataError("Empty price series".to_string()))?;

        let model = Decomposition::fit(&closes, &recent.dates())?;
        let (values, intervals) = model.forecast(horizon, self.config.interval_level)?;
        let confidence = interval_confidence(&intervals, &closes, 0.4, 0.9);
        debug!(
            slope = model.slope(),
            amplitude = model.seasonal_amplitude(),
            "decomposition fitted"
        );

        Ok(ModelResult::from_path(
            ModelKind::Seasonal,
            last,
            values,
            Some(intervals),
            confidence,
            ModelDiagnostics::Decomposition {
                slope: model.slope(),
                seasonal_amplitude: model.seasonal_amplitude(),
                residual_std: model.residual_std(),
            },
        ))
    }
}

impl Forecaster for DecompositionForecaster {
    fn kind(&self) -> ModelKind {
        ModelKind::Seasonal
    }

    fn min_history(&self) -> usize {
        self.config.min_bars
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize, ctx: &ModelContext) -> ModelResult {
        if series.len() < self.min_history() {
            return ModelResult::insufficient(self.kind(), series, horizon, self.min_history());
        }

        match self.run(series, horizon) {
            Ok(result) => result,
            Err(e) => {
                warn!(model = "seasonal", error = %e, "decomposition failed, using exponential smoothing");
                self.substitute
                    .forecast(series, horizon, ctx)
                    .substituted_for(self.kind())
            }
        }
    }
}
