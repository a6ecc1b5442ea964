//! ARIMA models for time series forecasting
//!
//! Coefficients are estimated with the Hannan-Rissanen two-stage regression:
//! a long autoregression supplies innovation estimates, then the series is
//! regressed on its own lags and the lagged innovations. Residuals for the
//! likelihood are recomputed by conditional sum of squares.

use super::{
    ForecastModel, ForecastResult, Forecaster, ModelContext, ModelDiagnostics, ModelKind,
    ModelResult, TrainedForecastModel,
};
use crate::config::ArimaConfig;
use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::utils::{difference, interval_confidence, normal_quantile};
use std::f64::consts::PI;
use tracing::{debug, warn};
use trade_math::{ridge_least_squares, LinearFit};

/// MA coefficients are kept inside the invertible region
const MA_BOUND: f64 = 0.99;

/// 5% critical value of the Dickey-Fuller test with a constant
const DF_CRITICAL: f64 = -2.86;

/// Extra lags of the first-stage autoregression
const LONG_AR_EXTRA_LAGS: usize = 5;

/// Ridge term of both regression stages, relative to the largest diagonal
/// of the normal equations; smooth series make their lags collinear
const RIDGE_PENALTY: f64 = 1e-10;

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
    /// Central coverage of the prediction intervals
    interval_level: f64,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            interval_level: 0.95,
        }
    }

    pub fn with_interval_level(mut self, level: f64) -> Self {
        self.interval_level = level;
        self
    }

    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    p: usize,
    d: usize,
    q: usize,
    intercept: f64,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Innovation variance
    sigma2: f64,
    aic: f64,
    /// Series after `d` differences
    differenced: Vec<f64>,
    /// CSS residuals aligned with `differenced`
    residuals: Vec<f64>,
    /// Last value at each differencing level, level 0 first
    tails: Vec<f64>,
    z: f64,
}

impl TrainedArimaModel {
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// One step of the ARMA recursion on the differenced scale
    fn predict_next(&self, w: &[f64], e: &[f64]) -> f64 {
        let t = w.len();
        let mut prediction = self.intercept;
        for (i, phi) in self.ar_coefficients.iter().enumerate() {
            if t > i {
                prediction += phi * w[t - 1 - i];
            }
        }
        for (j, theta) in self.ma_coefficients.iter().enumerate() {
            if t > j {
                prediction += theta * e[t - 1 - j];
            }
        }
        prediction
    }

    /// Psi weights of the integrated process, `horizons` of them
    fn psi_weights(&self, horizons: usize) -> Vec<f64> {
        let mut psi = vec![0.0; horizons];
        if horizons == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..horizons {
            let mut value = if j <= self.q {
                self.ma_coefficients[j - 1]
            } else {
                0.0
            };
            for i in 1..=self.p.min(j) {
                value += self.ar_coefficients[i - 1] * psi[j - i];
            }
            psi[j] = value;
        }
        for _ in 0..self.d {
            let mut acc = 0.0;
            for weight in psi.iter_mut() {
                acc += *weight;
                *weight = acc;
            }
        }
        psi
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &[f64]) -> Result<TrainedArimaModel> {
        let (p, d, q) = (self.p, self.d, self.q);

        let mut tails = Vec::with_capacity(d);
        let mut w = data.to_vec();
        for _ in 0..d {
            let last = *w.last().ok_or_else(|| {
                ForecastError::ForecastingError("Cannot difference an empty series".to_string())
            })?;
            tails.push(last);
            w = difference(&w);
        }
        let m = w.len();

        // First stage: innovations from a long autoregression
        let long_order = if q > 0 { p + q + LONG_AR_EXTRA_LAGS } else { 0 };
        let start = p.max(long_order + q);
        let width = 1 + p + q;
        if m < start + width + 3 {
            return Err(ForecastError::ForecastingError(format!(
                "Insufficient data for ARIMA({},{},{}): {} observations after differencing",
                p, d, q, m
            )));
        }

        let mut innovations = vec![0.0; m];
        if q > 0 {
            let rows: Vec<Vec<f64>> = (long_order..m)
                .map(|t| {
                    std::iter::once(1.0)
                        .chain((1..=long_order).map(|i| w[t - i]))
                        .collect()
                })
                .collect();
            let beta = ridge_least_squares(&rows, &w[long_order..], RIDGE_PENALTY)?;
            for (t, row) in (long_order..m).zip(&rows) {
                let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
                innovations[t] = w[t] - fitted;
            }
        }

        // Second stage: lags of the series and of the innovations
        let rows: Vec<Vec<f64>> = (start..m)
            .map(|t| {
                std::iter::once(1.0)
                    .chain((1..=p).map(|i| w[t - i]))
                    .chain((1..=q).map(|j| innovations[t - j]))
                    .collect()
            })
            .collect();
        let beta = ridge_least_squares(&rows, &w[start..], RIDGE_PENALTY)?;

        let intercept = beta[0];
        let ar_coefficients = beta[1..=p].to_vec();
        let ma_coefficients: Vec<f64> = beta[1 + p..]
            .iter()
            .map(|theta| theta.clamp(-MA_BOUND, MA_BOUND))
            .collect();

        // Conditional sum of squares
        let mut residuals = vec![0.0; m];
        let mut ssr = 0.0;
        for t in p..m {
            let mut prediction = intercept;
            for i in 1..=p {
                prediction += ar_coefficients[i - 1] * w[t - i];
            }
            for j in 1..=q {
                if t >= j {
                    prediction += ma_coefficients[j - 1] * residuals[t - j];
                }
            }
            residuals[t] = w[t] - prediction;
            ssr += residuals[t] * residuals[t];
        }

        if !ssr.is_finite() {
            return Err(ForecastError::ForecastingError(format!(
                "ARIMA({},{},{}) residuals diverged",
                p, d, q
            )));
        }

        let n_eff = (m - p) as f64;
        // Variance floor relative to the price level; exact fits stay finite
        let level = data.iter().map(|v| v * v).sum::<f64>() / data.len().max(1) as f64;
        let sigma2 = (ssr / n_eff).max(1e-12 * level).max(f64::MIN_POSITIVE);

        let k = (p + q + 2) as f64;
        let aic = n_eff * ((2.0 * PI * sigma2).ln() + 1.0) + 2.0 * k;

        Ok(TrainedArimaModel {
            p,
            d,
            q,
            intercept,
            ar_coefficients,
            ma_coefficients,
            sigma2,
            aic,
            differenced: w,
            residuals,
            tails,
            z: normal_quantile(self.interval_level)?,
        })
    }

    fn name(&self) -> String {
        format!("ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        let m = self.differenced.len();
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();
        for _ in 0..horizons {
            let next = self.predict_next(&w, &e);
            w.push(next);
            e.push(0.0);
        }

        let mut values = w[m..].to_vec();
        for tail in self.tails.iter().rev() {
            let mut acc = *tail;
            for value in values.iter_mut() {
                acc += *value;
                *value = acc;
            }
        }

        let mut variance = 0.0;
        let intervals = self
            .psi_weights(horizons)
            .iter()
            .zip(&values)
            .map(|(psi, value)| {
                variance += self.sigma2 * psi * psi;
                let margin = self.z * variance.sqrt();
                (value - margin, value + margin)
            })
            .collect();

        ForecastResult::new_with_intervals(values, intervals)
    }

    fn name(&self) -> String {
        format!("ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Dickey-Fuller style check: t-statistic of `gamma` in
/// `dy_t = a + gamma * y_{t-1} + e_t` below the 5% critical value.
pub fn is_stationary(values: &[f64]) -> bool {
    if values.len() < 4 {
        return false;
    }
    let lagged = &values[..values.len() - 1];
    let changes = difference(values);
    let n = changes.len() as f64;

    let x_mean = lagged.iter().sum::<f64>() / n;
    let y_mean = changes.iter().sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in lagged.iter().zip(&changes) {
        sxx += (x - x_mean) * (x - x_mean);
        sxy += (x - x_mean) * (y - y_mean);
    }
    if sxx <= 0.0 {
        return false;
    }

    let gamma = sxy / sxx;
    let alpha = y_mean - gamma * x_mean;
    let ssr: f64 = lagged
        .iter()
        .zip(&changes)
        .map(|(x, y)| {
            let r = y - alpha - gamma * x;
            r * r
        })
        .sum();
    let s2 = ssr / (n - 2.0);
    if s2 <= 0.0 {
        return false;
    }

    gamma / (s2 / sxx).sqrt() < DF_CRITICAL
}

/// ARIMA with (p, d, q) chosen by AIC over a bounded grid
#[derive(Debug, Clone, Default)]
pub struct AutoArima {
    config: ArimaConfig,
}

impl AutoArima {
    pub fn new(config: ArimaConfig) -> Self {
        Self { config }
    }

    /// Fit every order in the grid and keep the lowest AIC.
    ///
    /// Stops early once the context deadline passes, keeping the best fit
    /// found so far.
    pub fn select(&self, data: &[f64], ctx: &ModelContext) -> Option<TrainedArimaModel> {
        let mut best: Option<TrainedArimaModel> = None;

        'grid: for d in 0..=self.config.max_d {
            for p in 0..=self.config.max_p {
                for q in 0..=self.config.max_q {
                    if ctx.expired() {
                        warn!(model = "arima", "time budget expired during order search");
                        break 'grid;
                    }
                    let model = ArimaModel::new(p, d, q)
                        .with_interval_level(self.config.interval_level);
                    match model.train(data) {
                        Ok(fit) if fit.aic.is_finite() => {
                            if best.as_ref().map_or(true, |b| fit.aic < b.aic) {
                                best = Some(fit);
                            }
                        }
                        Ok(_) => debug!(order = ?(p, d, q), "non-finite AIC"),
                        Err(e) => debug!(order = ?(p, d, q), error = %e, "order skipped"),
                    }
                }
            }
        }

        best
    }

    /// Straight-line extrapolation of the recent closes
    fn linear_trend(&self, closes: &[f64], horizon: usize) -> Result<ModelResult> {
        let window = &closes[closes.len().saturating_sub(self.config.fallback_window)..];
        let fit = LinearFit::fit(window)?;
        let last = *window.last().ok_or_else(|| {
            ForecastError::ForecastingError("Empty fallback window".to_string())
        })?;
        let path = (1..=horizon).map(|i| last + fit.slope * i as f64).collect();

        Ok(ModelResult::from_path(
            ModelKind::Arima,
            last,
            path,
            None,
            0.6,
            ModelDiagnostics::LinearTrend {
                slope: fit.slope,
                window: window.len(),
            },
        ))
    }
}

impl Forecaster for AutoArima {
    fn kind(&self) -> ModelKind {
        ModelKind::Arima
    }

    fn min_history(&self) -> usize {
        self.config.min_bars
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize, ctx: &ModelContext) -> ModelResult {
        if series.len() < self.min_history() {
            return ModelResult::insufficient(self.kind(), series, horizon, self.min_history());
        }

        let closes = series.closes();
        let window = &closes[closes.len().saturating_sub(self.config.lookback)..];
        let last = window[window.len() - 1];

        let fitted = self.select(window, ctx).and_then(|model| {
            let forecast = model.forecast(horizon).ok().filter(ForecastResult::is_finite)?;
            Some((model, forecast))
        });

        match fitted {
            Some((model, forecast)) => {
                let (values, intervals) = forecast.into_parts();
                let intervals = intervals.unwrap_or_default();
                let confidence = interval_confidence(&intervals, window, 0.4, 0.9);
                let slope = match values.last() {
                    Some(end) if horizon > 0 => (end - last) / horizon as f64,
                    _ => 0.0,
                };
                debug!(order = ?model.order(), aic = model.aic, "arima order selected");

                ModelResult::from_path(
                    self.kind(),
                    last,
                    values,
                    Some(intervals),
                    confidence,
                    ModelDiagnostics::Arima {
                        order: model.order(),
                        aic: model.aic,
                        stationary: is_stationary(window),
                        slope,
                    },
                )
            }
            None => {
                warn!(model = "arima", "no order could be fitted, using linear trend");
                self.linear_trend(&closes, horizon).unwrap_or_else(|e| {
                    ModelResult::failed(self.kind(), series, horizon, e.to_string())
                })
            }
        }
    }
}
