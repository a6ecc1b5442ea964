//! Model registry
//!
//! Decides once, at construction, which numerical backends are usable and
//! fills the five ensemble slots accordingly. A slot whose backend is missing
//! holds a named stand-in instead: the seasonal slot delegates to damped-trend
//! smoothing, the recurrent slot reports itself unavailable.

use super::arima::AutoArima;
use super::exponential_smoothing::DampedTrendForecaster;
use super::monte_carlo::MonteCarloForecaster;
#[cfg(feature = "neural")]
use super::recurrent::RecurrentForecaster;
#[cfg(feature = "seasonal")]
use super::seasonal::DecompositionForecaster;
use super::{Forecaster, ModelContext, ModelDiagnostics, ModelKind, ModelResult};
use crate::config::ForecastConfig;
use crate::data::PriceSeries;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, warn};

/// Optional numerical backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backends {
    /// Trend and weekday decomposition
    pub seasonal: bool,
    /// Recurrent network on `ndarray`
    pub neural: bool,
}

impl Backends {
    /// Backends compiled into this build
    pub fn detect() -> Self {
        Self {
            seasonal: cfg!(feature = "seasonal"),
            neural: cfg!(feature = "neural"),
        }
    }

    pub fn none() -> Self {
        Self {
            seasonal: false,
            neural: false,
        }
    }

    /// Switch off backends the config disables
    pub fn restrict(self, config: &ForecastConfig) -> Self {
        Self {
            seasonal: self.seasonal && config.seasonal.enabled,
            neural: self.neural && config.recurrent.enabled,
        }
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::detect()
    }
}

/// Runs another forecaster in place of the slot's own model
#[derive(Debug)]
pub struct SubstitutedForecaster {
    kind: ModelKind,
    min_history: usize,
    inner: Box<dyn Forecaster>,
}

impl SubstitutedForecaster {
    pub fn new(kind: ModelKind, min_history: usize, inner: Box<dyn Forecaster>) -> Self {
        Self {
            kind,
            min_history,
            inner,
        }
    }
}

impl Forecaster for SubstitutedForecaster {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn min_history(&self) -> usize {
        self.min_history
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize, ctx: &ModelContext) -> ModelResult {
        if series.len() < self.min_history {
            return ModelResult::insufficient(self.kind, series, horizon, self.min_history);
        }
        self.inner
            .forecast(series, horizon, ctx)
            .substituted_for(self.kind)
    }
}

/// Placeholder for a model whose backend is not available
#[derive(Debug, Clone)]
pub struct UnavailableForecaster {
    kind: ModelKind,
    backend: &'static str,
}

impl UnavailableForecaster {
    pub fn new(kind: ModelKind, backend: &'static str) -> Self {
        Self { kind, backend }
    }
}

impl Forecaster for UnavailableForecaster {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn min_history(&self) -> usize {
        0
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize, _ctx: &ModelContext) -> ModelResult {
        ModelResult::flat(
            self.kind,
            series.last_close().unwrap_or(0.0),
            horizon,
            ModelDiagnostics::Unavailable {
                backend: self.backend.to_string(),
            },
        )
    }
}

/// The five ensemble slots in [`ModelKind::ALL`] order
#[derive(Debug)]
pub struct ModelRegistry {
    backends: Backends,
    slots: Vec<Box<dyn Forecaster>>,
}

impl ModelRegistry {
    /// Registry for the backends this build has and the config enables
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::with_backends(config, Backends::detect().restrict(config))
    }

    /// Registry for an explicit backend set; backends missing from the build
    /// are treated as unavailable
    pub fn with_backends(config: &ForecastConfig, backends: Backends) -> Self {
        let compiled = Backends::detect();
        let backends = Backends {
            seasonal: backends.seasonal && compiled.seasonal,
            neural: backends.neural && compiled.neural,
        };

        let slots: Vec<Box<dyn Forecaster>> = vec![
            Box::new(AutoArima::new(config.arima.clone())),
            Box::new(DampedTrendForecaster::new(config.smoothing.clone())),
            seasonal_slot(config, backends.seasonal),
            recurrent_slot(config, backends.neural),
            Box::new(MonteCarloForecaster::new(config.monte_carlo.clone())),
        ];
        debug!(seasonal = backends.seasonal, neural = backends.neural, "model registry built");

        Self { backends, slots }
    }

    pub fn backends(&self) -> Backends {
        self.backends
    }

    pub fn forecasters(&self) -> impl Iterator<Item = &dyn Forecaster> {
        self.slots.iter().map(|slot| slot.as_ref())
    }

    /// Run every slot on `series`.
    ///
    /// Slot `i` is seeded with `seed + i`, so the results are the same
    /// whether the slots run in parallel or one after another. A panicking
    /// model is reported as a failed result.
    pub fn run(
        &self,
        series: &PriceSeries,
        horizon: usize,
        seed: Option<u64>,
        budget: Option<Duration>,
        parallel: bool,
    ) -> Vec<ModelResult> {
        let run_slot = |(index, slot): (usize, &Box<dyn Forecaster>)| {
            let ctx = ModelContext::new(seed.map(|s| s.wrapping_add(index as u64)), budget);
            run_guarded(slot.as_ref(), series, horizon, &ctx)
        };

        if parallel {
            self.slots.par_iter().enumerate().map(run_slot).collect()
        } else {
            self.slots.iter().enumerate().map(run_slot).collect()
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default())
    }
}

#[cfg(feature = "seasonal")]
fn seasonal_slot(config: &ForecastConfig, available: bool) -> Box<dyn Forecaster> {
    if available {
        Box::new(DecompositionForecaster::new(
            config.seasonal.clone(),
            config.smoothing.clone(),
        ))
    } else {
        substitute_smoothing(config)
    }
}

#[cfg(not(feature = "seasonal"))]
fn seasonal_slot(config: &ForecastConfig, _available: bool) -> Box<dyn Forecaster> {
    substitute_smoothing(config)
}

fn substitute_smoothing(config: &ForecastConfig) -> Box<dyn Forecaster> {
    Box::new(SubstitutedForecaster::new(
        ModelKind::Seasonal,
        config.seasonal.min_bars,
        Box::new(DampedTrendForecaster::new(config.smoothing.clone())),
    ))
}

#[cfg(feature = "neural")]
fn recurrent_slot(config: &ForecastConfig, available: bool) -> Box<dyn Forecaster> {
    if available {
        Box::new(RecurrentForecaster::new(config.recurrent.clone()))
    } else {
        Box::new(UnavailableForecaster::new(ModelKind::Recurrent, "neural"))
    }
}

#[cfg(not(feature = "neural"))]
fn recurrent_slot(_config: &ForecastConfig, _available: bool) -> Box<dyn Forecaster> {
    Box::new(UnavailableForecaster::new(ModelKind::Recurrent, "neural"))
}

fn run_guarded(
    forecaster: &dyn Forecaster,
    series: &PriceSeries,
    horizon: usize,
    ctx: &ModelContext,
) -> ModelResult {
    let kind = forecaster.kind();
    match panic::catch_unwind(AssertUnwindSafe(|| forecaster.forecast(series, horizon, ctx))) {
        Ok(result) => {
            if result.diagnostics.is_fallback() {
                warn!(model = %kind, diagnostics = ?result.diagnostics, "model used a fallback");
            }
            result
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(model = %kind, %reason, "model panicked");
            ModelResult::failed(kind, series, horizon, format!("model panicked: {}", reason))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
