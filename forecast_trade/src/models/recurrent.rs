//! Windowed recurrent forecaster
//!
//! A single tanh layer (Elman network) reads a window of min-max scaled
//! closes. Its output is a learned correction on top of a linear
//! continuation of the window, so an untrained network already extrapolates
//! the window's average slope. Training is plain per-sample SGD with
//! back-propagation through time and clipped gradients.

use super::{Forecaster, ModelContext, ModelDiagnostics, ModelKind, ModelResult};
use crate::config::RecurrentConfig;
use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::utils::forecast_accuracy;
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::Uniform;
use tracing::{debug, warn};

/// Initial weights are drawn from `U(-INIT_SCALE, INIT_SCALE)`
const INIT_SCALE: f64 = 0.1;

/// Share of the windows used for training
const TRAIN_FRACTION: f64 = 0.8;

const GRADIENT_CLIP: f64 = 1.0;

/// Min-max scaling of a price series onto `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    /// `None` for a constant or empty series
    pub fn fit(values: &[f64]) -> Option<Self> {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        (range.is_finite() && range > 0.0).then_some(Self { min, range })
    }

    pub fn scale(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    pub fn unscale(&self, value: f64) -> f64 {
        value * self.range + self.min
    }
}

/// Elman network with a scalar input and a scalar output
#[derive(Debug, Clone)]
pub struct ElmanNetwork {
    w_in: Array1<f64>,
    w_rec: Array2<f64>,
    b_hidden: Array1<f64>,
    w_out: Array1<f64>,
    b_out: f64,
}

/// Gradients of one training sample
struct Gradients {
    w_in: Array1<f64>,
    w_rec: Array2<f64>,
    b_hidden: Array1<f64>,
    w_out: Array1<f64>,
    b_out: f64,
}

impl ElmanNetwork {
    /// Random recurrent weights, zero output layer
    pub fn new<R: Rng>(hidden: usize, rng: &mut R) -> Self {
        let dist = Uniform::new_inclusive(-INIT_SCALE, INIT_SCALE);
        Self {
            w_in: Array1::from_shape_fn(hidden, |_| rng.sample(&dist)),
            w_rec: Array2::from_shape_fn((hidden, hidden), |_| rng.sample(&dist)),
            b_hidden: Array1::from_shape_fn(hidden, |_| rng.sample(&dist)),
            w_out: Array1::zeros(hidden),
            b_out: 0.0,
        }
    }

    pub fn hidden_units(&self) -> usize {
        self.w_in.len()
    }

    /// Hidden states after each input, starting with the zero state
    fn hidden_states(&self, window: &[f64]) -> Vec<Array1<f64>> {
        let mut states = Vec::with_capacity(window.len() + 1);
        states.push(Array1::zeros(self.hidden_units()));
        for &x in window {
            let previous = &states[states.len() - 1];
            let next = (&self.w_in * x + self.w_rec.dot(previous) + &self.b_hidden)
                .mapv(f64::tanh);
            states.push(next);
        }
        states
    }

    /// Linear continuation of the window
    fn baseline(window: &[f64]) -> f64 {
        let last = window[window.len() - 1];
        let steps = (window.len() - 1).max(1) as f64;
        last + (last - window[0]) / steps
    }

    /// Next value after `window`; the window must not be empty
    pub fn predict(&self, window: &[f64]) -> f64 {
        let states = self.hidden_states(window);
        let last = &states[states.len() - 1];
        Self::baseline(window) + self.w_out.dot(last) + self.b_out
    }

    fn gradients(&self, window: &[f64], target: f64) -> (f64, Gradients) {
        let states = self.hidden_states(window);
        let last = &states[states.len() - 1];
        let output = Self::baseline(window) + self.w_out.dot(last) + self.b_out;
        let error = output - target;

        let mut grads = Gradients {
            w_in: Array1::zeros(self.hidden_units()),
            w_rec: Array2::zeros(self.w_rec.raw_dim()),
            b_hidden: Array1::zeros(self.hidden_units()),
            w_out: last * error,
            b_out: error,
        };

        let mut d_hidden = &self.w_out * error;
        for t in (0..window.len()).rev() {
            let h = &states[t + 1];
            let h_prev = &states[t];
            let d_pre = &d_hidden * &h.mapv(|v| 1.0 - v * v);

            grads.w_in.scaled_add(window[t], &d_pre);
            grads.b_hidden += &d_pre;
            for (i, &d) in d_pre.iter().enumerate() {
                grads.w_rec.row_mut(i).scaled_add(d, h_prev);
            }
            d_hidden = self.w_rec.t().dot(&d_pre);
        }

        (error, grads)
    }

    /// One SGD step on a single window; returns the absolute error before the step
    pub fn train_step(&mut self, window: &[f64], target: f64, learning_rate: f64) -> f64 {
        let (error, mut grads) = self.gradients(window, target);
        let clip = |g: f64| g.clamp(-GRADIENT_CLIP, GRADIENT_CLIP);
        grads.w_in.mapv_inplace(clip);
        grads.w_rec.mapv_inplace(clip);
        grads.b_hidden.mapv_inplace(clip);
        grads.w_out.mapv_inplace(clip);

        self.w_in.scaled_add(-learning_rate, &grads.w_in);
        self.w_rec.scaled_add(-learning_rate, &grads.w_rec);
        self.b_hidden.scaled_add(-learning_rate, &grads.b_hidden);
        self.w_out.scaled_add(-learning_rate, &grads.w_out);
        self.b_out -= learning_rate * clip(grads.b_out);
        error.abs()
    }
}

/// Recurrent network forecaster over scaled closes
#[derive(Debug, Clone, Default)]
pub struct RecurrentForecaster {
    config: RecurrentConfig,
}

impl RecurrentForecaster {
    pub fn new(config: RecurrentConfig) -> Self {
        Self { config }
    }

    fn run(&self, closes: &[f64], horizon: usize, ctx: &ModelContext) -> Result<ModelResult> {
        let window = self.config.window;
        if window < 2 {
            return Err(ForecastError::InvalidParameter(
                "Recurrent window must be at least 2".to_string(),
            ));
        }
        if closes.len() <= window {
            return Err(ForecastError::DataError(format!(
                "Recurrent model needs more than {} closes",
                window
            )));
        }
        let last = closes[closes.len() - 1];

        let scaler = match MinMaxScaler::fit(closes) {
            Some(scaler) => scaler,
            None => {
                return Ok(ModelResult::from_path(
                    ModelKind::Recurrent,
                    last,
                    vec![last; horizon],
                    None,
                    0.8,
                    ModelDiagnostics::Recurrent {
                        epochs_run: 0,
                        training_mae: 0.0,
                    },
                ));
            }
        };
        let scaled: Vec<f64> = closes.iter().map(|&c| scaler.scale(c)).collect();

        let samples = scaled.len() - window;
        let train = ((samples as f64 * TRAIN_FRACTION) as usize).clamp(1, samples);

        let mut rng = ctx.rng();
        let mut network = ElmanNetwork::new(self.config.hidden_units.max(1), &mut rng);
        let mut epochs_run = 0;
        for _ in 0..self.config.epochs {
            if ctx.expired() {
                warn!(model = "recurrent", epochs_run, "time budget expired during training");
                break;
            }
            for i in 0..train {
                network.train_step(
                    &scaled[i..i + window],
                    scaled[i + window],
                    self.config.learning_rate,
                );
            }
            epochs_run += 1;
        }

        let fitted: Vec<f64> = (0..train)
            .map(|i| network.predict(&scaled[i..i + window]))
            .collect();
        let training_mae = forecast_accuracy(&fitted, &scaled[window..window + train])?.mae;
        if !training_mae.is_finite() {
            return Err(ForecastError::ForecastingError(
                "Recurrent training diverged".to_string(),
            ));
        }
        debug!(epochs_run, training_mae, "recurrent network trained");

        let mut context: Vec<f64> = scaled[scaled.len() - window..].to_vec();
        let mut path = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next = network.predict(&context);
            path.push(scaler.unscale(next));
            context.remove(0);
            context.push(next);
        }

        Ok(ModelResult::from_path(
            ModelKind::Recurrent,
            last,
            path,
            None,
            (1.0 - training_mae).clamp(0.4, 0.8),
            ModelDiagnostics::Recurrent {
                epochs_run,
                training_mae,
            },
        ))
    }
}

impl Forecaster for RecurrentForecaster {
    fn kind(&self) -> ModelKind {
        ModelKind::Recurrent
    }

    fn min_history(&self) -> usize {
        self.config.min_bars
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize, ctx: &ModelContext) -> ModelResult {
        if series.len() < self.min_history() {
            return ModelResult::insufficient(self.kind(), series, horizon, self.min_history());
        }

        self.run(&series.closes(), horizon, ctx)
            .unwrap_or_else(|e| ModelResult::failed(self.kind(), series, horizon, e.to_string()))
    }
}
