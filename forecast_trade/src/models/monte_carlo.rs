//! Monte Carlo price simulation
//!
//! Paths follow `p[t+1] = p[t] * (1 + r)` with `r ~ N(drift, volatility)`,
//! both estimated from historical simple returns. The mean terminal price is
//! the point forecast; percentiles of the terminal distribution give the
//! risk bands and Value-at-Risk levels.

use super::{Forecaster, ModelContext, ModelDiagnostics, ModelKind, ModelResult, MonteCarloSummary};
use crate::config::MonteCarloConfig;
use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::utils::{mean, percentile, population_std, sample_std};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use trade_math::pct_change;

/// Outcome of a batch of simulated paths
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// Mean price at each step
    pub mean_path: Vec<f64>,
    /// Terminal prices, ascending
    pub terminal: Vec<f64>,
}

impl Simulation {
    pub fn mean_terminal(&self) -> f64 {
        mean(&self.terminal)
    }
}

/// Simulate `paths` price paths of length `horizon` from `start`
pub fn simulate<R: Rng>(
    start: f64,
    drift: f64,
    volatility: f64,
    horizon: usize,
    paths: usize,
    rng: &mut R,
) -> Result<Simulation> {
    let returns = Normal::new(drift, volatility).map_err(|e| {
        ForecastError::ForecastingError(format!("Invalid return distribution: {}", e))
    })?;

    let mut step_sums = vec![0.0; horizon];
    let mut terminal = Vec::with_capacity(paths);
    for _ in 0..paths {
        let mut price = start;
        for sum in step_sums.iter_mut() {
            price *= 1.0 + returns.sample(rng);
            *sum += price;
        }
        terminal.push(price);
    }

    terminal.sort_by(f64::total_cmp);
    let mean_path = step_sums.iter().map(|s| s / paths as f64).collect();
    Ok(Simulation {
        mean_path,
        terminal,
    })
}

/// Geometric-Brownian-style simulator over daily simple returns
#[derive(Debug, Clone, Default)]
pub struct MonteCarloForecaster {
    config: MonteCarloConfig,
}

impl MonteCarloForecaster {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    fn run(&self, closes: &[f64], horizon: usize, ctx: &ModelContext) -> Result<ModelResult> {
        let last = *closes
            .last()
            .ok_or_else(|| ForecastError::DataError("Empty price series".to_string()))?;
        let returns = pct_change(closes);
        let drift = mean(&returns);
        let volatility = sample_std(&returns);

        let mut rng = ctx.rng();
        let simulation = simulate(
            last,
            drift,
            volatility,
            horizon,
            self.config.simulations.max(1),
            &mut rng,
        )?;

        let sorted = &simulation.terminal;
        let point = simulation.mean_terminal();
        let terminal_std = population_std(sorted);
        let confidence = if point > 0.0 {
            (1.0 - terminal_std / point).clamp(0.3, 0.7)
        } else {
            0.3
        };

        let summary = MonteCarloSummary {
            simulations: sorted.len(),
            drift,
            volatility,
            terminal_std,
            band_95: (percentile(sorted, 2.5), percentile(sorted, 97.5)),
            band_99: (percentile(sorted, 0.5), percentile(sorted, 99.5)),
            var_95: percentile(sorted, 5.0),
            var_99: percentile(sorted, 1.0),
        };

        Ok(ModelResult {
            model: ModelKind::MonteCarlo,
            point_prediction: point,
            predicted_path: simulation.mean_path,
            confidence,
            intervals: None,
            diagnostics: ModelDiagnostics::MonteCarlo(summary),
        })
    }
}

impl Forecaster for MonteCarloForecaster {
    fn kind(&self) -> ModelKind {
        ModelKind::MonteCarlo
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), closes).unwrap()
    }

    fn noisy_closes() -> Vec<f64> {
        (0..120)
            .map(|i| 100.0 + (i as f64 * 0.9).sin() * 3.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn zero_volatility_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(1);
        let sim = simulate(100.0, 0.01, 0.0, 3, 10, &mut rng).unwrap();
        assert_relative_eq!(sim.mean_path[2], 100.0 * 1.01f64.powi(3), epsilon = 1e-9);
        assert!(sim.terminal.iter().all(|p| (p - sim.terminal[0]).abs() < 1e-12));
    }

    #[test]
    fn bands_are_nested() {
        let result = MonteCarloForecaster::default().forecast(
            &series(&noisy_closes()),
            20,
            &ModelContext::seeded(42),
        );
        let summary = match &result.diagnostics {
            ModelDiagnostics::MonteCarlo(summary) => summary.clone(),
            other => panic!("unexpected diagnostics {:?}", other),
        };

        assert_eq!(summary.simulations, 1000);
        assert!(summary.band_99.0 <= summary.band_95.0);
        assert!(summary.band_95.0 <= summary.var_95);
        assert!(summary.var_99 <= summary.var_95);
        assert!(summary.band_95.1 <= summary.band_99.1);
        assert!((0.3..=0.7).contains(&result.confidence));
        assert_eq!(result.predicted_path.len(), 20);
    }

    #[test]
    fn seeded_runs_repeat() {
        let s = series(&noisy_closes());
        let forecaster = MonteCarloForecaster::default();
        let a = forecaster.forecast(&s, 10, &ModelContext::seeded(7));
        let b = forecaster.forecast(&s, 10, &ModelContext::seeded(7));
        assert_eq!(a, b);
    }

    #[test]
    fn flat_history_has_capped_confidence() {
        let result =
            MonteCarloForecaster::default().forecast(&series(&[80.0; 40]), 5, &ModelContext::seeded(1));
        assert_relative_eq!(result.point_prediction, 80.0);
        assert_relative_eq!(result.confidence, 0.7);
    }
}
