use approx::assert_relative_eq;
use chrono::NaiveDate;
use forecast_trade::config::ForecastConfig;
use forecast_trade::models::arima::{is_stationary, ArimaModel, AutoArima};
use forecast_trade::models::exponential_smoothing::{DampedTrendForecaster, ExponentialSmoothing};
use forecast_trade::models::monte_carlo::MonteCarloForecaster;
use forecast_trade::models::registry::{Backends, ModelRegistry};
use forecast_trade::models::{
    ForecastModel, Forecaster, ModelContext, ModelDiagnostics, ModelKind, TrainedForecastModel,
};
use forecast_trade::PriceSeries;
use rstest::rstest;

fn series(closes: &[f64]) -> PriceSeries {
    PriceSeries::from_closes(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(), closes).unwrap()
}

fn wavy_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 50.0 + 0.1 * i as f64 + (i as f64 * 0.5).sin() * 1.5)
        .collect()
}

fn forecasters() -> Vec<Box<dyn Forecaster>> {
    vec![
        Box::new(AutoArima::default()),
        Box::new(DampedTrendForecaster::default()),
        Box::new(MonteCarloForecaster::default()),
    ]
}

#[rstest]
#[case(60)]
#[case(150)]
#[case(300)]
fn test_every_model_fills_the_horizon(#[case] bars: usize) {
    let s = series(&wavy_closes(bars));
    for forecaster in forecasters() {
        let result = forecaster.forecast(&s, 12, &ModelContext::seeded(9));
        assert_eq!(result.model, forecaster.kind());
        assert_eq!(result.predicted_path.len(), 12);
        assert!(result.point_prediction.is_finite());
        assert!((0.0..=1.0).contains(&result.confidence));
        assert!(result.is_valid());
    }
}

#[test]
fn test_registry_results_cover_every_kind() {
    let registry = ModelRegistry::from_config(&ForecastConfig::default());
    let s = series(&wavy_closes(120));
    let results = registry.run(&s, 8, Some(1), None, true);
    let kinds: Vec<ModelKind> = results.iter().map(|r| r.model).collect();
    assert_eq!(kinds, ModelKind::ALL.to_vec());
}

#[test]
fn test_confidence_ranges() {
    let s = series(&wavy_closes(200));
    let registry = ModelRegistry::from_config(&ForecastConfig::default());
    for result in registry.run(&s, 20, Some(4), None, false) {
        let (lo, hi) = match result.model {
            ModelKind::Arima | ModelKind::Seasonal => (0.4, 0.9),
            ModelKind::ExponentialSmoothing | ModelKind::Recurrent => (0.4, 0.8),
            ModelKind::MonteCarlo => (0.3, 0.7),
        };
        assert!(
            (lo..=hi).contains(&result.confidence),
            "{} confidence {}",
            result.model,
            result.confidence
        );
    }
}

#[test]
fn test_disabled_backends_keep_slots_valid() {
    let config = ForecastConfig::default()
        .with_seasonal(false)
        .with_recurrent(false);
    let registry = ModelRegistry::from_config(&config);
    assert_eq!(registry.backends(), Backends::none());

    let results = registry.run(&series(&wavy_closes(90)), 5, Some(2), None, false);
    assert!(matches!(
        results[2].diagnostics,
        ModelDiagnostics::Substituted { .. }
    ));
    assert!(matches!(
        results[3].diagnostics,
        ModelDiagnostics::Unavailable { .. }
    ));
}

#[test]
fn test_arima_orders_are_reported() {
    let data = wavy_closes(200);
    let fit = ArimaModel::new(1, 1, 1).train(&data).unwrap();
    assert_eq!(fit.order(), (1, 1, 1));
    assert!(fit.aic().is_finite());
    assert!(fit.ma_coefficients().iter().all(|c| c.abs() <= 0.99));

    let forecast = fit.forecast(10).unwrap();
    assert_eq!(forecast.horizons(), 10);
    let intervals = forecast.intervals().unwrap();
    assert!(intervals
        .iter()
        .zip(forecast.values())
        .all(|((lo, hi), v)| lo <= v && v <= hi));
}

#[rstest]
#[case(0, 1, 1)]
#[case(1, 1, 1)]
#[case(2, 1, 2)]
#[case(1, 0, 1)]
fn test_moving_average_orders_fit_smooth_series(
    #[case] p: usize,
    #[case] d: usize,
    #[case] q: usize,
) {
    // Noise-free trend plus cycle: every long autoregression is collinear
    let data: Vec<f64> = (0..200)
        .map(|i| 80.0 + 0.05 * i as f64 + 2.5 * (i as f64 * 0.35).sin())
        .collect();
    let fit = ArimaModel::new(p, d, q).train(&data).unwrap();

    assert_eq!(fit.order(), (p, d, q));
    assert_eq!(fit.ma_coefficients().len(), q);
    assert!(fit.aic().is_finite());
    let forecast = fit.forecast(5).unwrap();
    assert!(forecast.is_finite());
}

#[test]
fn test_random_walk_is_not_stationary() {
    let walk: Vec<f64> = (0..200).map(|i| 100.0 + i as f64 * 0.3).collect();
    assert!(!is_stationary(&walk));
    let oscillating: Vec<f64> = (0..200)
        .map(|i| 10.0 + (i as f64 * 2.1).sin() + 0.5 * (i as f64 * 0.9 + 1.0).sin())
        .collect();
    assert!(is_stationary(&oscillating));
}

#[test]
fn test_damped_trend_parameters_are_searched() {
    let closes: Vec<f64> = (0..80).map(|i| 20.0 + 0.2 * i as f64).collect();
    let fit = DampedTrendForecaster::default().fit(&closes).unwrap();
    let (alpha, beta, phi) = fit.parameters();
    assert!((0.1..=0.9).contains(&alpha));
    assert!((0.01..=0.5).contains(&beta));
    assert!((0.8..=0.995).contains(&phi));

    let manual = ExponentialSmoothing::new(alpha, beta, phi)
        .unwrap()
        .train(&closes)
        .unwrap();
    assert_relative_eq!(manual.sse(), fit.sse());
}

#[cfg(feature = "seasonal")]
#[test]
fn test_decomposition_is_used_when_available() {
    let registry = ModelRegistry::from_config(&ForecastConfig::default());
    let results = registry.run(&series(&wavy_closes(100)), 5, Some(1), None, false);
    assert!(matches!(
        results[2].diagnostics,
        ModelDiagnostics::Decomposition { .. }
    ));
}

#[cfg(feature = "neural")]
#[test]
fn test_recurrent_trains_when_available() {
    let registry = ModelRegistry::from_config(&ForecastConfig::default());
    let results = registry.run(&series(&wavy_closes(100)), 5, Some(1), None, false);
    assert!(matches!(
        results[3].diagnostics,
        ModelDiagnostics::Recurrent { epochs_run: 20, .. }
    ));
}
