use forecast_trade::config::ForecastConfig;
use forecast_trade::{ForecastEngine, ForecastError};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_default_config_is_valid() {
    let config = ForecastConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.min_history, 20);
    assert!(config.parallel);
    assert_eq!(config.time_budget(), None);
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = ForecastConfig::from_json_str(
        r#"{"seed": 7, "monte_carlo": {"simulations": 250}, "recommendation": {"threshold_pct": 1.5}}"#,
    )
    .unwrap();

    let defaults = ForecastConfig::default();
    assert_eq!(config.seed, Some(7));
    assert_eq!(config.monte_carlo.simulations, 250);
    assert_eq!(config.monte_carlo.min_bars, defaults.monte_carlo.min_bars);
    assert_eq!(config.recommendation.threshold_pct, 1.5);
    assert_eq!(
        config.recommendation.strong_threshold_pct,
        defaults.recommendation.strong_threshold_pct
    );
    assert_eq!(config.arima, defaults.arima);
}

#[test]
fn test_config_file_round_trip() {
    let config = ForecastConfig::default()
        .with_seed(99)
        .with_parallel(false)
        .with_time_budget(Duration::from_millis(1500));

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = ForecastConfig::from_json_file(file.path()).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.time_budget(), Some(Duration::from_millis(1500)));
}

#[test]
fn test_invalid_values_are_rejected() {
    let result = ForecastConfig::from_json_str(r#"{"indicators": {"macd_fast": 30, "macd_slow": 26}}"#);
    assert!(matches!(result, Err(ForecastError::ConfigError(_))));

    let result = ForecastConfig::from_json_str(r#"{"arima": {"interval_level": 1.5}}"#);
    assert!(matches!(result, Err(ForecastError::ConfigError(_))));

    let result = ForecastConfig::from_json_str(r#"{"min_history": 0}"#);
    assert!(matches!(result, Err(ForecastError::ConfigError(_))));
}

#[test]
fn test_malformed_json_is_a_json_error() {
    let result = ForecastConfig::from_json_str("{ seed: ");
    assert!(matches!(result, Err(ForecastError::JsonError(_))));
}

#[test]
fn test_engine_rejects_invalid_config() {
    let config = ForecastConfig::default().with_simulations(0);
    assert!(matches!(
        ForecastEngine::new(config),
        Err(ForecastError::ConfigError(_))
    ));
}
