use approx::assert_relative_eq;
use forecast_trade::ensemble::EnsembleCombiner;
use forecast_trade::error::{ForecastError, ForecastStage};
use forecast_trade::models::{ModelDiagnostics, ModelKind, ModelResult};
use rstest::rstest;

fn result(model: ModelKind, point: f64, confidence: f64) -> ModelResult {
    ModelResult::from_path(
        model,
        100.0,
        vec![point; 5],
        None,
        confidence,
        ModelDiagnostics::DampedTrend {
            alpha: 0.5,
            beta: 0.1,
            phi: 0.9,
            rmse: 1.0,
        },
    )
}

fn five(confidences: [f64; 5]) -> Vec<ModelResult> {
    let points = [104.0, 101.0, 99.0, 103.0, 110.0];
    ModelKind::ALL
        .iter()
        .zip(points.iter().zip(confidences))
        .map(|(&kind, (&point, confidence))| result(kind, point, confidence))
        .collect()
}

#[rstest]
#[case([0.9, 0.8, 0.9, 0.8, 0.7])]
#[case([0.4, 0.4, 0.4, 0.5, 0.3])]
#[case([0.6, 0.8, 0.45, 0.5, 0.7])]
fn test_weights_sum_to_one(#[case] confidences: [f64; 5]) {
    let ensemble = EnsembleCombiner::new().combine(&five(confidences), 5).unwrap();
    assert_relative_eq!(ensemble.weights.values().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert_eq!(ensemble.contributing_models.len(), 5);
}

#[rstest]
#[case(1.1)]
#[case(1.25)]
#[case(1.5)]
fn test_scaling_confidence_up_never_lowers_aggregate(#[case] factor: f64) {
    let base = [0.5, 0.6, 0.4, 0.55, 0.3];
    let raised = base.map(|c| c * factor);
    let before = EnsembleCombiner::new().combine(&five(base), 5).unwrap();
    let after = EnsembleCombiner::new().combine(&five(raised), 5).unwrap();

    assert!(after.confidence >= before.confidence);
    // Proportional scaling leaves the weights unchanged
    assert_relative_eq!(after.point_prediction, before.point_prediction, epsilon = 1e-9);
}

#[test]
fn test_point_is_weighted_mean() {
    let results = vec![
        result(ModelKind::Arima, 110.0, 0.9),
        result(ModelKind::MonteCarlo, 100.0, 0.3),
    ];
    let ensemble = EnsembleCombiner::new().combine(&results, 5).unwrap();
    assert_relative_eq!(ensemble.point_prediction, 107.5);
    assert_relative_eq!(ensemble.confidence, 0.75 * 0.9 + 0.25 * 0.3);
    assert!(ensemble.predicted_path.iter().all(|v| (v - 107.5).abs() < 1e-9));
}

#[test]
fn test_fallbacks_are_counted_but_failures_are_not() {
    let mut results = five([0.5; 5]);
    results[0].diagnostics = ModelDiagnostics::InsufficientData {
        required: 50,
        available: 25,
    };
    results[3].diagnostics = ModelDiagnostics::Failed {
        reason: "diverged".to_string(),
    };
    let ensemble = EnsembleCombiner::new().combine(&results, 5).unwrap();

    assert!(ensemble.contributing_models.contains(&ModelKind::Arima));
    assert!(!ensemble.contributing_models.contains(&ModelKind::Recurrent));
    assert_relative_eq!(ensemble.weights[&ModelKind::Arima], 0.25);
}

#[test]
fn test_no_valid_models_reports_stage() {
    let mut results = five([0.5; 5]);
    for result in &mut results {
        result.diagnostics = ModelDiagnostics::Failed {
            reason: "backend missing".to_string(),
        };
    }
    let error = EnsembleCombiner::new().combine(&results, 5).unwrap_err();
    assert!(matches!(
        error,
        ForecastError::NoValidModels {
            stage: ForecastStage::Combining,
            attempted: 5
        }
    ));
    assert_eq!(error.stage(), Some(ForecastStage::Combining));
}

#[test]
fn test_long_paths_are_truncated() {
    let mut long = result(ModelKind::Arima, 105.0, 0.8);
    long.predicted_path = (1..=10).map(|i| 100.0 + i as f64).collect();
    let ensemble = EnsembleCombiner::new().combine(&[long], 3).unwrap();
    assert_eq!(ensemble.predicted_path, vec![101.0, 102.0, 103.0]);
}
