//! Confidence-weighted ensemble of model forecasts

use crate::error::{ForecastError, ForecastStage, Result};
use crate::models::{ModelKind, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Combined forecast of every model that did not hard-fail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub point_prediction: f64,
    /// One value per forecast day
    pub predicted_path: Vec<f64>,
    pub confidence: f64,
    /// Normalised confidence per contributing model; sums to one
    pub weights: BTreeMap<ModelKind, f64>,
    pub contributing_models: BTreeSet<ModelKind>,
}

/// Weighted-average combiner
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleCombiner;

impl EnsembleCombiner {
    pub fn new() -> Self {
        Self
    }

    /// Combine `results` over a `horizon`-day path.
    ///
    /// Results flagged as hard failures are dropped; fallbacks are kept.
    /// A path shorter than `horizon` is padded with that model's point
    /// prediction, a longer one is truncated.
    pub fn combine(&self, results: &[ModelResult], horizon: usize) -> Result<EnsembleResult> {
        let valid: Vec<&ModelResult> = results.iter().filter(|r| r.is_valid()).collect();
        if valid.is_empty() {
            return Err(ForecastError::NoValidModels {
                stage: ForecastStage::Combining,
                attempted: results.len(),
            });
        }

        let total: f64 = valid.iter().map(|r| r.confidence).sum();
        let weights: Vec<f64> = if total > 0.0 && total.is_finite() {
            valid.iter().map(|r| r.confidence / total).collect()
        } else {
            vec![1.0 / valid.len() as f64; valid.len()]
        };

        let mut point_prediction = 0.0;
        let mut confidence = 0.0;
        let mut predicted_path = vec![0.0; horizon];
        for (result, &weight) in valid.iter().zip(&weights) {
            point_prediction += weight * result.point_prediction;
            confidence += weight * result.confidence;
            for (i, step) in predicted_path.iter_mut().enumerate() {
                let value = result
                    .predicted_path
                    .get(i)
                    .copied()
                    .unwrap_or(result.point_prediction);
                *step += weight * value;
            }
        }

        let mut weight_map = BTreeMap::new();
        for (result, &weight) in valid.iter().zip(&weights) {
            *weight_map.entry(result.model).or_insert(0.0) += weight;
        }

        Ok(EnsembleResult {
            point_prediction,
            predicted_path,
            confidence,
            contributing_models: weight_map.keys().copied().collect(),
            weights: weight_map,
        })
    }
}
