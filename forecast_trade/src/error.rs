//! Error types for the forecast_trade crate

use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use trade_math::MathError;

/// States of a single forecast request, in the order they are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStage {
    AwaitingInput,
    Validating,
    ComputingIndicators,
    RunningModels,
    Combining,
    Classifying,
    Done,
    Failed,
}

impl fmt::Display for ForecastStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForecastStage::AwaitingInput => "awaiting_input",
            ForecastStage::Validating => "validating",
            ForecastStage::ComputingIndicators => "computing_indicators",
            ForecastStage::RunningModels => "running_models",
            ForecastStage::Combining => "combining",
            ForecastStage::Classifying => "classifying",
            ForecastStage::Done => "done",
            ForecastStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Custom error types for the forecast_trade crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Not enough bars for the request to proceed
    #[error("Insufficient history during {stage}: {required} bars required, {available} available")]
    InsufficientHistory {
        stage: ForecastStage,
        required: usize,
        available: usize,
    },

    /// Every model reported a hard failure
    #[error("No valid models during {stage}: all {attempted} models failed")]
    NoValidModels { stage: ForecastStage, attempted: usize },

    /// A price series that breaks ordering or positivity invariants
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to forecasting operations
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Configuration that fails validation
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from indicator or regression math
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

impl ForecastError {
    /// Stage the request was in when it failed, when the error records one
    pub fn stage(&self) -> Option<ForecastStage> {
        match self {
            ForecastError::InsufficientHistory { stage, .. }
            | ForecastError::NoValidModels { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
