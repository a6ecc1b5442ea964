//! # Forecast Trade
//!
//! Ensemble price forecasting for daily OHLCV series.
//!
//! ## Features
//!
//! - Validated daily price series with CSV and polars loaders
//! - Technical indicator set (moving averages, RSI, MACD, Bollinger, Stochastic)
//! - Integer-scored trend analysis
//! - Five forecasting models: auto-ARIMA, damped-trend exponential smoothing,
//!   trend/weekday decomposition, a recurrent network and Monte Carlo simulation
//! - Confidence-weighted ensemble and a BUY/SELL/HOLD recommendation
//! - Quote snapshots and alert criteria over the latest market state
//!
//! The `seasonal` and `neural` features (both on by default) compile the
//! decomposition and recurrent models. Without them the registry fills
//! those slots with stand-ins and the pipeline still runs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_trade::{DataLoader, ForecastConfig, ForecastEngine};
//!
//! # fn main() -> forecast_trade::Result<()> {
//! let series = DataLoader::from_csv("prices.csv")?;
//! let engine = ForecastEngine::new(ForecastConfig::default().with_seed(42))?;
//!
//! let current = series.last_close().unwrap_or_default();
//! let report = engine.generate_forecast(&series, current, 30)?;
//! println!("{} ({:+.2}%)", report.recommendation, report.price_change_pct);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod data;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod indicators;
pub mod models;
pub mod quote;
pub mod trend;
pub mod utils;

// Re-export commonly used types
pub use crate::alerts::{AlertCriterion, MarketContext};
pub use crate::config::ForecastConfig;
pub use crate::data::{DailyOhlcv, DataLoader, OhlcvData, PriceSeries};
pub use crate::engine::{generate_forecast, recommend, ForecastEngine, ForecastReport};
pub use crate::ensemble::{EnsembleCombiner, EnsembleResult};
pub use crate::error::{ForecastError, ForecastStage, Result};
pub use crate::indicators::{IndicatorSet, IndicatorSnapshot};
pub use crate::models::registry::{Backends, ModelRegistry};
pub use crate::models::{Forecaster, ModelDiagnostics, ModelKind, ModelResult};
pub use crate::quote::QuoteSnapshot;
pub use crate::trend::{Signal, TrendAnalyzer, TrendAssessment, TrendDirection};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
