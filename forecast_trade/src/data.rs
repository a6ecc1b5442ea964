//! Daily price series handling for forecasting

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Represents OHLCV (Open, High, Low, Close, Volume) data for a specific time period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvData {
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: u64,
}

/// Daily OHLCV data with a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyOhlcv {
    /// Date of the data point
    pub date: NaiveDate,
    /// OHLCV data
    pub data: OhlcvData,
}

impl DailyOhlcv {
    /// A bar whose open, high, low and close are all `close`
    pub fn flat(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            data: OhlcvData {
                open: close,
                high: close,
                low: close,
                close,
                volume,
            },
        }
    }
}

/// Validated, date-ordered sequence of daily bars.
///
/// Dates are strictly increasing, prices finite and positive, and
/// `low <= high` on every bar. The series is never mutated after
/// construction; models only read projections of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<DailyOhlcv>,
}

impl PriceSeries {
    /// Validate and wrap a list of bars
    pub fn new(bars: Vec<DailyOhlcv>) -> Result<Self> {
        for (i, bar) in bars.iter().enumerate() {
            let d = &bar.data;
            for (name, value) in [
                ("open", d.open),
                ("high", d.high),
                ("low", d.low),
                ("close", d.close),
            ] {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ForecastError::InvalidSeries(format!(
                        "Bar {} ({}) has non-positive {} price {}",
                        i, bar.date, name, value
                    )));
                }
            }
            if d.low > d.high {
                return Err(ForecastError::InvalidSeries(format!(
                    "Bar {} ({}) has low {} above high {}",
                    i, bar.date, d.low, d.high
                )));
            }
            if i > 0 && bars[i - 1].date >= bar.date {
                return Err(ForecastError::InvalidSeries(format!(
                    "Dates must be strictly increasing: {} follows {}",
                    bar.date,
                    bars[i - 1].date
                )));
            }
        }
        Ok(Self { bars })
    }

    /// Build a series of flat bars on consecutive weekdays starting at `start`
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Result<Self> {
        let volumes = vec![1_000_000; closes.len()];
        Self::from_closes_and_volumes(start, closes, &volumes)
    }

    /// Like [`PriceSeries::from_closes`] with explicit volumes
    pub fn from_closes_and_volumes(
        start: NaiveDate,
        closes: &[f64],
        volumes: &[u64],
    ) -> Result<Self> {
        if closes.len() != volumes.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Closes length ({}) doesn't match volumes length ({})",
                closes.len(),
                volumes.len()
            )));
        }
        let dates = trading_days(start, closes.len())?;
        let bars = dates
            .into_iter()
            .zip(closes.iter().zip(volumes))
            .map(|(date, (&close, &volume))| DailyOhlcv::flat(date, close, volume))
            .collect();
        Self::new(bars)
    }

    pub fn bars(&self) -> &[DailyOhlcv] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Closing prices in date order
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.data.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.data.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.data.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.data.low).collect()
    }

    /// Volumes as floats, ready for ratio arithmetic
    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.data.volume as f64).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.data.close)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Whether any bar falls on a Saturday or Sunday
    pub fn has_weekend_bars(&self) -> bool {
        self.bars.iter().any(|b| is_weekend(b.date))
    }

    /// The last `n` bars (or all of them) as a new series
    pub fn tail(&self, n: usize) -> PriceSeries {
        let start = self.bars.len().saturating_sub(n);
        PriceSeries {
            bars: self.bars[start..].to_vec(),
        }
    }
}

pub(crate) fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `count` consecutive weekdays starting at `start` (rolled forward off a weekend)
pub fn trading_days(start: NaiveDate, count: usize) -> Result<Vec<NaiveDate>> {
    let mut dates = Vec::with_capacity(count);
    let mut current = start;
    while dates.len() < count {
        if !is_weekend(current) {
            dates.push(current);
        }
        current = current
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ForecastError::DataError("Date out of range".to_string()))?;
    }
    Ok(dates)
}

/// Data loader for daily price series
#[derive(Debug)]
pub struct DataLoader;

/// Column names resolved from a DataFrame header
#[derive(Debug)]
struct OhlcvColumns {
    date: String,
    open: Option<String>,
    high: Option<String>,
    low: Option<String>,
    close: String,
    volume: Option<String>,
}

impl DataLoader {
    /// Load a price series from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df)
    }

    /// Create a price series from an existing DataFrame.
    ///
    /// Missing open/high/low columns fall back to the close; a missing volume
    /// column reads as zero volume.
    pub fn from_dataframe(df: &DataFrame) -> Result<PriceSeries> {
        let columns = Self::detect_columns(df)?;

        let dates = Self::column_as_dates(df, &columns.date)?;
        let closes = Self::column_as_f64(df, &columns.close)?;
        let opens = match &columns.open {
            Some(name) => Self::column_as_f64(df, name)?,
            None => closes.clone(),
        };
        let highs = match &columns.high {
            Some(name) => Self::column_as_f64(df, name)?,
            None => closes.clone(),
        };
        let lows = match &columns.low {
            Some(name) => Self::column_as_f64(df, name)?,
            None => closes.clone(),
        };
        let volumes = match &columns.volume {
            Some(name) => Self::column_as_u64(df, name)?,
            None => vec![0; closes.len()],
        };

        let bars = (0..dates.len())
            .map(|i| DailyOhlcv {
                date: dates[i],
                data: OhlcvData {
                    open: opens[i],
                    high: highs[i],
                    low: lows[i],
                    close: closes[i],
                    volume: volumes[i],
                },
            })
            .collect();

        PriceSeries::new(bars)
    }

    /// Detect the date and OHLCV columns by name
    fn detect_columns(df: &DataFrame) -> Result<OhlcvColumns> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let find = |needle: &str| {
            names
                .iter()
                .find(|n| n.to_lowercase().contains(needle))
                .cloned()
        };

        let date = find("date")
            .or_else(|| find("time"))
            .or_else(|| {
                df.get_columns()
                    .first()
                    .filter(|c| c.dtype().is_temporal())
                    .map(|c| c.name().to_string())
            })
            .ok_or_else(|| ForecastError::DataError("No date column found in data".to_string()))?;

        // "adj close" would also match "close"; prefer the plain column
        let close = names
            .iter()
            .find(|n| n.to_lowercase() == "close")
            .cloned()
            .or_else(|| find("close"))
            .or_else(|| find("price"))
            .ok_or_else(|| {
                ForecastError::DataError("No close price column found in data".to_string())
            })?;

        Ok(OhlcvColumns {
            date,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close,
            volume: find("vol"),
        })
    }

    fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
        let col = df.column(name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", name, e))
        })?;
        let cast = col.cast(&DataType::Float64)?;
        cast.f64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    ForecastError::DataError(format!("Missing value in '{}' at row {}", name, row))
                })
            })
            .collect()
    }

    fn column_as_u64(df: &DataFrame, name: &str) -> Result<Vec<u64>> {
        Self::column_as_f64(df, name)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                if value.is_finite() && value >= 0.0 {
                    Ok(value.round() as u64)
                } else {
                    Err(ForecastError::InvalidSeries(format!(
                        "Negative volume {} at row {}",
                        value, row
                    )))
                }
            })
            .collect()
    }

    fn column_as_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
        let col = df.column(name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", name, e))
        })?;

        match col.dtype() {
            DataType::Utf8 => col
                .utf8()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    let text = value.ok_or_else(|| {
                        ForecastError::DataError(format!("Missing date at row {}", row))
                    })?;
                    parse_date(text)
                })
                .collect(),
            DataType::Date | DataType::Datetime(_, _) => {
                let days = col.cast(&DataType::Date)?.cast(&DataType::Int32)?;
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                    .ok_or_else(|| ForecastError::DataError("Invalid epoch".to_string()))?;
                days.i32()?
                    .into_iter()
                    .enumerate()
                    .map(|(row, value)| {
                        let offset = value.ok_or_else(|| {
                            ForecastError::DataError(format!("Missing date at row {}", row))
                        })?;
                        let shifted = if offset >= 0 {
                            epoch.checked_add_days(Days::new(offset as u64))
                        } else {
                            epoch.checked_sub_days(Days::new(offset.unsigned_abs() as u64))
                        };
                        shifted.ok_or_else(|| {
                            ForecastError::DataError(format!("Date out of range at row {}", row))
                        })
                    })
                    .collect()
            }
            other => Err(ForecastError::DataError(format!(
                "Column '{}' of type {} cannot be read as dates",
                name, other
            ))),
        }
    }
}

/// Parse `YYYY-MM-DD`, ignoring any time-of-day suffix
fn parse_date(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    let day_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
        .map_err(|e| ForecastError::DataError(format!("Invalid date '{}': {}", text, e)))
}
