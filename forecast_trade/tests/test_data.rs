use chrono::NaiveDate;
use forecast_trade::data::{trading_days, DailyOhlcv, DataLoader, OhlcvData, PriceSeries};
use forecast_trade::{ForecastConfig, ForecastEngine, ForecastError};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_data_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,open,high,low,close,volume").unwrap();
    writeln!(file, "2023-01-03,100.0,105.0,98.0,103.0,1000").unwrap();
    writeln!(file, "2023-01-04,103.0,107.0,101.0,106.0,1200").unwrap();
    writeln!(file, "2023-01-05,106.0,110.0,104.0,108.0,1500").unwrap();

    let series = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.closes(), vec![103.0, 106.0, 108.0]);
    assert_eq!(series.highs(), vec![105.0, 107.0, 110.0]);
    assert_eq!(series.volumes(), vec![1000.0, 1200.0, 1500.0]);
    assert_eq!(series.last_date(), Some(date(2023, 1, 5)));
}

#[test]
fn test_close_only_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Adj Close,Close").unwrap();
    writeln!(file, "2023-01-03,90.0,101.0").unwrap();
    writeln!(file, "2023-01-04,91.0,102.0").unwrap();

    let series = DataLoader::from_csv(file.path()).unwrap();
    let bar = &series.bars()[1];
    assert_eq!(bar.data.close, 102.0);
    assert_eq!(bar.data.open, 102.0);
    assert_eq!(bar.data.volume, 0);
}

#[test]
fn test_csv_forecast_end_to_end() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,open,high,low,close,volume").unwrap();
    for (i, day) in trading_days(date(2023, 1, 2), 80).unwrap().iter().enumerate() {
        let close = 40.0 + 0.1 * i as f64 + (i as f64 * 0.6).sin();
        writeln!(
            file,
            "{},{:.4},{:.4},{:.4},{:.4},{}",
            day,
            close - 0.2,
            close + 0.5,
            close - 0.5,
            close,
            10_000 + i * 10
        )
        .unwrap();
    }

    let series = DataLoader::from_csv(file.path()).unwrap();
    let engine = ForecastEngine::new(ForecastConfig::default().with_seed(11)).unwrap();
    let current = series.last_close().unwrap();
    let report = engine.generate_forecast(&series, current, 7).unwrap();

    assert_eq!(report.history_bars, 80);
    assert_eq!(report.ensemble.predicted_path.len(), 7);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = DataLoader::from_csv("/nonexistent/path.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));
}

#[test]
fn test_unordered_dates_are_rejected() {
    let bars = vec![
        DailyOhlcv::flat(date(2023, 1, 4), 10.0, 100),
        DailyOhlcv::flat(date(2023, 1, 3), 11.0, 100),
    ];
    assert!(matches!(
        PriceSeries::new(bars),
        Err(ForecastError::InvalidSeries(_))
    ));
}

#[test]
fn test_inverted_range_is_rejected() {
    let bar = DailyOhlcv {
        date: date(2023, 1, 3),
        data: OhlcvData {
            open: 10.0,
            high: 9.0,
            low: 11.0,
            close: 10.0,
            volume: 5,
        },
    };
    assert!(PriceSeries::new(vec![bar]).is_err());
}

#[test]
fn test_tail_keeps_latest_bars() {
    let series = PriceSeries::from_closes(date(2023, 1, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(series.tail(2).closes(), vec![3.0, 4.0]);
    assert_eq!(series.tail(10).len(), 4);
    assert!(!series.has_weekend_bars());
}
