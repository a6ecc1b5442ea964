use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use forecast_trade::{DataLoader, ForecastConfig, ForecastEngine};

#[derive(Parser, Debug)]
#[command(name = "forecast_report")]
#[command(about = "Ensemble price forecast for a daily OHLCV CSV", long_about = None)]
struct Args {
    /// CSV file with date, open, high, low, close and volume columns
    input: PathBuf,

    /// Forecast horizon in days
    #[arg(short = 'd', long, default_value = "30")]
    horizon: usize,

    /// JSON configuration file; absent fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the stochastic models
    #[arg(short, long)]
    seed: Option<u64>,

    /// Current price (defaults to the last close)
    #[arg(short, long)]
    price: Option<f64>,

    /// Run the models one after another
    #[arg(long)]
    sequential: bool,

    /// Write the ensemble path to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ForecastConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ForecastConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.sequential {
        config = config.with_parallel(false);
    }

    let series = DataLoader::from_csv(&args.input)
        .with_context(|| format!("loading prices from {}", args.input.display()))?;
    let current_price = match args.price.or_else(|| series.last_close()) {
        Some(price) => price,
        None => bail!("{} contains no bars", args.input.display()),
    };
    info!(bars = series.len(), horizon = args.horizon, "prices loaded");

    let engine = ForecastEngine::new(config)?;
    let report = engine.generate_forecast(&series, current_price, args.horizon)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = &args.output {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        writer.write_record(["day", "price"])?;
        for (day, price) in report.ensemble.predicted_path.iter().enumerate() {
            writer.write_record([(day + 1).to_string(), format!("{:.4}", price)])?;
        }
        writer.flush()?;
        info!(path = %path.display(), "ensemble path written");
    }

    Ok(())
}
