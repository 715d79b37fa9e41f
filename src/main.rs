use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use prediction_arb_scanner::{ArbitrageScanner, Config};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Run a single scan and exit.
    Once,
    /// Scan continuously on the configured interval.
    Scheduled,
}

#[derive(Parser)]
#[command(
    name = "prediction-arb-scanner",
    about = "Cross-venue prediction market arbitrage scanner"
)]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Once)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before anything reads them
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::from_env();
    config.validate()?;

    info!("Starting prediction market arbitrage scanner");
    info!("Minimum profit threshold: ${:.2}", config.min_profit_usd);
    info!(
        "Telegram alerts: {}",
        if config.telegram_enabled { "enabled" } else { "disabled" }
    );
    info!(
        "PredictIt venue: {}",
        if config.predictit_enabled { "enabled" } else { "disabled" }
    );

    let scanner = ArbitrageScanner::from_config(&config).await?;

    match args.mode {
        Mode::Once => scanner.run_once().await,
        Mode::Scheduled => {
            // tokio panics on a zero interval
            let minutes = config.scan_interval_minutes.max(1);
            scanner
                .run_scheduled(Duration::from_secs(minutes * 60))
                .await
        }
    }

    Ok(())
}
