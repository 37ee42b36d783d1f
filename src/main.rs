//! # Levelforge Command Line Entry Point
//!
//! Synthesizes levels from the offline provider and prints them.

use clap::Parser;
use levelforge::{
    cancellation, LevelSynthesizer, LevelforgeResult, OfflineProvider, OfflineProviderConfig,
    QuotaFlag, SynthesisConfig, SynthesisOutcome,
};
use log::{error, info};
use serde_json::json;
use std::time::Duration;

/// Command line arguments for Levelforge.
#[derive(Parser, Debug)]
#[command(name = "levelforge")]
#[command(about = "Synthesizes connected tile-based levels from an unreliable content source")]
#[command(version)]
struct Args {
    /// Ordinal of the first level to synthesize
    #[arg(short, long, default_value_t = 1)]
    ordinal: u32,

    /// Number of consecutive levels to synthesize
    #[arg(short, long, default_value_t = 1)]
    count: u32,

    /// Random seed for the offline provider
    #[arg(short, long)]
    seed: Option<u64>,

    /// Chance of a simulated transient provider fault per request (0.0 to 1.0)
    #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
    failure_rate: f64,

    /// Provider requests served before the quota runs out
    #[arg(long)]
    quota_after: Option<u32>,

    /// Base backoff delay in milliseconds
    #[arg(long, default_value_t = levelforge::config::DEFAULT_BACKOFF_MS)]
    backoff_ms: u64,

    /// Print levels and reports as JSON instead of ASCII maps
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> LevelforgeResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level);

    info!("Starting Levelforge v{}", levelforge::VERSION);

    let mut provider_config = OfflineProviderConfig::new(args.seed.unwrap_or(12345));
    provider_config.failure_rate = args.failure_rate;
    provider_config.quota_budget = args.quota_after;

    let synthesizer = LevelSynthesizer::new(OfflineProvider::new(provider_config), QuotaFlag::new())
        .with_config(SynthesisConfig::new(Duration::from_millis(args.backoff_ms)));

    // Ctrl-C cancels the level in flight
    let (handle, mut signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    for ordinal in args.ordinal..args.ordinal.saturating_add(args.count) {
        let report = match synthesizer.synthesize_with_cancel(ordinal, &mut signal).await {
            Ok(report) => report,
            Err(e) => {
                error!("Stopped at level {}: {}", ordinal, e);
                return Err(e);
            }
        };

        if args.json {
            let output = json!({
                "outcome": report.outcome,
                "providerCalls": report.provider_calls,
                "level": report.level,
                "events": report.events,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            let outcome = match report.outcome {
                SynthesisOutcome::Generated => "generated",
                SynthesisOutcome::Fallback => "fallback",
            };
            println!(
                "Level {} ({}, {}, {} provider call(s))",
                ordinal, report.level.theme, outcome, report.provider_calls
            );
            println!("{}", report.level);
        }
    }

    Ok(())
}

/// Parses a probability, rejecting anything outside `0.0..=1.0` (NaN included).
fn parse_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", value, e))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("'{}' is not between 0.0 and 1.0", value))
    }
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) {
    #[cfg(feature = "dev-tools")]
    {
        use tracing_subscriber::EnvFilter;

        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .format_target(false)
            .init();
    }
}
