//! Consensus report
//!
//! Usage: consensus-report [snapshot.json]
//!
//! Reads a market snapshot (order books + per-exchange candles), builds the
//! consensus report for the configured market and prints it as JSON.

use anyhow::{Context, Result};
use std::fs;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use exchange_consensus::config::{AppConfig, LogConfig};
use exchange_consensus::{ConsensusEngine, EngineError, MarketSnapshot};

fn main() -> Result<()> {
    let app = AppConfig::load()?;
    init_logging(&app.log);

    info!(config = %app, "Starting consensus report");

    let path = std::env::args()
        .nth(1)
        .or_else(|| app.report.input_path.clone())
        .context("No snapshot given: pass a path or set report.input_path")?;

    let json = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let snapshot: MarketSnapshot =
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path))?;

    if !snapshot.has_market(&app.report.market) {
        return Err(EngineError::EmptyMarket {
            market: app.report.market.clone(),
        })
        .with_context(|| format!("Nothing to report in {}", path));
    }

    let engine = ConsensusEngine::new(app.aggregation_config()?, app.center_method()?);
    let report = engine.build_report(&snapshot, &app.report.market);

    for candle in &report.candles {
        debug!(
            time = %candle
                .start_time()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| candle.time.to_string()),
            close = candle.close,
            exchanges = candle.stats.exchange_count,
            confidence = candle.stats.confidence_score,
            "Aggregated candle"
        );
    }

    if report.degenerate_buckets > 0 {
        warn!(
            buckets = report.degenerate_buckets,
            "Buckets without usable data were left out"
        );
    }

    info!(
        market = %report.market,
        fair_value = report.fair_value,
        efficiency = report.efficiency.score,
        highly_concentrated = report.efficiency.highly_concentrated,
        "Report ready"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Logs go to stderr so stdout stays valid JSON
fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
