//! Configuration management for the consensus engine
//!
//! `AggregationConfig` is the per-call engine configuration. `AppConfig`
//! loads the report binary's settings from YAML files + environment
//! variables via .env

mod types;

pub use types::*;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::Timeframe;

/// Report binary configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub report: ReportConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Named preset the overrides below are applied to
    pub preset: String,
    /// Overrides the preset's aggregation method
    pub method: Option<String>,
    /// Candle timeframe (1m, 5m, 15m, 1h, ...)
    pub timeframe: String,
    pub min_exchanges: Option<usize>,
    /// Set false to switch off the preset's outlier detection
    pub outlier_enabled: Option<bool>,
    pub outlier_method: Option<String>,
    pub outlier_threshold: Option<f64>,
    /// Center price for normalized series (first, average, median)
    pub center_method: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Market symbol to report on
    pub market: String,
    /// JSON snapshot file to read; the first CLI argument takes precedence
    pub input_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (CONSENSUS__*)
            .add_source(Environment::with_prefix("CONSENSUS").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Fail fast on unknown names rather than at report time
        app_config
            .aggregation_config()
            .context("Invalid engine configuration")?;
        app_config
            .center_method()
            .context("Invalid engine configuration")?;

        Ok(app_config)
    }

    /// Register every default on the builder
    pub fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>> {
        let builder = builder
            .set_default("engine.preset", "standard")?
            .set_default("engine.timeframe", "1m")?
            .set_default("engine.center_method", "first")?
            .set_default("report.market", "BTC/USDT")?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?;
        Ok(builder)
    }

    /// Resolve the preset plus overrides into a validated config
    pub fn aggregation_config(&self) -> std::result::Result<AggregationConfig, ConfigError> {
        let engine = &self.engine;
        let preset: Preset = engine.preset.parse()?;
        let timeframe: Timeframe = engine.timeframe.parse()?;

        let mut config = AggregationConfig::preset(preset).with_timeframe(timeframe);

        if let Some(method) = &engine.method {
            config = config.with_method(method.parse()?);
        }

        if let Some(min_exchanges) = engine.min_exchanges {
            config = config.with_min_exchanges(min_exchanges)?;
        }

        if engine.outlier_method.is_some() || engine.outlier_threshold.is_some() {
            let method = match &engine.outlier_method {
                Some(name) => name.parse()?,
                None => config
                    .outlier_detection()
                    .map(|o| o.method)
                    .unwrap_or(OutlierMethod::Iqr),
            };
            let threshold = engine
                .outlier_threshold
                .unwrap_or_else(|| method.default_threshold());
            config = config.with_outlier_detection(OutlierConfig::new(method, threshold)?)?;
        }

        if engine.outlier_enabled == Some(false) {
            config = config.without_outlier_detection();
        }

        Ok(config)
    }

    pub fn center_method(&self) -> std::result::Result<CenterMethod, ConfigError> {
        self.engine.center_method.parse()
    }

    /// Generate a one-line digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "preset={} method={:?} timeframe={} market={} center={}",
            self.engine.preset,
            self.engine.method,
            self.engine.timeframe,
            self.report.market,
            self.engine.center_method
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
