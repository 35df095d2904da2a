//! Error types for the consensus engine
//!
//! Numeric edge cases and empty inputs never error; only misconfiguration
//! and a report request for a market the input never mentions do.

use thiserror::Error;

/// Configuration errors, raised when a config is parsed or constructed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown aggregation method: {0}")]
    UnknownMethod(String),

    #[error("Unknown outlier method: {0}")]
    UnknownOutlierMethod(String),

    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("Unknown center method: {0}")]
    UnknownCenterMethod(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid outlier threshold: {0} (must be finite and positive)")]
    InvalidThreshold(f64),

    #[error("Invalid min_exchanges: must be at least 1")]
    InvalidMinExchanges,
}

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Raised by the report binary, not by the library pipeline
    #[error("No candles or order books for market: {market}")]
    EmptyMarket { market: String },
}
