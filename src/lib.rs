//! Exchange Consensus Library
//!
//! Aggregation and statistics engine that turns per-exchange candles and
//! order books into one consolidated market view

pub mod config;
pub mod engine;
pub mod error;
pub mod liquidity;
pub mod oracle;
pub mod stats;
pub mod types;

pub use config::{
    AggregationConfig, AggregationMethod, CenterMethod, OutlierConfig, OutlierMethod, Preset,
};
pub use engine::{ConsensusEngine, ExchangeDeviation, MarketReport, MarketSnapshot};
pub use error::{ConfigError, EngineError};
pub use liquidity::compute_exchange_liquidity;
pub use oracle::{
    aggregate_candles, compute_fair_value, compute_market_efficiency, normalize_exchange_prices,
    ExchangeCandles,
};
