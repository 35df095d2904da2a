//! Oracle module - Multi-exchange consensus pricing
//!
//! Aggregates candles from every exchange reporting a market into one
//! confidence-scored OHLCV series, and derives the liquidity-weighted fair
//! value and market efficiency from the same data.

pub mod aggregator;
pub mod confidence;
pub mod efficiency;
pub mod fair_value;
pub mod sync;

pub use aggregator::{aggregate_candles, attach_metrics, CandleAggregator, ExchangeCandles};
pub use confidence::{confidence_score, ConfidenceFactors};
pub use efficiency::{
    analyze_market_efficiency, compute_market_efficiency, is_highly_concentrated, EfficiencyReport,
    CONCENTRATION_THRESHOLD,
};
pub use fair_value::{compute_fair_value, priced_exchanges, PricedExchange};
pub use sync::normalize_exchange_prices;
