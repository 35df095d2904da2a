//! Per-sample weights for each aggregation method

use crate::config::AggregationMethod;
use crate::types::{Candle, ExchangeMetrics};

/// Weight of one exchange's candle under `method`
///
/// Metric-based methods weigh 0 when the exchange has no metrics entry.
/// Median and TWAP take a separate path in the aggregator and weigh 1 here.
pub fn calculate_weight(
    method: AggregationMethod,
    candle: &Candle,
    metrics: Option<&ExchangeMetrics>,
) -> f64 {
    let weight = match method {
        AggregationMethod::Vwap => candle.volume,
        AggregationMethod::MarketShare => metrics.map(|m| m.market_share / 100.0).unwrap_or(0.0),
        AggregationMethod::Liquidity => metrics.map(|m| m.liquidity).unwrap_or(0.0),
        AggregationMethod::Dominance => metrics.map(|m| m.dominance / 100.0).unwrap_or(0.0),
        AggregationMethod::Equal | AggregationMethod::Median | AggregationMethod::Twap => 1.0,
    };
    weight.max(0.0)
}
