//! Fair Value - Liquidity-weighted consensus price for the latest period

use tracing::debug;

use crate::oracle::aggregator::ExchangeCandles;
use crate::types::{AggregatedCandle, ExchangeMetrics};

/// Exchange that has both liquidity metrics and a last close in the market
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedExchange<'a> {
    pub metrics: &'a ExchangeMetrics,
    pub last_close: f64,
}

/// Exchanges qualifying for fair value in `market`
pub fn priced_exchanges<'a>(
    exchanges: &'a [ExchangeCandles],
    market: &str,
) -> Vec<PricedExchange<'a>> {
    exchanges
        .iter()
        .filter_map(|set| {
            let metrics = set.metrics.as_ref()?;
            let last = set.last_candle(market)?;
            Some(PricedExchange {
                metrics,
                last_close: last.close,
            })
        })
        .collect()
}

/// Each exchange's share of total liquidity; empty when no liquidity exists
pub fn liquidity_weights(priced: &[PricedExchange<'_>]) -> Vec<f64> {
    let total: f64 = priced.iter().map(|p| p.metrics.liquidity).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    priced.iter().map(|p| p.metrics.liquidity / total).collect()
}

/// Σ(last_close · liquidity share), or the aggregated close as fallback
///
/// The fallback applies when no exchange qualifies or total liquidity is
/// zero; without an aggregated candle it is 0.
pub fn compute_fair_value(
    exchanges: &[ExchangeCandles],
    last_candle: Option<&AggregatedCandle>,
    market: &str,
) -> f64 {
    let fallback = last_candle.map(|c| c.close).unwrap_or(0.0);

    let priced = priced_exchanges(exchanges, market);
    let weights = liquidity_weights(&priced);
    if weights.is_empty() {
        debug!(market, fallback, "No liquidity for fair value, using aggregated close");
        return fallback;
    }

    let fair_value: f64 = priced
        .iter()
        .zip(&weights)
        .map(|(p, w)| p.last_close * w)
        .sum();

    debug!(market, fair_value, exchanges = priced.len(), "Computed fair value");
    fair_value
}
