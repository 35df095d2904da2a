//! Consensus Engine - One-call market report
//!
//! Runs the full pipeline for one market:
//!
//! ```text
//! order books ──► liquidity ──► exchange metrics ─┐
//!                                                 ▼
//! candles ─────────────────────────────────► aggregator ──► candles
//!    │                                            │
//!    │                                     fair value ──► efficiency
//!    ▼
//! normalized series
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::config::{AggregationConfig, AggregationMethod, CenterMethod};
use crate::liquidity::compute_exchange_liquidity;
use crate::oracle::{
    analyze_market_efficiency, attach_metrics, compute_fair_value, normalize_exchange_prices,
    CandleAggregator, EfficiencyReport, ExchangeCandles,
};
use crate::types::{
    usable_candles, AggregatedCandle, Candle, ExchangeMetrics, NormalizedPoint, OrderBookSnapshot,
    Timeframe,
};

/// Raw per-exchange inputs for one or more markets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub order_books: Vec<OrderBookSnapshot>,
    /// Candles keyed by exchange
    #[serde(default)]
    pub candles: BTreeMap<String, Vec<Candle>>,
}

impl MarketSnapshot {
    /// Candles of `market` only, dropping exchanges left empty
    pub fn candles_for(&self, market: &str) -> BTreeMap<String, Vec<Candle>> {
        self.candles
            .iter()
            .filter_map(|(exchange, candles)| {
                let filtered: Vec<Candle> = candles
                    .iter()
                    .filter(|c| c.market == market)
                    .cloned()
                    .collect();
                (!filtered.is_empty()).then(|| (exchange.clone(), filtered))
            })
            .collect()
    }

    /// Whether any candle or order book belongs to `market`
    pub fn has_market(&self, market: &str) -> bool {
        self.order_books.iter().any(|b| b.market == market)
            || self
                .candles
                .values()
                .flatten()
                .any(|c| c.market == market)
    }
}

/// Last close of one exchange relative to fair value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDeviation {
    pub exchange: String,
    pub last_close: f64,
    /// Percent above (positive) or below fair value
    pub deviation_pct: f64,
}

/// Everything the presentation layer needs for one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub market: String,
    pub timeframe: Timeframe,
    pub method: AggregationMethod,
    pub exchange_metrics: Vec<ExchangeMetrics>,
    /// Usable aggregated candles, degenerate buckets removed
    pub candles: Vec<AggregatedCandle>,
    pub degenerate_buckets: usize,
    pub fair_value: f64,
    pub efficiency: EfficiencyReport,
    pub deviations: Vec<ExchangeDeviation>,
    pub normalized: BTreeMap<String, Vec<NormalizedPoint>>,
}

impl MarketReport {
    pub fn last_candle(&self) -> Option<&AggregatedCandle> {
        self.candles.last()
    }
}

/// Stateless facade over the engine's operations
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    aggregator: CandleAggregator,
    center_method: CenterMethod,
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(AggregationConfig::default(), CenterMethod::default())
    }
}

impl ConsensusEngine {
    pub fn new(config: AggregationConfig, center_method: CenterMethod) -> Self {
        Self {
            aggregator: CandleAggregator::new(config),
            center_method,
        }
    }

    pub fn config(&self) -> &AggregationConfig {
        self.aggregator.config()
    }

    pub fn compute_exchange_liquidity(
        &self,
        order_books: &[OrderBookSnapshot],
        market: &str,
    ) -> Vec<ExchangeMetrics> {
        compute_exchange_liquidity(order_books, market)
    }

    pub fn aggregate(&self, exchanges: &[ExchangeCandles]) -> Vec<AggregatedCandle> {
        self.aggregator.aggregate(exchanges)
    }

    pub fn normalize(
        &self,
        exchange_candles: &BTreeMap<String, Vec<Candle>>,
    ) -> BTreeMap<String, Vec<NormalizedPoint>> {
        normalize_exchange_prices(exchange_candles, self.center_method, self.config().timeframe())
    }

    /// Build the full report for `market`
    ///
    /// A market with no candles or books yields an empty report.
    pub fn build_report(&self, snapshot: &MarketSnapshot, market: &str) -> MarketReport {
        let candles = snapshot.candles_for(market);

        let metrics = compute_exchange_liquidity(&snapshot.order_books, market);
        let exchanges = attach_metrics(&candles, &metrics);

        let aggregated = self.aggregate(&exchanges);
        let degenerate_buckets = aggregated.iter().filter(|c| c.is_degenerate()).count();
        let usable: Vec<AggregatedCandle> = usable_candles(&aggregated).cloned().collect();

        let fair_value = compute_fair_value(&exchanges, usable.last(), market);
        let efficiency = analyze_market_efficiency(&exchanges, fair_value, market);
        let deviations = deviations(&exchanges, fair_value, market);
        let normalized = self.normalize(&candles);

        info!(
            market,
            exchanges = metrics.len(),
            candles = usable.len(),
            degenerate_buckets,
            fair_value,
            efficiency = efficiency.score,
            "Built market report"
        );

        MarketReport {
            market: market.to_string(),
            timeframe: self.config().timeframe(),
            method: self.config().method(),
            exchange_metrics: metrics,
            candles: usable,
            degenerate_buckets,
            fair_value,
            efficiency,
            deviations,
            normalized,
        }
    }
}

/// Per-exchange deviation of the last close from fair value
pub fn deviations(
    exchanges: &[ExchangeCandles],
    fair_value: f64,
    market: &str,
) -> Vec<ExchangeDeviation> {
    exchanges
        .iter()
        .filter_map(|set| {
            let last = set.last_candle(market)?;
            let deviation_pct = if fair_value != 0.0 {
                (last.close - fair_value) / fair_value * 100.0
            } else {
                0.0
            };
            Some(ExchangeDeviation {
                exchange: set.exchange.clone(),
                last_close: last.close,
                deviation_pct,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookLevel;

    fn candle(exchange: &str, market: &str, ts: i64, close: f64) -> Candle {
        Candle {
            timestamp: ts,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 2.0,
            exchange: exchange.to_string(),
            market: market.to_string(),
        }
    }

    fn book(exchange: &str, market: &str, size: f64) -> OrderBookSnapshot {
        OrderBookSnapshot {
            exchange: exchange.to_string(),
            market: market.to_string(),
            bids: vec![BookLevel::new(99.0, size)],
            asks: vec![BookLevel::new(101.0, size)],
            timestamp: 0,
        }
    }

    #[test]
    fn test_empty_market_yields_empty_report() {
        let engine = ConsensusEngine::default();
        let report = engine.build_report(&MarketSnapshot::default(), "BTC/USDT");
        assert_eq!(report.market, "BTC/USDT");
        assert!(report.exchange_metrics.is_empty());
        assert!(report.candles.is_empty());
        assert!(report.deviations.is_empty());
        assert!(report.normalized.is_empty());
        assert_eq!(report.degenerate_buckets, 0);
        assert_eq!(report.fair_value, 0.0);
        assert_eq!(report.efficiency, EfficiencyReport::default());
        assert!(report.last_candle().is_none());
    }

    #[test]
    fn test_has_market() {
        let mut snapshot = MarketSnapshot::default();
        assert!(!snapshot.has_market("BTC"));
        snapshot
            .candles
            .insert("kraken".to_string(), vec![candle("kraken", "ETH", 0, 2.0)]);
        assert!(snapshot.has_market("ETH"));
        assert!(!snapshot.has_market("BTC"));
        snapshot.order_books.push(book("binance", "BTC", 1.0));
        assert!(snapshot.has_market("BTC"));
    }

    #[test]
    fn test_candles_for_filters_market() {
        let mut snapshot = MarketSnapshot::default();
        snapshot.candles.insert(
            "binance".to_string(),
            vec![candle("binance", "BTC", 0, 1.0), candle("binance", "ETH", 0, 2.0)],
        );
        snapshot
            .candles
            .insert("kraken".to_string(), vec![candle("kraken", "ETH", 0, 2.0)]);
        let btc = snapshot.candles_for("BTC");
        assert_eq!(btc.len(), 1);
        assert_eq!(btc["binance"].len(), 1);
    }

    #[test]
    fn test_report_pipeline() {
        let mut snapshot = MarketSnapshot::default();
        snapshot.order_books = vec![book("binance", "BTC", 3.0), book("kraken", "BTC", 1.0)];
        snapshot.candles.insert(
            "binance".to_string(),
            vec![candle("binance", "BTC", 0, 100.0), candle("binance", "BTC", 60_000, 100.0)],
        );
        snapshot.candles.insert(
            "kraken".to_string(),
            vec![candle("kraken", "BTC", 0, 104.0), candle("kraken", "BTC", 60_000, 104.0)],
        );

        let engine = ConsensusEngine::default();
        let report = engine.build_report(&snapshot, "BTC");

        assert_eq!(report.candles.len(), 2);
        assert_eq!(report.degenerate_buckets, 0);
        assert_eq!(report.exchange_metrics[0].exchange, "binance");
        assert!((report.fair_value - 101.0).abs() < 1e-9);
        assert!(report.efficiency.highly_concentrated);
        assert_eq!(report.normalized["kraken"].len(), 2);

        let kraken = report
            .deviations
            .iter()
            .find(|d| d.exchange == "kraken")
            .unwrap();
        assert!((kraken.deviation_pct - 3.0 / 101.0 * 100.0).abs() < 1e-9);
    }
}
