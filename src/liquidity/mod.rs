//! Liquidity Analyzer - Order-book depth into per-exchange market metrics
//!
//! Computes, for one market:
//! - Notional liquidity resting on both sides of each exchange's book
//! - Book depth (level count) and top-of-book spread
//! - Market share of total liquidity, in percent
//! - Dominance: market share boosted by up to 10% for deep books

use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{ExchangeMetrics, OrderBookSnapshot};

/// Depth (levels) at which the dominance bonus saturates
const FULL_DEPTH_LEVELS: f64 = 20.0;

/// Maximum dominance bonus for a full-depth book
const DEPTH_BONUS: f64 = 0.1;

/// Per-exchange metrics for `market`, sorted by dominance, descending
///
/// When an exchange supplies several snapshots for the market the most
/// recent one is used.
pub fn compute_exchange_liquidity(
    order_books: &[OrderBookSnapshot],
    market: &str,
) -> Vec<ExchangeMetrics> {
    let mut latest: BTreeMap<&str, &OrderBookSnapshot> = BTreeMap::new();
    for book in order_books.iter().filter(|b| b.market == market) {
        latest
            .entry(book.exchange.as_str())
            .and_modify(|current| {
                if book.timestamp >= current.timestamp {
                    *current = book;
                }
            })
            .or_insert(book);
    }

    let mut metrics: Vec<ExchangeMetrics> = latest
        .values()
        .map(|book| ExchangeMetrics {
            exchange: book.exchange.clone(),
            liquidity: book.bid_liquidity() + book.ask_liquidity(),
            market_share: 0.0,
            dominance: 0.0,
            depth: book.depth(),
            spread: book.spread(),
        })
        .collect();

    let total_liquidity: f64 = metrics.iter().map(|m| m.liquidity).sum();

    for m in metrics.iter_mut() {
        m.market_share = if total_liquidity > 0.0 {
            100.0 * m.liquidity / total_liquidity
        } else {
            0.0
        };
        m.dominance = dominance(m.market_share, m.depth);
    }

    metrics.sort_by(|a, b| {
        b.dominance
            .total_cmp(&a.dominance)
            .then_with(|| a.exchange.cmp(&b.exchange))
    });

    debug!(
        market,
        exchanges = metrics.len(),
        total_liquidity,
        "Computed exchange liquidity"
    );

    metrics
}

/// Market share weighted by book depth
pub fn dominance(market_share: f64, depth: usize) -> f64 {
    let depth_factor = (depth as f64 / FULL_DEPTH_LEVELS).min(1.0);
    market_share * (1.0 + DEPTH_BONUS * depth_factor)
}

/// The exchange holding the largest market share, if any
pub fn top_exchange(metrics: &[ExchangeMetrics]) -> Option<&ExchangeMetrics> {
    metrics
        .iter()
        .max_by(|a, b| a.market_share.total_cmp(&b.market_share))
}
