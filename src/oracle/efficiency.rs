//! Market Efficiency - Price convergence and liquidity distribution score
//!
//! Combines three 0-100 components:
//! - Price efficiency: liquidity-weighted deviation of last closes from fair value
//! - Liquidity efficiency: 1 - Gini coefficient of exchange liquidity
//! - Concentration efficiency: penalizes dispersion of market shares

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::oracle::aggregator::ExchangeCandles;
use crate::liquidity::top_exchange;
use crate::oracle::fair_value::{liquidity_weights, priced_exchanges};
use crate::stats::{gini_coefficient, variance};
use crate::types::ExchangeMetrics;

/// Market share (%) above which a single exchange dominates the market
pub const CONCENTRATION_THRESHOLD: f64 = 40.0;

const PRICE_WEIGHT: f64 = 0.5;
const LIQUIDITY_WEIGHT: f64 = 0.3;
const CONCENTRATION_WEIGHT: f64 = 0.2;

/// Efficiency score with its components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    /// Composite score, 0-100
    pub score: f64,
    pub price_efficiency: f64,
    pub liquidity_efficiency: f64,
    pub concentration_efficiency: f64,
    /// Top exchange holds more than 40% market share
    pub highly_concentrated: bool,
    pub top_exchange: Option<String>,
    pub top_market_share: f64,
}

/// True when any exchange's market share exceeds the concentration threshold
pub fn is_highly_concentrated(metrics: &[ExchangeMetrics]) -> bool {
    metrics
        .iter()
        .any(|m| m.market_share > CONCENTRATION_THRESHOLD)
}

/// Full efficiency breakdown for `market` against `fair_value`
///
/// Concentration covers every exchange carrying metrics, priced or not. The
/// scores only cover exchanges with a last close, and are zero when none has.
/// Zero-liquidity markets weigh exchanges equally for the price component.
pub fn analyze_market_efficiency(
    exchanges: &[ExchangeCandles],
    fair_value: f64,
    market: &str,
) -> EfficiencyReport {
    let metrics: Vec<ExchangeMetrics> = exchanges
        .iter()
        .filter_map(|set| set.metrics.clone())
        .collect();
    let top = top_exchange(&metrics);
    let top_market_share = top.map(|m| m.market_share).unwrap_or(0.0);
    let highly_concentrated = is_highly_concentrated(&metrics);

    if highly_concentrated {
        warn!(
            market,
            exchange = top.map(|m| m.exchange.as_str()).unwrap_or_default(),
            market_share = top_market_share,
            "Market is highly concentrated"
        );
    }

    let concentration = EfficiencyReport {
        highly_concentrated,
        top_exchange: top.map(|m| m.exchange.clone()),
        top_market_share,
        ..EfficiencyReport::default()
    };

    let priced = priced_exchanges(exchanges, market);
    if priced.is_empty() {
        debug!(market, "No priced exchanges, efficiency is zero");
        return concentration;
    }

    let mut weights = liquidity_weights(&priced);
    if weights.is_empty() {
        weights = vec![1.0 / priced.len() as f64; priced.len()];
    }

    let price_efficiency = if fair_value > 0.0 {
        let price_variance: f64 = priced
            .iter()
            .zip(&weights)
            .map(|(p, w)| (p.last_close - fair_value).abs() * w)
            .sum();
        (100.0 - (price_variance / fair_value) * 1000.0).max(0.0)
    } else {
        0.0
    };

    let liquidities: Vec<f64> = priced.iter().map(|p| p.metrics.liquidity).collect();
    let liquidity_efficiency = (1.0 - gini_coefficient(&liquidities)) * 100.0;

    let shares: Vec<f64> = priced.iter().map(|p| p.metrics.market_share).collect();
    let concentration_efficiency = (100.0 - variance(&shares).sqrt() * 2.0).max(0.0);

    let score = (PRICE_WEIGHT * price_efficiency
        + LIQUIDITY_WEIGHT * liquidity_efficiency
        + CONCENTRATION_WEIGHT * concentration_efficiency)
        .clamp(0.0, 100.0);

    EfficiencyReport {
        score,
        price_efficiency,
        liquidity_efficiency,
        concentration_efficiency,
        ..concentration
    }
}

/// Composite efficiency score, 0-100
pub fn compute_market_efficiency(
    exchanges: &[ExchangeCandles],
    fair_value: f64,
    market: &str,
) -> f64 {
    analyze_market_efficiency(exchanges, fair_value, market).score
}
