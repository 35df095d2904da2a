//! End-to-end tests for the consensus engine public API

use std::collections::BTreeMap;

use exchange_consensus::config::{
    AggregationConfig, AggregationMethod, CenterMethod, OutlierConfig, Preset,
};
use exchange_consensus::oracle::{
    analyze_market_efficiency, is_highly_concentrated, EfficiencyReport,
};
use exchange_consensus::stats::{
    detect_outliers_iqr, gini_coefficient, median, vwap, weighted_median,
};
use exchange_consensus::types::{
    BookLevel, Candle, ExchangeMetrics, OrderBookSnapshot, Timeframe, WeightedValue,
};
use exchange_consensus::{
    aggregate_candles, compute_exchange_liquidity, compute_fair_value, compute_market_efficiency,
    normalize_exchange_prices, ConsensusEngine, ExchangeCandles, MarketSnapshot,
};
use proptest::prelude::*;

const MARKET: &str = "BTC/USDT";

fn make_candle(exchange: &str, ts: i64, close: f64, volume: f64) -> Candle {
    Candle {
        timestamp: ts,
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume,
        exchange: exchange.to_string(),
        market: MARKET.to_string(),
    }
}

fn make_book(exchange: &str, levels: usize, size: f64) -> OrderBookSnapshot {
    OrderBookSnapshot {
        exchange: exchange.to_string(),
        market: MARKET.to_string(),
        bids: (0..levels).map(|i| BookLevel::new(100.0 - i as f64 * 0.1, size)).collect(),
        asks: (0..levels).map(|i| BookLevel::new(100.1 + i as f64 * 0.1, size)).collect(),
        timestamp: 1_700_000_000_000,
    }
}

fn config(method: AggregationMethod) -> AggregationConfig {
    AggregationConfig::new(method, Timeframe::Min1)
}

// ============================================================================
// Aggregation properties
// ============================================================================

#[test]
fn test_vwap_identical_closes_returns_that_close() {
    let exchanges: Vec<ExchangeCandles> = [("a", 1.0), ("b", 250.0), ("c", 0.0), ("d", 7.5)]
        .iter()
        .map(|(e, v)| ExchangeCandles::new(*e, vec![make_candle(e, 1_000, 4321.5, *v)]))
        .collect();
    let candles = aggregate_candles(&exchanges, &config(AggregationMethod::Vwap));
    assert_eq!(candles.len(), 1);
    assert!((candles[0].close - 4321.5).abs() < 1e-9);
}

#[test]
fn test_two_exchange_vwap_scenario() {
    let exchanges = vec![
        ExchangeCandles::new("a", vec![make_candle("a", 0, 100.0, 10.0)]),
        ExchangeCandles::new("b", vec![make_candle("b", 0, 102.0, 30.0)]),
    ];
    let candles = aggregate_candles(&exchanges, &config(AggregationMethod::Vwap));
    assert!((candles[0].close - 101.5).abs() < 1e-9);
}

#[test]
fn test_iqr_scenario_excludes_spike() {
    let closes = [10.0, 10.0, 10.0, 10.0, 100.0];
    let exchanges: Vec<ExchangeCandles> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let name = format!("ex{}", i);
            ExchangeCandles::new(name.clone(), vec![make_candle(&name, 0, *close, 1.0)])
        })
        .collect();
    let cfg = config(AggregationMethod::Vwap)
        .with_outlier_detection(OutlierConfig::iqr())
        .unwrap();
    let candles = aggregate_candles(&exchanges, &cfg);
    assert_eq!(candles[0].close, 10.0);
    assert_eq!(candles[0].stats.outliers_removed, 1);
    assert_eq!(candles[0].volume, 4.0);
}

#[test]
fn test_min_exchanges_three_drops_two_exchange_bucket() {
    let exchanges = vec![
        ExchangeCandles::new("a", vec![make_candle("a", 0, 100.0, 1.0)]),
        ExchangeCandles::new("b", vec![make_candle("b", 0, 100.0, 1.0)]),
    ];
    let cfg = config(AggregationMethod::Vwap).with_min_exchanges(3).unwrap();
    assert!(aggregate_candles(&exchanges, &cfg).is_empty());
}

#[test]
fn test_degenerate_bucket_has_zero_confidence() {
    // Every close sits one std-dev from the mean
    let closes = [1.0, 1.0, 9.0, 9.0];
    let exchanges: Vec<ExchangeCandles> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let name = format!("ex{}", i);
            ExchangeCandles::new(name.clone(), vec![make_candle(&name, 0, *close, 1.0)])
        })
        .collect();
    let outliers = OutlierConfig::new(exchange_consensus::OutlierMethod::ZScore, 0.5).unwrap();
    let cfg = config(AggregationMethod::Equal).with_outlier_detection(outliers).unwrap();
    let candles = aggregate_candles(&exchanges, &cfg);
    assert_eq!(candles.len(), 1);
    assert!(candles[0].is_degenerate());
    assert_eq!(candles[0].stats.confidence_score, 0.0);
    assert_eq!(candles[0].stats.outliers_removed, 4);
}

#[test]
fn test_aggregation_is_deterministic() {
    let exchanges: Vec<ExchangeCandles> = ["a", "b", "c"]
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let candles = (0..50)
                .map(|n| {
                    let close = 100.0 + i as f64 + (n % 7) as f64;
                    make_candle(e, n * 20_000, close, 1.0 + n as f64)
                })
                .collect();
            ExchangeCandles::new(*e, candles)
        })
        .collect();
    let cfg = AggregationConfig::preset(Preset::Standard);
    assert_eq!(aggregate_candles(&exchanges, &cfg), aggregate_candles(&exchanges, &cfg));
}

// ============================================================================
// Statistics properties
// ============================================================================

#[test]
fn test_weighted_median_unit_weights_matches_median() {
    let values = [3.0, 9.0, 1.0, 4.0, 7.0];
    let weighted: Vec<WeightedValue> = values.iter().copied().map(WeightedValue::unit).collect();
    assert_eq!(weighted_median(&weighted), median(&values));
}

#[test]
fn test_iqr_small_input_never_flags() {
    assert!(detect_outliers_iqr(&[1.0, 1e9, -1e9], 0.01).is_empty());
}

#[test]
fn test_gini_extremes() {
    assert!(gini_coefficient(&[5.0, 5.0, 5.0, 5.0]).abs() < 1e-9);
    assert!((gini_coefficient(&[0.0, 0.0, 0.0, 100.0]) - 0.75).abs() < 1e-9);
}

#[test]
fn test_vwap_edge_cases() {
    assert_eq!(vwap(&[]), 0.0);
    assert_eq!(vwap(&[(10.0, 0.0), (20.0, 0.0)]), 15.0);
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn test_first_center_is_zero_at_first_bucket() {
    let mut input = BTreeMap::new();
    input.insert(
        "a".to_string(),
        vec![make_candle("a", 0, 50.0, 1.0), make_candle("a", 60_000, 55.0, 1.0)],
    );
    input.insert(
        "b".to_string(),
        vec![make_candle("b", 60_000, 200.0, 1.0), make_candle("b", 120_000, 190.0, 1.0)],
    );
    let series = normalize_exchange_prices(&input, CenterMethod::First, Timeframe::Min1);
    assert_eq!(series["a"][0].value, 0.0);
    assert_eq!(series["b"][1].value, 0.0);
    assert_eq!(series["a"].len(), series["b"].len());
}

// ============================================================================
// Liquidity, fair value, efficiency
// ============================================================================

#[test]
fn test_liquidity_to_fair_value() {
    let books = vec![make_book("binance", 10, 5.0), make_book("okx", 5, 5.0)];
    let metrics = compute_exchange_liquidity(&books, MARKET);
    assert_eq!(metrics[0].exchange, "binance");
    let share_sum: f64 = metrics.iter().map(|m| m.market_share).sum();
    assert!((share_sum - 100.0).abs() < 1e-9);

    let mut candles = BTreeMap::new();
    candles.insert("binance".to_string(), vec![make_candle("binance", 0, 100.0, 1.0)]);
    candles.insert("okx".to_string(), vec![make_candle("okx", 0, 100.0, 1.0)]);
    let exchanges = exchange_consensus::oracle::attach_metrics(&candles, &metrics);

    let aggregated = aggregate_candles(&exchanges, &config(AggregationMethod::Liquidity));
    let fair = compute_fair_value(&exchanges, aggregated.last(), MARKET);
    assert!((fair - 100.0).abs() < 1e-9);
    let score = compute_market_efficiency(&exchanges, fair, MARKET);
    assert!((0.0..=100.0).contains(&score));
}

#[test]
fn test_dominant_exchange_flags_concentration() {
    let shares = [("a", 70.0), ("b", 10.0), ("c", 10.0), ("d", 10.0)];
    let exchanges: Vec<ExchangeCandles> = shares
        .iter()
        .map(|(e, share)| {
            let metrics = ExchangeMetrics {
                exchange: e.to_string(),
                liquidity: share * 1_000.0,
                market_share: *share,
                dominance: *share,
                depth: 20,
                spread: 0.1,
            };
            ExchangeCandles::new(*e, vec![make_candle(e, 0, 100.0, 1.0)]).with_metrics(metrics)
        })
        .collect();
    let report = analyze_market_efficiency(&exchanges, 100.0, MARKET);
    assert!(report.highly_concentrated);
    assert_eq!(report.top_exchange.as_deref(), Some("a"));
}

#[test]
fn test_empty_snapshot_reports_nothing() {
    let report = ConsensusEngine::default().build_report(&MarketSnapshot::default(), MARKET);
    assert!(report.exchange_metrics.is_empty());
    assert!(report.candles.is_empty());
    assert!(report.deviations.is_empty());
    assert!(report.normalized.is_empty());
    assert_eq!(report.fair_value, 0.0);
    assert_eq!(report.efficiency, EfficiencyReport::default());
}

#[test]
fn test_book_only_exchange_drives_concentration_flag() {
    let mut snapshot = MarketSnapshot::default();
    snapshot.order_books = vec![make_book("binance", 10, 50.0), make_book("okx", 10, 5.0)];
    snapshot
        .candles
        .insert("okx".to_string(), vec![make_candle("okx", 0, 100.0, 1.0)]);

    let report = ConsensusEngine::default().build_report(&snapshot, MARKET);
    assert!(is_highly_concentrated(&report.exchange_metrics));
    assert!(report.efficiency.highly_concentrated);
    assert_eq!(report.efficiency.top_exchange.as_deref(), Some("binance"));
    assert_eq!(report.deviations.len(), 1);
}

#[test]
fn test_report_from_json_snapshot() {
    let json = r#"{
        "order_books": [
            {"exchange": "binance", "market": "BTC/USDT", "bids": [[100.0, 3.0]], "asks": [[100.2, 3.0]], "timestamp": 1},
            {"exchange": "kraken", "market": "BTC/USDT", "bids": [[100.0, 1.0]], "asks": [[100.2, 1.0]], "timestamp": 1}
        ],
        "candles": {
            "binance": [{"timestamp": 0, "open": 100, "high": 101, "low": 99, "close": 100.5, "volume": 4, "exchange": "binance", "market": "BTC/USDT"}],
            "kraken": [{"timestamp": 10, "open": 100, "high": 102, "low": 98, "close": 100.7, "volume": 1, "exchange": "kraken", "market": "BTC/USDT"}]
        }
    }"#;
    let snapshot: MarketSnapshot = serde_json::from_str(json).unwrap();
    let engine = ConsensusEngine::new(
        AggregationConfig::preset(Preset::Standard),
        CenterMethod::Average,
    );
    let report = engine.build_report(&snapshot, MARKET);

    assert_eq!(report.candles.len(), 1);
    let candle = &report.candles[0];
    assert_eq!(candle.high, 102.0);
    assert_eq!(candle.low, 98.0);
    assert!((candle.close - (100.5 * 4.0 + 100.7) / 5.0).abs() < 1e-9);
    assert!((report.fair_value - (100.5 * 0.75 + 100.7 * 0.25)).abs() < 1e-9);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["method"], "vwap");
    assert_eq!(value["timeframe"], "1m");
}

// ============================================================================
// Property tests
// ============================================================================

fn arb_exchanges() -> impl Strategy<Value = Vec<ExchangeCandles>> {
    prop::collection::vec(
        prop::collection::vec((0i64..600_000, 1.0f64..10_000.0, 0.0f64..1_000.0), 1..20),
        1..6,
    )
    .prop_map(|sets| {
        sets.into_iter()
            .enumerate()
            .map(|(i, rows)| {
                let name = format!("ex{}", i);
                let candles = rows
                    .into_iter()
                    .map(|(ts, close, volume)| make_candle(&name, ts, close, volume))
                    .collect();
                ExchangeCandles::new(name, candles)
            })
            .collect()
    })
}

fn arb_method() -> impl Strategy<Value = AggregationMethod> {
    prop::sample::select(AggregationMethod::all().to_vec())
}

proptest! {
    #[test]
    fn prop_confidence_within_unit_interval(exchanges in arb_exchanges(), method in arb_method()) {
        let cfg = config(method).with_outlier_detection(OutlierConfig::iqr()).unwrap();
        for candle in aggregate_candles(&exchanges, &cfg) {
            prop_assert!((0.0..=1.0).contains(&candle.stats.confidence_score));
            prop_assert_eq!(candle.time % 60_000, 0);
            if candle.is_degenerate() {
                prop_assert_eq!(candle.stats.confidence_score, 0.0);
            } else {
                prop_assert!(candle.high >= candle.low);
            }
        }
    }

    #[test]
    fn prop_gini_bounded(values in prop::collection::vec(0.0f64..1e6, 1..50)) {
        let g = gini_coefficient(&values);
        let n = values.len() as f64;
        prop_assert!(g >= -1e-9);
        prop_assert!(g <= (n - 1.0) / n + 1e-9);
    }

    #[test]
    fn prop_normalized_series_aligned(exchanges in arb_exchanges()) {
        let input: BTreeMap<String, Vec<Candle>> = exchanges
            .into_iter()
            .map(|set| (set.exchange, set.candles))
            .collect();
        let series = normalize_exchange_prices(&input, CenterMethod::Median, Timeframe::Min1);
        let lengths: Vec<usize> = series.values().map(Vec::len).collect();
        prop_assert!(lengths.windows(2).all(|w| w[0] == w[1]));
    }
}
