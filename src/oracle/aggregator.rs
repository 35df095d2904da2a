//! Candle Aggregator - Combines candles from multiple exchanges
//!
//! Groups same-timeframe candles into time buckets, removes outlier prints,
//! and produces a consolidated OHLCV series with per-bucket quality
//! statistics and a confidence score.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{AggregationConfig, AggregationMethod};
use crate::oracle::confidence::confidence_score;
use crate::stats::{self, calculate_weight, OutlierDetector};
use crate::types::{AggregatedCandle, AggregationStats, Candle, ExchangeMetrics, WeightedValue};

/// Buckets with fewer samples skip outlier detection
pub const MIN_OUTLIER_SAMPLES: usize = 4;

/// Candles reported by one exchange, with its liquidity metrics if known
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeCandles {
    pub exchange: String,
    pub candles: Vec<Candle>,
    pub metrics: Option<ExchangeMetrics>,
}

impl ExchangeCandles {
    pub fn new(exchange: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            exchange: exchange.into(),
            candles,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ExchangeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Most recent candle for `market`
    pub fn last_candle(&self, market: &str) -> Option<&Candle> {
        self.candles
            .iter()
            .filter(|c| c.market == market)
            .max_by_key(|c| c.timestamp)
    }
}

/// Pair candle sets with the metrics entry of the same exchange
pub fn attach_metrics(
    candles: &BTreeMap<String, Vec<Candle>>,
    metrics: &[ExchangeMetrics],
) -> Vec<ExchangeCandles> {
    let mut exchanges: Vec<ExchangeCandles> = candles
        .iter()
        .map(|(exchange, set)| ExchangeCandles {
            exchange: exchange.clone(),
            candles: set.clone(),
            metrics: metrics.iter().find(|m| &m.exchange == exchange).cloned(),
        })
        .collect();

    // Book-only exchanges still count towards concentration
    exchanges.extend(
        metrics
            .iter()
            .filter(|m| !candles.contains_key(&m.exchange))
            .map(|m| ExchangeCandles::new(m.exchange.clone(), Vec::new()).with_metrics(m.clone())),
    );
    exchanges
}

/// One candle inside a bucket, tagged with its owning exchange
#[derive(Debug, Clone, Copy)]
struct Sample<'a> {
    candle: &'a Candle,
    exchange: &'a str,
    metrics: Option<&'a ExchangeMetrics>,
}

/// Aggregates per-exchange candles under one immutable config
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    config: AggregationConfig,
    detector: Option<OutlierDetector>,
}

impl CandleAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        let detector = config
            .active_outlier_detection()
            .and_then(OutlierDetector::from_config);
        Self { config, detector }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Aggregated candles sorted by bucket time
    ///
    /// Buckets without enough distinct exchanges are omitted. Buckets where
    /// every sample was an outlier come back degenerate (`candle_count == 0`).
    pub fn aggregate(&self, exchanges: &[ExchangeCandles]) -> Vec<AggregatedCandle> {
        let buckets = self.group_by_bucket(exchanges);
        let bucket_count = buckets.len();

        #[cfg(feature = "parallel")]
        let mut candles: Vec<AggregatedCandle> = buckets
            .into_par_iter()
            .filter_map(|(time, samples)| self.aggregate_bucket(time, &samples))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let mut candles: Vec<AggregatedCandle> = buckets
            .into_iter()
            .filter_map(|(time, samples)| self.aggregate_bucket(time, &samples))
            .collect();

        candles.sort_by_key(|c| c.time);

        debug!(
            method = %self.config.method(),
            timeframe = %self.config.timeframe(),
            buckets = bucket_count,
            emitted = candles.len(),
            "Aggregated candles"
        );

        candles
    }

    fn group_by_bucket<'a>(&self, exchanges: &'a [ExchangeCandles]) -> Vec<(i64, Vec<Sample<'a>>)> {
        let timeframe = self.config.timeframe();
        let mut buckets: BTreeMap<i64, Vec<Sample<'a>>> = BTreeMap::new();

        for set in exchanges {
            for candle in &set.candles {
                buckets
                    .entry(timeframe.bucket_start(candle.timestamp))
                    .or_default()
                    .push(Sample {
                        candle,
                        exchange: set.exchange.as_str(),
                        metrics: set.metrics.as_ref(),
                    });
            }
        }

        buckets.into_iter().collect()
    }

    fn aggregate_bucket(&self, time: i64, samples: &[Sample<'_>]) -> Option<AggregatedCandle> {
        let contributing = distinct_exchanges(samples);
        if contributing < self.config.min_exchanges() {
            debug!(
                bucket = time,
                exchanges = contributing,
                required = self.config.min_exchanges(),
                "Dropping bucket below exchange minimum"
            );
            return None;
        }

        let outliers = match &self.detector {
            Some(detector) if samples.len() >= MIN_OUTLIER_SAMPLES => {
                let closes: Vec<f64> = samples.iter().map(|s| s.candle.close).collect();
                detector.detect(&closes)
            }
            _ => Vec::new(),
        };

        let survivors: Vec<Sample<'_>> = samples
            .iter()
            .enumerate()
            .filter(|(i, _)| !outliers.contains(i))
            .map(|(_, s)| *s)
            .collect();
        let outliers_removed = samples.len() - survivors.len();

        if survivors.is_empty() {
            warn!(
                bucket = time,
                outliers_removed, "Every sample in bucket was an outlier"
            );
            return Some(AggregatedCandle::degenerate(time, outliers_removed));
        }

        if outliers_removed > 0 {
            trace!(bucket = time, outliers_removed, "Removed outlier prints");
        }

        Some(self.combine(time, &survivors, outliers_removed))
    }

    fn combine(
        &self,
        time: i64,
        samples: &[Sample<'_>],
        outliers_removed: usize,
    ) -> AggregatedCandle {
        let method = self.config.method();

        let high = samples
            .iter()
            .map(|s| s.candle.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let low = samples
            .iter()
            .map(|s| s.candle.low)
            .fold(f64::INFINITY, f64::min);
        let volume: f64 = samples.iter().map(|s| s.candle.volume).sum();

        let weights: Vec<f64> = samples
            .iter()
            .map(|s| calculate_weight(method, s.candle, s.metrics))
            .collect();
        let total_weight: f64 = weights.iter().sum();

        let close_volume: Vec<(f64, f64)> = samples
            .iter()
            .map(|s| (s.candle.close, s.candle.volume))
            .collect();

        let (open, close, vwap) = match method {
            AggregationMethod::Vwap => {
                let open_volume: Vec<(f64, f64)> = samples
                    .iter()
                    .map(|s| (s.candle.open, s.candle.volume))
                    .collect();
                let close = stats::vwap(&close_volume);
                (stats::vwap(&open_volume), close, Some(close))
            }
            AggregationMethod::Twap => {
                let opens: Vec<(f64, i64)> = samples
                    .iter()
                    .map(|s| (s.candle.open, s.candle.timestamp))
                    .collect();
                let closes: Vec<(f64, i64)> = samples
                    .iter()
                    .map(|s| (s.candle.close, s.candle.timestamp))
                    .collect();
                (stats::twap(&opens), stats::twap(&closes), None)
            }
            AggregationMethod::Median => {
                let opens: Vec<WeightedValue> = samples
                    .iter()
                    .map(|s| WeightedValue::unit(s.candle.open))
                    .collect();
                let closes: Vec<WeightedValue> = samples
                    .iter()
                    .map(|s| WeightedValue::unit(s.candle.close))
                    .collect();
                (stats::weighted_median(&opens), stats::weighted_median(&closes), None)
            }
            AggregationMethod::MarketShare
            | AggregationMethod::Liquidity
            | AggregationMethod::Dominance
            | AggregationMethod::Equal => {
                let opens: Vec<WeightedValue> = samples
                    .iter()
                    .zip(&weights)
                    .map(|(s, w)| WeightedValue::new(s.candle.open, *w))
                    .collect();
                let closes: Vec<WeightedValue> = samples
                    .iter()
                    .zip(&weights)
                    .map(|(s, w)| WeightedValue::new(s.candle.close, *w))
                    .collect();
                let vwap = (volume > 0.0).then(|| stats::vwap(&close_volume));
                (
                    stats::weighted_average(&opens),
                    stats::weighted_average(&closes),
                    vwap,
                )
            }
        };

        let close_prices: Vec<f64> = samples.iter().map(|s| s.candle.close).collect();
        let price_std_dev = stats::std_dev(&close_prices);
        let exchange_count = distinct_exchanges(samples);
        let confidence = confidence_score(
            exchange_count,
            price_std_dev,
            stats::mean(&close_prices),
            total_weight,
        );

        AggregatedCandle {
            time,
            open,
            high,
            low,
            close,
            volume,
            vwap,
            stats: AggregationStats {
                exchange_count,
                candle_count: samples.len(),
                outliers_removed,
                total_weight,
                price_std_dev,
                price_range: high - low,
                confidence_score: confidence,
            },
        }
    }
}

fn distinct_exchanges(samples: &[Sample<'_>]) -> usize {
    samples.iter().map(|s| s.exchange).collect::<BTreeSet<_>>().len()
}

/// Aggregate candles from every exchange under `config`
pub fn aggregate_candles(
    exchanges: &[ExchangeCandles],
    config: &AggregationConfig,
) -> Vec<AggregatedCandle> {
    CandleAggregator::new(config.clone()).aggregate(exchanges)
}
