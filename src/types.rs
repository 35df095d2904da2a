//! Core types used throughout the consensus engine
//!
//! Defines candles, order-book snapshots, per-exchange metrics and the
//! aggregated output series.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Supported candle timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    Min1,
    Min3,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour4,
    Day1,
    Week1,
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Min1
    }
}

impl Timeframe {
    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        match self {
            Timeframe::Min1 => 60_000,
            Timeframe::Min3 => 3 * 60_000,
            Timeframe::Min5 => 5 * 60_000,
            Timeframe::Min15 => 15 * 60_000,
            Timeframe::Min30 => 30 * 60_000,
            Timeframe::Hour1 => 3_600_000,
            Timeframe::Hour4 => 4 * 3_600_000,
            Timeframe::Day1 => 86_400_000,
            Timeframe::Week1 => 7 * 86_400_000,
        }
    }

    /// Floor a millisecond timestamp to the start of its bucket.
    ///
    /// Uses Euclidean division so pre-epoch timestamps still land on the
    /// bucket that contains them. The partial bucket just above `i64::MIN`
    /// has no representable start and saturates to `i64::MIN`.
    pub fn bucket_start(&self, timestamp_ms: i64) -> i64 {
        let duration = self.duration_ms();
        timestamp_ms.div_euclid(duration).saturating_mul(duration)
    }

    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::Min1,
            Timeframe::Min3,
            Timeframe::Min5,
            Timeframe::Min15,
            Timeframe::Min30,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Day1,
            Timeframe::Week1,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Min1 => write!(f, "1m"),
            Timeframe::Min3 => write!(f, "3m"),
            Timeframe::Min5 => write!(f, "5m"),
            Timeframe::Min15 => write!(f, "15m"),
            Timeframe::Min30 => write!(f, "30m"),
            Timeframe::Hour1 => write!(f, "1h"),
            Timeframe::Hour4 => write!(f, "4h"),
            Timeframe::Day1 => write!(f, "1d"),
            Timeframe::Week1 => write!(f, "1w"),
        }
    }
}

impl FromStr for Timeframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "1min" => Ok(Timeframe::Min1),
            "3m" | "3min" => Ok(Timeframe::Min3),
            "5m" | "5min" => Ok(Timeframe::Min5),
            "15m" | "15min" => Ok(Timeframe::Min15),
            "30m" | "30min" => Ok(Timeframe::Min30),
            "1h" | "1hour" => Ok(Timeframe::Hour1),
            "4h" | "4hour" => Ok(Timeframe::Hour4),
            "1d" | "1day" => Ok(Timeframe::Day1),
            "1w" | "1week" => Ok(Timeframe::Week1),
            _ => Err(ConfigError::UnknownTimeframe(s.to_string())),
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.to_string()
    }
}

/// OHLCV candle reported by a single exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time in milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub exchange: String,
    pub market: String,
}

/// Single price level of an order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct BookLevel {
    pub price: f64,
    pub volume: f64,
}

impl BookLevel {
    pub fn new(price: f64, volume: f64) -> Self {
        Self { price, volume }
    }

    /// Quote-currency value resting at this level
    pub fn notional(&self) -> f64 {
        self.price * self.volume
    }
}

impl From<(f64, f64)> for BookLevel {
    fn from((price, volume): (f64, f64)) -> Self {
        Self { price, volume }
    }
}

impl From<BookLevel> for (f64, f64) {
    fn from(level: BookLevel) -> Self {
        (level.price, level.volume)
    }
}

/// Order-book snapshot as delivered by a feed, best levels first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub exchange: String,
    pub market: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub timestamp: i64,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    pub fn bid_liquidity(&self) -> f64 {
        self.bids.iter().map(BookLevel::notional).sum()
    }

    pub fn ask_liquidity(&self) -> f64 {
        self.asks.iter().map(BookLevel::notional).sum()
    }

    /// Number of levels on both sides
    pub fn depth(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    /// Best ask minus best bid, or 0 when either side is missing or crossed
    pub fn spread(&self) -> f64 {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask.price - bid.price > 0.0 => ask.price - bid.price,
            _ => 0.0,
        }
    }
}

/// Liquidity profile of one exchange within one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeMetrics {
    pub exchange: String,
    /// Total notional resting on both sides of the book
    pub liquidity: f64,
    /// Share of the market's liquidity, in percent
    pub market_share: f64,
    pub dominance: f64,
    /// Number of book levels
    pub depth: usize,
    pub spread: f64,
}

/// Quality statistics attached to each aggregated bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationStats {
    pub exchange_count: usize,
    pub candle_count: usize,
    pub outliers_removed: usize,
    pub total_weight: f64,
    pub price_std_dev: f64,
    pub price_range: f64,
    /// Always within [0, 1]
    pub confidence_score: f64,
}

/// Consolidated candle for one time bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCandle {
    /// Bucket start, aligned to the timeframe
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,
    pub stats: AggregationStats,
}

impl AggregatedCandle {
    /// Zero-valued candle for a bucket where outlier removal left nothing.
    pub fn degenerate(time: i64, outliers_removed: usize) -> Self {
        Self {
            time,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            volume: 0.0,
            vwap: None,
            stats: AggregationStats {
                outliers_removed,
                ..AggregationStats::default()
            },
        }
    }

    /// No usable data for this window; must not be charted.
    pub fn is_degenerate(&self) -> bool {
        self.stats.candle_count == 0
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.time).single()
    }
}

/// Skip buckets that carry no usable data
pub fn usable_candles(candles: &[AggregatedCandle]) -> impl Iterator<Item = &AggregatedCandle> {
    candles.iter().filter(|c| !c.is_degenerate())
}

/// Value with a non-negative weight, used by the statistics helpers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedValue {
    pub value: f64,
    pub weight: f64,
}

impl WeightedValue {
    pub fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }

    pub fn unit(value: f64) -> Self {
        Self { value, weight: 1.0 }
    }
}

/// One point of a normalized (percent-from-center) price series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub time: i64,
    /// Percent deviation from the exchange's center price
    pub value: f64,
    pub original_price: f64,
}
