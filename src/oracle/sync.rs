//! Time Synchronizer - Aligns per-exchange candles on a common time grid
//!
//! Every exchange's normalized series covers exactly the union of buckets
//! seen across all exchanges, so series can be compared point by point.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::CenterMethod;
use crate::stats;
use crate::types::{Candle, NormalizedPoint, Timeframe};

/// Union of bucket starts across every exchange
pub fn time_grid(
    exchange_candles: &BTreeMap<String, Vec<Candle>>,
    timeframe: Timeframe,
) -> Vec<i64> {
    exchange_candles
        .values()
        .flatten()
        .map(|c| timeframe.bucket_start(c.timestamp))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Close per bucket for one exchange; the latest candle in a bucket wins
pub fn bucket_closes(candles: &[Candle], timeframe: Timeframe) -> BTreeMap<i64, f64> {
    let mut latest: BTreeMap<i64, &Candle> = BTreeMap::new();
    for candle in candles {
        latest
            .entry(timeframe.bucket_start(candle.timestamp))
            .and_modify(|current| {
                if candle.timestamp >= current.timestamp {
                    *current = candle;
                }
            })
            .or_insert(candle);
    }
    latest.into_iter().map(|(time, c)| (time, c.close)).collect()
}

/// Reference price the exchange's series is expressed against
pub fn center_price(closes: &BTreeMap<i64, f64>, method: CenterMethod) -> f64 {
    match method {
        CenterMethod::First => closes.values().next().copied().unwrap_or(0.0),
        CenterMethod::Average => stats::mean(&closes.values().copied().collect::<Vec<_>>()),
        CenterMethod::Median => stats::median(&closes.values().copied().collect::<Vec<_>>()),
    }
}

fn percent_from(price: f64, center: f64) -> f64 {
    if center == 0.0 {
        0.0
    } else {
        (price - center) / center * 100.0
    }
}

/// Percent-from-center series per exchange on the shared grid
///
/// Gaps carry the last known price forward; buckets before an exchange's
/// first sample carry its first price. Exchanges without candles are left
/// out.
pub fn normalize_exchange_prices(
    exchange_candles: &BTreeMap<String, Vec<Candle>>,
    center_method: CenterMethod,
    timeframe: Timeframe,
) -> BTreeMap<String, Vec<NormalizedPoint>> {
    let grid = time_grid(exchange_candles, timeframe);
    let mut series = BTreeMap::new();

    for (exchange, candles) in exchange_candles {
        let closes = bucket_closes(candles, timeframe);
        let Some(first_close) = closes.values().next().copied() else {
            continue;
        };
        let center = center_price(&closes, center_method);

        let mut last_price = first_close;
        let points: Vec<NormalizedPoint> = grid
            .iter()
            .map(|time| {
                if let Some(close) = closes.get(time) {
                    last_price = *close;
                }
                NormalizedPoint {
                    time: *time,
                    value: percent_from(last_price, center),
                    original_price: last_price,
                }
            })
            .collect();

        series.insert(exchange.clone(), points);
    }

    debug!(
        exchanges = series.len(),
        buckets = grid.len(),
        center = %center_method,
        "Normalized exchange prices"
    );

    series
}
